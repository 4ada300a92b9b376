//! Mastery stage determination
//!
//! Stages run 0-4:
//! - 0 Unseen: no exposure, or exposure without any success
//! - 1 Emerging: some success, cued or not
//! - 2 Developing: moderate cue-free accuracy or strong cue-assisted accuracy
//! - 3 Proficient: high cue-free accuracy, stable memory, small scaffolding gap
//! - 4 Automatic: very high cue-free accuracy, long stability, negligible gap
//!
//! Thresholds sit behind `StagePolicy` so callers can swap the rule set.

use serde::{Deserialize, Serialize};

use crate::config::{MasteryConfig, StageThresholds};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MasteryStage {
    Unseen = 0,
    Emerging = 1,
    Developing = 2,
    Proficient = 3,
    Automatic = 4,
}

impl MasteryStage {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unseen => "unseen",
            Self::Emerging => "emerging",
            Self::Developing => "developing",
            Self::Proficient => "proficient",
            Self::Automatic => "automatic",
        }
    }
}

/// Running accuracy split by whether the learner was cued.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasteryRecord {
    pub exposures: u32,
    pub cue_free_attempts: u32,
    pub cue_assisted_attempts: u32,
    pub cue_free_accuracy: f64,
    pub cue_assisted_accuracy: f64,
    /// Memory stability in days, copied from the review card
    pub stability: f64,
}

impl MasteryRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one response into the running accuracies.
    ///
    /// Cue-free accuracy is a running mean until its weight decays to
    /// `cue_free_min_weight`, after which it behaves as an EWMA. Assisted
    /// accuracy uses a fixed smoothing factor.
    pub fn record(
        &self,
        correct: bool,
        assistance_level: u8,
        stability: f64,
        config: &MasteryConfig,
    ) -> Self {
        let outcome = if correct { 1.0 } else { 0.0 };
        let mut next = self.clone();
        next.exposures += 1;
        next.stability = stability.max(0.0);

        if assistance_level == 0 {
            let weight = (1.0 / (self.cue_free_attempts as f64 + 1.0))
                .max(config.cue_free_min_weight)
                .min(1.0);
            next.cue_free_accuracy += weight * (outcome - self.cue_free_accuracy);
            next.cue_free_attempts += 1;
        } else {
            next.cue_assisted_accuracy = if self.cue_assisted_attempts == 0 {
                outcome
            } else {
                self.cue_assisted_accuracy
                    + config.assisted_smoothing * (outcome - self.cue_assisted_accuracy)
            };
            next.cue_assisted_attempts += 1;
        }
        next
    }

    /// How much cueing inflates accuracy. Zero until both kinds were seen.
    pub fn scaffolding_gap(&self) -> f64 {
        if self.cue_free_attempts == 0 || self.cue_assisted_attempts == 0 {
            return 0.0;
        }
        (self.cue_assisted_accuracy - self.cue_free_accuracy).max(0.0)
    }

    fn free_accuracy(&self) -> f64 {
        if self.cue_free_attempts == 0 {
            0.0
        } else {
            self.cue_free_accuracy
        }
    }

    fn assisted_accuracy(&self) -> f64 {
        if self.cue_assisted_attempts == 0 {
            0.0
        } else {
            self.cue_assisted_accuracy
        }
    }
}

pub trait StagePolicy {
    fn stage(&self, record: &MasteryRecord) -> MasteryStage;
}

#[derive(Debug, Clone, Default)]
pub struct ThresholdStagePolicy {
    pub thresholds: StageThresholds,
}

impl ThresholdStagePolicy {
    pub fn new(thresholds: StageThresholds) -> Self {
        Self { thresholds }
    }
}

impl StagePolicy for ThresholdStagePolicy {
    fn stage(&self, record: &MasteryRecord) -> MasteryStage {
        if record.exposures == 0 {
            return MasteryStage::Unseen;
        }

        let t = &self.thresholds;
        let free = record.free_accuracy();
        let assisted = record.assisted_accuracy();
        let gap = record.scaffolding_gap();

        if free >= t.automatic_accuracy
            && record.stability >= t.automatic_stability_days
            && gap <= t.automatic_max_gap
        {
            MasteryStage::Automatic
        } else if free >= t.proficient_accuracy
            && record.stability >= t.proficient_stability_days
            && gap <= t.proficient_max_gap
        {
            MasteryStage::Proficient
        } else if free >= t.developing_accuracy || assisted >= t.developing_assisted_accuracy {
            MasteryStage::Developing
        } else if free > 0.0 || assisted > 0.0 {
            MasteryStage::Emerging
        } else {
            MasteryStage::Unseen
        }
    }
}

pub fn determine_stage(record: &MasteryRecord, config: &MasteryConfig) -> MasteryStage {
    ThresholdStagePolicy::new(config.stages.clone()).stage(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with(free: f64, assisted: Option<f64>, stability: f64) -> MasteryRecord {
        MasteryRecord {
            exposures: 10,
            cue_free_attempts: 8,
            cue_assisted_attempts: if assisted.is_some() { 2 } else { 0 },
            cue_free_accuracy: free,
            cue_assisted_accuracy: assisted.unwrap_or(0.0),
            stability,
        }
    }

    #[test]
    fn test_unseen_without_exposure() {
        let config = MasteryConfig::default();
        assert_eq!(
            determine_stage(&MasteryRecord::new(), &config),
            MasteryStage::Unseen
        );
    }

    #[test]
    fn test_exposure_without_success_stays_unseen() {
        let config = MasteryConfig::default();
        let record = MasteryRecord::new()
            .record(false, 0, 0.4, &config)
            .record(false, 2, 0.4, &config);
        assert_eq!(record.exposures, 2);
        assert_eq!(determine_stage(&record, &config), MasteryStage::Unseen);
    }

    #[test]
    fn test_single_assisted_success_is_emerging() {
        let config = MasteryConfig::default();
        let record = MasteryRecord::new()
            .record(false, 0, 0.4, &config)
            .record(false, 0, 0.4, &config)
            .record(true, 2, 0.6, &config)
            .record(false, 2, 0.6, &config);
        assert_eq!(determine_stage(&record, &config), MasteryStage::Emerging);
    }

    #[test]
    fn test_strong_assisted_accuracy_is_developing() {
        let config = MasteryConfig::default();
        assert_eq!(
            determine_stage(&record_with(0.3, Some(0.85), 1.0), &config),
            MasteryStage::Developing
        );
    }

    #[test]
    fn test_large_gap_blocks_proficient() {
        let config = MasteryConfig::default();
        assert_eq!(
            determine_stage(&record_with(0.82, None, 10.0), &config),
            MasteryStage::Proficient
        );
        assert_eq!(
            determine_stage(&record_with(0.82, Some(1.0), 10.0), &config),
            MasteryStage::Developing
        );
    }

    #[test]
    fn test_automatic_requires_long_stability() {
        let config = MasteryConfig::default();
        assert_eq!(
            determine_stage(&record_with(0.95, Some(0.97), 30.0), &config),
            MasteryStage::Automatic
        );
        assert_eq!(
            determine_stage(&record_with(0.95, Some(0.97), 14.0), &config),
            MasteryStage::Proficient
        );
        assert_eq!(
            determine_stage(&record_with(0.92, Some(1.0), 30.0), &config),
            MasteryStage::Proficient
        );
    }

    #[test]
    fn test_cue_free_weight_floor() {
        let config = MasteryConfig::default();
        let mut record = MasteryRecord::new();
        for _ in 0..40 {
            record = record.record(true, 0, 5.0, &config);
        }
        assert!((record.cue_free_accuracy - 1.0).abs() < 1e-12);
        let after_miss = record.record(false, 0, 5.0, &config);
        assert!((after_miss.cue_free_accuracy - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_assisted_smoothing() {
        let config = MasteryConfig::default();
        let record = MasteryRecord::new()
            .record(true, 1, 1.0, &config)
            .record(false, 1, 1.0, &config);
        assert!((record.cue_assisted_accuracy - 0.7).abs() < 1e-12);
        assert_eq!(record.cue_free_attempts, 0);
        assert_eq!(record.scaffolding_gap(), 0.0);
    }
}
