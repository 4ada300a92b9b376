use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::collocation::TaskKind;
use crate::error::{CoreError, Result};
use crate::types::SkillComponent;

// ==================== Ability ====================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AbilityConfig {
    pub theta_min: f64,
    pub theta_max: f64,
    pub max_iterations: usize,
    pub tolerance: f64,
    /// Largest Newton step allowed per iteration (logits)
    pub max_step: f64,
    /// Below this many responses EAP is used directly
    pub min_responses_for_mle: usize,
    pub quadrature_points: usize,
    pub prior_mean: f64,
    pub prior_sd: f64,
    /// Item selection switches from point Fisher information to
    /// posterior-integrated KL information above this standard error
    pub kl_switch_standard_error: f64,
}

impl Default for AbilityConfig {
    fn default() -> Self {
        Self {
            theta_min: -4.0,
            theta_max: 4.0,
            max_iterations: 50,
            tolerance: 1e-4,
            max_step: 1.0,
            min_responses_for_mle: 5,
            quadrature_points: 41,
            prior_mean: 0.0,
            prior_sd: 1.0,
            kl_switch_standard_error: 0.8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CalibrationConfig {
    pub min_respondents: usize,
    pub min_items: usize,
    pub min_responses_per_item: usize,
    pub max_iterations: usize,
    pub tolerance: f64,
    /// L2 penalty pulling discrimination toward 1 and difficulty toward 0
    pub regularization: f64,
    pub max_step: f64,
    pub max_discrimination_se: f64,
    pub max_difficulty_se: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            min_respondents: 5,
            min_items: 2,
            min_responses_per_item: 5,
            max_iterations: 100,
            tolerance: 1e-3,
            regularization: 0.01,
            max_step: 0.5,
            max_discrimination_se: 0.5,
            max_difficulty_se: 0.5,
        }
    }
}

// ==================== Scheduling ====================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SchedulerParams {
    pub w: [f64; 17],
    pub desired_retention: f64,
    pub maximum_interval: f64,
}

impl Default for SchedulerParams {
    fn default() -> Self {
        Self {
            w: [
                0.4, 0.6, 2.4, 5.8, // w0-w3: initial stability
                4.93, 0.94, 0.86, 0.01, 1.49, // w4-w8
                0.14, 0.94, 2.18, 0.05, 0.34, // w9-w13
                1.26, 0.29, 2.61, // w14-w16
            ],
            desired_retention: 0.9,
            maximum_interval: 36500.0,
        }
    }
}

/// Latency and cue cutoffs used to turn a raw response into a rating.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RatingPolicy {
    pub easy_latency_ms: i64,
    pub hard_latency_ms: i64,
    /// Correct answers at or above this cue level count as failures
    pub heavy_assistance_level: u8,
}

impl Default for RatingPolicy {
    fn default() -> Self {
        Self {
            easy_latency_ms: 2000,
            hard_latency_ms: 5000,
            heavy_assistance_level: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StageThresholds {
    pub automatic_accuracy: f64,
    pub automatic_stability_days: f64,
    pub automatic_max_gap: f64,
    pub proficient_accuracy: f64,
    pub proficient_stability_days: f64,
    pub proficient_max_gap: f64,
    pub developing_accuracy: f64,
    pub developing_assisted_accuracy: f64,
}

impl Default for StageThresholds {
    fn default() -> Self {
        Self {
            automatic_accuracy: 0.9,
            automatic_stability_days: 21.0,
            automatic_max_gap: 0.05,
            proficient_accuracy: 0.8,
            proficient_stability_days: 7.0,
            proficient_max_gap: 0.15,
            developing_accuracy: 0.6,
            developing_assisted_accuracy: 0.8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MasteryConfig {
    /// Fixed smoothing factor for cue-assisted accuracy
    pub assisted_smoothing: f64,
    /// Floor for the shrinking cue-free weight
    pub cue_free_min_weight: f64,
    pub stages: StageThresholds,
}

impl Default for MasteryConfig {
    fn default() -> Self {
        Self {
            assisted_smoothing: 0.3,
            cue_free_min_weight: 0.1,
            stages: StageThresholds::default(),
        }
    }
}

// ==================== Collocation ====================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CollocationConfig {
    /// Maximum token distance counted as co-occurrence
    pub window_size: usize,
    /// Log-likelihood ratio cutoff (chi-square, 1 df, p = 0.05)
    pub significance_cutoff: f64,
    pub min_pair_count: u64,
}

impl Default for CollocationConfig {
    fn default() -> Self {
        Self {
            window_size: 5,
            significance_cutoff: 3.84,
            min_pair_count: 2,
        }
    }
}

/// Linear map from NPMI into the difficulty logit range plus task offsets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DifficultyMapping {
    /// NPMI of +1 maps to `-logit_span`, -1 to `+logit_span`
    pub logit_span: f64,
    pub recognition: f64,
    pub cloze: f64,
    pub production: f64,
    pub timed_pressure: f64,
}

impl Default for DifficultyMapping {
    fn default() -> Self {
        Self {
            logit_span: 3.0,
            recognition: -0.5,
            cloze: 0.0,
            production: 1.0,
            timed_pressure: 0.5,
        }
    }
}

// ==================== Priority ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileName {
    Beginner,
    Intermediate,
    Advanced,
}

impl ProfileName {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "beginner" => Some(Self::Beginner),
            "intermediate" => Some(Self::Intermediate),
            "advanced" => Some(Self::Advanced),
            _ => None,
        }
    }

    pub fn weights(&self) -> WeightProfile {
        match self {
            Self::Beginner => WeightProfile {
                frequency: 0.6,
                relational: 0.2,
                contextual: 0.2,
            },
            Self::Intermediate => WeightProfile {
                frequency: 0.4,
                relational: 0.35,
                contextual: 0.25,
            },
            Self::Advanced => WeightProfile {
                frequency: 0.2,
                relational: 0.4,
                contextual: 0.4,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightProfile {
    pub frequency: f64,
    pub relational: f64,
    pub contextual: f64,
}

impl Default for WeightProfile {
    fn default() -> Self {
        ProfileName::Intermediate.weights()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CostConfig {
    /// Scales the expected failure probability into cost units
    pub difficulty_weight: f64,
    pub transfer_per_related: f64,
    pub max_transfer: f64,
    pub target_exposures: u32,
    pub exposure_weight: f64,
    pub min_cost: f64,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            difficulty_weight: 2.0,
            transfer_per_related: 0.1,
            max_transfer: 0.8,
            target_exposures: 8,
            exposure_weight: 0.5,
            min_cost: 0.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UrgencyConfig {
    /// Urgency for items that were never scheduled
    pub neutral: f64,
    /// Days ahead at which urgency falls to half of its due-date value
    pub horizon_days: f64,
    pub overdue_scale_days: f64,
    pub max_urgency: f64,
}

impl Default for UrgencyConfig {
    fn default() -> Self {
        Self {
            neutral: 0.5,
            horizon_days: 3.0,
            overdue_scale_days: 7.0,
            max_urgency: 3.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PriorityConfig {
    pub weights: WeightProfile,
    pub cost: CostConfig,
    pub urgency: UrgencyConfig,
    pub difficulty_mapping: DifficultyMapping,
    /// Task kind assumed when deriving difficulty from collocation strength
    pub fallback_task: TaskKind,
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            weights: WeightProfile::default(),
            cost: CostConfig::default(),
            urgency: UrgencyConfig::default(),
            difficulty_mapping: DifficultyMapping::default(),
            fallback_task: TaskKind::Cloze,
        }
    }
}

impl PriorityConfig {
    pub fn with_profile(profile: ProfileName) -> Self {
        Self {
            weights: profile.weights(),
            ..Self::default()
        }
    }
}

// ==================== Bottleneck ====================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BottleneckConfig {
    pub min_total_responses: usize,
    /// Number of most recent responses analysed
    pub window_size: usize,
    pub error_rate_threshold: f64,
    pub min_samples: usize,
    /// Per-component overrides of `min_samples`
    pub component_min_samples: BTreeMap<SkillComponent, usize>,
    /// Downstream error rate that counts as elevated in a cascade
    pub elevated_error_rate: f64,
    pub cascade_confidence_cutoff: f64,
    /// Window samples needed before a component reports a trend
    pub min_trend_samples: usize,
    pub trend_threshold: f64,
    /// Sample count at which the sample-size factor saturates
    pub sample_saturation: usize,
    pub sample_weight: f64,
    pub cascade_weight: f64,
    pub margin_weight: f64,
}

impl Default for BottleneckConfig {
    fn default() -> Self {
        Self {
            min_total_responses: 20,
            window_size: 100,
            error_rate_threshold: 0.3,
            min_samples: 5,
            component_min_samples: BTreeMap::new(),
            elevated_error_rate: 0.2,
            cascade_confidence_cutoff: 0.4,
            min_trend_samples: 4,
            trend_threshold: 0.1,
            sample_saturation: 30,
            sample_weight: 0.4,
            cascade_weight: 0.35,
            margin_weight: 0.25,
        }
    }
}

impl BottleneckConfig {
    pub fn min_samples_for(&self, component: SkillComponent) -> usize {
        self.component_min_samples
            .get(&component)
            .copied()
            .unwrap_or(self.min_samples)
    }
}

// ==================== Engine ====================

const ENV_OVERRIDES: [&str; 5] = [
    "LEXIS_DESIRED_RETENTION",
    "LEXIS_MAXIMUM_INTERVAL",
    "LEXIS_QUADRATURE_POINTS",
    "LEXIS_PMI_WINDOW",
    "LEXIS_WEIGHT_PROFILE",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub ability: AbilityConfig,
    pub calibration: CalibrationConfig,
    pub scheduler: SchedulerParams,
    pub rating: RatingPolicy,
    pub mastery: MasteryConfig,
    pub collocation: CollocationConfig,
    pub priority: PriorityConfig,
    pub bottleneck: BottleneckConfig,
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults with `LEXIS_*` overrides taken from `lookup`.
    ///
    /// An override that fails to parse or leaves the configuration invalid
    /// is logged and dropped, so the result always passes `validate`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        for key in ENV_OVERRIDES {
            if let Some(val) = lookup(key) {
                config.apply_override(key, &val);
            }
        }
        config
    }

    fn apply_override(&mut self, key: &str, val: &str) {
        let mut next = self.clone();
        let parsed: std::result::Result<(), String> = match key {
            "LEXIS_DESIRED_RETENTION" => val
                .parse::<f64>()
                .map(|v| next.scheduler.desired_retention = v)
                .map_err(|e| e.to_string()),
            "LEXIS_MAXIMUM_INTERVAL" => val
                .parse::<f64>()
                .map(|v| next.scheduler.maximum_interval = v)
                .map_err(|e| e.to_string()),
            "LEXIS_QUADRATURE_POINTS" => val
                .parse::<usize>()
                .map(|v| next.ability.quadrature_points = v)
                .map_err(|e| e.to_string()),
            "LEXIS_PMI_WINDOW" => val
                .parse::<usize>()
                .map(|v| next.collocation.window_size = v)
                .map_err(|e| e.to_string()),
            "LEXIS_WEIGHT_PROFILE" => ProfileName::from_str(val)
                .map(|profile| next.priority.weights = profile.weights())
                .ok_or_else(|| "unknown profile".to_string()),
            _ => return,
        };

        match parsed.and_then(|()| next.validate().map_err(|e| e.to_string())) {
            Ok(()) => *self = next,
            Err(error) => tracing::warn!(key, value = %val, error = %error, "Ignoring config override"),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let a = &self.ability;
        if a.quadrature_points < 21 {
            return invalid(format!(
                "quadraturePoints must be at least 21, got {}",
                a.quadrature_points
            ));
        }
        if !(a.theta_min < a.theta_max) {
            return invalid("thetaMin must be below thetaMax".to_string());
        }
        if !(a.prior_sd > 0.0) {
            return invalid("priorSd must be positive".to_string());
        }
        if a.max_iterations == 0 || !(a.tolerance > 0.0) {
            return invalid("ability iteration bounds must be positive".to_string());
        }

        let c = &self.calibration;
        if c.max_iterations == 0 || c.min_respondents == 0 || c.min_items == 0 {
            return invalid("calibration minimums must be positive".to_string());
        }
        if c.regularization < 0.0 {
            return invalid("regularization must be non-negative".to_string());
        }

        let s = &self.scheduler;
        if !(s.desired_retention > 0.0 && s.desired_retention < 1.0) {
            return invalid(format!(
                "desiredRetention must be in (0, 1), got {}",
                s.desired_retention
            ));
        }
        if !(s.maximum_interval >= 1.0) {
            return invalid("maximumInterval must be at least one day".to_string());
        }

        if self.rating.easy_latency_ms > self.rating.hard_latency_ms {
            return invalid("easyLatencyMs must not exceed hardLatencyMs".to_string());
        }

        let m = &self.mastery;
        if !(m.assisted_smoothing > 0.0 && m.assisted_smoothing <= 1.0)
            || !(m.cue_free_min_weight > 0.0 && m.cue_free_min_weight <= 1.0)
        {
            return invalid("mastery smoothing factors must be in (0, 1]".to_string());
        }

        if self.collocation.window_size == 0 {
            return invalid("windowSize must be positive".to_string());
        }

        if self.priority.cost.min_cost <= 0.0 {
            return invalid("minCost must be positive".to_string());
        }

        let b = &self.bottleneck;
        if b.window_size == 0 || !(0.0..=1.0).contains(&b.error_rate_threshold) {
            return invalid("bottleneck window and threshold out of range".to_string());
        }
        if b.min_trend_samples < 2 {
            return invalid(format!(
                "minTrendSamples must be at least 2, got {}",
                b.min_trend_samples
            ));
        }

        Ok(())
    }
}

fn invalid(message: String) -> Result<()> {
    Err(CoreError::InvalidConfig(message))
}
