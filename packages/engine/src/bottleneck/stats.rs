use serde::{Deserialize, Serialize};

use crate::config::BottleneckConfig;
use crate::types::{ResponseEvent, SkillComponent};

/// Direction of the error rate between the older and newer half of the
/// window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Stable,
    Declining,
    /// Too few samples to split
    Unknown,
}

impl Trend {
    /// `outcomes` are error flags in chronological order.
    pub fn from_errors(outcomes: &[bool], min_samples: usize, threshold: f64) -> Self {
        if outcomes.len() < min_samples.max(2) {
            return Self::Unknown;
        }
        let (older, newer) = outcomes.split_at(outcomes.len() / 2);
        let delta = error_rate(newer) - error_rate(older);
        if delta > threshold {
            Self::Declining
        } else if delta < -threshold {
            Self::Improving
        } else {
            Self::Stable
        }
    }
}

fn error_rate(errors: &[bool]) -> f64 {
    if errors.is_empty() {
        return 0.0;
    }
    errors.iter().filter(|&&e| e).count() as f64 / errors.len() as f64
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentStats {
    pub component: SkillComponent,
    pub responses: usize,
    pub errors: usize,
    pub error_rate: f64,
    pub trend: Trend,
    pub is_candidate: bool,
}

impl ComponentStats {
    /// `window` must already be in chronological order.
    pub fn compute(
        component: SkillComponent,
        window: &[&ResponseEvent],
        config: &BottleneckConfig,
    ) -> Self {
        let outcomes: Vec<bool> = window
            .iter()
            .filter(|e| e.component == component)
            .map(|e| !e.correct)
            .collect();
        let responses = outcomes.len();
        let errors = outcomes.iter().filter(|&&e| e).count();
        let error_rate = error_rate(&outcomes);

        Self {
            component,
            responses,
            errors,
            error_rate,
            trend: Trend::from_errors(
                &outcomes,
                config.min_trend_samples,
                config.trend_threshold,
            ),
            is_candidate: responses >= config.min_samples_for(component)
                && error_rate > config.error_rate_threshold,
        }
    }

    pub fn has_enough_samples(&self, config: &BottleneckConfig) -> bool {
        self.responses >= config.min_samples_for(self.component)
    }

    pub fn is_elevated(&self, config: &BottleneckConfig) -> bool {
        self.has_enough_samples(config) && self.error_rate >= config.elevated_error_rate
    }
}
