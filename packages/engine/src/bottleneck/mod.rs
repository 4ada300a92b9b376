//! Bottleneck Detector
//!
//! Per-component error rates over a trailing window of the response log,
//! candidate ranking and cascade inference along the dependency order
//! phonology → morphology → lexical → syntax → pragmatics.
//!
//! Confidence mixes three factors, each in [0, 1]:
//! - sample size, saturating at `sample_saturation`
//! - cascade strength, the share of downstream components with elevated
//!   errors
//! - margin over the runner-up error rate, relative to the threshold

pub mod stats;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use stats::{ComponentStats, Trend};

use crate::config::BottleneckConfig;
use crate::error::{CoreError, Result};
use crate::types::{ResponseEvent, SkillComponent};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BottleneckCandidate {
    pub component: SkillComponent,
    pub error_rate: f64,
    pub responses: usize,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootCause {
    pub component: SkillComponent,
    /// Downstream components with elevated errors, in dependency order
    pub affected: Vec<SkillComponent>,
    pub confidence: f64,
    pub is_cascade: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BottleneckReport {
    pub total_responses: usize,
    pub window_responses: usize,
    pub window_start: Option<DateTime<Utc>>,
    pub window_end: Option<DateTime<Utc>>,
    /// One entry per component, in dependency order
    pub components: Vec<ComponentStats>,
    /// Error rate descending, dependency order on ties
    pub candidates: Vec<BottleneckCandidate>,
    pub root_cause: Option<RootCause>,
}

impl BottleneckReport {
    pub fn component(&self, component: SkillComponent) -> Option<&ComponentStats> {
        self.components.iter().find(|s| s.component == component)
    }

    pub fn top_candidate(&self) -> Option<&BottleneckCandidate> {
        self.candidates.first()
    }
}

pub fn detect_bottleneck(
    log: &[ResponseEvent],
    config: &BottleneckConfig,
) -> Result<BottleneckReport> {
    if log.len() < config.min_total_responses {
        return Err(CoreError::InsufficientData {
            context: "bottleneck detection",
            required: config.min_total_responses,
            actual: log.len(),
        });
    }

    let mut ordered: Vec<&ResponseEvent> = log.iter().collect();
    ordered.sort_by_key(|e| e.timestamp);
    let start = ordered.len().saturating_sub(config.window_size);
    let window = &ordered[start..];

    let components: Vec<ComponentStats> = SkillComponent::ALL
        .iter()
        .map(|&c| ComponentStats::compute(c, window, config))
        .collect();

    let mut candidates: Vec<BottleneckCandidate> = components
        .iter()
        .filter(|s| s.is_candidate)
        .map(|s| BottleneckCandidate {
            component: s.component,
            error_rate: s.error_rate,
            responses: s.responses,
            confidence: confidence(s, &components, config),
        })
        .collect();
    candidates.sort_by(|a, b| {
        b.error_rate
            .partial_cmp(&a.error_rate)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.component.to_index().cmp(&b.component.to_index()))
    });

    let root_cause = find_root_cause(&components, &candidates, config);

    tracing::debug!(
        window = window.len(),
        candidates = candidates.len(),
        root_cause = root_cause.as_ref().map(|r| r.component.as_str()).unwrap_or("none"),
        cascade = root_cause.as_ref().map(|r| r.is_cascade).unwrap_or(false),
        "Bottleneck analysis complete"
    );

    Ok(BottleneckReport {
        total_responses: log.len(),
        window_responses: window.len(),
        window_start: window.first().map(|e| e.timestamp),
        window_end: window.last().map(|e| e.timestamp),
        components,
        candidates,
        root_cause,
    })
}

fn is_downstream(of: &ComponentStats, other: &ComponentStats) -> bool {
    other.component.to_index() > of.component.to_index()
}

fn elevated_downstream(
    stats: &ComponentStats,
    components: &[ComponentStats],
    config: &BottleneckConfig,
) -> Vec<SkillComponent> {
    components
        .iter()
        .filter(|o| is_downstream(stats, o) && o.is_elevated(config))
        .map(|o| o.component)
        .collect()
}

fn cascade_strength(
    stats: &ComponentStats,
    components: &[ComponentStats],
    config: &BottleneckConfig,
) -> f64 {
    let observed: Vec<&ComponentStats> = components
        .iter()
        .filter(|o| is_downstream(stats, o) && o.has_enough_samples(config))
        .collect();
    if observed.is_empty() {
        return 0.0;
    }
    let elevated = observed.iter().filter(|o| o.is_elevated(config)).count();
    elevated as f64 / observed.len() as f64
}

fn confidence(
    stats: &ComponentStats,
    components: &[ComponentStats],
    config: &BottleneckConfig,
) -> f64 {
    let sample = if config.sample_saturation == 0 {
        1.0
    } else {
        (stats.responses as f64 / config.sample_saturation as f64).min(1.0)
    };

    let cascade = cascade_strength(stats, components, config);

    let runner_up = components
        .iter()
        .filter(|o| o.component != stats.component && o.has_enough_samples(config))
        .map(|o| o.error_rate)
        .fold(0.0, f64::max);
    let gap = stats.error_rate - runner_up;
    let margin = if config.error_rate_threshold > 0.0 {
        (gap / config.error_rate_threshold).clamp(0.0, 1.0)
    } else if gap > 0.0 {
        1.0
    } else {
        0.0
    };

    (config.sample_weight * sample + config.cascade_weight * cascade + config.margin_weight * margin)
        .clamp(0.0, 1.0)
}

/// Earliest candidate with elevated downstream errors, or the top candidate
/// when no cascade is confident enough.
fn find_root_cause(
    components: &[ComponentStats],
    candidates: &[BottleneckCandidate],
    config: &BottleneckConfig,
) -> Option<RootCause> {
    let cascade = components
        .iter()
        .filter(|s| s.is_candidate)
        .find_map(|s| {
            let affected = elevated_downstream(s, components, config);
            (!affected.is_empty()).then_some((s.component, affected))
        });

    if let Some((component, affected)) = cascade {
        let confidence = candidates
            .iter()
            .find(|c| c.component == component)
            .map(|c| c.confidence)
            .unwrap_or(0.0);
        if confidence >= config.cascade_confidence_cutoff {
            return Some(RootCause {
                component,
                affected,
                confidence,
                is_cascade: true,
            });
        }
        tracing::debug!(
            component = component.as_str(),
            confidence,
            cutoff = config.cascade_confidence_cutoff,
            "Cascade below confidence cutoff"
        );
    }

    candidates.first().map(|top| RootCause {
        component: top.component,
        affected: Vec::new(),
        confidence: top.confidence,
        is_cascade: false,
    })
}
