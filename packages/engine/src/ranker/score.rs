//! Priority scoring
//!
//! - value = weighted sum of frequency, relational density and contextual
//!   contribution
//! - cost = base difficulty - transfer gain + exposure need, floored at
//!   `min_cost`
//! - priority = value / cost
//! - urgency grows as the next review approaches and keeps growing
//!   (logarithmically, capped) once it is overdue

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ability::probability;
use crate::collocation::pmi_to_difficulty;
use crate::config::{PriorityConfig, UrgencyConfig, WeightProfile};
use crate::sanitize::finite_or;
use crate::scheduler::ReviewCard;
use crate::types::MILLIS_PER_DAY;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnableItem {
    pub id: String,
    /// Normalized corpus frequency in [0, 1]
    pub frequency: f64,
    pub relational_density: f64,
    pub contextual_contribution: f64,
    #[serde(default)]
    pub irt_difficulty: Option<f64>,
    /// Strongest collocation NPMI, used when no calibrated difficulty exists
    #[serde(default)]
    pub collocation_npmi: Option<f64>,
    /// Last computed priority, kept for cheap ordering
    #[serde(default)]
    pub priority: f64,
}

impl LearnableItem {
    pub fn new(
        id: impl Into<String>,
        frequency: f64,
        relational_density: f64,
        contextual_contribution: f64,
    ) -> Self {
        Self {
            id: id.into(),
            frequency,
            relational_density,
            contextual_contribution,
            irt_difficulty: None,
            collocation_npmi: None,
            priority: 0.0,
        }
    }
}

/// What the ranker needs to know about one learner and one item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserItemState {
    pub ability: f64,
    pub exposures: u32,
    /// Related items the learner already knows
    pub known_related: u32,
    pub next_review: Option<DateTime<Utc>>,
}

impl UserItemState {
    pub fn from_card(card: &ReviewCard, ability: f64, known_related: u32) -> Self {
        Self {
            ability,
            exposures: card.reps,
            known_related,
            next_review: card.due,
        }
    }
}

pub fn compute_value(item: &LearnableItem, weights: &WeightProfile) -> f64 {
    let signal = |x: f64| finite_or(x, 0.0).max(0.0);
    weights.frequency * signal(item.frequency)
        + weights.relational * signal(item.relational_density)
        + weights.contextual * signal(item.contextual_contribution)
}

/// Difficulty logit: calibrated value, else derived from collocation
/// strength, else neutral.
pub fn item_difficulty(item: &LearnableItem, config: &PriorityConfig) -> f64 {
    match (item.irt_difficulty, item.collocation_npmi) {
        (Some(b), _) if b.is_finite() => b,
        (_, Some(npmi)) => pmi_to_difficulty(npmi, config.fallback_task, &config.difficulty_mapping),
        _ => 0.0,
    }
}

pub fn compute_cost(item: &LearnableItem, state: &UserItemState, config: &PriorityConfig) -> f64 {
    let c = &config.cost;
    let b = item_difficulty(item, config);
    let p_correct = probability(finite_or(state.ability, 0.0), 1.0, b, 0.0);
    let base = c.difficulty_weight * (1.0 - p_correct);

    let transfer = (c.transfer_per_related * state.known_related as f64).min(c.max_transfer);

    let exposure_need = if c.target_exposures == 0 {
        0.0
    } else {
        let missing = c.target_exposures.saturating_sub(state.exposures) as f64;
        c.exposure_weight * missing / c.target_exposures as f64
    };

    (base - transfer + exposure_need).max(c.min_cost)
}

pub fn compute_priority(item: &LearnableItem, state: &UserItemState, config: &PriorityConfig) -> f64 {
    let value = compute_value(item, &config.weights);
    let cost = compute_cost(item, state, config);
    finite_or(value / cost, 0.0)
}

pub fn compute_urgency(
    next_review: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    config: &UrgencyConfig,
) -> f64 {
    let Some(next_review) = next_review else {
        return config.neutral;
    };

    let days_until = (next_review - now).num_milliseconds() as f64 / MILLIS_PER_DAY;
    let urgency = if days_until > 0.0 {
        config.horizon_days / (config.horizon_days + days_until)
    } else {
        1.0 + (-days_until / config.overdue_scale_days).ln_1p()
    };
    finite_or(urgency, config.neutral).clamp(0.0, config.max_urgency)
}
