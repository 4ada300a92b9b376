//! Learner ability state
//!
//! One global ability plus one per skill component. Every score comes from
//! the same estimator call, run over the full observation set for the
//! global value and over the subset tagged with each component.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::estimate::estimate_ability;
use super::model::ItemParameters;
use crate::config::AbilityConfig;
use crate::error::Result;
use crate::types::{ResponseEvent, SkillComponent};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbilityScore {
    pub theta: f64,
    pub standard_error: f64,
    pub responses: usize,
}

impl Default for AbilityScore {
    fn default() -> Self {
        Self {
            theta: 0.0,
            standard_error: 1.0,
            responses: 0,
        }
    }
}

/// A graded response paired with the parameters of the item it answered.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredResponse {
    pub item: ItemParameters,
    pub correct: bool,
    pub component: SkillComponent,
}

impl ScoredResponse {
    pub fn from_event(event: &ResponseEvent, item: ItemParameters) -> Self {
        Self {
            item,
            correct: event.correct,
            component: event.component,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbilityState {
    pub global: AbilityScore,
    pub components: BTreeMap<SkillComponent, AbilityScore>,
}

impl Default for AbilityState {
    fn default() -> Self {
        Self {
            global: AbilityScore::default(),
            components: SkillComponent::ALL
                .iter()
                .map(|&c| (c, AbilityScore::default()))
                .collect(),
        }
    }
}

impl AbilityState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn component(&self, component: SkillComponent) -> AbilityScore {
        self.components.get(&component).copied().unwrap_or_default()
    }

    /// Re-estimate from `observations`, returning a new state.
    ///
    /// Components with no observations keep their previous score.
    pub fn update(&self, observations: &[ScoredResponse], config: &AbilityConfig) -> Result<Self> {
        let mut next = self.clone();

        if let Some(score) = estimate_subset(observations.iter(), config)? {
            next.global = score;
        }

        for component in SkillComponent::ALL {
            let subset = observations.iter().filter(|o| o.component == component);
            if let Some(score) = estimate_subset(subset, config)? {
                next.components.insert(component, score);
            }
        }

        Ok(next)
    }
}

fn estimate_subset<'a>(
    observations: impl Iterator<Item = &'a ScoredResponse>,
    config: &AbilityConfig,
) -> Result<Option<AbilityScore>> {
    let (responses, items): (Vec<bool>, Vec<ItemParameters>) =
        observations.map(|o| (o.correct, o.item.clone())).unzip();
    if responses.is_empty() {
        return Ok(None);
    }

    let estimate = estimate_ability(&responses, &items, config)?;
    Ok(Some(AbilityScore {
        theta: estimate.theta,
        standard_error: estimate.standard_error,
        responses: responses.len(),
    }))
}
