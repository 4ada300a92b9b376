//! Review Scheduler
//!
//! Contains:
//! - Review cards and lifecycle states
//! - Stability/difficulty scheduling with retrievability decay
//! - Response-to-rating policy
//! - Cue-split mastery records and stage determination

pub mod card;
pub mod fsrs;
pub mod mastery;
pub mod rating;

use serde::{Deserialize, Serialize};

pub use card::{CardState, Rating, ReviewCard};
pub use fsrs::{retrievability, Scheduler};
pub use mastery::{
    determine_stage, MasteryRecord, MasteryStage, StagePolicy, ThresholdStagePolicy,
};

use crate::config::{MasteryConfig, RatingPolicy};
use crate::types::ResponseEvent;

/// Everything that changes for one item after a single response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewOutcome {
    pub rating: Rating,
    pub card: ReviewCard,
    pub mastery: MasteryRecord,
    pub stage: MasteryStage,
}

/// Rate the response, reschedule the card and refresh mastery.
pub fn process_response(
    scheduler: &Scheduler,
    card: &ReviewCard,
    mastery: &MasteryRecord,
    event: &ResponseEvent,
    policy: &RatingPolicy,
    mastery_config: &MasteryConfig,
) -> ReviewOutcome {
    let rating = policy.rate_event(event);
    let card = scheduler.schedule(card, rating, event.timestamp);
    let mastery = mastery.record(
        event.correct,
        event.assistance_level,
        card.stability,
        mastery_config,
    );
    let stage = determine_stage(&mastery, mastery_config);

    tracing::trace!(
        item_id = %card.item_id,
        rating = ?rating,
        stability = card.stability,
        stage = stage.as_str(),
        "Review processed"
    );

    ReviewOutcome {
        rating,
        card,
        mastery,
        stage,
    }
}
