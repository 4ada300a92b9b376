//! Priority Ranker
//!
//! Value-over-cost priority per learnable item, scaled by review urgency
//! into a deterministic queue order. Weight presets live in
//! [`crate::config::ProfileName`]; choosing one is up to the caller.

pub mod queue;
pub mod score;

pub use queue::{rank_items, refresh_priorities, refresh_priority, RankedItem};
pub use score::{
    compute_cost, compute_priority, compute_urgency, compute_value, item_difficulty,
    LearnableItem, UserItemState,
};
