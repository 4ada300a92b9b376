//! Stability/difficulty memory scheduler
//!
//! - Retrievability: R = exp(-t / S)
//! - First grade seeds S and D from per-rating weights
//! - Successful recall grows S more when R was low; a lapse collapses S
//!   through a separate forgetting formula
//! - Next interval inverts R for the desired retention

use chrono::{DateTime, Duration, Utc};

use super::card::{CardState, Rating, ReviewCard};
use crate::config::SchedulerParams;
use crate::types::{MAX_CARD_DIFFICULTY, MILLIS_PER_DAY, MIN_CARD_DIFFICULTY, MIN_STABILITY};

/// Stateless scheduler value; construct once per parameter set.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    params: SchedulerParams,
}

impl Scheduler {
    pub fn new(params: SchedulerParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &SchedulerParams {
        &self.params
    }

    /// Recall probability at `now`. A never-graded card has none.
    pub fn retrievability(&self, card: &ReviewCard, now: DateTime<Utc>) -> f64 {
        if card.is_new() || card.stability <= 0.0 {
            return 0.0;
        }
        retrievability(card.stability, card.elapsed_days(now))
    }

    /// Whole days until R falls to the desired retention.
    pub fn next_interval(&self, stability: f64) -> f64 {
        let retention = self.params.desired_retention.clamp(0.0001, 0.9999);
        let interval = (-stability * retention.ln()).round();
        interval.clamp(1.0, self.params.maximum_interval.max(1.0))
    }

    pub fn schedule(&self, card: &ReviewCard, rating: Rating, now: DateTime<Utc>) -> ReviewCard {
        let w = &self.params.w;
        let g = rating.value();

        let (stability, difficulty) = if card.is_new() {
            (initial_stability(w, g), initial_difficulty(w, g))
        } else {
            let r = retrievability(card.stability, card.elapsed_days(now));
            let stability = if rating.is_failure() {
                next_forget_stability(w, card.difficulty, card.stability, r)
            } else {
                next_recall_stability(w, card.difficulty, card.stability, r, g)
            };
            (stability, next_difficulty(w, card.difficulty, g))
        };

        let interval = self.next_interval(stability);
        let due = now + Duration::milliseconds((interval * MILLIS_PER_DAY) as i64);

        ReviewCard {
            item_id: card.item_id.clone(),
            difficulty,
            stability,
            last_review: Some(now),
            due: Some(due),
            scheduled_days: interval,
            reps: card.reps + 1,
            lapses: card.lapses + u32::from(rating.is_failure()),
            state: if rating.is_failure() {
                CardState::Relearning
            } else {
                CardState::Review
            },
        }
    }

    /// Outcome of every rating, in `Rating::ALL` order.
    pub fn preview(&self, card: &ReviewCard, now: DateTime<Utc>) -> [(Rating, ReviewCard); 4] {
        Rating::ALL.map(|rating| (rating, self.schedule(card, rating, now)))
    }
}

pub fn retrievability(stability: f64, elapsed_days: f64) -> f64 {
    if stability <= 0.0 {
        return 0.0;
    }
    (-elapsed_days.max(0.0) / stability).exp()
}

fn initial_stability(w: &[f64; 17], rating: i32) -> f64 {
    w[(rating - 1) as usize].max(MIN_STABILITY)
}

fn initial_difficulty(w: &[f64; 17], rating: i32) -> f64 {
    (w[4] - (rating - 3) as f64 * w[5]).clamp(MIN_CARD_DIFFICULTY, MAX_CARD_DIFFICULTY)
}

fn next_difficulty(w: &[f64; 17], d: f64, rating: i32) -> f64 {
    let d_new = d - w[6] * (rating - 3) as f64;
    // Mean reversion toward the initial difficulty of a "good" first grade
    let d_mean = w[7] * initial_difficulty(w, 3) + (1.0 - w[7]) * d_new;
    d_mean.clamp(MIN_CARD_DIFFICULTY, MAX_CARD_DIFFICULTY)
}

fn next_recall_stability(w: &[f64; 17], d: f64, s: f64, r: f64, rating: i32) -> f64 {
    let hard_penalty = if rating == 2 { w[15] } else { 1.0 };
    let easy_bonus = if rating == 4 { w[16] } else { 1.0 };

    let new_s = s
        * (1.0
            + w[8].exp()
                * (11.0 - d)
                * s.powf(-w[9])
                * (w[10] * (1.0 - r)).exp_m1()
                * hard_penalty
                * easy_bonus);
    new_s.max(MIN_STABILITY)
}

fn next_forget_stability(w: &[f64; 17], d: f64, s: f64, r: f64) -> f64 {
    let new_s = w[11] * d.powf(-w[12]) * ((s + 1.0).powf(w[13]) - 1.0) * (w[14] * (1.0 - r)).exp();
    new_s.min(s).max(MIN_STABILITY)
}
