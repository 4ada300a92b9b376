use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::MILLIS_PER_DAY;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CardState {
    New,
    Learning,
    Review,
    Relearning,
}

impl Default for CardState {
    fn default() -> Self {
        Self::New
    }
}

impl CardState {
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "LEARNING" => Self::Learning,
            "REVIEW" => Self::Review,
            "RELEARNING" => Self::Relearning,
            _ => Self::New,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Learning => "LEARNING",
            Self::Review => "REVIEW",
            Self::Relearning => "RELEARNING",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    Again = 1,
    Hard = 2,
    Good = 3,
    Easy = 4,
}

impl Rating {
    pub const ALL: [Rating; 4] = [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy];

    pub fn value(self) -> i32 {
        self as i32
    }

    pub fn is_failure(self) -> bool {
        self == Self::Again
    }
}

/// Per-item memory state.
///
/// Difficulty lives in [1, 10]. Stability is in days and is 0 only for a
/// card that has never been graded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewCard {
    pub item_id: String,
    pub difficulty: f64,
    pub stability: f64,
    pub last_review: Option<DateTime<Utc>>,
    pub due: Option<DateTime<Utc>>,
    pub scheduled_days: f64,
    pub reps: u32,
    pub lapses: u32,
    pub state: CardState,
}

impl ReviewCard {
    pub fn new(item_id: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            difficulty: 5.0,
            stability: 0.0,
            last_review: None,
            due: None,
            scheduled_days: 0.0,
            reps: 0,
            lapses: 0,
            state: CardState::New,
        }
    }

    /// Mark an unseen card as presented but not yet graded.
    pub fn introduce(mut self) -> Self {
        if self.state == CardState::New {
            self.state = CardState::Learning;
        }
        self
    }

    pub fn is_new(&self) -> bool {
        self.reps == 0
    }

    pub fn elapsed_days(&self, now: DateTime<Utc>) -> f64 {
        match self.last_review {
            Some(last) => ((now - last).num_milliseconds() as f64 / MILLIS_PER_DAY).max(0.0),
            None => 0.0,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due.map(|due| due <= now).unwrap_or(false)
    }
}
