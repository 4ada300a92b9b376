//! Common Types and Constants
//!
//! Shared data structures used across all engine components.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==================== Constants ====================

/// Numerical stability epsilon
pub const EPSILON: f64 = 1e-10;

/// Logistic exponent clamp, keeps exp() finite
pub const MAX_LOGIT: f64 = 35.0;

/// Lower bound on calibrated discrimination
pub const MIN_DISCRIMINATION: f64 = 0.2;

/// Upper bound on calibrated discrimination
pub const MAX_DISCRIMINATION: f64 = 3.0;

/// Lower bound on item difficulty (logits)
pub const MIN_DIFFICULTY: f64 = -4.0;

/// Upper bound on item difficulty (logits)
pub const MAX_DIFFICULTY: f64 = 4.0;

/// Review card difficulty bounds
pub const MIN_CARD_DIFFICULTY: f64 = 1.0;
pub const MAX_CARD_DIFFICULTY: f64 = 10.0;

/// Smallest stability a card may hold (days)
pub const MIN_STABILITY: f64 = 0.1;

pub const MILLIS_PER_DAY: f64 = 86_400_000.0;

// ==================== Skill Components ====================

/// Skill component tag carried by every item and response.
///
/// Variant order is the theoretical dependency order used by cascade
/// analysis: foundational components come first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillComponent {
    Phonology,
    Morphology,
    Lexical,
    Syntax,
    Pragmatics,
}

impl SkillComponent {
    /// All components in dependency order.
    pub const ALL: [SkillComponent; 5] = [
        SkillComponent::Phonology,
        SkillComponent::Morphology,
        SkillComponent::Lexical,
        SkillComponent::Syntax,
        SkillComponent::Pragmatics,
    ];

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "phonology" => Some(Self::Phonology),
            "morphology" => Some(Self::Morphology),
            "lexical" => Some(Self::Lexical),
            "syntax" => Some(Self::Syntax),
            "pragmatics" => Some(Self::Pragmatics),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Phonology => "phonology",
            Self::Morphology => "morphology",
            Self::Lexical => "lexical",
            Self::Syntax => "syntax",
            Self::Pragmatics => "pragmatics",
        }
    }

    pub fn to_index(&self) -> usize {
        match self {
            Self::Phonology => 0,
            Self::Morphology => 1,
            Self::Lexical => 2,
            Self::Syntax => 3,
            Self::Pragmatics => 4,
        }
    }
}

// ==================== Response Log ====================

/// Immutable response log entry.
///
/// `assistance_level` is 0 for an unaided answer; higher values mean
/// stronger cues were shown. Valid latencies are non-negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEvent {
    pub item_id: String,
    pub correct: bool,
    pub latency_ms: i64,
    pub assistance_level: u8,
    pub timestamp: DateTime<Utc>,
    pub component: SkillComponent,
}

impl ResponseEvent {
    pub fn is_unaided(&self) -> bool {
        self.assistance_level == 0
    }
}
