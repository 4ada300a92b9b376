use serde::{Deserialize, Serialize};

use super::index::{CollocationIndex, PmiScore};
use crate::config::DifficultyMapping;
use crate::types::{MAX_DIFFICULTY, MIN_DIFFICULTY};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Recognition,
    Cloze,
    Production,
    TimedRecognition,
    TimedProduction,
}

impl TaskKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "recognition" => Some(Self::Recognition),
            "cloze" => Some(Self::Cloze),
            "production" => Some(Self::Production),
            "timed_recognition" => Some(Self::TimedRecognition),
            "timed_production" => Some(Self::TimedProduction),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Recognition => "recognition",
            Self::Cloze => "cloze",
            Self::Production => "production",
            Self::TimedRecognition => "timed_recognition",
            Self::TimedProduction => "timed_production",
        }
    }

    pub fn is_timed(&self) -> bool {
        matches!(self, Self::TimedRecognition | Self::TimedProduction)
    }

    fn modifier(&self, mapping: &DifficultyMapping) -> f64 {
        let base = match self {
            Self::Recognition | Self::TimedRecognition => mapping.recognition,
            Self::Cloze => mapping.cloze,
            Self::Production | Self::TimedProduction => mapping.production,
        };
        if self.is_timed() {
            base + mapping.timed_pressure
        } else {
            base
        }
    }
}

/// Difficulty logit for an item whose predictability is `npmi`.
///
/// Strongly associated pairs are easier: NPMI +1 lands at `-logit_span`
/// before the task offset is added.
pub fn pmi_to_difficulty(npmi: f64, kind: TaskKind, mapping: &DifficultyMapping) -> f64 {
    let npmi = if npmi.is_finite() {
        npmi.clamp(-1.0, 1.0)
    } else {
        0.0
    };
    (-npmi * mapping.logit_span + kind.modifier(mapping)).clamp(MIN_DIFFICULTY, MAX_DIFFICULTY)
}

pub fn score_to_difficulty(score: &PmiScore, kind: TaskKind, mapping: &DifficultyMapping) -> f64 {
    pmi_to_difficulty(score.npmi, kind, mapping)
}

/// Difficulty for the pair, or `None` when PMI is undefined.
pub fn collocation_difficulty(
    index: &CollocationIndex,
    w1: &str,
    w2: &str,
    kind: TaskKind,
    mapping: &DifficultyMapping,
) -> Option<f64> {
    index
        .compute_pmi(w1, w2)
        .map(|score| score_to_difficulty(&score, kind, mapping))
}
