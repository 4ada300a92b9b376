//! Error types shared by all engine components.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("insufficient data for {context}: need {required}, have {actual}")]
    InsufficientData {
        context: &'static str,
        required: usize,
        actual: usize,
    },
    #[error("estimation did not converge after {iterations} iterations (last step {last_step})")]
    NonConvergence { iterations: usize, last_step: f64 },
    #[error("response count {responses} does not match item count {items}")]
    LengthMismatch { responses: usize, items: usize },
    #[error("empty input: {0}")]
    EmptyInput(&'static str),
    #[error("response matrix row {row} has {actual} cells, expected {expected}")]
    RaggedMatrix {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, Self::InsufficientData { .. })
    }
}
