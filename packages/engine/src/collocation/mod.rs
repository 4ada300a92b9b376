//! Collocation Analyzer
//!
//! Contains:
//! - Tokenizer and windowed co-occurrence index
//! - PMI, NPMI and Dunning log-likelihood significance
//! - Atomically replaceable shared index
//! - NPMI to difficulty-logit mapping per task kind

pub mod difficulty;
pub mod index;
pub mod shared;

pub use difficulty::{collocation_difficulty, pmi_to_difficulty, score_to_difficulty, TaskKind};
pub use index::{dunning_llr, tokenize, CollocationIndex, CollocationPair, PmiScore};
pub use shared::SharedCollocationIndex;
