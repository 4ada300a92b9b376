//! # lexis-engine - adaptive learning decision core
//!
//! Pure, synchronous computations behind an adaptive vocabulary trainer:
//!
//! - **Ability Estimator** - logistic IRT, MLE/EAP ability, Fisher/KL item
//!   selection, EM item calibration
//! - **Review Scheduler** - stability/difficulty memory model, rating policy,
//!   mastery stages
//! - **Collocation Analyzer** - windowed PMI/NPMI with Dunning significance,
//!   NPMI to difficulty mapping
//! - **Priority Ranker** - value over cost, scaled by review urgency
//! - **Bottleneck Detector** - per-component error rates and cascade
//!   root-cause inference
//!
//! Every entry point takes its inputs and configuration explicitly and
//! returns new values; callers own persistence.
//!
//! ## Modules
//!
//! - [`ability`] - response model, estimators, selection, calibration
//! - [`scheduler`] - review cards, scheduling, mastery
//! - [`collocation`] - corpus index and association statistics
//! - [`ranker`] - priority and queue ordering
//! - [`bottleneck`] - error-cascade diagnosis
//! - [`config`] - configuration tree with env overrides
//! - [`sanitize`] - numeric guards
//! - [`types`] - shared types and constants
//!
//! ## Example
//!
//! ```rust
//! use lexis_engine::{estimate_ability, select_next_item, AbilityConfig, ItemParameters};
//!
//! let items: Vec<ItemParameters> = (0..6)
//!     .map(|i| ItemParameters::rasch(format!("w{i}"), i as f64 * 0.5 - 1.5))
//!     .collect();
//! let responses = [true, true, true, false, true, false];
//!
//! let estimate = estimate_ability(&responses, &items, &AbilityConfig::default()).unwrap();
//! assert!(estimate.theta.is_finite());
//!
//! let next = select_next_item(estimate.theta, &items).unwrap();
//! assert!(items.iter().any(|i| i.item_id == next.item_id));
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod ability;
pub mod bottleneck;
pub mod collocation;
pub mod config;
pub mod error;
pub mod ranker;
pub mod sanitize;
pub mod scheduler;
pub mod types;

// ============================================================================
// Re-exports
// ============================================================================

pub use types::*;

pub use error::{CoreError, Result};

pub use config::{
    AbilityConfig, BottleneckConfig, CalibrationConfig, CollocationConfig, CostConfig,
    DifficultyMapping, EngineConfig, MasteryConfig, PriorityConfig, ProfileName, RatingPolicy,
    SchedulerParams, StageThresholds, UrgencyConfig, WeightProfile,
};

/// Ability Estimator
pub use ability::{
    calibrate_items, estimate_ability, estimate_eap, estimate_mle, select_item_adaptive,
    select_next_item, select_next_item_kl, AbilityEstimate, AbilityState, CalibrationReport,
    EstimationMethod, ItemParameters, ResponseMatrix,
};

/// Review Scheduler
pub use scheduler::{
    determine_stage, process_response, CardState, MasteryRecord, MasteryStage, Rating,
    ReviewCard, ReviewOutcome, Scheduler,
};

/// Collocation Analyzer
pub use collocation::{
    pmi_to_difficulty, tokenize, CollocationIndex, CollocationPair, PmiScore,
    SharedCollocationIndex, TaskKind,
};

/// Priority Ranker
pub use ranker::{
    compute_priority, compute_urgency, rank_items, LearnableItem, RankedItem, UserItemState,
};

/// Bottleneck Detector
pub use bottleneck::{detect_bottleneck, BottleneckReport, ComponentStats, RootCause, Trend};
