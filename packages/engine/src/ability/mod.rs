//! Ability Estimator
//!
//! Contains:
//! - Logistic 1PL/2PL/3PL response model and quadrature grid
//! - MLE and EAP ability estimation with fallback
//! - Fisher and KL item selection
//! - EM item calibration with a standard-error acceptance gate
//! - Global and per-component ability state
//! - Response simulation

pub mod calibrate;
pub mod estimate;
pub mod model;
pub mod select;
pub mod simulate;
pub mod state;

pub use calibrate::{
    calibrate_items, CalibratedItem, CalibrationReport, ItemCalibrationStatus, ResponseMatrix,
    StandardErrors,
};
pub use estimate::{
    estimate_ability, estimate_eap, estimate_mle, AbilityEstimate, EstimationMethod,
};
pub use model::{fisher_information, log_likelihood, probability, ItemParameters, Quadrature};
pub use select::{kl_information, select_item_adaptive, select_next_item, select_next_item_kl};
pub use simulate::{sample_standard_normal, simulate_population, simulate_responses};
pub use state::{AbilityScore, AbilityState, ScoredResponse};
