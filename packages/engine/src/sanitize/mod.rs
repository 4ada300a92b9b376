//! Data Sanitization
//!
//! Numerical stability utilities.
//!
//! Functions:
//! - Finite-value guards and clamping
//! - Probability clamping for log-likelihood terms
//! - Item parameter health diagnostics

use serde::{Deserialize, Serialize};

use crate::ability::ItemParameters;
use crate::types::{
    EPSILON, MAX_DIFFICULTY, MAX_DISCRIMINATION, MIN_DIFFICULTY, MIN_DISCRIMINATION,
};

/// Replace a non-finite value with `fallback`
pub fn finite_or(x: f64, fallback: f64) -> f64 {
    if x.is_finite() {
        x
    } else {
        fallback
    }
}

/// Clamp into `[lo, hi]`. NaN maps to `fallback`; infinities clamp to the
/// nearest bound.
pub fn clamp_finite(x: f64, lo: f64, hi: f64, fallback: f64) -> f64 {
    if x.is_nan() {
        return fallback.clamp(lo, hi);
    }
    x.clamp(lo, hi)
}

/// Keep a probability away from 0 and 1 before taking logs
pub fn clamp_probability(p: f64) -> f64 {
    clamp_finite(p, EPSILON, 1.0 - EPSILON, 0.5)
}

/// Item parameter health report
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticResult {
    pub is_healthy: bool,
    pub has_nan: bool,
    pub has_inf: bool,
    pub out_of_bounds: usize,
    pub message: String,
}

/// Diagnose a parameter set before it is handed to an estimator
pub fn diagnose_items(items: &[ItemParameters]) -> DiagnosticResult {
    let mut has_nan = false;
    let mut has_inf = false;
    let mut out_of_bounds = 0;

    for item in items {
        let values = [item.discrimination, item.difficulty, item.guessing];
        has_nan |= values.iter().any(|v| v.is_nan());
        has_inf |= values.iter().any(|v| v.is_infinite());

        let in_bounds = (MIN_DISCRIMINATION..=MAX_DISCRIMINATION).contains(&item.discrimination)
            && (MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&item.difficulty)
            && (0.0..1.0).contains(&item.guessing);
        if !in_bounds {
            out_of_bounds += 1;
        }
    }

    let is_healthy = !has_nan && !has_inf && out_of_bounds == 0;

    let message = if is_healthy {
        "Item parameters are healthy".to_string()
    } else if has_nan {
        "Item parameters contain NaN values".to_string()
    } else if has_inf {
        "Item parameters contain infinite values".to_string()
    } else {
        format!("{} item(s) have parameters out of bounds", out_of_bounds)
    };

    DiagnosticResult {
        is_healthy,
        has_nan,
        has_inf,
        out_of_bounds,
        message,
    }
}
