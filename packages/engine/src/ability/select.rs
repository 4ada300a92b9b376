//! Adaptive item selection
//!
//! - Maximum Fisher information at the current point estimate
//! - KL information integrated over the ability posterior, preferred while
//!   the estimate is still uncertain

use std::cmp::Ordering;

use super::estimate::AbilityEstimate;
use super::model::{fisher_information, ItemParameters, Quadrature};
use crate::config::AbilityConfig;
use crate::sanitize::{clamp_probability, finite_or};

/// Bernoulli KL divergence KL(p || q)
fn bernoulli_kl(p: f64, q: f64) -> f64 {
    let p = clamp_probability(p);
    let q = clamp_probability(q);
    p * (p / q).ln() + (1.0 - p) * ((1.0 - p) / (1.0 - q)).ln()
}

/// Expected KL information of `item` between `theta_hat` and abilities
/// drawn from `posterior`.
pub fn kl_information(item: &ItemParameters, theta_hat: f64, posterior: &Quadrature) -> f64 {
    let p_hat = item.probability(theta_hat);
    posterior
        .nodes
        .iter()
        .zip(&posterior.weights)
        .map(|(&theta, &w)| w * bernoulli_kl(p_hat, item.probability(theta)))
        .sum()
}

/// Highest score first, lowest item id on ties.
fn pick_best<'a>(
    candidates: &'a [ItemParameters],
    score: impl Fn(&ItemParameters) -> f64,
) -> Option<&'a ItemParameters> {
    candidates
        .iter()
        .map(|item| (item, finite_or(score(item), 0.0)))
        .max_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.0.item_id.cmp(&a.0.item_id))
        })
        .map(|(item, _)| item)
}

/// Candidate with maximal Fisher information at `theta`.
pub fn select_next_item(theta: f64, candidates: &[ItemParameters]) -> Option<&ItemParameters> {
    pick_best(candidates, |item| fisher_information(theta, item))
}

/// Candidate with maximal posterior-weighted KL information.
///
/// The posterior is approximated by a normal centred on the estimate with
/// the estimate's standard error.
pub fn select_next_item_kl<'a>(
    estimate: &AbilityEstimate,
    candidates: &'a [ItemParameters],
    config: &AbilityConfig,
) -> Option<&'a ItemParameters> {
    let posterior = Quadrature::normal(
        estimate.theta,
        estimate.standard_error.max(0.05),
        config.quadrature_points,
    );
    pick_best(candidates, |item| kl_information(item, estimate.theta, &posterior))
}

/// KL selection while `standard_error` exceeds the configured switch point,
/// Fisher information afterwards.
pub fn select_item_adaptive<'a>(
    estimate: &AbilityEstimate,
    candidates: &'a [ItemParameters],
    config: &AbilityConfig,
) -> Option<&'a ItemParameters> {
    if estimate.standard_error > config.kl_switch_standard_error {
        select_next_item_kl(estimate, candidates, config)
    } else {
        select_next_item(estimate.theta, candidates)
    }
}
