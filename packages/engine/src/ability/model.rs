//! Logistic response model
//!
//! P(correct | θ) = c + (1 - c) / (1 + exp(-a(θ - b)))
//!
//! - `c = 0` gives the two-parameter model
//! - `a = 1, c = 0` gives the Rasch model

use serde::{Deserialize, Serialize};

use crate::sanitize::clamp_probability;
use crate::types::{EPSILON, MAX_LOGIT};

/// Per-item response model parameters.
///
/// Valid ranges: discrimination in [0.2, 3.0], difficulty in [-4, 4],
/// guessing in [0, 1). Callers validate before handing items to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemParameters {
    pub item_id: String,
    pub discrimination: f64,
    pub difficulty: f64,
    #[serde(default)]
    pub guessing: f64,
}

impl ItemParameters {
    pub fn new(item_id: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            discrimination: 1.0,
            difficulty: 0.0,
            guessing: 0.0,
        }
    }

    pub fn rasch(item_id: impl Into<String>, difficulty: f64) -> Self {
        Self {
            difficulty,
            ..Self::new(item_id)
        }
    }

    pub fn two_pl(item_id: impl Into<String>, discrimination: f64, difficulty: f64) -> Self {
        Self {
            discrimination,
            difficulty,
            ..Self::new(item_id)
        }
    }

    pub fn three_pl(
        item_id: impl Into<String>,
        discrimination: f64,
        difficulty: f64,
        guessing: f64,
    ) -> Self {
        Self {
            discrimination,
            difficulty,
            guessing,
            ..Self::new(item_id)
        }
    }

    pub fn probability(&self, theta: f64) -> f64 {
        probability(theta, self.discrimination, self.difficulty, self.guessing)
    }

    pub fn information(&self, theta: f64) -> f64 {
        fisher_information(theta, self)
    }
}

pub fn logistic(z: f64) -> f64 {
    let z = z.clamp(-MAX_LOGIT, MAX_LOGIT);
    1.0 / (1.0 + (-z).exp())
}

pub fn probability(theta: f64, discrimination: f64, difficulty: f64, guessing: f64) -> f64 {
    guessing + (1.0 - guessing) * logistic(discrimination * (theta - difficulty))
}

/// Item information at θ. Reduces to a²·P·(1-P) without a guessing floor.
pub fn fisher_information(theta: f64, item: &ItemParameters) -> f64 {
    let p = item.probability(theta);
    let c = item.guessing;
    if p <= c + EPSILON || p >= 1.0 - EPSILON || p <= EPSILON {
        return 0.0;
    }
    let a = item.discrimination;
    let lift = (p - c) / (1.0 - c);
    a * a * lift * lift * (1.0 - p) / p
}

pub fn log_likelihood(theta: f64, responses: &[bool], items: &[ItemParameters]) -> f64 {
    responses
        .iter()
        .zip(items)
        .map(|(&correct, item)| {
            let p = clamp_probability(item.probability(theta));
            if correct {
                p.ln()
            } else {
                (1.0 - p).ln()
            }
        })
        .sum()
}

/// Score (first derivative of the log-likelihood) and test information at θ.
pub(crate) fn score_and_information(
    theta: f64,
    responses: &[bool],
    items: &[ItemParameters],
) -> (f64, f64) {
    let mut score = 0.0;
    let mut information = 0.0;
    for (&correct, item) in responses.iter().zip(items) {
        let p = clamp_probability(item.probability(theta));
        let c = item.guessing;
        let u = if correct { 1.0 } else { 0.0 };
        score += item.discrimination * (u - p) * (p - c) / (p * (1.0 - c));
        information += fisher_information(theta, item);
    }
    (score, information)
}

// ==================== Quadrature ====================

/// Discrete distribution over ability nodes.
///
/// Built from a normal prior with [`Quadrature::normal`]; posteriors share
/// the same node grid with reweighted mass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quadrature {
    pub nodes: Vec<f64>,
    pub weights: Vec<f64>,
}

impl Quadrature {
    /// Equally spaced nodes over mean ± 4 SD with normal-density weights.
    pub fn normal(mean: f64, sd: f64, points: usize) -> Self {
        let points = points.max(2);
        let sd = sd.max(EPSILON);
        let lo = mean - 4.0 * sd;
        let step = 8.0 * sd / (points - 1) as f64;

        let nodes: Vec<f64> = (0..points).map(|i| lo + step * i as f64).collect();
        let mut weights: Vec<f64> = nodes
            .iter()
            .map(|x| {
                let z = (x - mean) / sd;
                (-0.5 * z * z).exp()
            })
            .collect();
        normalize(&mut weights);

        Self { nodes, weights }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn mean(&self) -> f64 {
        self.nodes
            .iter()
            .zip(&self.weights)
            .map(|(x, w)| x * w)
            .sum()
    }

    pub fn standard_deviation(&self) -> f64 {
        let mean = self.mean();
        let var: f64 = self
            .nodes
            .iter()
            .zip(&self.weights)
            .map(|(x, w)| w * (x - mean).powi(2))
            .sum();
        var.max(0.0).sqrt()
    }

    /// Reweight this grid by the likelihood of a response pattern.
    pub fn posterior(&self, responses: &[bool], items: &[ItemParameters]) -> Quadrature {
        let log_post: Vec<f64> = self
            .nodes
            .iter()
            .zip(&self.weights)
            .map(|(&theta, &w)| w.max(f64::MIN_POSITIVE).ln() + log_likelihood(theta, responses, items))
            .collect();

        Quadrature {
            nodes: self.nodes.clone(),
            weights: softmax(&log_post),
        }
    }
}

/// Exponentiate log-weights after subtracting the maximum, then normalize.
pub(crate) fn softmax(log_weights: &[f64]) -> Vec<f64> {
    let max = log_weights
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    let mut weights: Vec<f64> = log_weights.iter().map(|lw| (lw - max).exp()).collect();
    normalize(&mut weights);
    weights
}

fn normalize(weights: &mut [f64]) {
    let total: f64 = weights.iter().sum();
    if total > 0.0 && total.is_finite() {
        for w in weights.iter_mut() {
            *w /= total;
        }
    } else if !weights.is_empty() {
        let uniform = 1.0 / weights.len() as f64;
        weights.iter_mut().for_each(|w| *w = uniform);
    }
}
