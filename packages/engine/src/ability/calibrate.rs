//! Item calibration
//!
//! Marginal EM over a respondents × items response matrix:
//! - E-step: posterior over the quadrature grid for every respondent
//!   (EAP ability), accumulated into expected counts per item and node
//! - M-step: one diagonal-Hessian Newton step per item on discrimination
//!   and difficulty with a light L2 penalty, clamped to bounds
//!
//! Calibration refuses to run on samples below the configured minimums and
//! only marks items as accepted when both standard errors clear the
//! acceptance gate.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::estimate::{AbilityEstimate, EstimationMethod};
use super::model::{logistic, softmax, ItemParameters, Quadrature};
use crate::config::{AbilityConfig, CalibrationConfig};
use crate::error::{CoreError, Result};
use crate::sanitize::{clamp_finite, clamp_probability, diagnose_items};
use crate::types::{
    EPSILON, MAX_DIFFICULTY, MAX_DISCRIMINATION, MIN_DIFFICULTY, MIN_DISCRIMINATION,
};

// ==================== Response Matrix ====================

/// Respondents × items. `None` marks an item the respondent never saw.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMatrix {
    item_ids: Vec<String>,
    rows: Vec<Vec<Option<bool>>>,
}

impl ResponseMatrix {
    pub fn new(item_ids: Vec<String>, rows: Vec<Vec<Option<bool>>>) -> Result<Self> {
        for (row, cells) in rows.iter().enumerate() {
            if cells.len() != item_ids.len() {
                return Err(CoreError::RaggedMatrix {
                    row,
                    expected: item_ids.len(),
                    actual: cells.len(),
                });
            }
        }
        Ok(Self { item_ids, rows })
    }

    pub fn from_dense(item_ids: Vec<String>, rows: Vec<Vec<bool>>) -> Result<Self> {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(Some).collect())
            .collect();
        Self::new(item_ids, rows)
    }

    /// Build from `(respondent, item, correct)` triples. Respondents and
    /// items are ordered by id; a repeated pair keeps its last response.
    pub fn from_responses<'a>(responses: impl IntoIterator<Item = (&'a str, &'a str, bool)>) -> Self {
        let mut by_respondent: BTreeMap<&str, HashMap<&str, bool>> = BTreeMap::new();
        let mut items: BTreeSet<&str> = BTreeSet::new();
        for (respondent, item, correct) in responses {
            by_respondent.entry(respondent).or_default().insert(item, correct);
            items.insert(item);
        }

        let item_ids: Vec<String> = items.iter().map(|s| s.to_string()).collect();
        let rows = by_respondent
            .values()
            .map(|answers| items.iter().map(|id| answers.get(id).copied()).collect())
            .collect();

        Self { item_ids, rows }
    }

    pub(crate) fn from_rows_unchecked(item_ids: Vec<String>, rows: Vec<Vec<Option<bool>>>) -> Self {
        Self { item_ids, rows }
    }

    pub fn respondents(&self) -> usize {
        self.rows.len()
    }

    /// Rows with at least one answered item.
    pub fn active_respondents(&self) -> usize {
        self.rows
            .iter()
            .filter(|row| row.iter().any(Option::is_some))
            .count()
    }

    pub fn items(&self) -> usize {
        self.item_ids.len()
    }

    pub fn item_ids(&self) -> &[String] {
        &self.item_ids
    }

    pub fn rows(&self) -> &[Vec<Option<bool>>] {
        &self.rows
    }

    pub fn responses_per_item(&self) -> Vec<usize> {
        let mut counts = vec![0; self.item_ids.len()];
        for row in &self.rows {
            for (j, cell) in row.iter().enumerate() {
                if cell.is_some() {
                    counts[j] += 1;
                }
            }
        }
        counts
    }
}

// ==================== Report ====================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardErrors {
    pub discrimination: f64,
    pub difficulty: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCalibrationStatus {
    Accepted,
    StandardErrorTooLarge,
    InsufficientResponses,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibratedItem {
    pub parameters: ItemParameters,
    pub standard_errors: Option<StandardErrors>,
    pub responses: usize,
    pub status: ItemCalibrationStatus,
}

impl CalibratedItem {
    pub fn is_accepted(&self) -> bool {
        self.status == ItemCalibrationStatus::Accepted
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationReport {
    pub items: Vec<CalibratedItem>,
    /// EAP ability per respondent under the final parameters
    pub respondents: Vec<AbilityEstimate>,
    pub iterations: usize,
    pub converged: bool,
    /// Marginal log-likelihood under the final parameters
    pub log_likelihood: f64,
}

impl CalibrationReport {
    pub fn accepted_items(&self) -> impl Iterator<Item = &ItemParameters> {
        self.items
            .iter()
            .filter(|item| item.is_accepted())
            .map(|item| &item.parameters)
    }

    /// Current parameters with accepted items replaced; everything else is
    /// left as it was.
    pub fn apply(&self, current: &[ItemParameters]) -> Vec<ItemParameters> {
        let accepted: HashMap<&str, &ItemParameters> = self
            .accepted_items()
            .map(|p| (p.item_id.as_str(), p))
            .collect();

        current
            .iter()
            .map(|item| match accepted.get(item.item_id.as_str()) {
                Some(updated) => (*updated).clone(),
                None => item.clone(),
            })
            .collect()
    }
}

// ==================== EM ====================

#[derive(Debug, Clone)]
struct NodeCounts {
    /// Expected respondents at each node who answered the item
    n: Vec<f64>,
    /// Expected correct answers at each node
    r: Vec<f64>,
}

impl NodeCounts {
    fn zeros(nodes: usize) -> Self {
        Self {
            n: vec![0.0; nodes],
            r: vec![0.0; nodes],
        }
    }
}

struct Expectation {
    counts: Vec<NodeCounts>,
    posteriors: Vec<Vec<f64>>,
    log_likelihood: f64,
}

fn expectation(matrix: &ResponseMatrix, params: &[ItemParameters], prior: &Quadrature) -> Expectation {
    let table: Vec<Vec<f64>> = params
        .iter()
        .map(|item| {
            prior
                .nodes
                .iter()
                .map(|&theta| clamp_probability(item.probability(theta)))
                .collect()
        })
        .collect();
    let log_prior: Vec<f64> = prior
        .weights
        .iter()
        .map(|w| w.max(f64::MIN_POSITIVE).ln())
        .collect();

    let per_row: Vec<(Vec<f64>, f64)> = matrix
        .rows
        .par_iter()
        .map(|row| {
            let mut log_post = log_prior.clone();
            for (j, cell) in row.iter().enumerate() {
                if let Some(correct) = cell {
                    for (q, lp) in log_post.iter_mut().enumerate() {
                        let p = table[j][q];
                        *lp += if *correct { p.ln() } else { (1.0 - p).ln() };
                    }
                }
            }
            let max = log_post.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let marginal = max + log_post.iter().map(|lp| (lp - max).exp()).sum::<f64>().ln();
            (softmax(&log_post), marginal)
        })
        .collect();

    let mut counts = vec![NodeCounts::zeros(prior.len()); params.len()];
    for ((weights, _), row) in per_row.iter().zip(&matrix.rows) {
        for (j, cell) in row.iter().enumerate() {
            if let Some(correct) = cell {
                let c = &mut counts[j];
                for (q, w) in weights.iter().enumerate() {
                    c.n[q] += w;
                    if *correct {
                        c.r[q] += w;
                    }
                }
            }
        }
    }

    let log_likelihood = per_row.iter().map(|(_, m)| m).sum();
    let posteriors = per_row.into_iter().map(|(w, _)| w).collect();

    Expectation {
        counts,
        posteriors,
        log_likelihood,
    }
}

/// Penalized gradient and diagonal expected information for (a, b).
fn gradient_and_information(
    item: &ItemParameters,
    counts: &NodeCounts,
    nodes: &[f64],
    regularization: f64,
) -> ([f64; 2], [f64; 2]) {
    let a = item.discrimination;
    let b = item.difficulty;
    let c = item.guessing;

    let mut grad = [0.0, 0.0];
    let mut info = [0.0, 0.0];
    for (q, &theta) in nodes.iter().enumerate() {
        let n = counts.n[q];
        if n <= EPSILON {
            continue;
        }
        let p_star = logistic(a * (theta - b));
        let p = clamp_probability(c + (1.0 - c) * p_star);
        let dp = (1.0 - c) * p_star * (1.0 - p_star);
        let pq = p * (1.0 - p);
        let d = theta - b;

        let residual = (counts.r[q] - n * p) * dp / pq;
        let weight = n * dp * dp / pq;

        grad[0] += residual * d;
        grad[1] -= residual * a;
        info[0] += weight * d * d;
        info[1] += weight * a * a;
    }

    grad[0] -= regularization * (a - 1.0);
    grad[1] -= regularization * b;
    info[0] += regularization;
    info[1] += regularization;

    (grad, info)
}

fn maximization_step(
    item: &ItemParameters,
    counts: &NodeCounts,
    nodes: &[f64],
    config: &CalibrationConfig,
) -> ItemParameters {
    let (grad, info) = gradient_and_information(item, counts, nodes, config.regularization);
    let step_a = (grad[0] / info[0].max(EPSILON)).clamp(-config.max_step, config.max_step);
    let step_b = (grad[1] / info[1].max(EPSILON)).clamp(-config.max_step, config.max_step);

    bounded(ItemParameters {
        discrimination: item.discrimination + step_a,
        difficulty: item.difficulty + step_b,
        ..item.clone()
    })
}

fn bounded(mut item: ItemParameters) -> ItemParameters {
    item.discrimination =
        clamp_finite(item.discrimination, MIN_DISCRIMINATION, MAX_DISCRIMINATION, 1.0);
    item.difficulty = clamp_finite(item.difficulty, MIN_DIFFICULTY, MAX_DIFFICULTY, 0.0);
    item.guessing = clamp_finite(item.guessing, 0.0, 0.99, 0.0);
    item
}

/// Re-estimate item parameters from accumulated responses.
///
/// `current` supplies starting values by item id; items absent from it start
/// at the defaults. Guessing floors are held fixed. Returns
/// `InsufficientData` without touching any parameters when the matrix has
/// too few respondents or too few items with enough responses.
pub fn calibrate_items(
    matrix: &ResponseMatrix,
    current: &[ItemParameters],
    ability: &AbilityConfig,
    config: &CalibrationConfig,
) -> Result<CalibrationReport> {
    let respondents = matrix.active_respondents();
    if respondents < config.min_respondents {
        tracing::warn!(
            respondents,
            required = config.min_respondents,
            "Calibration skipped: too few respondents"
        );
        return Err(CoreError::InsufficientData {
            context: "calibration respondents",
            required: config.min_respondents,
            actual: respondents,
        });
    }

    let responses = matrix.responses_per_item();
    let eligible: Vec<bool> = responses
        .iter()
        .map(|&n| n >= config.min_responses_per_item)
        .collect();
    let eligible_count = eligible.iter().filter(|&&e| e).count();
    if eligible_count < config.min_items {
        tracing::warn!(
            items = matrix.items(),
            eligible = eligible_count,
            required = config.min_items,
            "Calibration skipped: too few items with enough responses"
        );
        return Err(CoreError::InsufficientData {
            context: "calibration items",
            required: config.min_items,
            actual: eligible_count,
        });
    }

    let diagnostics = diagnose_items(current);
    if !diagnostics.is_healthy {
        tracing::warn!(
            out_of_bounds = diagnostics.out_of_bounds,
            message = %diagnostics.message,
            "Starting parameters clamped before calibration"
        );
    }

    let by_id: HashMap<&str, &ItemParameters> =
        current.iter().map(|p| (p.item_id.as_str(), p)).collect();
    let mut params: Vec<ItemParameters> = matrix
        .item_ids
        .iter()
        .map(|id| match by_id.get(id.as_str()) {
            Some(p) => bounded((*p).clone()),
            None => ItemParameters::new(id.clone()),
        })
        .collect();

    let prior = Quadrature::normal(ability.prior_mean, ability.prior_sd, ability.quadrature_points);

    let mut iterations = 0;
    let mut converged = false;
    for iteration in 1..=config.max_iterations {
        iterations = iteration;
        let estep = expectation(matrix, &params, &prior);

        let mut max_change: f64 = 0.0;
        for (j, item) in params.iter_mut().enumerate() {
            if !eligible[j] {
                continue;
            }
            let next = maximization_step(item, &estep.counts[j], &prior.nodes, config);
            max_change = max_change
                .max((next.discrimination - item.discrimination).abs())
                .max((next.difficulty - item.difficulty).abs());
            *item = next;
        }

        tracing::debug!(
            iteration,
            max_change,
            log_likelihood = estep.log_likelihood,
            "Calibration EM iteration"
        );
        if max_change < config.tolerance {
            converged = true;
            break;
        }
    }

    let estep = expectation(matrix, &params, &prior);

    let items: Vec<CalibratedItem> = params
        .into_iter()
        .enumerate()
        .map(|(j, parameters)| {
            if !eligible[j] {
                return CalibratedItem {
                    parameters,
                    standard_errors: None,
                    responses: responses[j],
                    status: ItemCalibrationStatus::InsufficientResponses,
                };
            }
            let (_, info) = gradient_and_information(
                &parameters,
                &estep.counts[j],
                &prior.nodes,
                config.regularization,
            );
            let se = StandardErrors {
                discrimination: 1.0 / info[0].max(EPSILON).sqrt(),
                difficulty: 1.0 / info[1].max(EPSILON).sqrt(),
            };
            let status = if se.discrimination <= config.max_discrimination_se
                && se.difficulty <= config.max_difficulty_se
            {
                ItemCalibrationStatus::Accepted
            } else {
                ItemCalibrationStatus::StandardErrorTooLarge
            };
            CalibratedItem {
                parameters,
                standard_errors: Some(se),
                responses: responses[j],
                status,
            }
        })
        .collect();

    let respondent_estimates = estep
        .posteriors
        .into_iter()
        .map(|weights| {
            let posterior = Quadrature {
                nodes: prior.nodes.clone(),
                weights,
            };
            AbilityEstimate {
                theta: posterior.mean().clamp(ability.theta_min, ability.theta_max),
                standard_error: posterior.standard_deviation(),
                method: EstimationMethod::ExpectedAPosteriori,
                iterations,
                converged,
            }
        })
        .collect();

    let accepted = items.iter().filter(|i| i.is_accepted()).count();
    tracing::info!(
        respondents,
        items = items.len(),
        accepted,
        iterations,
        converged,
        log_likelihood = estep.log_likelihood,
        "Item calibration finished"
    );

    Ok(CalibrationReport {
        items,
        respondents: respondent_estimates,
        iterations,
        converged,
        log_likelihood: estep.log_likelihood,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ability::simulate::simulate_population;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn true_items() -> Vec<ItemParameters> {
        let shapes = [
            (0.8, -1.5),
            (1.0, -1.0),
            (1.2, -0.5),
            (1.5, 0.0),
            (1.0, 0.3),
            (0.9, 0.7),
            (1.3, 1.0),
            (1.1, 1.5),
        ];
        shapes.iter()
            .enumerate()
            .map(|(i, &(a, b))| ItemParameters::two_pl(format!("item{i}"), a, b))
            .collect()
    }

    #[test]
    fn test_insufficient_respondents() {
        let matrix = ResponseMatrix::from_dense(
            vec!["a".into(), "b".into()],
            vec![vec![true, false], vec![false, true], vec![true, true]],
        )
        .unwrap();
        let err = calibrate_items(
            &matrix,
            &[],
            &AbilityConfig::default(),
            &CalibrationConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientData {
                required: 5,
                actual: 3,
                ..
            }
        ));
    }

    #[test]
    fn test_unanswered_rows_are_not_respondents() {
        let mut rows = vec![vec![None, None]; 3];
        rows.push(vec![Some(true), Some(false)]);
        rows.push(vec![Some(false), Some(true)]);
        let matrix = ResponseMatrix::new(vec!["a".into(), "b".into()], rows).unwrap();
        assert_eq!(matrix.respondents(), 5);
        assert_eq!(matrix.active_respondents(), 2);

        let config = CalibrationConfig {
            min_respondents: 5,
            min_responses_per_item: 2,
            ..CalibrationConfig::default()
        };
        let err = calibrate_items(&matrix, &[], &AbilityConfig::default(), &config).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientData {
                required: 5,
                actual: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_insufficient_items_with_responses() {
        let rows: Vec<Vec<Option<bool>>> = (0..10)
            .map(|i| vec![Some(i % 2 == 0), if i < 2 { Some(true) } else { None }])
            .collect();
        let matrix = ResponseMatrix::new(vec!["a".into(), "b".into()], rows).unwrap();
        let err = calibrate_items(
            &matrix,
            &[],
            &AbilityConfig::default(),
            &CalibrationConfig::default(),
        )
        .unwrap_err();
        assert!(err.is_insufficient_data());
    }

    #[test]
    fn test_ragged_matrix_rejected() {
        let err = ResponseMatrix::new(vec!["a".into()], vec![vec![Some(true), None]]).unwrap_err();
        assert!(matches!(err, CoreError::RaggedMatrix { row: 0, .. }));
    }

    #[test]
    fn test_from_responses_orders_ids() {
        let matrix = ResponseMatrix::from_responses(vec![
            ("u2", "w2", true),
            ("u1", "w1", false),
            ("u1", "w2", true),
        ]);
        assert_eq!(matrix.item_ids(), &["w1".to_string(), "w2".to_string()]);
        assert_eq!(matrix.rows()[0], vec![Some(false), Some(true)]);
        assert_eq!(matrix.rows()[1], vec![None, Some(true)]);
        assert_eq!(matrix.responses_per_item(), vec![1, 2]);
    }

    #[test]
    fn test_recovers_generating_parameters() {
        let truth = true_items();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let (_, matrix) = simulate_population(800, &truth, &mut rng);

        let report = calibrate_items(
            &matrix,
            &[],
            &AbilityConfig::default(),
            &CalibrationConfig::default(),
        )
        .unwrap();

        assert_eq!(report.items.len(), truth.len());
        assert_eq!(report.respondents.len(), 800);
        assert!(report.log_likelihood.is_finite());

        let mean_abs_b: f64 = report
            .items
            .iter()
            .zip(&truth)
            .map(|(est, t)| (est.parameters.difficulty - t.difficulty).abs())
            .sum::<f64>()
            / truth.len() as f64;
        assert!(mean_abs_b < 0.25, "mean |b error| = {mean_abs_b}");

        for (est, t) in report.items.iter().zip(&truth) {
            assert!(est.is_accepted(), "{:?}", est);
            assert!(
                (est.parameters.discrimination - t.discrimination).abs() < 0.6,
                "{:?} vs {:?}",
                est.parameters,
                t
            );
        }
    }

    #[test]
    fn test_strict_gate_rejects_and_apply_keeps_current() {
        let truth = true_items();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let (_, matrix) = simulate_population(40, &truth, &mut rng);

        let config = CalibrationConfig {
            max_difficulty_se: 1e-6,
            ..CalibrationConfig::default()
        };
        let current: Vec<_> = truth
            .iter()
            .map(|t| ItemParameters::new(t.item_id.clone()))
            .collect();
        let report = calibrate_items(&matrix, &current, &AbilityConfig::default(), &config).unwrap();

        assert_eq!(report.accepted_items().count(), 0);
        assert!(report
            .items
            .iter()
            .all(|i| i.status == ItemCalibrationStatus::StandardErrorTooLarge));
        assert_eq!(report.apply(&current), current);
    }

    #[test]
    fn test_parameters_stay_in_bounds() {
        // Everyone answers item "easy" correctly and item "hard" wrongly
        let rows: Vec<Vec<bool>> = (0..20).map(|i| vec![true, false, i % 2 == 0]).collect();
        let matrix = ResponseMatrix::from_dense(
            vec!["easy".into(), "hard".into(), "mid".into()],
            rows,
        )
        .unwrap();
        let report = calibrate_items(
            &matrix,
            &[],
            &AbilityConfig::default(),
            &CalibrationConfig::default(),
        )
        .unwrap();
        for item in &report.items {
            let p = &item.parameters;
            assert!((MIN_DISCRIMINATION..=MAX_DISCRIMINATION).contains(&p.discrimination));
            assert!((MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&p.difficulty));
        }
        assert!(report.items[0].parameters.difficulty < report.items[1].parameters.difficulty);
    }
}
