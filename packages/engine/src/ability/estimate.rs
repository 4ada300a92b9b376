//! Ability estimation
//!
//! - Maximum likelihood via Newton-Raphson (Fisher scoring)
//! - Expected a posteriori over a normal-prior quadrature grid
//! - `estimate_ability` tries MLE and falls back to EAP when the pattern is
//!   short, perfect, or the iteration fails to settle

use serde::{Deserialize, Serialize};

use super::model::{score_and_information, ItemParameters, Quadrature};
use crate::config::AbilityConfig;
use crate::error::{CoreError, Result};
use crate::types::EPSILON;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimationMethod {
    MaximumLikelihood,
    ExpectedAPosteriori,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbilityEstimate {
    pub theta: f64,
    /// 1/sqrt(information) for MLE, posterior SD for EAP
    pub standard_error: f64,
    pub method: EstimationMethod,
    pub iterations: usize,
    pub converged: bool,
}

fn check_shape(responses: &[bool], items: &[ItemParameters]) -> Result<()> {
    if responses.len() != items.len() {
        return Err(CoreError::LengthMismatch {
            responses: responses.len(),
            items: items.len(),
        });
    }
    Ok(())
}

/// Newton-Raphson maximum likelihood estimate.
///
/// Returns `NonConvergence` for perfect patterns (no finite maximum), when
/// the iteration pins against the ability bounds, or when the step never
/// drops below `tolerance` within `max_iterations`.
pub fn estimate_mle(
    responses: &[bool],
    items: &[ItemParameters],
    config: &AbilityConfig,
) -> Result<AbilityEstimate> {
    check_shape(responses, items)?;
    if responses.is_empty() {
        return Err(CoreError::EmptyInput("responses"));
    }

    let correct = responses.iter().filter(|&&r| r).count();
    if correct == 0 || correct == responses.len() {
        return Err(CoreError::NonConvergence {
            iterations: 0,
            last_step: f64::INFINITY,
        });
    }

    // Start from the logit of observed accuracy around the mean difficulty
    let accuracy = correct as f64 / responses.len() as f64;
    let mean_difficulty = items.iter().map(|i| i.difficulty).sum::<f64>() / items.len() as f64;
    let mut theta = (mean_difficulty + (accuracy / (1.0 - accuracy)).ln())
        .clamp(config.theta_min, config.theta_max);

    let mut last_step = f64::INFINITY;
    for iteration in 1..=config.max_iterations {
        let (score, information) = score_and_information(theta, responses, items);
        if information <= EPSILON || !score.is_finite() {
            return Err(CoreError::NonConvergence {
                iterations: iteration,
                last_step,
            });
        }

        let step = (score / information).clamp(-config.max_step, config.max_step);
        let next = (theta + step).clamp(config.theta_min, config.theta_max);
        last_step = next - theta;
        theta = next;

        if last_step.abs() < config.tolerance {
            let at_bound = theta - config.theta_min < config.tolerance
                || config.theta_max - theta < config.tolerance;
            if at_bound {
                return Err(CoreError::NonConvergence {
                    iterations: iteration,
                    last_step,
                });
            }

            let (_, information) = score_and_information(theta, responses, items);
            return Ok(AbilityEstimate {
                theta,
                standard_error: 1.0 / information.max(EPSILON).sqrt(),
                method: EstimationMethod::MaximumLikelihood,
                iterations: iteration,
                converged: true,
            });
        }
    }

    Err(CoreError::NonConvergence {
        iterations: config.max_iterations,
        last_step,
    })
}

/// Posterior mean under a normal prior. An empty pattern returns the prior.
pub fn estimate_eap(
    responses: &[bool],
    items: &[ItemParameters],
    config: &AbilityConfig,
) -> Result<AbilityEstimate> {
    check_shape(responses, items)?;

    let prior = Quadrature::normal(config.prior_mean, config.prior_sd, config.quadrature_points);
    let posterior = prior.posterior(responses, items);

    Ok(AbilityEstimate {
        theta: posterior.mean().clamp(config.theta_min, config.theta_max),
        standard_error: posterior.standard_deviation(),
        method: EstimationMethod::ExpectedAPosteriori,
        iterations: 0,
        converged: true,
    })
}

/// Ability estimate for a response pattern.
///
/// Uses MLE when there are at least `min_responses_for_mle` responses with
/// both outcomes present; otherwise, or if MLE fails to converge, the EAP
/// estimate is returned.
pub fn estimate_ability(
    responses: &[bool],
    items: &[ItemParameters],
    config: &AbilityConfig,
) -> Result<AbilityEstimate> {
    check_shape(responses, items)?;

    let mixed = responses.iter().any(|&r| r) && responses.iter().any(|&r| !r);
    if responses.len() >= config.min_responses_for_mle && mixed {
        match estimate_mle(responses, items, config) {
            Ok(estimate) => return Ok(estimate),
            Err(CoreError::NonConvergence {
                iterations,
                last_step,
            }) => {
                tracing::debug!(
                    iterations,
                    last_step,
                    responses = responses.len(),
                    "MLE did not converge, falling back to EAP"
                );
            }
            Err(e) => return Err(e),
        }
    }

    estimate_eap(responses, items, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> (Vec<bool>, Vec<ItemParameters>) {
        let responses = vec![
            true, true, false, true, true, false, true, true, true, false,
        ];
        let difficulties = [-0.5, 0.0, 0.5, 1.0, -1.0, 1.5, 0.2, 0.3, 0.8, 1.2];
        let items = difficulties
            .iter()
            .enumerate()
            .map(|(i, &b)| ItemParameters::two_pl(format!("item{i}"), 1.0, b))
            .collect();
        (responses, items)
    }

    #[test]
    fn test_mle_scenario_converges() {
        let (responses, items) = scenario();
        let est = estimate_mle(&responses, &items, &AbilityConfig::default()).unwrap();
        assert!(est.theta.is_finite());
        assert!(est.standard_error > 0.0);
        assert!(est.iterations <= 50);
        assert!(est.converged);
        assert_eq!(est.method, EstimationMethod::MaximumLikelihood);
        // 7 of 10 correct against items centred near 0.4
        assert!(est.theta > 0.4 && est.theta < 2.5, "theta={}", est.theta);
    }

    #[test]
    fn test_mle_score_is_zero_at_estimate() {
        let (responses, items) = scenario();
        let est = estimate_mle(&responses, &items, &AbilityConfig::default()).unwrap();
        let (score, _) = score_and_information(est.theta, &responses, &items);
        assert!(score.abs() < 1e-3, "score={score}");
    }

    #[test]
    fn test_mle_perfect_pattern_does_not_converge() {
        let items: Vec<_> = (0..6).map(|i| ItemParameters::new(format!("i{i}"))).collect();
        let err = estimate_mle(&[true; 6], &items, &AbilityConfig::default()).unwrap_err();
        assert!(matches!(err, CoreError::NonConvergence { .. }));
    }

    #[test]
    fn test_all_correct_falls_back_to_eap() {
        let items: Vec<_> = (0..8).map(|i| ItemParameters::new(format!("i{i}"))).collect();
        let est = estimate_ability(&[true; 8], &items, &AbilityConfig::default()).unwrap();
        assert_eq!(est.method, EstimationMethod::ExpectedAPosteriori);
        assert!(est.theta > 0.0 && est.theta.is_finite());

        let est = estimate_ability(&[false; 8], &items, &AbilityConfig::default()).unwrap();
        assert!(est.theta < 0.0 && est.theta.is_finite());
    }

    #[test]
    fn test_iteration_cap_falls_back_to_eap() {
        let (responses, items) = scenario();
        let config = AbilityConfig {
            max_iterations: 1,
            tolerance: 1e-12,
            ..AbilityConfig::default()
        };
        assert!(estimate_mle(&responses, &items, &config).is_err());
        let est = estimate_ability(&responses, &items, &config).unwrap();
        assert_eq!(est.method, EstimationMethod::ExpectedAPosteriori);
    }

    #[test]
    fn test_short_pattern_uses_eap() {
        let items = vec![ItemParameters::new("a"), ItemParameters::new("b")];
        let est = estimate_ability(&[true, false], &items, &AbilityConfig::default()).unwrap();
        assert_eq!(est.method, EstimationMethod::ExpectedAPosteriori);
    }

    #[test]
    fn test_empty_pattern_returns_prior() {
        let config = AbilityConfig {
            prior_mean: 0.3,
            ..AbilityConfig::default()
        };
        let est = estimate_ability(&[], &[], &config).unwrap();
        assert!((est.theta - 0.3).abs() < 1e-6);
        assert!((est.standard_error - 1.0).abs() < 0.05);
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let items = vec![ItemParameters::new("a")];
        let err = estimate_ability(&[true, false], &items, &AbilityConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::LengthMismatch {
                responses: 2,
                items: 1
            }
        ));
    }

    #[test]
    fn test_eap_shrinks_toward_prior() {
        let (responses, items) = scenario();
        let config = AbilityConfig::default();
        let mle = estimate_mle(&responses, &items, &config).unwrap();
        let eap = estimate_eap(&responses, &items, &config).unwrap();
        assert!(eap.theta < mle.theta);
        assert!(eap.theta > 0.0);
    }
}
