//! Response simulation under the logistic model.

use rand::Rng;

use super::calibrate::ResponseMatrix;
use super::model::ItemParameters;

/// Box-Muller standard normal draw
pub fn sample_standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// One response per item for a learner at `theta`.
pub fn simulate_responses<R: Rng + ?Sized>(
    theta: f64,
    items: &[ItemParameters],
    rng: &mut R,
) -> Vec<bool> {
    items
        .iter()
        .map(|item| rng.gen::<f64>() < item.probability(theta))
        .collect()
}

/// Standard-normal population answering every item.
///
/// Returns the generating abilities alongside the response matrix.
pub fn simulate_population<R: Rng + ?Sized>(
    respondents: usize,
    items: &[ItemParameters],
    rng: &mut R,
) -> (Vec<f64>, ResponseMatrix) {
    let thetas: Vec<f64> = (0..respondents).map(|_| sample_standard_normal(rng)).collect();
    let rows = thetas
        .iter()
        .map(|&theta| {
            simulate_responses(theta, items, rng)
                .into_iter()
                .map(Some)
                .collect()
        })
        .collect();
    let item_ids = items.iter().map(|i| i.item_id.clone()).collect();
    (thetas, ResponseMatrix::from_rows_unchecked(item_ids, rows))
}
