//! Benchmark suite for lexis-engine
//!
//! Run with: cargo bench

use std::collections::HashMap;

use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use lexis_engine::ability::{
    calibrate_items, estimate_eap, estimate_mle, select_next_item_kl, simulate_population,
    simulate_responses, AbilityEstimate, EstimationMethod, ItemParameters,
};
use lexis_engine::collocation::CollocationIndex;
use lexis_engine::config::{AbilityConfig, CalibrationConfig, CollocationConfig, PriorityConfig};
use lexis_engine::ranker::{rank_items, LearnableItem};
use lexis_engine::scheduler::{Rating, ReviewCard, Scheduler};

fn item_bank(n: usize, rng: &mut ChaCha8Rng) -> Vec<ItemParameters> {
    (0..n)
        .map(|i| {
            ItemParameters::two_pl(
                format!("i{i}"),
                rng.gen_range(0.5..2.0),
                rng.gen_range(-3.0..3.0),
            )
        })
        .collect()
}

fn bench_estimation(c: &mut Criterion) {
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let items = item_bank(40, &mut rng);
    let responses = simulate_responses(0.4, &items, &mut rng);
    let config = AbilityConfig::default();

    c.bench_function("estimate_mle/40", |b| {
        b.iter(|| estimate_mle(black_box(&responses), black_box(&items), &config))
    });
    c.bench_function("estimate_eap/40", |b| {
        b.iter(|| estimate_eap(black_box(&responses), black_box(&items), &config))
    });

    let bank = item_bank(500, &mut rng);
    let estimate = AbilityEstimate {
        theta: 0.2,
        standard_error: 0.9,
        method: EstimationMethod::ExpectedAPosteriori,
        iterations: 0,
        converged: true,
    };
    c.bench_function("select_next_item_kl/500", |b| {
        b.iter(|| select_next_item_kl(black_box(&estimate), &bank, &config))
    });
}

fn bench_calibration(c: &mut Criterion) {
    let mut rng = ChaCha8Rng::seed_from_u64(2);
    let items = item_bank(20, &mut rng);
    let (_, matrix) = simulate_population(500, &items, &mut rng);
    let ability = AbilityConfig::default();
    let config = CalibrationConfig::default();

    let mut group = c.benchmark_group("calibration");
    group.sample_size(10);
    group.bench_function("calibrate_items/500x20", |b| {
        b.iter(|| calibrate_items(black_box(&matrix), &[], &ability, &config))
    });
    group.finish();
}

fn bench_scheduler(c: &mut Criterion) {
    let scheduler = Scheduler::default();
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let card = scheduler.schedule(&ReviewCard::new("w"), Rating::Good, now);
    let later = card.due.unwrap_or(now);

    c.bench_function("Scheduler::schedule", |b| {
        b.iter(|| scheduler.schedule(black_box(&card), Rating::Good, later))
    });
}

fn bench_collocation(c: &mut Criterion) {
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let tokens: Vec<String> = (0..20_000)
        .map(|_| format!("t{}", rng.gen_range(0..500)))
        .collect();
    let config = CollocationConfig::default();

    c.bench_function("CollocationIndex::build/20k", |b| {
        b.iter(|| CollocationIndex::build(black_box(&tokens), &config))
    });

    let index = CollocationIndex::build(&tokens, &config);
    c.bench_function("significant_pairs/20k", |b| b.iter(|| index.significant_pairs()));
}

fn bench_ranking(c: &mut Criterion) {
    let mut rng = ChaCha8Rng::seed_from_u64(4);
    let items: Vec<LearnableItem> = (0..2000)
        .map(|i| {
            let mut item = LearnableItem::new(
                format!("w{i}"),
                rng.gen::<f64>(),
                rng.gen::<f64>(),
                rng.gen::<f64>(),
            );
            item.irt_difficulty = Some(rng.gen_range(-3.0..3.0));
            item
        })
        .collect();
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let config = PriorityConfig::default();
    let states = HashMap::new();

    c.bench_function("rank_items/2000", |b| {
        b.iter(|| rank_items(black_box(&items), &states, now, &config))
    });
}

criterion_group!(
    benches,
    bench_estimation,
    bench_calibration,
    bench_scheduler,
    bench_collocation,
    bench_ranking
);
criterion_main!(benches);
