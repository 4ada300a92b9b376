//! Corpus co-occurrence index
//!
//! Tokens are interned once; pair counts are keyed by the ordered id pair so
//! (w1, w2) and (w2, w1) share one entry. A pair is counted each time the
//! two tokens appear within `window_size` positions of each other.
//!
//! Association:
//! - PMI = log2(C(w1,w2) * N / (C(w1) * C(w2)))
//! - NPMI = PMI / -log2(C(w1,w2) / N), clamped to [-1, 1]
//! - Dunning LLR over the 2x2 table of directed co-occurrences, with every
//!   windowed pair counted once in each direction

use std::collections::HashMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::CollocationConfig;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PmiScore {
    pub count: u64,
    pub pmi: f64,
    pub npmi: f64,
    /// Dunning log-likelihood ratio (chi-square, 1 df)
    pub log_likelihood: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollocationPair {
    pub first: String,
    pub second: String,
    pub count: u64,
    pub pmi: f64,
    pub npmi: f64,
    pub log_likelihood: f64,
}

impl CollocationPair {
    fn from_score(first: &str, second: &str, score: PmiScore) -> Self {
        Self {
            first: first.to_string(),
            second: second.to_string(),
            count: score.count,
            pmi: score.pmi,
            npmi: score.npmi,
            log_likelihood: score.log_likelihood,
        }
    }
}

/// Lowercase and split on anything that is not alphanumeric.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Immutable once built; rebuild to reflect a changed corpus.
#[derive(Debug, Clone, Default)]
pub struct CollocationIndex {
    config: CollocationConfig,
    vocab: Vec<String>,
    ids: HashMap<String, u32>,
    token_counts: Vec<u64>,
    pair_counts: HashMap<(u32, u32), u64>,
    /// Pair occurrences involving each token
    pair_marginals: Vec<u64>,
    neighbors: Vec<Vec<u32>>,
    total_tokens: u64,
    total_pairs: u64,
}

impl CollocationIndex {
    pub fn build<S: AsRef<str>>(tokens: &[S], config: &CollocationConfig) -> Self {
        let mut vocab: Vec<String> = Vec::new();
        let mut ids: HashMap<String, u32> = HashMap::new();
        let mut token_counts: Vec<u64> = Vec::new();

        let sequence: Vec<u32> = tokens
            .iter()
            .map(|token| {
                let token = token.as_ref();
                let id = match ids.get(token) {
                    Some(&id) => id,
                    None => {
                        let id = vocab.len() as u32;
                        vocab.push(token.to_string());
                        ids.insert(token.to_string(), id);
                        token_counts.push(0);
                        id
                    }
                };
                token_counts[id as usize] += 1;
                id
            })
            .collect();

        let mut pair_counts: HashMap<(u32, u32), u64> = HashMap::new();
        for (i, &left) in sequence.iter().enumerate() {
            let end = i
                .saturating_add(config.window_size)
                .min(sequence.len().saturating_sub(1));
            for &right in sequence.iter().take(end + 1).skip(i + 1) {
                if left == right {
                    continue;
                }
                *pair_counts.entry(ordered(left, right)).or_insert(0) += 1;
            }
        }

        let mut pair_marginals = vec![0u64; vocab.len()];
        let mut neighbors: Vec<Vec<u32>> = vec![Vec::new(); vocab.len()];
        let mut total_pairs = 0u64;
        for (&(a, b), &count) in &pair_counts {
            pair_marginals[a as usize] += count;
            pair_marginals[b as usize] += count;
            neighbors[a as usize].push(b);
            neighbors[b as usize].push(a);
            total_pairs += count;
        }

        tracing::debug!(
            tokens = sequence.len(),
            types = vocab.len(),
            pairs = pair_counts.len(),
            window = config.window_size,
            "Collocation index built"
        );

        Self {
            config: config.clone(),
            vocab,
            ids,
            token_counts,
            pair_counts,
            pair_marginals,
            neighbors,
            total_tokens: sequence.len() as u64,
            total_pairs,
        }
    }

    pub fn from_text(text: &str, config: &CollocationConfig) -> Self {
        Self::build(&tokenize(text), config)
    }

    pub fn config(&self) -> &CollocationConfig {
        &self.config
    }

    pub fn total_tokens(&self) -> u64 {
        self.total_tokens
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocab.len()
    }

    pub fn token_count(&self, word: &str) -> u64 {
        self.ids
            .get(word)
            .map(|&id| self.token_counts[id as usize])
            .unwrap_or(0)
    }

    pub fn pair_count(&self, w1: &str, w2: &str) -> u64 {
        match (self.ids.get(w1), self.ids.get(w2)) {
            (Some(&a), Some(&b)) if a != b => {
                self.pair_counts.get(&ordered(a, b)).copied().unwrap_or(0)
            }
            _ => 0,
        }
    }

    /// `None` unless both words and the pair have positive counts.
    pub fn compute_pmi(&self, w1: &str, w2: &str) -> Option<PmiScore> {
        let a = *self.ids.get(w1)?;
        let b = *self.ids.get(w2)?;
        if a == b {
            return None;
        }
        self.score_ids(a, b)
    }

    /// Top partners of `word` that pass the significance filter, by PMI
    /// descending then partner ascending.
    pub fn get_collocations(&self, word: &str, top_k: usize) -> Vec<CollocationPair> {
        let Some(&id) = self.ids.get(word) else {
            return Vec::new();
        };

        let mut pairs: Vec<CollocationPair> = self.neighbors[id as usize]
            .iter()
            .filter_map(|&other| {
                let score = self.score_ids(id, other)?;
                self.is_significant(&score).then(|| {
                    CollocationPair::from_score(word, &self.vocab[other as usize], score)
                })
            })
            .collect();

        sort_pairs(&mut pairs);
        pairs.truncate(top_k);
        pairs
    }

    /// Every pair passing the significance filter, in PMI order.
    pub fn significant_pairs(&self) -> Vec<CollocationPair> {
        let keys: Vec<(u32, u32)> = self.pair_counts.keys().copied().collect();
        let mut pairs: Vec<CollocationPair> = keys
            .par_iter()
            .filter_map(|&(a, b)| {
                let score = self.score_ids(a, b)?;
                if !self.is_significant(&score) {
                    return None;
                }
                let (first, second) = {
                    let (x, y) = (&self.vocab[a as usize], &self.vocab[b as usize]);
                    if x <= y {
                        (x, y)
                    } else {
                        (y, x)
                    }
                };
                Some(CollocationPair::from_score(first, second, score))
            })
            .collect();

        sort_pairs(&mut pairs);
        pairs
    }

    fn is_significant(&self, score: &PmiScore) -> bool {
        score.count >= self.config.min_pair_count
            && score.log_likelihood >= self.config.significance_cutoff
    }

    fn score_ids(&self, a: u32, b: u32) -> Option<PmiScore> {
        // Canonical order keeps the floating-point sums identical both ways
        let (a, b) = ordered(a, b);
        let c12 = self.pair_counts.get(&(a, b)).copied().unwrap_or(0);
        let c1 = self.token_counts[a as usize];
        let c2 = self.token_counts[b as usize];
        if c12 == 0 || c1 == 0 || c2 == 0 || self.total_tokens == 0 {
            return None;
        }

        let n = self.total_tokens as f64;
        let pmi = (c12 as f64 * n / (c1 as f64 * c2 as f64)).log2();
        let p12 = c12 as f64 / n;
        let npmi = if p12 >= 1.0 {
            1.0
        } else {
            (pmi / -p12.log2()).clamp(-1.0, 1.0)
        };

        let log_likelihood = dunning_llr(
            c12,
            self.pair_marginals[a as usize],
            self.pair_marginals[b as usize],
            2 * self.total_pairs,
        );

        Some(PmiScore {
            count: c12,
            pmi,
            npmi,
            log_likelihood,
        })
    }
}

fn ordered(a: u32, b: u32) -> (u32, u32) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

fn sort_pairs(pairs: &mut [CollocationPair]) {
    pairs.sort_by(|x, y| {
        y.pmi
            .partial_cmp(&x.pmi)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| x.first.cmp(&y.first))
            .then_with(|| x.second.cmp(&y.second))
    });
}

fn x_log_x(x: f64) -> f64 {
    if x <= 0.0 {
        0.0
    } else {
        x * x.ln()
    }
}

/// Dunning's G² for a 2x2 table given the joint count, both marginals and
/// the grand total.
pub fn dunning_llr(k11: u64, row1: u64, col1: u64, total: u64) -> f64 {
    let k11 = k11 as f64;
    let k12 = (row1 as f64 - k11).max(0.0);
    let k21 = (col1 as f64 - k11).max(0.0);
    let k22 = (total as f64 - k11 - k12 - k21).max(0.0);
    let n = k11 + k12 + k21 + k22;

    let cells = x_log_x(k11) + x_log_x(k12) + x_log_x(k21) + x_log_x(k22);
    let rows = x_log_x(k11 + k12) + x_log_x(k21 + k22);
    let cols = x_log_x(k11 + k21) + x_log_x(k12 + k22);

    (2.0 * (cells - rows - cols + x_log_x(n))).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    /// Random filler over a 50-word vocabulary with "strong coffee" planted
    /// every 60 tokens.
    fn corpus() -> Vec<String> {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut tokens = Vec::new();
        for i in 0..2000 {
            if i % 60 == 0 {
                tokens.push("strong".to_string());
                tokens.push("coffee".to_string());
            }
            tokens.push(format!("w{}", rng.gen_range(0..50)));
        }
        tokens
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("Strong coffee, STRONG tea!"),
            vec!["strong", "coffee", "strong", "tea"]
        );
        assert!(tokenize("  ...  ").is_empty());
    }

    #[test]
    fn test_counts() {
        let config = CollocationConfig {
            window_size: 1,
            ..CollocationConfig::default()
        };
        let index = CollocationIndex::build(&["a", "b", "a", "c"], &config);
        assert_eq!(index.total_tokens(), 4);
        assert_eq!(index.token_count("a"), 2);
        assert_eq!(index.pair_count("a", "b"), 2);
        assert_eq!(index.pair_count("b", "a"), 2);
        assert_eq!(index.pair_count("a", "c"), 1);
        assert_eq!(index.pair_count("b", "c"), 0);
        assert_eq!(index.pair_count("a", "a"), 0);
    }

    #[test]
    fn test_window_limits_distance() {
        let config = CollocationConfig {
            window_size: 2,
            ..CollocationConfig::default()
        };
        let index = CollocationIndex::build(&["a", "x", "y", "b"], &config);
        assert_eq!(index.pair_count("a", "y"), 1);
        assert_eq!(index.pair_count("a", "b"), 0);
    }

    #[test]
    fn test_unbounded_window_spans_corpus() {
        let config = CollocationConfig {
            window_size: usize::MAX,
            ..CollocationConfig::default()
        };
        let index = CollocationIndex::build(&["a", "x", "y", "b"], &config);
        assert_eq!(index.pair_count("a", "b"), 1);
        assert_eq!(index.pair_count("x", "b"), 1);
        assert_eq!(index.pair_count("a", "x"), 1);
    }

    #[test]
    fn test_pmi_formula() {
        let config = CollocationConfig {
            window_size: 1,
            ..CollocationConfig::default()
        };
        let index = CollocationIndex::build(&["a", "b", "c", "d"], &config);
        let score = index.compute_pmi("a", "b").unwrap();
        assert!((score.pmi - 2.0).abs() < 1e-12);
        assert!((score.npmi - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pmi_undefined_without_cooccurrence() {
        let index = CollocationIndex::build(&["a", "b"], &CollocationConfig::default());
        assert!(index.compute_pmi("a", "zzz").is_none());
        assert!(index.compute_pmi("a", "a").is_none());
        let config = CollocationConfig {
            window_size: 1,
            ..CollocationConfig::default()
        };
        let far = CollocationIndex::build(&["a", "x", "b"], &config);
        assert!(far.compute_pmi("a", "b").is_none());
    }

    #[test]
    fn test_pmi_symmetric() {
        let index = CollocationIndex::build(&corpus(), &CollocationConfig::default());
        let ab = index.compute_pmi("strong", "coffee").unwrap();
        let ba = index.compute_pmi("coffee", "strong").unwrap();
        assert_eq!(ab, ba);
    }

    #[test]
    fn test_collocations_are_significant_and_sorted() {
        let index = CollocationIndex::build(&corpus(), &CollocationConfig::default());
        let pairs = index.get_collocations("strong", 10);
        assert!(!pairs.is_empty());
        assert!(pairs.len() <= 10);
        for pair in &pairs {
            assert_eq!(pair.first, "strong");
            assert!(pair.log_likelihood >= 3.84);
            assert!(pair.count >= 2);
        }
        for w in pairs.windows(2) {
            assert!(w[0].pmi >= w[1].pmi);
        }
        assert_eq!(pairs[0].second, "coffee");
    }

    #[test]
    fn test_top_k_truncates() {
        let index = CollocationIndex::build(&corpus(), &CollocationConfig::default());
        assert_eq!(index.get_collocations("strong", 1).len(), 1);
        assert!(index.get_collocations("strong", 0).is_empty());
        assert!(index.get_collocations("missing", 5).is_empty());
    }

    #[test]
    fn test_significant_pairs_filtered() {
        let index = CollocationIndex::build(&corpus(), &CollocationConfig::default());
        let pairs = index.significant_pairs();
        assert!(!pairs.is_empty());
        assert!(pairs.iter().all(|p| p.log_likelihood >= 3.84 && p.first <= p.second));
        assert_eq!(pairs, index.significant_pairs());
    }

    #[test]
    fn test_dunning_llr_independence_is_zero() {
        // Joint 25 of 100 with both marginals 50 is exactly independent
        assert!(dunning_llr(25, 50, 50, 100).abs() < 1e-9);
        assert!(dunning_llr(45, 50, 50, 100) > 3.84);
    }

    #[test]
    fn test_empty_corpus() {
        let index = CollocationIndex::build::<&str>(&[], &CollocationConfig::default());
        assert_eq!(index.total_tokens(), 0);
        assert!(index.significant_pairs().is_empty());
    }
}
