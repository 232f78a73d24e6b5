//! Execution result types.
//!
//! Bitstring ordering: the rightmost bit corresponds to the lowest-indexed
//! qubit/classical bit. For example, the string `"01"` means bit 0 read
//! `1` and bit 1 read `0`.

use num_complex::Complex64;
use rand::Rng;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Measurement counts from circuit execution.
///
/// Maps bitstrings to occurrence counts (rightmost bit = lowest index).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Counts {
    counts: FxHashMap<String, u64>,
}

impl Counts {
    /// Create empty counts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create counts from an iterator of (bitstring, count) pairs.
    /// Duplicate bitstrings are accumulated, consistent with `insert()`.
    pub fn from_pairs(iter: impl IntoIterator<Item = (impl Into<String>, u64)>) -> Self {
        let mut counts = Self::new();
        for (k, v) in iter {
            counts.insert(k, v);
        }
        counts
    }

    /// Insert a count for a bitstring.
    pub fn insert(&mut self, bitstring: impl Into<String>, count: u64) {
        *self.counts.entry(bitstring.into()).or_default() += count;
    }

    /// Get the count for a bitstring.
    pub fn get(&self, bitstring: &str) -> u64 {
        self.counts.get(bitstring).copied().unwrap_or(0)
    }

    /// Iterate over (bitstring, count) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &u64)> {
        self.counts.iter()
    }

    /// Get the total number of shots.
    pub fn total_shots(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Get the most frequent bitstring.
    pub fn most_frequent(&self) -> Option<(&String, &u64)> {
        self.counts.iter().max_by_key(|&(_, count)| count)
    }

    /// Get probabilities for each bitstring.
    #[allow(clippy::cast_precision_loss)]
    pub fn probabilities(&self) -> FxHashMap<String, f64> {
        let total = self.total_shots() as f64;
        if total == 0.0 {
            return FxHashMap::default();
        }
        self.counts
            .iter()
            .map(|(k, &v)| (k.clone(), v as f64 / total))
            .collect()
    }

    /// Draw one reading at random, weighted by the recorded counts.
    pub fn get_random_reading(&self, rng: &mut impl Rng) -> Option<&str> {
        let total = self.total_shots();
        if total == 0 {
            return None;
        }
        let mut remaining = rng.gen_range(0..total);
        for (bitstring, &count) in &self.counts {
            if remaining < count {
                return Some(bitstring);
            }
            remaining -= count;
        }
        None
    }

    /// Get sorted counts (by count, descending).
    pub fn sorted(&self) -> Vec<(&String, &u64)> {
        let mut items: Vec<_> = self.counts.iter().collect();
        items.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        items
    }

    /// Get the number of unique bitstrings.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Check if counts are empty.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

impl FromIterator<(String, u64)> for Counts {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        let mut counts = Self::new();
        for (key, value) in iter {
            counts.insert(key, value);
        }
        counts
    }
}

/// Result of circuit execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Outcome probabilities per bitstring. Exact when the backend could
    /// compute them from a final state, otherwise estimated from counts.
    pub probabilities: FxHashMap<String, f64>,
    /// Dense amplitude vector, for state-vector-capable backends.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub states: Option<Vec<Complex64>>,
    /// Sampled measurement counts.
    pub counts: Counts,
    /// Number of shots executed.
    pub shots: u32,
}

impl ExecutionResult {
    /// Create a result from sampled counts; probabilities are estimated
    /// from the counts.
    pub fn from_counts(counts: Counts, shots: u32) -> Self {
        Self {
            probabilities: counts.probabilities(),
            states: None,
            counts,
            shots,
        }
    }

    /// Attach exact probabilities, overriding the count estimate.
    #[must_use]
    pub fn with_probabilities(mut self, probabilities: FxHashMap<String, f64>) -> Self {
        self.probabilities = probabilities;
        self
    }

    /// Attach the final amplitude vector.
    #[must_use]
    pub fn with_states(mut self, states: Vec<Complex64>) -> Self {
        self.states = Some(states);
        self
    }

    /// Get the most frequent measurement result with its probability.
    #[allow(clippy::cast_precision_loss)]
    pub fn most_frequent(&self) -> Option<(&String, f64)> {
        let total = self.counts.total_shots() as f64;
        if total == 0.0 {
            return None;
        }
        self.counts
            .most_frequent()
            .map(|(s, &c)| (s, c as f64 / total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_counts_basic() {
        let mut counts = Counts::new();
        counts.insert("00", 500);
        counts.insert("11", 500);

        assert_eq!(counts.get("00"), 500);
        assert_eq!(counts.get("01"), 0);
        assert_eq!(counts.total_shots(), 1000);
    }

    #[test]
    fn test_counts_accumulate() {
        let mut counts = Counts::new();
        counts.insert("0", 1);
        counts.insert("0", 2);
        assert_eq!(counts.get("0"), 3);
    }

    #[test]
    fn test_counts_probabilities() {
        let counts = Counts::from_pairs([("00", 300_u64), ("01", 200), ("10", 300), ("11", 200)]);

        let probs = counts.probabilities();
        assert!((probs["00"] - 0.3).abs() < 1e-10);
        assert!((probs["01"] - 0.2).abs() < 1e-10);
    }

    #[test]
    fn test_random_reading_weighted() {
        let counts = Counts::from_pairs([("0", 1_u64), ("1", 999)]);
        let mut rng = StdRng::seed_from_u64(7);

        let mut ones = 0;
        for _ in 0..100 {
            if counts.get_random_reading(&mut rng) == Some("1") {
                ones += 1;
            }
        }
        assert!(ones > 90);
    }

    #[test]
    fn test_random_reading_empty() {
        let counts = Counts::new();
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(counts.get_random_reading(&mut rng), None);
    }

    #[test]
    fn test_execution_result_from_counts() {
        let counts = Counts::from_pairs([("00", 500_u64), ("11", 500)]);
        let result = ExecutionResult::from_counts(counts, 1000);

        assert_eq!(result.shots, 1000);
        assert!(result.states.is_none());
        assert!((result.probabilities["00"] - 0.5).abs() < 1e-10);

        let (_most, prob) = result.most_frequent().unwrap();
        assert!((prob - 0.5).abs() < 1e-10);
    }
}
