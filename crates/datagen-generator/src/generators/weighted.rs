//! Cumulative-weight selection.

use rand::Rng;

/// Values sampled proportionally to integer weights.
///
/// Selection draws `u` uniformly in `[0, total)` and returns the first
/// entry (in declaration order) whose cumulative range contains `u`, so
/// zero-weight entries are never returned.
#[derive(Debug, Clone)]
pub struct WeightedSet<T> {
    values: Vec<T>,
    cumulative: Vec<u64>,
    total: u64,
}

impl<T> WeightedSet<T> {
    /// Returns `None` when there are no entries or every weight is zero.
    pub fn new(entries: Vec<(T, u64)>) -> Option<Self> {
        let mut values = Vec::with_capacity(entries.len());
        let mut cumulative = Vec::with_capacity(entries.len());
        let mut total: u64 = 0;
        for (value, weight) in entries {
            total = total.saturating_add(weight);
            values.push(value);
            cumulative.push(total);
        }
        if total == 0 {
            return None;
        }
        Some(Self {
            values,
            cumulative,
            total,
        })
    }

    pub fn single(value: T) -> Self {
        Self {
            values: vec![value],
            cumulative: vec![1],
            total: 1,
        }
    }

    pub fn total_weight(&self) -> u64 {
        self.total
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> &T {
        let draw = rng.gen_range(0..self.total);
        let idx = self.cumulative.partition_point(|&c| c <= draw);
        &self.values[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    #[test]
    fn test_all_zero_weights_rejected() {
        assert!(WeightedSet::new(vec![("a", 0), ("b", 0)]).is_none());
        assert!(WeightedSet::<&str>::new(vec![]).is_none());
    }

    #[test]
    fn test_zero_weight_entry_never_selected() {
        let set = WeightedSet::new(vec![("a", 0), ("b", 5), ("c", 0)]).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..1000 {
            assert_eq!(*set.sample(&mut rng), "b");
        }
    }

    #[test]
    fn test_frequencies_follow_weights() {
        let set = WeightedSet::new(vec![("low", 10), ("mid", 30), ("high", 60)]).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let draws = 100_000;
        let mut counts: HashMap<&str, u32> = HashMap::new();
        for _ in 0..draws {
            *counts.entry(*set.sample(&mut rng)).or_default() += 1;
        }
        for (value, weight) in [("low", 10.0), ("mid", 30.0), ("high", 60.0)] {
            let observed = f64::from(counts[value]) / f64::from(draws);
            assert!(
                (observed - weight / 100.0).abs() < 0.01,
                "{value}: observed {observed}"
            );
        }
    }
}
