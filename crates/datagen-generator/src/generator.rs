//! Seeded row generation for batch execution.

use crate::model::Model;
use crate::row::Row;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

/// Data generator that produces rows from a shared [`Model`].
///
/// With a seed every batch gets its own RNG derived from the seed and the
/// batch index, so a batch produces the same rows whichever worker runs it
/// (counter fields aside, since counters are shared model state). Without
/// a seed each batch draws fresh entropy.
#[derive(Debug, Clone)]
pub struct RowGenerator {
    /// Model shared by every worker
    model: Arc<Model>,
    /// Base seed for reproducible output
    seed: Option<u64>,
}

impl RowGenerator {
    pub fn new(model: Arc<Model>, seed: Option<u64>) -> Self {
        Self { model, seed }
    }

    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Compute the RNG seed for a specific batch.
    ///
    /// This allows any worker to jump to any batch while keeping determinism.
    fn compute_rng_seed_for_batch(&self, base_seed: u64, batch: u64) -> u64 {
        base_seed.wrapping_add(batch.wrapping_mul(0x9E3779B97F4A7C15))
    }

    pub fn rng_for_batch(&self, batch: u64) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(self.compute_rng_seed_for_batch(seed, batch)),
            None => StdRng::from_entropy(),
        }
    }

    /// Generate one batch of `rows` rows.
    pub fn generate_batch(&self, batch: u64, rows: usize) -> Vec<Row> {
        let mut rng = self.rng_for_batch(batch);
        self.model.generate_rows(&mut rng, rows)
    }

    /// Lazily generate `count` rows from one RNG stream.
    pub fn rows(&self, count: u64) -> RowIterator<'_> {
        RowIterator {
            model: &self.model,
            rng: self.rng_for_batch(0),
            remaining: count,
        }
    }
}

/// Iterator that lazily generates rows.
pub struct RowIterator<'a> {
    model: &'a Model,
    rng: StdRng,
    remaining: u64,
}

impl Iterator for RowIterator<'_> {
    type Item = Row;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(self.model.generate_row(&mut self.rng))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for RowIterator<'_> {}
