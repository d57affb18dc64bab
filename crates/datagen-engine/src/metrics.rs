//! Per-run metrics.

use std::time::Duration;

/// Metrics from one command run.
#[derive(Debug, Clone, Default)]
pub struct RunMetrics {
    /// Rows generated and handed to the sinks.
    pub rows_written: u64,
    /// Batches fully processed.
    pub batches: u64,
    /// Failed `send_batch` calls, summed over sinks.
    pub send_errors: u64,
    /// Wall time of the run, sink setup included.
    pub total_duration: Duration,
    /// Time spent generating rows, summed over workers.
    pub generation_duration: Duration,
    /// Time spent in sinks, summed over workers.
    pub write_duration: Duration,
}

impl RunMetrics {
    /// Calculate rows per second.
    pub fn rows_per_second(&self) -> f64 {
        if self.total_duration.as_secs_f64() > 0.0 {
            self.rows_written as f64 / self.total_duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Fold a worker's partial metrics into the run total.
    pub(crate) fn merge(&mut self, other: &RunMetrics) {
        self.rows_written += other.rows_written;
        self.batches += other.batches;
        self.send_errors += other.send_errors;
        self.generation_duration += other.generation_duration;
        self.write_duration += other.write_duration;
    }
}
