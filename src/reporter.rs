use std::fmt;
use std::time::Duration;

use human_bytes::human_bytes;

use crate::reconciler::Reconciliation;

/// Running counters of one indexing run.
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    batches: u64,
    submitted: u64,
    indexed: u64,
    failed: u64,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts a batch of `batch_len` records once its response is reconciled.
    pub fn record(&mut self, batch_len: usize, reconciliation: &Reconciliation) {
        self.batches += 1;
        self.submitted += batch_len as u64;
        self.indexed += reconciliation.indexed;
        self.failed += reconciliation.failed;
    }

    pub fn get_batches(&self) -> u64 {
        self.batches
    }
    pub fn get_submitted(&self) -> u64 {
        self.submitted
    }
    pub fn get_indexed(&self) -> u64 {
        self.indexed
    }
    pub fn get_failed(&self) -> u64 {
        self.failed
    }
}

#[derive(Debug, Clone)]
pub struct Report {
    pub indexed: u64,
    pub failed: u64,
    pub batches: u64,
    pub duration: Duration,
    pub throughput: f64,
    pub resident_memory: Option<usize>,
}

impl Report {
    /// A single rejected record fails the whole run.
    pub fn is_failure(&self) -> bool {
        self.failed > 0
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_failure() {
            write!(
                f,
                "Indexed [{}] documents with [{}] errors in {:.2}s ({:.0} docs/sec)",
                self.indexed,
                self.failed,
                self.duration.as_secs_f64(),
                self.throughput
            )?;
        } else {
            write!(
                f,
                "Successfully indexed [{}] documents in {:.2}s ({:.0} docs/sec)",
                self.indexed,
                self.duration.as_secs_f64(),
                self.throughput
            )?;
        }
        if let Some(bytes) = self.resident_memory {
            write!(f, ", memory {}", human_bytes(bytes as f64))?;
        }
        Ok(())
    }
}

pub fn summarize(stats: &RunStats, duration: Duration) -> Report {
    let seconds = duration.as_secs_f64();
    let throughput = if seconds > 0.0 {
        stats.get_indexed() as f64 / seconds
    } else {
        0.0
    };
    Report {
        indexed: stats.get_indexed(),
        failed: stats.get_failed(),
        batches: stats.get_batches(),
        duration,
        throughput,
        resident_memory: memory_stats::memory_stats().map(|usage| usage.physical_mem),
    }
}
