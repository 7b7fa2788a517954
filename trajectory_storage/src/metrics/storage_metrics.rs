//! Shared counters describing storage throughput.
//!
//! The storage itself is single-writer, but the counters are atomics behind an
//! `Arc` so a logging thread can read them without taking the storage lock.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Thread-safe storage counters.
#[derive(Debug, Default)]
pub struct StorageMetrics {
    /// Actor-steps written to the running buffer
    steps: AtomicUsize,
    /// Trajectories that reached their end
    completed: AtomicUsize,
    /// Trajectories written to the ring buffer
    admitted: AtomicUsize,
    /// Trajectories dropped by the admission gate
    rejected: AtomicUsize,
    /// Overflow wraps: a block that did not fit before capacity restarted at
    /// slot 0 and pinned the sampleable length. An exact fill that returns the
    /// cursor to 0 is not counted.
    wraps: AtomicUsize,
    /// Batches sampled for training
    batches: AtomicUsize,
}

impl StorageMetrics {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add actor-steps.
    pub fn add_steps(&self, steps: usize) {
        self.steps.fetch_add(steps, Ordering::Relaxed);
    }

    /// Record finished trajectories.
    pub fn add_completed(&self, n: usize) {
        self.completed.fetch_add(n, Ordering::Relaxed);
    }

    /// Record admitted trajectories.
    pub fn add_admitted(&self, n: usize) {
        self.admitted.fetch_add(n, Ordering::Relaxed);
    }

    /// Record rejected trajectories.
    pub fn add_rejected(&self, n: usize) {
        self.rejected.fetch_add(n, Ordering::Relaxed);
    }

    /// Record an overflow wrap.
    pub fn increment_wraps(&self) {
        self.wraps.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a sampled batch.
    pub fn increment_batches(&self) {
        self.batches.fetch_add(1, Ordering::Relaxed);
    }

    /// Get total actor-steps inserted.
    pub fn steps(&self) -> usize {
        self.steps.load(Ordering::Relaxed)
    }

    /// Get total completed trajectories.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    /// Get total trajectories admitted to the ring buffer.
    pub fn admitted(&self) -> usize {
        self.admitted.load(Ordering::Relaxed)
    }

    /// Get total trajectories dropped by the admission gate.
    pub fn rejected(&self) -> usize {
        self.rejected.load(Ordering::Relaxed)
    }

    /// Get total overflow wraps.
    pub fn wraps(&self) -> usize {
        self.wraps.load(Ordering::Relaxed)
    }

    /// Get total batches sampled.
    pub fn batches(&self) -> usize {
        self.batches.load(Ordering::Relaxed)
    }

    /// Fraction of gated trajectories that were admitted.
    pub fn admission_rate(&self) -> f32 {
        let admitted = self.admitted();
        let gated = admitted + self.rejected();
        if gated == 0 {
            return 0.0;
        }
        admitted as f32 / gated as f32
    }

    /// Reset all counters.
    pub fn reset(&self) {
        for counter in [
            &self.steps,
            &self.completed,
            &self.admitted,
            &self.rejected,
            &self.wraps,
            &self.batches,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// Shared storage metrics.
pub type SharedStorageMetrics = Arc<StorageMetrics>;

/// Create new shared storage metrics.
pub fn storage_metrics() -> SharedStorageMetrics {
    Arc::new(StorageMetrics::new())
}
