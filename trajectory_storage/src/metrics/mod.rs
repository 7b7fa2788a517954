//! Storage metrics.
//!
//! - [`StorageMetrics`]: Thread-safe counters for insertion and admission
//! - [`SharedStorageMetrics`]: Arc wrapper for reading from another thread

pub mod storage_metrics;

pub use storage_metrics::{storage_metrics, SharedStorageMetrics, StorageMetrics};
