//! Error type for storage operations.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors surfaced by [`RolloutStorage`](crate::RolloutStorage) and its buffers.
///
/// Admission rejection is not an error; a trajectory that fails the
/// probability gate is dropped silently.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StorageError {
    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    /// A step field does not match the configured dimensionality.
    #[error("{field}: expected {expected} values, got {actual}")]
    DimensionMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    /// Intrinsic rewards are tracked but the step did not carry them.
    #[error("intrinsic rewards are tracked but the step batch has none")]
    MissingIntrinsicRewards,
    /// An actor would write past the trajectory horizon.
    #[error("actor {actor} exceeded the trajectory horizon of {horizon} steps")]
    HorizonExceeded { actor: usize, horizon: usize },
    /// An admission block does not fit in the ring buffer.
    #[error("block of {block} trajectories exceeds buffer capacity {capacity}")]
    BlockTooLarge { block: usize, capacity: usize },
    /// An admission named an actor the running buffer does not have.
    #[error("actor {actor} out of range for {num_processes} actors")]
    ActorOutOfRange { actor: usize, num_processes: usize },
    /// The permanent buffer is disabled (`max_buffer_size == 0`).
    #[error("trajectory buffer is disabled (max_buffer_size = 0)")]
    BufferDisabled,
    /// No completed trajectories are available for sampling.
    #[error("trajectory buffer holds no completed trajectories")]
    Empty,
}
