//! Configuration for trajectory storage.
//!
//! All sizes are fixed at construction. The storage allocates its running
//! buffer (`max_trajectory_len x num_processes`) and, when enabled, its
//! permanent ring buffer (`max_trajectory_len x max_buffer_size`) up front.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration validation error.
///
/// Returned when configuration parameters are invalid or inconsistent.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A count parameter (num_processes, max_trajectory_len, ...) must be positive.
    #[error("{field} must be > 0, got {value}")]
    InvalidCount { field: &'static str, value: usize },
    /// A parameter is outside its valid range.
    #[error("{field} must be in [{min}, {max}], got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    /// The ring buffer cannot hold one trajectory per actor.
    #[error(
        "max_buffer_size ({capacity}) must be >= num_processes ({num_processes}) \
         so that a simultaneous flush fits in one block"
    )]
    BufferTooSmall {
        capacity: usize,
        num_processes: usize,
    },
}

/// Configuration for [`RolloutStorage`](crate::RolloutStorage).
///
/// Missing fields fall back to [`Default`] when deserialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Number of parallel actors (environments) feeding the running buffer.
    pub num_processes: usize,
    /// Horizon: the longest trajectory a single actor may produce.
    pub max_trajectory_len: usize,
    /// Pad every sampled batch to `max_trajectory_len` along the time axis.
    /// When false, batches are trimmed to the longest sampled trajectory.
    pub zero_pad: bool,
    /// Capacity of the permanent ring buffer in trajectories (0 = disabled).
    pub max_buffer_size: usize,
    /// Observation dimensionality.
    pub state_dim: usize,
    /// Action dimensionality.
    pub action_dim: usize,
    /// Task descriptor dimensionality (None = tasks are not stored).
    pub task_dim: Option<usize>,
    /// Probability that a completed trajectory is admitted to the ring buffer.
    pub add_probability: f64,
    /// Track intrinsic rewards alongside environment rewards.
    pub save_intrinsic_reward: bool,
    /// Seed for the default random source (None = seed from entropy).
    pub seed: Option<u64>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            num_processes: 16,
            max_trajectory_len: 200,
            zero_pad: true,
            max_buffer_size: 10_000,
            state_dim: 2,
            action_dim: 2,
            task_dim: None,
            add_probability: 1.0,
            save_intrinsic_reward: false,
            seed: None,
        }
    }
}

impl StorageConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder pattern: set number of parallel actors.
    pub fn with_num_processes(mut self, n: usize) -> Self {
        self.num_processes = n;
        self
    }

    /// Builder pattern: set the trajectory horizon.
    pub fn with_max_trajectory_len(mut self, len: usize) -> Self {
        self.max_trajectory_len = len;
        self
    }

    /// Builder pattern: enable or disable zero-padding to the full horizon.
    pub fn with_zero_pad(mut self, zero_pad: bool) -> Self {
        self.zero_pad = zero_pad;
        self
    }

    /// Builder pattern: set ring buffer capacity (0 disables it).
    pub fn with_max_buffer_size(mut self, size: usize) -> Self {
        self.max_buffer_size = size;
        self
    }

    /// Builder pattern: set state and action dimensionality.
    pub fn with_dims(mut self, state_dim: usize, action_dim: usize) -> Self {
        self.state_dim = state_dim;
        self.action_dim = action_dim;
        self
    }

    /// Builder pattern: store task descriptors of the given size.
    pub fn with_task_dim(mut self, task_dim: usize) -> Self {
        self.task_dim = Some(task_dim);
        self
    }

    /// Builder pattern: set admission probability.
    pub fn with_add_probability(mut self, p: f64) -> Self {
        self.add_probability = p;
        self
    }

    /// Builder pattern: track intrinsic rewards.
    pub fn with_intrinsic_reward(mut self, save: bool) -> Self {
        self.save_intrinsic_reward = save;
        self
    }

    /// Builder pattern: seed the default random source.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Whether the permanent ring buffer is allocated.
    pub fn buffer_enabled(&self) -> bool {
        self.max_buffer_size > 0
    }

    /// Task descriptor size, 0 when tasks are not stored.
    pub fn task_size(&self) -> usize {
        self.task_dim.unwrap_or(0)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let counts = [
            ("num_processes", self.num_processes),
            ("max_trajectory_len", self.max_trajectory_len),
            ("state_dim", self.state_dim),
            ("action_dim", self.action_dim),
        ];
        for (field, value) in counts {
            if value == 0 {
                return Err(ConfigError::InvalidCount { field, value });
            }
        }
        if self.task_dim == Some(0) {
            return Err(ConfigError::InvalidCount {
                field: "task_dim",
                value: 0,
            });
        }
        if !(0.0..=1.0).contains(&self.add_probability) {
            return Err(ConfigError::OutOfRange {
                field: "add_probability",
                value: self.add_probability,
                min: 0.0,
                max: 1.0,
            });
        }
        if self.buffer_enabled() && self.max_buffer_size < self.num_processes {
            return Err(ConfigError::BufferTooSmall {
                capacity: self.max_buffer_size,
                num_processes: self.num_processes,
            });
        }
        Ok(())
    }
}
