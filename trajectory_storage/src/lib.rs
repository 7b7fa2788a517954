//! # Trajectory Storage: Rollout Buffers for Meta-RL Encoders
//!
//! Fixed-capacity storage of whole trajectories collected by many parallel
//! actors, used to train a trajectory encoder (VAE) alongside the policy.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        RolloutStorage                               │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │   env step (all actors)                                             │
//! │          │                                                          │
//! │          ▼                                                          │
//! │  ┌─────────────────┐  done   ┌───────────┐  admit  ┌─────────────┐ │
//! │  │  RunningBuffer  │────────>│   gate    │────────>│ Trajectory  │ │
//! │  │ [T][actor][dim] │         │ u <= p    │         │ RingBuffer  │ │
//! │  └────────┬────────┘         └───────────┘         │[T][slot][d] │ │
//! │           │                                        └──────┬──────┘ │
//! │           ▼                                               ▼        │
//! │   get_running_batch                                  get_batch     │
//! │   (encoder rollout)                                  (VAE update)  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Data is stored on the host and converted to burn tensors on the
//! configured device when a batch is requested.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use trajectory_storage::{BatchRequest, RolloutStorage, StepBatch, StorageConfig};
//!
//! let config = StorageConfig::new()
//!     .with_num_processes(16)
//!     .with_max_trajectory_len(200)
//!     .with_max_buffer_size(10_000)
//!     .with_dims(state_dim, action_dim);
//!
//! let mut storage = RolloutStorage::<B>::new(config, &device)?;
//! storage.insert(&StepBatch::new(&prev, &actions, &next, &rewards, &done)
//!     .with_masks(&masks, &bad_masks)
//!     .with_completion_flags(&done_task, &done_episode))?;
//!
//! if storage.ready_for_update() {
//!     let batch = storage.get_batch(&BatchRequest::new(32))?;
//! }
//! ```

pub mod buffers;
pub mod config;
pub mod core;
pub mod error;
pub mod metrics;
pub mod storage;

pub use buffers::{
    Admission, InsertPath, RunningBuffer, RunningSnapshot, TrajectoryFields, TrajectoryRingBuffer,
};
pub use config::{ConfigError, StorageConfig};
pub use crate::core::{RandomSource, SeqArray, StdRandom, StepBatch};
pub use error::StorageError;
pub use metrics::{storage_metrics, SharedStorageMetrics, StorageMetrics};
pub use storage::{
    shared_storage, BatchExtras, BatchRequest, RolloutStorage, RunningBatch, SharedRolloutStorage,
    TrajectoryBatch,
};
