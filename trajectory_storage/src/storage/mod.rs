//! Orchestration of the running and permanent buffers.

pub mod batch;
pub mod rollout_storage;

pub use batch::{BatchExtras, BatchRequest, RunningBatch, TrajectoryBatch};
pub use rollout_storage::{shared_storage, RolloutStorage, SharedRolloutStorage};
