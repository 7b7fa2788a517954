//! Batch request and output types.
//!
//! All sequence tensors are time-major, `[T, batch, dim]`, matching the
//! storage layout.

use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};

/// Parameters for [`RolloutStorage::get_batch`](crate::RolloutStorage::get_batch).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchRequest {
    /// Requested number of trajectories (clamped to what is stored).
    pub batch_size: usize,
    /// Sample indices with replacement.
    pub replace: bool,
    /// Return masks with a leading zero row for value bootstrapping.
    pub value_prediction: bool,
    /// Return task/episode completion flags (ignored with `value_prediction`).
    pub memory_batch: bool,
}

impl Default for BatchRequest {
    fn default() -> Self {
        Self {
            batch_size: 5,
            replace: false,
            value_prediction: false,
            memory_batch: false,
        }
    }
}

impl BatchRequest {
    /// Request `batch_size` trajectories without replacement.
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size,
            ..Default::default()
        }
    }

    /// Builder pattern: sample with replacement.
    pub fn with_replacement(mut self, replace: bool) -> Self {
        self.replace = replace;
        self
    }

    /// Builder pattern: value-prediction layout.
    pub fn value_prediction(mut self) -> Self {
        self.value_prediction = true;
        self
    }

    /// Builder pattern: memory layout.
    pub fn memory_batch(mut self) -> Self {
        self.memory_batch = true;
        self
    }
}

/// Mode-specific tensors of a [`TrajectoryBatch`].
#[derive(Debug, Clone)]
pub enum BatchExtras<B: Backend> {
    /// Default layout, nothing extra.
    None,
    /// Masks with a zero row prepended, `[T + 1, batch, 1]`.
    ValuePrediction {
        /// Continuation masks (0 after a true terminal).
        masks: Tensor<B, 3>,
        /// Time-limit masks (0 after a truncation).
        bad_masks: Tensor<B, 3>,
    },
    /// Completion flags, `[T, batch, 1]`.
    Memory {
        /// Task-completion flags.
        done_task: Tensor<B, 3>,
        /// Episode-completion flags.
        done_episode: Tensor<B, 3>,
    },
}

/// Completed trajectories sampled from the ring buffer.
#[derive(Debug, Clone)]
pub struct TrajectoryBatch<B: Backend> {
    /// `[T, batch, state_dim]`
    pub prev_states: Tensor<B, 3>,
    /// `[T, batch, state_dim]`
    pub next_states: Tensor<B, 3>,
    /// `[T, batch, action_dim]`
    pub actions: Tensor<B, 3>,
    /// `[T, batch, 1]`; intrinsic rewards for value prediction when tracked.
    pub rewards: Tensor<B, 3>,
    /// `[batch, task_dim]`
    pub tasks: Option<Tensor<B, 2>>,
    /// Tensors selected by the request mode.
    pub extras: BatchExtras<B>,
    /// True length of each sampled trajectory.
    pub trajectory_lens: Vec<usize>,
    /// Ring buffer slots the batch was drawn from.
    pub indices: Vec<usize>,
}

impl<B: Backend> TrajectoryBatch<B> {
    /// Number of trajectories.
    pub fn len(&self) -> usize {
        self.trajectory_lens.len()
    }

    /// Whether the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.trajectory_lens.is_empty()
    }

    /// Length of the time axis of the sequence tensors.
    pub fn horizon(&self) -> usize {
        self.prev_states.dims()[0]
    }
}

/// In-progress trajectories from the running buffer.
#[derive(Debug, Clone)]
pub struct RunningBatch<B: Backend> {
    /// `[T, num_processes, state_dim]`
    pub prev_states: Tensor<B, 3>,
    /// `[T, num_processes, state_dim]`
    pub next_states: Tensor<B, 3>,
    /// `[T, num_processes, action_dim]`
    pub actions: Tensor<B, 3>,
    /// `[T, num_processes, 1]`; intrinsic rewards when tracked.
    pub rewards: Tensor<B, 3>,
    /// Valid steps per actor.
    pub timesteps: Vec<usize>,
}

pub(crate) fn seq_tensor<B: Backend>(
    data: Vec<f32>,
    shape: [usize; 3],
    device: &B::Device,
) -> Tensor<B, 3> {
    debug_assert_eq!(data.len(), shape.iter().product::<usize>());
    Tensor::from_data(TensorData::new(data, shape), device)
}

pub(crate) fn matrix_tensor<B: Backend>(
    data: Vec<f32>,
    shape: [usize; 2],
    device: &B::Device,
) -> Tensor<B, 2> {
    debug_assert_eq!(data.len(), shape.iter().product::<usize>());
    Tensor::from_data(TensorData::new(data, shape), device)
}

/// Prepend one all-zero timestep to `[T, batch, 1]` data.
pub(crate) fn prepend_zero_step(data: Vec<f32>, batch: usize) -> Vec<f32> {
    let mut out = vec![0.0; batch];
    out.extend(data);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray<f32>;

    #[test]
    fn test_request_builders() {
        let request = BatchRequest::new(8).with_replacement(true).value_prediction();
        assert_eq!(request.batch_size, 8);
        assert!(request.replace);
        assert!(request.value_prediction);
        assert!(!request.memory_batch);
        assert_eq!(BatchRequest::default().batch_size, 5);
    }

    #[test]
    fn test_seq_tensor_shape() {
        let device = Default::default();
        let tensor = seq_tensor::<B>(vec![1.0; 12], [2, 3, 2], &device);
        assert_eq!(tensor.dims(), [2, 3, 2]);
    }

    #[test]
    fn test_prepend_zero_step() {
        assert_eq!(
            prepend_zero_step(vec![1.0, 2.0, 3.0, 4.0], 2),
            vec![0.0, 0.0, 1.0, 2.0, 3.0, 4.0]
        );
    }
}
