//! Rollout storage for encoder (VAE) training.
//!
//! Ties the running buffer and the ring buffer together:
//!
//! ```text
//!  env step ──> insert ──> RunningBuffer ──(done)──> admission gate ──> TrajectoryRingBuffer
//!                              │                                              │
//!                              ▼                                              ▼
//!                     get_running_batch                                  get_batch
//! ```
//!
//! # Completion handling
//!
//! After each step is written, finished actors are flushed:
//! - every actor done: one block admission of all actors, gate drawn once,
//!   then the whole running buffer is reset
//! - otherwise: one single-trajectory admission per finished actor (in actor
//!   order), each followed by that actor's reset
//!
//! With `max_buffer_size == 0` nothing is admitted, but finished actors are
//! still reset.

use std::sync::Arc;

use burn::tensor::backend::Backend;
use parking_lot::Mutex;

use crate::buffers::running_buffer::RunningBuffer;
use crate::buffers::trajectory_ring::{Admission, TrajectoryRingBuffer};
use crate::config::StorageConfig;
use crate::core::random::{RandomSource, StdRandom};
use crate::core::seq_array::SeqArray;
use crate::core::step::StepBatch;
use crate::error::StorageError;
use crate::metrics::{storage_metrics, SharedStorageMetrics};

use super::batch::{
    matrix_tensor, prepend_zero_step, seq_tensor, BatchExtras, BatchRequest, RunningBatch,
    TrajectoryBatch,
};

/// Running + permanent trajectory storage.
///
/// # Type Parameters
///
/// - `B`: burn backend the output tensors are created on
/// - `R`: random source for admission and sampling draws
pub struct RolloutStorage<B: Backend, R: RandomSource = StdRandom> {
    config: StorageConfig,
    running: RunningBuffer,
    /// None when `max_buffer_size == 0`.
    ring: Option<TrajectoryRingBuffer>,
    rng: R,
    device: B::Device,
    metrics: SharedStorageMetrics,
}

impl<B: Backend> RolloutStorage<B, StdRandom> {
    /// Create storage with the default random source, seeded from
    /// `config.seed` if set.
    pub fn new(config: StorageConfig, device: &B::Device) -> Result<Self, StorageError> {
        let rng = StdRandom::from_seed_option(config.seed);
        Self::with_rng(config, device, rng)
    }
}

impl<B: Backend, R: RandomSource> RolloutStorage<B, R> {
    /// Create storage with an injected random source.
    pub fn with_rng(config: StorageConfig, device: &B::Device, rng: R) -> Result<Self, StorageError> {
        config.validate()?;

        let running = RunningBuffer::new(&config);
        let ring = config.buffer_enabled().then(|| TrajectoryRingBuffer::new(&config));

        log::debug!(
            "rollout storage: {} actors, horizon {}, buffer {} trajectories (p_add = {}), task_dim {:?}, intrinsic {}",
            config.num_processes,
            config.max_trajectory_len,
            config.max_buffer_size,
            config.add_probability,
            config.task_dim,
            config.save_intrinsic_reward,
        );

        Ok(Self {
            config,
            running,
            ring,
            rng,
            device: device.clone(),
            metrics: storage_metrics(),
        })
    }

    /// Get configuration.
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Device output tensors are created on.
    pub fn device(&self) -> &B::Device {
        &self.device
    }

    /// Shared counters.
    pub fn metrics(&self) -> SharedStorageMetrics {
        Arc::clone(&self.metrics)
    }

    /// The running buffer.
    pub fn running(&self) -> &RunningBuffer {
        &self.running
    }

    /// The ring buffer, if enabled.
    pub fn ring(&self) -> Option<&TrajectoryRingBuffer> {
        self.ring.as_ref()
    }

    /// Number of actors.
    pub fn num_processes(&self) -> usize {
        self.config.num_processes
    }

    /// Current trajectory length per actor.
    pub fn timesteps(&self) -> &[usize] {
        self.running.timesteps()
    }

    /// Ring buffer capacity (0 when disabled).
    pub fn capacity(&self) -> usize {
        self.ring.as_ref().map_or(0, |ring| ring.capacity())
    }

    /// Next ring slot to write (0 when disabled).
    pub fn insert_cursor(&self) -> usize {
        self.ring.as_ref().map_or(0, |ring| ring.insert_cursor())
    }

    /// Number of completed trajectories available for sampling.
    pub fn len(&self) -> usize {
        self.ring.as_ref().map_or(0, |ring| ring.len())
    }

    /// Whether no completed trajectory is available.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether [`get_batch`](Self::get_batch) can be called.
    pub fn ready_for_update(&self) -> bool {
        self.len() > 0
    }

    /// Record one environment step for all actors and flush finished ones.
    pub fn insert(&mut self, step: &StepBatch<'_>) -> Result<(), StorageError> {
        step.validate(&self.config)?;
        self.running.insert(step)?;
        self.metrics.add_steps(self.config.num_processes);

        if step.all_done() {
            let actors: Vec<usize> = (0..self.config.num_processes).collect();
            self.flush(&actors)?;
            self.running.reset_all();
        } else {
            for actor in 0..self.config.num_processes {
                if step.done[actor] {
                    self.flush(&[actor])?;
                    self.running.reset(actor);
                }
            }
        }
        Ok(())
    }

    /// Offer the finished trajectories of `actors` to the ring buffer.
    fn flush(&mut self, actors: &[usize]) -> Result<(), StorageError> {
        self.metrics.add_completed(actors.len());
        let Some(ring) = self.ring.as_mut() else {
            return Ok(());
        };
        match ring.try_admit(&self.running, actors, &mut self.rng)? {
            Admission::Admitted { wrapped, .. } => {
                self.metrics.add_admitted(actors.len());
                if wrapped {
                    self.metrics.increment_wraps();
                }
            }
            Admission::Rejected => self.metrics.add_rejected(actors.len()),
        }
        Ok(())
    }

    /// Sample completed trajectories for training.
    ///
    /// Returns `min(request.batch_size, len())` trajectories. Callers should
    /// check [`ready_for_update`](Self::ready_for_update) first.
    pub fn get_batch(&mut self, request: &BatchRequest) -> Result<TrajectoryBatch<B>, StorageError> {
        let ring = self.ring.as_ref().ok_or(StorageError::BufferDisabled)?;
        if request.batch_size > ring.len() {
            log::warn!(
                "requested {} trajectories, only {} available",
                request.batch_size,
                ring.len()
            );
        }

        let indices = ring.sample(request.batch_size, request.replace, &mut self.rng)?;
        let k = indices.len();
        let trajectory_lens: Vec<usize> = indices.iter().map(|&i| ring.trajectory_len(i)).collect();
        let horizon = if self.config.zero_pad {
            self.config.max_trajectory_len
        } else {
            trajectory_lens.iter().copied().max().unwrap_or(0)
        };

        let device = &self.device;
        let gather = |array: &SeqArray| {
            seq_tensor::<B>(array.gather(&indices, horizon), [horizon, k, array.dim()], device)
        };

        let fields = ring.fields();
        let rewards = match (&fields.intrinsic_rewards, request.value_prediction) {
            (Some(intrinsic), true) => gather(intrinsic),
            _ => gather(&fields.rewards),
        };

        let extras = if request.value_prediction {
            let padded = |array: &SeqArray| {
                let data = prepend_zero_step(array.gather(&indices, horizon), k);
                seq_tensor::<B>(data, [horizon + 1, k, 1], device)
            };
            BatchExtras::ValuePrediction {
                masks: padded(&fields.masks),
                bad_masks: padded(&fields.bad_masks),
            }
        } else if request.memory_batch {
            BatchExtras::Memory {
                done_task: gather(&fields.done_task),
                done_episode: gather(&fields.done_episode),
            }
        } else {
            BatchExtras::None
        };

        let tasks = ring
            .gather_tasks(&indices)
            .map(|data| matrix_tensor::<B>(data, [k, self.config.task_size()], device));

        let prev_states = gather(&fields.prev_states);
        let next_states = gather(&fields.next_states);
        let actions = gather(&fields.actions);

        let batch = TrajectoryBatch {
            prev_states,
            next_states,
            actions,
            rewards,
            tasks,
            extras,
            trajectory_lens,
            indices,
        };
        self.metrics.increment_batches();
        Ok(batch)
    }

    /// Current in-progress trajectories, zero-padded to the horizon.
    pub fn get_running_batch(&self) -> RunningBatch<B> {
        let snapshot = self.running.snapshot();
        let fields = snapshot.fields;
        let full = |array: &SeqArray| {
            seq_tensor::<B>(
                array.as_slice().to_vec(),
                [array.horizon(), array.slots(), array.dim()],
                &self.device,
            )
        };
        let rewards = fields.intrinsic_rewards.as_ref().unwrap_or(&fields.rewards);

        RunningBatch {
            prev_states: full(&fields.prev_states),
            next_states: full(&fields.next_states),
            actions: full(&fields.actions),
            rewards: full(rewards),
            timesteps: snapshot.timesteps.to_vec(),
        }
    }
}

/// Storage shared between an environment loop and a trainer thread.
pub type SharedRolloutStorage<B, R = StdRandom> = Arc<Mutex<RolloutStorage<B, R>>>;

/// Wrap storage for shared access.
pub fn shared_storage<B: Backend, R: RandomSource>(
    storage: RolloutStorage<B, R>,
) -> SharedRolloutStorage<B, R> {
    Arc::new(Mutex::new(storage))
}
