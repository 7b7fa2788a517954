//! Permanent ring buffer of completed trajectories.
//!
//! Key differences from the running buffer:
//! - **Trajectory-indexed** slots instead of actor-indexed ones
//! - **Probabilistic admission**: a completed trajectory is only kept if a
//!   uniform draw passes the admission gate
//! - **Ring semantics**: the insert cursor wraps to 0 when a block would
//!   overflow capacity, overwriting the oldest trajectories
//! - **Uniform sampling** over `[0, len())`
//!
//! # Wrap rule
//!
//! Admission writes a contiguous block of `k` trajectories (k = 1 for a single
//! finished actor, k = num_processes when all actors finish together). If
//! `insert_cursor + k > capacity` the cursor wraps to 0 and the sampleable
//! length is pinned to the pre-wrap cursor. Slots past that point keep their
//! old data but are not sampled until the cursor catches back up to them.

use crate::config::StorageConfig;
use crate::core::random::RandomSource;
use crate::core::step::row;
use crate::error::StorageError;

use super::fields::TrajectoryFields;
use super::running_buffer::RunningBuffer;

/// Outcome of an admission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The block was written starting at `start`.
    Admitted {
        /// First ring slot written.
        start: usize,
        /// Whether the cursor wrapped before writing.
        wrapped: bool,
    },
    /// The admission gate rejected the block.
    Rejected,
}

impl Admission {
    /// Whether the block was written.
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted { .. })
    }
}

/// Fixed-capacity store of completed trajectories.
#[derive(Debug, Clone)]
pub struct TrajectoryRingBuffer {
    fields: TrajectoryFields,
    /// `[capacity * task_dim]`
    tasks: Option<Vec<f32>>,
    task_dim: usize,
    /// True (unpadded) length of each stored trajectory.
    lengths: Vec<usize>,
    capacity: usize,
    insert_cursor: usize,
    /// Number of sampleable trajectories.
    filled: usize,
    add_probability: f64,
}

impl TrajectoryRingBuffer {
    /// Create an empty ring buffer with `config.max_buffer_size` slots.
    pub fn new(config: &StorageConfig) -> Self {
        let capacity = config.max_buffer_size;
        Self {
            fields: TrajectoryFields::zeros(
                config.max_trajectory_len,
                capacity,
                config.state_dim,
                config.action_dim,
                config.save_intrinsic_reward,
            ),
            tasks: config.task_dim.map(|d| vec![0.0; capacity * d]),
            task_dim: config.task_size(),
            lengths: vec![0; capacity],
            capacity,
            insert_cursor: 0,
            filled: 0,
            add_probability: config.add_probability,
        }
    }

    /// Maximum number of stored trajectories.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Next slot to write.
    #[inline]
    pub fn insert_cursor(&self) -> usize {
        self.insert_cursor
    }

    /// Number of trajectories available for sampling.
    #[inline]
    pub fn len(&self) -> usize {
        self.filled
    }

    /// Whether nothing can be sampled yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    /// Whether sampling is allowed.
    #[inline]
    pub fn ready(&self) -> bool {
        self.filled > 0
    }

    /// Stored fields, `[T, capacity, dim]`.
    pub fn fields(&self) -> &TrajectoryFields {
        &self.fields
    }

    /// True length of the trajectory in `slot`.
    pub fn trajectory_len(&self, slot: usize) -> usize {
        self.lengths[slot]
    }

    /// Task descriptor of the trajectory in `slot`.
    pub fn task(&self, slot: usize) -> Option<&[f32]> {
        self.tasks
            .as_deref()
            .map(|tasks| row(tasks, slot, self.task_dim))
    }

    /// Task descriptors of the given slots, `[slots.len() * task_dim]`.
    pub fn gather_tasks(&self, slots: &[usize]) -> Option<Vec<f32>> {
        let tasks = self.tasks.as_deref()?;
        let mut out = Vec::with_capacity(slots.len() * self.task_dim);
        for &slot in slots {
            out.extend_from_slice(row(tasks, slot, self.task_dim));
        }
        Some(out)
    }

    /// Try to admit the finished trajectories of `actors` as one block.
    ///
    /// The admission gate draws once for the whole block. Admitted
    /// trajectories are written contiguously in `actors` order, with the
    /// actors' cursors as their true lengths. The running buffer is not
    /// modified; resetting it is the caller's job.
    ///
    /// A block larger than the capacity, an actor outside `source`, or a
    /// source with a different horizon is an error; nothing is drawn or
    /// written in that case.
    pub fn try_admit<R: RandomSource + ?Sized>(
        &mut self,
        source: &RunningBuffer,
        actors: &[usize],
        rng: &mut R,
    ) -> Result<Admission, StorageError> {
        self.check_block(source, actors)?;

        let draw = rng.uniform();
        if !(self.add_probability > 0.0 && draw <= self.add_probability) {
            log::trace!(
                "rejected {} trajectories (draw {:.4} > p {:.4})",
                actors.len(),
                draw,
                self.add_probability
            );
            return Ok(Admission::Rejected);
        }
        Ok(self.write_block(source, actors))
    }

    fn check_block(&self, source: &RunningBuffer, actors: &[usize]) -> Result<(), StorageError> {
        if actors.len() > self.capacity {
            return Err(StorageError::BlockTooLarge {
                block: actors.len(),
                capacity: self.capacity,
            });
        }
        let num_processes = source.num_processes();
        if let Some(&actor) = actors.iter().find(|&&a| a >= num_processes) {
            return Err(StorageError::ActorOutOfRange {
                actor,
                num_processes,
            });
        }
        if source.horizon() != self.fields.horizon() {
            return Err(StorageError::DimensionMismatch {
                field: "horizon",
                expected: self.fields.horizon(),
                actual: source.horizon(),
            });
        }
        Ok(())
    }

    fn write_block(&mut self, source: &RunningBuffer, actors: &[usize]) -> Admission {
        let block = actors.len();

        let wrapped = self.insert_cursor + block > self.capacity;
        if wrapped {
            log::debug!(
                "trajectory buffer wrapped at slot {} (capacity {}); sampleable length pinned to {}",
                self.insert_cursor,
                self.capacity,
                self.insert_cursor
            );
            self.filled = self.insert_cursor;
            self.insert_cursor = 0;
        }

        let start = self.insert_cursor;
        for (offset, &actor) in actors.iter().enumerate() {
            let slot = start + offset;
            self.fields.copy_slot_from(slot, source.fields(), actor);
            self.lengths[slot] = source.timesteps()[actor];
            if let (Some(tasks), Some(task)) = (self.tasks.as_mut(), source.task(actor)) {
                let dim = self.task_dim;
                tasks[slot * dim..(slot + 1) * dim].copy_from_slice(task);
            }
        }

        self.insert_cursor += block;
        self.filled = self.filled.max(self.insert_cursor);
        if self.insert_cursor == self.capacity {
            self.insert_cursor = 0;
        }

        log::trace!("admitted {} trajectories at slot {}", block, start);
        Admission::Admitted { start, wrapped }
    }

    /// Draw `min(batch_size, len())` slot indices uniformly from `[0, len())`.
    pub fn sample<R: RandomSource + ?Sized>(
        &self,
        batch_size: usize,
        replace: bool,
        rng: &mut R,
    ) -> Result<Vec<usize>, StorageError> {
        if self.is_empty() {
            return Err(StorageError::Empty);
        }
        let count = batch_size.min(self.filled);
        let indices = rng.choice(self.filled, count, replace);
        debug_assert!(indices.iter().all(|&i| i < self.filled));
        Ok(indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::random::ScriptedRandom;
    use crate::core::step::StepBatch;

    fn config(capacity: usize, n: usize) -> StorageConfig {
        StorageConfig::new()
            .with_num_processes(n)
            .with_max_trajectory_len(2)
            .with_dims(1, 1)
            .with_max_buffer_size(capacity)
    }

    /// Running buffer whose actor `i` holds one step with reward `tag + i`.
    fn running(n: usize, tag: f32) -> RunningBuffer {
        let mut buffer = RunningBuffer::new(&config(n, n));
        let values: Vec<f32> = (0..n).map(|i| tag + i as f32).collect();
        let done = vec![false; n];
        let step = StepBatch::new(&values, &values, &values, &values, &done)
            .with_masks(&values, &values)
            .with_completion_flags(&values, &values);
        buffer.insert(&step).unwrap();
        buffer
    }

    #[test]
    fn test_new_is_empty() {
        let ring = TrajectoryRingBuffer::new(&config(4, 1));
        assert_eq!(ring.capacity(), 4);
        assert_eq!(ring.insert_cursor(), 0);
        assert!(ring.is_empty());
        assert!(!ring.ready());
        assert_eq!(
            ring.sample(1, false, &mut ScriptedRandom::default()),
            Err(StorageError::Empty)
        );
    }

    #[test]
    fn test_single_admission() {
        let mut ring = TrajectoryRingBuffer::new(&config(4, 1));
        let source = running(1, 10.0);
        let mut rng = ScriptedRandom::always(0.0);

        let outcome = ring.try_admit(&source, &[0], &mut rng).unwrap();
        assert_eq!(outcome, Admission::Admitted { start: 0, wrapped: false });
        assert_eq!(ring.len(), 1);
        assert_eq!(ring.insert_cursor(), 1);
        assert_eq!(ring.trajectory_len(0), 1);
        assert_eq!(ring.fields().rewards.slot_values(0), vec![10.0, 0.0]);
    }

    #[test]
    fn test_gate_draw_above_probability_rejects() {
        let mut cfg = config(4, 1);
        cfg.add_probability = 0.5;
        let mut ring = TrajectoryRingBuffer::new(&cfg);
        let source = running(1, 1.0);

        let mut rng = ScriptedRandom::new(vec![0.75, 0.5]);
        assert_eq!(
            ring.try_admit(&source, &[0], &mut rng).unwrap(),
            Admission::Rejected
        );
        assert!(ring.is_empty());
        // Boundary draw equal to the probability is admitted.
        assert!(ring.try_admit(&source, &[0], &mut rng).unwrap().is_admitted());
        assert_eq!(ring.len(), 1);
    }

    #[test]
    fn test_zero_probability_rejects_zero_draw() {
        let mut cfg = config(4, 1);
        cfg.add_probability = 0.0;
        let mut ring = TrajectoryRingBuffer::new(&cfg);
        let source = running(1, 1.0);
        let mut rng = ScriptedRandom::always(0.0);
        assert_eq!(
            ring.try_admit(&source, &[0], &mut rng).unwrap(),
            Admission::Rejected
        );
    }

    #[test]
    fn test_block_wrap_pins_length() {
        // capacity 5, blocks of 2: slots 0-1, 2-3, then 4+2 > 5 wraps.
        let mut ring = TrajectoryRingBuffer::new(&config(5, 2));
        let mut rng = ScriptedRandom::always(0.0);

        ring.try_admit(&running(2, 0.0), &[0, 1], &mut rng).unwrap();
        ring.try_admit(&running(2, 10.0), &[0, 1], &mut rng).unwrap();
        assert_eq!((ring.insert_cursor(), ring.len()), (4, 4));

        let outcome = ring.try_admit(&running(2, 20.0), &[0, 1], &mut rng).unwrap();
        assert_eq!(outcome, Admission::Admitted { start: 0, wrapped: true });
        assert_eq!(ring.insert_cursor(), 2);
        assert_eq!(ring.len(), 4);
        assert_eq!(ring.fields().rewards.slot_values(0), vec![20.0, 0.0]);
        assert_eq!(ring.fields().rewards.slot_values(3), vec![11.0, 0.0]);
        // Slot 4 was never written and is outside the sampleable range.
        assert!(ring.fields().slot_is_zero(4));
    }

    #[test]
    fn test_exact_fill_normalises_cursor() {
        let mut ring = TrajectoryRingBuffer::new(&config(4, 2));
        let mut rng = ScriptedRandom::always(0.0);
        ring.try_admit(&running(2, 0.0), &[0, 1], &mut rng).unwrap();
        ring.try_admit(&running(2, 0.0), &[0, 1], &mut rng).unwrap();
        assert_eq!(ring.insert_cursor(), 0);
        assert_eq!(ring.len(), 4);
    }

    #[test]
    fn test_oversized_block_is_rejected_before_drawing() {
        let mut ring = TrajectoryRingBuffer::new(&config(2, 3));
        let mut rng = ScriptedRandom::new(vec![0.0]);
        assert_eq!(
            ring.try_admit(&running(3, 0.0), &[0, 1, 2], &mut rng),
            Err(StorageError::BlockTooLarge {
                block: 3,
                capacity: 2
            })
        );
        assert!(ring.is_empty());
        assert_eq!(ring.insert_cursor(), 0);
        assert_eq!(rng.draws_taken(), 0);
    }

    #[test]
    fn test_unknown_actor_is_rejected() {
        let mut ring = TrajectoryRingBuffer::new(&config(4, 2));
        let mut rng = ScriptedRandom::always(0.0);
        let result = ring.try_admit(&running(2, 0.0), &[0, 2], &mut rng);
        assert_eq!(
            result,
            Err(StorageError::ActorOutOfRange {
                actor: 2,
                num_processes: 2
            })
        );
        assert!(ring.fields().slot_is_zero(0));
    }

    #[test]
    fn test_horizon_mismatch_is_rejected() {
        let mut ring = TrajectoryRingBuffer::new(&config(4, 1).with_max_trajectory_len(5));
        let mut rng = ScriptedRandom::always(0.0);
        let result = ring.try_admit(&running(1, 0.0), &[0], &mut rng);
        assert!(matches!(
            result,
            Err(StorageError::DimensionMismatch {
                field: "horizon",
                expected: 5,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_gather_tasks() {
        let cfg = config(3, 2).with_task_dim(2);
        let mut source = RunningBuffer::new(&cfg);
        let values = [0.0, 0.0];
        let done = [false, false];
        let tasks = [1.0, 2.0, 3.0, 4.0];
        let step = StepBatch::new(&values, &values, &values, &values, &done)
            .with_masks(&values, &values)
            .with_completion_flags(&values, &values)
            .with_tasks(&tasks);
        source.insert(&step).unwrap();

        let mut ring = TrajectoryRingBuffer::new(&cfg);
        ring.try_admit(&source, &[1, 0], &mut ScriptedRandom::always(0.0)).unwrap();
        assert_eq!(ring.task(0), Some(&[3.0, 4.0][..]));
        assert_eq!(ring.gather_tasks(&[1, 1, 0]), Some(vec![1.0, 2.0, 1.0, 2.0, 3.0, 4.0]));
    }
}
