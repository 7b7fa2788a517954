//! Running buffer: one in-progress trajectory per actor.
//!
//! Key characteristics:
//! - One slot per actor, each with its own timestep cursor
//! - Fast path when all actors are at the same timestep (one contiguous
//!   copy per field), slow path otherwise (one copy per actor)
//! - Task descriptors are latched on the first step of a trajectory
//! - Slots are zeroed as soon as their trajectory is flushed
//!
//! Entries at offsets `>= timesteps[actor]` are always zero.

use crate::config::StorageConfig;
use crate::core::step::{row, StepBatch};
use crate::error::StorageError;

use super::fields::TrajectoryFields;

/// Which insertion path a step took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPath {
    /// All cursors were equal; the step was written as one row.
    Uniform,
    /// Cursors differed; each actor was written at its own offset.
    PerActor,
}

/// Borrowed view of the running buffer.
#[derive(Debug, Clone, Copy)]
pub struct RunningSnapshot<'a> {
    /// Zero-padded in-progress trajectories, `[T, num_processes, dim]`.
    pub fields: &'a TrajectoryFields,
    /// Latched task descriptors, `[num_processes * task_dim]`.
    pub tasks: Option<&'a [f32]>,
    /// Number of valid steps per actor.
    pub timesteps: &'a [usize],
}

/// Per-actor accumulation of in-progress trajectories.
#[derive(Debug, Clone)]
pub struct RunningBuffer {
    fields: TrajectoryFields,
    /// `[num_processes * task_dim]`
    tasks: Option<Vec<f32>>,
    task_dim: usize,
    task_latched: Vec<bool>,
    /// Next write offset per actor.
    timesteps: Vec<usize>,
}

impl RunningBuffer {
    /// Create a zeroed running buffer.
    pub fn new(config: &StorageConfig) -> Self {
        let n = config.num_processes;
        Self {
            fields: TrajectoryFields::zeros(
                config.max_trajectory_len,
                n,
                config.state_dim,
                config.action_dim,
                config.save_intrinsic_reward,
            ),
            tasks: config.task_dim.map(|d| vec![0.0; n * d]),
            task_dim: config.task_size(),
            task_latched: vec![false; n],
            timesteps: vec![0; n],
        }
    }

    /// Number of actors.
    pub fn num_processes(&self) -> usize {
        self.timesteps.len()
    }

    /// Trajectory horizon.
    pub fn horizon(&self) -> usize {
        self.fields.horizon()
    }

    /// Next write offset (= current trajectory length) per actor.
    pub fn timesteps(&self) -> &[usize] {
        &self.timesteps
    }

    /// Stored fields.
    pub fn fields(&self) -> &TrajectoryFields {
        &self.fields
    }

    /// Latched task descriptor of one actor.
    pub fn task(&self, actor: usize) -> Option<&[f32]> {
        self.tasks
            .as_deref()
            .map(|tasks| row(tasks, actor, self.task_dim))
    }

    /// Whether the actor's task descriptor has been latched.
    pub fn task_latched(&self, actor: usize) -> bool {
        self.task_latched[actor]
    }

    /// Shared cursor value if every actor is at the same timestep.
    pub fn uniform_timestep(&self) -> Option<usize> {
        let (&first, rest) = self.timesteps.split_first()?;
        rest.iter().all(|&t| t == first).then_some(first)
    }

    /// Append one step for every actor.
    ///
    /// Fails without modifying anything if any actor is already at the
    /// horizon. The step must already be validated against the config.
    pub fn insert(&mut self, step: &StepBatch<'_>) -> Result<InsertPath, StorageError> {
        let horizon = self.horizon();
        if let Some(actor) = self.timesteps.iter().position(|&t| t >= horizon) {
            return Err(StorageError::HorizonExceeded { actor, horizon });
        }

        match self.uniform_timestep() {
            Some(t) => {
                self.fields.write_row(t, step);
                if let Some(tasks) = step.tasks {
                    for actor in 0..self.num_processes() {
                        self.latch_task(actor, tasks);
                    }
                }
                for cursor in &mut self.timesteps {
                    *cursor += 1;
                }
                Ok(InsertPath::Uniform)
            }
            None => {
                for actor in 0..self.num_processes() {
                    self.insert_actor(actor, step);
                }
                Ok(InsertPath::PerActor)
            }
        }
    }

    /// Append one actor's part of the step at its own cursor.
    pub(crate) fn insert_actor(&mut self, actor: usize, step: &StepBatch<'_>) {
        let t = self.timesteps[actor];
        self.fields.write_cell(t, actor, step, actor);
        if let Some(tasks) = step.tasks {
            self.latch_task(actor, tasks);
        }
        self.timesteps[actor] += 1;
    }

    fn latch_task(&mut self, actor: usize, tasks: &[f32]) {
        if self.task_latched[actor] {
            return;
        }
        let dim = self.task_dim;
        if let Some(store) = self.tasks.as_mut() {
            store[actor * dim..(actor + 1) * dim].copy_from_slice(row(tasks, actor, dim));
            self.task_latched[actor] = true;
        }
    }

    /// Borrowed view of all in-progress trajectories.
    pub fn snapshot(&self) -> RunningSnapshot<'_> {
        RunningSnapshot {
            fields: &self.fields,
            tasks: self.tasks.as_deref(),
            timesteps: &self.timesteps,
        }
    }

    /// Clear one actor's slot.
    pub fn reset(&mut self, actor: usize) {
        self.fields.zero_slot(actor);
        if let Some(tasks) = self.tasks.as_mut() {
            let dim = self.task_dim;
            tasks[actor * dim..(actor + 1) * dim].fill(0.0);
        }
        self.task_latched[actor] = false;
        self.timesteps[actor] = 0;
    }

    /// Clear every slot.
    pub fn reset_all(&mut self) {
        self.fields.zero_all();
        if let Some(tasks) = self.tasks.as_mut() {
            tasks.fill(0.0);
        }
        self.task_latched.fill(false);
        self.timesteps.fill(0);
    }

    /// Whether one actor's slot and task latch are fully cleared.
    pub fn is_reset(&self, actor: usize) -> bool {
        self.timesteps[actor] == 0
            && !self.task_latched[actor]
            && self.fields.slot_is_zero(actor)
            && self.task(actor).map_or(true, |t| t.iter().all(|&v| v == 0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> StorageConfig {
        StorageConfig::new()
            .with_num_processes(2)
            .with_max_trajectory_len(3)
            .with_dims(1, 1)
            .with_task_dim(1)
    }

    #[test]
    fn test_new_is_empty() {
        let buffer = RunningBuffer::new(&config());
        assert_eq!(buffer.num_processes(), 2);
        assert_eq!(buffer.horizon(), 3);
        assert_eq!(buffer.timesteps(), &[0, 0]);
        assert_eq!(buffer.uniform_timestep(), Some(0));
        assert!(buffer.is_reset(0) && buffer.is_reset(1));
    }

    #[test]
    fn test_uniform_then_per_actor() {
        let mut buffer = RunningBuffer::new(&config());
        let values = [1.0, 2.0];
        let done = [false, false];
        let step = StepBatch::new(&values, &values, &values, &values, &done)
            .with_masks(&values, &values)
            .with_completion_flags(&values, &values);

        assert_eq!(buffer.insert(&step), Ok(InsertPath::Uniform));
        buffer.reset(0);
        assert_eq!(buffer.uniform_timestep(), None);
        assert_eq!(buffer.insert(&step), Ok(InsertPath::PerActor));
        assert_eq!(buffer.timesteps(), &[1, 2]);
        assert_eq!(buffer.fields().rewards.slot_values(0), vec![1.0, 0.0, 0.0]);
        assert_eq!(buffer.fields().rewards.slot_values(1), vec![2.0, 2.0, 0.0]);
    }

    #[test]
    fn test_task_latched_once() {
        let mut buffer = RunningBuffer::new(&config());
        let values = [0.0, 0.0];
        let done = [false, false];
        let first = [5.0, 6.0];
        let second = [9.0, 9.0];
        let base = StepBatch::new(&values, &values, &values, &values, &done)
            .with_masks(&values, &values)
            .with_completion_flags(&values, &values);

        buffer.insert(&base.with_tasks(&first)).unwrap();
        buffer.insert(&base.with_tasks(&second)).unwrap();
        assert_eq!(buffer.task(0), Some(&[5.0][..]));
        assert_eq!(buffer.task(1), Some(&[6.0][..]));

        buffer.reset(1);
        assert!(!buffer.task_latched(1));
        assert_eq!(buffer.task(1), Some(&[0.0][..]));
    }

    #[test]
    fn test_horizon_exceeded_leaves_state_untouched() {
        let mut buffer = RunningBuffer::new(&config());
        let values = [1.0, 1.0];
        let done = [false, false];
        let step = StepBatch::new(&values, &values, &values, &values, &done)
            .with_masks(&values, &values)
            .with_completion_flags(&values, &values);

        for _ in 0..3 {
            buffer.insert(&step).unwrap();
        }
        let before = buffer.fields().clone();
        assert_eq!(
            buffer.insert(&step),
            Err(StorageError::HorizonExceeded {
                actor: 0,
                horizon: 3
            })
        );
        assert_eq!(buffer.fields(), &before);
        assert_eq!(buffer.timesteps(), &[3, 3]);
    }
}
