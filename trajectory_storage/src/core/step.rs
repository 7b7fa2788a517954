//! Per-step input from all actors.
//!
//! A [`StepBatch`] carries one environment step for every actor as flat,
//! actor-major slices: `prev_states` is `[num_processes * state_dim]`,
//! scalar fields are `[num_processes]`.

use crate::config::StorageConfig;
use crate::error::StorageError;

/// One environment step across all actors.
///
/// Borrowed so that the caller's vectorized env buffers can be passed without
/// copying; the storage copies what it keeps.
#[derive(Debug, Clone, Copy)]
pub struct StepBatch<'a> {
    /// Observations before the step, `[n * state_dim]`.
    pub prev_states: &'a [f32],
    /// Actions taken, `[n * action_dim]`.
    pub actions: &'a [f32],
    /// Observations after the step, `[n * state_dim]`.
    pub next_states: &'a [f32],
    /// Environment rewards, `[n]`.
    pub rewards: &'a [f32],
    /// Intrinsic rewards, `[n]` (required when intrinsic rewards are tracked).
    pub intrinsic_rewards: Option<&'a [f32]>,
    /// Continuation masks (0 at true terminals), `[n]`.
    pub masks: &'a [f32],
    /// Time-limit masks (0 at truncations), `[n]`.
    pub bad_masks: &'a [f32],
    /// Task-completion flags, `[n]`.
    pub done_task: &'a [f32],
    /// Episode-completion flags, `[n]`.
    pub done_episode: &'a [f32],
    /// Whether each actor's trajectory ended with this step, `[n]`.
    pub done: &'a [bool],
    /// Task descriptors, `[n * task_dim]`.
    pub tasks: Option<&'a [f32]>,
}

impl<'a> StepBatch<'a> {
    /// Create a step with the core transition fields.
    ///
    /// Masks and completion flags start empty and must be supplied via
    /// [`with_masks`](Self::with_masks) and
    /// [`with_completion_flags`](Self::with_completion_flags) before insert.
    pub fn new(
        prev_states: &'a [f32],
        actions: &'a [f32],
        next_states: &'a [f32],
        rewards: &'a [f32],
        done: &'a [bool],
    ) -> Self {
        Self {
            prev_states,
            actions,
            next_states,
            rewards,
            intrinsic_rewards: None,
            masks: &[],
            bad_masks: &[],
            done_task: &[],
            done_episode: &[],
            done,
            tasks: None,
        }
    }

    /// Set the terminal and time-limit masks.
    pub fn with_masks(mut self, masks: &'a [f32], bad_masks: &'a [f32]) -> Self {
        self.masks = masks;
        self.bad_masks = bad_masks;
        self
    }

    /// Set task- and episode-completion flags.
    pub fn with_completion_flags(mut self, done_task: &'a [f32], done_episode: &'a [f32]) -> Self {
        self.done_task = done_task;
        self.done_episode = done_episode;
        self
    }

    /// Attach intrinsic rewards.
    pub fn with_intrinsic_rewards(mut self, intrinsic_rewards: &'a [f32]) -> Self {
        self.intrinsic_rewards = Some(intrinsic_rewards);
        self
    }

    /// Attach task descriptors.
    pub fn with_tasks(mut self, tasks: &'a [f32]) -> Self {
        self.tasks = Some(tasks);
        self
    }

    /// Number of actors in this step.
    pub fn num_processes(&self) -> usize {
        self.done.len()
    }

    /// Whether every actor finished its trajectory on this step.
    pub fn all_done(&self) -> bool {
        !self.done.is_empty() && self.done.iter().all(|&d| d)
    }

    /// Check every field against the configured shapes.
    pub fn validate(&self, config: &StorageConfig) -> Result<(), StorageError> {
        let n = config.num_processes;
        check("done", n, self.done.len())?;
        check("prev_states", n * config.state_dim, self.prev_states.len())?;
        check("next_states", n * config.state_dim, self.next_states.len())?;
        check("actions", n * config.action_dim, self.actions.len())?;
        check("rewards", n, self.rewards.len())?;
        check("masks", n, self.masks.len())?;
        check("bad_masks", n, self.bad_masks.len())?;
        check("done_task", n, self.done_task.len())?;
        check("done_episode", n, self.done_episode.len())?;

        if config.save_intrinsic_reward {
            let intrinsic = self
                .intrinsic_rewards
                .ok_or(StorageError::MissingIntrinsicRewards)?;
            check("intrinsic_rewards", n, intrinsic.len())?;
        }

        if let Some(tasks) = self.tasks {
            check("tasks", n * config.task_size(), tasks.len())?;
        }
        Ok(())
    }
}

fn check(field: &'static str, expected: usize, actual: usize) -> Result<(), StorageError> {
    if expected == actual {
        Ok(())
    } else {
        Err(StorageError::DimensionMismatch {
            field,
            expected,
            actual,
        })
    }
}

/// Row `index` of a flat `[rows * dim]` slice.
#[inline]
pub(crate) fn row(values: &[f32], index: usize, dim: usize) -> &[f32] {
    &values[index * dim..(index + 1) * dim]
}
