//! The per-step fields stored for every trajectory.
//!
//! Both buffers hold the same set of [`SeqArray`]s; only the slot axis
//! differs (actors for the running buffer, stored trajectories for the ring
//! buffer). Keeping them in one struct lets a flush copy a slot field by
//! field without either buffer knowing the other's layout.

use crate::core::seq_array::SeqArray;
use crate::core::step::{row, StepBatch};

/// Time-major arrays for each trajectory field.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryFields {
    /// Observations 0..N-1, `[T, slots, state_dim]`.
    pub prev_states: SeqArray,
    /// Observations 1..N, `[T, slots, state_dim]`.
    pub next_states: SeqArray,
    /// `[T, slots, action_dim]`
    pub actions: SeqArray,
    /// `[T, slots, 1]`
    pub rewards: SeqArray,
    /// `[T, slots, 1]`, present only when intrinsic rewards are tracked.
    pub intrinsic_rewards: Option<SeqArray>,
    /// `[T, slots, 1]`
    pub masks: SeqArray,
    /// `[T, slots, 1]`
    pub bad_masks: SeqArray,
    /// `[T, slots, 1]`
    pub done_task: SeqArray,
    /// `[T, slots, 1]`
    pub done_episode: SeqArray,
}

impl TrajectoryFields {
    /// Allocate zeroed fields.
    pub fn zeros(
        horizon: usize,
        slots: usize,
        state_dim: usize,
        action_dim: usize,
        intrinsic: bool,
    ) -> Self {
        let scalar = || SeqArray::zeros(horizon, slots, 1);
        Self {
            prev_states: SeqArray::zeros(horizon, slots, state_dim),
            next_states: SeqArray::zeros(horizon, slots, state_dim),
            actions: SeqArray::zeros(horizon, slots, action_dim),
            rewards: scalar(),
            intrinsic_rewards: intrinsic.then(scalar),
            masks: scalar(),
            bad_masks: scalar(),
            done_task: scalar(),
            done_episode: scalar(),
        }
    }

    /// Length of the time axis.
    pub fn horizon(&self) -> usize {
        self.prev_states.horizon()
    }

    /// Number of slots.
    pub fn slots(&self) -> usize {
        self.prev_states.slots()
    }

    fn arrays(&self) -> Vec<&SeqArray> {
        let mut arrays = vec![
            &self.prev_states,
            &self.next_states,
            &self.actions,
            &self.rewards,
            &self.masks,
            &self.bad_masks,
            &self.done_task,
            &self.done_episode,
        ];
        if let Some(intrinsic) = self.intrinsic_rewards.as_ref() {
            arrays.push(intrinsic);
        }
        arrays
    }

    fn arrays_mut(&mut self) -> Vec<&mut SeqArray> {
        let mut arrays = vec![
            &mut self.prev_states,
            &mut self.next_states,
            &mut self.actions,
            &mut self.rewards,
            &mut self.masks,
            &mut self.bad_masks,
            &mut self.done_task,
            &mut self.done_episode,
        ];
        if let Some(intrinsic) = self.intrinsic_rewards.as_mut() {
            arrays.push(intrinsic);
        }
        arrays
    }

    /// Write the whole step at time `t` for every slot.
    ///
    /// The step's actor-major slices line up with the `[slot][dim]` row at
    /// `t`, so each field is a single contiguous copy.
    pub fn write_row(&mut self, t: usize, step: &StepBatch<'_>) {
        self.prev_states.row_mut(t).copy_from_slice(step.prev_states);
        self.next_states.row_mut(t).copy_from_slice(step.next_states);
        self.actions.row_mut(t).copy_from_slice(step.actions);
        self.rewards.row_mut(t).copy_from_slice(step.rewards);
        self.masks.row_mut(t).copy_from_slice(step.masks);
        self.bad_masks.row_mut(t).copy_from_slice(step.bad_masks);
        self.done_task.row_mut(t).copy_from_slice(step.done_task);
        self.done_episode.row_mut(t).copy_from_slice(step.done_episode);
        if let (Some(dst), Some(src)) = (self.intrinsic_rewards.as_mut(), step.intrinsic_rewards) {
            dst.row_mut(t).copy_from_slice(src);
        }
    }

    /// Write one actor's part of the step at `(t, slot)`.
    pub fn write_cell(&mut self, t: usize, slot: usize, step: &StepBatch<'_>, actor: usize) {
        let state_dim = self.prev_states.dim();
        let action_dim = self.actions.dim();
        self.prev_states
            .cell_mut(t, slot)
            .copy_from_slice(row(step.prev_states, actor, state_dim));
        self.next_states
            .cell_mut(t, slot)
            .copy_from_slice(row(step.next_states, actor, state_dim));
        self.actions
            .cell_mut(t, slot)
            .copy_from_slice(row(step.actions, actor, action_dim));
        self.rewards.cell_mut(t, slot)[0] = step.rewards[actor];
        self.masks.cell_mut(t, slot)[0] = step.masks[actor];
        self.bad_masks.cell_mut(t, slot)[0] = step.bad_masks[actor];
        self.done_task.cell_mut(t, slot)[0] = step.done_task[actor];
        self.done_episode.cell_mut(t, slot)[0] = step.done_episode[actor];
        if let (Some(dst), Some(src)) = (self.intrinsic_rewards.as_mut(), step.intrinsic_rewards) {
            dst.cell_mut(t, slot)[0] = src[actor];
        }
    }

    /// Copy every field of `src_slot` in `src` into `dst_slot`.
    pub fn copy_slot_from(&mut self, dst_slot: usize, src: &TrajectoryFields, src_slot: usize) {
        for (dst, src) in self.arrays_mut().into_iter().zip(src.arrays()) {
            dst.copy_slot_from(dst_slot, src, src_slot);
        }
    }

    /// Zero one slot across all fields.
    pub fn zero_slot(&mut self, slot: usize) {
        for array in self.arrays_mut() {
            array.zero_slot(slot);
        }
    }

    /// Zero all fields.
    pub fn zero_all(&mut self) {
        for array in self.arrays_mut() {
            array.zero_all();
        }
    }

    /// Whether every value of `slot` is zero.
    pub fn slot_is_zero(&self, slot: usize) -> bool {
        self.arrays()
            .into_iter()
            .all(|array| array.slot_values(slot).iter().all(|&v| v == 0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intrinsic_allocated_on_demand() {
        assert!(TrajectoryFields::zeros(2, 2, 1, 1, false)
            .intrinsic_rewards
            .is_none());
        assert!(TrajectoryFields::zeros(2, 2, 1, 1, true)
            .intrinsic_rewards
            .is_some());
    }

    #[test]
    fn test_write_cell_then_zero_slot() {
        let mut fields = TrajectoryFields::zeros(3, 2, 2, 1, true);
        let states = [1.0, 2.0, 3.0, 4.0];
        let scalars = [0.5, 0.7];
        let done = [false, false];
        let step = StepBatch::new(&states, &scalars, &states, &scalars, &done)
            .with_masks(&scalars, &scalars)
            .with_completion_flags(&scalars, &scalars)
            .with_intrinsic_rewards(&scalars);

        fields.write_cell(1, 0, &step, 1);
        assert_eq!(fields.prev_states.cell(1, 0), &[3.0, 4.0]);
        assert_eq!(fields.actions.cell(1, 0), &[0.7]);
        assert_eq!(fields.intrinsic_rewards.as_ref().unwrap().cell(1, 0), &[0.7]);
        assert!(!fields.slot_is_zero(0));
        assert!(fields.slot_is_zero(1));

        fields.zero_slot(0);
        assert!(fields.slot_is_zero(0));
    }

    #[test]
    fn test_copy_slot_between_shapes() {
        let mut running = TrajectoryFields::zeros(2, 2, 1, 1, false);
        let states = [1.0, 2.0];
        let done = [false, false];
        let step = StepBatch::new(&states, &states, &states, &states, &done)
            .with_masks(&states, &states)
            .with_completion_flags(&states, &states);
        running.write_row(0, &step);

        let mut ring = TrajectoryFields::zeros(2, 5, 1, 1, false);
        ring.copy_slot_from(4, &running, 1);
        assert_eq!(ring.rewards.slot_values(4), vec![2.0, 0.0]);
        assert_eq!(ring.done_episode.slot_values(4), vec![2.0, 0.0]);
        assert!(ring.slot_is_zero(0));
    }
}
