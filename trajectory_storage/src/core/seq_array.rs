//! Dense time-major sequence storage.
//!
//! A [`SeqArray`] holds `horizon x slots x dim` values laid out as
//! `[time][slot][dim]`. This is the sequence-first layout recurrent encoders
//! consume, so gathered batches can be handed to a tensor without
//! transposition.

/// Fixed-shape `[time][slot][dim]` array of `f32`.
#[derive(Debug, Clone, PartialEq)]
pub struct SeqArray {
    horizon: usize,
    slots: usize,
    dim: usize,
    data: Vec<f32>,
}

impl SeqArray {
    /// Allocate a zeroed array.
    pub fn zeros(horizon: usize, slots: usize, dim: usize) -> Self {
        Self {
            horizon,
            slots,
            dim,
            data: vec![0.0; horizon * slots * dim],
        }
    }

    /// Length of the time axis.
    #[inline]
    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// Number of slots (actors or stored trajectories).
    #[inline]
    pub fn slots(&self) -> usize {
        self.slots
    }

    /// Feature dimensionality.
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Raw `[time][slot][dim]` data.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    fn offset(&self, t: usize, slot: usize) -> usize {
        debug_assert!(t < self.horizon, "time index {} >= {}", t, self.horizon);
        debug_assert!(slot < self.slots, "slot index {} >= {}", slot, self.slots);
        (t * self.slots + slot) * self.dim
    }

    /// All slots at time `t`, contiguous.
    pub fn row_mut(&mut self, t: usize) -> &mut [f32] {
        let start = self.offset(t, 0);
        let len = self.slots * self.dim;
        &mut self.data[start..start + len]
    }

    /// Values of one slot at time `t`.
    pub fn cell(&self, t: usize, slot: usize) -> &[f32] {
        let start = self.offset(t, slot);
        &self.data[start..start + self.dim]
    }

    /// Mutable values of one slot at time `t`.
    pub fn cell_mut(&mut self, t: usize, slot: usize) -> &mut [f32] {
        let start = self.offset(t, slot);
        let dim = self.dim;
        &mut self.data[start..start + dim]
    }

    /// Zero every timestep of one slot.
    pub fn zero_slot(&mut self, slot: usize) {
        for t in 0..self.horizon {
            self.cell_mut(t, slot).fill(0.0);
        }
    }

    /// Zero the whole array.
    pub fn zero_all(&mut self) {
        self.data.fill(0.0);
    }

    /// Copy the full time series of `src_slot` in `src` into `dst_slot`.
    pub fn copy_slot_from(&mut self, dst_slot: usize, src: &SeqArray, src_slot: usize) {
        debug_assert_eq!(self.horizon, src.horizon);
        debug_assert_eq!(self.dim, src.dim);
        for t in 0..self.horizon {
            self.cell_mut(t, dst_slot).copy_from_slice(src.cell(t, src_slot));
        }
    }

    /// Gather the first `len` timesteps of the given slots.
    ///
    /// Output layout is `[len][slots.len()][dim]`; slots may repeat.
    pub fn gather(&self, slots: &[usize], len: usize) -> Vec<f32> {
        let mut out = Vec::with_capacity(len * slots.len() * self.dim);
        for t in 0..len {
            for &slot in slots {
                out.extend_from_slice(self.cell(t, slot));
            }
        }
        out
    }

    /// Full time series of one slot, `[horizon][dim]`.
    pub fn slot_values(&self, slot: usize) -> Vec<f32> {
        self.gather(&[slot], self.horizon)
    }
}
