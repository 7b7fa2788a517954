//! Core types shared by the running and permanent buffers.

pub mod random;
pub mod seq_array;
pub mod step;

pub use random::{RandomSource, StdRandom};
pub use seq_array::SeqArray;
pub use step::StepBatch;
