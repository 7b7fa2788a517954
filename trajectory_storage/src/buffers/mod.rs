//! Trajectory buffers.
//!
//! Two buffers cooperate:
//! - `RunningBuffer`: one in-progress trajectory per actor, grown step by step
//! - `TrajectoryRingBuffer`: completed trajectories, fixed capacity,
//!   probabilistic admission and wrap-around overwrite
//!
//! Both store their data in `TrajectoryFields`, time-major `[T][slot][dim]`.

pub mod fields;
pub mod running_buffer;
pub mod trajectory_ring;

pub use fields::TrajectoryFields;
pub use running_buffer::{InsertPath, RunningBuffer, RunningSnapshot};
pub use trajectory_ring::{Admission, TrajectoryRingBuffer};
