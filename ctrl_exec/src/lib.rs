//! # Controller library.
//!
//! This library allows other crates in the workspace (and the benches) to
//! access items defined inside the controller crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Trajectory control module - computes throttle, brake and steer to follow a waypoint path
pub mod traj_ctrl;
