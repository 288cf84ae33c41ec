//! # Trajectory control module
//!
//! Trajectory control is responsible for keeping the vehicle on the reference
//! path and at the speed demanded by the path. It is run once per frame by an
//! external driving loop, which pushes the current pose, speed and timestamp
//! in with `update_values`, calls `update_controls`, and reads the actuator
//! demands back out with `get_commands`.
//!
//! The path is a sequence of waypoints on the XY plane of the world frame,
//! each annotated with the speed to track at that point. A path segment is
//! the line joining two neighbouring waypoints.
//!
//! Each active frame is processed in three stages:
//!
//!  1. The reference tracker finds the waypoint nearest to the vehicle and
//!     takes its target speed as the desired speed.
//!  1. The longitudinal controller runs a PID on the speed error, producing
//!     throttle or brake.
//!  1. The lateral controller runs a Stanley-style law on the heading of the
//!     nearest path segment and the cross-track error of the front axle,
//!     producing steer.
//!
//! The first frames, before the driving loop reports a non-zero frame index,
//! are priming frames. No commands are computed during priming, only the
//! timestamp and speed error are recorded so that the first active frame has
//! a previous value to differentiate against.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod controllers;
pub mod params;
pub mod ref_tracker;
pub mod state;
pub mod waypoint;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use controllers::*;
pub use params::Params;
pub use ref_tracker::*;
pub use state::*;
pub use waypoint::*;


// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Potential errors that can occur during processing of the module.
#[derive(Debug, thiserror::Error)]
pub enum TrajCtrlError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(util::params::LoadError),

    /// The waypoint sequence is empty so no desired speed can be selected.
    #[error("The waypoint sequence is empty")]
    EmptyWaypoints,

    /// Lateral control needs at least one segment, i.e. two waypoints.
    #[error("Lateral control requires at least 2 waypoints, found {0}")]
    InsufficientWaypoints(usize),

    /// Two active frames were processed without any time elapsing between
    /// them, so the derivative of the speed error is undefined.
    #[error(
        "No time elapsed since the previous frame (previous {prev_time_s} s, \
         current {time_s} s)"
    )]
    DegenerateTimeStep {
        prev_time_s: f64,
        time_s: f64
    },

    /// Controls were requested before any frame input was set.
    #[error("No frame input has been set")]
    NoFrameInput
}
