//! # Waypoints and frame input
//!
//! The reference path handed to trajectory control and the per-frame input
//! pushed in by the driving loop.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;
use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single point on the reference path with the speed to track there.
///
/// Waypoint files are plain `x,y,speed` rows, which deserialise straight into
/// this struct.
#[derive(Debug, Copy, Clone, PartialEq, Deserialize)]
pub struct Waypoint {
    /// Position along the world X axis
    ///
    /// Units: meters
    pub x_m: f64,

    /// Position along the world Y axis
    ///
    /// Units: meters
    pub y_m: f64,

    /// Speed to track at this point
    ///
    /// Units: meters/second
    pub speed_ms: f64
}

/// The vehicle state supplied by the driving loop at the start of a frame.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct FrameInput {
    /// Position of the vehicle (rear axle) in the world frame
    ///
    /// Units: meters
    pub position_m: Vector2<f64>,

    /// Heading of the vehicle, angle to the +ve X axis
    ///
    /// Units: radians
    pub yaw_rad: f64,

    /// Forward speed of the vehicle
    ///
    /// Units: meters/second
    pub speed_ms: f64,

    /// Simulation time of this frame. Non-decreasing across frames.
    ///
    /// Units: seconds
    pub time_s: f64,

    /// Index of this frame as counted by the driving loop
    pub frame: u64
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Waypoint {
    pub fn new(x_m: f64, y_m: f64, speed_ms: f64) -> Self {
        Self { x_m, y_m, speed_ms }
    }

    /// Position of the waypoint as a vector
    pub fn position_m(&self) -> Vector2<f64> {
        Vector2::new(self.x_m, self.y_m)
    }
}

impl From<(f64, f64, f64)> for Waypoint {
    fn from(t: (f64, f64, f64)) -> Self {
        Self::new(t.0, t.1, t.2)
    }
}

impl FrameInput {
    pub fn new(
        x_m: f64, 
        y_m: f64, 
        yaw_rad: f64, 
        speed_ms: f64, 
        time_s: f64, 
        frame: u64
    ) -> Self {
        Self {
            position_m: Vector2::new(x_m, y_m),
            yaw_rad,
            speed_ms,
            time_s,
            frame
        }
    }

    /// Unit vector pointing along the vehicle's heading
    pub fn forward2(&self) -> Vector2<f64> {
        Vector2::new(self.yaw_rad.cos(), self.yaw_rad.sin())
    }

    /// The point `dist_m` ahead of the vehicle position along its heading.
    pub fn point_ahead_m(&self, dist_m: f64) -> Vector2<f64> {
        self.position_m + dist_m * self.forward2()
    }
}
