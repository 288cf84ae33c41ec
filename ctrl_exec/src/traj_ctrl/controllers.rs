//! # Trajectory controllers module
//!
//! This module provides the longitudinal (speed) and lateral (steer)
//! controllers used by TrajCtrl, including their error calculations.
//!
//! Both controllers are stateless with respect to the frame sequence: the
//! persistent longitudinal state is passed in and a new state handed back,
//! so TrajCtrl decides whether a frame's results are committed.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use nalgebra::Vector2;

// Internal
use super::{nearest_waypoint, FrameInput, Params, TrajCtrlError, Waypoint};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// State of the longitudinal controller carried between frames.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct LongState {
    /// Time of the previous frame
    ///
    /// Units: seconds
    pub prev_time_s: f64,

    /// Speed error of the previous frame
    ///
    /// Units: meters/second
    pub prev_error: f64,

    /// Accumulated speed error up to and including the previous frame.
    ///
    /// This is a plain sum of the errors, it is not weighted by the frame
    /// period and has no windup limit.
    pub prev_integral: f64
}

/// PID controller on the speed error.
#[derive(Debug, Copy, Clone)]
pub struct LongController {
    /// Proportional gain
    k_p: f64,

    /// Integral gain
    k_i: f64,

    /// Derivative gain
    k_d: f64
}

/// Output of one longitudinal controller update.
///
/// The throttle and brake are raw, they are clamped by the output stage.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LongOutput {
    pub throttle: f64,
    pub brake: f64,

    /// The speed error this frame
    pub error: f64,

    /// State to carry into the next frame
    pub state: LongState
}

/// Stanley-style steer controller.
#[derive(Debug, Copy, Clone)]
pub struct LatController {
    /// Distance from the vehicle position to the front axle reference point
    ///
    /// Units: meters
    front_axle_dist_m: f64,

    /// Cross-track error gain
    cross_track_k: f64,

    /// Threshold below which a segment is treated as vertical
    seg_guard_threshold_m: f64
}

/// Output of one lateral controller update.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LatOutput {
    /// Raw steer demand, not yet normalised or clamped
    ///
    /// Units: radians
    pub steer_rad: f64,

    /// Index of the waypoint nearest to the front axle
    pub target_index: usize,

    /// Signed distance of the front axle from the target waypoint along the
    /// vehicle's right-hand lateral axis
    ///
    /// Units: meters
    pub cross_track_error_m: f64,

    /// Heading correction derived from the cross-track error
    ///
    /// Units: radians
    pub cross_track_heading_rad: f64,

    /// Heading of the target segment minus the vehicle yaw
    ///
    /// Units: radians
    pub heading_error_rad: f64,

    /// True if the target segment was near vertical and its X component was
    /// forced negative.
    pub seg_guard_applied: bool
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LongState {
    /// The state after a priming frame.
    ///
    /// Only the time and error are known in a priming frame, the integral is
    /// carried over untouched.
    pub fn primed(&self, error: f64, time_s: f64) -> Self {
        Self {
            prev_time_s: time_s,
            prev_error: error,
            prev_integral: self.prev_integral
        }
    }
}

impl LongController {

    /// Create a new controller with the given gains.
    pub fn new(k_p: f64, k_i: f64, k_d: f64) -> Self {
        Self { k_p, k_i, k_d }
    }

    /// Create the controller from the trajectory control parameters
    pub fn from_params(params: &Params) -> Self {
        Self::new(params.long_k_p, params.long_k_i, params.long_k_d)
    }

    /// Run the controller for one active frame.
    ///
    /// Fails with `DegenerateTimeStep` if no time has elapsed since the time
    /// stored in `state`, as the derivative term would be undefined.
    pub fn update(
        &self,
        desired_speed_ms: f64,
        speed_ms: f64,
        time_s: f64,
        state: &LongState
    ) -> Result<LongOutput, TrajCtrlError> {
        let error = desired_speed_ms - speed_ms;

        let dt = time_s - state.prev_time_s;
        if !(dt > 0.0) {
            return Err(TrajCtrlError::DegenerateTimeStep {
                prev_time_s: state.prev_time_s,
                time_s
            })
        }

        let integral = state.prev_integral + error;
        let deriv = (error - state.prev_error) / dt;

        let out = 
            self.k_p * error 
            + self.k_i * integral 
            + self.k_d * deriv;

        // A negative output is passed to the brake as is
        let (throttle, brake) = if out < 0.0 {
            (0.0, out)
        }
        else {
            (out, 0.0)
        };

        trace!(
            "LongCtrl: error {:.4} integral {:.4} deriv {:.4} out {:.4}",
            error, integral, deriv, out
        );

        Ok(LongOutput {
            throttle,
            brake,
            error,
            state: LongState {
                prev_time_s: time_s,
                prev_error: error,
                prev_integral: integral
            }
        })
    }
}

impl LatController {

    /// Create a new controller
    pub fn new(wheelbase_m: f64, cross_track_k: f64, seg_guard_threshold_m: f64) -> Self {
        Self {
            front_axle_dist_m: wheelbase_m / 2.0,
            cross_track_k,
            seg_guard_threshold_m
        }
    }

    /// Create the controller from the trajectory control parameters
    pub fn from_params(params: &Params) -> Self {
        Self::new(
            params.wheelbase_m, 
            params.cross_track_k, 
            params.seg_guard_threshold_m
        )
    }

    /// Get the steer demand for the given vehicle state and path.
    ///
    /// The target segment runs from the waypoint nearest the front axle to the
    /// one after it. When the nearest waypoint is the last one the final
    /// segment of the path is used instead.
    pub fn update(
        &self,
        input: &FrameInput,
        waypoints: &[Waypoint]
    ) -> Result<LatOutput, TrajCtrlError> {
        if waypoints.len() < 2 {
            return Err(TrajCtrlError::InsufficientWaypoints(waypoints.len()))
        }

        // Front axle reference point
        let front_m = input.point_ahead_m(self.front_axle_dist_m);

        let target = nearest_waypoint(&front_m, waypoints)?;
        let offset_m = front_m - waypoints[target.index].position_m();

        // Segment to align with
        let seg_start = if target.index + 1 < waypoints.len() {
            target.index
        }
        else {
            target.index - 1
        };
        let mut seg_m = waypoints[seg_start + 1].position_m() 
            - waypoints[seg_start].position_m();

        // Near vertical segments always point in -X
        let seg_guard_applied = seg_m[0].abs() <= self.seg_guard_threshold_m;
        if seg_guard_applied {
            seg_m[0] = -seg_m[0].abs();
        }

        // Project the offset onto the right-hand lateral axis of the vehicle,
        // (-cos(yaw + pi/2), -sin(yaw + pi/2)) written out so that an aligned
        // vehicle gets an exact zero rather than rounding noise.
        let lat_axis = Vector2::new(
            input.yaw_rad.sin(),
            -input.yaw_rad.cos()
        );
        let cross_track_error_m = offset_m.dot(&lat_axis);

        // atan2 rather than a division so that zero speed saturates at +/- pi/2
        let cross_track_heading_rad = 
            (self.cross_track_k * cross_track_error_m).atan2(input.speed_ms);

        let heading_error_rad = seg_m[1].atan2(seg_m[0]) - input.yaw_rad;

        let steer_rad = heading_error_rad + cross_track_heading_rad;

        trace!(
            "LatCtrl: target {} cte {:.4} m cth {:.4} rad head_err {:.4} rad",
            target.index, cross_track_error_m, cross_track_heading_rad, heading_error_rad
        );

        Ok(LatOutput {
            steer_rad,
            target_index: target.index,
            cross_track_error_m,
            cross_track_heading_rad,
            heading_error_rad,
            seg_guard_applied
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

    const EPS: f64 = 1e-9;

    fn line() -> Vec<Waypoint> {
        vec![
            Waypoint::new(0.0, 0.0, 5.0),
            Waypoint::new(10.0, 0.0, 5.0),
            Waypoint::new(20.0, 0.0, 5.0),
        ]
    }

    #[test]
    fn test_long_proportional_only() {
        let ctrl = LongController::new(0.7, 0.0, 0.0);
        let state = LongState {
            prev_time_s: 0.0,
            prev_error: 2.0,
            prev_integral: 0.0
        };

        let out = ctrl.update(5.0, 3.0, 0.1, &state).unwrap();

        assert!((out.throttle - 0.7 * 2.0).abs() < EPS);
        assert_eq!(out.brake, 0.0);
    }

    #[test]
    fn test_long_full_pid() {
        let ctrl = LongController::from_params(&Params::default());

        let out = ctrl.update(5.0, 0.0, 0.1, &LongState::default()).unwrap();

        // 0.7 * 5 + 0.02 * 5 + 0.05 * (5 / 0.1)
        assert!((out.throttle - 6.1).abs() < EPS);
        assert_eq!(out.brake, 0.0);
        assert_eq!(out.error, 5.0);
        assert_eq!(out.state, LongState {
            prev_time_s: 0.1,
            prev_error: 5.0,
            prev_integral: 5.0
        });
    }

    #[test]
    fn test_long_integral_accumulates() {
        let ctrl = LongController::new(0.0, 1.0, 0.0);
        let mut state = LongState::default();

        for i in 1..=4 {
            let out = ctrl.update(1.0, 0.0, i as f64 * 0.1, &state).unwrap();
            state = out.state;
        }

        // No windup limit, one unit per frame regardless of the period
        assert_eq!(state.prev_integral, 4.0);
    }

    #[test]
    fn test_long_negative_output_goes_to_brake() {
        let ctrl = LongController::from_params(&Params::default());
        let state = LongState {
            prev_time_s: 1.0,
            prev_error: -3.0,
            prev_integral: 0.0
        };

        let out = ctrl.update(2.0, 5.0, 1.1, &state).unwrap();

        assert_eq!(out.throttle, 0.0);
        assert!((out.brake - (0.7 * -3.0 + 0.02 * -3.0)).abs() < EPS);
    }

    #[test]
    fn test_long_degenerate_time_step() {
        let ctrl = LongController::from_params(&Params::default());
        let state = LongState {
            prev_time_s: 0.5,
            ..Default::default()
        };

        match ctrl.update(5.0, 0.0, 0.5, &state) {
            Err(TrajCtrlError::DegenerateTimeStep { prev_time_s, time_s }) => {
                assert_eq!(prev_time_s, 0.5);
                assert_eq!(time_s, 0.5);
            },
            r => panic!("Expected DegenerateTimeStep, got {:?}", r)
        }
    }

    #[test]
    fn test_long_primed_state() {
        let state = LongState {
            prev_time_s: 1.0,
            prev_error: 1.0,
            prev_integral: 3.0
        };

        assert_eq!(state.primed(2.0, 1.5), LongState {
            prev_time_s: 1.5,
            prev_error: 2.0,
            prev_integral: 3.0
        });
    }

    #[test]
    fn test_lat_on_path() {
        let ctrl = LatController::from_params(&Params::default());
        let input = FrameInput::new(0.0, 0.0, 0.0, 0.0, 0.1, 1);

        let out = ctrl.update(&input, &line()).unwrap();

        assert_eq!(out.target_index, 0);
        assert!(out.steer_rad.abs() < EPS);
        assert!(!out.seg_guard_applied);
    }

    #[test]
    fn test_lat_left_offset_steers_right() {
        let ctrl = LatController::from_params(&Params::default());

        // 1 m to the left of a path along +X
        let input = FrameInput::new(0.0, 1.0, 0.0, 5.0, 0.1, 1);
        let out = ctrl.update(&input, &line()).unwrap();

        assert!((out.cross_track_error_m + 1.0).abs() < EPS);
        assert!((out.cross_track_heading_rad - (-10f64).atan2(5.0)).abs() < EPS);
        assert!(out.steer_rad < 0.0);

        // And the mirror image
        let input = FrameInput::new(0.0, -1.0, 0.0, 5.0, 0.1, 1);
        let out = ctrl.update(&input, &line()).unwrap();

        assert!((out.cross_track_error_m - 1.0).abs() < EPS);
        assert!(out.steer_rad > 0.0);
    }

    #[test]
    fn test_lat_zero_speed_saturates() {
        let ctrl = LatController::from_params(&Params::default());
        let input = FrameInput::new(0.0, 1.0, 0.0, 0.0, 0.1, 1);

        let out = ctrl.update(&input, &line()).unwrap();

        assert!((out.cross_track_heading_rad + FRAC_PI_2).abs() < EPS);
    }

    #[test]
    fn test_lat_heading_error() {
        let ctrl = LatController::from_params(&Params::default());

        // On the path but yawed to the left
        let input = FrameInput::new(0.0, 0.0, 0.1, 5.0, 0.1, 1);
        let out = ctrl.update(&input, &line()).unwrap();

        assert!(out.cross_track_error_m.abs() < EPS);
        assert!((out.heading_error_rad + 0.1).abs() < EPS);
        assert!((out.steer_rad + 0.1).abs() < EPS);
    }

    #[test]
    fn test_lat_last_waypoint_uses_final_segment() {
        let ctrl = LatController::from_params(&Params::default());
        let wps = vec![
            Waypoint::new(0.0, 0.0, 5.0),
            Waypoint::new(10.0, 0.0, 5.0),
            Waypoint::new(20.0, 10.0, 5.0),
        ];

        let input = FrameInput::new(25.0, 10.0, 0.0, 5.0, 0.1, 1);
        let out = ctrl.update(&input, &wps).unwrap();

        assert_eq!(out.target_index, 2);
        assert!((out.heading_error_rad - FRAC_PI_4).abs() < EPS);
        assert!((out.steer_rad - FRAC_PI_4).abs() < EPS);
    }

    #[test]
    fn test_lat_vertical_segment_guard() {
        let ctrl = LatController::from_params(&Params::default());
        let input = FrameInput::new(0.0, 0.0, FRAC_PI_2, 5.0, 0.1, 1);

        // Exactly vertical, heading is unchanged by the guard
        let wps = vec![
            Waypoint::new(0.0, 0.0, 5.0),
            Waypoint::new(0.0, 10.0, 5.0),
        ];
        let out = ctrl.update(&input, &wps).unwrap();
        assert!(out.seg_guard_applied);
        assert!(out.heading_error_rad.abs() < EPS);

        // Leaning slightly to +X, the guard flips it to lean to -X
        let wps = vec![
            Waypoint::new(0.0, 0.0, 5.0),
            Waypoint::new(5e-5, 10.0, 5.0),
        ];
        let out = ctrl.update(&input, &wps).unwrap();
        assert!(out.seg_guard_applied);
        assert!((out.heading_error_rad - 5e-6).abs() < EPS);

        // Segments pointing in -X are not flipped
        let wps = vec![
            Waypoint::new(0.0, 0.0, 5.0),
            Waypoint::new(-10.0, 0.0, 5.0),
        ];
        let input = FrameInput::new(0.0, 0.0, PI, 5.0, 0.1, 1);
        let out = ctrl.update(&input, &wps).unwrap();
        assert!(!out.seg_guard_applied);
        assert!(out.heading_error_rad.abs() < EPS);
    }

    #[test]
    fn test_lat_insufficient_waypoints() {
        let ctrl = LatController::from_params(&Params::default());
        let input = FrameInput::new(0.0, 0.0, 0.0, 5.0, 0.1, 1);

        assert!(matches!(
            ctrl.update(&input, &[Waypoint::new(1.0, 0.0, 5.0)]),
            Err(TrajCtrlError::InsufficientWaypoints(1))
        ));
        assert!(matches!(
            ctrl.update(&input, &[]),
            Err(TrajCtrlError::InsufficientWaypoints(0))
        ));
    }
}
