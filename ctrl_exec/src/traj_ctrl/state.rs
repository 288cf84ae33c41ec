//! Trajectory control module state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, warn};
use serde::Serialize;

// Internal
use super::*;
use util::{
    archive::{ArchiveError, Archived, Archiver},
    maths::{clamp, lin_map},
    module::State,
    session::Session
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Trajectory control, owns the path and all state carried between frames.
///
/// Only one driving loop may use an instance, there is no internal locking.
pub struct TrajCtrl {
    params: Params,

    long_ctrl: LongController,
    lat_ctrl: LatController,

    /// The path being followed
    waypoints: Vec<Waypoint>,

    /// Input of the current frame, `None` until the first `update_values`
    input: Option<FrameInput>,

    phase: ControlPhase,

    long_state: LongState,

    desired_speed_ms: f64,

    commands: Commands,

    report: StatusReport,
    arch_report: Archiver
}

/// Actuator demands, always within their limits.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Commands {
    /// Range: [0, 1]
    throttle: f64,

    /// Range: [-1, 1]
    steer: f64,

    /// Range: [0, 1]
    brake: f64
}

/// The status report containing monitoring quantities for the last frame.
#[derive(Debug, Default, Copy, Clone, Serialize)]
pub struct StatusReport {
    pub frame: u64,
    pub time_s: f64,
    pub phase: ControlPhase,

    /// Speed of the waypoint nearest the vehicle
    pub desired_speed_ms: f64,

    /// Desired minus current speed
    pub speed_error_ms: f64,

    /// Index of the waypoint nearest the front axle, only set in active frames
    pub target_index: usize,

    pub cross_track_error_m: f64,
    pub heading_error_rad: f64,

    /// True if the target segment was treated as vertical
    pub seg_guard_applied: bool,

    pub throttle: f64,
    pub steer: f64,
    pub brake: f64
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Execution phase of TrajCtrl.
///
/// Starts in `Priming` and latches into `Active` the first time a non-zero
/// frame index is seen. There is no way back to `Priming`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum ControlPhase {
    Priming,
    Active
}

impl Default for ControlPhase {
    fn default() -> Self {
        ControlPhase::Priming
    }
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Commands {

    pub fn throttle(&self) -> f64 {
        self.throttle
    }

    pub fn steer(&self) -> f64 {
        self.steer
    }

    pub fn brake(&self) -> f64 {
        self.brake
    }

    /// Set the throttle, clamped to [0, 1].
    pub fn set_throttle(&mut self, throttle: f64) {
        self.throttle = clamp(throttle, 0.0, 1.0);
    }

    /// Set the steer from an angle in radians.
    ///
    /// The angle is mapped so that `max_steer_rad` gives a full demand, then
    /// clamped to [-1, 1].
    pub fn set_steer_rad(&mut self, steer_rad: f64, max_steer_rad: f64) {
        let steer = lin_map(
            (-max_steer_rad, max_steer_rad), 
            (-1.0, 1.0), 
            steer_rad
        );
        self.steer = clamp(steer, -1.0, 1.0);
    }

    /// Set the brake, clamped to [0, 1].
    pub fn set_brake(&mut self, brake: f64) {
        self.brake = clamp(brake, 0.0, 1.0);
    }

    /// The demands as a `(throttle, steer, brake)` tuple
    pub fn as_tuple(&self) -> (f64, f64, f64) {
        (self.throttle, self.steer, self.brake)
    }
}

impl TrajCtrl {
    /// Create a new controller for the given path using the default
    /// parameters.
    pub fn new(waypoints: Vec<Waypoint>) -> Self {
        Self::with_params(Params::default(), waypoints)
    }

    /// Create a new controller for the given path.
    pub fn with_params(params: Params, waypoints: Vec<Waypoint>) -> Self {
        Self {
            long_ctrl: LongController::from_params(&params),
            lat_ctrl: LatController::from_params(&params),
            params,
            waypoints,
            input: None,
            phase: ControlPhase::Priming,
            long_state: LongState::default(),
            desired_speed_ms: 0.0,
            commands: Commands::default(),
            report: StatusReport::default(),
            arch_report: Archiver::default()
        }
    }

    /// Set the input for the next call to `update_controls`.
    ///
    /// No processing is done here beyond latching the phase into `Active` on
    /// the first non-zero frame index.
    pub fn update_values(
        &mut self, 
        x_m: f64, 
        y_m: f64, 
        yaw_rad: f64, 
        speed_ms: f64, 
        time_s: f64, 
        frame: u64
    ) {
        self.set_input(FrameInput::new(x_m, y_m, yaw_rad, speed_ms, time_s, frame));
    }

    /// Set the input for the next call to `update_controls`.
    pub fn set_input(&mut self, input: FrameInput) {
        if input.frame != 0 && self.phase == ControlPhase::Priming {
            debug!("TrajCtrl active from frame {}", input.frame);
            self.phase = ControlPhase::Active;
        }

        self.input = Some(input);
    }

    /// Replace the path. Subsequent updates only use the new waypoints.
    pub fn update_waypoints(&mut self, waypoints: Vec<Waypoint>) {
        debug!("TrajCtrl path replaced ({} waypoints)", waypoints.len());
        self.waypoints = waypoints;
    }

    /// Process one frame.
    ///
    /// In a priming frame no commands are computed, only the timestamp and
    /// speed error are recorded. In an active frame the speed and steer
    /// controllers are run and the commands updated.
    ///
    /// If an error is returned neither the commands nor the state carried
    /// between frames have been modified.
    pub fn update_controls(&mut self) -> Result<(), TrajCtrlError> {
        let input = self.input.ok_or(TrajCtrlError::NoFrameInput)?;

        let desired_speed_ms = select_desired_speed(
            &input.position_m, &self.waypoints
        )?;
        let speed_error_ms = desired_speed_ms - input.speed_ms;

        let mut report = StatusReport {
            frame: input.frame,
            time_s: input.time_s,
            phase: self.phase,
            desired_speed_ms,
            speed_error_ms,
            ..Default::default()
        };

        match self.phase {
            ControlPhase::Priming => {
                self.long_state = self.long_state.primed(speed_error_ms, input.time_s);
            },
            ControlPhase::Active => {
                let long = self.long_ctrl.update(
                    desired_speed_ms, 
                    input.speed_ms, 
                    input.time_s, 
                    &self.long_state
                )?;
                let lat = self.lat_ctrl.update(&input, &self.waypoints)?;

                if lat.seg_guard_applied {
                    warn!(
                        "Segment at waypoint {} is near vertical, forcing it to point in -X",
                        lat.target_index
                    );
                }

                // Nothing can fail past here
                self.commands.set_throttle(long.throttle);
                self.commands.set_steer_rad(lat.steer_rad, self.params.max_steer_rad);
                self.commands.set_brake(long.brake);
                self.long_state = long.state;

                report.target_index = lat.target_index;
                report.cross_track_error_m = lat.cross_track_error_m;
                report.heading_error_rad = lat.heading_error_rad;
                report.seg_guard_applied = lat.seg_guard_applied;
            }
        }

        report.throttle = self.commands.throttle();
        report.steer = self.commands.steer();
        report.brake = self.commands.brake();

        debug!(
            "TrajCtrl frame {}: v_des {:.2} m/s, cmds (thr {:.3}, str {:.3}, brk {:.3})",
            input.frame, desired_speed_ms, report.throttle, report.steer, report.brake
        );

        self.desired_speed_ms = desired_speed_ms;
        self.report = report;

        Ok(())
    }

    /// Get the last computed `(throttle, steer, brake)` demands.
    pub fn get_commands(&self) -> (f64, f64, f64) {
        self.commands.as_tuple()
    }

    pub fn commands(&self) -> Commands {
        self.commands
    }

    /// The desired speed selected by the last successful update.
    pub fn desired_speed(&self) -> f64 {
        self.desired_speed_ms
    }

    pub fn phase(&self) -> ControlPhase {
        self.phase
    }

    pub fn report(&self) -> StatusReport {
        self.report
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    /// Open the status report archive in the given session.
    pub fn init_archive(&mut self, session: &Session) -> Result<(), ArchiveError> {
        self.arch_report = Archiver::from_path(session, "traj_ctrl/status_report.csv")?;
        Ok(())
    }

    #[cfg(test)]
    fn long_state(&self) -> LongState {
        self.long_state
    }
}

impl State for TrajCtrl {
    /// Path of the parameter file and the initial path
    type InitData = (&'static str, Vec<Waypoint>);
    type InitError = TrajCtrlError;

    type InputData = FrameInput;
    type OutputData = Commands;
    type StatusReport = StatusReport;
    type ProcError = TrajCtrlError;

    /// Intiailise the TrajCtrl module.
    fn init(init_data: Self::InitData) -> Result<Self, Self::InitError> {
        let (params_path, waypoints) = init_data;

        let params = util::params::load(params_path)
            .map_err(TrajCtrlError::ParamLoadError)?;

        Ok(Self::with_params(params, waypoints))
    }

    /// Set the frame input and process the frame.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> 
    {
        self.set_input(*input_data);
        self.update_controls()?;

        Ok((self.commands, self.report))
    }
}

impl Archived for TrajCtrl {
    fn write(&mut self) -> Result<(), ArchiveError> {
        self.arch_report.serialise(self.report)
    }
}
