//! # Controller Executable
//!
//! This binary runs trajectory control in a closed loop with a crude
//! kinematic vehicle, so that the controller can be exercised without an
//! external simulator. The vehicle integration is only good enough to close
//! the loop, it is not a vehicle model.
//!
//! The path is read from the CSV file given as the only argument, with one
//! `x,y,speed` row per waypoint and no header. If no file is given a built in
//! path is used.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::env;

use color_eyre::{
    eyre::{eyre, WrapErr},
    Result,
};
use log::{debug, info, warn};

use ctrl_lib::traj_ctrl::{Params, TrajCtrl, Waypoint};
use util::{
    archive::Archived,
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Period of one frame.
const CYCLE_PERIOD_S: f64 = 0.05;

/// Maximum number of frames to run before giving up on reaching the end of the path.
const MAX_NUM_FRAMES: u64 = 4000;

/// Acceleration at full throttle
const MAX_ACCEL_MS2: f64 = 3.0;

/// Deceleration at full brake
const MAX_DECEL_MS2: f64 = 6.0;

/// Linear drag coefficient
const DRAG_COEFF: f64 = 0.05;

/// Distance to the final waypoint at which the run is considered complete
const FINISH_DIST_M: f64 = 1.0;

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// State of the kinematic vehicle
#[derive(Debug, Default)]
struct Vehicle {
    x_m: f64,
    y_m: f64,
    yaw_rad: f64,
    speed_ms: f64,
}

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("ctrl_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    info!("Controller Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let params: Params =
        util::params::load("traj_ctrl.toml").wrap_err("Could not load traj_ctrl params")?;

    // ---- LOAD PATH ----

    let args: Vec<String> = env::args().collect();
    debug!("CLI arguments: {:?}", args);

    let waypoints = match args.len() {
        1 => {
            info!("No waypoint file given, using the built in path");
            default_path()
        }
        2 => {
            info!("Loading waypoints from \"{}\"", &args[1]);
            load_waypoints(&args[1])?
        }
        _ => return Err(eyre!("Expected the path to a waypoint file as the only argument")),
    };
    info!("Path contains {} waypoints", waypoints.len());

    let final_wp = *waypoints
        .last()
        .ok_or_else(|| eyre!("The waypoint file is empty"))?;

    // ---- MODULE INIT ----

    let mut traj_ctrl = TrajCtrl::with_params(params, waypoints);
    traj_ctrl
        .init_archive(&session)
        .wrap_err("Failed to initialise the TrajCtrl archive")?;
    info!("TrajCtrl init complete");

    let mut vehicle = Vehicle::default();

    // ---- MAIN LOOP ----

    for frame in 0..MAX_NUM_FRAMES {
        let time_s = frame as f64 * CYCLE_PERIOD_S;

        traj_ctrl.update_values(
            vehicle.x_m,
            vehicle.y_m,
            vehicle.yaw_rad,
            vehicle.speed_ms,
            time_s,
            frame,
        );
        traj_ctrl
            .update_controls()
            .wrap_err_with(|| format!("TrajCtrl failed in frame {}", frame))?;

        if let Err(e) = traj_ctrl.write() {
            warn!("Could not archive TrajCtrl: {}", e);
        }

        let (throttle, steer, brake) = traj_ctrl.get_commands();
        vehicle.step(
            throttle,
            steer * params.max_steer_rad,
            brake,
            params.wheelbase_m,
        );

        let dist_to_end_m =
            ((final_wp.x_m - vehicle.x_m).powi(2) + (final_wp.y_m - vehicle.y_m).powi(2)).sqrt();
        if dist_to_end_m < FINISH_DIST_M {
            info!("Reached the end of the path after {:.2} s", time_s);
            return Ok(());
        }
    }

    warn!(
        "End of path not reached after {} frames, vehicle at ({:.2}, {:.2})",
        MAX_NUM_FRAMES, vehicle.x_m, vehicle.y_m
    );

    Ok(())
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl Vehicle {
    /// Integrate the vehicle over one frame using the kinematic bicycle model.
    fn step(&mut self, throttle: f64, steer_rad: f64, brake: f64, wheelbase_m: f64) {
        let accel_ms2 =
            MAX_ACCEL_MS2 * throttle - MAX_DECEL_MS2 * brake - DRAG_COEFF * self.speed_ms;

        self.speed_ms = (self.speed_ms + accel_ms2 * CYCLE_PERIOD_S).max(0.0);
        self.yaw_rad += self.speed_ms / wheelbase_m * steer_rad.tan() * CYCLE_PERIOD_S;
        self.x_m += self.speed_ms * self.yaw_rad.cos() * CYCLE_PERIOD_S;
        self.y_m += self.speed_ms * self.yaw_rad.sin() * CYCLE_PERIOD_S;
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Load waypoints from a headerless `x,y,speed` CSV file.
fn load_waypoints(path: &str) -> Result<Vec<Waypoint>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_path(path)
        .wrap_err_with(|| format!("Could not open waypoint file {}", path))?;

    reader
        .deserialize()
        .collect::<Result<Vec<Waypoint>, csv::Error>>()
        .wrap_err("Could not parse waypoint file")
}

/// A straight run followed by a gentle left hand bend.
fn default_path() -> Vec<Waypoint> {
    let mut waypoints: Vec<Waypoint> = (0..40)
        .map(|i| Waypoint::new(i as f64, 0.0, 5.0))
        .collect();

    let radius_m = 20.0;
    for i in 1..=30 {
        let ang_rad = i as f64 * std::f64::consts::FRAC_PI_2 / 30.0;
        waypoints.push(Waypoint::new(
            39.0 + radius_m * ang_rad.sin(),
            radius_m * (1.0 - ang_rad.cos()),
            3.0,
        ));
    }

    waypoints
}
