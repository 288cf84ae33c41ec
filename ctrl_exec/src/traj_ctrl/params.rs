//! Trajectory control parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for trajectory control.
///
/// The gains are fixed for the lifetime of a controller, there is no way to
/// retune a running instance.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Params {

    // ---- LONGITUDINAL ----

    /// Speed controller proportional gain
    pub long_k_p: f64,

    /// Speed controller integral gain
    pub long_k_i: f64,

    /// Speed controller derivative gain
    pub long_k_d: f64,

    // ---- LATERAL ----

    /// Distance between the rear and front axles. The front axle reference
    /// point is placed half of this ahead of the vehicle position.
    ///
    /// Units: meters
    pub wheelbase_m: f64,

    /// Gain applied to the cross-track error before it is normalised by the
    /// vehicle speed.
    pub cross_track_k: f64,

    /// The physical steer angle which maps onto a full steer demand of +/-1.
    ///
    /// Units: radians
    pub max_steer_rad: f64,

    /// Segments whose X component is at or below this magnitude are treated
    /// as vertical and forced to point in -X.
    ///
    /// Units: meters
    pub seg_guard_threshold_m: f64
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            long_k_p: 0.7,
            long_k_i: 0.02,
            long_k_d: 0.05,
            wheelbase_m: 2.0,
            cross_track_k: 10.0,
            max_steer_rad: 70f64.to_radians(),
            seg_guard_threshold_m: 1e-4
        }
    }
}

impl Params {
    /// Factor converting a steer angle in radians into the normalised
    /// [-1, 1] actuator range.
    pub fn rad_to_steer(&self) -> f64 {
        1.0 / self.max_steer_rad
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_steer_conversion() {
        let conv = 180.0 / 70.0 / std::f64::consts::PI;

        assert!((Params::default().rad_to_steer() - conv).abs() < 1e-12);
    }

    #[test]
    fn test_params_file_matches_default() {
        let params: Params = util::params::parse(include_str!(
            "../../../params/traj_ctrl.toml"
        )).unwrap();

        let default = Params::default();
        assert_eq!(params.long_k_p, default.long_k_p);
        assert_eq!(params.long_k_i, default.long_k_i);
        assert_eq!(params.long_k_d, default.long_k_d);
        assert_eq!(params.wheelbase_m, default.wheelbase_m);
        assert_eq!(params.cross_track_k, default.cross_track_k);
        assert!((params.max_steer_rad - default.max_steer_rad).abs() < 1e-12);
        assert_eq!(params.seg_guard_threshold_m, default.seg_guard_threshold_m);
    }
}
