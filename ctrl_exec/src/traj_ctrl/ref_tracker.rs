//! # Reference tracker
//!
//! Finds the waypoint closest to a point and derives the speed to track from
//! it. The search is a linear scan over the whole sequence on every call,
//! which is fine for the short paths this is used with but means the cost of
//! a frame grows with the path length.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;

// Internal
use super::{TrajCtrlError, Waypoint};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The result of a nearest waypoint search.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Nearest {
    /// Index of the nearest waypoint in the sequence
    pub index: usize,

    /// Distance from the query point to the waypoint
    ///
    /// Units: meters
    pub dist_m: f64
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Find the waypoint nearest to the given point.
///
/// Ties are resolved to the earliest waypoint in the sequence.
pub fn nearest_waypoint(
    point_m: &Vector2<f64>, 
    waypoints: &[Waypoint]
) -> Result<Nearest, TrajCtrlError> {
    if waypoints.is_empty() {
        return Err(TrajCtrlError::EmptyWaypoints)
    }

    let mut nearest = Nearest {
        index: 0,
        dist_m: std::f64::INFINITY
    };

    for (i, wp) in waypoints.iter().enumerate() {
        let dist_m = (wp.position_m() - point_m).norm();

        // Strictly less than so the first of equal distances is kept
        if dist_m < nearest.dist_m {
            nearest = Nearest { index: i, dist_m };
        }
    }

    Ok(nearest)
}

/// Select the speed to track from the waypoint nearest to the vehicle.
///
/// `position_m` is the vehicle (rear axle) position, not the front axle
/// point used for lateral control.
pub fn select_desired_speed(
    position_m: &Vector2<f64>, 
    waypoints: &[Waypoint]
) -> Result<f64, TrajCtrlError> {
    let nearest = nearest_waypoint(position_m, waypoints)?;

    // Nearest to the last waypoint means tracking the final speed of the
    // path, which is that waypoint's own speed.
    Ok(waypoints[nearest.index].speed_ms)
}

#[cfg(test)]
mod test {
    use super::*;

    fn line() -> Vec<Waypoint> {
        vec![
            Waypoint::new(0.0, 0.0, 5.0),
            Waypoint::new(10.0, 0.0, 6.0),
            Waypoint::new(20.0, 0.0, 7.0),
        ]
    }

    #[test]
    fn test_nearest_waypoint() {
        let n = nearest_waypoint(&Vector2::new(9.0, 1.0), &line()).unwrap();
        assert_eq!(n.index, 1);
        assert!((n.dist_m - 2f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_nearest_tie_keeps_first() {
        // Exactly between the first and second waypoints
        let n = nearest_waypoint(&Vector2::new(5.0, 0.0), &line()).unwrap();
        assert_eq!(n.index, 0);

        // Duplicated waypoints resolve to the earliest copy
        let dup = vec![
            Waypoint::new(3.0, 3.0, 1.0),
            Waypoint::new(1.0, 1.0, 2.0),
            Waypoint::new(1.0, 1.0, 3.0),
        ];
        let n = nearest_waypoint(&Vector2::new(1.0, 1.0), &dup).unwrap();
        assert_eq!(n.index, 1);
    }

    #[test]
    fn test_select_desired_speed() {
        let wps = line();

        assert_eq!(select_desired_speed(&Vector2::new(-3.0, 0.0), &wps).unwrap(), 5.0);
        assert_eq!(select_desired_speed(&Vector2::new(11.0, -2.0), &wps).unwrap(), 6.0);

        // Past the end of the path the last speed is tracked
        assert_eq!(select_desired_speed(&Vector2::new(35.0, 0.0), &wps).unwrap(), 7.0);
    }

    #[test]
    fn test_single_waypoint() {
        let wps = vec![Waypoint::new(4.0, 4.0, 2.5)];

        assert_eq!(select_desired_speed(&Vector2::new(0.0, 0.0), &wps).unwrap(), 2.5);
    }

    #[test]
    fn test_empty_waypoints() {
        assert!(matches!(
            select_desired_speed(&Vector2::new(0.0, 0.0), &[]),
            Err(TrajCtrlError::EmptyWaypoints)
        ));
    }
}
