//! # Waypoint model
//!
//! Waypoints are the sparse geometric input to the pipeline. Each waypoint
//! carries a position, a velocity vector given as (angle, magnitude) relative
//! to the +y reference direction, an acceleration vector given as (angle
//! relative to the velocity direction, magnitude), a `reverse` flag for the
//! following segment, and optional per-waypoint kinematic caps.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Sentinel cap value treated as "unconstrained".
///
/// Per-waypoint caps at or above this value are ignored by the profile
/// generator.
pub const UNCONSTRAINED: f64 = 1.0e6;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single waypoint of the desired path.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct Waypoint {
    /// Position of the waypoint
    pub pos_m: Vector2<f64>,

    /// Velocity direction relative to the +y reference direction
    pub vel_angle_rad: f64,

    /// Velocity magnitude
    pub vel_mag_ms: f64,

    /// Acceleration direction relative to the velocity direction
    pub acc_angle_rad: f64,

    /// Acceleration magnitude
    pub acc_mag_ms2: f64,

    /// If true the segment leaving this waypoint is traversed backwards
    pub reverse: bool,

    /// Per-waypoint kinematic caps, defaulting to unconstrained
    pub caps: WaypointCaps,
}

/// Optional per-waypoint kinematic caps.
///
/// All caps default to the [`UNCONSTRAINED`] sentinel.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct WaypointCaps {
    /// Maximum linear velocity at this waypoint
    pub vel_max_ms: f64,

    /// Maximum linear acceleration at this waypoint
    pub acc_max_ms2: f64,

    /// Maximum angular velocity at this waypoint
    pub ang_vel_max_rads: f64,

    /// Maximum angular acceleration at this waypoint
    pub ang_acc_max_rads2: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Waypoint {
    /// Create a new waypoint with no per-point caps.
    pub fn new(
        x_m: f64,
        y_m: f64,
        vel_angle_rad: f64,
        vel_mag_ms: f64,
        acc_angle_rad: f64,
        acc_mag_ms2: f64,
    ) -> Self {
        Waypoint {
            pos_m: Vector2::new(x_m, y_m),
            vel_angle_rad,
            vel_mag_ms,
            acc_angle_rad,
            acc_mag_ms2,
            reverse: false,
            caps: WaypointCaps::default(),
        }
    }

    /// Produce the velocity-negated counterpart of this waypoint.
    ///
    /// Used when constructing curves for reversed segments. This is a pure
    /// transform: the caller's waypoint is left untouched.
    pub fn inverse(&self) -> Self {
        Waypoint {
            vel_mag_ms: -self.vel_mag_ms,
            reverse: !self.reverse,
            ..*self
        }
    }
}

impl WaypointCaps {
    /// True if this cap set constrains anything at all.
    pub fn any_constrained(&self) -> bool {
        is_constrained(self.vel_max_ms)
            || is_constrained(self.acc_max_ms2)
            || is_constrained(self.ang_vel_max_rads)
            || is_constrained(self.ang_acc_max_rads2)
    }
}

impl Default for WaypointCaps {
    fn default() -> Self {
        WaypointCaps {
            vel_max_ms: UNCONSTRAINED,
            acc_max_ms2: UNCONSTRAINED,
            ang_vel_max_rads: UNCONSTRAINED,
            ang_acc_max_rads2: UNCONSTRAINED,
        }
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// True if the given cap is below the unconstrained sentinel.
pub fn is_constrained(cap: f64) -> bool {
    cap < UNCONSTRAINED
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
