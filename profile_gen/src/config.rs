//! # Pipeline configuration
//!
//! All tunables are carried in an explicit [`ProfileConfig`] value threaded
//! through the pipeline rather than baked-in constants. The defaults suit a
//! 2-metre-class skid-steer vehicle.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Configuration for a single generation pass.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
#[serde(default)]
pub struct ProfileConfig {
    /// Maximum linear velocity
    pub vel_max_ms: f64,

    /// Maximum linear acceleration
    pub acc_max_ms2: f64,

    /// Maximum linear jerk
    pub jerk_max_ms3: f64,

    /// Wheel-track width of the vehicle
    pub wheel_width_m: f64,

    /// Bumper width of the vehicle (carried for collision display tools)
    pub bumper_width_m: f64,

    /// Bumper length of the vehicle (carried for collision display tools)
    pub bumper_length_m: f64,

    /// Output timestep
    pub dt_s: f64,

    /// Number of quadrature segments used when estimating arc length
    pub arc_sample_count: usize,

    /// Target arc length of each flattened segment
    pub arc_sample_length_m: f64,

    /// Arc-length tolerance when matching per-waypoint overrides to profile
    /// points
    pub override_match_tol_m: f64,

    /// Maximum angular velocity. If `None`, derived from the wheel speed
    /// limit as `2 * vel_max / wheel_width`.
    pub ang_vel_max_rads: Option<f64>,

    /// Maximum angular acceleration. If `None`, derived as
    /// `2 * acc_max / wheel_width`.
    pub ang_acc_max_rads2: Option<f64>,

    /// Maximum angular jerk. If `None`, derived as
    /// `2 * jerk_max / wheel_width`.
    pub ang_jerk_max_rads3: Option<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ProfileConfig {
    /// The angular velocity limit, derived from wheel geometry when not set
    /// explicitly.
    pub fn ang_vel_max(&self) -> f64 {
        self.ang_vel_max_rads
            .unwrap_or(2.0 * self.vel_max_ms / self.wheel_width_m)
    }

    /// The angular acceleration limit, derived from wheel geometry when not
    /// set explicitly.
    pub fn ang_acc_max(&self) -> f64 {
        self.ang_acc_max_rads2
            .unwrap_or(2.0 * self.acc_max_ms2 / self.wheel_width_m)
    }

    /// The angular jerk limit, derived from wheel geometry when not set
    /// explicitly.
    pub fn ang_jerk_max(&self) -> f64 {
        self.ang_jerk_max_rads3
            .unwrap_or(2.0 * self.jerk_max_ms3 / self.wheel_width_m)
    }
}

impl Default for ProfileConfig {
    fn default() -> Self {
        ProfileConfig {
            vel_max_ms: 14.0,
            acc_max_ms2: 20.0,
            jerk_max_ms3: 26.0,
            wheel_width_m: 2.1,
            bumper_width_m: 2.6,
            bumper_length_m: 3.1,
            dt_s: 0.01,
            arc_sample_count: 100,
            arc_sample_length_m: 0.005,
            override_match_tol_m: 1e-3,
            ang_vel_max_rads: None,
            ang_acc_max_rads2: None,
            ang_jerk_max_rads3: None,
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_derived_angular_limits() {
        let config = ProfileConfig::default();
        assert!((config.ang_vel_max() - 2.0 * 14.0 / 2.1).abs() < 1e-12);
        assert!((config.ang_acc_max() - 2.0 * 20.0 / 2.1).abs() < 1e-12);

        let config = ProfileConfig {
            ang_vel_max_rads: Some(3.0),
            ..Default::default()
        };
        assert_eq!(config.ang_vel_max(), 3.0);
    }

    #[test]
    fn test_load_from_param_file() {
        let path = std::env::temp_dir().join(format!(
            "profile_gen_params_{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "vel_max_ms = 6.0\nwheel_width_m = 2.0\n").unwrap();

        let config: ProfileConfig = util::params::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.vel_max_ms, 6.0);
        assert_eq!(config.ang_vel_max(), 6.0);
        assert_eq!(config.dt_s, ProfileConfig::default().dt_s);
    }

    #[test]
    fn test_partial_json_applies_defaults() {
        // Callers may supply only the fields they care about
        let parsed: ProfileConfig =
            serde_json::from_str(r#"{"vel_max_ms": 6.0, "dt_s": 0.02}"#).unwrap();
        assert_eq!(parsed.vel_max_ms, 6.0);
        assert_eq!(parsed.dt_s, 0.02);
        assert_eq!(parsed.acc_max_ms2, ProfileConfig::default().acc_max_ms2);
    }
}
