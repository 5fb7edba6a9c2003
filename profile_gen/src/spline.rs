//! # Path flattener
//!
//! Reduces the 2D spline geometry to a 1D list of uniform-arc-length
//! segments. Each flattened segment carries a signed arc-length delta, a
//! signed heading delta, and velocity/acceleration caps derated for the
//! skid-steer turning penalty. After this stage the profile generator sees
//! only 1D kinematics.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::warn;
use serde::{Deserialize, Serialize};

// Internal
use crate::bezier::{param_at_length, QuinticBezier};
use crate::config::ProfileConfig;
use crate::waypoint::Waypoint;
use util::maths::wrap_pi;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Arc lengths below this are treated as degenerate.
const MIN_ARC_LENGTH_M: f64 = 1e-9;

/// Oversampling factor of the length lookup table relative to the output
/// segment count.
const LOOKUP_OVERSAMPLE: usize = 5;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One fixed-arc-length step of the flattened path.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct FlatSegment {
    /// Arc length of this step, negative if traversed in reverse
    pub ds_m: f64,

    /// Heading change over this step, wrapped into (-pi, pi]
    pub dtheta_rad: f64,

    /// Curvature-derated maximum linear velocity, signed like `ds_m`
    pub vel_max_ms: f64,

    /// Curvature-derated maximum linear acceleration, unsigned
    pub acc_max_ms2: f64,
}

/// The flattened path: segments plus the arc-length position of each input
/// waypoint, used to align per-waypoint overrides.
#[derive(Clone, Serialize, Deserialize, Debug, Default)]
pub struct FlatProfile {
    /// Flattened segments, concatenated across all splines of the path
    pub segments: Vec<FlatSegment>,

    /// Cumulative unsigned arc-length position of each waypoint
    pub waypoint_arcs_m: Vec<f64>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors raised while flattening a path.
#[derive(Debug, thiserror::Error)]
pub enum SplineError {
    #[error("At least 2 waypoints are required to build a path, got {0}")]
    TooFewWaypoints(usize),

    #[error("The path has no usable geometry (all segments degenerate)")]
    DegeneratePath,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Build one quintic Bezier per consecutive waypoint pair.
///
/// If a waypoint's `reverse` flag is set, both endpoints of the following
/// segment are velocity-negated (as new values, never mutating the caller's
/// waypoints) before curve construction.
pub fn splines_from_waypoints(waypoints: &[Waypoint]) -> Result<Vec<QuinticBezier>, SplineError> {
    if waypoints.len() < 2 {
        return Err(SplineError::TooFewWaypoints(waypoints.len()));
    }

    let mut splines = Vec::with_capacity(waypoints.len() - 1);
    for pair in waypoints.windows(2) {
        let (w1, w2) = (&pair[0], &pair[1]);
        let spline = if w1.reverse {
            QuinticBezier::from_waypoints(&w1.inverse(), &w2.inverse(), true)
        } else {
            QuinticBezier::from_waypoints(w1, w2, false)
        };
        splines.push(spline);
    }

    Ok(splines)
}

/// Flatten a sequence of splines into uniform-arc-length segments.
///
/// This is the "recompute splines from the current waypoint list" seam used
/// by editing tools: the returned [`FlatProfile`] also carries the cumulative
/// arc position of every waypoint.
pub fn flatten_profile(
    splines: &[QuinticBezier],
    config: &ProfileConfig,
) -> Result<FlatProfile, SplineError> {
    let mut profile = FlatProfile {
        segments: Vec::new(),
        waypoint_arcs_m: vec![0.0],
    };

    let mut arc_m = 0.0;
    for (i, spline) in splines.iter().enumerate() {
        let total_m = spline.arc_length(config.arc_sample_count);
        if total_m < MIN_ARC_LENGTH_M {
            // Coincident waypoints contribute no segments
            warn!("Spline {} is degenerate (length {:.3e}), skipping", i, total_m);
            profile.waypoint_arcs_m.push(arc_m);
            continue;
        }

        profile
            .segments
            .extend(flatten_spline(spline, total_m, config));

        arc_m += total_m;
        profile.waypoint_arcs_m.push(arc_m);
    }

    if profile.segments.is_empty() {
        return Err(SplineError::DegeneratePath);
    }

    Ok(profile)
}

/// Flatten a pure linear + rotational move with no spline geometry.
///
/// Divides the net translation and net rotation into equal steps of at most
/// the target sample length. Used for straight-line and in-place style moves
/// where only the start and end pose are known.
pub fn flatten_pseudo_profile(
    distance_m: f64,
    dtheta_rad: f64,
    config: &ProfileConfig,
) -> Vec<FlatSegment> {
    let length = config.arc_sample_length_m;

    // Step count from the translation, or from the rotation when the move is
    // rotation-only (interpreting the sample length in radians)
    let steps = if distance_m.abs() >= MIN_ARC_LENGTH_M {
        (distance_m.abs() / length).ceil() as usize
    } else {
        (dtheta_rad.abs() / length).ceil() as usize
    }
    .max(1);

    let ds = distance_m / steps as f64;
    let dtheta = dtheta_rad / steps as f64;
    let factor = derate_factor(
        config.wheel_width_m,
        curvature_proxy(ds, dtheta),
        0.0,
    );

    let segment = FlatSegment {
        ds_m: ds,
        dtheta_rad: dtheta,
        vel_max_ms: config.vel_max_ms / factor * sign_or_one(ds),
        acc_max_ms2: config.acc_max_ms2 / factor,
    };

    vec![segment; steps]
}

/// The skid-steer derating factor for the given curvature terms.
///
/// `k1` is the curvature proxy |dtheta/ds|, `k2` the curvature-rate proxy
/// |d(dtheta)/ds^2|. Achievable speed drops as the outer/inner wheel speeds
/// diverge on turns.
pub fn derate_factor(wheel_width_m: f64, k1: f64, k2: f64) -> f64 {
    1.0 + (wheel_width_m / 2.0) * (k1 + k2)
}

/// |dtheta/ds|, guarding a zero-length step as "no derating".
pub fn curvature_proxy(ds_m: f64, dtheta_rad: f64) -> f64 {
    if ds_m.abs() < MIN_ARC_LENGTH_M {
        0.0
    } else {
        (dtheta_rad / ds_m).abs()
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Flatten a single spline into uniform-length segments.
fn flatten_spline(
    spline: &QuinticBezier,
    total_m: f64,
    config: &ProfileConfig,
) -> Vec<FlatSegment> {
    // Round the step count so the steps exactly tile the arc length
    let samples = (total_m / config.arc_sample_length_m).ceil().max(1.0) as usize;
    let step_m = total_m / samples as f64;
    let dir = if spline.is_reverse() { -1.0 } else { 1.0 };

    let table = spline.arc_length_table(samples * LOOKUP_OVERSAMPLE);

    // Headings at every segment boundary
    let mut headings = Vec::with_capacity(samples + 1);
    for i in 0..=samples {
        let t = if i == samples {
            1.0
        } else {
            param_at_length(&table, i as f64 * step_m)
        };
        headings.push(spline.heading(t));
    }

    // Heading deltas, wrapped into (-pi, pi]
    let dthetas: Vec<f64> = headings
        .windows(2)
        .map(|h| wrap_pi(h[1] - h[0]))
        .collect();

    // Assemble segments with curvature-derated caps
    let mut segments = Vec::with_capacity(samples);
    for i in 0..samples {
        let k1 = curvature_proxy(step_m, dthetas[i]);

        // Second difference of heading, forward where possible, backward at
        // the tail, omitted for a lone segment
        let ddtheta = if i + 1 < samples {
            dthetas[i + 1] - dthetas[i]
        } else if i > 0 {
            dthetas[i] - dthetas[i - 1]
        } else {
            0.0
        };
        let k2 = (ddtheta / (step_m * step_m)).abs();

        let factor = derate_factor(config.wheel_width_m, k1, k2);

        segments.push(FlatSegment {
            ds_m: step_m * dir,
            dtheta_rad: dthetas[i],
            vel_max_ms: config.vel_max_ms / factor * dir,
            acc_max_ms2: config.acc_max_ms2 / factor,
        });
    }

    segments
}

fn sign_or_one(value: f64) -> f64 {
    if value < 0.0 {
        -1.0
    } else {
        1.0
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn straight_waypoints(length: f64) -> Vec<Waypoint> {
        vec![
            Waypoint::new(0.0, 0.0, -FRAC_PI_2, 2.0, 0.0, 0.0),
            Waypoint::new(length, 0.0, -FRAC_PI_2, 2.0, 0.0, 0.0),
        ]
    }

    #[test]
    fn test_too_few_waypoints() {
        let wps = vec![Waypoint::new(0.0, 0.0, 0.0, 1.0, 0.0, 0.0)];
        assert!(matches!(
            splines_from_waypoints(&wps),
            Err(SplineError::TooFewWaypoints(1))
        ));
        assert!(matches!(
            splines_from_waypoints(&[]),
            Err(SplineError::TooFewWaypoints(0))
        ));
    }

    #[test]
    fn test_flatten_straight_line() {
        let config = ProfileConfig::default();
        let splines = splines_from_waypoints(&straight_waypoints(10.0)).unwrap();
        let flat = flatten_profile(&splines, &config).unwrap();

        // The steps tile the arc length exactly
        let total: f64 = flat.segments.iter().map(|s| s.ds_m).sum();
        assert_relative_eq!(total, 10.0, epsilon = 1e-6);

        // No turning, so no derating
        for seg in &flat.segments {
            assert!(seg.ds_m > 0.0);
            assert!(seg.dtheta_rad.abs() < 1e-6);
            assert_relative_eq!(seg.vel_max_ms, config.vel_max_ms, epsilon = 1e-3);
            assert_relative_eq!(seg.acc_max_ms2, config.acc_max_ms2, epsilon = 1e-3);
        }

        // Waypoint arc positions bracket the path
        assert_eq!(flat.waypoint_arcs_m.len(), 2);
        assert_relative_eq!(flat.waypoint_arcs_m[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(flat.waypoint_arcs_m[1], 10.0, epsilon = 1e-6);
    }

    #[test]
    fn test_reverse_flips_signs() {
        let config = ProfileConfig::default();
        let mut wps = straight_waypoints(10.0);
        wps[0].reverse = true;

        let splines = splines_from_waypoints(&wps).unwrap();
        assert!(splines[0].is_reverse());

        let flat = flatten_profile(&splines, &config).unwrap();
        for seg in &flat.segments {
            assert!(seg.ds_m < 0.0);
            assert!(seg.vel_max_ms < 0.0);
            assert!(seg.acc_max_ms2 > 0.0);
        }

        // Caller's waypoints are untouched
        assert_eq!(wps[0].vel_mag_ms, 2.0);
    }

    #[test]
    fn test_curved_path_derates_caps() {
        let config = ProfileConfig::default();
        // Quarter-turn: start moving along +x, end moving along +y
        let wps = vec![
            Waypoint::new(0.0, 0.0, -FRAC_PI_2, 4.0, 0.0, 0.0),
            Waypoint::new(5.0, 5.0, 0.0, 4.0, 0.0, 0.0),
        ];
        let splines = splines_from_waypoints(&wps).unwrap();
        let flat = flatten_profile(&splines, &config).unwrap();

        // Net heading change is a quarter turn
        let net_dtheta: f64 = flat.segments.iter().map(|s| s.dtheta_rad).sum();
        assert_relative_eq!(net_dtheta, FRAC_PI_2, epsilon = 1e-3);

        // Somewhere on the curve caps must derate below the global max
        let min_cap = flat
            .segments
            .iter()
            .map(|s| s.vel_max_ms)
            .fold(f64::INFINITY, f64::min);
        assert!(min_cap < config.vel_max_ms);
    }

    #[test]
    fn test_pseudo_profile_translation() {
        let config = ProfileConfig::default();
        let segments = flatten_pseudo_profile(1.0, 0.0, &config);

        assert_eq!(segments.len(), 200);
        let total: f64 = segments.iter().map(|s| s.ds_m).sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-9);
        for seg in &segments {
            assert_eq!(seg.dtheta_rad, 0.0);
            assert_relative_eq!(seg.vel_max_ms, config.vel_max_ms, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_pseudo_profile_rotation_only() {
        let config = ProfileConfig::default();
        let segments = flatten_pseudo_profile(0.0, FRAC_PI_2, &config);

        assert!(!segments.is_empty());
        let total_theta: f64 = segments.iter().map(|s| s.dtheta_rad).sum();
        assert_relative_eq!(total_theta, FRAC_PI_2, epsilon = 1e-9);
        for seg in &segments {
            assert_eq!(seg.ds_m, 0.0);
        }
    }

    #[test]
    fn test_derate_factor() {
        // Straight: no penalty
        assert_eq!(derate_factor(2.1, 0.0, 0.0), 1.0);
        // A quarter turn over one unit at width 2 halves the straight cap and
        // some more
        assert!(derate_factor(2.0, PI / 2.0, 0.0) > 2.0);
        // Zero-length step gives no derating
        assert_eq!(curvature_proxy(0.0, 1.0), 0.0);
    }
}
