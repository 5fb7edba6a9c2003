//! # Profile generator
//!
//! The numerical core of the pipeline. Flattened segments are integrated
//! into profile points, per-point kinematic caps are applied, the velocity
//! envelope is propagated so every adjacent pair is acceleration-feasible,
//! the result is time-parameterized and resampled onto a fixed timestep, and
//! a synchronized rotational channel is derived against arc-length progress.
//!
//! Everything here is pure computation over freshly allocated buffers: a
//! generation pass never mutates its inputs and re-invocation with the same
//! inputs is idempotent.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Internal
use crate::config::ProfileConfig;
use crate::spline::{
    curvature_proxy, derate_factor, flatten_profile, splines_from_waypoints, FlatProfile,
    FlatSegment, SplineError,
};
use crate::waypoint::{is_constrained, Waypoint, WaypointCaps};
use util::maths::lin_map;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Arc deltas below this are treated as zero.
const MIN_DS_M: f64 = 1e-9;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One boundary point of the flattened path during generation.
///
/// N segments produce N+1 points. Points are mutated in place by the
/// envelope and timing passes and discarded once the dense output exists.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProfilePoint {
    /// Signed arc-length position
    pub s_m: f64,

    /// Unsigned cumulative arc length, used for waypoint alignment
    pub arc_m: f64,

    /// Accumulated heading
    pub theta_rad: f64,

    /// Currently assigned velocity
    pub vel_ms: f64,

    /// Maximum velocity at this point, signed like the local direction
    pub vel_max_ms: f64,

    /// Maximum acceleration at this point, unsigned
    pub acc_max_ms2: f64,

    /// Envelope propagation bookkeeping
    pub visited: bool,

    /// Assigned cumulative time
    pub time_s: f64,
}

/// One fixed-timestep sample of a single output channel.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct TimePoint {
    /// Position (arc length or angle)
    pub pos: f64,

    /// Velocity
    pub vel: f64,

    /// Acceleration
    pub acc: f64,
}

/// The dense output profile: translational and rotational channels sampled
/// on the same fixed-timestep timeline.
#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct MotionProfile {
    /// The timestep between samples
    pub dt_s: f64,

    /// Translational channel
    pub trans: Vec<TimePoint>,

    /// Rotational channel
    pub rot: Vec<TimePoint>,
}

/// A per-waypoint cap override, aligned by arc-length position.
#[derive(Clone, Copy, Debug)]
pub struct WaypointOverride {
    /// Unsigned cumulative arc position of the waypoint
    pub arc_pos_m: f64,

    /// The caps to apply there
    pub caps: WaypointCaps,
}

/// Options for a generation pass.
#[derive(Clone, Debug)]
pub struct GenOptions {
    /// Force the first point's velocity and acceleration caps to zero
    pub zero_start: bool,

    /// Force the last point's velocity and acceleration caps to zero
    pub zero_end: bool,

    /// Per-waypoint cap overrides
    pub overrides: Vec<WaypointOverride>,
}

impl Default for GenOptions {
    fn default() -> Self {
        GenOptions {
            zero_start: true,
            zero_end: true,
            overrides: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors raised during profile generation.
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("The flattened profile contains no segments")]
    EmptyProfile,

    #[error("The profile never accumulates any time (all points stationary)")]
    ZeroDuration,
}

/// Errors raised by the full waypoint-to-profile pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Spline(#[from] SplineError),

    #[error(transparent)]
    Profile(#[from] ProfileError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MotionProfile {
    /// Number of samples per channel.
    pub fn num_points(&self) -> usize {
        self.trans.len()
    }

    /// Total duration of the profile.
    pub fn duration_s(&self) -> f64 {
        self.trans.len() as f64 * self.dt_s
    }

    /// Peak translational velocity magnitude.
    pub fn peak_vel_ms(&self) -> f64 {
        self.trans
            .iter()
            .map(|p| p.vel.abs())
            .fold(0.0, f64::max)
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Generate a dense, synchronized motion profile from a flattened path.
pub fn generate(
    flat: &FlatProfile,
    config: &ProfileConfig,
    opts: &GenOptions,
) -> Result<MotionProfile, ProfileError> {
    let segments = &flat.segments;
    if segments.is_empty() {
        return Err(ProfileError::EmptyProfile);
    }

    let total_s: f64 = segments.iter().map(|seg| seg.ds_m.abs()).sum();
    let total_theta: f64 = segments.iter().map(|seg| seg.dtheta_rad.abs()).sum();

    // A path with no translation cannot be time-parameterized on the
    // translational channel, so run the same 1D pipeline on heading instead
    if total_s < MIN_DS_M {
        if total_theta < MIN_DS_M {
            return Err(ProfileError::EmptyProfile);
        }
        return generate_rotation_only(segments, config, opts);
    }

    let mut points = integrate_points(segments, config);
    apply_overrides(&mut points, segments, &opts.overrides, config);
    clamp_boundaries(&mut points, opts);
    limit_velocities(&mut points);
    assign_times(&mut points);

    let trans = resample(&points, config.dt_s)?;
    let rot = sync_rotation(&points, &trans, config.dt_s);

    Ok(MotionProfile {
        dt_s: config.dt_s,
        trans,
        rot,
    })
}

/// Run the full waypoint-to-profile pipeline with per-waypoint overrides and
/// stationary endpoints.
pub fn generate_from_waypoints(
    waypoints: &[Waypoint],
    config: &ProfileConfig,
) -> Result<MotionProfile, PipelineError> {
    let splines = splines_from_waypoints(waypoints)?;
    let flat = flatten_profile(&splines, config)?;

    let opts = GenOptions {
        overrides: overrides_from_waypoints(waypoints, &flat),
        ..Default::default()
    };

    Ok(generate(&flat, config, &opts)?)
}

/// Collect the constrained per-waypoint caps, aligned to their arc-length
/// positions in the flattened profile.
pub fn overrides_from_waypoints(
    waypoints: &[Waypoint],
    flat: &FlatProfile,
) -> Vec<WaypointOverride> {
    waypoints
        .iter()
        .zip(flat.waypoint_arcs_m.iter())
        .filter(|(wp, _)| wp.caps.any_constrained())
        .map(|(wp, &arc_pos_m)| WaypointOverride {
            arc_pos_m,
            caps: wp.caps,
        })
        .collect()
}

/// Velocity envelope propagation.
///
/// Repeatedly selects the unvisited point with the smallest velocity
/// magnitude (scanning left to right, strict comparison, so the lowest index
/// wins ties) and relaxes both neighbours to the velocity reachable under
/// their acceleration caps. Only monotone-decreasing overwrites occur, so
/// the fixed point is independent of traversal order: the largest profile
/// that is everywhere acceleration-feasible and below every cap.
pub fn limit_velocities(points: &mut [ProfilePoint]) {
    loop {
        // Unvisited point closest to the zero velocity line
        let mut index: Option<usize> = None;
        for i in 0..points.len() {
            if points[i].visited {
                continue;
            }
            match index {
                Some(j) if points[i].vel_ms.abs() >= points[j].vel_ms.abs() => (),
                _ => index = Some(i),
            }
        }

        let i = match index {
            Some(i) => i,
            None => break,
        };

        if i > 0 {
            relax_neighbour(points, i, i - 1, -1.0);
        }
        if i < points.len() - 1 {
            relax_neighbour(points, i, i + 1, 1.0);
        }

        points[i].visited = true;
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Integrate segment deltas into profile points and assign the
/// curvature-derated per-point caps.
fn integrate_points(segments: &[FlatSegment], config: &ProfileConfig) -> Vec<ProfilePoint> {
    let mut points = Vec::with_capacity(segments.len() + 1);

    let (mut s, mut arc, mut theta) = (0.0, 0.0, 0.0);
    points.push(ProfilePoint::default());
    for seg in segments {
        s += seg.ds_m;
        arc += seg.ds_m.abs();
        theta += seg.dtheta_rad;
        points.push(ProfilePoint {
            s_m: s,
            arc_m: arc,
            theta_rad: theta,
            ..Default::default()
        });
    }

    for i in 0..points.len() {
        let left = if i > 0 { Some(&segments[i - 1]) } else { None };
        let right = segments.get(i);

        let (k1, k2, dir) = point_curvature_terms(left, right);
        let factor = derate_factor(config.wheel_width_m, k1, k2);

        let point = &mut points[i];
        point.vel_max_ms = config.vel_max_ms / factor * dir;
        point.acc_max_ms2 = config.acc_max_ms2 / factor;
        point.vel_ms = point.vel_max_ms;
    }

    points
}

/// Curvature terms at a boundary point, pooling the adjacent segments.
///
/// A boundary point without a left or right neighbour omits that neighbour's
/// contribution. Returns (k1, k2, direction sign).
fn point_curvature_terms(
    left: Option<&FlatSegment>,
    right: Option<&FlatSegment>,
) -> (f64, f64, f64) {
    match (left, right) {
        (Some(l), Some(r)) => {
            let ds_sum = l.ds_m.abs() + r.ds_m.abs();
            let k1 = if ds_sum < MIN_DS_M {
                0.0
            } else {
                (l.dtheta_rad.abs() + r.dtheta_rad.abs()) / ds_sum
            };

            let ds_mean = ds_sum / 2.0;
            let k2 = if ds_mean < MIN_DS_M {
                0.0
            } else {
                ((r.dtheta_rad - l.dtheta_rad) / (ds_mean * ds_mean)).abs()
            };

            (k1, k2, sign_or_one(r.ds_m))
        }
        (Some(l), None) => (
            curvature_proxy(l.ds_m, l.dtheta_rad),
            0.0,
            sign_or_one(l.ds_m),
        ),
        (None, Some(r)) => (
            curvature_proxy(r.ds_m, r.dtheta_rad),
            0.0,
            sign_or_one(r.ds_m),
        ),
        (None, None) => (0.0, 0.0, 1.0),
    }
}

/// Apply per-waypoint cap overrides to matching points.
///
/// Angular caps convert to linear ones through the local curvature proxy;
/// where the path is locally straight the angular channel cannot bind and
/// the override is skipped. Values at or above the unconstrained sentinel
/// are ignored.
fn apply_overrides(
    points: &mut [ProfilePoint],
    segments: &[FlatSegment],
    overrides: &[WaypointOverride],
    config: &ProfileConfig,
) {
    for ov in overrides {
        for i in 0..points.len() {
            if (points[i].arc_m - ov.arc_pos_m).abs() > config.override_match_tol_m {
                continue;
            }

            let left = if i > 0 { Some(&segments[i - 1]) } else { None };
            let right = segments.get(i);
            let (kappa, _, _) = point_curvature_terms(left, right);

            let point = &mut points[i];

            if is_constrained(ov.caps.vel_max_ms) {
                point.vel_max_ms = cap_magnitude(point.vel_max_ms, ov.caps.vel_max_ms);
            }
            if is_constrained(ov.caps.acc_max_ms2) {
                point.acc_max_ms2 = point.acc_max_ms2.min(ov.caps.acc_max_ms2);
            }
            if kappa > MIN_DS_M {
                if is_constrained(ov.caps.ang_vel_max_rads) {
                    point.vel_max_ms =
                        cap_magnitude(point.vel_max_ms, ov.caps.ang_vel_max_rads / kappa);
                }
                if is_constrained(ov.caps.ang_acc_max_rads2) {
                    point.acc_max_ms2 =
                        point.acc_max_ms2.min(ov.caps.ang_acc_max_rads2 / kappa);
                }
            }

            point.vel_ms = cap_magnitude(point.vel_ms, point.vel_max_ms.abs());
        }
    }
}

/// Force stationary endpoints.
fn clamp_boundaries(points: &mut [ProfilePoint], opts: &GenOptions) {
    if opts.zero_start {
        if let Some(first) = points.first_mut() {
            first.vel_max_ms = 0.0;
            first.acc_max_ms2 = 0.0;
            first.vel_ms = 0.0;
        }
    }
    if opts.zero_end {
        if let Some(last) = points.last_mut() {
            last.vel_max_ms = 0.0;
            last.acc_max_ms2 = 0.0;
            last.vel_ms = 0.0;
        }
    }
}

/// Relax one neighbour of the selected point.
///
/// The candidate is the velocity magnitude reachable from the selected point
/// under the neighbour's acceleration cap. `dir` is -1 for the left
/// neighbour (its sign is negated relative to the arc delta) and +1 for the
/// right. The neighbour is only ever lowered, never raised.
fn relax_neighbour(points: &mut [ProfilePoint], selected: usize, neighbour: usize, dir: f64) {
    let vo = points[selected].vel_ms;
    let ds = points[neighbour].s_m - points[selected].s_m;
    let ao = points[neighbour].acc_max_ms2;

    let candidate = dir * ds.signum() * (vo * vo + 2.0 * ao * ds.abs()).sqrt();

    if candidate.abs() < points[neighbour].vel_ms.abs() {
        points[neighbour].vel_ms = candidate;
    }
}

/// Time parameterization by the constant-acceleration chord approximation.
fn assign_times(points: &mut [ProfilePoint]) {
    for i in 1..points.len() {
        let v0 = points[i - 1].vel_ms;
        let v1 = points[i].vel_ms;
        let ds = points[i].s_m - points[i - 1].s_m;

        let vsum = v0 + v1;
        // A stationary pair advances no time
        let dt = if vsum.abs() < MIN_DS_M {
            0.0
        } else {
            2.0 * ds / vsum
        };

        points[i].time_s = points[i - 1].time_s + dt.abs();
    }
}

/// Resample the velocity profile onto the fixed timestep, then derive
/// acceleration (central difference) and position (trapezoidal integration).
///
/// The sample buffer is pre-sized and zero-filled, and the tick loop runs
/// one sample past the profile end, so once the cursor runs off the last
/// point the remaining samples stay at rest. Every dense profile therefore
/// ends with zero velocity.
fn resample(points: &[ProfilePoint], dt: f64) -> Result<Vec<TimePoint>, ProfileError> {
    let total_time = match points.last() {
        Some(p) if p.time_s > 0.0 => p.time_s,
        _ => return Err(ProfileError::ZeroDuration),
    };

    let n_ticks = (total_time / dt).ceil() as usize + 1;
    let mut vels = vec![0.0; n_ticks];

    let mut k = 0;
    'ticks: for (i, vel) in vels.iter_mut().enumerate() {
        let t = i as f64 * dt;

        // Advance the cursor to the bracketing pair; once it runs past the
        // last point the remaining samples are left stationary
        while points[k + 1].time_s < t {
            k += 1;
            if k > points.len() - 2 {
                break 'ticks;
            }
        }

        let (p0, p1) = (&points[k], &points[k + 1]);
        *vel = if t == p0.time_s || p1.time_s <= p0.time_s {
            p0.vel_ms
        } else {
            lin_map((p0.time_s, p1.time_s), (p0.vel_ms, p1.vel_ms), t)
        };
    }

    Ok(dense_from_velocities(&vels, dt))
}

/// Fill acceleration and position around a resampled velocity sequence.
fn dense_from_velocities(vels: &[f64], dt: f64) -> Vec<TimePoint> {
    let n = vels.len();
    let mut out: Vec<TimePoint> = vels
        .iter()
        .map(|&vel| TimePoint {
            pos: 0.0,
            vel,
            acc: 0.0,
        })
        .collect();

    for i in 1..n.saturating_sub(1) {
        out[i].acc = (vels[i + 1] - vels[i - 1]) / (2.0 * dt);
    }

    for i in 1..n {
        out[i].pos = out[i - 1].pos + (vels[i - 1] + vels[i]) / 2.0 * dt;
    }

    out
}

/// Derive the rotational channel on the same time ticks.
///
/// Angular position is interpolated against arc-length position, not time,
/// keeping rotation synchronized to translation progress when speed varies.
fn sync_rotation(points: &[ProfilePoint], trans: &[TimePoint], dt: f64) -> Vec<TimePoint> {
    let mut thetas = Vec::with_capacity(trans.len());

    let mut k = 0;
    for (i, sample) in trans.iter().enumerate() {
        let t = i as f64 * dt;
        let s = sample.pos;

        while points[k + 1].time_s < t {
            k += 1;
            if k > points.len() - 2 {
                k = points.len() - 2;
                break;
            }
        }

        let (p0, p1) = (&points[k], &points[k + 1]);
        let theta = if t == p0.time_s || (p1.s_m - p0.s_m).abs() < MIN_DS_M {
            p0.theta_rad
        } else {
            lin_map((p0.s_m, p1.s_m), (p0.theta_rad, p1.theta_rad), s)
        };
        thetas.push(theta);
    }

    let n = thetas.len();
    let mut out: Vec<TimePoint> = thetas
        .iter()
        .map(|&pos| TimePoint {
            pos,
            vel: 0.0,
            acc: 0.0,
        })
        .collect();

    for i in 1..n.saturating_sub(1) {
        out[i].vel = (thetas[i + 1] - thetas[i - 1]) / (2.0 * dt);
    }
    let ang_vels: Vec<f64> = out.iter().map(|p| p.vel).collect();
    for i in 1..n.saturating_sub(1) {
        out[i].acc = (ang_vels[i + 1] - ang_vels[i - 1]) / (2.0 * dt);
    }

    out
}

/// Rotation-only generation: the identical 1D pipeline with heading as the
/// primary coordinate and the angular limits as caps. The translational
/// channel is emitted as zeros of the same length.
///
/// Per-waypoint overrides are not applicable here: a rotation-only path has
/// no arc-length axis to align them on.
fn generate_rotation_only(
    segments: &[FlatSegment],
    config: &ProfileConfig,
    opts: &GenOptions,
) -> Result<MotionProfile, ProfileError> {
    let ang_vel_max = config.ang_vel_max();
    let ang_acc_max = config.ang_acc_max();

    let mut points = Vec::with_capacity(segments.len() + 1);

    let (mut theta, mut arc) = (0.0, 0.0);
    points.push(ProfilePoint::default());
    for seg in segments {
        theta += seg.dtheta_rad;
        arc += seg.dtheta_rad.abs();
        points.push(ProfilePoint {
            s_m: theta,
            arc_m: arc,
            theta_rad: theta,
            ..Default::default()
        });
    }
    for (i, point) in points.iter_mut().enumerate() {
        let dir = if i < segments.len() {
            sign_or_one(segments[i].dtheta_rad)
        } else {
            sign_or_one(segments[segments.len() - 1].dtheta_rad)
        };
        point.vel_max_ms = ang_vel_max * dir;
        point.acc_max_ms2 = ang_acc_max;
        point.vel_ms = point.vel_max_ms;
    }

    clamp_boundaries(&mut points, opts);
    limit_velocities(&mut points);
    assign_times(&mut points);

    let rot = resample(&points, config.dt_s)?;
    let trans = vec![TimePoint::default(); rot.len()];

    Ok(MotionProfile {
        dt_s: config.dt_s,
        trans,
        rot,
    })
}

/// Clamp a signed value's magnitude, preserving its sign.
fn cap_magnitude(value: f64, cap: f64) -> f64 {
    value.signum() * value.abs().min(cap.abs())
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
