//! # Quintic Bezier curve
//!
//! One inter-waypoint segment of the path. The six control points are built
//! from the two endpoint waypoints' position/velocity/acceleration vectors in
//! a quintic Hermite style, so that consecutive segments join with continuous
//! velocity and acceleration.
//!
//! Partially based off of the article "Planning Motion Trajectories for
//! Mobile Robots Using Splines" by Christoph Sprunk.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;

// Internal
use crate::waypoint::Waypoint;
use util::maths::{clamp, lin_map, wrap_pi};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Blending constant for the velocity control points.
const VEL_BLEND: f64 = 0.2;

/// Blending constant for the acceleration control points.
const ACC_BLEND: f64 = 0.05;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A degree-5 parametric curve between two waypoints.
///
/// Immutable after construction. The power-basis polynomial coefficients for
/// x(t) and y(t), t in [0, 1], are precomputed from the control points.
#[derive(Clone, Debug)]
pub struct QuinticBezier {
    /// The six control points
    ctrl: [Vector2<f64>; 6],

    /// If true this segment is traversed backwards
    reverse: bool,

    /// Power basis coefficients for x(t), `cx[i]` multiplying `t^i`
    cx: [f64; 6],

    /// Power basis coefficients for y(t), `cy[i]` multiplying `t^i`
    cy: [f64; 6],
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl QuinticBezier {
    /// Construct a curve from two waypoints.
    ///
    /// `w1` supplies the outgoing tangent, `w2` the incoming tangent. If the
    /// segment is to be reversed the caller must pass waypoints with their
    /// velocity already negated (see [`Waypoint::inverse`]).
    pub fn from_waypoints(w1: &Waypoint, w2: &Waypoint, reverse: bool) -> Self {
        // Head control points: position, velocity, then acceleration mirrored
        // about the velocity point
        let p0 = w1.pos_m;
        let p1 = p0 + VEL_BLEND * w1.vel_mag_ms * unit_vector(w1.vel_angle_rad);
        let p2 = 2.0 * p1 - p0
            + ACC_BLEND * w1.acc_mag_ms2 * unit_vector(w1.acc_angle_rad + w1.vel_angle_rad);

        // Tail control points, mirrored and negated
        let p5 = w2.pos_m;
        let p4 = p5 - VEL_BLEND * w2.vel_mag_ms * unit_vector(w2.vel_angle_rad);
        let p3 = 2.0 * p4 - p5
            + ACC_BLEND * w2.acc_mag_ms2 * unit_vector(w2.acc_angle_rad + w2.vel_angle_rad);

        let ctrl = [p0, p1, p2, p3, p4, p5];
        let (cx, cy) = power_basis_coeffs(&ctrl);

        QuinticBezier {
            ctrl,
            reverse,
            cx,
            cy,
        }
    }

    /// True if this segment is traversed backwards.
    pub fn is_reverse(&self) -> bool {
        self.reverse
    }

    /// The control points of this curve.
    pub fn control_points(&self) -> &[Vector2<f64>; 6] {
        &self.ctrl
    }

    /// Position at parameter `t`.
    pub fn position(&self, t: f64) -> Vector2<f64> {
        Vector2::new(horner(&self.cx, t), horner(&self.cy, t))
    }

    /// First derivative with respect to `t`.
    pub fn derivative(&self, t: f64) -> Vector2<f64> {
        let dx = ((((5.0 * self.cx[5] * t + 4.0 * self.cx[4]) * t + 3.0 * self.cx[3]) * t
            + 2.0 * self.cx[2])
            * t)
            + self.cx[1];
        let dy = ((((5.0 * self.cy[5] * t + 4.0 * self.cy[4]) * t + 3.0 * self.cy[3]) * t
            + 2.0 * self.cy[2])
            * t)
            + self.cy[1];
        Vector2::new(dx, dy)
    }

    /// Second derivative with respect to `t`.
    pub fn second_derivative(&self, t: f64) -> Vector2<f64> {
        let ddx =
            ((20.0 * self.cx[5] * t + 12.0 * self.cx[4]) * t + 6.0 * self.cx[3]) * t
                + 2.0 * self.cx[2];
        let ddy =
            ((20.0 * self.cy[5] * t + 12.0 * self.cy[4]) * t + 6.0 * self.cy[3]) * t
                + 2.0 * self.cy[2];
        Vector2::new(ddx, ddy)
    }

    /// Heading at parameter `t`, normalised into (-pi, pi].
    ///
    /// The heading is the tangent direction rotated by 90 degrees. Only
    /// heading differences are consumed downstream, so the fixed rotation
    /// cancels out.
    pub fn heading(&self, t: f64) -> f64 {
        let d = self.derivative(t);
        wrap_pi(d.y.atan2(d.x) + std::f64::consts::FRAC_PI_2)
    }

    /// Parametric curvature at `t`.
    ///
    /// http://mathworld.wolfram.com/Curvature.html
    pub fn curvature(&self, t: f64) -> f64 {
        let d = self.derivative(t);
        let dd = self.second_derivative(t);

        let norm = d.norm();
        (d.x * dd.y - d.y * dd.x) / (norm * norm * norm)
    }

    /// Total arc length over t in [0, 1] via trapezoidal quadrature with the
    /// given number of sample segments.
    pub fn arc_length(&self, samples: usize) -> f64 {
        let dt = 1.0 / samples as f64;
        let mut s = 0.0;

        s += self.derivative(0.0).norm() * dt / 2.0;
        for i in 1..samples {
            s += self.derivative(i as f64 * dt).norm() * dt;
        }
        s += self.derivative(1.0).norm() * dt / 2.0;

        s
    }

    /// Build a lookup table of (t, cumulative arc length) pairs using the
    /// same trapezoidal quadrature as [`QuinticBezier::arc_length`].
    ///
    /// The table has `samples + 1` rows, the first at (0, 0).
    pub fn arc_length_table(&self, samples: usize) -> Vec<(f64, f64)> {
        let dt = 1.0 / samples as f64;
        let mut table = Vec::with_capacity(samples + 1);
        let mut s = 0.0;

        for i in 0..=samples {
            let t = i as f64 * dt;
            table.push((t, s));

            s += self.derivative(t).norm() * dt / 2.0;
            s += self.derivative(t + dt).norm() * dt / 2.0;
        }

        table
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Inverse lookup of the curve parameter at the given arc length.
///
/// Linearly interpolates between the bracketing rows of a table produced by
/// [`QuinticBezier::arc_length_table`], clamping at the table ends.
pub fn param_at_length(table: &[(f64, f64)], s: f64) -> f64 {
    if table.len() < 2 {
        return 0.0;
    }

    // Advance to the bracketing interval, clamping at the final one
    let mut j = 0;
    while table[j + 1].1 < s {
        j += 1;
        if j > table.len() - 2 {
            j = table.len() - 2;
            break;
        }
    }

    let (t0, s0) = table[j];
    let (t1, s1) = table[j + 1];

    // Exact table hit, which also guards a zero-length interval
    if s == s0 || s1 == s0 {
        t0
    } else {
        clamp(&lin_map((s0, s1), (t0, t1), s), &0.0, &1.0)
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Unit vector of the given waypoint-frame angle (relative to +y).
fn unit_vector(angle_rad: f64) -> Vector2<f64> {
    let a = angle_rad + std::f64::consts::FRAC_PI_2;
    Vector2::new(a.cos(), a.sin())
}

/// Convert Bernstein control points into power basis coefficients.
fn power_basis_coeffs(p: &[Vector2<f64>; 6]) -> ([f64; 6], [f64; 6]) {
    let xs = [p[0].x, p[1].x, p[2].x, p[3].x, p[4].x, p[5].x];
    let ys = [p[0].y, p[1].y, p[2].y, p[3].y, p[4].y, p[5].y];
    (power_basis_1d(&xs), power_basis_1d(&ys))
}

fn power_basis_1d(v: &[f64; 6]) -> [f64; 6] {
    [
        v[0],
        -5.0 * v[0] + 5.0 * v[1],
        10.0 * v[0] - 20.0 * v[1] + 10.0 * v[2],
        -10.0 * v[0] + 30.0 * v[1] - 30.0 * v[2] + 10.0 * v[3],
        5.0 * v[0] - 20.0 * v[1] + 30.0 * v[2] - 20.0 * v[3] + 5.0 * v[4],
        -v[0] + 5.0 * v[1] - 10.0 * v[2] + 10.0 * v[3] - 5.0 * v[4] + v[5],
    ]
}

/// Evaluate a power basis polynomial at `t`.
fn horner(c: &[f64; 6], t: f64) -> f64 {
    ((((c[5] * t + c[4]) * t + c[3]) * t + c[2]) * t + c[1]) * t + c[0]
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    /// A straight segment along +x. Velocity angle -pi/2 maps to the +x
    /// direction in the +y-referenced waypoint frame.
    fn straight_x(length: f64) -> QuinticBezier {
        let w1 = Waypoint::new(0.0, 0.0, -FRAC_PI_2, 2.0, 0.0, 0.0);
        let w2 = Waypoint::new(length, 0.0, -FRAC_PI_2, 2.0, 0.0, 0.0);
        QuinticBezier::from_waypoints(&w1, &w2, false)
    }

    #[test]
    fn test_endpoints_match_waypoints() {
        let curve = straight_x(10.0);
        assert_relative_eq!(curve.position(0.0).x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(curve.position(1.0).x, 10.0, epsilon = 1e-12);
        assert_relative_eq!(curve.position(1.0).y, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_straight_line_arc_length() {
        let curve = straight_x(10.0);
        assert_relative_eq!(curve.arc_length(100), 10.0, epsilon = 1e-6);
    }

    #[test]
    fn test_straight_line_heading_and_curvature() {
        let curve = straight_x(10.0);
        for i in 0..=10 {
            let t = i as f64 / 10.0;
            assert_relative_eq!(curve.heading(t), FRAC_PI_2, epsilon = 1e-9);
            assert_relative_eq!(curve.curvature(t), 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_derivative_consistency() {
        // Central difference check of the analytic derivatives on a curved
        // segment
        let w1 = Waypoint::new(0.0, 0.0, 0.0, 3.0, 0.5, 2.0);
        let w2 = Waypoint::new(4.0, 5.0, 1.0, 2.0, -0.2, 1.0);
        let curve = QuinticBezier::from_waypoints(&w1, &w2, false);

        let h = 1e-6;
        for i in 1..10 {
            let t = i as f64 / 10.0;
            let num_d = (curve.position(t + h) - curve.position(t - h)) / (2.0 * h);
            let num_dd = (curve.derivative(t + h) - curve.derivative(t - h)) / (2.0 * h);
            assert_relative_eq!(curve.derivative(t).x, num_d.x, epsilon = 1e-4);
            assert_relative_eq!(curve.derivative(t).y, num_d.y, epsilon = 1e-4);
            assert_relative_eq!(curve.second_derivative(t).x, num_dd.x, epsilon = 1e-3);
            assert_relative_eq!(curve.second_derivative(t).y, num_dd.y, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_param_at_length_clamps() {
        let curve = straight_x(10.0);
        let table = curve.arc_length_table(100);

        // Below the table start and beyond the end clamp to the end intervals
        assert_relative_eq!(param_at_length(&table, 0.0), 0.0, epsilon = 1e-12);
        assert_relative_eq!(param_at_length(&table, 5.0), 0.5, epsilon = 1e-3);
        assert_relative_eq!(param_at_length(&table, 1e3), 1.0, epsilon = 1e-12);
    }
}
