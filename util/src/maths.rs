//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where
    T: Float,
{
    target_range.0
        + ((value - source_range.0)
        * (target_range.1 - target_range.0)
        / (source_range.1 - source_range.0))
}

/// Clamp a value between the given limits.
pub fn clamp<T>(value: &T, min: &T, max: &T) -> T
where
    T: Float,
{
    let mut ret = *value;

    if ret > *max {
        ret = *max
    }
    if ret < *min {
        ret = *min
    }

    ret
}

/// Wrap an angle into the range (-pi, pi].
///
/// A single addition/subtraction of 2pi is sufficient for angle differences
/// produced by heading comparisons, which are always within (-2pi, 2pi).
pub fn wrap_pi<T>(angle: T) -> T
where
    T: Float,
{
    let pi = T::from(std::f64::consts::PI).unwrap();
    let tau = T::from(std::f64::consts::TAU).unwrap();

    let mut a = angle;
    if a <= -pi {
        a = a + tau;
    }
    if a > pi {
        a = a - tau;
    }

    a
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
