//! # Motion Profile Generation Library
//!
//! This library converts a sparse set of geometric waypoints into a dense,
//! fixed-timestep motion profile for a skid-steer vehicle: synchronized
//! translational and rotational position/velocity/acceleration sequences
//! that respect the vehicle's velocity, acceleration, and jerk limits.
//!
//! The pipeline runs offline: waypoints -> quintic Bezier curves -> flattened
//! 1D segments -> velocity-limited profile points -> timed points -> dense
//! resampled profile -> jerk-filtered output. The generated profile is
//! replayed on the vehicle by a real-time follower which is not part of this
//! library.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

/// Quintic Bezier curve - position/derivative/heading/curvature evaluation
/// and arc-length parameterization for one inter-waypoint segment.
pub mod bezier;

/// Jerk-limiting boxcar (moving average) filter.
pub mod boxcar;

/// Pipeline configuration.
pub mod config;

/// Waypoint and profile file schemas.
pub mod file;

/// Profile generator - the numerical core of the pipeline.
pub mod profile;

/// Path flattener - reduces curve geometry to 1D kinematic segments.
pub mod spline;

/// Waypoint model.
pub mod waypoint;

// ---------------------------------------------------------------------------
// REEXPORTS
// ---------------------------------------------------------------------------

pub use bezier::QuinticBezier;
pub use config::ProfileConfig;
pub use profile::{GenOptions, MotionProfile, TimePoint};
pub use spline::{FlatProfile, FlatSegment};
pub use waypoint::Waypoint;
