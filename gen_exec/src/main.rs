//! # Motion Profile Generator Executable
//!
//! Offline tool which reads a waypoint file, runs the full generation
//! pipeline, and writes the dense jerk-limited profile out next to the
//! input:
//!
//! ```text
//! gen_exec <waypoint_file> [output_file]
//! ```
//!
//! The output path defaults to the input file's stem with a `_profile.csv`
//! suffix.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Result,
};
use log::info;

// Internal
use profile_gen::{
    boxcar::limit_jerk,
    file::{read_waypoint_file, write_profile_file},
    profile::{generate, overrides_from_waypoints, GenOptions},
    spline::{flatten_profile, splines_from_waypoints},
};
use util::{
    logger::{logger_init, LevelFilter},
    session::Session,
};

use std::path::PathBuf;

// ---------------------------------------------------------------------------
// MAIN
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("gen_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Motion Profile Generator Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- ARGUMENTS ----

    let mut args = std::env::args().skip(1);

    let input_path = PathBuf::from(
        args.next()
            .ok_or_else(|| eyre!("Usage: gen_exec <waypoint_file> [output_file]"))?,
    );

    let output_path = match args.next() {
        Some(p) => PathBuf::from(p),
        None => {
            let stem = input_path
                .file_stem()
                .ok_or_else(|| eyre!("Cannot derive an output name from {:?}", input_path))?
                .to_string_lossy()
                .into_owned();
            input_path.with_file_name(format!("{}_profile.csv", stem))
        }
    };

    // ---- LOAD WAYPOINTS ----

    let waypoint_file = read_waypoint_file(&input_path)
        .wrap_err_with(|| format!("Failed to read waypoint file {:?}", input_path))?;

    info!(
        "Loaded {} waypoints from {:?}",
        waypoint_file.waypoints.len(),
        input_path
    );

    let config = waypoint_file.config;

    // ---- GENERATION ----

    let splines = splines_from_waypoints(&waypoint_file.waypoints)
        .wrap_err("Failed to build splines from the waypoints")?;

    let flat = flatten_profile(&splines, &config).wrap_err("Failed to flatten the path")?;

    info!(
        "Flattened {} splines into {} segments",
        splines.len(),
        flat.segments.len()
    );

    let opts = GenOptions {
        overrides: overrides_from_waypoints(&waypoint_file.waypoints, &flat),
        ..Default::default()
    };

    let profile = generate(&flat, &config, &opts).wrap_err("Profile generation failed")?;

    let profile = limit_jerk(&profile, &config);

    info!(
        "Generated {} points over {:.2} s, peak velocity {:.2} m/s",
        profile.num_points(),
        profile.duration_s(),
        profile.peak_vel_ms()
    );

    // ---- OUTPUT ----

    write_profile_file(&output_path, &profile)
        .wrap_err_with(|| format!("Failed to write profile file {:?}", output_path))?;

    info!("Profile written to {:?}", output_path);

    Ok(())
}
