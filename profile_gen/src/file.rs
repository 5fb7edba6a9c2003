//! # Waypoint and profile files
//!
//! CSV-based input and output. A waypoint file mixes three row kinds, told
//! apart by their first field:
//!
//! - numeric: a waypoint (6 columns, or 10 with per-waypoint caps),
//! - `Parameters`: the generation parameters (9 values),
//! - leading `-` and non-numeric: a comment row, skipped.
//!
//! A profile file opens with a `columns, rows` header followed by one row
//! per timestep with the translational and rotational `pos, vel, acc`
//! triplets, fixed to four decimal places.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use csv::StringRecord;

// Internal
use crate::config::ProfileConfig;
use crate::profile::{MotionProfile, TimePoint};
use crate::waypoint::Waypoint;

use std::path::Path;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The parsed contents of a waypoint file.
#[derive(Clone, Debug)]
pub struct WaypointFile {
    /// Generation parameters from the `Parameters` row
    pub config: ProfileConfig,

    /// The waypoints, in file order
    pub waypoints: Vec<Waypoint>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors raised by file reading and writing.
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("No Parameters row found in the waypoint file")]
    MissingParameters,

    #[error("Malformed row {0}: {1}")]
    MalformedRow(usize, String),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Read a waypoint file.
///
/// Any malformed row fails the whole parse rather than being skipped.
pub fn read_waypoint_file<P: AsRef<Path>>(path: P) -> Result<WaypointFile, FileError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut config: Option<ProfileConfig> = None;
    let mut waypoints = Vec::new();

    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let line = index + 1;

        let first = match record.get(0) {
            Some(field) if !field.is_empty() => field,
            _ => continue,
        };

        // A leading number marks a waypoint row; the x coordinate may be
        // negative, so comments are only recognised once the parse fails
        if first.parse::<f64>().is_ok() {
            waypoints.push(parse_waypoint_row(&record, line)?);
        } else if first.eq_ignore_ascii_case("parameters") {
            config = Some(parse_parameters_row(&record, line)?);
        } else if first.starts_with('-') {
            continue;
        } else {
            return Err(FileError::MalformedRow(
                line,
                format!("unrecognised row starting with {:?}", first),
            ));
        }
    }

    let config = config.ok_or(FileError::MissingParameters)?;

    Ok(WaypointFile { config, waypoints })
}

/// Write a waypoint file that [`read_waypoint_file`] parses back exactly.
pub fn write_waypoint_file<P: AsRef<Path>>(
    path: P,
    file: &WaypointFile,
) -> Result<(), FileError> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(path)?;

    writer.write_record(&[
        "--- x",
        "y",
        "vel angle",
        "vel mag",
        "acc angle",
        "acc mag",
        "vel cap",
        "acc cap",
        "ang vel cap",
        "ang acc cap",
    ])?;

    let c = &file.config;
    writer.write_record(&[
        "Parameters".to_string(),
        c.vel_max_ms.to_string(),
        c.acc_max_ms2.to_string(),
        c.jerk_max_ms3.to_string(),
        c.wheel_width_m.to_string(),
        c.bumper_width_m.to_string(),
        c.bumper_length_m.to_string(),
        c.dt_s.to_string(),
        c.arc_sample_count.to_string(),
        c.arc_sample_length_m.to_string(),
    ])?;

    for wp in &file.waypoints {
        writer.write_record(&[
            wp.pos_m.x.to_string(),
            wp.pos_m.y.to_string(),
            wp.vel_angle_rad.to_string(),
            wp.vel_mag_ms.to_string(),
            wp.acc_angle_rad.to_string(),
            wp.acc_mag_ms2.to_string(),
            wp.caps.vel_max_ms.to_string(),
            wp.caps.acc_max_ms2.to_string(),
            wp.caps.ang_vel_max_rads.to_string(),
            wp.caps.ang_acc_max_rads2.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Write a profile file: a `columns, rows` header followed by the two
/// channels' `pos, vel, acc` triplets at four decimal places.
pub fn write_profile_file<P: AsRef<Path>>(
    path: P,
    profile: &MotionProfile,
) -> Result<(), FileError> {
    write_profile_file_scaled(path, profile, 1.0, 1.0)
}

/// As [`write_profile_file`], with each channel scaled by a sign multiplier.
///
/// Writing with `-1.0` signs produces a profile that replays the same path
/// driven the opposite way round.
pub fn write_profile_file_scaled<P: AsRef<Path>>(
    path: P,
    profile: &MotionProfile,
    trans_sign: f64,
    rot_sign: f64,
) -> Result<(), FileError> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(path)?;

    writer.write_record(&["6".to_string(), profile.trans.len().to_string()])?;

    for (trans, rot) in profile.trans.iter().zip(profile.rot.iter()) {
        writer.write_record(&[
            format!("{:.4}", trans_sign * trans.pos),
            format!("{:.4}", trans_sign * trans.vel),
            format!("{:.4}", trans_sign * trans.acc),
            format!("{:.4}", rot_sign * rot.pos),
            format!("{:.4}", rot_sign * rot.vel),
            format!("{:.4}", rot_sign * rot.acc),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Read a profile file back into its two channels.
///
/// The timestep is not stored in the file, so only the samples are
/// recovered.
pub fn read_profile_file<P: AsRef<Path>>(
    path: P,
) -> Result<(Vec<TimePoint>, Vec<TimePoint>), FileError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut trans = Vec::new();
    let mut rot = Vec::new();

    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let line = index + 1;

        // Header row
        if line == 1 {
            continue;
        }

        if record.len() != 6 {
            return Err(FileError::MalformedRow(
                line,
                format!("expected 6 columns, found {}", record.len()),
            ));
        }

        trans.push(TimePoint {
            pos: parse_field(&record, 0, line)?,
            vel: parse_field(&record, 1, line)?,
            acc: parse_field(&record, 2, line)?,
        });
        rot.push(TimePoint {
            pos: parse_field(&record, 3, line)?,
            vel: parse_field(&record, 4, line)?,
            acc: parse_field(&record, 5, line)?,
        });
    }

    Ok((trans, rot))
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn parse_waypoint_row(record: &StringRecord, line: usize) -> Result<Waypoint, FileError> {
    if record.len() != 6 && record.len() != 10 {
        return Err(FileError::MalformedRow(
            line,
            format!("expected 6 or 10 columns, found {}", record.len()),
        ));
    }

    let mut wp = Waypoint::new(
        parse_field(record, 0, line)?,
        parse_field(record, 1, line)?,
        parse_field(record, 2, line)?,
        parse_field(record, 3, line)?,
        parse_field(record, 4, line)?,
        parse_field(record, 5, line)?,
    );

    if record.len() == 10 {
        wp.caps.vel_max_ms = parse_field(record, 6, line)?;
        wp.caps.acc_max_ms2 = parse_field(record, 7, line)?;
        wp.caps.ang_vel_max_rads = parse_field(record, 8, line)?;
        wp.caps.ang_acc_max_rads2 = parse_field(record, 9, line)?;
    }

    Ok(wp)
}

fn parse_parameters_row(record: &StringRecord, line: usize) -> Result<ProfileConfig, FileError> {
    if record.len() != 10 {
        return Err(FileError::MalformedRow(
            line,
            format!(
                "expected Parameters plus 9 values, found {} columns",
                record.len()
            ),
        ));
    }

    Ok(ProfileConfig {
        vel_max_ms: parse_field(record, 1, line)?,
        acc_max_ms2: parse_field(record, 2, line)?,
        jerk_max_ms3: parse_field(record, 3, line)?,
        wheel_width_m: parse_field(record, 4, line)?,
        bumper_width_m: parse_field(record, 5, line)?,
        bumper_length_m: parse_field(record, 6, line)?,
        dt_s: parse_field(record, 7, line)?,
        arc_sample_count: parse_field(record, 8, line)? as usize,
        arc_sample_length_m: parse_field(record, 9, line)?,
        ..Default::default()
    })
}

fn parse_field(record: &StringRecord, index: usize, line: usize) -> Result<f64, FileError> {
    let field = record
        .get(index)
        .ok_or_else(|| FileError::MalformedRow(line, format!("missing column {}", index + 1)))?;

    field.parse::<f64>().map_err(|_| {
        FileError::MalformedRow(
            line,
            format!("column {} is not a number: {:?}", index + 1, field),
        )
    })
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::waypoint::UNCONSTRAINED;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("profile_gen_{}_{}", std::process::id(), name))
    }

    fn sample_file() -> WaypointFile {
        let mut wp_capped = Waypoint::new(10.0, -2.5, FRAC_PI_2, 2.0, 0.1, 0.5);
        wp_capped.caps.vel_max_ms = 1.5;

        WaypointFile {
            config: ProfileConfig {
                vel_max_ms: 6.0,
                dt_s: 0.02,
                ..Default::default()
            },
            waypoints: vec![Waypoint::new(0.0, 0.0, -FRAC_PI_2, 2.0, 0.0, 0.0), wp_capped],
        }
    }

    #[test]
    fn test_waypoint_file_round_trip() {
        let path = temp_path("waypoints.csv");
        let written = sample_file();

        write_waypoint_file(&path, &written).unwrap();
        let read = read_waypoint_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_relative_eq!(read.config.vel_max_ms, 6.0);
        assert_relative_eq!(read.config.dt_s, 0.02);

        assert_eq!(read.waypoints.len(), 2);
        for (a, b) in written.waypoints.iter().zip(read.waypoints.iter()) {
            assert_relative_eq!(a.pos_m.x, b.pos_m.x, epsilon = 1e-6);
            assert_relative_eq!(a.pos_m.y, b.pos_m.y, epsilon = 1e-6);
            assert_relative_eq!(a.vel_angle_rad, b.vel_angle_rad, epsilon = 1e-6);
            assert_relative_eq!(a.caps.vel_max_ms, b.caps.vel_max_ms, epsilon = 1e-6);
        }
        assert_relative_eq!(read.waypoints[0].caps.acc_max_ms2, UNCONSTRAINED);
    }

    #[test]
    fn test_comment_and_negative_rows() {
        let path = temp_path("comments.csv");
        std::fs::write(
            &path,
            "--- a comment row\n\
             Parameters, 14, 20, 26, 2.1, 2.6, 3.1, 0.01, 100, 0.005\n\
             -3.0, 1.0, 0.0, 2.0, 0.0, 0.0\n",
        )
        .unwrap();

        let read = read_waypoint_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        // The negative-x row is a waypoint, not a comment
        assert_eq!(read.waypoints.len(), 1);
        assert_relative_eq!(read.waypoints[0].pos_m.x, -3.0);
    }

    #[test]
    fn test_missing_parameters_rejected() {
        let path = temp_path("no_params.csv");
        std::fs::write(&path, "0.0, 0.0, 0.0, 2.0, 0.0, 0.0\n").unwrap();

        let result = read_waypoint_file(&path);
        std::fs::remove_file(&path).ok();

        assert!(matches!(result, Err(FileError::MissingParameters)));
    }

    #[test]
    fn test_malformed_row_fails_parse() {
        let path = temp_path("malformed.csv");
        std::fs::write(
            &path,
            "Parameters, 14, 20, 26, 2.1, 2.6, 3.1, 0.01, 100, 0.005\n\
             1.0, 2.0, 3.0\n",
        )
        .unwrap();

        let result = read_waypoint_file(&path);
        std::fs::remove_file(&path).ok();

        assert!(matches!(result, Err(FileError::MalformedRow(2, _))));
    }

    #[test]
    fn test_profile_file_round_trip() {
        let path = temp_path("profile.csv");

        let profile = MotionProfile {
            dt_s: 0.01,
            trans: vec![
                TimePoint {
                    pos: 0.0,
                    vel: 0.5,
                    acc: 1.0,
                },
                TimePoint {
                    pos: 0.005,
                    vel: 0.51,
                    acc: 1.0,
                },
            ],
            rot: vec![TimePoint::default(), TimePoint::default()],
        };

        write_profile_file(&path, &profile).unwrap();
        let (trans, rot) = read_profile_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(trans.len(), 2);
        assert_eq!(rot.len(), 2);
        // Four decimal places survive the trip
        assert_relative_eq!(trans[1].pos, 0.005, epsilon = 1e-4);
        assert_relative_eq!(trans[1].vel, 0.51, epsilon = 1e-4);
    }

    #[test]
    fn test_regenerate_from_saved_waypoints() {
        use crate::profile::generate_from_waypoints;

        let path = temp_path("regen.csv");

        let file = WaypointFile {
            config: ProfileConfig {
                vel_max_ms: 6.0,
                ..Default::default()
            },
            waypoints: vec![
                Waypoint::new(0.0, 0.0, -FRAC_PI_2, 2.0, 0.0, 0.0),
                Waypoint::new(4.0, 3.0, 0.0, 2.0, 0.0, 0.0),
            ],
        };

        let original = generate_from_waypoints(&file.waypoints, &file.config).unwrap();

        write_waypoint_file(&path, &file).unwrap();
        let reloaded = read_waypoint_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let regenerated =
            generate_from_waypoints(&reloaded.waypoints, &reloaded.config).unwrap();

        assert_eq!(original.trans.len(), regenerated.trans.len());
        for (a, b) in original.trans.iter().zip(regenerated.trans.iter()) {
            assert_relative_eq!(a.pos, b.pos, epsilon = 1e-6);
            assert_relative_eq!(a.vel, b.vel, epsilon = 1e-6);
        }
        for (a, b) in original.rot.iter().zip(regenerated.rot.iter()) {
            assert_relative_eq!(a.pos, b.pos, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_sign_multipliers_negate_channels() {
        let path = temp_path("profile_signed.csv");

        let profile = MotionProfile {
            dt_s: 0.01,
            trans: vec![TimePoint {
                pos: 1.0,
                vel: 0.5,
                acc: 0.25,
            }],
            rot: vec![TimePoint {
                pos: 0.5,
                vel: 0.1,
                acc: 0.0,
            }],
        };

        write_profile_file_scaled(&path, &profile, -1.0, 1.0).unwrap();
        let (trans, rot) = read_profile_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_relative_eq!(trans[0].pos, -1.0);
        assert_relative_eq!(trans[0].vel, -0.5);
        assert_relative_eq!(rot[0].pos, 0.5);
    }
}
