//! # Boxcar jerk limiting
//!
//! A moving-average filter applied to the dense profile channels. Averaging
//! over a window of `acc_max / jerk_max` seconds bounds the rate of change
//! of acceleration without re-running the envelope, at the cost of
//! lengthening the profile by one window.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crate::config::ProfileConfig;
use crate::profile::{MotionProfile, TimePoint};

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// The averaging window (in samples) that limits jerk to `jerk_max` given
/// the acceleration limit `acc_max`.
pub fn jerk_window(acc_max: f64, jerk_max: f64, dt_s: f64) -> usize {
    ((acc_max / jerk_max) / dt_s).ceil().max(1.0) as usize
}

/// Boxcar-filter every field of a sample sequence.
///
/// The output has `input.len() + window - 1` samples. Windows that overhang
/// either end clamp to the first/last sample, so a sequence with stationary
/// endpoints ramps smoothly out of and back into them.
pub fn multi_filter(input: &[TimePoint], window: usize) -> Vec<TimePoint> {
    if input.is_empty() {
        return Vec::new();
    }

    let window = window.max(1);
    let last = input.len() as isize - 1;
    let mut output = Vec::with_capacity(input.len() + window - 1);

    for i in 0..(input.len() + window - 1) as isize {
        let mut sum = TimePoint::default();
        for j in 0..window as isize {
            let index = (i - j).max(0).min(last) as usize;
            sum.pos += input[index].pos;
            sum.vel += input[index].vel;
            sum.acc += input[index].acc;
        }
        let w = window as f64;
        output.push(TimePoint {
            pos: sum.pos / w,
            vel: sum.vel / w,
            acc: sum.acc / w,
        });
    }

    output
}

/// Apply jerk limiting to both channels of a profile.
///
/// Each channel gets its own window from its own acceleration and jerk
/// limits. The shorter channel is padded with its final sample so both stay
/// on the same timeline.
pub fn limit_jerk(profile: &MotionProfile, config: &ProfileConfig) -> MotionProfile {
    let trans_window = jerk_window(config.acc_max_ms2, config.jerk_max_ms3, config.dt_s);
    let rot_window = jerk_window(config.ang_acc_max(), config.ang_jerk_max(), config.dt_s);

    let mut trans = multi_filter(&profile.trans, trans_window);
    let mut rot = multi_filter(&profile.rot, rot_window);

    let len = trans.len().max(rot.len());
    pad_to(&mut trans, len);
    pad_to(&mut rot, len);

    MotionProfile {
        dt_s: profile.dt_s,
        trans,
        rot,
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn pad_to(channel: &mut Vec<TimePoint>, len: usize) {
    if let Some(&last) = channel.last() {
        while channel.len() < len {
            channel.push(last);
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_window_arithmetic() {
        // Default limits: (20 / 26) / 0.01 rounds up to 77 samples
        assert_eq!(jerk_window(20.0, 26.0, 0.01), 77);
        assert_eq!(jerk_window(20.0, 20.0, 0.01), 100);
        // Degenerate windows clamp to a single sample
        assert_eq!(jerk_window(0.0, 26.0, 0.01), 1);
    }

    #[test]
    fn test_filter_lengthens_by_window() {
        let input = vec![TimePoint::default(); 50];
        assert_eq!(multi_filter(&input, 10).len(), 59);
        assert_eq!(multi_filter(&input, 1).len(), 50);
        assert!(multi_filter(&[], 10).is_empty());
    }

    #[test]
    fn test_constant_input_unchanged() {
        let sample = TimePoint {
            pos: 1.5,
            vel: -0.5,
            acc: 0.25,
        };
        let input = vec![sample; 20];
        for out in multi_filter(&input, 7) {
            assert_relative_eq!(out.pos, sample.pos);
            assert_relative_eq!(out.vel, sample.vel);
            assert_relative_eq!(out.acc, sample.acc);
        }
    }

    #[test]
    fn test_step_ramps_over_window() {
        // Velocity step from 0 to 1 becomes a linear ramp of `window` samples
        let mut input = vec![TimePoint::default(); 10];
        for p in input.iter_mut().skip(5) {
            p.vel = 1.0;
        }

        let window = 4;
        let output = multi_filter(&input, window);

        for pair in output.windows(2) {
            let step = pair[1].vel - pair[0].vel;
            assert!(step >= -1e-12);
            assert!(step <= 1.0 / window as f64 + 1e-12);
        }
        assert_relative_eq!(output.last().unwrap().vel, 1.0);
    }

    #[test]
    fn test_channel_lengths_equalized() {
        let config = ProfileConfig::default();
        let profile = MotionProfile {
            dt_s: config.dt_s,
            trans: vec![TimePoint::default(); 30],
            rot: vec![TimePoint::default(); 30],
        };

        let filtered = limit_jerk(&profile, &config);
        assert_eq!(filtered.trans.len(), filtered.rot.len());
        assert!(filtered.trans.len() > profile.trans.len());
    }
}
