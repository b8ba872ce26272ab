//! Sample-time conversions for sample-accurate scheduling
//!
//! The playback engine works in three time representations:
//!
//! 1. **Sample time (graph clock)**: `u64` frame counts at the audio graph's
//!    operating sample rate. Scheduled start instants are expressed here.
//! 2. **Seconds (transport)**: `f64` playback positions, e.g. the paused
//!    position or a track's duration.
//! 3. **Milliseconds (configuration / API)**: `u64` values such as the
//!    look-ahead horizon or the progress event interval.
//!
//! # Conversion Flow
//!
//! ```text
//! look_ahead_ms (config)
//!     ↓
//! ms_to_frames() → horizon = graph.now() + look-ahead frames
//!     ↓
//! paused position (seconds)
//!     ↓
//! seconds_to_frames() → first source frame rendered at the horizon
//! ```
//!
//! # Examples
//!
//! ```rust
//! use stemdeck_common::timing::*;
//!
//! // 100 ms look-ahead at the reference rate
//! assert_eq!(ms_to_frames(100, REFERENCE_SAMPLE_RATE), 4_410);
//!
//! // Resume 5 seconds into the stems
//! assert_eq!(seconds_to_frames(5.0, 44_100), 220_500);
//! assert_eq!(frames_to_seconds(220_500, 44_100), 5.0);
//! ```

/// A point on the audio graph's native clock, in frames since the graph started.
pub type SampleTime = u64;

/// Sample rate of the reference configuration (Hz)
pub const REFERENCE_SAMPLE_RATE: u32 = 44_100;

/// Default synchronization horizon (ms)
///
/// Every track receives its start instruction before this deadline, so the
/// order in which start commands are issued does not matter.
pub const DEFAULT_LOOK_AHEAD_MS: u64 = 100;

/// Convert milliseconds to frames (truncating)
///
/// # Examples
///
/// ```rust
/// use stemdeck_common::timing::ms_to_frames;
///
/// assert_eq!(ms_to_frames(0, 44_100), 0);
/// assert_eq!(ms_to_frames(1000, 44_100), 44_100);
/// assert_eq!(ms_to_frames(100, 48_000), 4_800);
/// ```
///
/// # Panics
///
/// Panics if `sample_rate` is 0
pub fn ms_to_frames(milliseconds: u64, sample_rate: u32) -> u64 {
    assert!(sample_rate > 0, "sample_rate must be > 0");
    milliseconds * sample_rate as u64 / 1000
}

/// Convert a position in seconds to the nearest frame
///
/// Negative and non-finite positions map to frame 0.
///
/// ```rust
/// use stemdeck_common::timing::seconds_to_frames;
///
/// assert_eq!(seconds_to_frames(0.5, 44_100), 22_050);
/// assert_eq!(seconds_to_frames(-1.0, 44_100), 0);
/// ```
pub fn seconds_to_frames(seconds: f64, sample_rate: u32) -> u64 {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    (seconds * sample_rate as f64).round() as u64
}

/// Convert frames to seconds
///
/// ```rust
/// use stemdeck_common::timing::frames_to_seconds;
///
/// assert_eq!(frames_to_seconds(22_050, 44_100), 0.5);
/// ```
pub fn frames_to_seconds(frames: u64, sample_rate: u32) -> f64 {
    assert!(sample_rate > 0, "sample_rate must be > 0");
    frames as f64 / sample_rate as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_look_ahead_at_common_rates() {
        assert_eq!(ms_to_frames(DEFAULT_LOOK_AHEAD_MS, 44_100), 4_410);
        assert_eq!(ms_to_frames(DEFAULT_LOOK_AHEAD_MS, 48_000), 4_800);
        assert_eq!(ms_to_frames(DEFAULT_LOOK_AHEAD_MS, 96_000), 9_600);
    }

    #[test]
    fn test_seconds_to_frames_rounds_to_nearest() {
        // 1/44100 s is exactly one frame; slightly less should round up
        assert_eq!(seconds_to_frames(0.999_999 / 44_100.0, 44_100), 1);
        assert_eq!(seconds_to_frames(f64::NAN, 44_100), 0);
        assert_eq!(seconds_to_frames(f64::INFINITY, 44_100), 0);
    }

    #[test]
    #[should_panic(expected = "sample_rate must be > 0")]
    fn test_zero_sample_rate_panics() {
        ms_to_frames(100, 0);
    }
}
