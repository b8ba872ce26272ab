//! Playback progress as a fraction of the reference duration

use serde::Serialize;
use std::time::Duration;
use stemdeck_common::PlaybackState;

/// Fraction of the stems played, in [0.0, 1.0]
///
/// Zero unless the transport is playing and the duration is positive.
pub fn progress(state: PlaybackState, elapsed: Option<Duration>, duration_seconds: f64) -> f64 {
    if state != PlaybackState::Playing || !(duration_seconds > 0.0) {
        return 0.0;
    }
    match elapsed {
        Some(elapsed) => (elapsed.as_secs_f64() / duration_seconds).min(1.0),
        None => 0.0,
    }
}

/// Point-in-time transport summary for the API and the event stream
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressReport {
    pub state: PlaybackState,
    pub is_loaded: bool,
    pub is_playing: bool,
    pub duration_seconds: f64,
    pub position_seconds: f64,
    pub progress: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_unless_playing() {
        let elapsed = Some(Duration::from_secs(5));
        assert_eq!(progress(PlaybackState::Stopped, elapsed, 10.0), 0.0);
        assert_eq!(progress(PlaybackState::Paused, elapsed, 10.0), 0.0);
        assert_eq!(progress(PlaybackState::Playing, elapsed, 10.0), 0.5);
    }

    #[test]
    fn test_zero_duration() {
        let elapsed = Some(Duration::from_secs(1));
        assert_eq!(progress(PlaybackState::Playing, elapsed, 0.0), 0.0);
        assert_eq!(progress(PlaybackState::Playing, elapsed, f64::NAN), 0.0);
    }

    #[test]
    fn test_clamped_at_one() {
        let elapsed = Some(Duration::from_secs(25));
        assert_eq!(progress(PlaybackState::Playing, elapsed, 10.0), 1.0);
    }
}
