//! One stem: decoded PCM plus a gain node, schedulable on the graph clock
//!
//! The control side ([`Track`]) and the render side ([`TrackVoice`]) share
//! state through atomics only, so the audio thread never takes a lock to
//! read a track's schedule or gain.

use crate::audio::{AudioFrame, StemBuffer, StemDecoder};
use crate::error::{Error, Result};
use std::path::Path;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use stemdeck_common::timing::{seconds_to_frames, SampleTime};
use tracing::debug;

/// Sentinel start instant meaning "not scheduled"
const NOT_SCHEDULED: SampleTime = SampleTime::MAX;

/// f32 stored as its bit pattern in an `AtomicU32`
#[derive(Debug)]
struct AtomicF32(AtomicU32);

impl AtomicF32 {
    fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// Render-side state of a track, shared with the mix bus
#[derive(Debug)]
pub struct TrackVoice {
    buffer: StemBuffer,
    trim: AtomicF32,
    gain: AtomicF32,
    /// Graph instant of source frame `start_frame`
    start_at: AtomicU64,
    start_frame: AtomicU64,
}

impl TrackVoice {
    fn new(buffer: StemBuffer, trim: f32, gain: f32) -> Self {
        Self {
            buffer,
            trim: AtomicF32::new(trim),
            gain: AtomicF32::new(gain),
            start_at: AtomicU64::new(NOT_SCHEDULED),
            start_frame: AtomicU64::new(0),
        }
    }

    /// Output of this track at graph instant `now`
    ///
    /// Silent before the scheduled instant, after the end of the stem, and
    /// whenever the track is stopped.
    pub fn render(&self, now: SampleTime) -> AudioFrame {
        let start_at = self.start_at.load(Ordering::Acquire);
        if start_at == NOT_SCHEDULED || now < start_at {
            return AudioFrame::zero();
        }

        let index = self
            .start_frame
            .load(Ordering::Relaxed)
            .saturating_add(now - start_at);

        match self.buffer.frame(index) {
            Some(mut frame) => {
                frame.apply_volume(self.trim.load() * self.gain.load());
                frame
            }
            None => AudioFrame::zero(),
        }
    }
}

/// A loaded stem with its fader
pub struct Track {
    name: String,
    voice: Arc<TrackVoice>,
}

impl Track {
    /// Wrap an already decoded buffer
    pub fn new(name: impl Into<String>, buffer: StemBuffer, trim: f32, gain: f32) -> Self {
        Self {
            name: name.into(),
            voice: Arc::new(TrackVoice::new(buffer, trim, gain)),
        }
    }

    /// Decode `path` at `sample_rate` and wrap it as a track
    pub fn open(
        name: impl Into<String>,
        path: &Path,
        sample_rate: u32,
        trim: f32,
        gain: f32,
    ) -> Result<Self> {
        let buffer = StemDecoder::decode_stem(path, sample_rate)?;
        Ok(Self::new(name, buffer, trim, gain))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Duration of the decoded stem in seconds
    pub fn duration(&self) -> f64 {
        self.voice.buffer.duration_seconds()
    }

    pub fn frame_count(&self) -> usize {
        self.voice.buffer.frame_count()
    }

    pub fn sample_rate(&self) -> u32 {
        self.voice.buffer.sample_rate()
    }

    /// Current fader level
    pub fn gain(&self) -> f32 {
        self.voice.gain.load()
    }

    /// Set the fader level; takes effect on the next rendered frame
    pub fn set_gain(&self, value: f32) {
        self.voice.gain.store(value);
    }

    pub fn trim(&self) -> f32 {
        self.voice.trim.load()
    }

    /// Set the pre-fader trim; not validated
    pub fn set_trim(&self, value: f32) {
        self.voice.trim.store(value);
    }

    /// Effective amplitude applied to the stem: trim × gain
    pub fn effective_gain(&self) -> f32 {
        self.trim() * self.gain()
    }

    /// Start output at graph instant `at_instant`, beginning `at_position`
    /// seconds into the stem.
    pub fn schedule_start(&self, at_position: f64, at_instant: SampleTime) -> Result<()> {
        if !at_position.is_finite() || at_position < 0.0 {
            return Err(Error::Schedule {
                track: self.name.clone(),
                message: format!("invalid start position {}", at_position),
            });
        }
        if self.voice.buffer.is_empty() {
            return Err(Error::Schedule {
                track: self.name.clone(),
                message: "stem has no audio frames".to_string(),
            });
        }
        if at_instant == NOT_SCHEDULED {
            return Err(Error::Schedule {
                track: self.name.clone(),
                message: "start instant out of range".to_string(),
            });
        }

        let start_frame = seconds_to_frames(at_position, self.sample_rate());

        // Park the voice while the offset changes so a render never pairs the
        // new offset with the old instant.
        self.voice.start_at.store(NOT_SCHEDULED, Ordering::Release);
        self.voice.start_frame.store(start_frame, Ordering::Relaxed);
        self.voice.start_at.store(at_instant, Ordering::Release);

        debug!(
            "Track '{}' scheduled at graph frame {} from source frame {}",
            self.name, at_instant, start_frame
        );
        Ok(())
    }

    /// Halt output immediately; safe to call when already stopped
    pub fn stop(&self) {
        self.voice.start_at.store(NOT_SCHEDULED, Ordering::Release);
    }

    /// Graph instant the track is scheduled to start at, if any
    pub fn scheduled_start(&self) -> Option<SampleTime> {
        match self.voice.start_at.load(Ordering::Acquire) {
            NOT_SCHEDULED => None,
            at => Some(at),
        }
    }

    pub fn is_scheduled(&self) -> bool {
        self.scheduled_start().is_some()
    }

    /// Source frame the next start begins from
    pub fn start_frame(&self) -> u64 {
        self.voice.start_frame.load(Ordering::Relaxed)
    }

    /// Position in seconds the next start begins from
    pub fn start_position(&self) -> f64 {
        self.start_frame() as f64 / self.sample_rate().max(1) as f64
    }

    /// Output of this track at graph instant `now`
    pub fn render_frame(&self, now: SampleTime) -> AudioFrame {
        self.voice.render(now)
    }

    /// Render-side handle for the mix bus
    pub fn voice(&self) -> Arc<TrackVoice> {
        Arc::clone(&self.voice)
    }
}

impl std::fmt::Debug for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Track")
            .field("name", &self.name)
            .field("frames", &self.frame_count())
            .field("gain", &self.gain())
            .field("scheduled_start", &self.scheduled_start())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Stem whose frame `i` holds (i, -i) / 1000
    fn ramp_track(frames: usize) -> Track {
        let samples = (0..frames)
            .flat_map(|i| {
                let v = i as f32 / 1000.0;
                [v, -v]
            })
            .collect();
        Track::new("ramp", StemBuffer::new(samples, 1000), 1.0, 1.0)
    }

    #[test]
    fn test_unscheduled_track_is_silent() {
        let track = ramp_track(100);
        assert!(!track.is_scheduled());
        assert!(track.render_frame(10).is_silent());
    }

    #[test]
    fn test_render_follows_schedule() {
        let track = ramp_track(100);
        track.schedule_start(0.010, 500).unwrap();

        assert!(track.render_frame(499).is_silent());
        assert_eq!(track.render_frame(500), AudioFrame::from_stereo(0.010, -0.010));
        assert_eq!(track.render_frame(505), AudioFrame::from_stereo(0.015, -0.015));
        // Past the end of the stem
        assert!(track.render_frame(500 + 90).is_silent());
    }

    #[test]
    fn test_gain_and_trim_multiply() {
        let track = Track::new("flat", StemBuffer::new(vec![1.0, 1.0], 44_100), 0.5, 0.2);
        assert!((track.effective_gain() - 0.1).abs() < 1e-6);

        track.schedule_start(0.0, 0).unwrap();
        let frame = track.render_frame(0);
        assert!((frame.left - 0.1).abs() < 1e-6);

        track.set_gain(0.0);
        assert!(track.render_frame(0).is_silent());
    }

    #[test]
    fn test_stop_is_idempotent() {
        let track = ramp_track(10);
        track.stop();
        track.schedule_start(0.0, 0).unwrap();
        assert!(track.is_scheduled());
        track.stop();
        track.stop();
        assert!(!track.is_scheduled());
        assert!(track.render_frame(3).is_silent());
    }

    #[test]
    fn test_invalid_position_rejected() {
        let track = ramp_track(10);
        assert!(matches!(
            track.schedule_start(-1.0, 0),
            Err(Error::Schedule { .. })
        ));
        assert!(matches!(
            track.schedule_start(f64::NAN, 0),
            Err(Error::Schedule { .. })
        ));
        assert!(matches!(
            track.schedule_start(0.0, SampleTime::MAX),
            Err(Error::Schedule { .. })
        ));
        assert!(!track.is_scheduled());
    }

    #[test]
    fn test_empty_stem_cannot_be_scheduled() {
        let track = Track::new("empty", StemBuffer::silence(0, 44_100), 0.5, 0.2);
        assert!(matches!(
            track.schedule_start(0.0, 100),
            Err(Error::Schedule { ref track, .. }) if track == "empty"
        ));
        assert!(!track.is_scheduled());
    }

    #[test]
    fn test_trim_change_applies_to_next_frame() {
        let track = Track::new("flat", StemBuffer::new(vec![1.0, 1.0], 44_100), 0.5, 1.0);
        track.schedule_start(0.0, 0).unwrap();

        track.set_trim(0.25);
        assert_eq!(track.trim(), 0.25);
        assert!((track.render_frame(0).left - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_reschedule_replaces_previous_start() {
        let track = ramp_track(100);
        track.schedule_start(0.0, 0).unwrap();
        track.schedule_start(0.050, 1_000).unwrap();

        assert_eq!(track.scheduled_start(), Some(1_000));
        assert_eq!(track.start_frame(), 50);
        assert!((track.start_position() - 0.050).abs() < 1e-9);
        assert!(track.render_frame(10).is_silent());
    }
}
