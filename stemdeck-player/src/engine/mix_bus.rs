//! Summing node between the tracks and the graph output
//!
//! The control side attaches and detaches voices under a write lock; the
//! audio thread only ever `try_read`s, rendering silence for the one frame
//! in which a (re)load holds the lock.

use super::track::{Track, TrackVoice};
use crate::audio::AudioFrame;
use std::sync::{Arc, RwLock};
use stemdeck_common::timing::SampleTime;
use tracing::debug;

/// Shared list of track voices summed into the graph output
#[derive(Clone, Default)]
pub struct MixBus {
    voices: Arc<RwLock<Vec<Arc<TrackVoice>>>>,
}

impl MixBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route a track into the bus
    pub fn attach(&self, track: &Track) {
        let mut voices = self.voices.write().unwrap_or_else(|e| e.into_inner());
        voices.push(track.voice());
        debug!("Attached '{}' to mix bus ({} voices)", track.name(), voices.len());
    }

    /// Disconnect every track
    pub fn detach_all(&self) {
        let mut voices = self.voices.write().unwrap_or_else(|e| e.into_inner());
        if !voices.is_empty() {
            debug!("Detaching {} voices from mix bus", voices.len());
        }
        voices.clear();
    }

    pub fn len(&self) -> usize {
        self.voices.read().map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of every attached voice at `now`, clamped to [-1.0, 1.0]
    ///
    /// Never blocks: returns silence if the voice list is being modified.
    pub fn render_frame(&self, now: SampleTime) -> AudioFrame {
        let Ok(voices) = self.voices.try_read() else {
            return AudioFrame::zero();
        };

        let mut mix = AudioFrame::zero();
        for voice in voices.iter() {
            mix.add(&voice.render(now));
        }
        mix.clamp();
        mix
    }

    /// Render `out.len()` consecutive frames starting at `start`
    pub fn render_into(&self, start: SampleTime, out: &mut [AudioFrame]) {
        for (offset, frame) in out.iter_mut().enumerate() {
            *frame = self.render_frame(start + offset as SampleTime);
        }
    }
}

impl std::fmt::Debug for MixBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MixBus").field("voices", &self.len()).finish()
    }
}
