//! Core audio data types
//!
//! Defines the in-memory PCM buffer each track plays from and the stereo
//! frame passed between tracks, the mix bus and the output device.

use stemdeck_common::timing::frames_to_seconds;

/// Fully decoded stem held in RAM.
///
/// **Format:**
/// - Samples are f32 (floating point -1.0 to 1.0)
/// - Stereo interleaved: [L, R, L, R, ...]
/// - Sample rate equals the audio graph's operating rate
#[derive(Debug, Clone)]
pub struct StemBuffer {
    /// PCM audio samples (interleaved stereo)
    samples: Vec<f32>,

    /// Sample rate the samples were produced at
    sample_rate: u32,

    /// Number of stereo frames (samples.len() / 2)
    frame_count: usize,
}

impl StemBuffer {
    /// Wrap interleaved stereo samples
    ///
    /// A trailing half frame (odd sample count) is dropped.
    pub fn new(mut samples: Vec<f32>, sample_rate: u32) -> Self {
        if samples.len() % 2 != 0 {
            samples.pop();
        }
        let frame_count = samples.len() / 2;

        Self {
            samples,
            sample_rate,
            frame_count,
        }
    }

    /// Buffer of `frames` silent frames
    pub fn silence(frames: usize, sample_rate: u32) -> Self {
        Self::new(vec![0.0; frames * 2], sample_rate)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn is_empty(&self) -> bool {
        self.frame_count == 0
    }

    /// Get duration in seconds
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        frames_to_seconds(self.frame_count as u64, self.sample_rate)
    }

    /// Get audio frame at specific frame index
    pub fn frame(&self, frame_index: u64) -> Option<AudioFrame> {
        if frame_index >= self.frame_count as u64 {
            return None;
        }
        let i = frame_index as usize * 2;
        Some(AudioFrame {
            left: self.samples[i],
            right: self.samples[i + 1],
        })
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }
}

/// AudioFrame represents a single stereo sample (one frame of audio).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioFrame {
    /// Left channel sample
    pub left: f32,

    /// Right channel sample
    pub right: f32,
}

impl AudioFrame {
    /// Create a silent frame (0.0, 0.0)
    pub fn zero() -> Self {
        AudioFrame { left: 0.0, right: 0.0 }
    }

    /// Create a frame from left and right samples
    pub fn from_stereo(left: f32, right: f32) -> Self {
        AudioFrame { left, right }
    }

    pub fn is_silent(&self) -> bool {
        self.left == 0.0 && self.right == 0.0
    }

    /// Apply amplitude scaling to both channels
    pub fn apply_volume(&mut self, volume: f32) {
        self.left *= volume;
        self.right *= volume;
    }

    /// Add another frame to this frame (for mixing)
    pub fn add(&mut self, other: &AudioFrame) {
        self.left += other.left;
        self.right += other.right;
    }

    /// Clamp samples to valid range [-1.0, 1.0]
    pub fn clamp(&mut self) {
        self.left = self.left.clamp(-1.0, 1.0);
        self.right = self.right.clamp(-1.0, 1.0);
    }
}
