//! Audio test file generation utilities
//!
//! Generates deterministic WAV files with known content so decode, mix and
//! alignment results can be checked sample for sample.

use hound::{WavSpec, WavWriter};
use std::f32::consts::PI;
use std::path::Path;

/// Standard test sample rate (44.1 kHz)
pub const TEST_SAMPLE_RATE: u32 = 44_100;

/// Write a 16-bit WAV whose sample for (frame, channel) is `sample(frame, channel)`
pub fn generate_wav<P, F>(
    path: P,
    sample_rate: u32,
    channels: u16,
    frames: usize,
    mut sample: F,
) -> Result<(), hound::Error>
where
    P: AsRef<Path>,
    F: FnMut(usize, u16) -> i16,
{
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)?;
    for frame in 0..frames {
        for channel in 0..channels {
            writer.write_sample(sample(frame, channel))?;
        }
    }
    writer.finalize()
}

/// Generate silent stereo WAV file
pub fn generate_silent_wav<P: AsRef<Path>>(path: P, duration_ms: u64) -> Result<(), hound::Error> {
    let frames = (TEST_SAMPLE_RATE as u64 * duration_ms / 1000) as usize;
    generate_wav(path, TEST_SAMPLE_RATE, 2, frames, |_, _| 0)
}

/// Generate sine wave stereo WAV file
///
/// `amplitude` is 0.0-1.0 of full scale.
pub fn generate_sine_wav<P: AsRef<Path>>(
    path: P,
    duration_ms: u64,
    frequency_hz: f32,
    amplitude: f32,
) -> Result<(), hound::Error> {
    let frames = (TEST_SAMPLE_RATE as u64 * duration_ms / 1000) as usize;
    generate_wav(path, TEST_SAMPLE_RATE, 2, frames, |frame, _| {
        let t = frame as f32 / TEST_SAMPLE_RATE as f32;
        ((2.0 * PI * frequency_hz * t).sin() * amplitude * i16::MAX as f32) as i16
    })
}

/// Stereo WAV whose frame `i` holds `sign * ((i % 1000) + 1)`
///
/// Never silent, and a one-frame offset always changes the value, which
/// makes misalignment between two stems visible.
pub fn generate_ramp_wav<P: AsRef<Path>>(path: P, frames: usize, sign: i16) -> Result<(), hound::Error> {
    generate_wav(path, TEST_SAMPLE_RATE, 2, frames, |frame, _| {
        sign * ((frame % 1000) as i16 + 1)
    })
}
