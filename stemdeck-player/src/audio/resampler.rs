//! Audio resampling using rubato
//!
//! Stems whose native rate differs from the audio graph's operating rate
//! are converted once, at load time, so that one source frame equals one
//! graph clock tick during playback.

use crate::error::{Error, Result};
use rubato::{FastFixedIn, PolynomialDegree, Resampler as RubatoResampler};
use tracing::debug;

/// Interleaved stereo
const CHANNELS: usize = 2;

/// Stereo resampler built on rubato's `FastFixedIn`
pub struct Resampler;

impl Resampler {
    /// Resample interleaved stereo audio from `input_rate` to `output_rate`.
    ///
    /// Returns a copy of the input when the rates already match.
    pub fn resample(input: &[f32], input_rate: u32, output_rate: u32) -> Result<Vec<f32>> {
        if input_rate == 0 || output_rate == 0 {
            return Err(Error::Resample(format!(
                "invalid sample rates {}Hz -> {}Hz",
                input_rate, output_rate
            )));
        }

        if input_rate == output_rate {
            debug!("Sample rate already at {}Hz, skipping resample", output_rate);
            return Ok(input.to_vec());
        }

        let planar_input = Self::deinterleave(input);
        let input_frames = planar_input[0].len();
        if input_frames == 0 {
            return Ok(Vec::new());
        }

        debug!(
            "Resampling {} frames from {}Hz to {}Hz",
            input_frames, input_rate, output_rate
        );

        let ratio = output_rate as f64 / input_rate as f64;
        let expected_frames = (input_frames as f64 * ratio).round() as usize;

        let mut resampler = FastFixedIn::<f32>::new(
            ratio,
            1.0,
            PolynomialDegree::Septic,
            input_frames,
            CHANNELS,
        )
        .map_err(|e| Error::Resample(format!("failed to create resampler: {}", e)))?;

        // Output frame `delay` lines up with input frame 0
        let delay = resampler.output_delay();

        let mut planar_output = resampler
            .process(&planar_input, None)
            .map_err(|e| Error::Resample(format!("resampling failed: {}", e)))?;

        // Flush the filter tail until the full stem has come out
        while planar_output[0].len() < delay + expected_frames {
            let tail = resampler
                .process_partial(None::<&[Vec<f32>]>, None)
                .map_err(|e| Error::Resample(format!("resampler flush failed: {}", e)))?;
            if tail[0].is_empty() {
                break;
            }
            for (channel, chunk) in planar_output.iter_mut().zip(tail) {
                channel.extend(chunk);
            }
        }

        for channel in &mut planar_output {
            channel.drain(..delay.min(channel.len()));
            channel.truncate(expected_frames);
        }

        Ok(Self::interleave(planar_output))
    }

    /// [L, R, L, R, ...] -> [[L, L, ...], [R, R, ...]]
    fn deinterleave(samples: &[f32]) -> Vec<Vec<f32>> {
        let num_frames = samples.len() / CHANNELS;
        let mut planar = vec![Vec::with_capacity(num_frames); CHANNELS];

        for frame in samples.chunks_exact(CHANNELS) {
            for (ch, &sample) in frame.iter().enumerate() {
                planar[ch].push(sample);
            }
        }

        planar
    }

    /// [[L, L, ...], [R, R, ...]] -> [L, R, L, R, ...]
    fn interleave(planar: Vec<Vec<f32>>) -> Vec<f32> {
        let num_frames = planar.iter().map(Vec::len).min().unwrap_or(0);
        let mut interleaved = Vec::with_capacity(num_frames * planar.len());

        for frame_idx in 0..num_frames {
            for channel in &planar {
                interleaved.push(channel[frame_idx]);
            }
        }

        interleaved
    }
}
