//! Audio decoder using symphonia
//!
//! Decodes a whole stem file (WAV, MP3, FLAC, AAC, Vorbis) into RAM as
//! interleaved stereo f32, then converts it to the audio graph's rate.
//!
//! Mono sources are duplicated to both channels; sources with more than two
//! channels keep their first two (front left/right).

use super::resampler::Resampler;
use super::types::StemBuffer;
use crate::error::{Error, Result};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// PCM produced by [`StemDecoder::decode_file`], before rate conversion
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Interleaved stereo samples
    pub samples: Vec<f32>,
    /// Source sample rate
    pub sample_rate: u32,
    /// Channel count of the source file
    pub source_channels: usize,
}

impl DecodedAudio {
    pub fn frame_count(&self) -> usize {
        self.samples.len() / 2
    }
}

/// Whole-file decoder
pub struct StemDecoder;

impl StemDecoder {
    /// Decode a stem and resample it to `target_rate`
    pub fn decode_stem(path: &Path, target_rate: u32) -> Result<StemBuffer> {
        let decoded = Self::decode_file(path)?;
        let samples = Resampler::resample(&decoded.samples, decoded.sample_rate, target_rate)?;
        let buffer = StemBuffer::new(samples, target_rate);

        debug!(
            "Stem {} ready: {} frames at {}Hz ({:.3}s)",
            path.display(),
            buffer.frame_count(),
            target_rate,
            buffer.duration_seconds()
        );

        Ok(buffer)
    }

    /// Decode entire audio file to interleaved stereo f32 samples
    ///
    /// # Errors
    /// - Failed to open file
    /// - Unsupported audio format
    /// - No decodable audio frames
    pub fn decode_file(path: &Path) -> Result<DecodedAudio> {
        debug!("Decoding entire file: {}", path.display());

        let decode_err = |message: String| Error::Decode {
            path: path.to_path_buf(),
            message,
        };

        let file = std::fs::File::open(path)
            .map_err(|e| decode_err(format!("failed to open file: {}", e)))?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| decode_err(format!("failed to probe format: {}", e)))?;

        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| decode_err("no audio track found".to_string()))?;

        let track_id = track.id;
        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| decode_err("sample rate not found".to_string()))?;

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| decode_err(format!("failed to create decoder: {}", e)))?;

        let mut samples = Vec::new();
        let mut source_channels = 0;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => {
                    warn!("{}: stream reset requested, stopping decode", path.display());
                    break;
                }
                Err(e) => return Err(decode_err(format!("error reading packet: {}", e))),
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    // Keep the packet's slot so later audio stays on time
                    let gap = packet.dur as usize;
                    warn!(
                        "{}: corrupt packet, substituting {} frames of silence: {}",
                        path.display(),
                        gap,
                        e
                    );
                    Self::pad_silence(&mut samples, gap);
                    continue;
                }
                Err(e) => return Err(decode_err(format!("decode failed: {}", e))),
            };

            let spec = *decoded.spec();
            source_channels = spec.channels.count();

            let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
            buf.copy_interleaved_ref(decoded);

            Self::fold_to_stereo(buf.samples(), source_channels, &mut samples);
        }

        if samples.is_empty() {
            return Err(decode_err("no audio frames decoded".to_string()));
        }

        debug!(
            "Decoded {} frames at {}Hz ({} source channels)",
            samples.len() / 2,
            sample_rate,
            source_channels
        );

        Ok(DecodedAudio {
            samples,
            sample_rate,
            source_channels,
        })
    }

    /// Append `frames` silent stereo frames to `output`
    fn pad_silence(output: &mut Vec<f32>, frames: usize) {
        output.resize(output.len() + frames * 2, 0.0);
    }

    /// Append interleaved `channels`-wide samples to `output` as stereo
    fn fold_to_stereo(input: &[f32], channels: usize, output: &mut Vec<f32>) {
        match channels {
            0 => {}
            1 => {
                output.reserve(input.len() * 2);
                for &sample in input {
                    output.push(sample);
                    output.push(sample);
                }
            }
            2 => output.extend_from_slice(input),
            n => {
                output.reserve(input.len() / n * 2);
                for frame in input.chunks_exact(n) {
                    output.push(frame[0]);
                    output.push(frame[1]);
                }
            }
        }
    }
}
