//! Audio output using cpal
//!
//! Opens the output device at the engine's operating sample rate and pulls
//! one [`AudioFrame`] per output frame from a render callback running on the
//! device's real-time thread.

use crate::audio::AudioFrame;
use crate::error::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, SizedSample, Stream, StreamConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Audio output manager using cpal.
pub struct AudioOutput {
    device: Device,
    config: StreamConfig,
    sample_format: SampleFormat,
    stream: Option<Stream>,
    /// Set by the stream error callback
    error_flag: Arc<AtomicBool>,
}

impl AudioOutput {
    /// List available audio output devices.
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();

        let devices: Vec<String> = host
            .output_devices()
            .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?
            .filter_map(|device| device.name().ok())
            .collect();

        debug!("Found {} output devices", devices.len());
        Ok(devices)
    }

    /// Open an output device running at exactly `sample_rate`.
    ///
    /// A named device that cannot be found falls back to the default device.
    /// Fails if the device cannot run at the requested rate, since stems are
    /// decoded at that rate and one source frame must equal one device frame.
    pub fn new(
        device_name: Option<&str>,
        sample_rate: u32,
        buffer_size: Option<u32>,
    ) -> Result<Self> {
        let device = Self::open_device(device_name)?;
        let (mut config, sample_format) = Self::get_config(&device, sample_rate)?;

        if let Some(size) = buffer_size {
            config.buffer_size = cpal::BufferSize::Fixed(size);
            debug!("Using requested buffer size: {} frames", size);
        }

        debug!(
            "Audio config: sample_rate={}, channels={}, format={:?}, buffer_size={:?}",
            config.sample_rate.0, config.channels, sample_format, config.buffer_size
        );

        Ok(Self {
            device,
            config,
            sample_format,
            stream: None,
            error_flag: Arc::new(AtomicBool::new(false)),
        })
    }

    fn open_device(device_name: Option<&str>) -> Result<Device> {
        let host = cpal::default_host();

        if let Some(name) = device_name {
            let mut devices = host
                .output_devices()
                .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?;

            if let Some(dev) = devices.find(|d| d.name().ok().as_deref() == Some(name)) {
                info!("Found requested audio device: {}", name);
                return Ok(dev);
            }
            warn!(
                "Requested device '{}' not found, falling back to default device",
                name
            );
        }

        let dev = host
            .default_output_device()
            .ok_or_else(|| Error::AudioOutput("No default output device found".to_string()))?;
        info!(
            "Using default audio device: {}",
            dev.name().unwrap_or_else(|_| "Unknown".to_string())
        );
        Ok(dev)
    }

    /// Pick a supported configuration at `sample_rate`, preferring stereo f32.
    fn get_config(device: &Device, sample_rate: u32) -> Result<(StreamConfig, SampleFormat)> {
        let candidates: Vec<_> = device
            .supported_output_configs()
            .map_err(|e| Error::AudioOutput(format!("Failed to get device configs: {}", e)))?
            .filter(|c| c.min_sample_rate().0 <= sample_rate && c.max_sample_rate().0 >= sample_rate)
            .filter(|c| {
                matches!(
                    c.sample_format(),
                    SampleFormat::F32 | SampleFormat::I16 | SampleFormat::U16
                )
            })
            .collect();

        let rank = |c: &cpal::SupportedStreamConfigRange| {
            let stereo = c.channels() == 2;
            let float = c.sample_format() == SampleFormat::F32;
            (!stereo, !float)
        };

        let best = candidates
            .into_iter()
            .min_by_key(rank)
            .ok_or_else(|| {
                Error::AudioOutput(format!(
                    "Output device does not support {} Hz",
                    sample_rate
                ))
            })?;

        let sample_format = best.sample_format();
        let config = best
            .with_sample_rate(cpal::SampleRate(sample_rate))
            .config();
        Ok((config, sample_format))
    }

    /// Start audio playback with callback.
    ///
    /// The callback runs on the device's real-time thread once per output
    /// frame and must not block.
    pub fn start<F>(&mut self, callback: F) -> Result<()>
    where
        F: FnMut() -> AudioFrame + Send + 'static,
    {
        info!("Starting audio stream");

        let stream = match self.sample_format {
            SampleFormat::F32 => self.build_stream(callback, |s| s)?,
            SampleFormat::I16 => self.build_stream(callback, |s| (s * i16::MAX as f32) as i16)?,
            SampleFormat::U16 => self.build_stream(callback, |s| ((s + 1.0) * 32767.5) as u16)?,
            sample_format => {
                return Err(Error::AudioOutput(format!(
                    "Unsupported sample format: {:?}",
                    sample_format
                )));
            }
        };

        stream
            .play()
            .map_err(|e| Error::AudioOutput(format!("Failed to start stream: {}", e)))?;

        self.stream = Some(stream);

        info!("Audio stream started at {} Hz", self.sample_rate());
        Ok(())
    }

    fn build_stream<T, F>(&self, mut callback: F, convert: fn(f32) -> T) -> Result<Stream>
    where
        T: SizedSample + 'static,
        F: FnMut() -> AudioFrame + Send + 'static,
    {
        let channels = self.config.channels as usize;
        let error_flag = Arc::clone(&self.error_flag);

        self.device
            .build_output_stream(
                &self.config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    for frame in data.chunks_mut(channels) {
                        let mut audio_frame = callback();
                        audio_frame.clamp();

                        frame[0] = convert(audio_frame.left);
                        if channels > 1 {
                            frame[1] = convert(audio_frame.right);
                        }
                        for extra in frame.iter_mut().skip(2) {
                            *extra = convert(0.0);
                        }
                    }
                },
                move |err| {
                    error!("Audio stream error: {}", err);
                    error_flag.store(true, Ordering::SeqCst);
                },
                None,
            )
            .map_err(|e| Error::AudioOutput(format!("Failed to build stream: {}", e)))
    }

    /// Stop audio playback and drop the stream.
    pub fn stop(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            info!("Stopping audio stream");
            stream
                .pause()
                .map_err(|e| Error::AudioOutput(format!("Failed to pause stream: {}", e)))?;
        }

        Ok(())
    }

    pub fn device_name(&self) -> String {
        self.device
            .name()
            .unwrap_or_else(|_| "Unknown".to_string())
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    pub fn channels(&self) -> u16 {
        self.config.channels
    }

    /// True once the stream error callback has fired
    pub fn has_error(&self) -> bool {
        self.error_flag.load(Ordering::SeqCst)
    }
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
