//! Audio graph backed by a cpal output stream
//!
//! A cpal `Stream` is not `Send`, so it lives on a dedicated owner thread.
//! The thread opens the device, starts the stream, reports the outcome over
//! a channel, then parks until shutdown. The render callback advances an
//! atomic frame counter that serves as the graph clock.

use super::output::AudioOutput;
use crate::engine::{AudioGraph, MixBus};
use crate::error::{Error, Result};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;
use std::time::Duration;
use stemdeck_common::timing::SampleTime;
use tracing::{error, info, warn};

/// How long `start` waits for the device thread to report
const START_TIMEOUT: Duration = Duration::from_secs(5);

pub struct CpalGraph {
    sample_rate: u32,
    device_name: Option<String>,
    buffer_size: Option<u32>,
    bus: Option<MixBus>,
    clock: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl CpalGraph {
    pub fn new(sample_rate: u32, device_name: Option<String>, buffer_size: Option<u32>) -> Self {
        Self {
            sample_rate,
            device_name,
            buffer_size,
            bus: None,
            clock: Arc::new(AtomicU64::new(0)),
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }
}

impl AudioGraph for CpalGraph {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn connect(&mut self, bus: MixBus) {
        if self.is_running() {
            warn!("Reconnecting mix bus on a running graph; takes effect after restart");
        }
        self.bus = Some(bus);
    }

    fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Ok(());
        }
        // Reap a worker whose stream died
        self.shutdown();

        let bus = self
            .bus
            .clone()
            .ok_or_else(|| Error::GraphStart("no mix bus connected".to_string()))?;

        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();
        let clock = Arc::clone(&self.clock);
        let running = Arc::clone(&self.running);
        let device_name = self.device_name.clone();
        let buffer_size = self.buffer_size;
        let sample_rate = self.sample_rate;

        running.store(true, Ordering::SeqCst);

        let worker = std::thread::Builder::new()
            .name("stemdeck-audio".to_string())
            .spawn(move || {
                let mut output = match AudioOutput::new(device_name.as_deref(), sample_rate, buffer_size)
                {
                    Ok(output) => output,
                    Err(e) => {
                        running.store(false, Ordering::SeqCst);
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                let render_clock = Arc::clone(&clock);
                let started = output.start(move || {
                    let now = render_clock.fetch_add(1, Ordering::Relaxed);
                    bus.render_frame(now)
                });

                if let Err(e) = started {
                    running.store(false, Ordering::SeqCst);
                    let _ = ready_tx.send(Err(e));
                    return;
                }

                info!(
                    "Audio graph running on '{}' at {} Hz, {} channels",
                    output.device_name(),
                    output.sample_rate(),
                    output.channels()
                );
                let _ = ready_tx.send(Ok(()));

                while running.load(Ordering::SeqCst) {
                    if output.has_error() {
                        error!("Audio stream reported an error, stopping graph");
                        running.store(false, Ordering::SeqCst);
                        break;
                    }
                    std::thread::sleep(Duration::from_millis(100));
                }

                if let Err(e) = output.stop() {
                    warn!("Failed to stop audio output: {}", e);
                }
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                Error::GraphStart(format!("failed to spawn audio thread: {}", e))
            })?;

        self.worker = Some(worker);

        match ready_rx.recv_timeout(START_TIMEOUT) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                self.shutdown();
                Err(Error::GraphStart(e.to_string()))
            }
            Err(_) => {
                self.shutdown();
                Err(Error::GraphStart(
                    "audio device did not start in time".to_string(),
                ))
            }
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn now(&self) -> SampleTime {
        self.clock.load(Ordering::Acquire)
    }

    fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("Audio thread panicked");
            }
        }
    }
}

impl Drop for CpalGraph {
    fn drop(&mut self) {
        self.shutdown();
    }
}
