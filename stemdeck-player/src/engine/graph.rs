//! Audio graph abstraction
//!
//! The graph owns the output clock: a frame counter at the operating sample
//! rate that advances as the mix bus is rendered. Tracks are scheduled
//! against this clock, never against wall time.

use super::mix_bus::MixBus;
use crate::audio::AudioFrame;
use crate::error::{Error, Result};
use std::sync::{Arc, Mutex, MutexGuard};
use stemdeck_common::timing::SampleTime;

/// Render context the transport drives
pub trait AudioGraph: Send {
    /// Operating sample rate (Hz)
    fn sample_rate(&self) -> u32;

    /// Route `bus` to the graph output, replacing any previous bus
    fn connect(&mut self, bus: MixBus);

    /// Begin rendering; calling it while already running is a no-op
    fn start(&mut self) -> Result<()>;

    fn is_running(&self) -> bool;

    /// Current point on the graph clock
    fn now(&self) -> SampleTime;

    /// Stop rendering and release the output
    fn shutdown(&mut self);
}

#[derive(Debug, Default)]
struct OfflineState {
    bus: Option<MixBus>,
    clock: SampleTime,
    running: bool,
    start_error: Option<String>,
}

/// Audio graph without a device
///
/// The clock only moves when [`OfflineGraph::render`] or
/// [`OfflineGraph::advance`] is called. Clones share one graph, so a caller
/// can keep a handle after giving a clone to the transport.
#[derive(Debug, Clone)]
pub struct OfflineGraph {
    sample_rate: u32,
    state: Arc<Mutex<OfflineState>>,
}

impl OfflineGraph {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            state: Arc::new(Mutex::new(OfflineState::default())),
        }
    }

    /// Graph whose `start` fails with `reason`
    pub fn failing(sample_rate: u32, reason: impl Into<String>) -> Self {
        let graph = Self::new(sample_rate);
        graph.fail_start(reason);
        graph
    }

    /// Make every later `start` fail with `reason`
    pub fn fail_start(&self, reason: impl Into<String>) {
        self.lock().start_error = Some(reason.into());
    }

    fn lock(&self) -> MutexGuard<'_, OfflineState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Move the clock forward without producing output
    pub fn advance(&self, frames: u64) {
        self.lock().clock += frames;
    }

    /// Render `frames` frames of the connected bus, advancing the clock
    ///
    /// Produces silence when the graph is not running or nothing is connected.
    pub fn render(&self, frames: usize) -> Vec<AudioFrame> {
        let mut state = self.lock();
        let mut out = vec![AudioFrame::zero(); frames];
        if state.running {
            if let Some(bus) = state.bus.as_ref() {
                bus.render_into(state.clock, &mut out);
            }
        }
        state.clock += frames as u64;
        out
    }
}

impl AudioGraph for OfflineGraph {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn connect(&mut self, bus: MixBus) {
        self.lock().bus = Some(bus);
    }

    fn start(&mut self) -> Result<()> {
        let mut state = self.lock();
        if let Some(reason) = state.start_error.as_ref() {
            return Err(Error::GraphStart(reason.clone()));
        }
        state.running = true;
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.lock().running
    }

    fn now(&self) -> SampleTime {
        self.lock().clock
    }

    fn shutdown(&mut self) {
        self.lock().running = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::StemBuffer;
    use crate::engine::track::Track;

    #[test]
    fn test_offline_clock_advances_with_render() {
        let mut graph = OfflineGraph::new(44_100);
        graph.connect(MixBus::new());
        graph.start().unwrap();

        assert_eq!(graph.now(), 0);
        graph.render(128);
        graph.advance(72);
        assert_eq!(graph.now(), 200);
    }

    #[test]
    fn test_offline_render_requires_running_graph() {
        let mut graph = OfflineGraph::new(44_100);
        let bus = MixBus::new();
        let track = Track::new("dc", StemBuffer::new(vec![0.5; 20], 44_100), 1.0, 1.0);
        bus.attach(&track);
        track.schedule_start(0.0, 0).unwrap();
        graph.connect(bus);

        assert!(graph.render(4).iter().all(|f| f.is_silent()));

        graph.start().unwrap();
        // Clock is now at 4, still inside the ten-frame stem
        assert!(graph.render(4).iter().all(|f| f.left == 0.5));
    }

    #[test]
    fn test_failing_graph_reports_start_error() {
        let mut graph = OfflineGraph::failing(44_100, "device busy");
        match graph.start() {
            Err(Error::GraphStart(reason)) => assert_eq!(reason, "device busy"),
            other => panic!("Expected GraphStart error, got {:?}", other),
        }
        assert!(!graph.is_running());
    }

    #[test]
    fn test_start_is_idempotent() {
        let mut graph = OfflineGraph::new(48_000);
        graph.start().unwrap();
        graph.start().unwrap();
        assert!(graph.is_running());
        graph.shutdown();
        assert!(!graph.is_running());
    }
}
