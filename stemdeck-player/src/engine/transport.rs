//! Synchronized transport over all loaded tracks
//!
//! One state machine (Stopped / Playing / Paused) drives every track. Play
//! schedules all tracks for the same instant on the graph clock, a fixed
//! look-ahead in the future, so the order in which start instructions are
//! issued cannot skew the stems against each other.
//!
//! Position and progress come from the wall-clock [`PlaybackClock`]; the
//! graph clock is only used to place start instants.

use super::clock::{PlaybackClock, WallClock};
use super::graph::AudioGraph;
use super::mix_bus::MixBus;
use super::progress::{self, ProgressReport};
use super::resolver::AssetResolver;
use super::track::Track;
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use stemdeck_common::config::ManifestEntry;
use stemdeck_common::timing::ms_to_frames;
use stemdeck_common::{EventBus, PlaybackState, TransportEvent};
use tracing::{debug, error, info, warn};

/// Per-track view for the API
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackSnapshot {
    pub index: usize,
    pub name: String,
    pub gain: f32,
    pub muted: bool,
    pub duration_seconds: f64,
}

pub struct Transport {
    graph: Box<dyn AudioGraph>,
    resolver: Box<dyn AssetResolver>,
    wall_clock: Arc<dyn WallClock>,
    bus: MixBus,
    tracks: Vec<Track>,
    state: PlaybackState,
    loaded: bool,
    /// Seconds from track start captured at the last pause (or seek)
    paused_position: f64,
    clock: PlaybackClock,
    config: EngineConfig,
    events: Option<EventBus>,
}

impl Transport {
    /// Create a transport and route its mix bus into `graph`
    pub fn new(
        mut graph: Box<dyn AudioGraph>,
        resolver: Box<dyn AssetResolver>,
        wall_clock: Arc<dyn WallClock>,
        config: EngineConfig,
    ) -> Self {
        let bus = MixBus::new();
        graph.connect(bus.clone());

        Self {
            graph,
            resolver,
            wall_clock,
            bus,
            tracks: Vec::new(),
            state: PlaybackState::Stopped,
            loaded: false,
            paused_position: 0.0,
            clock: PlaybackClock::new(),
            config,
            events: None,
        }
    }

    /// Broadcast transport events on `events`
    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Replace the current tracks with the stems listed in `manifest`
    ///
    /// All-or-nothing: on any failure no track is kept, the mix bus is
    /// empty and the transport reports not loaded.
    pub fn load(&mut self, manifest: &[ManifestEntry]) -> Result<()> {
        self.stop();
        self.discard_tracks();
        self.paused_position = 0.0;

        info!("Loading {} tracks", manifest.len());

        let sample_rate = self.graph.sample_rate();
        let mut staged = Vec::with_capacity(manifest.len());

        for entry in manifest {
            let track = match self.build_track(entry, sample_rate) {
                Ok(track) => track,
                Err(e) => return Err(self.abort_load(e)),
            };
            self.bus.attach(&track);
            staged.push(track);
        }

        if let Err(e) = self.start_graph() {
            return Err(self.abort_load(e));
        }

        warn_on_length_mismatch(&staged);

        self.tracks = staged;
        self.loaded = true;

        let duration = self.duration();
        info!(
            "Loaded {} tracks ({:.3}s) at {} Hz",
            self.tracks.len(),
            duration,
            sample_rate
        );
        self.emit(TransportEvent::TracksLoaded {
            track_names: self.track_names(),
            duration_seconds: duration,
            timestamp: chrono::Utc::now(),
        });

        Ok(())
    }

    fn build_track(&self, entry: &ManifestEntry, sample_rate: u32) -> Result<Track> {
        let path = self.resolver.resolve(&entry.filename)?;
        debug!("Resolved '{}' to {}", entry.filename, path.display());
        Track::open(
            entry.label.clone(),
            &path,
            sample_rate,
            self.config.trim,
            self.config.default_gain,
        )
    }

    fn start_graph(&mut self) -> Result<()> {
        self.graph.start().map_err(|e| match e {
            Error::GraphStart(_) => e,
            other => Error::GraphStart(other.to_string()),
        })
    }

    /// Roll back a partial load and hand the error back
    fn abort_load(&mut self, e: Error) -> Error {
        error!("Load failed, discarding tracks: {}", e);
        self.discard_tracks();
        self.emit(TransportEvent::LoadFailed {
            reason: e.to_string(),
            timestamp: chrono::Utc::now(),
        });
        e
    }

    fn discard_tracks(&mut self) {
        self.bus.detach_all();
        self.tracks.clear();
        self.loaded = false;
        self.clock.reset();
    }

    /// Start every track together from the paused position
    ///
    /// No-op before a successful load or while already playing. A stopped
    /// audio graph is restarted first; if it will not start the transport
    /// stays in its current state.
    pub fn play(&mut self) -> Result<()> {
        if !self.loaded {
            debug!("play() ignored: nothing loaded");
            return Ok(());
        }
        if self.state == PlaybackState::Playing {
            return Ok(());
        }

        // A graph whose output died since load has a frozen clock
        if !self.graph.is_running() {
            warn!("Audio graph stopped since load, restarting");
            if let Err(e) = self.start_graph() {
                error!("play() aborted: {}", e);
                return Err(e);
            }
        }

        let horizon = self
            .graph
            .now()
            .saturating_add(ms_to_frames(self.config.look_ahead_ms, self.graph.sample_rate()));
        let position = self.paused_position;

        for (i, track) in self.tracks.iter().enumerate() {
            if let Err(e) = track.schedule_start(position, horizon) {
                for scheduled in &self.tracks[..i] {
                    scheduled.stop();
                }
                error!("play() aborted: {}", e);
                return Err(e);
            }
        }

        self.clock
            .mark_start(self.wall_clock.now(), duration_from_secs(position));

        debug!(
            "Scheduled {} tracks at graph frame {} from {:.3}s",
            self.tracks.len(),
            horizon,
            position
        );
        self.set_state(PlaybackState::Playing);
        Ok(())
    }

    /// Halt every track and remember the position reached
    ///
    /// No-op unless playing.
    pub fn pause(&mut self) {
        if self.state != PlaybackState::Playing {
            return;
        }

        self.paused_position = self.clock.mark_pause(self.wall_clock.now()).as_secs_f64();
        self.halt_tracks();
        self.set_state(PlaybackState::Paused);
    }

    /// Halt every track; the paused position is kept
    pub fn stop(&mut self) {
        self.halt_tracks();
        self.clock.reset();
        self.set_state(PlaybackState::Stopped);
    }

    fn halt_tracks(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }

    /// Set the position the next play starts from
    ///
    /// Only allowed while not playing; clamped to [0, duration].
    pub fn seek(&mut self, position: f64) -> Result<()> {
        if self.state == PlaybackState::Playing {
            return Err(Error::InvalidState("cannot seek while playing".to_string()));
        }
        if !position.is_finite() {
            return Err(Error::BadRequest(format!(
                "seek position must be finite, got {}",
                position
            )));
        }

        self.paused_position = position.clamp(0.0, self.duration());
        debug!("Seeked to {:.3}s", self.paused_position);
        Ok(())
    }

    fn track(&self, index: usize) -> Result<&Track> {
        self.tracks.get(index).ok_or(Error::TrackNotFound(index))
    }

    /// Set a track's fader level (not validated)
    pub fn set_gain(&mut self, index: usize, value: f32) -> Result<()> {
        self.track(index)?.set_gain(value);
        self.emit(TransportEvent::GainChanged {
            track_index: index,
            gain: value,
            timestamp: chrono::Utc::now(),
        });
        Ok(())
    }

    pub fn gain(&self, index: usize) -> Result<f32> {
        Ok(self.track(index)?.gain())
    }

    /// Set a track's pre-fader trim (not validated)
    pub fn set_trim(&mut self, index: usize, value: f32) -> Result<()> {
        self.track(index)?.set_trim(value);
        debug!("Track {} trim set to {}", index, value);
        Ok(())
    }

    pub fn trim(&self, index: usize) -> Result<f32> {
        Ok(self.track(index)?.trim())
    }

    /// Mute (fader to 0) or unmute (fader to the default level)
    ///
    /// Returns the new fader level.
    pub fn toggle_mute(&mut self, index: usize) -> Result<f32> {
        let gain = if self.track(index)?.gain() == 0.0 {
            self.config.default_gain
        } else {
            0.0
        };
        self.set_gain(index, gain)?;
        Ok(gain)
    }

    /// Duration of the first track in seconds, 0 when nothing is loaded
    pub fn duration(&self) -> f64 {
        self.tracks.first().map(Track::duration).unwrap_or(0.0)
    }

    pub fn progress(&self, now: Instant) -> f64 {
        progress::progress(self.state, self.clock.elapsed(now), self.duration())
    }

    /// Elapsed position while playing, the paused position otherwise
    pub fn position(&self, now: Instant) -> f64 {
        match (self.state, self.clock.elapsed(now)) {
            (PlaybackState::Playing, Some(elapsed)) => elapsed.as_secs_f64(),
            _ => self.paused_position,
        }
    }

    pub fn report(&self, now: Instant) -> ProgressReport {
        ProgressReport {
            state: self.state,
            is_loaded: self.loaded,
            is_playing: self.is_playing(),
            duration_seconds: self.duration(),
            position_seconds: self.position(now),
            progress: self.progress(now),
        }
    }

    /// Current instant on the injected wall clock
    pub fn now(&self) -> Instant {
        self.wall_clock.now()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn paused_position(&self) -> f64 {
        self.paused_position
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track_names(&self) -> Vec<String> {
        self.tracks.iter().map(|t| t.name().to_string()).collect()
    }

    pub fn track_snapshots(&self) -> Vec<TrackSnapshot> {
        self.tracks
            .iter()
            .enumerate()
            .map(|(index, track)| TrackSnapshot {
                index,
                name: track.name().to_string(),
                gain: track.gain(),
                muted: track.gain() == 0.0,
                duration_seconds: track.duration(),
            })
            .collect()
    }

    pub fn sample_rate(&self) -> u32 {
        self.graph.sample_rate()
    }

    /// Stop playback and release the audio graph
    pub fn shutdown(&mut self) {
        self.stop();
        self.graph.shutdown();
        info!("Transport shut down");
    }

    fn set_state(&mut self, new_state: PlaybackState) {
        let old_state = self.state;
        if old_state == new_state {
            return;
        }
        self.state = new_state;
        info!("Transport {} -> {}", old_state, new_state);

        self.emit(TransportEvent::PlaybackStateChanged {
            old_state,
            new_state,
            position_seconds: self.position(self.wall_clock.now()),
            timestamp: chrono::Utc::now(),
        });
    }

    fn emit(&self, event: TransportEvent) {
        if let Some(events) = &self.events {
            events.emit_lossy(event);
        }
    }
}

fn duration_from_secs(seconds: f64) -> Duration {
    Duration::try_from_secs_f64(seconds).unwrap_or(Duration::ZERO)
}

/// Stems are expected to share one length; a mismatch is logged, not fatal
fn warn_on_length_mismatch(tracks: &[Track]) {
    let Some(reference) = tracks.first() else {
        return;
    };
    for track in &tracks[1..] {
        if track.frame_count().abs_diff(reference.frame_count()) > 1 {
            warn!(
                "Track '{}' is {:.3}s long, reference '{}' is {:.3}s",
                track.name(),
                track.duration(),
                reference.name(),
                reference.duration()
            );
        }
    }
}
