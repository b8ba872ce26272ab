//! Wall-clock position tracking
//!
//! [`PlaybackClock`] turns "playback started at instant T from position P"
//! into an elapsed playback position, independent of the audio graph's
//! sample clock. Time is injected through [`WallClock`] so transport logic
//! can be driven deterministically.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Source of the current wall-clock instant
pub trait WallClock: Send + Sync {
    fn now(&self) -> Instant;
}

/// The monotonic system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for offline rendering and tests
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl WallClock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Anchor of the current run: wall instant plus the position it started from
#[derive(Debug, Clone, Copy)]
struct Anchor {
    started_at: Instant,
    from: Duration,
}

/// Tracks elapsed playback time across play/pause cycles
#[derive(Debug, Clone, Default)]
pub struct PlaybackClock {
    anchor: Option<Anchor>,
}

impl PlaybackClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Playback (re)started at `now` from `from`
    pub fn mark_start(&mut self, now: Instant, from: Duration) {
        self.anchor = Some(Anchor {
            started_at: now,
            from,
        });
    }

    /// Playback paused at `now`; returns the position reached
    ///
    /// Returns zero if the clock was never started.
    pub fn mark_pause(&mut self, now: Instant) -> Duration {
        let position = self.elapsed(now).unwrap_or(Duration::ZERO);
        self.anchor = None;
        position
    }

    /// Position at `now` while running, `None` otherwise
    pub fn elapsed(&self, now: Instant) -> Option<Duration> {
        self.anchor
            .map(|a| a.from + now.saturating_duration_since(a.started_at))
    }

    pub fn is_running(&self) -> bool {
        self.anchor.is_some()
    }

    pub fn reset(&mut self) {
        self.anchor = None;
    }
}
