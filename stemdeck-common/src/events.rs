//! Event types for the StemDeck event system
//!
//! Transport transitions, load results and gain changes are broadcast on an
//! [`EventBus`] (tokio::broadcast) so that any number of presentation-layer
//! listeners (e.g. SSE clients) can follow the engine without polling it.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Transport state shared by every track
///
/// Exactly one of these holds at any instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Stopped,
    Playing,
    Paused,
}

impl Default for PlaybackState {
    fn default() -> Self {
        PlaybackState::Stopped
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Stopped => write!(f, "stopped"),
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
        }
    }
}

/// StemDeck event types
///
/// Serialized with an internal `type` tag for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TransportEvent {
    /// Transport moved between Stopped / Playing / Paused
    PlaybackStateChanged {
        old_state: PlaybackState,
        new_state: PlaybackState,
        /// Playback position at the transition (seconds from track start)
        position_seconds: f64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Every manifest entry loaded and the audio graph is running
    TracksLoaded {
        track_names: Vec<String>,
        duration_seconds: f64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A load attempt was rolled back
    LoadFailed {
        reason: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A track's fader level changed (including mute/unmute)
    GainChanged {
        track_index: usize,
        gain: f32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Periodic progress sample
    PlaybackProgress {
        progress: f64,
        position_seconds: f64,
        duration_seconds: f64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl TransportEvent {
    /// Event name used for the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            TransportEvent::PlaybackStateChanged { .. } => "PlaybackStateChanged",
            TransportEvent::TracksLoaded { .. } => "TracksLoaded",
            TransportEvent::LoadFailed { .. } => "LoadFailed",
            TransportEvent::GainChanged { .. } => "GainChanged",
            TransportEvent::PlaybackProgress { .. } => "PlaybackProgress",
        }
    }
}

/// Broadcast bus for [`TransportEvent`]s
///
/// Cloning the bus shares the underlying channel.
///
/// ```
/// use stemdeck_common::events::{EventBus, PlaybackState, TransportEvent};
///
/// let bus = EventBus::new(16);
/// let mut rx = bus.subscribe();
///
/// bus.emit_lossy(TransportEvent::PlaybackStateChanged {
///     old_state: PlaybackState::Stopped,
///     new_state: PlaybackState::Playing,
///     position_seconds: 0.0,
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<TransportEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per receiver
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<TransportEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, returning the number of receivers it reached
    ///
    /// Returns `Err` if nobody is listening.
    pub fn emit(
        &self,
        event: TransportEvent,
    ) -> Result<usize, broadcast::error::SendError<TransportEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring the no-subscriber case
    pub fn emit_lossy(&self, event: TransportEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gain_event(track_index: usize) -> TransportEvent {
        TransportEvent::GainChanged {
            track_index,
            gain: 0.0,
            timestamp: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_eventbus_new() {
        let bus = EventBus::new(100);
        assert_eq!(bus.capacity(), 100);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_emit_without_subscribers_errors() {
        let bus = EventBus::new(10);
        assert!(bus.emit(gain_event(0)).is_err());
        // Lossy emission never panics
        bus.emit_lossy(gain_event(0));
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_event() {
        let bus = EventBus::new(10);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        assert_eq!(bus.emit(gain_event(3)).unwrap(), 2);

        for rx in [&mut rx1, &mut rx2] {
            match rx.recv().await.unwrap() {
                TransportEvent::GainChanged { track_index, .. } => assert_eq!(track_index, 3),
                other => panic!("Unexpected event: {:?}", other),
            }
        }
    }

    #[test]
    fn test_state_serializes_lowercase() {
        let json = serde_json::to_string(&PlaybackState::Paused).unwrap();
        assert_eq!(json, "\"paused\"");
        assert_eq!(PlaybackState::default(), PlaybackState::Stopped);
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = TransportEvent::LoadFailed {
            reason: "missing".to_string(),
            timestamp: chrono::Utc::now(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "LoadFailed");
        assert_eq!(value["reason"], "missing");
        assert_eq!(event.event_type(), "LoadFailed");
    }
}
