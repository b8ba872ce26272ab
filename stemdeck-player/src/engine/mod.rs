//! Playback engine
//!
//! Tracks render into a shared [`MixBus`]; the [`Transport`] schedules
//! them against the [`AudioGraph`] clock and tracks position on a
//! [`PlaybackClock`].

pub mod clock;
pub mod graph;
pub mod mix_bus;
pub mod progress;
pub mod resolver;
pub mod track;
pub mod transport;

pub use clock::{ManualClock, PlaybackClock, SystemClock, WallClock};
pub use graph::{AudioGraph, OfflineGraph};
pub use mix_bus::MixBus;
pub use progress::ProgressReport;
pub use resolver::{AssetResolver, BundleResolver};
pub use track::Track;
pub use transport::{TrackSnapshot, Transport};
