//! # StemDeck Common Library
//!
//! Shared code for the StemDeck crates:
//! - Configuration loading (TOML bootstrap file + compiled defaults)
//! - Transport event types and the broadcast EventBus
//! - Sample-time conversions used by the playback engine
//! - Common error type

pub mod config;
pub mod error;
pub mod events;
pub mod timing;

pub use error::{Error, Result};
pub use events::{EventBus, PlaybackState, TransportEvent};
