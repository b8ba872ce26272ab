//! # StemDeck Player Library (stemdeck-player)
//!
//! Synchronized multi-track stem playback.
//!
//! **Purpose:** Load a fixed set of equal-length stems, play/pause/stop them
//! as one, keep them sample-aligned, mix them through per-track faders and
//! report progress. An HTTP/SSE interface exposes the transport.
//!
//! **Architecture:** stems are decoded whole into RAM (symphonia + rubato),
//! summed on a mix bus and rendered by a cpal output stream whose frame
//! counter is the scheduling clock.

pub mod api;
pub mod audio;
pub mod config;
pub mod engine;
pub mod error;

pub use error::{Error, Result};
