//! Error types for stemdeck-player
//!
//! Every fallible engine operation reports one of these variants. The HTTP
//! layer maps them onto status codes in `api::handlers`.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for stemdeck-player
#[derive(Error, Debug)]
pub enum Error {
    /// Manifest file name did not resolve to a file under the asset root
    #[error("Resource not found: {filename}")]
    ResourceNotFound { filename: String },

    /// Source exists but could not be opened or decoded
    #[error("Audio decode error for {}: {message}", path.display())]
    Decode { path: PathBuf, message: String },

    /// Sample-rate conversion to the graph rate failed
    #[error("Resample error: {0}")]
    Resample(String),

    /// The audio graph refused to start
    #[error("Audio graph failed to start: {0}")]
    GraphStart(String),

    /// A track rejected its start instruction
    #[error("Failed to schedule track '{track}': {message}")]
    Schedule { track: String, message: String },

    /// Track index outside the loaded track list
    #[error("Track not found: {0}")]
    TrackNotFound(usize),

    /// Operation not allowed in the current transport state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Invalid request parameter
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Audio output device errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// Invalid engine settings
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration and other shared-library errors
    #[error(transparent)]
    Common(#[from] stemdeck_common::Error),
}

/// Convenience Result type using stemdeck-player Error
pub type Result<T> = std::result::Result<T, Error>;
