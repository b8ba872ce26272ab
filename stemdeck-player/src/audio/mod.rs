//! Audio I/O: decoding, resampling and device output

pub mod cpal_graph;
pub mod decoder;
pub mod output;
pub mod resampler;
pub mod types;

pub use cpal_graph::CpalGraph;
pub use decoder::{DecodedAudio, StemDecoder};
pub use output::AudioOutput;
pub use resampler::Resampler;
pub use types::{AudioFrame, StemBuffer};
