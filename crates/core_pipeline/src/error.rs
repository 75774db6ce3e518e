//! Error taxonomy for the pipeline
//!
//! Decode errors are client faults raised before the pipeline runs.
//! Engine errors are server-side faults raised by the recognition engine
//! and propagated unchanged. "No digits found" is not an error at all.

use std::path::PathBuf;
use thiserror::Error;

/// Input bytes could not be turned into an image
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("image data is empty")]
    Empty,

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot identify image data: {0}")]
    Image(#[from] image::ImageError),
}

/// The recognition engine itself failed
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to initialize recognition engine: {0}")]
    Init(String),

    #[error("failed to configure recognition engine: {0}")]
    Configure(String),

    #[error("engine could not load image: {0}")]
    Image(String),

    #[error("recognition failed: {0}")]
    Recognize(String),
}
