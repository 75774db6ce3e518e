//! Decoder module for raw image bytes
//!
//! Turns downloaded, uploaded or on-disk bytes into a decoded raster.
//! Any format the `image` crate can sniff is accepted.

use crate::error::DecodeError;
use image::DynamicImage;
use std::path::Path;

/// Decode an in-memory image, guessing the format from its magic bytes
pub fn decode_image(data: &[u8]) -> Result<DynamicImage, DecodeError> {
    if data.is_empty() {
        return Err(DecodeError::Empty);
    }

    Ok(image::load_from_memory(data)?)
}

/// Read and decode an image file
pub fn decode_image_file(path: &Path) -> Result<DynamicImage, DecodeError> {
    let data = std::fs::read(path).map_err(|source| DecodeError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    decode_image(&data)
}
