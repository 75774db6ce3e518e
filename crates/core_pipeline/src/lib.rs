//! Core pipeline for digitocr
//!
//! This crate reads short numeric codes (captchas, meter readings, ...)
//! from small noisy images: it decodes the image, cleans it up, and runs
//! a two-attempt digits-only recognition strategy with a fallback policy.

pub mod decoder;
pub mod error;
pub mod ocr;
pub mod pipeline;
pub mod preprocess;
pub mod types;

pub use decoder::{decode_image, decode_image_file};
pub use error::{DecodeError, EngineError};
pub use ocr::{recognize_digits, RecognitionEngine, TesseractEngine};
pub use pipeline::{read_digits, run_pipeline};
pub use preprocess::preprocess_image;
pub use types::*;
