//! Pipeline orchestration
//!
//! Preprocesses the image once, then makes at most two recognition
//! attempts against it:
//!
//! 1. [`LINE_CONFIG`]: an exact-length read is returned immediately.
//! 2. [`WORD_CONFIG`]: same test, only reached if attempt 1 missed.
//! 3. Fallback: the longer of the two candidates (attempt 1 wins ties) is
//!    returned if it holds at least `expected_length` digits, otherwise
//!    the empty string. Over-long reads are returned untruncated.
//!
//! A missing reading is `Ok` with empty text; only engine faults are
//! errors.

use crate::error::EngineError;
use crate::ocr::{recognize_digits, RecognitionEngine};
use crate::preprocess::preprocess_image;
use crate::types::{Candidate, Reading, Resolution, LINE_CONFIG, WORD_CONFIG};
use image::{DynamicImage, GrayImage};
use tracing::debug;

/// Read a digit string from a decoded image
///
/// Returns the digits, or `""` when nothing reasonable was read.
pub fn run_pipeline<E>(
    engine: &E,
    image: &DynamicImage,
    expected_length: usize,
) -> Result<String, EngineError>
where
    E: RecognitionEngine + ?Sized,
{
    read_digits(engine, image, expected_length).map(|reading| reading.text)
}

/// Like [`run_pipeline`], but also reports which attempt decided the result
pub fn read_digits<E>(
    engine: &E,
    image: &DynamicImage,
    expected_length: usize,
) -> Result<Reading, EngineError>
where
    E: RecognitionEngine + ?Sized,
{
    let prepared = preprocess_image(image);
    read_preprocessed(engine, &prepared, expected_length)
}

/// Run the attempt sequence on an already preprocessed image
pub fn read_preprocessed<E>(
    engine: &E,
    prepared: &GrayImage,
    expected_length: usize,
) -> Result<Reading, EngineError>
where
    E: RecognitionEngine + ?Sized,
{
    let line = recognize_digits(engine, prepared, &LINE_CONFIG)?;
    if line.len() == expected_length {
        return Ok(resolved(Reading::exact(line, LINE_CONFIG), expected_length));
    }

    let word = recognize_digits(engine, prepared, &WORD_CONFIG)?;
    if word.len() == expected_length {
        return Ok(resolved(Reading::exact(word, WORD_CONFIG), expected_length));
    }

    Ok(resolved(
        select_fallback(line, word, expected_length),
        expected_length,
    ))
}

/// Pick between two candidates that both missed the expected length
///
/// The longer one wins and the line candidate wins a tie. A winner shorter
/// than `expected_length` is discarded in favour of [`Reading::no_match`].
pub fn select_fallback(line: Candidate, word: Candidate, expected_length: usize) -> Reading {
    let (best, config) = if word.len() > line.len() {
        (word, WORD_CONFIG)
    } else {
        (line, LINE_CONFIG)
    };

    if best.len() < expected_length {
        Reading::no_match()
    } else {
        Reading::fallback(best, config)
    }
}

fn resolved(reading: Reading, expected_length: usize) -> Reading {
    match reading.resolution {
        Resolution::Exact { config } | Resolution::Fallback { config } => debug!(
            attempt = config.name,
            exact = matches!(reading.resolution, Resolution::Exact { .. }),
            length = reading.text.len(),
            expected_length,
            "pipeline resolved"
        ),
        Resolution::NoMatch => debug!(expected_length, "pipeline found no reasonable reading"),
    }
    reading
}
