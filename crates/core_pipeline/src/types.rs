//! Core types for the digit recognition pipeline
//!
//! This module defines the recognition configurations handed to the
//! engine, the digit-only candidates produced by each attempt, and the
//! response shape surfaced to callers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of digits expected when the caller does not say (captcha length)
pub const DEFAULT_EXPECTED_LENGTH: usize = 4;

/// Characters the engine is allowed to emit
pub const DIGIT_WHITELIST: &str = "0123456789";

/// How the engine should spatially group recognized text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageSegMode {
    /// Treat the image as a single text line (PSM 7)
    SingleLine,
    /// Treat the image as a single word (PSM 8)
    SingleWord,
}

impl PageSegMode {
    /// Numeric Tesseract page segmentation mode
    pub fn as_psm(self) -> u8 {
        match self {
            PageSegMode::SingleLine => 7,
            PageSegMode::SingleWord => 8,
        }
    }
}

/// Which recognizer the engine runs
///
/// Mirrors Tesseract's full OEM range so a config can name any of them;
/// the leptess engine only initializes with `Default` and reports the
/// others as a configuration fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineMode {
    /// Legacy pattern matcher only (OEM 0)
    LegacyOnly,
    /// LSTM network only (OEM 1)
    LstmOnly,
    /// Legacy and LSTM combined (OEM 2)
    LegacyAndLstm,
    /// Whatever the installed traineddata supports (OEM 3)
    Default,
}

impl EngineMode {
    /// Numeric Tesseract OCR engine mode
    pub fn as_oem(self) -> u8 {
        match self {
            EngineMode::LegacyOnly => 0,
            EngineMode::LstmOnly => 1,
            EngineMode::LegacyAndLstm => 2,
            EngineMode::Default => 3,
        }
    }
}

/// Immutable descriptor for one recognition attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecognitionConfig {
    /// Short label used in logs
    pub name: &'static str,
    pub page_seg_mode: PageSegMode,
    pub engine_mode: EngineMode,
    pub char_whitelist: &'static str,
}

/// Treat the input as one line of digits; first attempt
pub const LINE_CONFIG: RecognitionConfig = RecognitionConfig {
    name: "line",
    page_seg_mode: PageSegMode::SingleLine,
    engine_mode: EngineMode::Default,
    char_whitelist: DIGIT_WHITELIST,
};

/// Treat the input as a single word; second attempt
pub const WORD_CONFIG: RecognitionConfig = RecognitionConfig {
    name: "word",
    page_seg_mode: PageSegMode::SingleWord,
    engine_mode: EngineMode::Default,
    char_whitelist: DIGIT_WHITELIST,
};

impl fmt::Display for RecognitionConfig {
    /// Renders the equivalent `tesseract` command-line flags
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "--psm {} --oem {} -c tessedit_char_whitelist={}",
            self.page_seg_mode.as_psm(),
            self.engine_mode.as_oem(),
            self.char_whitelist
        )
    }
}

/// Digit-only string produced by one recognition attempt
///
/// The only way to build a candidate is through [`Candidate::from_raw`],
/// so every candidate holds ASCII digits and nothing else.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Candidate(String);

impl Candidate {
    /// Keep only the characters '0'-'9' of the raw engine output, in order
    pub fn from_raw(raw: &str) -> Self {
        Self(raw.chars().filter(char::is_ascii_digit).collect())
    }

    /// Number of digits
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How the pipeline arrived at its final string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// An attempt produced exactly the expected number of digits
    Exact { config: RecognitionConfig },
    /// No exact match; the longest candidate was at least as long as expected
    Fallback { config: RecognitionConfig },
    /// Nothing reasonable was read; the text is empty
    NoMatch,
}

/// Final output of one pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reading {
    pub text: String,
    pub resolution: Resolution,
}

impl Reading {
    pub fn exact(candidate: Candidate, config: RecognitionConfig) -> Self {
        Self {
            text: candidate.into_string(),
            resolution: Resolution::Exact { config },
        }
    }

    pub fn fallback(candidate: Candidate, config: RecognitionConfig) -> Self {
        Self {
            text: candidate.into_string(),
            resolution: Resolution::Fallback { config },
        }
    }

    pub fn no_match() -> Self {
        Self {
            text: String::new(),
            resolution: Resolution::NoMatch,
        }
    }
}

/// Where the image of a response came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Fetched by the service, e.g. `"source": "url"`
    Source(String),
    /// Uploaded or read from disk, with the client-supplied name if any
    Filename(Option<String>),
}

impl Origin {
    pub fn url() -> Self {
        Origin::Source("url".to_string())
    }
}

/// Response object surfaced to API and CLI callers
///
/// `length` lets callers tell an exact match (`length == expected_length`)
/// from a fallback read (non-zero, different length) and from total
/// failure (`length == 0`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrResponse {
    pub text: String,
    pub length: usize,
    pub expected_length: usize,
    #[serde(flatten)]
    pub origin: Origin,
}

impl OcrResponse {
    pub fn new(text: String, expected_length: usize, origin: Origin) -> Self {
        Self {
            length: text.len(),
            text,
            expected_length,
            origin,
        }
    }

    pub fn is_exact_match(&self) -> bool {
        self.length == self.expected_length
    }
}
