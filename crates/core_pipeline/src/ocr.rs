//! OCR module
//!
//! Defines the recognition engine seam and the adapter that turns raw
//! engine output into digit-only candidates. The production engine is
//! Tesseract (via leptess).

use crate::error::EngineError;
use crate::types::{Candidate, EngineMode, RecognitionConfig};
use image::GrayImage;
use leptess::{LepTess, Variable};
use tracing::debug;

/// A text recognition engine
///
/// `recognize` returns the raw text exactly as the engine produced it.
/// "No text" is an empty or garbage string, never an error; errors are
/// reserved for engine faults. Implementations are shared across
/// concurrent requests and must be reentrant.
pub trait RecognitionEngine: Send + Sync {
    fn recognize(&self, image: &GrayImage, config: &RecognitionConfig)
        -> Result<String, EngineError>;
}

/// Run one recognition attempt and keep only the digits
///
/// Engine faults are passed through untouched.
pub fn recognize_digits<E>(
    engine: &E,
    image: &GrayImage,
    config: &RecognitionConfig,
) -> Result<Candidate, EngineError>
where
    E: RecognitionEngine + ?Sized,
{
    let raw = engine.recognize(image, config)?;
    let candidate = Candidate::from_raw(&raw);

    debug!(
        attempt = config.name,
        flags = %config,
        raw = ?raw,
        digits = %candidate,
        "recognition attempt finished"
    );

    Ok(candidate)
}

/// Tesseract-backed engine
///
/// Each call initializes its own Tesseract handle, so one engine value can
/// be shared between threads without locking.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    data_path: Option<String>,
    language: String,
}

impl TesseractEngine {
    /// `data_path` is the tessdata directory; `None` uses Tesseract's default
    pub fn new(data_path: Option<String>, language: impl Into<String>) -> Self {
        Self {
            data_path,
            language: language.into(),
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Check that Tesseract and the language data can be loaded
    pub fn probe(&self) -> Result<(), EngineError> {
        self.open().map(|_| ())
    }

    fn open(&self) -> Result<LepTess, EngineError> {
        LepTess::new(self.data_path.as_deref(), &self.language).map_err(|e| {
            EngineError::Init(format!(
                "{e} (language {:?}). Is Tesseract installed?",
                self.language
            ))
        })
    }
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new(None, "eng")
    }
}

impl RecognitionEngine for TesseractEngine {
    fn recognize(
        &self,
        image: &GrayImage,
        config: &RecognitionConfig,
    ) -> Result<String, EngineError> {
        // leptess always initializes with the default engine mode
        if config.engine_mode != EngineMode::Default {
            return Err(EngineError::Configure(format!(
                "engine mode {} is not available, only {} is",
                config.engine_mode.as_oem(),
                EngineMode::Default.as_oem()
            )));
        }

        let mut tesseract = self.open()?;

        let psm = config.page_seg_mode.as_psm().to_string();
        set_variable(&mut tesseract, Variable::TesseditPagesegMode, &psm)?;
        set_variable(
            &mut tesseract,
            Variable::TesseditCharWhitelist,
            config.char_whitelist,
        )?;

        // leptess wants an encoded image (PNG, JPEG, ...) rather than raw samples
        let mut png_bytes = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut png_bytes);
        image
            .write_to(&mut cursor, image::ImageFormat::Png)
            .map_err(|e| EngineError::Image(format!("failed to encode image as PNG: {e}")))?;

        tesseract
            .set_image_from_mem(&png_bytes)
            .map_err(|e| EngineError::Image(e.to_string()))?;

        tesseract
            .get_utf8_text()
            .map_err(|e| EngineError::Recognize(e.to_string()))
    }
}

fn set_variable(tesseract: &mut LepTess, name: Variable, value: &str) -> Result<(), EngineError> {
    tesseract
        .set_variable(name, value)
        .map_err(|_| EngineError::Configure(format!("tesseract rejected setting {value:?}")))
}
