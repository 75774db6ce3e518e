//! digitocr CLI
//!
//! Command-line interface for reading short digit codes from images
//!
//! Copyright (c) 2025 Michael A Wright

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use core_pipeline::{
    decode_image_file, preprocess_image, read_digits, OcrResponse, Origin, Resolution,
    TesseractEngine, DEFAULT_EXPECTED_LENGTH,
};
use std::path::PathBuf;
use tracing::{debug, info};

#[allow(dead_code)]
mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\nhost:   ",
    env!("BUILT_HOST"),
    "\ncommit: ",
    env!("BUILT_GIT_COMMIT_HASH"),
    "\nbuilt:  ",
    env!("BUILT_TIME_UTC"),
);

#[derive(Parser)]
#[command(name = "digitocr")]
#[command(about = "Digits-only OCR for captchas and other short numeric codes", long_about = None)]
#[command(version, long_version = LONG_VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read the digit string from an image file and print it as JSON
    Read {
        /// Image file (PNG, JPEG, GIF, BMP, ...)
        image: PathBuf,

        /// Number of digits the image is expected to contain
        #[arg(short, long, default_value_t = DEFAULT_EXPECTED_LENGTH)]
        expected_length: usize,

        /// Tesseract data directory (defaults to the system tessdata)
        #[arg(long)]
        tessdata: Option<String>,

        /// Tesseract language
        #[arg(long, default_value = "eng")]
        lang: String,
    },

    /// Write the preprocessed grayscale image, for inspecting what the engine sees
    Preprocess {
        /// Image file
        image: PathBuf,

        /// Output PNG file
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    debug!(
        version = built_info::PKG_VERSION,
        target = built_info::TARGET,
        profile = built_info::PROFILE,
        "digitocr starting"
    );

    let cli = Cli::parse();

    match cli.command {
        Commands::Read {
            image,
            expected_length,
            tessdata,
            lang,
        } => {
            let decoded = decode_image_file(&image)
                .with_context(|| format!("Error reading image {}", image.display()))?;

            let engine = TesseractEngine::new(tessdata, lang);
            let reading = read_digits(&engine, &decoded, expected_length).context("OCR error")?;

            match reading.resolution {
                Resolution::Exact { config } => info!(attempt = config.name, "exact match"),
                Resolution::Fallback { config } => {
                    info!(attempt = config.name, "no exact match, using longest read")
                }
                Resolution::NoMatch => info!("no reasonable reading"),
            }

            let response = OcrResponse::new(
                reading.text,
                expected_length,
                Origin::Filename(Some(image.display().to_string())),
            );
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Commands::Preprocess { image, output } => {
            let decoded = decode_image_file(&image)
                .with_context(|| format!("Error reading image {}", image.display()))?;

            preprocess_image(&decoded)
                .save_with_format(&output, image::ImageFormat::Png)
                .with_context(|| format!("Failed to write {}", output.display()))?;

            info!("Wrote preprocessed image to {}", output.display());
            Ok(())
        }
    }
}
