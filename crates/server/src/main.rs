//! digitocr REST API server

mod error;
mod routes;

use anyhow::{Context, Result};
use clap::Parser;
use core_pipeline::TesseractEngine;
use routes::AppState;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "digitocr-server")]
#[command(about = "HTTP API for digits-only OCR", long_about = None, version)]
struct Args {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 8000)]
    port: u16,

    /// Timeout for downloading images passed by URL
    #[arg(long, default_value_t = 10)]
    fetch_timeout_secs: u64,

    /// Largest accepted request body
    #[arg(long, default_value_t = 10 * 1024 * 1024)]
    max_upload_bytes: usize,

    /// Tesseract data directory (defaults to the system tessdata)
    #[arg(long)]
    tessdata: Option<String>,

    /// Tesseract language
    #[arg(long, default_value = "eng")]
    lang: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let engine = TesseractEngine::new(args.tessdata.clone(), args.lang.clone());
    match engine.probe() {
        Ok(()) => tracing::info!(language = engine.language(), "Tesseract ready"),
        // Keep serving: /health stays up and OCR requests report the fault
        Err(e) => tracing::warn!("Tesseract unavailable: {e}"),
    }

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(args.fetch_timeout_secs))
        .build()
        .context("Failed to build HTTP client")?;

    let state = AppState {
        engine: Arc::new(engine),
        http,
    };
    let app = routes::router(state, args.max_upload_bytes);

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
