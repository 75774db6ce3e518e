//! API error type
//!
//! Client input problems become 4xx (400 unless axum's extractor rejection
//! says otherwise), engine faults become 500s. All carry a
//! `{"detail": "..."}` body.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use core_pipeline::{DecodeError, EngineError};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid request body: {0}")]
    Body(#[from] JsonRejection),

    #[error("Invalid query string: {0}")]
    Query(#[from] QueryRejection),

    #[error("expected_length must be between 1 and {max}")]
    InvalidExpectedLength { max: usize },

    #[error("Error downloading image: {0}")]
    Download(#[source] reqwest::Error),

    #[error("Error reading image: {0}")]
    Decode(#[from] DecodeError),

    #[error("Error reading image: {0}")]
    Upload(String),

    #[error("OCR error: {0}")]
    Ocr(#[from] EngineError),

    #[error("OCR error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Body(rejection) => rejection.status(),
            ApiError::Query(rejection) => rejection.status(),
            ApiError::InvalidExpectedLength { .. }
            | ApiError::Download(_)
            | ApiError::Decode(_)
            | ApiError::Upload(_) => StatusCode::BAD_REQUEST,
            ApiError::Ocr(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = self.to_string();

        if status.is_server_error() {
            tracing::error!(%status, "{detail}");
        } else {
            tracing::warn!(%status, "{detail}");
        }

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
