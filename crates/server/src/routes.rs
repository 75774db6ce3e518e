//! HTTP handlers
//!
//! `GET /health`, `POST /ocr/url` (JSON body) and `POST /ocr/file`
//! (multipart upload). Decoding happens here, before the pipeline runs;
//! the pipeline itself runs on the blocking pool.

use crate::error::ApiError;
use axum::{
    extract::{
        rejection::{JsonRejection, MultipartRejection, QueryRejection},
        DefaultBodyLimit, Multipart, Query, State,
    },
    response::Json,
    routing::{get, post},
    Router,
};
use core_pipeline::{
    decode_image, read_digits, OcrResponse, Origin, RecognitionEngine, Resolution,
    DEFAULT_EXPECTED_LENGTH,
};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

/// Upper bound accepted for `expected_length`
pub const MAX_EXPECTED_LENGTH: usize = 64;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<dyn RecognitionEngine>,
    pub http: reqwest::Client,
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ocr/url", post(ocr_url))
        .route("/ocr/file", post(ocr_file))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

fn default_expected_length() -> i64 {
    DEFAULT_EXPECTED_LENGTH as i64
}

#[derive(Debug, Deserialize)]
pub struct OcrUrlRequest {
    pub url: String,
    #[serde(default = "default_expected_length")]
    pub expected_length: i64,
}

#[derive(Debug, Deserialize)]
pub struct OcrFileQuery {
    #[serde(default = "default_expected_length")]
    pub expected_length: i64,
}

async fn ocr_url(
    State(state): State<AppState>,
    payload: Result<Json<OcrUrlRequest>, JsonRejection>,
) -> Result<Json<OcrResponse>, ApiError> {
    let Json(payload) = payload?;
    let expected_length = validate_expected_length(payload.expected_length)?;
    let request_id = Uuid::new_v4();
    info!(%request_id, url = %payload.url, expected_length, "OCR request by URL");

    let bytes = fetch_image(&state.http, &payload.url).await?;
    let image = decode_image(&bytes)?;
    let text = run_pipeline_blocking(state.engine.clone(), image, expected_length).await?;

    info!(%request_id, length = text.len(), "OCR request finished");
    Ok(Json(OcrResponse::new(text, expected_length, Origin::url())))
}

async fn ocr_file(
    State(state): State<AppState>,
    query: Result<Query<OcrFileQuery>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<OcrResponse>, ApiError> {
    let Query(query) = query?;
    let mut multipart = multipart.map_err(|e| ApiError::Upload(e.to_string()))?;
    let expected_length = validate_expected_length(query.expected_length)?;
    let request_id = Uuid::new_v4();

    let (filename, bytes) = read_file_field(&mut multipart).await?;
    info!(
        %request_id,
        filename = ?filename,
        size = bytes.len(),
        expected_length,
        "OCR request by upload"
    );

    let image = decode_image(&bytes)?;
    let text = run_pipeline_blocking(state.engine.clone(), image, expected_length).await?;

    info!(%request_id, length = text.len(), "OCR request finished");
    Ok(Json(OcrResponse::new(
        text,
        expected_length,
        Origin::Filename(filename),
    )))
}

fn validate_expected_length(value: i64) -> Result<usize, ApiError> {
    match usize::try_from(value) {
        Ok(n) if (1..=MAX_EXPECTED_LENGTH).contains(&n) => Ok(n),
        _ => Err(ApiError::InvalidExpectedLength {
            max: MAX_EXPECTED_LENGTH,
        }),
    }
}

async fn fetch_image(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, ApiError> {
    let response = client
        .get(url)
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .map_err(ApiError::Download)?;

    let bytes = response.bytes().await.map_err(ApiError::Download)?;
    Ok(bytes.to_vec())
}

async fn read_file_field(
    multipart: &mut Multipart,
) -> Result<(Option<String>, Vec<u8>), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Upload(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().map(str::to_owned);
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::Upload(e.to_string()))?;
        return Ok((filename, data.to_vec()));
    }

    Err(ApiError::Upload("missing multipart field `file`".to_string()))
}

async fn run_pipeline_blocking(
    engine: Arc<dyn RecognitionEngine>,
    image: DynamicImage,
    expected_length: usize,
) -> Result<String, ApiError> {
    let reading = tokio::task::spawn_blocking(move || {
        read_digits(engine.as_ref(), &image, expected_length)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("OCR task failed: {e}")))??;

    if let Resolution::Fallback { config } = reading.resolution {
        info!(
            attempt = config.name,
            length = reading.text.len(),
            expected_length,
            "no exact match, returning longest read"
        );
    }

    Ok(reading.text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header::CONTENT_TYPE, Request, StatusCode},
        response::Response,
    };
    use core_pipeline::{EngineError, RecognitionConfig};
    use image::{GrayImage, ImageFormat, Luma};
    use serde_json::Value;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    const BOUNDARY: &str = "digitocr-test-boundary";

    /// Answers every attempt with the same text and counts calls
    struct FixedEngine {
        text: &'static str,
        calls: Arc<AtomicUsize>,
    }

    impl RecognitionEngine for FixedEngine {
        fn recognize(
            &self,
            _image: &GrayImage,
            _config: &RecognitionConfig,
        ) -> Result<String, EngineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.text.to_string())
        }
    }

    struct FaultyEngine;

    impl RecognitionEngine for FaultyEngine {
        fn recognize(
            &self,
            _image: &GrayImage,
            _config: &RecognitionConfig,
        ) -> Result<String, EngineError> {
            Err(EngineError::Init("tessdata missing".to_string()))
        }
    }

    fn app(engine: impl RecognitionEngine + 'static) -> Router {
        let state = AppState {
            engine: Arc::new(engine),
            http: reqwest::Client::builder().no_proxy().build().unwrap(),
        };
        router(state, 1024 * 1024)
    }

    fn fixed(text: &'static str) -> (Router, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let engine = FixedEngine {
            text,
            calls: calls.clone(),
        };
        (app(engine), calls)
    }

    fn png_bytes() -> Vec<u8> {
        let img = GrayImage::from_fn(16, 8, |x, _| Luma([if x % 4 == 0 { 0u8 } else { 255u8 }]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn upload(uri: &str, field: &str, data: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{field}\"; filename=\"captcha.png\"\r\n\
             Content-Type: image/png\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn json_request(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = fixed("");
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_file_exact_match() {
        let (app, calls) = fixed("1234");
        let response = app
            .oneshot(upload("/ocr/file", "file", &png_bytes()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["text"], "1234");
        assert_eq!(body["length"], 4);
        assert_eq!(body["expected_length"], 4);
        assert_eq!(body["filename"], "captcha.png");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_file_custom_expected_length() {
        let (app, _) = fixed("12345");
        let response = app
            .oneshot(upload("/ocr/file?expected_length=5", "file", &png_bytes()))
            .await
            .unwrap();

        let body = json_body(response).await;
        assert_eq!(body["text"], "12345");
        assert_eq!(body["expected_length"], 5);
    }

    #[tokio::test]
    async fn test_file_no_match_is_empty_text() {
        let (app, calls) = fixed("12");
        let response = app
            .oneshot(upload("/ocr/file", "file", &png_bytes()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["text"], "");
        assert_eq!(body["length"], 0);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_file_undecodable_bytes_skip_engine() {
        let (app, calls) = fixed("1234");
        let response = app
            .oneshot(upload("/ocr/file", "file", b"not an image"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["detail"]
            .as_str()
            .unwrap()
            .starts_with("Error reading image"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_file_missing_field() {
        let (app, _) = fixed("1234");
        let response = app
            .oneshot(upload("/ocr/file", "image", &png_bytes()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_file_engine_fault_is_server_error() {
        let response = app(FaultyEngine)
            .oneshot(upload("/ocr/file", "file", &png_bytes()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert!(body["detail"].as_str().unwrap().starts_with("OCR error"));
    }

    #[tokio::test]
    async fn test_file_rejects_zero_expected_length() {
        let (app, calls) = fixed("");
        let response = app
            .oneshot(upload("/ocr/file?expected_length=0", "file", &png_bytes()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_url_download_failure() {
        let (app, calls) = fixed("1234");
        let response = app
            .oneshot(json_request(
                "/ocr/url",
                serde_json::json!({ "url": "not a url" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["detail"]
            .as_str()
            .unwrap()
            .starts_with("Error downloading image"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_url_rejects_negative_expected_length() {
        let (app, _) = fixed("1234");
        let response = app
            .oneshot(json_request(
                "/ocr/url",
                serde_json::json!({ "url": "http://localhost/x.png", "expected_length": -3 }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["detail"], "expected_length must be between 1 and 64");
    }

    /// Serve a decodable PNG, an undecodable body and (by default) 404s
    async fn serve_fixtures() -> String {
        let fixtures = Router::new()
            .route(
                "/captcha.png",
                get(|| async { ([(CONTENT_TYPE, "image/png")], png_bytes()) }),
            )
            .route("/garbage.png", get(|| async { "definitely not an image" }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, fixtures).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_url_exact_match() {
        let base = serve_fixtures().await;
        let (app, calls) = fixed("4321");
        let response = app
            .oneshot(json_request(
                "/ocr/url",
                serde_json::json!({ "url": format!("{base}/captcha.png") }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["text"], "4321");
        assert_eq!(body["length"], 4);
        assert_eq!(body["expected_length"], 4);
        assert_eq!(body["source"], "url");
        assert!(body.get("filename").is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_url_undecodable_download_skips_engine() {
        let base = serve_fixtures().await;
        let (app, calls) = fixed("4321");
        let response = app
            .oneshot(json_request(
                "/ocr/url",
                serde_json::json!({ "url": format!("{base}/garbage.png") }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["detail"]
            .as_str()
            .unwrap()
            .starts_with("Error reading image"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_url_not_found_is_download_error() {
        let base = serve_fixtures().await;
        let (app, calls) = fixed("4321");
        let response = app
            .oneshot(json_request(
                "/ocr/url",
                serde_json::json!({ "url": format!("{base}/missing.png"), "expected_length": 4 }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        let detail = body["detail"].as_str().unwrap();
        assert!(detail.starts_with("Error downloading image"));
        assert!(detail.contains("404"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_url_malformed_json_has_detail() {
        let (app, calls) = fixed("4321");
        let request = Request::builder()
            .method("POST")
            .uri("/ocr/url")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from("{\"url\":"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["detail"]
            .as_str()
            .unwrap()
            .starts_with("Invalid request body"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_url_missing_field_has_detail() {
        let (app, _) = fixed("4321");
        let response = app
            .oneshot(json_request(
                "/ocr/url",
                serde_json::json!({ "expected_length": 4 }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = json_body(response).await;
        assert!(body["detail"].as_str().unwrap().contains("url"));
    }

    #[tokio::test]
    async fn test_file_non_numeric_expected_length_has_detail() {
        let (app, calls) = fixed("1234");
        let response = app
            .oneshot(upload("/ocr/file?expected_length=abc", "file", &png_bytes()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["detail"]
            .as_str()
            .unwrap()
            .starts_with("Invalid query string"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_file_without_multipart_body_has_detail() {
        let (app, _) = fixed("1234");
        let response = app
            .oneshot(json_request("/ocr/file", serde_json::json!({})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["detail"]
            .as_str()
            .unwrap()
            .starts_with("Error reading image"));
    }

    #[test]
    fn test_validate_expected_length_bounds() {
        assert_eq!(validate_expected_length(1).unwrap(), 1);
        assert_eq!(validate_expected_length(64).unwrap(), 64);
        assert!(validate_expected_length(65).is_err());
        assert!(validate_expected_length(0).is_err());
        assert!(validate_expected_length(-1).is_err());
    }
}
