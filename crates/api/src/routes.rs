use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use extract::{ClaimExtractor, ClaimRecord, FallbackConfig};
use ingest::OcrEngine;
use query::{AnswerMatcher, AnswerSource};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::metrics::{Metrics, MetricsSnapshot, TimedOperation};
use crate::store::{ClaimStore, StoredEntry};

const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub struct AppState {
    pub fallback: FallbackConfig,
    pub persist: bool,
    pub extractor: ClaimExtractor,
    pub matcher: AnswerMatcher,
    pub ocr: Box<dyn OcrEngine>,
    pub store: ClaimStore,
    pub metrics: Arc<Metrics>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    documents: usize,
}

#[derive(Serialize)]
struct ExtractResponse {
    document_id: String,
    parsed: ClaimRecord,
}

#[derive(Deserialize)]
struct AskRequest {
    document_id: String,
    question: String,
}

#[derive(Serialize)]
struct AskResponse {
    answer: String,
}

#[derive(Serialize)]
struct DocumentList {
    documents: Vec<String>,
}

/// Handler failure rendered as `{"error": ...}` with a status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "document not found")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .route("/extract", post(extract_document))
        .route("/ask", post(ask_question))
        .route("/documents", get(list_documents))
        .route("/documents/:id", get(get_document).delete(delete_document))
        .route("/metrics", get(get_metrics))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        documents: state.store.len(),
    })
}

async fn extract_document(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ExtractResponse>), ApiError> {
    let result = extract_upload(&state, multipart).await;
    state.metrics.record_request(result.is_ok());
    result
}

async fn extract_upload(
    state: &AppState,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ExtractResponse>), ApiError> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed reading uploaded file: {}", e)))?;
        upload = Some((filename, bytes.to_vec()));
        break;
    }

    let Some((filename, bytes)) = upload else {
        return Err(ApiError::bad_request("Missing multipart field 'file'."));
    };
    if bytes.is_empty() {
        return Err(ApiError::bad_request("Uploaded file is empty."));
    }

    let text = state.ocr.recognize(&bytes, &filename).map_err(|e| {
        warn!(filename = %filename, error = %e, "OCR failed");
        ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, format!("OCR failed: {:#}", e))
    })?;
    if text.trim().is_empty() {
        return Err(ApiError::bad_request(
            "No text could be extracted from the uploaded file.",
        ));
    }

    let timer = TimedOperation::start();
    let parsed = state.extractor.extract(&text, &state.fallback);
    state.metrics.record_extract(timer.elapsed());

    let document_id = uuid::Uuid::new_v4().to_string();
    state
        .store
        .save(&document_id, StoredEntry::new(&filename, parsed.clone()), state.persist);
    info!(document_id = %document_id, filename = %filename, "Stored parsed claim");

    Ok((StatusCode::CREATED, Json(ExtractResponse { document_id, parsed })))
}

async fn ask_question(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    let Some(entry) = state.store.get(&req.document_id) else {
        state.metrics.record_request(false);
        return Err(ApiError::not_found());
    };

    let timer = TimedOperation::start();
    let answer = state.matcher.respond(&entry.parsed, &req.question, &state.fallback);
    let direct = matches!(answer.source, AnswerSource::Field(_));
    state.metrics.record_answer(timer.elapsed(), direct);
    state.metrics.record_request(true);

    Ok(Json(AskResponse { answer: answer.text }))
}

async fn list_documents(State(state): State<Arc<AppState>>) -> Json<DocumentList> {
    Json(DocumentList {
        documents: state.store.list(),
    })
}

async fn get_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<StoredEntry>, ApiError> {
    state.store.get(&id).map(Json).ok_or_else(ApiError::not_found)
}

async fn delete_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.store.delete(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found())
    }
}

async fn get_metrics(State(state): State<Arc<AppState>>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}
