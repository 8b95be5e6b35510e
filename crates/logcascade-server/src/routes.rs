//! HTTP routes and handlers

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use logcascade_core::Availability;
use serde::Serialize;
use serde_json::json;
use std::path::Path;
use std::time::Instant;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::state::AppState;
use crate::table::{classify_table, LogTable, TableError};

/// Attachment name of the classified table
pub const OUTPUT_FILENAME: &str = "classified_output.csv";

pub fn create_router(state: AppState) -> Router {
    let upload_limit = state.settings.max_upload_bytes;

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/classify/", post(classify_upload))
        .route("/classify", post(classify_upload))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(upload_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({ "status": "Log Classifier is running." }))
}

#[derive(Serialize)]
struct StrategyHealth {
    name: String,
    #[serde(flatten)]
    availability: Availability,
}

async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let strategies: Vec<StrategyHealth> = state
        .cascade
        .availability()
        .into_iter()
        .map(|(name, availability)| StrategyHealth { name, availability })
        .collect();

    Json(json!({
        "status": "ok",
        "strategies": strategies,
    }))
}

async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "Metrics are disabled").into_response(),
    }
}

/// Classify an uploaded CSV and return it with a `target_label` column
async fn classify_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let start = Instant::now();
    metrics::counter!("logcascade_uploads_total").increment(1);

    let contents = read_csv_upload(&mut multipart).await?;
    let mut table = LogTable::from_bytes(&contents)?;
    info!("Classifying uploaded table with {} rows", table.len());

    classify_table(&state.cascade, &mut table, false).await?;
    let body = table.to_csv_bytes()?;

    if let Some(dir) = &state.settings.output_dir {
        if let Err(e) = persist_output(dir, &body).await {
            warn!("Failed to write {}/output.csv: {}", dir.display(), e);
        }
    }

    info!(
        "Classified {} rows in {}ms",
        table.len(),
        start.elapsed().as_millis()
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", OUTPUT_FILENAME),
            ),
        ],
        body,
    )
        .into_response())
}

/// Contents of the `file` field; its name must end in `.csv`
async fn read_csv_upload(multipart: &mut Multipart) -> Result<Vec<u8>, AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        if !filename.ends_with(".csv") {
            return Err(AppError::InvalidRequest("File must be a CSV.".to_string()));
        }

        return Ok(field.bytes().await?.to_vec());
    }

    Err(AppError::InvalidRequest(
        "Multipart field 'file' is required.".to_string(),
    ))
}

async fn persist_output(dir: &Path, body: &[u8]) -> std::io::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(dir.join("output.csv"), body).await
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    InvalidRequest(String),
    Upload(MultipartError),
    ClassificationFailed(String),
    InternalError(String),
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::Upload(err)
    }
}

impl From<TableError> for AppError {
    fn from(err: TableError) -> Self {
        match err {
            TableError::MissingColumns | TableError::Parse(_) => {
                AppError::InvalidRequest(err.to_string())
            }
            TableError::LengthMismatch { .. } => AppError::ClassificationFailed(err.to_string()),
            TableError::Write(_) | TableError::Io(_) => AppError::InternalError(err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::InvalidRequest(msg) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": { "message": msg, "type": "invalid_request_error" } }),
            ),
            AppError::Upload(err) => (
                err.status(),
                json!({ "error": { "message": err.body_text(), "type": "invalid_request_error" } }),
            ),
            AppError::ClassificationFailed(detail) => {
                error!("Classification failed: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "error": {
                            "message": "Classification failed at runtime.",
                            "detail": detail,
                            "type": "classification_error",
                        }
                    }),
                )
            }
            AppError::InternalError(msg) => {
                error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": { "message": msg, "type": "internal_error" } }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
