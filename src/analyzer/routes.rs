//! HTTP routes for the analysis service
//!
//! Thin axum layer over the analysis routines in the parent module.
//! Decoding is CPU-bound, so handlers push batch work onto the blocking
//! pool; rayon parallelizes within a batch from there. Malformed JSON is
//! rejected by the `Json` extractor with a 4xx before a handler runs.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::sync::mpsc;
use tracing::info;

use super::wire::{
    AnalyzeRequest, AnalyzeResponse, ErrorBody, IndexBatchRequest, IndexBatchResponse,
    IndexRequest, ShutdownResponse,
};

#[derive(Clone)]
pub struct AppState {
    /// Signals the serve loop to begin graceful shutdown.
    pub shutdown: mpsc::Sender<()>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/index", post(index))
        .route("/index/batch", post(index_batch))
        .route("/analyze", post(analyze))
        .route("/shutdown", post(shutdown))
        .with_state(state)
}

async fn health() -> Response {
    Json(super::health_response()).into_response()
}

fn bad_request(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

fn internal_error(message: impl Into<String>) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

/// `POST /index`: one file (bare record) or a list (batch response).
async fn index(Json(request): Json<IndexRequest>) -> Response {
    if let Some(class_file) = request.class_file {
        let path = std::path::Path::new(&class_file);
        if !path.is_file() || !class_file.ends_with(".class") {
            return bad_request(format!("invalid class file: {}", class_file));
        }
        let result =
            match tokio::task::spawn_blocking(move || super::index_class_file(&class_file)).await {
                Ok(result) => result,
                Err(e) => return internal_error(e.to_string()),
            };
        if !result.success {
            return internal_error(result.error.unwrap_or_else(|| "indexing failed".into()));
        }
        return Json(result).into_response();
    }

    if let Some(class_files) = request.class_files {
        return run_index_batch(class_files).await;
    }

    bad_request("classFile is required")
}

/// `POST /index/batch`: per-file results, failures inline.
async fn index_batch(Json(request): Json<IndexBatchRequest>) -> Response {
    if request.class_files.is_empty() {
        return bad_request("classFiles array cannot be empty");
    }
    run_index_batch(request.class_files).await
}

async fn run_index_batch(class_files: Vec<String>) -> Response {
    info!(files = class_files.len(), "batch indexing class files");
    match tokio::task::spawn_blocking(move || super::index_class_files(&class_files)).await {
        Ok(results) => Json(IndexBatchResponse {
            success: true,
            results,
        })
        .into_response(),
        Err(e) => internal_error(e.to_string()),
    }
}

/// `POST /analyze`: grouped class records for the selected files.
async fn analyze(Json(request): Json<AnalyzeRequest>) -> Response {
    let files = match super::resolve_analyze_selection(&request) {
        Ok(files) => files,
        Err(message) => return bad_request(message),
    };
    info!(files = files.len(), "analyzing class files");

    let domains = request.domains;
    match tokio::task::spawn_blocking(move || super::analyze_class_files(&files, &domains)).await {
        Ok(classes) => Json(AnalyzeResponse {
            success: true,
            classes,
        })
        .into_response(),
        Err(e) => internal_error(e.to_string()),
    }
}

/// `POST /shutdown`: answer, then let the serve loop drain and exit.
async fn shutdown(State(state): State<AppState>) -> Response {
    info!("shutdown request received, stopping service");
    let _ = state.shutdown.try_send(());
    Json(ShutdownResponse {
        status: "shutting down".to_string(),
    })
    .into_response()
}
