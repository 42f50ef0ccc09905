// src/api.rs
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::aggregate::Aggregator;
use crate::clock::Clock;
use crate::error::AggregatorError;
use crate::export::{attachment_filename, format_workbook, ExportMetadata, XLSX_MIME};

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    pub clock: Arc<dyn Clock>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/combined-jobs", get(combined_jobs))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(serde::Serialize)]
struct ErrorBody {
    success: bool,
    message: &'static str,
    error: String,
}

async fn combined_jobs(State(state): State<AppState>) -> Response {
    match build_export(&state).await {
        Ok((filename, buffer)) => (
            [
                (header::CONTENT_TYPE, XLSX_MIME.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{filename}\""),
                ),
            ],
            buffer,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "combined-jobs export failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    success: false,
                    message: "Failed to fetch or generate Excel file",
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

async fn build_export(state: &AppState) -> Result<(String, Vec<u8>), AggregatorError> {
    let outcome = state.aggregator.aggregate().await?;
    let now = state.clock.now();
    let meta = ExportMetadata {
        credential: outcome.credential,
        generated_at: now,
        sources: outcome.sources,
    };
    let records = outcome.records;

    // CPU-bound.
    let buffer = tokio::task::spawn_blocking(move || format_workbook(&records, &meta))
        .await
        .map_err(|e| AggregatorError::Formatting(format!("export task failed: {e}")))??;

    Ok((attachment_filename(now.date_naive()), buffer))
}
