//! HTTP surface: route table and response formatting.

use crate::health;
use axum::extract::{DefaultBodyLimit, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bulk_insert::{EngineConfig, RecordStore, RunCoordinator, RunError, RunReport};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

/// Maximum accepted request body.
pub const BODY_LIMIT_BYTES: usize = 1024 * 1024;

/// Shared per-process state: the resolved configuration and the pooled store.
pub struct AppState<S: RecordStore> {
    pub config: Arc<EngineConfig>,
    pub store: Arc<S>,
}

impl<S: RecordStore> AppState<S> {
    pub fn new(config: EngineConfig, store: Arc<S>) -> Self {
        Self {
            config: Arc::new(config),
            store,
        }
    }
}

impl<S: RecordStore> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            store: Arc::clone(&self.store),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct InsertParams {
    /// `json` for a structured report; plain text otherwise.
    pub format: Option<String>,
}

impl InsertParams {
    fn wants_json(&self) -> bool {
        self.format.as_deref() == Some("json")
    }
}

pub fn router<S: RecordStore>(state: AppState<S>) -> Router {
    Router::new()
        .route("/hello", get(hello))
        .route("/health", get(health_check))
        .route("/insert-million", post(insert_million::<S>))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .with_state(state)
}

async fn hello() -> &'static str {
    "Hello World"
}

async fn health_check() -> Response {
    match tokio::task::spawn_blocking(health::collect).await {
        Ok(report) => Json(report).into_response(),
        Err(e) => {
            error!("Health collection failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn insert_million<S: RecordStore>(
    State(state): State<AppState<S>>,
    Query(params): Query<InsertParams>,
) -> Response {
    info!(
        "Insertion requested: {} records into '{}'",
        state.config.total_records, state.config.table
    );

    let config = EngineConfig::clone(&state.config);
    let mut coordinator = RunCoordinator::new(config, Arc::clone(&state.store));
    let result = coordinator.run().await;

    match (result, params.wants_json()) {
        (Ok(report), true) => {
            let status = report_status(&report);
            (status, Json(report)).into_response()
        }
        (Ok(report), false) => {
            let status = report_status(&report);
            (status, report_text(&report)).into_response()
        }
        (Err(e), true) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": run_error_text(&e) })),
        )
            .into_response(),
        (Err(e), false) => (StatusCode::INTERNAL_SERVER_ERROR, run_error_text(&e)).into_response(),
    }
}

fn report_status(report: &RunReport) -> StatusCode {
    if report.is_success() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

/// Plain-text body for a run that reached verification.
pub fn report_text(report: &RunReport) -> String {
    if report.is_success() {
        return format!("Insertion complete. {}", report.summary());
    }

    let outcome = &report.outcome;
    let cause = outcome
        .first_error
        .as_ref()
        .map(|e| e.to_string())
        .unwrap_or_else(|| "unknown failure".to_string());
    format!(
        "Error executing batch: {}. {}/{} ranges succeeded, {} failed, {} not attempted. {}",
        cause,
        outcome.ranges_succeeded,
        outcome.ranges_planned,
        outcome.ranges_failed,
        outcome.ranges_unclaimed,
        report.summary()
    )
}

/// Plain-text body for a run that ended before a report could be produced.
pub fn run_error_text(err: &RunError) -> String {
    match err {
        RunError::Verification {
            outcome: Some(outcome),
            ..
        } => format!(
            "{} (insertion phase {}: {}/{} ranges succeeded, {} rows written)",
            err,
            if outcome.is_success() {
                "completed"
            } else {
                "failed"
            },
            outcome.ranges_succeeded,
            outcome.ranges_planned,
            outcome.rows_written
        ),
        _ => err.to_string(),
    }
}
