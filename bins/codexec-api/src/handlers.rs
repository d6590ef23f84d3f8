// HTTP route handlers for the Codexec API

use axum::{
    extract::{Form, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use codexec_common::types::{ExecutionOutcome, ExecutionRequest, Language};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

use crate::metrics;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CallForm {
    pub code: String,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_language() -> String {
    Language::default().to_string()
}

impl CallForm {
    /// Submitted tag, with an empty field treated like a missing one
    fn language_tag(&self) -> String {
        if self.language.trim().is_empty() {
            default_language()
        } else {
            self.language.clone()
        }
    }
}

/// Run a request and record it; unknown tags share one metrics label
async fn run(state: &AppState, request: ExecutionRequest) -> ExecutionOutcome {
    let start = Instant::now();
    let outcome = state.engine.dispatch(&request).await;

    let label = Language::from_str(&request.language_tag())
        .map(|l| l.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    metrics::observe(&label, outcome.status(), start.elapsed());

    info!(
        request_id = %request.id,
        language = %label,
        status = outcome.status(),
        "Request served"
    );
    outcome
}

/// POST /code/call - Form submission, returns the normalized response value
pub async fn call_code(
    State(state): State<Arc<AppState>>,
    Form(form): Form<CallForm>,
) -> impl IntoResponse {
    let language = form.language_tag();
    let request = ExecutionRequest::new(form.code, Some(language.as_str()));
    let outcome = run(&state, request).await;
    (StatusCode::OK, Json(outcome.into_response()))
}

/// POST /code/execute - JSON submission, returns the tagged outcome
pub async fn execute_code(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ExecutionRequest>,
) -> impl IntoResponse {
    let outcome = run(&state, request).await;
    (StatusCode::OK, Json(outcome))
}

/// GET /status - Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /metrics - Prometheus scrape endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    match metrics::export() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to export metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("metrics unavailable: {}", e)).into_response()
        }
    }
}
