use askama::Template;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use domains::DomainError;
use serde_json::{json, Value};
use tracing::error;

use crate::templates::{IndexTemplate, QuestionRow};
use crate::{ApiResult, AppState};

const INDEX_SIZE: i64 = 20;

pub async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok(body) => (
            [(CONTENT_TYPE, "application/openmetrics-text; version=1.0.0; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "metrics encoding failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Public landing page: the most recent non-sensitive questions.
pub async fn index(State(state): State<AppState>) -> ApiResult<Html<String>> {
    let recent = state.services.questions.recent_public(INDEX_SIZE).await?;
    let rows: Vec<QuestionRow> = recent.iter().map(QuestionRow::from).collect();

    let html = IndexTemplate { title: "Classboard", questions: &rows }
        .render()
        .map_err(|e| DomainError::internal(format!("template rendering failed: {e}")))?;
    Ok(Html(html))
}
