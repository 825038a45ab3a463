// Health Handler
use axum::{
    extract::State,
    response::{IntoResponse, Json, Response},
};

use crate::proxy::server::AppState;

/// Health check handler
pub async fn health_check_handler(State(state): State<AppState>) -> Response {
    Json(serde_json::json!({
        "status": "ok",
        "started_at": state.started_at.to_rfc3339(),
        "targets": state.allowlist.len(),
    }))
    .into_response()
}
