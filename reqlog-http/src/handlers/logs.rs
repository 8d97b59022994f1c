use crate::server::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use tracing::{error, warn};

/// `GET /logs` — stored entries as a JSON array, oldest first.
pub async fn list_logs(State(state): State<AppState>) -> Response {
    let reader = state.reader.clone();
    match tokio::task::spawn_blocking(move || reader.read()).await {
        Ok(Ok(entries)) => Json(entries).into_response(),
        Ok(Err(e)) => {
            warn!(error = %e, "Failed to read request log");
            (
                e.status_code(),
                Json(json!({
                    "message": "Log file not found",
                    "error": e.to_string(),
                })),
            )
                .into_response()
        }
        Err(e) => {
            error!(error = %e, "Request log reader task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": "Log reader failed" })),
            )
                .into_response()
        }
    }
}
