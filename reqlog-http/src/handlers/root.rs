use axum::http::StatusCode;

pub async fn ok() -> &'static str {
    "ok"
}

/// Unknown routes and unsupported methods.
pub async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "404 Not Found")
}
