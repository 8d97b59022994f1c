use crate::server::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use reqlog_observability::RequestInfo;

/// Record every request once its response is ready, whatever the route.
///
/// Recording only enqueues; the response is returned without waiting on disk.
pub async fn record_request(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let info = RequestInfo::from_request(&request);
    let response = next.run(request).await;
    state.recorder.record(info, response.status().as_u16());
    response
}
