use crate::handlers;
use crate::middleware::record_request;
use reqlog_core::config::ServerConfig;
use reqlog_observability::RequestRecorder;
use reqlog_store::LogReader;
use axum::{
    Router,
    middleware,
    routing::get,
};
use std::future::Future;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared state for the HTTP surface.
#[derive(Clone)]
pub struct AppState {
    pub reader: LogReader,
    pub recorder: RequestRecorder,
}

/// Build the router: `/`, `/logs`, a 404 fallback, and the recording
/// middleware wrapped around all of them (fallback included).
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root::ok).fallback(handlers::root::not_found))
        .route(
            "/logs",
            get(handlers::logs::list_logs).fallback(handlers::root::not_found),
        )
        .fallback(handlers::root::not_found)
        .layer(middleware::from_fn_with_state(state.clone(), record_request))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// HTTP server for the request log.
pub struct HttpServer {
    config: ServerConfig,
    state: AppState,
}

impl HttpServer {
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Serve until `shutdown` resolves, then let in-flight requests finish.
    pub async fn start<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = build_router(self.state);
        let listener = tokio::net::TcpListener::bind(&self.config.addr).await?;

        info!(addr = %listener.local_addr()?, "Starting HTTP server");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("HTTP server stopped");
        Ok(())
    }
}
