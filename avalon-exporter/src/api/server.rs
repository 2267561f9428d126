//! HTTP server wiring.

use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;
use utoipa_axum::router::OpenApiRouter;

use crate::config::Config;
use crate::store::SnapshotStore;

/// Shared handle passed to every request handler.
#[derive(Clone)]
pub struct SharedState {
    pub store: Arc<SnapshotStore>,
    pub config: Arc<Config>,
    pub shutdown: CancellationToken,
}

/// Build the application router.
pub fn router(state: SharedState) -> axum::Router {
    let (router, _openapi) = OpenApiRouter::new()
        .merge(super::v0::routes())
        .split_for_parts();
    router
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the API until the shutdown token fires.
pub async fn run(state: SharedState, shutdown: CancellationToken) -> Result<()> {
    let port = state.config.exporter_port;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "HTTP server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}
