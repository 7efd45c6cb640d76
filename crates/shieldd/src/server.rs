//! HTTP server for shieldd.

use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::routes;
use crate::state::AppState;

/// Assemble the full router. Split out so tests can drive it in-process.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(routes::analyze_routes())
        .merge(routes::account_routes())
        .merge(routes::health_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve until the process is stopped.
pub async fn run(bind: &str, state: AppState) -> Result<()> {
    let app = router(Arc::new(state));
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("Listening on http://{bind}");
    axum::serve(listener, app).await?;
    Ok(())
}
