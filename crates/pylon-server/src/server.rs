//! Router assembly and the serve loop.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::routes;
use crate::state::AppState;

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
  Router::new()
    .route("/api/health", get(routes::health))
    .route("/api/execute", post(routes::execute))
    .route("/api/run/{deployment_id}", post(routes::run_deployment))
    .route("/api/webhook/{deployment_id}", post(routes::webhook))
    .layer(CorsLayer::permissive())
    .with_state(state)
}

/// Run the server until the cancellation token is triggered.
pub async fn serve(
  state: Arc<AppState>,
  bind: &str,
  shutdown: CancellationToken,
) -> anyhow::Result<()> {
  let app = router(state);
  let listener = TcpListener::bind(bind).await?;
  info!(bind, "pylon listening");

  axum::serve(listener, app)
    .with_graceful_shutdown(async move { shutdown.cancelled().await })
    .await?;

  info!("pylon shut down");
  Ok(())
}
