//! HTTP handlers.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use axum::Json;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, header};
use axum::response::Response;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use pylon_engine::{
  ChannelNotifier, EngineError, NoopNotifier, ProgressEvent, ProgressNotifier, RunOptions,
  RunRequest,
};
use pylon_graph::LevelPlan;
use pylon_nodes::{ExecutionContext, NodeRegistry};

use crate::error::ApiError;
use crate::state::{AppState, Deployment};

// GET /api/health
pub async fn health() -> Json<serde_json::Value> {
  Json(serde_json::json!({
    "status": "ok",
    "version": env!("CARGO_PKG_VERSION"),
  }))
}

/// Interactive run body: the flow plus caller-resolved credentials.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRequest {
  #[serde(flatten)]
  pub flow: RunRequest,
  #[serde(default)]
  pub credentials: HashMap<String, String>,
}

// POST /api/execute — streams progress envelopes as SSE frames.
//
// Structural problems are rejected with 400 before the stream starts; once
// streaming, node-level failures ride inside step envelopes and the
// response stays 200.
pub async fn execute(
  State(state): State<Arc<AppState>>,
  Json(body): Json<ExecuteRequest>,
) -> Result<Response, ApiError> {
  validate_flow(&state.registry, &body.flow)?;

  let (tx, rx) = mpsc::unbounded_channel();
  let notifier = ChannelNotifier::new(tx);
  let cancel = CancellationToken::new();
  // Dropping the response body (client disconnect) cancels the run.
  let guard = cancel.clone().drop_guard();

  let options = RunOptions::new(body.credentials, ExecutionContext::ui());
  let flow = body.flow;
  let state = state.clone();
  tokio::spawn(async move {
    match state
      .coordinator
      .execute(&flow, &options, cancel, &notifier)
      .await
    {
      Ok(_) => {}
      Err(EngineError::Cancelled) => debug!("interactive run cancelled by client"),
      Err(err) => notifier.notify(ProgressEvent::Error {
        error: err.to_string(),
      }),
    }
  });

  let stream = UnboundedReceiverStream::new(rx).map(move |event| {
    let _guard = &guard;
    let frame = serde_json::to_string(&event).unwrap_or_default();
    Ok::<_, Infallible>(format!("data: {frame}\n\n"))
  });

  Response::builder()
    .header(header::CONTENT_TYPE, "text/event-stream")
    .header(header::CACHE_CONTROL, "no-cache")
    .header(header::CONNECTION, "keep-alive")
    .body(Body::from_stream(stream))
    .map_err(|e| ApiError::Internal(e.to_string()))
}

// POST /api/run/{deployment_id} — non-streaming, returns the reduced output.
pub async fn run_deployment(
  State(state): State<Arc<AppState>>,
  Path(deployment_id): Path<String>,
  headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
  let deployment = authorize(&state, &headers, &deployment_id).await?;
  let options = RunOptions::new(deployment.credentials.clone(), ExecutionContext::api());
  run_deployed(&state, &deployment, options).await
}

// POST /api/webhook/{deployment_id} — injects the request body into the run.
pub async fn webhook(
  State(state): State<Arc<AppState>>,
  Path(deployment_id): Path<String>,
  headers: HeaderMap,
  Json(payload): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, ApiError> {
  let deployment = authorize(&state, &headers, &deployment_id).await?;
  let options = RunOptions::new(
    deployment.credentials.clone(),
    ExecutionContext::webhook(payload),
  );
  run_deployed(&state, &deployment, options).await
}

async fn run_deployed(
  state: &AppState,
  deployment: &Deployment,
  options: RunOptions,
) -> Result<Json<serde_json::Value>, ApiError> {
  let outcome = state
    .coordinator
    .execute(
      &deployment.flow,
      &options,
      CancellationToken::new(),
      &NoopNotifier,
    )
    .await?;
  Ok(Json(serde_json::json!({ "output": outcome.output })))
}

/// Resolve the caller's API key and confirm the deployment belongs to them.
///
/// A deployment owned by another key is reported as missing, not forbidden,
/// so the endpoint does not leak which ids exist.
async fn authorize(
  state: &AppState,
  headers: &HeaderMap,
  deployment_id: &str,
) -> Result<Deployment, ApiError> {
  let key = headers
    .get("x-api-key")
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::Unauthorized)?;
  let user_id = state
    .api_keys
    .user_for_key(key)
    .await
    .ok_or(ApiError::Unauthorized)?;
  let deployment = state
    .deployments
    .get(deployment_id)
    .await
    .ok_or(ApiError::NotFound)?;
  if deployment.user_id != user_id {
    return Err(ApiError::NotFound);
  }
  Ok(deployment)
}

/// Reject unknown node types and unbuildable graphs before any level runs.
fn validate_flow(registry: &NodeRegistry, flow: &RunRequest) -> Result<(), ApiError> {
  for node in &flow.nodes {
    if !registry.contains(&node.node_type) {
      return Err(ApiError::BadRequest(format!(
        "unknown node type '{}' for node '{}'",
        node.node_type, node.id
      )));
    }
  }
  LevelPlan::compute(&flow.nodes, &flow.edges).map_err(|e| ApiError::BadRequest(e.to_string()))?;
  Ok(())
}
