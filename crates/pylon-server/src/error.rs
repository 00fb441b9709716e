//! HTTP error mapping.
//!
//! Node-level failures never appear here; they ride inside the progress
//! stream or the reduced output. Only request-level problems map to a
//! non-2xx status.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use pylon_engine::EngineError;

/// Request-level failures surfaced as HTTP statuses.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("invalid or missing API key")]
  Unauthorized,

  #[error("deployment not found")]
  NotFound,

  #[error("{0}")]
  BadRequest(String),

  #[error("internal error: {0}")]
  Internal(String),
}

impl ApiError {
  fn status(&self) -> StatusCode {
    match self {
      Self::Unauthorized => StatusCode::UNAUTHORIZED,
      Self::NotFound => StatusCode::NOT_FOUND,
      Self::BadRequest(_) => StatusCode::BAD_REQUEST,
      Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let body = Json(serde_json::json!({ "error": self.to_string() }));
    (self.status(), body).into_response()
  }
}

impl From<EngineError> for ApiError {
  fn from(err: EngineError) -> Self {
    match err {
      // Structural problems are the caller's fault.
      EngineError::UnknownNodeType { .. } | EngineError::Graph(_) => {
        Self::BadRequest(err.to_string())
      }
      EngineError::Cancelled => Self::Internal(err.to_string()),
    }
  }
}
