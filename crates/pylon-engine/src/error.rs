//! Run-level error types.
//!
//! Only structural problems surface here: node types the registry has never
//! heard of, and graph construction failures. Node-level failures are
//! recorded on their step and never become an `EngineError`.

use thiserror::Error;

/// Errors that abort an entire run.
#[derive(Debug, Error)]
pub enum EngineError {
  /// A node references a type the registry does not know.
  #[error("unknown node type '{node_type}' for node '{node_id}'")]
  UnknownNodeType { node_id: String, node_type: String },

  /// The graph could not be built or planned.
  #[error(transparent)]
  Graph(#[from] pylon_graph::GraphError),

  /// The run was stopped by the caller before it finished.
  #[error("execution stopped by caller")]
  Cancelled,
}
