//! Per-run step lifecycle records.
//!
//! One [`ExecutionStep`] is created (pending) for every executor node before
//! the first level runs. Config nodes are silent: they materialize a result
//! but never appear in the step stream.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use pylon_nodes::DebugLog;

/// Error message written onto non-terminal steps when a run is cancelled.
pub const CANCELLED_MESSAGE: &str = "Execution stopped by caller";

/// Lifecycle state of one executor node within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
  Pending,
  Running,
  Completed,
  Error,
}

impl StepStatus {
  /// Terminal states are never left again.
  pub fn is_terminal(&self) -> bool {
    matches!(self, Self::Completed | Self::Error)
  }
}

/// The run-time record of one executor node's execution.
///
/// Serialized camelCase to match the wire protocol clients consume.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStep {
  pub id: String,
  pub node_id: String,
  pub node_name: String,
  pub status: StepStatus,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub start_time: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub end_time: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub result: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub debug_logs: Vec<DebugLog>,
}

impl ExecutionStep {
  /// Create a fresh pending step for an executor node.
  pub fn pending(node_id: impl Into<String>, node_name: impl Into<String>) -> Self {
    Self {
      id: uuid::Uuid::new_v4().to_string(),
      node_id: node_id.into(),
      node_name: node_name.into(),
      status: StepStatus::Pending,
      start_time: None,
      end_time: None,
      result: None,
      error: None,
      debug_logs: Vec::new(),
    }
  }

  pub fn mark_running(&mut self) {
    self.status = StepStatus::Running;
    self.start_time = Some(now_millis());
  }

  pub fn mark_completed(&mut self, result: String, debug_logs: Vec<DebugLog>) {
    self.status = StepStatus::Completed;
    self.end_time = Some(now_millis());
    self.result = Some(result);
    self.debug_logs = debug_logs;
  }

  pub fn mark_errored(&mut self, error: impl Into<String>) {
    self.status = StepStatus::Error;
    self.end_time = Some(now_millis());
    self.error = Some(error.into());
  }
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|d| d.as_millis() as u64)
    .unwrap_or(0)
}
