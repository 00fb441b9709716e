use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// What stage of a node's execution a debug record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebugKind {
  Input,
  Intermediate,
  Output,
}

/// A diagnostic record collected while a node executes.
///
/// Attached to the node's execution step so clients can inspect prompts,
/// retrieved documents, and raw model responses after the fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugLog {
  #[serde(rename = "type")]
  pub kind: DebugKind,
  pub label: String,
  pub value: serde_json::Value,
  pub timestamp: u64,
}

impl DebugLog {
  pub fn new(kind: DebugKind, label: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
    Self {
      kind,
      label: label.into(),
      value: value.into(),
      timestamp: unix_millis(),
    }
  }
}

/// Milliseconds since the Unix epoch.
pub(crate) fn unix_millis() -> u64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|d| d.as_millis() as u64)
    .unwrap_or(0)
}
