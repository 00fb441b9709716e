use serde::{Deserialize, Serialize};

/// Who triggered the run, threaded immutably through every dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunSource {
  Ui,
  Api,
  Webhook,
}

/// Per-run metadata handed to each node's `execute`.
///
/// Lets caller-sensitive nodes (the API input adapter) vary behavior without
/// the coordinator knowing node semantics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionContext {
  pub source: RunSource,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub webhook_data: Option<serde_json::Value>,
}

impl ExecutionContext {
  pub fn ui() -> Self {
    Self {
      source: RunSource::Ui,
      webhook_data: None,
    }
  }

  pub fn api() -> Self {
    Self {
      source: RunSource::Api,
      webhook_data: None,
    }
  }

  pub fn webhook(data: serde_json::Value) -> Self {
    Self {
      source: RunSource::Webhook,
      webhook_data: Some(data),
    }
  }
}

impl Default for ExecutionContext {
  fn default() -> Self {
    Self::ui()
  }
}
