use thiserror::Error;

/// Errors a node can raise while being dispatched.
///
/// Both variants are scoped to a single node: the engine records them on the
/// node's step and keeps running sibling and unrelated downstream nodes.
#[derive(Debug, Error)]
pub enum NodeError {
  /// `initialize` failed: missing required parameter or credential, or an
  /// unusable configuration value.
  #[error("configuration error: {0}")]
  Configuration(String),

  /// `execute` failed: node logic or an upstream API call.
  #[error("execution error: {0}")]
  Execution(String),
}

impl NodeError {
  pub fn configuration(message: impl Into<String>) -> Self {
    Self::Configuration(message.into())
  }

  pub fn execution(message: impl Into<String>) -> Self {
    Self::Execution(message.into())
  }
}
