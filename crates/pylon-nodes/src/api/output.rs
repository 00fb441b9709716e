use async_trait::async_trait;

use pylon_graph::NodeData;

use crate::context::ExecutionContext;
use crate::error::NodeError;
use crate::schema::{
  ExecutionOutput, ExecutorNode, InitOptions, InputHandle, InputSpec, Inputs, NodeCategory,
  NodeSchema, OutputKind,
};

const INPUTS: &[InputSpec] = &[InputSpec::required(
  InputHandle::Context,
  "Data to return to the API caller",
)];

/// Terminal node that shapes the flow's response body.
///
/// JSON input is pretty-printed as-is; anything else is wrapped in a
/// `{"data": ...}` envelope so the caller always receives valid JSON.
pub struct ApiOutputNode;

impl ApiOutputNode {
  pub fn schema() -> NodeSchema {
    NodeSchema::executor(
      "APIOutput",
      "API Output",
      "Return upstream data to the API caller as a JSON response",
      NodeCategory::Output,
      INPUTS,
      &[OutputKind::Json],
      ApiOutputNode,
    )
  }
}

#[async_trait]
impl ExecutorNode for ApiOutputNode {
  type Instance = ();

  async fn initialize(
    &self,
    _data: &NodeData,
    _options: &InitOptions,
  ) -> Result<Self::Instance, NodeError> {
    Ok(())
  }

  async fn execute(
    &self,
    _instance: Self::Instance,
    _data: &NodeData,
    inputs: &Inputs,
    _context: &ExecutionContext,
  ) -> Result<ExecutionOutput, NodeError> {
    let raw = inputs.get(InputHandle::Context).ok_or_else(|| {
      NodeError::execution("API Output requires input data to return to the caller")
    })?;

    let body = match serde_json::from_str::<serde_json::Value>(raw) {
      Ok(value) => serde_json::to_string_pretty(&value),
      Err(_) => serde_json::to_string_pretty(&serde_json::json!({ "data": raw })),
    }
    .map_err(|e| NodeError::execution(format!("failed to serialize response body: {e}")))?;

    Ok(ExecutionOutput::new(body))
  }
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use super::*;

  async fn run(inputs: Inputs) -> Result<String, NodeError> {
    let output = ApiOutputNode
      .execute((), &NodeData::default(), &inputs, &ExecutionContext::ui())
      .await?;
    Ok(output.value)
  }

  fn context_input(value: &str) -> Inputs {
    Inputs::new(HashMap::from([("context".to_string(), value.to_string())]))
  }

  #[tokio::test]
  async fn json_input_is_pretty_printed() {
    let body = run(context_input(r#"{"answer":42}"#)).await.unwrap();
    assert_eq!(body, "{\n  \"answer\": 42\n}");
  }

  #[tokio::test]
  async fn plain_text_is_wrapped_in_an_envelope() {
    let body = run(context_input("a haiku about swords")).await.unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(parsed["data"], "a haiku about swords");
  }

  #[tokio::test]
  async fn missing_input_is_an_execution_error() {
    let err = run(Inputs::default()).await.unwrap_err();
    assert!(matches!(err, NodeError::Execution(_)));
  }
}
