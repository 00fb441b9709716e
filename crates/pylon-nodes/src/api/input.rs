use async_trait::async_trait;

use pylon_graph::NodeData;

use crate::context::{ExecutionContext, RunSource};
use crate::error::NodeError;
use crate::schema::{
  ExecutionOutput, ExecutorNode, InitOptions, Inputs, NodeCategory, NodeSchema, OutputKind,
};

const DEFAULT_MOCK_INPUT: &str = r#"{"body":"i like haikus that involve samurai swords"}"#;

/// Entry point for API request data.
///
/// Webhook runs emit the inbound payload; UI and API runs emit the mocked
/// request body configured on the node.
pub struct ApiInputNode;

impl ApiInputNode {
  pub fn schema() -> NodeSchema {
    NodeSchema::executor(
      "APIInput",
      "API Input",
      "Entry point for API request data; mock the request body for canvas runs",
      NodeCategory::Tools,
      &[],
      &[OutputKind::Json],
      ApiInputNode,
    )
  }
}

#[async_trait]
impl ExecutorNode for ApiInputNode {
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
    data: &NodeData,
    _inputs: &Inputs,
    context: &ExecutionContext,
  ) -> Result<ExecutionOutput, NodeError> {
    if context.source == RunSource::Webhook {
      if let Some(payload) = &context.webhook_data {
        return Ok(ExecutionOutput::new(payload.to_string()));
      }
    }

    let raw = match data.parameter("mockInput") {
      Some(serde_json::Value::String(raw)) => {
        // Stored as a JSON string in the canvas; validate it.
        let parsed: serde_json::Value = serde_json::from_str(raw)
          .map_err(|_| NodeError::execution("invalid JSON in mockInput parameter"))?;
        parsed.to_string()
      }
      Some(value) => value.to_string(),
      None => DEFAULT_MOCK_INPUT.to_string(),
    };

    Ok(ExecutionOutput::new(raw))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  async fn run(data: NodeData, context: ExecutionContext) -> Result<String, NodeError> {
    let output = ApiInputNode
      .execute((), &data, &Inputs::default(), &context)
      .await?;
    Ok(output.value)
  }

  #[tokio::test]
  async fn webhook_runs_emit_the_inbound_payload() {
    let context = ExecutionContext::webhook(serde_json::json!({ "question": "why" }));
    let value = run(NodeData::default(), context).await.unwrap();
    assert_eq!(value, r#"{"question":"why"}"#);
  }

  #[tokio::test]
  async fn ui_runs_emit_the_mock_body() {
    let mut data = NodeData::default();
    data.parameters.insert(
      "mockInput".to_string(),
      serde_json::json!(r#"{"body":"test"}"#),
    );
    let value = run(data, ExecutionContext::ui()).await.unwrap();
    assert_eq!(value, r#"{"body":"test"}"#);
  }

  #[tokio::test]
  async fn missing_mock_falls_back_to_default() {
    let value = run(NodeData::default(), ExecutionContext::api())
      .await
      .unwrap();
    assert!(value.contains("samurai swords"));
  }

  #[tokio::test]
  async fn malformed_mock_is_an_execution_error() {
    let mut data = NodeData::default();
    data
      .parameters
      .insert("mockInput".to_string(), serde_json::json!("{not json"));
    let err = run(data, ExecutionContext::ui()).await.unwrap_err();
    assert!(matches!(err, NodeError::Execution(_)));
  }
}
