//! Anthropic chat node.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use pylon_graph::NodeData;

use crate::context::ExecutionContext;
use crate::debug::{DebugKind, DebugLog};
use crate::error::NodeError;
use crate::llm::{ChatModel, build_llm_prompt, structured_json};
use crate::schema::{
  ExecutionOutput, ExecutorNode, InitOptions, InputHandle, InputSpec, Inputs, NodeCategory,
  NodeSchema, OutputKind,
};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";
const DEFAULT_TEMPERATURE: f64 = 0.7;
const MAX_TOKENS: u32 = 4096;

/// Anthropic language models (Claude family).
pub struct AnthropicNode;

impl AnthropicNode {
  pub fn schema() -> NodeSchema {
    const INPUTS: &[InputSpec] = &[
      InputSpec::optional(
        InputHandle::Prompt,
        "Dynamic prompt to override the default prompt",
      ),
      InputSpec::optional(
        InputHandle::Context,
        "Additional context to be injected into the prompt",
      ),
      InputSpec::optional(
        InputHandle::Vectorstore,
        "Retrieved documents from a vector store for RAG",
      ),
      InputSpec::advanced(
        InputHandle::Memory,
        "Chat history or memory from previous interactions",
      ),
    ];
    NodeSchema::executor(
      "Anthropic",
      "Anthropic",
      "Anthropic language models like Claude Sonnet and Claude Haiku",
      NodeCategory::Llm,
      INPUTS,
      &[OutputKind::Text, OutputKind::Json],
      AnthropicNode,
    )
  }
}

#[derive(Debug)]
pub struct AnthropicInstance {
  chat: AnthropicChat,
  json_schema: Option<serde_json::Value>,
  options: InitOptions,
}

#[async_trait]
impl ExecutorNode for AnthropicNode {
  type Instance = AnthropicInstance;

  async fn initialize(
    &self,
    data: &NodeData,
    options: &InitOptions,
  ) -> Result<Self::Instance, NodeError> {
    let api_key = options.require_credential("ANTHROPIC_API_KEY")?.to_string();
    let model = data
      .string_parameter("model")
      .unwrap_or(DEFAULT_MODEL)
      .to_string();
    let temperature = data
      .number_parameter("temperature")
      .unwrap_or(DEFAULT_TEMPERATURE);

    let json_schema = if data.bool_parameter("useJsonOutput").unwrap_or(false) {
      match data.parameter("jsonSchema") {
        Some(serde_json::Value::String(raw)) => Some(serde_json::from_str(raw).map_err(|e| {
          NodeError::configuration(format!("invalid jsonSchema parameter: {e}"))
        })?),
        Some(value) => Some(value.clone()),
        None => None,
      }
    } else {
      None
    };

    Ok(AnthropicInstance {
      chat: AnthropicChat {
        http: Client::new(),
        api_key,
        model,
        temperature,
      },
      json_schema,
      options: options.clone(),
    })
  }

  async fn execute(
    &self,
    instance: Self::Instance,
    data: &NodeData,
    inputs: &Inputs,
    _context: &ExecutionContext,
  ) -> Result<ExecutionOutput, NodeError> {
    let mut debug_logs = Vec::new();
    let prompt = build_llm_prompt(
      &instance.chat,
      &instance.chat.http,
      &instance.options,
      data,
      inputs,
      &mut debug_logs,
    )
    .await?;

    let response = match &instance.json_schema {
      Some(schema) => structured_json(&instance.chat, schema, &prompt, &mut debug_logs).await?,
      None => {
        let text = instance.chat.complete(&prompt).await?;
        debug_logs.push(DebugLog::new(DebugKind::Output, "LLM Response", text.clone()));
        text
      }
    };

    Ok(ExecutionOutput::with_logs(response, debug_logs))
  }
}

#[derive(Debug)]
pub(crate) struct AnthropicChat {
  pub(crate) http: Client,
  api_key: String,
  model: String,
  temperature: f64,
}

#[derive(Deserialize)]
struct MessagesResponse {
  #[serde(default)]
  content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
  #[serde(default)]
  text: Option<String>,
}

#[async_trait]
impl ChatModel for AnthropicChat {
  async fn complete(&self, prompt: &str) -> Result<String, NodeError> {
    let body = serde_json::json!({
      "model": self.model,
      "max_tokens": MAX_TOKENS,
      "temperature": self.temperature,
      "messages": [{ "role": "user", "content": prompt }],
    });

    let response = self
      .http
      .post(ANTHROPIC_API_URL)
      .header("x-api-key", &self.api_key)
      .header("anthropic-version", ANTHROPIC_VERSION)
      .json(&body)
      .send()
      .await
      .map_err(|e| NodeError::execution(format!("anthropic request failed: {e}")))?;

    let body: MessagesResponse = response
      .error_for_status()
      .map_err(|e| NodeError::execution(format!("anthropic request failed: {e}")))?
      .json()
      .await
      .map_err(|e| NodeError::execution(format!("invalid anthropic response: {e}")))?;

    body
      .content
      .into_iter()
      .find_map(|block| block.text)
      .ok_or_else(|| NodeError::execution("anthropic response contained no text"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn initialize_requires_api_key() {
    let err = AnthropicNode
      .initialize(&NodeData::default(), &InitOptions::default())
      .await
      .unwrap_err();
    assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
  }

  #[tokio::test]
  async fn model_parameter_overrides_default() {
    let mut data = NodeData::default();
    data
      .parameters
      .insert("model".to_string(), serde_json::json!("claude-3-5-haiku-latest"));
    let mut options = InitOptions::default();
    options
      .credentials
      .insert("ANTHROPIC_API_KEY".to_string(), "key".to_string());

    let instance = AnthropicNode.initialize(&data, &options).await.unwrap();
    assert_eq!(instance.chat.model, "claude-3-5-haiku-latest");
  }
}
