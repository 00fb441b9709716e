//! OpenAI chat node.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use pylon_graph::NodeData;

use crate::context::ExecutionContext;
use crate::debug::{DebugKind, DebugLog};
use crate::error::NodeError;
use crate::llm::{ChatModel, build_llm_prompt};
use crate::schema::{
  ExecutionOutput, ExecutorNode, InitOptions, InputHandle, InputSpec, Inputs, NodeCategory,
  NodeSchema, OutputKind,
};

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TEMPERATURE: f64 = 0.7;

/// OpenAI language models (GPT-4 family).
pub struct OpenAiNode;

impl OpenAiNode {
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
      "OpenAI",
      "OpenAI",
      "OpenAI language models like GPT-4 and GPT-4o-mini",
      NodeCategory::Llm,
      INPUTS,
      &[OutputKind::Text, OutputKind::Json],
      OpenAiNode,
    )
  }
}

#[derive(Debug)]
pub struct OpenAiInstance {
  chat: OpenAiChat,
  json_schema: Option<serde_json::Value>,
  options: InitOptions,
}

#[async_trait]
impl ExecutorNode for OpenAiNode {
  type Instance = OpenAiInstance;

  async fn initialize(
    &self,
    data: &NodeData,
    options: &InitOptions,
  ) -> Result<Self::Instance, NodeError> {
    let api_key = options.require_credential("OPENAI_API_KEY")?.to_string();
    let model = data
      .string_parameter("model")
      .unwrap_or(DEFAULT_MODEL)
      .to_string();
    let temperature = data
      .number_parameter("temperature")
      .unwrap_or(DEFAULT_TEMPERATURE);

    let json_schema = if data.bool_parameter("useJsonOutput").unwrap_or(false) {
      Some(parse_json_schema(data)?)
    } else {
      None
    };

    Ok(OpenAiInstance {
      chat: OpenAiChat {
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
      Some(schema) => {
        let value = instance.chat.complete_with_function(&prompt, schema).await?;
        debug_logs.push(DebugLog::new(
          DebugKind::Output,
          "Formatted JSON Response",
          value.clone(),
        ));
        value.to_string()
      }
      None => {
        let text = instance.chat.complete(&prompt).await?;
        debug_logs.push(DebugLog::new(DebugKind::Output, "LLM Response", text.clone()));
        text
      }
    };

    Ok(ExecutionOutput::with_logs(response, debug_logs))
  }
}

/// The typed client `initialize` builds.
#[derive(Debug)]
pub(crate) struct OpenAiChat {
  pub(crate) http: Client,
  api_key: String,
  model: String,
  temperature: f64,
}

#[derive(Deserialize)]
struct ChatResponse {
  #[serde(default)]
  choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
  message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
  #[serde(default)]
  content: Option<String>,
  #[serde(default)]
  function_call: Option<FunctionCall>,
}

#[derive(Deserialize)]
struct FunctionCall {
  #[serde(default)]
  arguments: String,
}

impl OpenAiChat {
  async fn request(&self, body: serde_json::Value) -> Result<ChatResponse, NodeError> {
    let response = self
      .http
      .post(OPENAI_CHAT_URL)
      .bearer_auth(&self.api_key)
      .json(&body)
      .send()
      .await
      .map_err(|e| NodeError::execution(format!("openai request failed: {e}")))?;
    response
      .error_for_status()
      .map_err(|e| NodeError::execution(format!("openai request failed: {e}")))?
      .json()
      .await
      .map_err(|e| NodeError::execution(format!("invalid openai response: {e}")))
  }

  /// Force a function call and return its parsed arguments.
  async fn complete_with_function(
    &self,
    prompt: &str,
    schema: &serde_json::Value,
  ) -> Result<serde_json::Value, NodeError> {
    let name = schema
      .get("name")
      .and_then(|v| v.as_str())
      .unwrap_or("generate_response");
    let body = serde_json::json!({
      "model": self.model,
      "temperature": self.temperature,
      "messages": [{ "role": "user", "content": prompt }],
      "functions": [schema],
      "function_call": { "name": name },
    });

    let response = self.request(body).await?;
    let arguments = response
      .choices
      .into_iter()
      .next()
      .and_then(|c| c.message.function_call)
      .map(|f| f.arguments)
      .ok_or_else(|| NodeError::execution("openai response contained no function call"))?;

    serde_json::from_str(&arguments)
      .map_err(|e| NodeError::execution(format!("openai function arguments were not JSON: {e}")))
  }
}

#[async_trait]
impl ChatModel for OpenAiChat {
  async fn complete(&self, prompt: &str) -> Result<String, NodeError> {
    let body = serde_json::json!({
      "model": self.model,
      "temperature": self.temperature,
      "messages": [{ "role": "user", "content": prompt }],
    });

    let response = self.request(body).await?;
    response
      .choices
      .into_iter()
      .next()
      .and_then(|c| c.message.content)
      .ok_or_else(|| NodeError::execution("openai response contained no content"))
  }
}

/// Parse the caller-supplied function schema, which may arrive as a JSON
/// object or as a JSON string.
fn parse_json_schema(data: &NodeData) -> Result<serde_json::Value, NodeError> {
  match data.parameter("jsonSchema") {
    Some(serde_json::Value::String(raw)) => serde_json::from_str(raw)
      .map_err(|e| NodeError::configuration(format!("invalid jsonSchema parameter: {e}"))),
    Some(value) => Ok(value.clone()),
    None => Err(NodeError::configuration(
      "useJsonOutput requires a jsonSchema parameter",
    )),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn initialize_requires_api_key() {
    let data = NodeData::default();
    let options = InitOptions::default();

    let err = OpenAiNode.initialize(&data, &options).await.unwrap_err();
    assert!(matches!(err, NodeError::Configuration(_)));
    assert!(err.to_string().contains("OPENAI_API_KEY"));
  }

  #[tokio::test]
  async fn initialize_applies_parameter_defaults() {
    let data = NodeData::default();
    let mut options = InitOptions::default();
    options
      .credentials
      .insert("OPENAI_API_KEY".to_string(), "sk-test".to_string());

    let instance = OpenAiNode.initialize(&data, &options).await.unwrap();
    assert_eq!(instance.chat.model, DEFAULT_MODEL);
    assert!(instance.json_schema.is_none());
  }

  #[tokio::test]
  async fn json_output_without_schema_is_a_configuration_error() {
    let mut data = NodeData::default();
    data
      .parameters
      .insert("useJsonOutput".to_string(), serde_json::json!(true));
    let mut options = InitOptions::default();
    options
      .credentials
      .insert("OPENAI_API_KEY".to_string(), "sk-test".to_string());

    let err = OpenAiNode.initialize(&data, &options).await.unwrap_err();
    assert!(matches!(err, NodeError::Configuration(_)));
  }
}
