//! Meta (Llama) chat node, served from an Ollama-compatible endpoint.

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

const DEFAULT_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "llama2:7b-chat";
const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Meta's language models like Llama and CodeLlama.
pub struct MetaNode;

impl MetaNode {
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
      "Meta",
      "Meta",
      "Meta's language models like Llama 2 and CodeLlama",
      NodeCategory::Llm,
      INPUTS,
      &[OutputKind::Text, OutputKind::Json],
      MetaNode,
    )
  }
}

pub struct MetaInstance {
  chat: OllamaChat,
  json_schema: Option<serde_json::Value>,
  options: InitOptions,
}

#[async_trait]
impl ExecutorNode for MetaNode {
  type Instance = MetaInstance;

  async fn initialize(
    &self,
    data: &NodeData,
    options: &InitOptions,
  ) -> Result<Self::Instance, NodeError> {
    // Local endpoint, so the URL credential is optional.
    let base_url = options
      .credential("OLLAMA_URL")
      .unwrap_or(DEFAULT_BASE_URL)
      .trim_end_matches('/')
      .to_string();
    let model = data
      .string_parameter("model")
      .unwrap_or(DEFAULT_MODEL)
      .to_string();
    let temperature = data
      .number_parameter("temperature")
      .unwrap_or(DEFAULT_TEMPERATURE);

    let json_schema = if data.bool_parameter("useJsonOutput").unwrap_or(false) {
      data.parameter("jsonSchema").cloned()
    } else {
      None
    };

    Ok(MetaInstance {
      chat: OllamaChat {
        http: Client::new(),
        base_url,
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

pub(crate) struct OllamaChat {
  pub(crate) http: Client,
  base_url: String,
  model: String,
  temperature: f64,
}

#[derive(Deserialize)]
struct GenerateResponse {
  #[serde(default)]
  response: String,
}

#[async_trait]
impl ChatModel for OllamaChat {
  async fn complete(&self, prompt: &str) -> Result<String, NodeError> {
    let body = serde_json::json!({
      "model": self.model,
      "prompt": prompt,
      "stream": false,
      "options": { "temperature": self.temperature },
    });

    let response = self
      .http
      .post(format!("{}/api/generate", self.base_url))
      .json(&body)
      .send()
      .await
      .map_err(|e| NodeError::execution(format!("ollama request failed: {e}")))?;

    let body: GenerateResponse = response
      .error_for_status()
      .map_err(|e| NodeError::execution(format!("ollama request failed: {e}")))?
      .json()
      .await
      .map_err(|e| NodeError::execution(format!("invalid ollama response: {e}")))?;

    Ok(body.response)
  }
}
