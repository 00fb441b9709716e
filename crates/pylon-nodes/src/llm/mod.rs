//! LLM executor nodes and shared model plumbing.

mod anthropic;
mod meta;
mod openai;

pub use anthropic::AnthropicNode;
pub use meta::MetaNode;
pub use openai::OpenAiNode;

use async_trait::async_trait;

use pylon_graph::NodeData;

use crate::debug::{DebugKind, DebugLog};
use crate::error::NodeError;
use crate::prompt::PromptParts;
use crate::retrieval;
use crate::schema::{InitOptions, InputHandle, Inputs};

/// A plain text-in/text-out completion surface.
///
/// Retrieval augmentation uses it to generate search queries with whichever
/// model the node was configured with.
#[async_trait]
pub trait ChatModel: Send + Sync {
  async fn complete(&self, prompt: &str) -> Result<String, NodeError>;
}

/// Assemble the final prompt for an LLM node from its resolved inputs.
///
/// Order matters and follows the canvas semantics: retrieval augmentation
/// may replace the base template, then context fragments and conversation
/// history are prepended on top.
pub(crate) async fn build_llm_prompt(
  chat: &dyn ChatModel,
  http: &reqwest::Client,
  options: &InitOptions,
  data: &NodeData,
  inputs: &Inputs,
  debug_logs: &mut Vec<DebugLog>,
) -> Result<String, NodeError> {
  let prompt_text = inputs
    .get(InputHandle::Prompt)
    .or_else(|| data.string_parameter("prompt"))
    .unwrap_or_default()
    .to_string();

  debug_logs.push(DebugLog::new(
    DebugKind::Input,
    "Initial Prompt",
    prompt_text.clone(),
  ));

  let mut parts = PromptParts::new(&prompt_text);

  if let Some(vectorstore_input) = inputs.get(InputHandle::Vectorstore) {
    retrieval::augment(chat, http, options, vectorstore_input, &prompt_text, &mut parts).await?;
  }

  if let Some(context) = inputs.get(InputHandle::Context) {
    parts.add_context(context);
  }

  if let Some(memory) = inputs.get(InputHandle::Memory) {
    parts.add_memory(memory);
  }

  let rendered = parts.render()?;
  debug_logs.append(&mut parts.debug_logs);
  debug_logs.push(DebugLog::new(
    DebugKind::Intermediate,
    "Final Formatted Prompt",
    rendered.clone(),
  ));

  Ok(rendered)
}

/// Structured JSON output for models without native function calling.
///
/// Appends format instructions derived from the caller's JSON schema, then
/// parses the response. A response that fails to parse is returned raw, with
/// the parse failure recorded in the debug logs.
pub(crate) async fn structured_json(
  chat: &dyn ChatModel,
  json_schema: &serde_json::Value,
  prompt: &str,
  debug_logs: &mut Vec<DebugLog>,
) -> Result<String, NodeError> {
  let schema_text = serde_json::to_string_pretty(
    json_schema.get("parameters").unwrap_or(json_schema),
  )
  .unwrap_or_else(|_| json_schema.to_string());

  let instructed = format!(
    "{prompt}\n\nRespond with a single JSON object matching this schema, and nothing else:\n{schema_text}"
  );

  let raw = chat.complete(&instructed).await?;
  debug_logs.push(DebugLog::new(
    DebugKind::Intermediate,
    "Raw LLM Response",
    raw.clone(),
  ));

  match extract_json(&raw) {
    Some(value) => {
      debug_logs.push(DebugLog::new(
        DebugKind::Output,
        "Parsed JSON Response",
        value.clone(),
      ));
      Ok(value.to_string())
    }
    None => {
      debug_logs.push(DebugLog::new(
        DebugKind::Intermediate,
        "JSON Parsing Error",
        "response did not contain a parseable JSON object",
      ));
      Ok(raw)
    }
  }
}

/// Pull the first JSON object out of a model response, tolerating code
/// fences and surrounding prose.
fn extract_json(text: &str) -> Option<serde_json::Value> {
  let start = text.find('{')?;
  let end = text.rfind('}')?;
  if end < start {
    return None;
  }
  serde_json::from_str(&text[start..=end]).ok()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn extract_json_handles_code_fences() {
    let text = "Here you go:\n```json\n{\"summary\": \"ok\"}\n```";
    let value = extract_json(text).unwrap();
    assert_eq!(value["summary"], "ok");
  }

  #[test]
  fn extract_json_rejects_plain_prose() {
    assert!(extract_json("no structured data here").is_none());
  }
}
