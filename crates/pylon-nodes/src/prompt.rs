//! Prompt assembly for LLM nodes.
//!
//! A prompt is built as a minijinja template plus a value map, mirroring how
//! inputs arrive: the base template is just `{{ input }}`, and resolved
//! handles prepend sections (context fragments, conversation history) or
//! replace the template wholesale (retrieval augmentation).

use std::collections::HashMap;

use minijinja::Environment;

use crate::debug::{DebugKind, DebugLog};
use crate::error::NodeError;

/// An in-progress prompt: template text plus its substitution values.
#[derive(Debug, Clone)]
pub struct PromptParts {
  pub template: String,
  pub values: HashMap<String, String>,
  pub debug_logs: Vec<DebugLog>,
}

impl PromptParts {
  /// Start from the user prompt alone.
  pub fn new(prompt_text: &str) -> Self {
    let mut values = HashMap::new();
    values.insert("input".to_string(), prompt_text.to_string());
    Self {
      template: "{{ input }}".to_string(),
      values,
      debug_logs: Vec::new(),
    }
  }

  /// Prepend context fragments.
  ///
  /// The raw value may be a JSON array (fan-in on the context handle), a
  /// JSON object, or plain text. Objects are flattened to `key: value`
  /// lines; each fragment becomes its own `Context N:` section.
  pub fn add_context(&mut self, raw: &str) {
    let fragments = split_context(raw);
    if fragments.is_empty() {
      return;
    }

    let header: String = fragments
      .iter()
      .enumerate()
      .map(|(i, _)| format!("Context {}:\n{{{{ context{i} }}}}\n", i + 1))
      .collect::<Vec<_>>()
      .join("\n");
    self.template = format!("{header}\n{}", self.template);

    self.debug_logs.push(DebugLog::new(
      DebugKind::Input,
      "Contexts",
      serde_json::json!(fragments),
    ));
    for (i, fragment) in fragments.into_iter().enumerate() {
      self.values.insert(format!("context{i}"), fragment);
    }
  }

  /// Prepend conversation history.
  pub fn add_memory(&mut self, memory: &str) {
    self.template = format!("Conversation History:\n{{{{ memory }}}}\n\n{}", self.template);
    self.values.insert("memory".to_string(), memory.to_string());
  }

  /// Render the final prompt text.
  pub fn render(&self) -> Result<String, NodeError> {
    let mut env = Environment::new();
    env
      .add_template("prompt", &self.template)
      .map_err(|e| NodeError::execution(format!("invalid prompt template: {e}")))?;
    let template = env.get_template("prompt").expect("template just added");
    template
      .render(&self.values)
      .map_err(|e| NodeError::execution(format!("failed to render prompt: {e}")))
  }
}

/// Break a raw context value into displayable fragments.
fn split_context(raw: &str) -> Vec<String> {
  match serde_json::from_str::<serde_json::Value>(raw) {
    Ok(serde_json::Value::Array(items)) => items.iter().map(flatten_fragment).collect(),
    Ok(value @ serde_json::Value::Object(_)) => vec![flatten_fragment(&value)],
    Ok(other) => vec![flatten_fragment(&other)],
    Err(_) => vec![raw.to_string()],
  }
}

/// Render one fragment: objects as `key: value` lines, scalars as-is.
fn flatten_fragment(value: &serde_json::Value) -> String {
  match value {
    serde_json::Value::Object(map) => map
      .iter()
      .map(|(k, v)| format!("{k}: {}", scalar_text(v)))
      .collect::<Vec<_>>()
      .join("\n"),
    other => scalar_text(other),
  }
}

fn scalar_text(value: &serde_json::Value) -> String {
  match value {
    serde_json::Value::String(s) => s.clone(),
    other => other.to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn plain_prompt_renders_unchanged() {
    let parts = PromptParts::new("write a haiku");
    assert_eq!(parts.render().unwrap(), "write a haiku");
  }

  #[test]
  fn context_array_becomes_numbered_sections() {
    let mut parts = PromptParts::new("summarize");
    parts.add_context(r#"["first fragment","second fragment"]"#);

    let rendered = parts.render().unwrap();
    assert!(rendered.contains("Context 1:\nfirst fragment"));
    assert!(rendered.contains("Context 2:\nsecond fragment"));
    assert!(rendered.ends_with("summarize"));
  }

  #[test]
  fn context_object_is_flattened_to_key_value_lines() {
    let mut parts = PromptParts::new("go");
    parts.add_context(r#"{"genre":"noir","year":1982}"#);

    let rendered = parts.render().unwrap();
    assert!(rendered.contains("genre: noir"));
    assert!(rendered.contains("year: 1982"));
  }

  #[test]
  fn non_json_context_is_used_verbatim() {
    let mut parts = PromptParts::new("go");
    parts.add_context("just some text");
    assert!(parts.render().unwrap().contains("Context 1:\njust some text"));
  }

  #[test]
  fn memory_section_is_prepended() {
    let mut parts = PromptParts::new("go");
    parts.add_memory("user: hi\nassistant: hello");

    let rendered = parts.render().unwrap();
    assert!(rendered.starts_with("Conversation History:\nuser: hi"));
  }

  #[test]
  fn braces_in_prompt_values_are_literal() {
    // User text goes through values, never the template, so template syntax
    // inside it must survive.
    let parts = PromptParts::new("explain {{ this }} syntax");
    assert_eq!(parts.render().unwrap(), "explain {{ this }} syntax");
  }
}
