//! Caller-supplied graph types.
//!
//! These mirror the JSON the canvas and API clients send: nodes carry a type
//! tag plus free-form parameters, edges carry named input channels via
//! `targetHandle`. Nodes are immutable for the duration of a run.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A unit of work in the flow graph.
///
/// `node_type` selects a registered node implementation; the engine never
/// interprets `data` itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
  pub id: String,
  #[serde(rename = "type")]
  pub node_type: String,
  #[serde(default)]
  pub data: NodeData,
}

/// Per-node configuration supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
  #[serde(default)]
  pub parameters: HashMap<String, serde_json::Value>,
  #[serde(default)]
  pub label: String,
}

impl NodeData {
  /// Look up a raw parameter value.
  pub fn parameter(&self, name: &str) -> Option<&serde_json::Value> {
    self.parameters.get(name)
  }

  /// Look up a string parameter.
  pub fn string_parameter(&self, name: &str) -> Option<&str> {
    self.parameters.get(name).and_then(|v| v.as_str())
  }

  /// Look up a numeric parameter, accepting both numbers and numeric strings.
  pub fn number_parameter(&self, name: &str) -> Option<f64> {
    match self.parameters.get(name)? {
      serde_json::Value::Number(n) => n.as_f64(),
      serde_json::Value::String(s) => s.parse().ok(),
      _ => None,
    }
  }

  /// Look up a boolean parameter.
  pub fn bool_parameter(&self, name: &str) -> Option<bool> {
    self.parameters.get(name).and_then(|v| v.as_bool())
  }
}

/// A directed data dependency between two nodes.
///
/// `target_handle` names the input channel on the target node (e.g. "prompt",
/// "context"); `None` means the node's sole/default input. Multiple edges may
/// target the same handle on the same node (fan-in).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
  pub id: String,
  pub source: String,
  pub target: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub source_handle: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub target_handle: Option<String>,
}
