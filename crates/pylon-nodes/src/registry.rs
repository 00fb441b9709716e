//! The node type registry.
//!
//! Process-wide, read-only after startup. The engine receives the registry
//! as an injected `Arc`, so tests can run against a hand-built one.

use std::collections::HashMap;

use crate::api::{ApiInputNode, ApiOutputNode};
use crate::llm::{AnthropicNode, MetaNode, OpenAiNode};
use crate::schema::NodeSchema;
use crate::vectorstore::{PineconeNode, QdrantNode};

/// Lookup table from node type tag to its schema.
#[derive(Debug, Default)]
pub struct NodeRegistry {
  nodes: HashMap<&'static str, NodeSchema>,
}

impl NodeRegistry {
  /// An empty registry. Used by tests with hand-built schemas.
  pub fn new() -> Self {
    Self::default()
  }

  /// The production registry with every built-in node type.
  pub fn builtin() -> Self {
    let mut registry = Self::new();
    registry.register(OpenAiNode::schema());
    registry.register(AnthropicNode::schema());
    registry.register(MetaNode::schema());
    registry.register(PineconeNode::schema());
    registry.register(QdrantNode::schema());
    registry.register(ApiInputNode::schema());
    registry.register(ApiOutputNode::schema());
    registry
  }

  /// Register a node type. Last registration wins on duplicate tags.
  pub fn register(&mut self, schema: NodeSchema) {
    self.nodes.insert(schema.node_type, schema);
  }

  /// Look up a node type by its tag.
  pub fn get(&self, node_type: &str) -> Option<&NodeSchema> {
    self.nodes.get(node_type)
  }

  pub fn contains(&self, node_type: &str) -> bool {
    self.nodes.contains_key(node_type)
  }

  /// Registered type tags, unordered.
  pub fn node_types(&self) -> impl Iterator<Item = &'static str> + '_ {
    self.nodes.keys().copied()
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::schema::NodeRole;

  #[test]
  fn builtin_registry_contains_all_node_types() {
    let registry = NodeRegistry::builtin();
    for node_type in [
      "OpenAI",
      "Anthropic",
      "Meta",
      "PineconeVectorStore",
      "QdrantVectorStore",
      "APIInput",
      "APIOutput",
    ] {
      assert!(registry.contains(node_type), "missing {node_type}");
    }
  }

  #[test]
  fn vector_stores_are_config_nodes() {
    let registry = NodeRegistry::builtin();
    assert_eq!(
      registry.get("PineconeVectorStore").unwrap().role(),
      NodeRole::Config
    );
    assert_eq!(
      registry.get("QdrantVectorStore").unwrap().role(),
      NodeRole::Config
    );
    assert_eq!(registry.get("OpenAI").unwrap().role(), NodeRole::Executor);
  }

  #[test]
  fn unknown_type_is_none() {
    let registry = NodeRegistry::builtin();
    assert!(registry.get("DoesNotExist").is_none());
  }
}
