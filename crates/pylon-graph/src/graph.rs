use std::collections::{HashMap, HashSet};

use crate::types::{Edge, Node};

/// Adjacency view over a node/edge list for terminal-node analysis.
///
/// Node order from the caller is preserved so that terminal-output reduction
/// is deterministic.
#[derive(Debug, Clone)]
pub struct Graph {
  /// Node ids in caller order.
  node_order: Vec<String>,
  /// Adjacency list: node_id -> downstream node_ids.
  adjacency: HashMap<String, Vec<String>>,
}

impl Graph {
  /// Build a graph from nodes and edges.
  ///
  /// Edges referencing unknown nodes are ignored here; the level planner
  /// reports them as structural errors before execution.
  pub fn new(nodes: &[Node], edges: &[Edge]) -> Self {
    let node_order: Vec<String> = nodes.iter().map(|n| n.id.clone()).collect();
    let known: HashSet<&str> = node_order.iter().map(|id| id.as_str()).collect();

    let mut adjacency: HashMap<String, Vec<String>> = HashMap::new();

    for id in &node_order {
      adjacency.entry(id.clone()).or_default();
    }

    for edge in edges {
      if !known.contains(edge.source.as_str()) || !known.contains(edge.target.as_str()) {
        continue;
      }
      adjacency
        .entry(edge.source.clone())
        .or_default()
        .push(edge.target.clone());
    }

    Self {
      node_order,
      adjacency,
    }
  }

  /// Get terminal nodes (nodes with no outgoing edges), in caller order.
  pub fn terminal_nodes(&self) -> Vec<&str> {
    self
      .node_order
      .iter()
      .filter(|id| self.adjacency.get(*id).is_none_or(|v| v.is_empty()))
      .map(|id| id.as_str())
      .collect()
  }
}
