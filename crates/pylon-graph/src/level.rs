//! Level planning via Kahn's algorithm.
//!
//! Every node is assigned an execution level such that all of its
//! predecessors sit in strictly lower levels. Nodes without incoming edges
//! (including nodes with no edges at all) land in level 0.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use crate::error::GraphError;
use crate::types::{Edge, Node};

/// A topological leveling of the graph, ordered by ascending level.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelPlan {
  levels: BTreeMap<u32, Vec<String>>,
}

impl LevelPlan {
  /// Compute the level plan for a node/edge list.
  ///
  /// Fails with [`GraphError::CyclicGraph`] if any node can never reach
  /// in-degree zero, with [`GraphError::InvalidEdge`] if an edge references
  /// a node that is not in the list, and with [`GraphError::DuplicateNode`]
  /// on repeated node ids.
  pub fn compute(nodes: &[Node], edges: &[Edge]) -> Result<Self, GraphError> {
    let mut in_degree: HashMap<&str, usize> = HashMap::with_capacity(nodes.len());
    let mut levels: HashMap<&str, u32> = HashMap::with_capacity(nodes.len());

    for node in nodes {
      if in_degree.insert(node.id.as_str(), 0).is_some() {
        return Err(GraphError::DuplicateNode(node.id.clone()));
      }
      levels.insert(node.id.as_str(), 0);
    }

    let mut outgoing: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in edges {
      if !levels.contains_key(edge.source.as_str()) || !levels.contains_key(edge.target.as_str()) {
        return Err(GraphError::InvalidEdge {
          edge_id: edge.id.clone(),
          source_id: edge.source.clone(),
          target: edge.target.clone(),
        });
      }
      *in_degree.get_mut(edge.target.as_str()).unwrap() += 1;
      outgoing
        .entry(edge.source.as_str())
        .or_default()
        .push(edge.target.as_str());
    }

    let mut queue: VecDeque<&str> = nodes
      .iter()
      .filter(|n| in_degree[n.id.as_str()] == 0)
      .map(|n| n.id.as_str())
      .collect();

    let mut placed: HashSet<&str> = HashSet::with_capacity(nodes.len());
    while let Some(current) = queue.pop_front() {
      placed.insert(current);
      let current_level = levels[current];

      for &target in outgoing.get(current).map(|v| v.as_slice()).unwrap_or(&[]) {
        let level = levels.get_mut(target).unwrap();
        *level = (*level).max(current_level + 1);

        let degree = in_degree.get_mut(target).unwrap();
        *degree -= 1;
        if *degree == 0 {
          queue.push_back(target);
        }
      }
    }

    // Nodes on a cycle never reach in-degree zero. The original engine
    // silently dropped them from every level; here they are a hard error.
    if placed.len() < nodes.len() {
      let mut stuck: Vec<String> = nodes
        .iter()
        .filter(|n| !placed.contains(n.id.as_str()))
        .map(|n| n.id.clone())
        .collect();
      stuck.sort();
      return Err(GraphError::CyclicGraph { nodes: stuck });
    }

    let mut grouped: BTreeMap<u32, Vec<String>> = BTreeMap::new();
    for node in nodes {
      grouped
        .entry(levels[node.id.as_str()])
        .or_default()
        .push(node.id.clone());
    }

    Ok(Self { levels: grouped })
  }

  /// Iterate levels in ascending order.
  pub fn iter(&self) -> impl Iterator<Item = (u32, &[String])> {
    self.levels.iter().map(|(level, ids)| (*level, ids.as_slice()))
  }

  /// The level a node was assigned to, if it exists in the plan.
  pub fn level_of(&self, node_id: &str) -> Option<u32> {
    self
      .levels
      .iter()
      .find(|(_, ids)| ids.iter().any(|id| id == node_id))
      .map(|(level, _)| *level)
  }

  /// Number of distinct levels.
  pub fn len(&self) -> usize {
    self.levels.len()
  }

  pub fn is_empty(&self) -> bool {
    self.levels.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn node(id: &str) -> Node {
    Node {
      id: id.to_string(),
      node_type: "Test".to_string(),
      data: Default::default(),
    }
  }

  fn edge(source: &str, target: &str) -> Edge {
    Edge {
      id: format!("{source}-{target}"),
      source: source.to_string(),
      target: target.to_string(),
      source_handle: None,
      target_handle: None,
    }
  }

  #[test]
  fn linear_chain_levels() {
    let nodes = vec![node("a"), node("b"), node("c")];
    let edges = vec![edge("a", "b"), edge("b", "c")];
    let plan = LevelPlan::compute(&nodes, &edges).unwrap();

    assert_eq!(plan.level_of("a"), Some(0));
    assert_eq!(plan.level_of("b"), Some(1));
    assert_eq!(plan.level_of("c"), Some(2));
  }

  #[test]
  fn levels_are_monotone_along_edges() {
    // Diamond plus a long arm: d must wait for the deepest predecessor.
    let nodes = vec![node("a"), node("b"), node("c"), node("x"), node("d")];
    let edges = vec![
      edge("a", "b"),
      edge("a", "c"),
      edge("c", "x"),
      edge("b", "d"),
      edge("x", "d"),
    ];
    let plan = LevelPlan::compute(&nodes, &edges).unwrap();

    for e in &edges {
      assert!(
        plan.level_of(&e.source).unwrap() < plan.level_of(&e.target).unwrap(),
        "edge {} -> {} violates level order",
        e.source,
        e.target
      );
    }
    assert_eq!(plan.level_of("d"), Some(3));
  }

  #[test]
  fn every_node_appears_in_exactly_one_level() {
    let nodes = vec![node("a"), node("b"), node("c"), node("solo")];
    let edges = vec![edge("a", "b"), edge("a", "c")];
    let plan = LevelPlan::compute(&nodes, &edges).unwrap();

    let mut seen: Vec<&str> = plan
      .iter()
      .flat_map(|(_, ids)| ids.iter().map(|id| id.as_str()))
      .collect();
    seen.sort();
    assert_eq!(seen, vec!["a", "b", "c", "solo"]);
  }

  #[test]
  fn edgeless_nodes_get_level_zero() {
    let nodes = vec![node("solo"), node("other")];
    let plan = LevelPlan::compute(&nodes, &[]).unwrap();

    assert_eq!(plan.len(), 1);
    assert_eq!(plan.level_of("solo"), Some(0));
    assert_eq!(plan.level_of("other"), Some(0));
  }

  #[test]
  fn cycle_is_rejected() {
    let nodes = vec![node("a"), node("b")];
    let edges = vec![edge("a", "b"), edge("b", "a")];

    match LevelPlan::compute(&nodes, &edges) {
      Err(GraphError::CyclicGraph { nodes }) => {
        assert_eq!(nodes, vec!["a".to_string(), "b".to_string()]);
      }
      other => panic!("expected CyclicGraph, got {other:?}"),
    }
  }

  #[test]
  fn cycle_downstream_of_valid_prefix_is_rejected() {
    let nodes = vec![node("a"), node("b"), node("c")];
    let edges = vec![edge("a", "b"), edge("b", "c"), edge("c", "b")];

    match LevelPlan::compute(&nodes, &edges) {
      Err(GraphError::CyclicGraph { nodes }) => {
        assert_eq!(nodes, vec!["b".to_string(), "c".to_string()]);
      }
      other => panic!("expected CyclicGraph, got {other:?}"),
    }
  }

  #[test]
  fn unknown_edge_endpoint_is_rejected() {
    let nodes = vec![node("a")];
    let edges = vec![edge("a", "ghost")];

    assert!(matches!(
      LevelPlan::compute(&nodes, &edges),
      Err(GraphError::InvalidEdge { .. })
    ));
  }

  #[test]
  fn duplicate_node_id_is_rejected() {
    let nodes = vec![node("a"), node("a")];

    assert!(matches!(
      LevelPlan::compute(&nodes, &[]),
      Err(GraphError::DuplicateNode(_))
    ));
  }
}
