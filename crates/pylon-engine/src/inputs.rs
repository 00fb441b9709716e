//! Input resolution for one node dispatch.
//!
//! Only edges whose source already has an entry in the results map
//! contribute, and only edges that name a target handle. Fan-in on the
//! `context` handle aggregates every contribution into a JSON array string
//! in edge-list order; fan-in on any other handle is last-write-wins in
//! edge-list order.

use std::collections::HashMap;

use pylon_graph::Edge;
use pylon_nodes::{InputHandle, Inputs};

/// Resolve the input handle values for `node_id` from upstream results.
pub fn resolve_inputs(
  node_id: &str,
  edges: &[Edge],
  results: &HashMap<String, String>,
) -> Inputs {
  let mut values: HashMap<String, String> = HashMap::new();
  let mut context: Vec<String> = Vec::new();

  for edge in edges.iter().filter(|e| e.target == node_id) {
    let Some(handle) = edge.target_handle.as_deref() else {
      continue;
    };
    let Some(result) = results.get(&edge.source) else {
      continue;
    };

    if handle == InputHandle::Context.as_str() {
      context.push(result.clone());
    } else {
      values.insert(handle.to_string(), result.clone());
    }
  }

  if !context.is_empty() {
    // Serializing Vec<String> cannot fail.
    let aggregated = serde_json::to_string(&context).unwrap_or_default();
    values.insert(InputHandle::Context.as_str().to_string(), aggregated);
  }

  Inputs::new(values)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn edge(id: &str, source: &str, target: &str, handle: Option<&str>) -> Edge {
    Edge {
      id: id.to_string(),
      source: source.to_string(),
      target: target.to_string(),
      source_handle: None,
      target_handle: handle.map(str::to_string),
    }
  }

  fn results(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
      .iter()
      .map(|(k, v)| (k.to_string(), v.to_string()))
      .collect()
  }

  #[test]
  fn context_edges_aggregate_into_a_json_array() {
    let edges = vec![
      edge("e1", "b", "d", Some("context")),
      edge("e2", "c", "d", Some("context")),
    ];
    let results = results(&[("b", "b-result"), ("c", "c-result")]);
    let inputs = resolve_inputs("d", &edges, &results);
    assert_eq!(
      inputs.get(InputHandle::Context),
      Some(r#"["b-result","c-result"]"#)
    );
  }

  #[test]
  fn non_context_fan_in_is_last_write_wins() {
    let edges = vec![
      edge("e1", "a", "d", Some("prompt")),
      edge("e2", "b", "d", Some("prompt")),
    ];
    let results = results(&[("a", "first"), ("b", "second")]);
    let inputs = resolve_inputs("d", &edges, &results);
    assert_eq!(inputs.get(InputHandle::Prompt), Some("second"));
  }

  #[test]
  fn edges_from_unfinished_sources_are_skipped() {
    let edges = vec![
      edge("e1", "a", "d", Some("context")),
      edge("e2", "failed", "d", Some("context")),
    ];
    let results = results(&[("a", "ok")]);
    let inputs = resolve_inputs("d", &edges, &results);
    assert_eq!(inputs.get(InputHandle::Context), Some(r#"["ok"]"#));
  }

  #[test]
  fn edges_without_a_target_handle_are_skipped() {
    let edges = vec![edge("e1", "a", "d", None)];
    let results = results(&[("a", "ok")]);
    let inputs = resolve_inputs("d", &edges, &results);
    assert!(inputs.is_empty());
  }

  #[test]
  fn unresolved_handles_are_absent() {
    let inputs = resolve_inputs("d", &[], &HashMap::new());
    assert!(inputs.get(InputHandle::Prompt).is_none());
    assert!(inputs.is_empty());
  }
}
