use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
  #[error("duplicate node id: {0}")]
  DuplicateNode(String),

  #[error("edge '{edge_id}' references unknown node: source={source_id}, target={target}")]
  InvalidEdge {
    edge_id: String,
    source_id: String,
    target: String,
  },

  #[error("graph contains a cycle involving nodes: {}", nodes.join(", "))]
  CyclicGraph { nodes: Vec<String> },
}
