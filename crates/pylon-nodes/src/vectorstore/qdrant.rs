use async_trait::async_trait;

use pylon_graph::NodeData;

use crate::error::NodeError;
use crate::schema::{ConfigNode, InitOptions, NodeCategory, NodeSchema, OutputKind};

/// Qdrant vector store configuration.
pub struct QdrantNode;

impl QdrantNode {
  pub fn schema() -> NodeSchema {
    NodeSchema::config(
      "QdrantVectorStore",
      "Qdrant",
      "Configure Qdrant vector store for RAG",
      NodeCategory::Vectorstore,
      &[],
      &[OutputKind::VectorstoreConfig],
      QdrantNode,
    )
  }
}

#[async_trait]
impl ConfigNode for QdrantNode {
  async fn initialize(
    &self,
    data: &NodeData,
    options: &InitOptions,
  ) -> Result<serde_json::Value, NodeError> {
    options.require_credential("QDRANT_API_KEY")?;

    let collection_name = data
      .string_parameter("collectionName")
      .ok_or_else(|| NodeError::configuration("missing required parameter: collectionName"))?;
    let url = data
      .string_parameter("url")
      .ok_or_else(|| NodeError::configuration("missing required parameter: url"))?;
    let top_k = data.number_parameter("topK").unwrap_or(3.0) as u32;
    let dimensions = data.number_parameter("dimensions").unwrap_or(1536.0) as u32;

    Ok(serde_json::json!({
      "type": "qdrant",
      "collectionName": collection_name,
      "url": url,
      "topK": top_k,
      "dimensions": dimensions,
    }))
  }
}
