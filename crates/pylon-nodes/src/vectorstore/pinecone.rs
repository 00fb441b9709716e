use async_trait::async_trait;

use pylon_graph::NodeData;

use crate::error::NodeError;
use crate::schema::{ConfigNode, InitOptions, NodeCategory, NodeSchema, OutputKind};

/// Pinecone vector store configuration.
pub struct PineconeNode;

impl PineconeNode {
  pub fn schema() -> NodeSchema {
    NodeSchema::config(
      "PineconeVectorStore",
      "Pinecone",
      "Configure Pinecone vector store for RAG",
      NodeCategory::Vectorstore,
      &[],
      &[OutputKind::VectorstoreConfig],
      PineconeNode,
    )
  }
}

#[async_trait]
impl ConfigNode for PineconeNode {
  async fn initialize(
    &self,
    data: &NodeData,
    options: &InitOptions,
  ) -> Result<serde_json::Value, NodeError> {
    // The key is consumed at query time; failing here surfaces the problem
    // on the config node's level instead of mid-retrieval.
    options.require_credential("PINECONE_API_KEY")?;

    let index_name = data
      .string_parameter("indexName")
      .ok_or_else(|| NodeError::configuration("missing required parameter: indexName"))?;
    let top_k = data.number_parameter("topK").unwrap_or(3.0) as u32;
    let dimensions = data.number_parameter("dimensions").unwrap_or(1536.0) as u32;

    let mut config = serde_json::json!({
      "type": "pinecone",
      "indexName": index_name,
      "topK": top_k,
      "dimensions": dimensions,
    });
    if let Some(namespace) = data.string_parameter("namespace") {
      config["namespace"] = serde_json::json!(namespace);
    }
    Ok(config)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn options_with_key() -> InitOptions {
    let mut options = InitOptions::default();
    options
      .credentials
      .insert("PINECONE_API_KEY".to_string(), "pc-key".to_string());
    options
  }

  #[tokio::test]
  async fn materializes_parseable_config() {
    let mut data = NodeData::default();
    data
      .parameters
      .insert("indexName".to_string(), serde_json::json!("movies"));
    data
      .parameters
      .insert("topK".to_string(), serde_json::json!(5));

    let value = PineconeNode
      .initialize(&data, &options_with_key())
      .await
      .unwrap();
    assert_eq!(value["type"], "pinecone");
    assert_eq!(value["indexName"], "movies");
    assert_eq!(value["topK"], 5);
    assert_eq!(value["dimensions"], 1536);

    // Downstream LLM nodes must be able to parse it back.
    let config: crate::retrieval::VectorStoreConfig =
      serde_json::from_value(value).unwrap();
    assert!(matches!(
      config,
      crate::retrieval::VectorStoreConfig::Pinecone { .. }
    ));
  }

  #[tokio::test]
  async fn missing_index_name_is_a_configuration_error() {
    let err = PineconeNode
      .initialize(&NodeData::default(), &options_with_key())
      .await
      .unwrap_err();
    assert!(err.to_string().contains("indexName"));
  }

  #[tokio::test]
  async fn missing_api_key_is_a_configuration_error() {
    let mut data = NodeData::default();
    data
      .parameters
      .insert("indexName".to_string(), serde_json::json!("movies"));

    let err = PineconeNode
      .initialize(&data, &InitOptions::default())
      .await
      .unwrap_err();
    assert!(err.to_string().contains("PINECONE_API_KEY"));
  }
}
