//! Retrieval-augmented generation over vector store REST APIs.
//!
//! A vector store config node's JSON output arrives on the `vectorstore`
//! handle. Augmentation then: generates a focused search query with the
//! node's own model, embeds it, queries the store, and splices the formatted
//! documents into the prompt template.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::debug::{DebugKind, DebugLog};
use crate::error::NodeError;
use crate::llm::ChatModel;
use crate::prompt::PromptParts;
use crate::schema::InitOptions;

const PINECONE_CONTROL_URL: &str = "https://api.pinecone.io/indexes";
const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";
const HUGGINGFACE_E5_URL: &str =
  "https://api-inference.huggingface.co/pipeline/feature-extraction/intfloat/multilingual-e5-large";

const QUERY_GEN_TEMPLATE: &str = "Given the following user request, generate a concise search \
query that would help find relevant information. Focus on key terms and concepts.\n\n\
User Request: {input}\n\nSearch Query:";

const RAG_TEMPLATE: &str = "You are a helpful assistant with access to a knowledge base.\n\
Use the following retrieved information to help answer the user's request.\n\
If the retrieved information isn't relevant or sufficient, you can provide a general response \
based on the user's intent.\n\nRetrieved Information:\n{{ docs }}\n\nUser Request: {{ input }}\n\n\
Please provide a friendly, helpful response that directly addresses the user's request.";

const NO_RESULTS_TEMPLATE: &str = "You are a helpful assistant. The user asked: {{ input }}\n\n\
Unfortunately, I couldn't find any relevant information in the database. Please provide a \
general response or suggest alternatives.";

/// The configuration a vector store config node materializes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum VectorStoreConfig {
  #[serde(rename_all = "camelCase")]
  Pinecone {
    index_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    namespace: Option<String>,
    #[serde(default = "default_top_k")]
    top_k: u32,
    #[serde(default = "default_dimensions")]
    dimensions: u32,
  },
  #[serde(rename_all = "camelCase")]
  Qdrant {
    collection_name: String,
    url: String,
    #[serde(default = "default_top_k")]
    top_k: u32,
    #[serde(default = "default_dimensions")]
    dimensions: u32,
  },
}

pub(crate) fn default_top_k() -> u32 {
  3
}

pub(crate) fn default_dimensions() -> u32 {
  1536
}

impl VectorStoreConfig {
  fn top_k(&self) -> u32 {
    match self {
      Self::Pinecone { top_k, .. } | Self::Qdrant { top_k, .. } => *top_k,
    }
  }

  fn dimensions(&self) -> u32 {
    match self {
      Self::Pinecone { dimensions, .. } | Self::Qdrant { dimensions, .. } => *dimensions,
    }
  }
}

/// One retrieved document.
#[derive(Debug, Clone)]
struct RetrievedDoc {
  content: String,
  metadata: serde_json::Value,
}

/// Replace the prompt template with a retrieval-augmented one.
pub(crate) async fn augment(
  chat: &dyn ChatModel,
  http: &reqwest::Client,
  options: &InitOptions,
  vectorstore_input: &str,
  user_prompt: &str,
  parts: &mut PromptParts,
) -> Result<(), NodeError> {
  let config: VectorStoreConfig = serde_json::from_str(vectorstore_input)
    .map_err(|e| NodeError::execution(format!("invalid vector store config: {e}")))?;

  parts.debug_logs.push(DebugLog::new(
    DebugKind::Intermediate,
    "Vector Store Config",
    serde_json::to_value(&config).unwrap_or_default(),
  ));

  let query_prompt = QUERY_GEN_TEMPLATE.replace("{input}", user_prompt);
  let search_query = chat.complete(&query_prompt).await?;
  let search_query = search_query.trim();
  debug!(search_query, "generated retrieval query");

  parts.debug_logs.push(DebugLog::new(
    DebugKind::Intermediate,
    "Generated Search Query",
    search_query,
  ));

  let vector = embed(http, options, search_query, config.dimensions()).await?;
  let docs = match &config {
    VectorStoreConfig::Pinecone {
      index_name,
      namespace,
      ..
    } => pinecone_search(http, options, index_name, namespace.as_deref(), &vector, config.top_k()).await?,
    VectorStoreConfig::Qdrant {
      collection_name,
      url,
      ..
    } => qdrant_search(http, options, url, collection_name, &vector, config.top_k()).await?,
  };

  parts.debug_logs.push(DebugLog::new(
    DebugKind::Intermediate,
    "Retrieved Documents",
    serde_json::json!(
      docs
        .iter()
        .map(|d| serde_json::json!({ "content": d.content, "metadata": d.metadata }))
        .collect::<Vec<_>>()
    ),
  ));

  if docs.is_empty() {
    warn!("vector store returned no documents, using fallback template");
    parts.template = NO_RESULTS_TEMPLATE.to_string();
  } else {
    parts.template = RAG_TEMPLATE.to_string();
    parts.values.insert("docs".to_string(), format_docs(&docs));
  }
  parts
    .values
    .insert("input".to_string(), user_prompt.to_string());

  Ok(())
}

/// Embed a query. 1024-dimension stores use the multilingual e5 model via
/// the HuggingFace inference API; everything else goes through OpenAI.
async fn embed(
  http: &reqwest::Client,
  options: &InitOptions,
  text: &str,
  dimensions: u32,
) -> Result<Vec<f32>, NodeError> {
  if dimensions == 1024 {
    let api_key = options.require_credential("HUGGINGFACE_API_KEY")?;
    let response = http
      .post(HUGGINGFACE_E5_URL)
      .bearer_auth(api_key)
      .json(&serde_json::json!({ "inputs": [text] }))
      .send()
      .await
      .map_err(|e| NodeError::execution(format!("embedding request failed: {e}")))?;
    let vectors: Vec<Vec<f32>> = response
      .error_for_status()
      .map_err(|e| NodeError::execution(format!("embedding request failed: {e}")))?
      .json()
      .await
      .map_err(|e| NodeError::execution(format!("invalid embedding response: {e}")))?;
    vectors
      .into_iter()
      .next()
      .ok_or_else(|| NodeError::execution("embedding response was empty"))
  } else {
    let api_key = options.require_credential("OPENAI_API_KEY")?;

    #[derive(Deserialize)]
    struct EmbeddingsResponse {
      data: Vec<EmbeddingRow>,
    }
    #[derive(Deserialize)]
    struct EmbeddingRow {
      embedding: Vec<f32>,
    }

    let response = http
      .post(OPENAI_EMBEDDINGS_URL)
      .bearer_auth(api_key)
      .json(&serde_json::json!({
        "input": text,
        "model": "text-embedding-ada-002",
      }))
      .send()
      .await
      .map_err(|e| NodeError::execution(format!("embedding request failed: {e}")))?;
    let body: EmbeddingsResponse = response
      .error_for_status()
      .map_err(|e| NodeError::execution(format!("embedding request failed: {e}")))?
      .json()
      .await
      .map_err(|e| NodeError::execution(format!("invalid embedding response: {e}")))?;
    body
      .data
      .into_iter()
      .next()
      .map(|row| row.embedding)
      .ok_or_else(|| NodeError::execution("embedding response was empty"))
  }
}

async fn pinecone_search(
  http: &reqwest::Client,
  options: &InitOptions,
  index_name: &str,
  namespace: Option<&str>,
  vector: &[f32],
  top_k: u32,
) -> Result<Vec<RetrievedDoc>, NodeError> {
  let api_key = options.require_credential("PINECONE_API_KEY")?;

  #[derive(Deserialize)]
  struct IndexDescription {
    host: String,
  }

  let description: IndexDescription = http
    .get(format!("{PINECONE_CONTROL_URL}/{index_name}"))
    .header("Api-Key", api_key)
    .send()
    .await
    .map_err(|e| NodeError::execution(format!("pinecone index lookup failed: {e}")))?
    .error_for_status()
    .map_err(|e| NodeError::execution(format!("pinecone index lookup failed: {e}")))?
    .json()
    .await
    .map_err(|e| NodeError::execution(format!("invalid pinecone index description: {e}")))?;

  let mut body = serde_json::json!({
    "vector": vector,
    "topK": top_k,
    "includeMetadata": true,
  });
  if let Some(namespace) = namespace {
    body["namespace"] = serde_json::json!(namespace);
  }

  #[derive(Deserialize)]
  struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
  }
  #[derive(Deserialize)]
  struct QueryMatch {
    #[serde(default)]
    metadata: serde_json::Value,
  }

  let response: QueryResponse = http
    .post(format!("https://{}/query", description.host))
    .header("Api-Key", api_key)
    .json(&body)
    .send()
    .await
    .map_err(|e| NodeError::execution(format!("pinecone query failed: {e}")))?
    .error_for_status()
    .map_err(|e| NodeError::execution(format!("pinecone query failed: {e}")))?
    .json()
    .await
    .map_err(|e| NodeError::execution(format!("invalid pinecone query response: {e}")))?;

  Ok(
    response
      .matches
      .into_iter()
      .map(|m| {
        let content = m
          .metadata
          .get("text")
          .and_then(|v| v.as_str())
          .unwrap_or_default()
          .to_string();
        RetrievedDoc {
          content,
          metadata: m.metadata,
        }
      })
      .collect(),
  )
}

async fn qdrant_search(
  http: &reqwest::Client,
  options: &InitOptions,
  base_url: &str,
  collection_name: &str,
  vector: &[f32],
  top_k: u32,
) -> Result<Vec<RetrievedDoc>, NodeError> {
  let api_key = options.require_credential("QDRANT_API_KEY")?;

  #[derive(Deserialize)]
  struct SearchResponse {
    #[serde(default)]
    result: Vec<ScoredPoint>,
  }
  #[derive(Deserialize)]
  struct ScoredPoint {
    #[serde(default)]
    payload: serde_json::Value,
  }

  let url = format!(
    "{}/collections/{collection_name}/points/search",
    base_url.trim_end_matches('/')
  );
  let response: SearchResponse = http
    .post(url)
    .header("api-key", api_key)
    .json(&serde_json::json!({
      "vector": vector,
      "limit": top_k,
      "with_payload": true,
    }))
    .send()
    .await
    .map_err(|e| NodeError::execution(format!("qdrant query failed: {e}")))?
    .error_for_status()
    .map_err(|e| NodeError::execution(format!("qdrant query failed: {e}")))?
    .json()
    .await
    .map_err(|e| NodeError::execution(format!("invalid qdrant query response: {e}")))?;

  Ok(
    response
      .result
      .into_iter()
      .map(|p| {
        let content = p
          .payload
          .get("content")
          .or_else(|| p.payload.get("page_content"))
          .and_then(|v| v.as_str())
          .unwrap_or_default()
          .to_string();
        RetrievedDoc {
          content,
          metadata: p.payload,
        }
      })
      .collect(),
  )
}

/// Render retrieved documents for the prompt: title line when present, then
/// body text, then remaining metadata as `key: value` lines.
fn format_docs(docs: &[RetrievedDoc]) -> String {
  docs
    .iter()
    .map(|doc| {
      let mut lines = Vec::new();
      if let Some(title) = doc.metadata.get("title").and_then(|v| v.as_str()) {
        lines.push(format!("Title: {title}"));
      }
      if !doc.content.is_empty() {
        lines.push(doc.content.clone());
      }
      if let Some(map) = doc.metadata.as_object() {
        for (key, value) in map {
          if key == "title" || key == "text" || key == "content" || key == "page_content" {
            continue;
          }
          let text = match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
          };
          lines.push(format!("{key}: {text}"));
        }
      }
      lines.join("\n")
    })
    .collect::<Vec<_>>()
    .join("\n\n")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn pinecone_config_round_trips() {
    let json = r#"{"type":"pinecone","indexName":"movies","topK":5,"dimensions":1536}"#;
    let config: VectorStoreConfig = serde_json::from_str(json).unwrap();
    match &config {
      VectorStoreConfig::Pinecone {
        index_name, top_k, ..
      } => {
        assert_eq!(index_name, "movies");
        assert_eq!(*top_k, 5);
      }
      other => panic!("expected pinecone config, got {other:?}"),
    }
  }

  #[test]
  fn qdrant_config_defaults_top_k() {
    let json = r#"{"type":"qdrant","collectionName":"kb","url":"https://q.example.com"}"#;
    let config: VectorStoreConfig = serde_json::from_str(json).unwrap();
    assert_eq!(config.top_k(), 3);
    assert_eq!(config.dimensions(), 1536);
  }

  #[test]
  fn format_docs_includes_title_and_metadata() {
    let docs = vec![RetrievedDoc {
      content: "A detective story.".to_string(),
      metadata: serde_json::json!({ "title": "Noir", "year": 1982 }),
    }];
    let text = format_docs(&docs);
    assert!(text.contains("Title: Noir"));
    assert!(text.contains("A detective story."));
    assert!(text.contains("year: 1982"));
  }
}
