//! Vector store config nodes.
//!
//! These only materialize a configuration value; the retrieval itself runs
//! inside the LLM node that receives the config on its `vectorstore` handle.

mod pinecone;
mod qdrant;

pub use pinecone::PineconeNode;
pub use qdrant::QdrantNode;
