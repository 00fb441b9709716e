//! Pylon Nodes
//!
//! This crate defines the uniform node contract every node type implements,
//! the process-wide registry the engine looks node types up in, and the
//! built-in node set: LLM executors (OpenAI, Anthropic, Meta), vector store
//! config nodes (Pinecone, Qdrant), and the API input/output adapters.
//!
//! The contract has two shapes, enforced by the type system:
//! - [`ExecutorNode`]: `initialize` builds a typed instance, `execute`
//!   consumes it and produces a string result.
//! - [`ConfigNode`]: `initialize` only; the JSON value it materializes is
//!   stored as the node's result so downstream edges consume it like any
//!   executor output.
//!
//! The registry is an injected dependency, not a singleton: the engine takes
//! an `Arc<NodeRegistry>`, so tests run against hand-built registries.

pub mod api;
mod context;
mod debug;
mod error;
pub mod llm;
mod prompt;
mod registry;
mod retrieval;
mod schema;
pub mod vectorstore;

pub use context::{ExecutionContext, RunSource};
pub use debug::{DebugKind, DebugLog};
pub use error::NodeError;
pub use prompt::PromptParts;
pub use registry::NodeRegistry;
pub use retrieval::VectorStoreConfig;
pub use schema::{
  ConfigNode, DynExecutor, ExecutionOutput, ExecutorNode, InitOptions, InputHandle, InputSpec,
  Inputs, NodeBehavior, NodeCategory, NodeRole, NodeSchema, OutputKind,
};
