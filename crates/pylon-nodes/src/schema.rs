//! The uniform node contract.
//!
//! Every node type registers a [`NodeSchema`]: its type tag, the input
//! handles it accepts, the output kinds it produces, and a behavior. The
//! behavior is a tagged variant with two shapes so "config nodes have no
//! execute" is guaranteed statically rather than checked at run time.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use pylon_graph::NodeData;

use crate::context::ExecutionContext;
use crate::debug::DebugLog;
use crate::error::NodeError;

/// Named input slots a node can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputHandle {
  Prompt,
  Context,
  Memory,
  Vectorstore,
}

impl InputHandle {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Prompt => "prompt",
      Self::Context => "context",
      Self::Memory => "memory",
      Self::Vectorstore => "vectorstore",
    }
  }
}

/// Declaration of one accepted input handle.
#[derive(Debug, Clone, Copy)]
pub struct InputSpec {
  pub handle: InputHandle,
  pub required: bool,
  pub advanced: bool,
  pub description: &'static str,
}

impl InputSpec {
  pub const fn optional(handle: InputHandle, description: &'static str) -> Self {
    Self {
      handle,
      required: false,
      advanced: false,
      description,
    }
  }

  pub const fn required(handle: InputHandle, description: &'static str) -> Self {
    Self {
      handle,
      required: true,
      advanced: false,
      description,
    }
  }

  pub const fn advanced(handle: InputHandle, description: &'static str) -> Self {
    Self {
      handle,
      required: false,
      advanced: true,
      description,
    }
  }
}

/// Output kinds a node can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
  Text,
  Json,
  Embedding,
  VectorstoreConfig,
  MemoryConfig,
}

/// Sidebar category a node type belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeCategory {
  Llm,
  Memory,
  Vectorstore,
  Tools,
  Output,
}

/// Whether a node executes work or only materializes configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
  Executor,
  Config,
}

/// Caller-resolved secrets injected into every `initialize`.
///
/// A flat `ENV_KEY -> value` map; the engine threads it through and never
/// persists it.
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
  pub credentials: HashMap<String, String>,
}

impl InitOptions {
  pub fn new(credentials: HashMap<String, String>) -> Self {
    Self { credentials }
  }

  pub fn credential(&self, key: &str) -> Option<&str> {
    self.credentials.get(key).map(|v| v.as_str())
  }

  /// Look up a credential, failing with a configuration error if absent.
  pub fn require_credential(&self, key: &str) -> Result<&str, NodeError> {
    self
      .credential(key)
      .ok_or_else(|| NodeError::configuration(format!("missing required credential: {key}")))
  }
}

/// Resolved input values for one dispatch, keyed by handle name.
///
/// Handles that received no edges are simply absent; nodes default them.
#[derive(Debug, Clone, Default)]
pub struct Inputs {
  values: HashMap<String, String>,
}

impl Inputs {
  pub fn new(values: HashMap<String, String>) -> Self {
    Self { values }
  }

  pub fn get(&self, handle: InputHandle) -> Option<&str> {
    self.get_named(handle.as_str())
  }

  pub fn get_named(&self, handle: &str) -> Option<&str> {
    self.values.get(handle).map(|v| v.as_str())
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }
}

impl From<HashMap<String, String>> for Inputs {
  fn from(values: HashMap<String, String>) -> Self {
    Self { values }
  }
}

/// What a successful `execute` produces: the result string plus any debug
/// records collected along the way.
#[derive(Debug, Clone)]
pub struct ExecutionOutput {
  pub value: String,
  pub debug_logs: Vec<DebugLog>,
}

impl ExecutionOutput {
  pub fn new(value: impl Into<String>) -> Self {
    Self {
      value: value.into(),
      debug_logs: Vec::new(),
    }
  }

  pub fn with_logs(value: impl Into<String>, debug_logs: Vec<DebugLog>) -> Self {
    Self {
      value: value.into(),
      debug_logs,
    }
  }
}

impl From<String> for ExecutionOutput {
  fn from(value: String) -> Self {
    Self::new(value)
  }
}

/// A node type that performs work.
///
/// `initialize` is pure setup: it builds the typed `Instance` (clients,
/// parsed parameters) from node data and injected credentials, with no side
/// effects beyond construction. `execute` consumes the instance together
/// with the resolved inputs and produces the node's result.
#[async_trait]
pub trait ExecutorNode: Send + Sync + 'static {
  type Instance: Send;

  async fn initialize(
    &self,
    data: &NodeData,
    options: &InitOptions,
  ) -> Result<Self::Instance, NodeError>;

  async fn execute(
    &self,
    instance: Self::Instance,
    data: &NodeData,
    inputs: &Inputs,
    context: &ExecutionContext,
  ) -> Result<ExecutionOutput, NodeError>;
}

/// A node type that only materializes a configuration value.
///
/// The returned JSON is stringified and stored as the node's result, so
/// downstream edges consume it exactly like an executor's output.
#[async_trait]
pub trait ConfigNode: Send + Sync + 'static {
  async fn initialize(
    &self,
    data: &NodeData,
    options: &InitOptions,
  ) -> Result<serde_json::Value, NodeError>;
}

/// Object-safe dispatch surface for executor nodes.
///
/// The blanket impl erases the typed `Instance` by running `initialize` and
/// `execute` back to back, which is the only sequence the engine ever needs.
#[async_trait]
pub trait DynExecutor: Send + Sync {
  async fn dispatch(
    &self,
    data: &NodeData,
    inputs: &Inputs,
    context: &ExecutionContext,
    options: &InitOptions,
  ) -> Result<ExecutionOutput, NodeError>;
}

#[async_trait]
impl<T: ExecutorNode> DynExecutor for T {
  async fn dispatch(
    &self,
    data: &NodeData,
    inputs: &Inputs,
    context: &ExecutionContext,
    options: &InitOptions,
  ) -> Result<ExecutionOutput, NodeError> {
    let instance = self.initialize(data, options).await?;
    self.execute(instance, data, inputs, context).await
  }
}

/// The two shapes a registered node type can take.
#[derive(Clone)]
pub enum NodeBehavior {
  Executor(Arc<dyn DynExecutor>),
  Config(Arc<dyn ConfigNode>),
}

/// Static descriptor for one registered node type.
#[derive(Clone)]
pub struct NodeSchema {
  pub node_type: &'static str,
  pub name: &'static str,
  pub description: &'static str,
  pub category: NodeCategory,
  pub inputs: &'static [InputSpec],
  pub outputs: &'static [OutputKind],
  pub behavior: NodeBehavior,
}

impl NodeSchema {
  pub fn executor(
    node_type: &'static str,
    name: &'static str,
    description: &'static str,
    category: NodeCategory,
    inputs: &'static [InputSpec],
    outputs: &'static [OutputKind],
    node: impl ExecutorNode,
  ) -> Self {
    Self {
      node_type,
      name,
      description,
      category,
      inputs,
      outputs,
      behavior: NodeBehavior::Executor(Arc::new(node)),
    }
  }

  pub fn config(
    node_type: &'static str,
    name: &'static str,
    description: &'static str,
    category: NodeCategory,
    inputs: &'static [InputSpec],
    outputs: &'static [OutputKind],
    node: impl ConfigNode,
  ) -> Self {
    Self {
      node_type,
      name,
      description,
      category,
      inputs,
      outputs,
      behavior: NodeBehavior::Config(Arc::new(node)),
    }
  }

  pub fn role(&self) -> NodeRole {
    match self.behavior {
      NodeBehavior::Executor(_) => NodeRole::Executor,
      NodeBehavior::Config(_) => NodeRole::Config,
    }
  }

  pub fn is_executor(&self) -> bool {
    self.role() == NodeRole::Executor
  }
}

impl std::fmt::Debug for NodeSchema {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("NodeSchema")
      .field("node_type", &self.node_type)
      .field("role", &self.role())
      .finish_non_exhaustive()
  }
}
