//! The level-driven execution coordinator.
//!
//! A run plans levels over the flow graph, then executes one level at a
//! time: every node in the level is dispatched concurrently, and the
//! coordinator joins on all of them before the next level starts. That
//! barrier is the only ordering guarantee between nodes, and it is enough:
//! every predecessor of a level-N node has terminated before the node runs.
//!
//! Node failures are isolated. A failed node records an `error` step and
//! stores no result, so downstream nodes simply see that handle as absent.
//! Only structural problems abort the run before any level executes.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use pylon_graph::{Edge, Graph, LevelPlan, Node};
use pylon_nodes::{
  ExecutionContext, ExecutionOutput, InitOptions, Inputs, NodeBehavior, NodeError, NodeRegistry,
  RunSource,
};

use crate::error::EngineError;
use crate::events::{ProgressEvent, ProgressNotifier};
use crate::inputs::resolve_inputs;
use crate::step::{CANCELLED_MESSAGE, ExecutionStep};

/// A flow execution request: the graph plus optional pre-assigned steps.
///
/// `execution_steps` lets a caller carry over step ids it created ahead of
/// the run (matched by `nodeId`); the engine generates fresh ids otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
  pub nodes: Vec<Node>,
  pub edges: Vec<Edge>,
  #[serde(default)]
  pub execution_steps: Vec<ExecutionStep>,
}

/// Per-run options threaded through every dispatch.
///
/// Credentials are resolved by the caller and never persisted here.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
  pub credentials: HashMap<String, String>,
  pub context: ExecutionContext,
}

impl RunOptions {
  pub fn new(credentials: HashMap<String, String>, context: ExecutionContext) -> Self {
    Self {
      credentials,
      context,
    }
  }
}

/// What a finished run produces.
#[derive(Debug, Clone)]
pub struct RunOutcome {
  /// Result string per node id, for every node that completed.
  pub results: HashMap<String, String>,
  /// Terminal-node outputs reduced to a single value.
  pub output: serde_json::Value,
}

/// Executes flows against an injected node registry.
pub struct Coordinator {
  registry: Arc<NodeRegistry>,
}

impl Coordinator {
  pub fn new(registry: Arc<NodeRegistry>) -> Self {
    Self { registry }
  }

  /// Execute a flow, emitting progress through `notifier`.
  ///
  /// Returns `Err` only for structural failures and cancellation; node-level
  /// failures are recorded on their steps and the run still completes.
  pub async fn execute<N: ProgressNotifier>(
    &self,
    request: &RunRequest,
    options: &RunOptions,
    cancel: CancellationToken,
    notifier: &N,
  ) -> Result<RunOutcome, EngineError> {
    let execution_id = uuid::Uuid::new_v4().to_string();

    // Every node type must be known before anything runs.
    let mut behaviors: HashMap<String, NodeBehavior> = HashMap::new();
    let mut names: HashMap<String, String> = HashMap::new();
    for node in &request.nodes {
      let schema =
        self
          .registry
          .get(&node.node_type)
          .ok_or_else(|| EngineError::UnknownNodeType {
            node_id: node.id.clone(),
            node_type: node.node_type.clone(),
          })?;
      behaviors.insert(node.id.clone(), schema.behavior.clone());
      let name = if node.data.label.is_empty() {
        schema.name.to_string()
      } else {
        node.data.label.clone()
      };
      names.insert(node.id.clone(), name);
    }

    let plan = LevelPlan::compute(&request.nodes, &request.edges)?;
    info!(
      %execution_id,
      nodes = request.nodes.len(),
      levels = plan.len(),
      "starting flow execution"
    );

    // One pending step per executor node; pre-assigned ids are honored.
    let mut steps: HashMap<String, ExecutionStep> = HashMap::new();
    for node in &request.nodes {
      if !matches!(behaviors[&node.id], NodeBehavior::Executor(_)) {
        continue;
      }
      let name = names[&node.id].clone();
      let step = match request
        .execution_steps
        .iter()
        .find(|s| s.node_id == node.id)
      {
        Some(assigned) => {
          let mut step = ExecutionStep::pending(&node.id, name);
          step.id = assigned.id.clone();
          step
        }
        None => ExecutionStep::pending(&node.id, name),
      };
      steps.insert(node.id.clone(), step);
    }

    let node_map: HashMap<&str, &Node> = request.nodes.iter().map(|n| (n.id.as_str(), n)).collect();
    let mut results: HashMap<String, String> = HashMap::new();

    for (level, node_ids) in plan.iter() {
      if cancel.is_cancelled() {
        info!(%execution_id, level, "run cancelled at level boundary");
        abort_pending_steps(&mut steps, notifier);
        return Err(EngineError::Cancelled);
      }

      debug!(%execution_id, level, nodes = node_ids.len(), "dispatching level");
      let mut handles = Vec::with_capacity(node_ids.len());

      for node_id in node_ids {
        let node = (*node_map
          .get(node_id.as_str())
          .expect("planned node missing from node map"))
        .clone();
        let behavior = behaviors[node_id].clone();
        let inputs = resolve_inputs(node_id, &request.edges, &results);
        let init_options = InitOptions::new(options.credentials.clone());
        let context = options.context.clone();

        if let Some(step) = steps.get_mut(node_id) {
          step.mark_running();
          notifier.notify(ProgressEvent::Step { step: step.clone() });
        }

        handles.push(tokio::spawn(async move {
          let outcome = dispatch(&behavior, &node, &inputs, &context, &init_options).await;
          (node.id, outcome)
        }));
      }

      // Join barrier: every dispatch in the level terminates before the
      // next level starts.
      for joined in futures::future::join_all(handles).await {
        let (node_id, outcome) = match joined {
          Ok(pair) => pair,
          Err(join_err) => {
            warn!(%execution_id, error = %join_err, "node task join failed");
            continue;
          }
        };

        match outcome {
          Ok(output) => {
            debug!(%execution_id, %node_id, "node completed");
            if let Some(step) = steps.get_mut(&node_id) {
              step.mark_completed(output.value.clone(), output.debug_logs);
              notifier.notify(ProgressEvent::Step { step: step.clone() });
            }
            results.insert(node_id, output.value);
          }
          Err(err) => {
            warn!(%execution_id, %node_id, error = %err, "node failed");
            if let Some(step) = steps.get_mut(&node_id) {
              step.mark_errored(err.to_string());
              notifier.notify(ProgressEvent::Step { step: step.clone() });
            }
            // No result is stored; downstream handles stay unresolved.
          }
        }
      }
    }

    notifier.notify(ProgressEvent::Complete);
    info!(%execution_id, completed = results.len(), "flow execution finished");

    let output = reduce_output(&request.nodes, &request.edges, &results, &options.context);
    Ok(RunOutcome { results, output })
  }
}

/// Run one node through its contract.
async fn dispatch(
  behavior: &NodeBehavior,
  node: &Node,
  inputs: &Inputs,
  context: &ExecutionContext,
  options: &InitOptions,
) -> Result<ExecutionOutput, NodeError> {
  match behavior {
    NodeBehavior::Executor(executor) => {
      executor.dispatch(&node.data, inputs, context, options).await
    }
    // Config nodes only initialize; the JSON value they materialize is
    // stored as their result for downstream edges.
    NodeBehavior::Config(config) => {
      let value = config.initialize(&node.data, options).await?;
      Ok(ExecutionOutput::new(value.to_string()))
    }
  }
}

/// Force every non-terminal step to `error` with the cancellation message.
fn abort_pending_steps<N: ProgressNotifier>(
  steps: &mut HashMap<String, ExecutionStep>,
  notifier: &N,
) {
  for step in steps.values_mut() {
    if !step.status.is_terminal() {
      step.mark_errored(CANCELLED_MESSAGE);
      notifier.notify(ProgressEvent::Step { step: step.clone() });
    }
  }
}

/// Reduce terminal-node results to the single value non-streaming callers get.
///
/// Webhook runs attempt to parse the last terminal result as JSON so API
/// callers receive a structured body; everything else is a newline join.
fn reduce_output(
  nodes: &[Node],
  edges: &[Edge],
  results: &HashMap<String, String>,
  context: &ExecutionContext,
) -> serde_json::Value {
  let graph = Graph::new(nodes, edges);
  let terminal: Vec<&str> = graph
    .terminal_nodes()
    .into_iter()
    .filter(|id| results.contains_key(*id))
    .collect();

  if context.source == RunSource::Webhook {
    if let Some(last) = terminal.last() {
      let raw = &results[*last];
      return serde_json::from_str(raw)
        .unwrap_or_else(|_| serde_json::Value::String(raw.clone()));
    }
  }

  let joined = terminal
    .iter()
    .map(|id| results[*id].as_str())
    .collect::<Vec<_>>()
    .join("\n");
  serde_json::Value::String(joined)
}
