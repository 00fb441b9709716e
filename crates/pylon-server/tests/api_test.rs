//! End-to-end API tests against a real listener.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::TcpListener;

use pylon_engine::RunRequest;
use pylon_graph::{Node, NodeData};
use pylon_nodes::{
  ExecutionContext, ExecutionOutput, ExecutorNode, InitOptions, Inputs, NodeCategory, NodeError,
  NodeRegistry, NodeSchema, OutputKind,
};
use pylon_server::{AppState, Deployment, MemoryStore, router};

/// Emits the node's `value` parameter.
struct EmitNode;

#[async_trait]
impl ExecutorNode for EmitNode {
  type Instance = ();

  async fn initialize(&self, _: &NodeData, _: &InitOptions) -> Result<(), NodeError> {
    Ok(())
  }

  async fn execute(
    &self,
    _: (),
    data: &NodeData,
    _: &Inputs,
    _: &ExecutionContext,
  ) -> Result<ExecutionOutput, NodeError> {
    Ok(ExecutionOutput::new(
      data.string_parameter("value").unwrap_or("default"),
    ))
  }
}

/// Echoes the webhook payload as a JSON string.
struct WebhookEchoNode;

#[async_trait]
impl ExecutorNode for WebhookEchoNode {
  type Instance = ();

  async fn initialize(&self, _: &NodeData, _: &InitOptions) -> Result<(), NodeError> {
    Ok(())
  }

  async fn execute(
    &self,
    _: (),
    _: &NodeData,
    _: &Inputs,
    context: &ExecutionContext,
  ) -> Result<ExecutionOutput, NodeError> {
    let payload = context
      .webhook_data
      .clone()
      .unwrap_or(serde_json::Value::Null);
    Ok(ExecutionOutput::new(payload.to_string()))
  }
}

fn test_registry() -> NodeRegistry {
  let mut registry = NodeRegistry::new();
  registry.register(NodeSchema::executor(
    "emit",
    "Emit",
    "test node",
    NodeCategory::Tools,
    &[],
    &[OutputKind::Text],
    EmitNode,
  ));
  registry.register(NodeSchema::executor(
    "webhook-echo",
    "Webhook Echo",
    "test node",
    NodeCategory::Tools,
    &[],
    &[OutputKind::Json],
    WebhookEchoNode,
  ));
  registry
}

fn emit_flow(value: &str) -> RunRequest {
  let mut parameters = HashMap::new();
  parameters.insert("value".to_string(), serde_json::json!(value));
  RunRequest {
    nodes: vec![Node {
      id: "a".to_string(),
      node_type: "emit".to_string(),
      data: NodeData {
        parameters,
        label: "A".to_string(),
      },
    }],
    edges: Vec::new(),
    execution_steps: Vec::new(),
  }
}

async fn start_server() -> String {
  let store = Arc::new(MemoryStore::new());
  store.insert_key("key-1", "user-1");
  store.insert_key("key-2", "user-2");
  store.insert_deployment(Deployment {
    id: "dep-1".to_string(),
    user_id: "user-1".to_string(),
    name: "greeting".to_string(),
    flow: emit_flow("hello from deployment"),
    credentials: HashMap::new(),
  });
  store.insert_deployment(Deployment {
    id: "dep-hook".to_string(),
    user_id: "user-1".to_string(),
    name: "echo".to_string(),
    flow: RunRequest {
      nodes: vec![Node {
        id: "w".to_string(),
        node_type: "webhook-echo".to_string(),
        data: NodeData::default(),
      }],
      edges: Vec::new(),
      execution_steps: Vec::new(),
    },
    credentials: HashMap::new(),
  });

  let state = Arc::new(AppState::new(
    Arc::new(test_registry()),
    store.clone(),
    store,
  ));
  let app = router(state);

  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move {
    axum::serve(listener, app).await.unwrap();
  });
  format!("http://{addr}")
}

#[tokio::test]
async fn health_reports_ok() {
  let base = start_server().await;
  let body: serde_json::Value = reqwest::get(format!("{base}/api/health"))
    .await
    .unwrap()
    .json()
    .await
    .unwrap();
  assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn execute_streams_step_frames_and_completes() {
  let base = start_server().await;
  let response = reqwest::Client::new()
    .post(format!("{base}/api/execute"))
    .json(&serde_json::json!({
      "nodes": [{
        "id": "a",
        "type": "emit",
        "data": { "label": "A", "parameters": { "value": "streamed" } }
      }],
      "edges": []
    }))
    .send()
    .await
    .unwrap();

  assert_eq!(response.status(), 200);
  assert_eq!(
    response.headers()["content-type"].to_str().unwrap(),
    "text/event-stream"
  );

  let body = response.text().await.unwrap();
  let frames: Vec<serde_json::Value> = body
    .lines()
    .filter_map(|l| l.strip_prefix("data: "))
    .map(|l| serde_json::from_str(l).unwrap())
    .collect();

  assert!(frames.iter().any(|f| f["type"] == "step"
    && f["step"]["status"] == "completed"
    && f["step"]["result"] == "streamed"));
  assert_eq!(frames.last().unwrap()["type"], "complete");
}

#[tokio::test]
async fn execute_rejects_unknown_node_types_with_400() {
  let base = start_server().await;
  let response = reqwest::Client::new()
    .post(format!("{base}/api/execute"))
    .json(&serde_json::json!({
      "nodes": [{ "id": "a", "type": "nope", "data": {} }],
      "edges": []
    }))
    .send()
    .await
    .unwrap();
  assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn execute_rejects_cyclic_graphs_with_400() {
  let base = start_server().await;
  let response = reqwest::Client::new()
    .post(format!("{base}/api/execute"))
    .json(&serde_json::json!({
      "nodes": [
        { "id": "a", "type": "emit", "data": {} },
        { "id": "b", "type": "emit", "data": {} }
      ],
      "edges": [
        { "id": "e1", "source": "a", "target": "b", "targetHandle": "context" },
        { "id": "e2", "source": "b", "target": "a", "targetHandle": "context" }
      ]
    }))
    .send()
    .await
    .unwrap();
  assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn run_deployment_requires_an_api_key() {
  let base = start_server().await;
  let client = reqwest::Client::new();

  let response = client
    .post(format!("{base}/api/run/dep-1"))
    .send()
    .await
    .unwrap();
  assert_eq!(response.status(), 401);

  let response = client
    .post(format!("{base}/api/run/dep-1"))
    .header("x-api-key", "wrong")
    .send()
    .await
    .unwrap();
  assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn run_deployment_returns_the_reduced_output() {
  let base = start_server().await;
  let response = reqwest::Client::new()
    .post(format!("{base}/api/run/dep-1"))
    .header("x-api-key", "key-1")
    .send()
    .await
    .unwrap();
  assert_eq!(response.status(), 200);
  let body: serde_json::Value = response.json().await.unwrap();
  assert_eq!(body["output"], "hello from deployment");
}

#[tokio::test]
async fn unknown_or_foreign_deployments_are_404() {
  let base = start_server().await;
  let client = reqwest::Client::new();

  let response = client
    .post(format!("{base}/api/run/missing"))
    .header("x-api-key", "key-1")
    .send()
    .await
    .unwrap();
  assert_eq!(response.status(), 404);

  // A valid key that does not own the deployment sees the same 404.
  let response = client
    .post(format!("{base}/api/run/dep-1"))
    .header("x-api-key", "key-2")
    .send()
    .await
    .unwrap();
  assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn webhook_injects_the_body_and_returns_parsed_json() {
  let base = start_server().await;
  let response = reqwest::Client::new()
    .post(format!("{base}/api/webhook/dep-hook"))
    .header("x-api-key", "key-1")
    .json(&serde_json::json!({ "question": "why" }))
    .send()
    .await
    .unwrap();
  assert_eq!(response.status(), 200);
  let body: serde_json::Value = response.json().await.unwrap();
  assert_eq!(body["output"], serde_json::json!({ "question": "why" }));
}
