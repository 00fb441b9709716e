//! Shared application state and persistence traits.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use pylon_engine::{Coordinator, RunRequest};
use pylon_nodes::NodeRegistry;

/// A deployed flow: the graph plus the owner's resolved credentials.
///
/// Credentials are attached by whatever populates the store (a database
/// layer, a config file); the server only threads them into the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
  pub id: String,
  pub user_id: String,
  pub name: String,
  pub flow: RunRequest,
  #[serde(default)]
  pub credentials: HashMap<String, String>,
}

/// Lookup capability for deployments.
#[async_trait]
pub trait DeploymentStore: Send + Sync {
  async fn get(&self, deployment_id: &str) -> Option<Deployment>;
}

/// Maps an API key to the user id it belongs to.
#[async_trait]
pub trait ApiKeyStore: Send + Sync {
  async fn user_for_key(&self, key: &str) -> Option<String>;
}

/// In-memory store backing tests and the CLI.
#[derive(Default)]
pub struct MemoryStore {
  deployments: RwLock<HashMap<String, Deployment>>,
  keys: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert_deployment(&self, deployment: Deployment) {
    let mut deployments = self.deployments.write().expect("deployment lock poisoned");
    deployments.insert(deployment.id.clone(), deployment);
  }

  pub fn insert_key(&self, key: impl Into<String>, user_id: impl Into<String>) {
    let mut keys = self.keys.write().expect("key lock poisoned");
    keys.insert(key.into(), user_id.into());
  }
}

#[async_trait]
impl DeploymentStore for MemoryStore {
  async fn get(&self, deployment_id: &str) -> Option<Deployment> {
    let deployments = self.deployments.read().expect("deployment lock poisoned");
    deployments.get(deployment_id).cloned()
  }
}

#[async_trait]
impl ApiKeyStore for MemoryStore {
  async fn user_for_key(&self, key: &str) -> Option<String> {
    let keys = self.keys.read().expect("key lock poisoned");
    keys.get(key).cloned()
  }
}

/// Shared application state for axum handlers.
pub struct AppState {
  pub registry: Arc<NodeRegistry>,
  pub coordinator: Coordinator,
  pub deployments: Arc<dyn DeploymentStore>,
  pub api_keys: Arc<dyn ApiKeyStore>,
}

impl AppState {
  pub fn new(
    registry: Arc<NodeRegistry>,
    deployments: Arc<dyn DeploymentStore>,
    api_keys: Arc<dyn ApiKeyStore>,
  ) -> Self {
    Self {
      coordinator: Coordinator::new(registry.clone()),
      registry,
      deployments,
      api_keys,
    }
  }
}
