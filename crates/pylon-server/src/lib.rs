//! Pylon Server
//!
//! The axum HTTP surface over the flow engine: a streaming interactive run
//! endpoint, deployment invocation by API key, and a webhook variant that
//! injects the inbound body into the run.
//!
//! Persistence stays behind the [`DeploymentStore`] and [`ApiKeyStore`]
//! traits; the in-memory implementation backs tests and the CLI.

pub mod error;
pub mod routes;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use server::{router, serve};
pub use state::{ApiKeyStore, AppState, Deployment, DeploymentStore, MemoryStore};
