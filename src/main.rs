use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use pylon_engine::{ChannelNotifier, Coordinator, RunOptions, RunRequest};
use pylon_nodes::{ExecutionContext, NodeRegistry};
use pylon_server::{AppState, Deployment, MemoryStore};

/// Pylon - a flow graph execution engine
#[derive(Parser)]
#[command(name = "pylon")]
#[command(version, about, long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Start the HTTP server
  Serve {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:3001")]
    bind: String,

    /// Path to a JSON file seeding deployments and API keys
    #[arg(long)]
    deployments: Option<PathBuf>,
  },

  /// Execute a flow from a file, streaming progress to stderr
  Run {
    /// Path to the flow file (JSON)
    flow_file: PathBuf,

    /// Credential entry as KEY=VALUE, repeatable
    #[arg(long = "credential", value_name = "KEY=VALUE")]
    credentials: Vec<String>,
  },
}

/// Seed file layout for `serve --deployments`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeedFile {
  #[serde(default)]
  deployments: Vec<Deployment>,
  #[serde(default)]
  api_keys: HashMap<String, String>,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let cli = Cli::parse();

  match cli.command {
    Some(Commands::Serve { bind, deployments }) => serve(bind, deployments)?,
    Some(Commands::Run {
      flow_file,
      credentials,
    }) => run_flow(flow_file, credentials)?,
    None => {
      println!("pylon - use --help to see available commands");
    }
  }

  Ok(())
}

fn serve(bind: String, deployments: Option<PathBuf>) -> Result<()> {
  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async { serve_async(bind, deployments).await })
}

async fn serve_async(bind: String, deployments: Option<PathBuf>) -> Result<()> {
  let store = Arc::new(MemoryStore::new());

  if let Some(path) = deployments {
    let content = tokio::fs::read_to_string(&path)
      .await
      .with_context(|| format!("failed to read deployments file: {}", path.display()))?;
    let seed: SeedFile = serde_json::from_str(&content)
      .with_context(|| format!("failed to parse deployments file: {}", path.display()))?;

    for (key, user_id) in seed.api_keys {
      store.insert_key(key, user_id);
    }
    for deployment in seed.deployments {
      store.insert_deployment(deployment);
    }
  }

  let state = Arc::new(AppState::new(
    Arc::new(NodeRegistry::builtin()),
    store.clone(),
    store,
  ));

  let shutdown = CancellationToken::new();
  let signal = shutdown.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      signal.cancel();
    }
  });

  pylon_server::serve(state, &bind, shutdown).await
}

fn run_flow(flow_file: PathBuf, credentials: Vec<String>) -> Result<()> {
  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async { run_flow_async(flow_file, credentials).await })
}

async fn run_flow_async(flow_file: PathBuf, credentials: Vec<String>) -> Result<()> {
  let content = tokio::fs::read_to_string(&flow_file)
    .await
    .with_context(|| format!("failed to read flow file: {}", flow_file.display()))?;
  let request: RunRequest = serde_json::from_str(&content)
    .with_context(|| format!("failed to parse flow file: {}", flow_file.display()))?;

  let credentials = parse_credentials(&credentials)?;
  let options = RunOptions::new(credentials, ExecutionContext::api());

  let coordinator = Coordinator::new(Arc::new(NodeRegistry::builtin()));
  let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
  let notifier = ChannelNotifier::new(tx);

  // Progress on stderr so stdout stays machine-readable.
  let printer = tokio::spawn(async move {
    while let Some(event) = rx.recv().await {
      eprintln!("{}", serde_json::to_string(&event).unwrap_or_default());
    }
  });

  let cancel = CancellationToken::new();
  let signal = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      signal.cancel();
    }
  });

  let outcome = coordinator
    .execute(&request, &options, cancel, &notifier)
    .await
    .context("flow execution failed")?;

  drop(notifier);
  let _ = printer.await;

  match outcome.output {
    serde_json::Value::String(text) => println!("{text}"),
    other => println!("{}", serde_json::to_string_pretty(&other)?),
  }

  Ok(())
}

fn parse_credentials(entries: &[String]) -> Result<HashMap<String, String>> {
  let mut credentials = HashMap::new();
  for entry in entries {
    let Some((key, value)) = entry.split_once('=') else {
      bail!("invalid credential '{entry}', expected KEY=VALUE");
    };
    credentials.insert(key.to_string(), value.to_string());
  }
  Ok(credentials)
}
