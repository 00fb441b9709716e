//! Pylon Engine
//!
//! The execution engine for pylon flows. Given a node list and an edge list,
//! the [`Coordinator`] plans execution levels, dispatches every node in a
//! level concurrently, joins at the level boundary, and emits step lifecycle
//! events through a [`ProgressNotifier`].
//!
//! A single node's failure never aborts the run; only structural problems
//! (unknown node types, a cyclic graph) do. Cancellation is cooperative and
//! checked between levels, never mid-dispatch.

pub mod coordinator;
pub mod error;
pub mod events;
pub mod inputs;
pub mod step;

pub use coordinator::{Coordinator, RunOptions, RunOutcome, RunRequest};
pub use error::EngineError;
pub use events::{ChannelNotifier, NoopNotifier, ProgressEvent, ProgressNotifier};
pub use inputs::resolve_inputs;
pub use step::{ExecutionStep, StepStatus};
