//! Progress events and notifiers.
//!
//! The coordinator emits one envelope per step status transition plus a
//! final `complete` (or run-level `error`) marker. Consumers decide what to
//! do with them: stream to a client, print to stderr, or discard.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::step::ExecutionStep;

/// Envelopes emitted while a flow runs.
///
/// Serialized with a lowercase `type` tag to match the wire protocol:
/// `{"type":"step","step":{...}}`, `{"type":"complete"}`,
/// `{"type":"error","error":"..."}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProgressEvent {
  /// A step changed status. Consumers replace the step with a matching id.
  Step { step: ExecutionStep },

  /// The run finished; no further events follow.
  Complete,

  /// The run failed structurally; no further events follow.
  Error { error: String },
}

/// Trait for receiving progress events.
///
/// The coordinator calls `notify` for each event - implementations decide
/// what to do with them (stream, persist, log, ignore).
pub trait ProgressNotifier: Send + Sync {
  fn notify(&self, event: ProgressEvent);
}

/// A no-op notifier that discards all events.
///
/// Useful for tests or when progress observation is not needed.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl ProgressNotifier for NoopNotifier {
  fn notify(&self, _event: ProgressEvent) {
    // Intentionally empty
  }
}

/// A notifier that sends events to an unbounded channel.
///
/// Unbounded so the coordinator never blocks on a slow consumer; event
/// volume is low (two per executor node plus one terminal marker).
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  sender: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<ProgressEvent>) -> Self {
    Self { sender }
  }
}

impl ProgressNotifier for ChannelNotifier {
  fn notify(&self, event: ProgressEvent) {
    // Ignore send errors - receiver may have been dropped
    let _ = self.sender.send(event);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn step_envelope_carries_the_type_tag() {
    let mut step = ExecutionStep::pending("n1", "API Input");
    step.mark_running();
    let json = serde_json::to_value(ProgressEvent::Step { step }).unwrap();
    assert_eq!(json["type"], "step");
    assert_eq!(json["step"]["status"], "running");
  }

  #[test]
  fn terminal_envelopes_serialize_flat() {
    assert_eq!(
      serde_json::to_string(&ProgressEvent::Complete).unwrap(),
      r#"{"type":"complete"}"#
    );
    let json = serde_json::to_value(ProgressEvent::Error {
      error: "boom".to_string(),
    })
    .unwrap();
    assert_eq!(json["type"], "error");
    assert_eq!(json["error"], "boom");
  }

  #[test]
  fn channel_notifier_forwards_events() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let notifier = ChannelNotifier::new(tx);
    notifier.notify(ProgressEvent::Complete);
    let event = rx.try_recv().unwrap();
    assert!(matches!(event, ProgressEvent::Complete));
  }
}
