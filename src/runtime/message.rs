// src/runtime/message.rs

use crate::fork::{Fork, ForkId};
use crate::philosopher::PhilosopherId;
use crate::state::PhilState;

use std::fmt;

/// Messages exchanged between philosophers (and sent by a philosopher to itself).
///
/// Ownership of a message moves into the recipient's mailbox on send. A
/// `Grant` carries the fork value itself, so a fork in flight has no holder
/// and no one else can touch it until the recipient takes it.
#[derive(Debug)]
pub enum Message {
  // --- Lifecycle ---
  /// Self-message advancing the lifecycle clock (Thinking -> Hungry etc).
  /// `Stopped` is the operator's stop command.
  Transition { target: PhilState },

  // --- Fork passing ---
  /// A neighbour hands over a fork it has just cleaned.
  Grant { sender: PhilosopherId, fork: Fork },
  /// A neighbour asks for the fork identified by `fork`.
  Request { requester: PhilosopherId, fork: ForkId },
}

impl Message {
  pub fn transition(target: PhilState) -> Self {
    Message::Transition { target }
  }

  pub fn stop() -> Self {
    Message::Transition {
      target: PhilState::Stopped,
    }
  }

  pub fn is_stop(&self) -> bool {
    matches!(
      self,
      Message::Transition {
        target: PhilState::Stopped
      }
    )
  }

  pub fn variant_name(&self) -> &'static str {
    match self {
      Message::Transition { .. } => "Transition",
      Message::Grant { .. } => "Grant",
      Message::Request { .. } => "Request",
    }
  }
}

impl fmt::Display for Message {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Message::Transition { target } => write!(f, "new state: {}", target),
      Message::Grant { sender, fork } => write!(f, "philosopher {} sends fork {}", sender, fork.id()),
      Message::Request { requester, fork } => write!(f, "philosopher {} requests fork {}", requester, fork),
    }
  }
}
