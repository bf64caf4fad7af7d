// src/runtime/table_events.rs

use crate::fork::ForkId;
use crate::philosopher::PhilosopherId;
use crate::state::PhilState;

/// Observations broadcast on the table's `EventBus`.
///
/// Actors publish an event before sending the message that enables the next
/// one (e.g. `ForkReleased` before the grant goes out), so the order seen by a
/// subscriber is consistent with causality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableEvent {
  /// A philosopher's processing loop has started.
  ActorStarted { philosopher: PhilosopherId },
  /// A philosopher entered a new lifecycle state.
  StateChanged {
    philosopher: PhilosopherId,
    state: PhilState,
  },
  /// A philosopher took possession of a fork.
  ForkAcquired {
    philosopher: PhilosopherId,
    fork: ForkId,
  },
  /// A philosopher released a fork; `to` is the recipient when handed over directly.
  ForkReleased {
    philosopher: PhilosopherId,
    fork: ForkId,
    to: Option<PhilosopherId>,
  },
  /// A philosopher asked `from` for a fork.
  ForkRequested {
    philosopher: PhilosopherId,
    fork: ForkId,
    from: PhilosopherId,
  },
  /// A philosopher's loop is exiting; `error` is set when it failed.
  ActorStopping {
    philosopher: PhilosopherId,
    error: Option<String>,
  },
  /// The table is shutting down.
  TableTerminating,
}

impl TableEvent {
  pub fn philosopher(&self) -> Option<PhilosopherId> {
    match self {
      TableEvent::ActorStarted { philosopher }
      | TableEvent::StateChanged { philosopher, .. }
      | TableEvent::ForkAcquired { philosopher, .. }
      | TableEvent::ForkReleased { philosopher, .. }
      | TableEvent::ForkRequested { philosopher, .. }
      | TableEvent::ActorStopping { philosopher, .. } => Some(*philosopher),
      TableEvent::TableTerminating => None,
    }
  }
}
