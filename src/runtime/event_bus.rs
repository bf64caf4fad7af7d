// src/runtime/event_bus.rs

use super::table_events::TableEvent;
use tokio::sync::broadcast::{self, error::SendError, Receiver, Sender};

/// Default capacity for the bus. Slow subscribers lag rather than block actors.
pub const DEFAULT_EVENT_BUS_CAPACITY: usize = 1024;

/// Broadcast of table-wide observations (state changes, fork movements).
/// Internally uses tokio::sync::broadcast.
#[derive(Debug, Clone)]
pub struct EventBus {
  sender: Sender<TableEvent>,
}

impl EventBus {
  /// Creates a new EventBus with default capacity.
  pub fn new() -> Self {
    Self::with_capacity(DEFAULT_EVENT_BUS_CAPACITY)
  }

  /// Creates a new EventBus with specific capacity (at least 1).
  pub fn with_capacity(capacity: usize) -> Self {
    let (sender, _) = broadcast::channel(capacity.max(1));
    tracing::debug!(capacity = capacity.max(1), "Created new EventBus");
    Self { sender }
  }

  /// Publishes an event onto the bus.
  ///
  /// Returns the number of receivers the event was sent to. Having no
  /// subscribers is normal (nobody is observing the table) and yields an error
  /// the caller may ignore.
  pub fn publish(&self, event: TableEvent) -> Result<usize, SendError<TableEvent>> {
    tracing::trace!(event = ?event, "Publishing event");
    self.sender.send(event)
  }

  /// Creates a new receiver. It sees every event published after this call.
  pub fn subscribe(&self) -> Receiver<TableEvent> {
    self.sender.subscribe()
  }

  /// Returns the number of active subscribers.
  pub fn subscriber_count(&self) -> usize {
    self.sender.receiver_count()
  }
}

impl Default for EventBus {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::state::PhilState;

  #[tokio::test]
  async fn subscribers_see_events_published_after_subscribing() {
    let bus = EventBus::with_capacity(8);
    assert!(bus.publish(TableEvent::TableTerminating).is_err());

    let mut rx = bus.subscribe();
    assert_eq!(bus.subscriber_count(), 1);
    bus
      .publish(TableEvent::StateChanged {
        philosopher: 2,
        state: PhilState::Eating,
      })
      .unwrap();

    match rx.recv().await.unwrap() {
      TableEvent::StateChanged { philosopher, state } => {
        assert_eq!(philosopher, 2);
        assert_eq!(state, PhilState::Eating);
      }
      other => panic!("unexpected event {:?}", other),
    }
  }
}
