// src/philosopher.rs

//! State and behaviour shared by every algorithm, the `Diner` capability
//! trait, and the sequential processing loop that drives a philosopher.

use crate::board::StateBoard;
use crate::error::{DiningError, DiningResult, ProtocolViolation};
use crate::fork::ForkId;
use crate::render::RenderSink;
use crate::runtime::{DurationRange, EventBus, MailboxReceiver, MailboxSender, Message, SelfTimer, TableEvent, WaitGroup};
use crate::state::PhilState;
use crate::topology::{Ring, Side};

use async_trait::async_trait;
use std::sync::Arc;

/// Stable philosopher identifier; also the philosopher's seat at the table.
pub type PhilosopherId = usize;

/// Everything a philosopher owns regardless of the algorithm it runs.
#[derive(Debug)]
pub struct PhilosopherCore {
  id: PhilosopherId,
  name: String,
  state: PhilState,
  ring: Ring,
  think: DurationRange,
  eat: DurationRange,
  timer: SelfTimer,
  board: StateBoard,
  events: EventBus,
  sink: Arc<dyn RenderSink>,
  meals: u64,
}

/// Construction parameters for a `PhilosopherCore`.
#[derive(Debug, Clone)]
pub struct CoreParams {
  pub id: PhilosopherId,
  pub name: String,
  pub ring: Ring,
  pub think: DurationRange,
  pub eat: DurationRange,
  /// The philosopher's own mailbox, used for delayed self-sends.
  pub own_mailbox: MailboxSender,
  pub board: StateBoard,
  pub events: EventBus,
  pub sink: Arc<dyn RenderSink>,
}

impl PhilosopherCore {
  pub fn new(params: CoreParams) -> Self {
    Self {
      id: params.id,
      name: params.name,
      state: PhilState::Inactive,
      ring: params.ring,
      think: params.think,
      eat: params.eat,
      timer: SelfTimer::new(params.id, params.own_mailbox),
      board: params.board,
      events: params.events,
      sink: params.sink,
      meals: 0,
    }
  }

  pub fn id(&self) -> PhilosopherId {
    self.id
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn state(&self) -> PhilState {
    self.state
  }

  pub fn ring(&self) -> &Ring {
    &self.ring
  }

  pub fn meals(&self) -> u64 {
    self.meals
  }

  pub fn is_hungry(&self) -> bool {
    self.state == PhilState::Hungry
  }

  pub fn is_eating(&self) -> bool {
    self.state == PhilState::Eating
  }

  pub fn fork(&self, side: Side) -> ForkId {
    self.ring.fork(self.id, side)
  }

  pub fn neighbour(&self, side: Side) -> PhilosopherId {
    self.ring.neighbour(self.id, side)
  }

  /// Records a lifecycle change locally, on the board, and on the event bus.
  pub fn set_state(&mut self, state: PhilState) {
    self.state = state;
    self.board.publish(self.id, state);
    self.publish(TableEvent::StateChanged {
      philosopher: self.id,
      state,
    });
  }

  /// Thinking; arrange to become hungry later.
  pub fn start_thinking(&mut self, held: &[ForkId]) {
    let delay = self.timer.send_after(&self.think, Message::transition(PhilState::Hungry));
    tracing::debug!(philosopher = self.id, delay = ?delay, "Starts thinking");
    self.write_status("starts thinking", held);
  }

  /// Eating; arrange to go back to thinking later.
  pub fn start_eating(&mut self, held: &[ForkId]) {
    self.meals += 1;
    let delay = self.timer.send_after(&self.eat, Message::transition(PhilState::Thinking));
    tracing::debug!(philosopher = self.id, delay = ?delay, meals = self.meals, "Starts eating");
    self.write_status("starts eating", held);
  }

  /// Asserts that neither neighbour has published `Eating`.
  pub fn check_neighbours_not_eating(&self) -> Result<(), ProtocolViolation> {
    for side in Side::BOTH {
      let neighbour = self.neighbour(side);
      if self.board.get(neighbour) == PhilState::Eating {
        return Err(ProtocolViolation::NeighbourEating {
          philosopher: self.id,
          neighbour,
        });
      }
    }
    Ok(())
  }

  pub fn publish(&self, event: TableEvent) {
    // No subscribers is the normal case when nobody observes the table.
    let _ = self.events.publish(event);
  }

  /// Writes this philosopher's status line: `<name> (<id>,<state>) <action>[, holds ...]`.
  pub fn write_status(&self, action: &str, held: &[ForkId]) {
    let holdings = match held {
      [a, b] => format!(", holds forks {} and {}", a, b),
      [a] => format!(", holds fork {}", a),
      _ => String::new(),
    };
    let line = format!("{} ({},{}) {}{}", self.name, self.id, self.state, action, holdings);
    self.sink.write(self.id + 1, &line);
  }

  /// Cancels every pending delayed self-send.
  pub(crate) fn cancel_timers(&self) {
    self.timer.cancel_all();
  }
}

/// The capability every algorithm implements: a lifecycle driver (`start`)
/// and a reaction to each delivered message (`execute`).
///
/// Implementations are only ever driven by `run_diner`, one message at a time.
#[async_trait]
pub trait Diner: Send + std::fmt::Debug {
  fn core(&self) -> &PhilosopherCore;

  fn core_mut(&mut self) -> &mut PhilosopherCore;

  /// Forks currently held, left first.
  fn held_forks(&self) -> Vec<ForkId>;

  /// Leaves `Inactive` and starts thinking.
  async fn start(&mut self) -> DiningResult<()> {
    let held = self.held_forks();
    let core = self.core_mut();
    core.set_state(PhilState::Thinking);
    core.start_thinking(&held);
    Ok(())
  }

  /// Reacts to one message. `Transition { Stopped }` never reaches this.
  async fn execute(&mut self, msg: Message) -> DiningResult<()>;

  /// Called once after the loop exits, whatever the reason.
  async fn release_all(&mut self) {}
}

/// Bookkeeping that must happen however a philosopher task ends, including
/// panics and aborts.
struct ActorGuard {
  philosopher: PhilosopherId,
  events: EventBus,
  wait_group: WaitGroup,
  stopped_normally: bool,
}

impl ActorGuard {
  fn new(philosopher: PhilosopherId, events: EventBus, wait_group: WaitGroup) -> Self {
    Self {
      philosopher,
      events,
      wait_group,
      stopped_normally: false,
    }
  }

  fn finish(mut self, error: Option<&DiningError>) {
    let _ = self.events.publish(TableEvent::ActorStopping {
      philosopher: self.philosopher,
      error: error.map(|e| e.to_string()),
    });
    self.stopped_normally = true;
  }
}

impl Drop for ActorGuard {
  fn drop(&mut self) {
    if !self.stopped_normally {
      tracing::debug!(
        philosopher = self.philosopher,
        "Philosopher task stopping abnormally (likely cancelled or panicked)"
      );
      let _ = self.events.publish(TableEvent::ActorStopping {
        philosopher: self.philosopher,
        error: Some("philosopher task cancelled or panicked".into()),
      });
    }
    self.wait_group.done();
  }
}

/// The processing loop: start, then receive one message, dispatch, repeat,
/// until a Stop arrives, the mailbox closes, or a protocol violation occurs.
pub(crate) async fn run_diner(
  mut diner: Box<dyn Diner>,
  mailbox: MailboxReceiver,
  wait_group: WaitGroup,
) -> DiningResult<()> {
  let philosopher = diner.core().id();
  let guard = ActorGuard::new(philosopher, diner.core().events.clone(), wait_group);

  diner.core().publish(TableEvent::ActorStarted { philosopher });
  tracing::info!(philosopher, name = diner.core().name(), "Philosopher actor started main loop");

  let result: DiningResult<()> = async {
    diner.start().await?;
    loop {
      let msg = match mailbox.recv().await {
        Ok(msg) => msg,
        Err(_) => {
          tracing::info!(philosopher, "Mailbox closed, stopping");
          break;
        }
      };
      tracing::trace!(philosopher, state = %diner.core().state(), msg = %msg, "Received message");

      if msg.is_stop() {
        let held = diner.held_forks();
        let core = diner.core_mut();
        core.set_state(PhilState::Stopped);
        core.write_status("stops", &held);
        tracing::info!(philosopher, meals = core.meals(), "Philosopher received Stop");
        break;
      }
      diner.execute(msg).await?;
    }
    Ok(())
  }
  .await;

  diner.core().cancel_timers();
  diner.release_all().await;
  mailbox.close();

  match &result {
    Ok(()) => tracing::debug!(philosopher, "Philosopher loop finished"),
    Err(e) => tracing::error!(philosopher, error = %e, "Philosopher loop failed"),
  }
  guard.finish(result.as_ref().err());
  result
}


#[cfg(test)]
mod tests {
  use super::test_support::core_for;
  use super::*;

  #[tokio::test]
  async fn set_state_publishes_to_board_and_bus() {
    let (mut core, _rx, board, events) = core_for(2, 5);
    let mut sub = events.subscribe();
    core.set_state(PhilState::Hungry);
    assert_eq!(board.get(2), PhilState::Hungry);
    assert_eq!(
      sub.recv().await.unwrap(),
      TableEvent::StateChanged {
        philosopher: 2,
        state: PhilState::Hungry
      }
    );
  }

  #[tokio::test]
  async fn neighbour_eating_is_detected() {
    let (core, _rx, board, _events) = core_for(2, 5);
    assert!(core.check_neighbours_not_eating().is_ok());
    board.publish(4, PhilState::Eating); // not adjacent to 2
    assert!(core.check_neighbours_not_eating().is_ok());
    board.publish(3, PhilState::Eating);
    assert_eq!(
      core.check_neighbours_not_eating(),
      Err(ProtocolViolation::NeighbourEating {
        philosopher: 2,
        neighbour: 3
      })
    );
  }
}
