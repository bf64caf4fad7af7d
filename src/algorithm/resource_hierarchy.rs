// src/algorithm/resource_hierarchy.rs

//! Dijkstra's resource hierarchy: every philosopher locks its lower-numbered
//! fork first. A global lock order means no wait-for cycle can form.

use crate::error::{DiningResult, ProtocolViolation};
use crate::fork::{Fork, ForkId};
use crate::philosopher::{Diner, PhilosopherCore};
use crate::runtime::{Message, TableEvent};
use crate::state::PhilState;
use crate::topology::Side;

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// A fork shared by its two philosophers behind an async mutex.
pub type SharedFork = Arc<Mutex<Fork>>;

#[derive(Debug)]
pub struct ResourceHierarchy {
  core: PhilosopherCore,
  /// Acquisition order: lower fork id first.
  ordered: [SharedFork; 2],
  /// Guards for the forks currently held, in acquisition order.
  held: Vec<OwnedMutexGuard<Fork>>,
}

impl ResourceHierarchy {
  /// `forks` are the left and right fork, in that order.
  pub fn new(core: PhilosopherCore, forks: [SharedFork; 2]) -> Self {
    let [left, right] = forks;
    let ordered = if core.fork(Side::Left) <= core.fork(Side::Right) {
      [left, right]
    } else {
      [right, left]
    };
    Self {
      core,
      ordered,
      held: Vec::with_capacity(2),
    }
  }

  fn write(&self, action: &str) {
    self.core.write_status(action, &self.held_forks());
  }

  async fn acquire_forks(&mut self) {
    let id = self.core.id();
    for shared in self.ordered.clone() {
      let mut guard = match shared.clone().try_lock_owned() {
        Ok(guard) => guard,
        Err(_) => {
          let fork_id = self.fork_id_of(&shared);
          tracing::debug!(philosopher = id, fork = fork_id, "Waiting for fork");
          self.write(&format!("is waiting for fork {}", fork_id));
          shared.lock_owned().await
        }
      };
      guard.set_holder(id);
      let fork = guard.id();
      self.held.push(guard);
      self.core.publish(TableEvent::ForkAcquired { philosopher: id, fork });
      self.write(&format!("picks up fork {}", fork));
    }
  }

  /// The id of a fork we do not hold; both forks sit in `ordered` in id order.
  fn fork_id_of(&self, shared: &SharedFork) -> ForkId {
    let (low, high) = self.ordered_ids();
    if Arc::ptr_eq(shared, &self.ordered[0]) {
      low
    } else {
      high
    }
  }

  fn ordered_ids(&self) -> (ForkId, ForkId) {
    let left = self.core.fork(Side::Left);
    let right = self.core.fork(Side::Right);
    (left.min(right), left.max(right))
  }

  fn eat(&mut self) -> Result<(), ProtocolViolation> {
    let id = self.core.id();
    let (low, high) = self.ordered_ids();
    for fork in [low, high] {
      let held = self.held.iter().any(|guard| guard.id() == fork && guard.is_held_by(id));
      if !held {
        return Err(ProtocolViolation::EatWithoutForks { philosopher: id, fork });
      }
    }
    self.core.check_neighbours_not_eating()?;

    for guard in self.held.iter_mut() {
      guard.make_dirty();
    }
    self.core.set_state(PhilState::Eating);
    let held = self.held_forks();
    self.core.start_eating(&held);
    Ok(())
  }

  /// Frees every held fork. Events go out before the mutex is unlocked so
  /// observers never see the next holder first.
  fn release_forks(&mut self) {
    let id = self.core.id();
    for mut guard in self.held.drain(..).rev() {
      let fork = guard.id();
      guard.clean();
      guard.set_free();
      self.core.publish(TableEvent::ForkReleased {
        philosopher: id,
        fork,
        to: None,
      });
      drop(guard);
      tracing::debug!(philosopher = id, fork, "Put down fork");
    }
  }
}

#[async_trait]
impl Diner for ResourceHierarchy {
  fn core(&self) -> &PhilosopherCore {
    &self.core
  }

  fn core_mut(&mut self) -> &mut PhilosopherCore {
    &mut self.core
  }

  fn held_forks(&self) -> Vec<ForkId> {
    let mut forks: Vec<ForkId> = self.held.iter().map(|guard| guard.id()).collect();
    // Report left first, like every other algorithm.
    let left = self.core.fork(Side::Left);
    forks.sort_by_key(|fork| *fork != left);
    forks
  }

  async fn execute(&mut self, msg: Message) -> DiningResult<()> {
    let id = self.core.id();
    match msg {
      Message::Transition { target } => match (self.core.state(), target) {
        (PhilState::Thinking, PhilState::Hungry) => {
          self.core.set_state(PhilState::Hungry);
          self.write("is hungry");
          self.acquire_forks().await;
          self.eat()?;
        }
        (PhilState::Eating, PhilState::Thinking) => {
          // Publish Thinking before anyone can lock our forks.
          self.core.set_state(PhilState::Thinking);
          self.release_forks();
          self.core.start_thinking(&[]);
        }
        (from, to) => {
          tracing::warn!(philosopher = id, from = %from, to = %to, "Ignoring unexpected state transition");
        }
      },
      other => {
        tracing::warn!(philosopher = id, msg = %other, "Ignoring message the resource hierarchy does not use");
      }
    }
    Ok(())
  }

  async fn release_all(&mut self) {
    self.release_forks();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::board::StateBoard;
  use crate::philosopher::test_support::core_at;
  use crate::error::DiningError;
  use crate::runtime::EventBus;
  use std::time::Duration;

  fn shared_forks(n: usize) -> Vec<SharedFork> {
    (0..n).map(|id| Arc::new(Mutex::new(Fork::new(id)))).collect()
  }

  fn seat(id: usize, n: usize, forks: &[SharedFork], board: &StateBoard, events: &EventBus) -> ResourceHierarchy {
    let (core, _rx) = core_at(id, n, board, events);
    let mine = Side::BOTH.map(|side| forks[core.fork(side)].clone());
    ResourceHierarchy::new(core, mine)
  }

  #[tokio::test]
  async fn last_seat_locks_fork_zero_first() {
    let (board, events) = (StateBoard::new(5), EventBus::new());
    let forks = shared_forks(5);
    let phil = seat(4, 5, &forks, &board, &events);
    assert_eq!(phil.ordered_ids(), (0, 4));
    assert!(Arc::ptr_eq(&phil.ordered[0], &forks[0]));
  }

  #[tokio::test]
  async fn hungry_philosopher_with_free_forks_eats() {
    let (board, events) = (StateBoard::new(5), EventBus::new());
    let forks = shared_forks(5);
    let mut phil = seat(2, 5, &forks, &board, &events);
    phil.start().await.unwrap();
    phil.execute(Message::transition(PhilState::Hungry)).await.unwrap();

    assert_eq!(phil.core().state(), PhilState::Eating);
    assert_eq!(phil.held_forks(), vec![2, 3]);
    assert!(forks[2].try_lock().is_err());

    phil.execute(Message::transition(PhilState::Thinking)).await.unwrap();
    assert!(phil.held_forks().is_empty());
    let fork = forks[2].try_lock().unwrap();
    assert!(!fork.is_held());
  }

  #[tokio::test]
  async fn neighbour_waits_until_fork_is_released() {
    let (board, events) = (StateBoard::new(5), EventBus::new());
    let forks = shared_forks(5);
    let mut first = seat(1, 5, &forks, &board, &events);
    let mut second = seat(2, 5, &forks, &board, &events);
    first.start().await.unwrap();
    second.start().await.unwrap();

    first.execute(Message::transition(PhilState::Hungry)).await.unwrap();
    assert_eq!(first.core().state(), PhilState::Eating);

    let waiter = tokio::spawn(async move {
      second.execute(Message::transition(PhilState::Hungry)).await?;
      Ok::<_, DiningError>(second)
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!waiter.is_finished());
    assert_eq!(board.get(2), PhilState::Hungry);

    first.execute(Message::transition(PhilState::Thinking)).await.unwrap();
    let second = waiter.await.unwrap().unwrap();
    assert_eq!(second.core().state(), PhilState::Eating);
    assert_eq!(second.held_forks(), vec![2, 3]);
  }

  #[tokio::test]
  async fn release_all_frees_forks_on_stop() {
    let (board, events) = (StateBoard::new(3), EventBus::new());
    let forks = shared_forks(3);
    let mut phil = seat(0, 3, &forks, &board, &events);
    let mut sub = events.subscribe();
    phil.start().await.unwrap();
    phil.execute(Message::transition(PhilState::Hungry)).await.unwrap();
    phil.release_all().await;

    assert!(forks.iter().all(|f| f.try_lock().is_ok()));
    let mut released = Vec::new();
    while let Ok(event) = sub.try_recv() {
      if let TableEvent::ForkReleased { fork, to, .. } = event {
        assert_eq!(to, None);
        released.push(fork);
      }
    }
    released.sort();
    assert_eq!(released, vec![0, 1]);
  }

  #[tokio::test]
  async fn fork_messages_are_ignored() {
    let (board, events) = (StateBoard::new(3), EventBus::new());
    let forks = shared_forks(3);
    let mut phil = seat(0, 3, &forks, &board, &events);
    phil.start().await.unwrap();
    phil
      .execute(Message::Request { requester: 1, fork: 1 })
      .await
      .unwrap();
    phil
      .execute(Message::Grant {
        sender: 1,
        fork: Fork::new(1),
      })
      .await
      .unwrap();
    assert_eq!(phil.core().state(), PhilState::Thinking);
    assert!(phil.held_forks().is_empty());
  }
}
