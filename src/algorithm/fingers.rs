// src/algorithm/fingers.rs

//! Eating with one's fingers: no forks, no coordination. Neighbours happily
//! eat at the same time, which is exactly what the safety monitor is there
//! to catch.

use crate::error::DiningResult;
use crate::fork::ForkId;
use crate::philosopher::{Diner, PhilosopherCore};
use crate::runtime::Message;
use crate::state::PhilState;

use async_trait::async_trait;

#[derive(Debug)]
pub struct Fingers {
  core: PhilosopherCore,
}

impl Fingers {
  pub fn new(core: PhilosopherCore) -> Self {
    Self { core }
  }
}

#[async_trait]
impl Diner for Fingers {
  fn core(&self) -> &PhilosopherCore {
    &self.core
  }

  fn core_mut(&mut self) -> &mut PhilosopherCore {
    &mut self.core
  }

  fn held_forks(&self) -> Vec<ForkId> {
    Vec::new()
  }

  async fn execute(&mut self, msg: Message) -> DiningResult<()> {
    let id = self.core.id();
    match msg {
      Message::Transition {
        target: PhilState::Hungry,
      } if self.core.state() == PhilState::Thinking => {
        self.core.set_state(PhilState::Hungry);
        self.core.set_state(PhilState::Eating);
        self.core.start_eating(&[]);
      }
      Message::Transition {
        target: PhilState::Thinking,
      } if self.core.is_eating() => {
        self.core.set_state(PhilState::Thinking);
        self.core.start_thinking(&[]);
      }
      other => {
        tracing::warn!(philosopher = id, state = %self.core.state(), msg = %other, "Ignoring message");
      }
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::philosopher::test_support::core_for;

  #[tokio::test]
  async fn eats_next_to_an_eating_neighbour() {
    let (core, _rx, board, _events) = core_for(1, 3);
    let mut phil = Fingers::new(core);
    phil.start().await.unwrap();

    board.publish(0, PhilState::Eating);
    board.publish(2, PhilState::Eating);
    phil.execute(Message::transition(PhilState::Hungry)).await.unwrap();

    assert_eq!(phil.core().state(), PhilState::Eating);
    assert_eq!(board.eating_count(), 3);
    assert_eq!(phil.core().meals(), 1);

    phil.execute(Message::transition(PhilState::Thinking)).await.unwrap();
    assert_eq!(phil.core().state(), PhilState::Thinking);
  }

  #[tokio::test]
  async fn out_of_order_transitions_are_ignored() {
    let (core, _rx, _board, _events) = core_for(0, 3);
    let mut phil = Fingers::new(core);
    phil.start().await.unwrap();
    phil.execute(Message::transition(PhilState::Thinking)).await.unwrap();
    phil.execute(Message::transition(PhilState::Eating)).await.unwrap();
    assert_eq!(phil.core().state(), PhilState::Thinking);
    assert_eq!(phil.core().meals(), 0);
  }
}
