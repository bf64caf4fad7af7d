// src/algorithm/chandy_misra.rs

//! The Chandy-Misra hygienic solution.
//!
//! Each shared fork is either held by one of its two philosophers or in flight
//! inside a `Grant`. Alongside every fork travels a request token: whoever
//! does not hold the fork holds the token and may spend it to ask for the
//! fork. Clean forks are never given up; dirty ones are given up on request as
//! soon as the holder is not eating. Together with the acyclic initial
//! assignment this rules out both deadlock and starvation.
//!
//! Guarded commands, evaluated after every message:
//!
//! * R1: hungry, holding the token for fork `f` but not `f` itself:
//!   send the token (a `Request`) to the neighbour across `f`.
//! * R2: not eating, holding both `f` and its token, `f` dirty:
//!   clean `f` and send it (a `Grant`) to the neighbour across `f`.
//! * R3: on `Request`, keep the token.
//! * R4: on `Grant`, keep the fork; with both forks while hungry, eat.

use crate::error::{DiningResult, ProtocolViolation};
use crate::fork::{Fork, ForkId};
use crate::philosopher::{Diner, PhilosopherCore, PhilosopherId};
use crate::runtime::{MailboxSender, Message, TableEvent};
use crate::state::PhilState;
use crate::topology::{SeatPlan, Side};

use async_trait::async_trait;

/// One of the philosopher's two forks as seen from its side of the table.
#[derive(Debug)]
struct ForkSlot {
  fork_id: ForkId,
  /// `Some` while this philosopher holds the fork.
  fork: Option<Fork>,
  /// Request token: a neighbour asked for this fork and has not been served.
  requested: bool,
  neighbour: PhilosopherId,
  neighbour_mailbox: MailboxSender,
}

impl ForkSlot {
  fn holds(&self) -> bool {
    self.fork.is_some()
  }

  fn holds_dirty(&self) -> bool {
    self.fork.as_ref().is_some_and(Fork::is_dirty)
  }
}

#[derive(Debug)]
pub struct ChandyMisra {
  core: PhilosopherCore,
  slots: [ForkSlot; 2],
}

impl ChandyMisra {
  /// `neighbours` are the mailboxes of the left and right neighbour.
  pub fn new(core: PhilosopherCore, plan: SeatPlan, neighbours: [MailboxSender; 2]) -> Self {
    let id = core.id();
    let [left_mailbox, right_mailbox] = neighbours;
    let slot = |side: Side, neighbour_mailbox: MailboxSender| {
      let fork_id = core.fork(side);
      ForkSlot {
        fork_id,
        fork: plan.holds[side.index()].then(|| Fork::held_by(fork_id, id)),
        requested: plan.requested[side.index()],
        neighbour: core.neighbour(side),
        neighbour_mailbox,
      }
    };
    let slots = [slot(Side::Left, left_mailbox), slot(Side::Right, right_mailbox)];
    Self { core, slots }
  }

  pub fn holds(&self, side: Side) -> bool {
    self.slots[side.index()].holds()
  }

  pub fn has_request(&self, side: Side) -> bool {
    self.slots[side.index()].requested
  }

  /// Dirty flag of the fork on `side`, if held.
  pub fn is_dirty(&self, side: Side) -> Option<bool> {
    self.slots[side.index()].fork.as_ref().map(Fork::is_dirty)
  }

  fn holds_both(&self) -> bool {
    self.slots.iter().all(ForkSlot::holds)
  }

  fn write(&self, action: &str) {
    self.core.write_status(action, &self.held_forks());
  }

  /// Resolves a fork id to our side of the table, or `None` if it is not ours.
  fn side_of(&self, fork: ForkId) -> Option<Side> {
    self.core.ring().side_of(self.core.id(), fork)
  }

  fn on_transition(&mut self, target: PhilState) {
    let from = self.core.state();
    match (from, target) {
      (PhilState::Thinking, PhilState::Hungry) => {
        self.core.set_state(PhilState::Hungry);
        self.write("is hungry");
      }
      (PhilState::Eating, PhilState::Thinking) => {
        self.core.set_state(PhilState::Thinking);
        let held = self.held_forks();
        self.core.start_thinking(&held);
      }
      _ => {
        tracing::warn!(philosopher = self.core.id(), from = %from, to = %target, "Ignoring unexpected state transition");
      }
    }
  }

  /// R4: take possession of a granted fork.
  fn accept_grant(&mut self, sender: PhilosopherId, mut fork: Fork) -> Result<(), ProtocolViolation> {
    let id = self.core.id();
    let Some(side) = self.side_of(fork.id()) else {
      tracing::warn!(philosopher = id, fork = fork.id(), sender, "Ignoring grant for a fork that is not adjacent");
      return Ok(());
    };
    let slot = &mut self.slots[side.index()];
    if sender != slot.neighbour {
      tracing::warn!(philosopher = id, fork = fork.id(), sender, "Ignoring grant from a philosopher across another fork");
      return Ok(());
    }
    if fork.is_held() {
      return Err(ProtocolViolation::ForkAlreadyHeld {
        philosopher: id,
        fork: fork.id(),
        holder: fork.holder(),
      });
    }
    if slot.holds() {
      return Err(ProtocolViolation::DuplicateGrant {
        philosopher: id,
        fork: fork.id(),
      });
    }

    fork.set_holder(id);
    let fork_id = fork.id();
    slot.fork = Some(fork);
    tracing::debug!(philosopher = id, fork = fork_id, sender, "Received fork");
    self.core.publish(TableEvent::ForkAcquired {
      philosopher: id,
      fork: fork_id,
    });
    self.write(&format!("receives fork {}", fork_id));
    Ok(())
  }

  /// R3: remember the neighbour's request token.
  fn record_request(&mut self, requester: PhilosopherId, fork: ForkId) -> Result<(), ProtocolViolation> {
    let id = self.core.id();
    let Some(side) = self.side_of(fork) else {
      tracing::warn!(philosopher = id, fork, requester, "Ignoring request for a fork that is not adjacent");
      return Ok(());
    };
    let slot = &mut self.slots[side.index()];
    if requester != slot.neighbour {
      tracing::warn!(philosopher = id, fork, requester, "Ignoring request from a philosopher across another fork");
      return Ok(());
    }
    if slot.requested {
      return Err(ProtocolViolation::DuplicateRequest {
        philosopher: id,
        fork,
        requester,
      });
    }
    slot.requested = true;
    tracing::debug!(philosopher = id, fork, requester, "Received fork request");
    self.write(&format!("received fork request for {}", fork));
    Ok(())
  }

  /// Dirties both forks and starts eating. Only called while holding both.
  fn eat(&mut self) -> Result<(), ProtocolViolation> {
    let id = self.core.id();
    for slot in &self.slots {
      if !slot.fork.as_ref().is_some_and(|f| f.is_held_by(id)) {
        return Err(ProtocolViolation::EatWithoutForks {
          philosopher: id,
          fork: slot.fork_id,
        });
      }
    }
    self.core.check_neighbours_not_eating()?;

    for fork in self.slots.iter_mut().filter_map(|slot| slot.fork.as_mut()) {
      fork.make_dirty();
    }
    self.core.set_state(PhilState::Eating);
    let held = self.held_forks();
    self.core.start_eating(&held);
    Ok(())
  }

  /// R2 then R1 for each fork. One pass reaches a fixpoint: R2 can only
  /// enable R1 on the same fork, never anything on the other one.
  async fn evaluate_guards(&mut self) {
    let id = self.core.id();
    for side in Side::BOTH {
      // R2: release a dirty, requested fork unless eating.
      let release = !self.core.is_eating() && self.slots[side.index()].requested && self.slots[side.index()].holds_dirty();
      if release {
        let slot = &mut self.slots[side.index()];
        if let Some(mut fork) = slot.fork.take() {
          fork.clean();
          fork.set_free();
          let (fork_id, to, mailbox) = (fork.id(), slot.neighbour, slot.neighbour_mailbox.clone());
          self.core.publish(TableEvent::ForkReleased {
            philosopher: id,
            fork: fork_id,
            to: Some(to),
          });
          self.write(&format!("sent fork {} to philosopher {}", fork_id, to));
          Self::send(id, &mailbox, to, Message::Grant { sender: id, fork }).await;
        }
      }

      // R1: spend the token to ask for a missing fork.
      let request = self.core.is_hungry() && self.slots[side.index()].requested && !self.slots[side.index()].holds();
      if request {
        let slot = &mut self.slots[side.index()];
        slot.requested = false;
        let (fork_id, from, mailbox) = (slot.fork_id, slot.neighbour, slot.neighbour_mailbox.clone());
        self.core.publish(TableEvent::ForkRequested {
          philosopher: id,
          fork: fork_id,
          from,
        });
        self.write(&format!("requested fork {}", fork_id));
        Self::send(id, &mailbox, from, Message::Request { requester: id, fork: fork_id }).await;
      }
    }
  }

  async fn send(id: PhilosopherId, mailbox: &MailboxSender, to: PhilosopherId, msg: Message) {
    if let Err(e) = mailbox.send(msg).await {
      // Only happens once the neighbour's loop has exited during shutdown.
      tracing::debug!(philosopher = id, to, msg = %e.into_inner(), "Neighbour mailbox closed, dropping message");
    }
  }
}

#[async_trait]
impl Diner for ChandyMisra {
  fn core(&self) -> &PhilosopherCore {
    &self.core
  }

  fn core_mut(&mut self) -> &mut PhilosopherCore {
    &mut self.core
  }

  fn held_forks(&self) -> Vec<ForkId> {
    self.slots.iter().filter(|slot| slot.holds()).map(|slot| slot.fork_id).collect()
  }

  async fn start(&mut self) -> DiningResult<()> {
    let id = self.core.id();
    for fork in self.held_forks() {
      self.core.publish(TableEvent::ForkAcquired { philosopher: id, fork });
    }
    self.core.set_state(PhilState::Thinking);
    let held = self.held_forks();
    self.core.start_thinking(&held);
    Ok(())
  }

  async fn execute(&mut self, msg: Message) -> DiningResult<()> {
    match msg {
      Message::Transition { target } => self.on_transition(target),
      Message::Grant { sender, fork } => self.accept_grant(sender, fork)?,
      Message::Request { requester, fork } => self.record_request(requester, fork)?,
    }

    if self.core.is_hungry() && self.holds_both() {
      self.write("holds both forks and can eat");
      self.eat()?;
    }

    self.evaluate_guards().await;
    Ok(())
  }
}
