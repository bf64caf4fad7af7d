// src/board.rs

use crate::philosopher::PhilosopherId;
use crate::state::PhilState;

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Published lifecycle state of every seat.
///
/// Seat `i` is written only by philosopher `i`'s own loop. Neighbours read it
/// for one purpose: asserting that nobody next to them is eating at the moment
/// they start to eat. The protocol never branches on it.
///
/// A philosopher publishes `Thinking` before releasing its forks, and a
/// neighbour only eats after the release reached it through a mailbox, so the
/// Release/Acquire pair here makes the assertion exact.
#[derive(Debug, Clone)]
pub struct StateBoard {
  seats: Arc<[AtomicU8]>,
}

impl StateBoard {
  pub fn new(seats: usize) -> Self {
    let seats: Vec<AtomicU8> = (0..seats).map(|_| AtomicU8::new(PhilState::Inactive.as_u8())).collect();
    Self { seats: seats.into() }
  }

  pub fn len(&self) -> usize {
    self.seats.len()
  }

  pub fn is_empty(&self) -> bool {
    self.seats.is_empty()
  }

  pub(crate) fn publish(&self, seat: PhilosopherId, state: PhilState) {
    self.seats[seat].store(state.as_u8(), Ordering::Release);
  }

  pub fn get(&self, seat: PhilosopherId) -> PhilState {
    // Only valid encodings are ever stored.
    PhilState::from_u8(self.seats[seat].load(Ordering::Acquire)).unwrap_or(PhilState::Inactive)
  }

  pub fn snapshot(&self) -> Vec<PhilState> {
    (0..self.seats.len()).map(|seat| self.get(seat)).collect()
  }

  /// Number of seats currently eating.
  pub fn eating_count(&self) -> usize {
    self.snapshot().into_iter().filter(|s| *s == PhilState::Eating).count()
  }
}
