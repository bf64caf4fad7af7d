// src/fork.rs

//! The shared resource. A fork is held by at most one philosopher at a time.

use crate::philosopher::PhilosopherId;

use std::fmt;

/// Stable fork identifier. Fork `i` sits between philosophers `i - 1` and `i`.
pub type ForkId = usize;

/// A single fork.
///
/// "Unheld" is represented as `None`, never as a philosopher id. The dirty
/// flag only carries meaning while the fork is held.
#[derive(Debug, PartialEq, Eq)]
pub struct Fork {
  id: ForkId,
  holder: Option<PhilosopherId>,
  dirty: bool,
}

impl Fork {
  /// Creates an unheld fork. All forks start out dirty.
  pub fn new(id: ForkId) -> Self {
    Self {
      id,
      holder: None,
      dirty: true,
    }
  }

  /// Creates a dirty fork already held by `holder`.
  pub fn held_by(id: ForkId, holder: PhilosopherId) -> Self {
    Self {
      id,
      holder: Some(holder),
      dirty: true,
    }
  }

  pub fn id(&self) -> ForkId {
    self.id
  }

  pub fn holder(&self) -> Option<PhilosopherId> {
    self.holder
  }

  pub fn is_held(&self) -> bool {
    self.holder.is_some()
  }

  pub fn is_held_by(&self, philosopher: PhilosopherId) -> bool {
    self.holder == Some(philosopher)
  }

  pub fn set_holder(&mut self, philosopher: PhilosopherId) {
    self.holder = Some(philosopher);
  }

  pub fn set_free(&mut self) {
    self.holder = None;
  }

  pub fn is_dirty(&self) -> bool {
    self.dirty
  }

  /// Marks the fork as used.
  pub fn make_dirty(&mut self) {
    self.dirty = true;
  }

  /// Cleans the fork before it is handed over.
  pub fn clean(&mut self) {
    self.dirty = false;
  }
}

impl fmt::Display for Fork {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let condition = if self.dirty { "dirty" } else { "clean" };
    match self.holder {
      Some(holder) => write!(f, "fork {} ({}, held by {})", self.id, condition, holder),
      None => write!(f, "fork {} ({}, free)", self.id, condition),
    }
  }
}
