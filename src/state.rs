// src/state.rs

use std::fmt;

/// Lifecycle state of a philosopher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PhilState {
  Inactive = 0,
  Thinking = 1,
  Hungry = 2,
  Eating = 3,
  Stopped = 4,
}

impl PhilState {
  pub fn as_u8(self) -> u8 {
    self as u8
  }

  /// Inverse of `as_u8`. Unknown values map to `None`.
  pub fn from_u8(value: u8) -> Option<Self> {
    match value {
      0 => Some(PhilState::Inactive),
      1 => Some(PhilState::Thinking),
      2 => Some(PhilState::Hungry),
      3 => Some(PhilState::Eating),
      4 => Some(PhilState::Stopped),
      _ => None,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      PhilState::Inactive => "Inactive",
      PhilState::Thinking => "Thinking",
      PhilState::Hungry => "Hungry",
      PhilState::Eating => "Eating",
      PhilState::Stopped => "Stopped",
    }
  }
}

impl fmt::Display for PhilState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}
