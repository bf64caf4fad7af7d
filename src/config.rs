// src/config.rs

use crate::algorithm::Algorithm;
use crate::error::DiningError;
use crate::runtime::{DurationRange, DEFAULT_MAILBOX_CAPACITY};
use crate::topology::Ring;

use std::time::Duration;

/// The philosophers who sit down when nobody says otherwise.
pub const DEFAULT_NAMES: [&str; 5] = [
  "Hannah Arendt",
  "Judith Butler",
  "Patricia Churchland",
  "Simone de Beauvoir",
  "Themistoclea",
];

pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Default thinking and eating time.
pub const DEFAULT_DURATIONS: DurationRange = DurationRange::ordered_secs(5, 15);

/// Everything needed to lay a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableConfig {
  pub algorithm: Algorithm,
  /// One name per seat; the number of names is the number of philosophers.
  pub names: Vec<String>,
  pub think: DurationRange,
  pub eat: DurationRange,
  pub mailbox_capacity: usize,
  /// How long `Table::term` waits for every loop to exit.
  pub shutdown_timeout: Duration,
}

impl Default for TableConfig {
  fn default() -> Self {
    Self {
      algorithm: Algorithm::default(),
      names: DEFAULT_NAMES.iter().map(|s| s.to_string()).collect(),
      think: DEFAULT_DURATIONS,
      eat: DEFAULT_DURATIONS,
      mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
      shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
    }
  }
}

impl TableConfig {
  /// `n` philosophers, named from the default list and then `Philosopher <i>`.
  pub fn with_philosophers(mut self, n: usize) -> Self {
    self.names = default_names(n);
    self
  }

  pub fn with_names<I, S>(mut self, names: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.names = names.into_iter().map(Into::into).collect();
    self
  }

  pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
    self.algorithm = algorithm;
    self
  }

  pub fn with_think(mut self, think: DurationRange) -> Self {
    self.think = think;
    self
  }

  pub fn with_eat(mut self, eat: DurationRange) -> Self {
    self.eat = eat;
    self
  }

  pub fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
    self.mailbox_capacity = capacity;
    self
  }

  pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
    self.shutdown_timeout = timeout;
    self
  }

  pub fn philosophers(&self) -> usize {
    self.names.len()
  }

  /// Checks the configuration and returns the ring it describes.
  pub fn validate(&self) -> Result<Ring, DiningError> {
    let ring = Ring::new(self.names.len()).ok_or_else(|| {
      DiningError::InvalidArgument(format!(
        "need at least {} philosophers, got {}",
        Ring::MIN_SEATS,
        self.names.len()
      ))
    })?;
    if let Some(seat) = self.names.iter().position(|name| name.trim().is_empty()) {
      return Err(DiningError::InvalidArgument(format!("philosopher {} has an empty name", seat)));
    }
    if self.mailbox_capacity == 0 {
      return Err(DiningError::InvalidArgument("mailbox capacity must be at least 1".into()));
    }
    if self.think.max().is_zero() || self.eat.max().is_zero() {
      return Err(DiningError::InvalidArgument("think and eat durations must be positive".into()));
    }
    Ok(ring)
  }
}

/// Names for `n` seats.
pub fn default_names(n: usize) -> Vec<String> {
  (0..n)
    .map(|i| match DEFAULT_NAMES.get(i) {
      Some(name) => name.to_string(),
      None => format!("Philosopher {}", i),
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_config_seats_five() {
    let config = TableConfig::default();
    assert_eq!(config.philosophers(), 5);
    assert_eq!(config.names[0], "Hannah Arendt");
    assert_eq!(config.think.min(), Duration::from_secs(5));
    assert_eq!(config.eat.max(), Duration::from_secs(15));
    assert_eq!(config.mailbox_capacity, 64);
    assert_eq!(config.validate().unwrap().seats(), 5);
  }

  #[test]
  fn extra_seats_get_generic_names() {
    let config = TableConfig::default().with_philosophers(7);
    assert_eq!(config.names[4], "Themistoclea");
    assert_eq!(config.names[5], "Philosopher 5");
    assert_eq!(config.names[6], "Philosopher 6");
  }

  #[test]
  fn rejects_single_philosopher() {
    let err = TableConfig::default().with_names(["Diogenes"]).validate().unwrap_err();
    assert!(matches!(err, DiningError::InvalidArgument(_)));
  }

  #[test]
  fn rejects_blank_names_and_zero_capacity() {
    assert!(TableConfig::default().with_names(["a", " "]).validate().is_err());
    assert!(TableConfig::default().with_mailbox_capacity(0).validate().is_err());
  }

  #[test]
  fn rejects_zero_durations() {
    let zero = DurationRange::fixed(Duration::ZERO);
    assert!(TableConfig::default().with_eat(zero).validate().is_err());
    let short = DurationRange::from_millis(1, 2).unwrap();
    assert!(TableConfig::default().with_eat(short).with_think(short).validate().is_ok());
  }
}
