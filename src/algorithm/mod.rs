// src/algorithm/mod.rs

//! Fork acquisition algorithms. Each one implements `Diner`; the table picks
//! one at construction through `Algorithm`.

/// The Chandy-Misra message-passing protocol (the default).
pub mod chandy_misra;
/// Unsynchronised eating, used to demonstrate the safety monitor.
pub mod fingers;
/// Global lock ordering over mutex-protected forks.
pub mod resource_hierarchy;

pub use chandy_misra::ChandyMisra;
pub use fingers::Fingers;
pub use resource_hierarchy::{ResourceHierarchy, SharedFork};

use crate::error::DiningError;
use crate::fork::Fork;
use crate::philosopher::{Diner, PhilosopherCore};
use crate::runtime::MailboxSender;
use crate::topology::Side;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Algorithm {
  #[default]
  ChandyMisra,
  ResourceHierarchy,
  Fingers,
}

impl Algorithm {
  pub const ALL: [Algorithm; 3] = [Algorithm::ChandyMisra, Algorithm::ResourceHierarchy, Algorithm::Fingers];

  pub fn as_str(self) -> &'static str {
    match self {
      Algorithm::ChandyMisra => "chandy-misra",
      Algorithm::ResourceHierarchy => "resource-hierarchy",
      Algorithm::Fingers => "fingers",
    }
  }

  /// Whether the algorithm guarantees that neighbours never eat together.
  pub fn is_safe(self) -> bool {
    !matches!(self, Algorithm::Fingers)
  }
}

impl fmt::Display for Algorithm {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Algorithm {
  type Err = DiningError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "chandy-misra" | "chandymisra" | "cm" => Ok(Algorithm::ChandyMisra),
      "resource-hierarchy" | "resourcehierarchy" | "rh" => Ok(Algorithm::ResourceHierarchy),
      "fingers" => Ok(Algorithm::Fingers),
      other => Err(DiningError::InvalidArgument(format!("unknown algorithm '{}'", other))),
    }
  }
}

/// Table-wide resources an algorithm may need when building one philosopher.
#[derive(Debug)]
pub(crate) struct Wiring {
  /// Every philosopher's mailbox, indexed by id.
  pub mailboxes: Vec<MailboxSender>,
  /// Mutex-protected forks, indexed by fork id. Only built for the resource hierarchy.
  pub shared_forks: Vec<SharedFork>,
}

impl Wiring {
  pub fn new(algorithm: Algorithm, mailboxes: Vec<MailboxSender>) -> Self {
    let shared_forks = match algorithm {
      Algorithm::ResourceHierarchy => (0..mailboxes.len())
        .map(|id| Arc::new(tokio::sync::Mutex::new(Fork::new(id))))
        .collect(),
      _ => Vec::new(),
    };
    Self {
      mailboxes,
      shared_forks,
    }
  }
}

impl Algorithm {
  pub(crate) fn build(self, core: PhilosopherCore, wiring: &Wiring) -> Box<dyn Diner> {
    match self {
      Algorithm::ChandyMisra => {
        let plan = core.ring().initial_plan(core.id());
        let neighbours = Side::BOTH.map(|side| wiring.mailboxes[core.neighbour(side)].clone());
        Box::new(ChandyMisra::new(core, plan, neighbours))
      }
      Algorithm::ResourceHierarchy => {
        let forks = Side::BOTH.map(|side| wiring.shared_forks[core.fork(side)].clone());
        Box::new(ResourceHierarchy::new(core, forks))
      }
      Algorithm::Fingers => Box::new(Fingers::new(core)),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_names_and_aliases() {
    assert_eq!("chandy-misra".parse::<Algorithm>().unwrap(), Algorithm::ChandyMisra);
    assert_eq!("RH".parse::<Algorithm>().unwrap(), Algorithm::ResourceHierarchy);
    assert_eq!("fingers".parse::<Algorithm>().unwrap(), Algorithm::Fingers);
    assert!("waiter".parse::<Algorithm>().is_err());
  }

  #[test]
  fn display_round_trips() {
    for algorithm in Algorithm::ALL {
      assert_eq!(algorithm.to_string().parse::<Algorithm>().unwrap(), algorithm);
    }
    assert!(!Algorithm::Fingers.is_safe());
  }
}
