use std::io;
use thiserror::Error;

use crate::fork::ForkId;
use crate::philosopher::PhilosopherId;

/// Breaches of the fork-passing protocol.
///
/// These are logic errors, never transient conditions: a philosopher that
/// detects one stops processing and the table tears down every other actor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolViolation {
  #[error("philosopher {philosopher} received fork {fork} which is already held by {holder:?}")]
  ForkAlreadyHeld {
    philosopher: PhilosopherId,
    fork: ForkId,
    holder: Option<PhilosopherId>,
  },
  #[error("philosopher {philosopher} received fork {fork} while already holding it")]
  DuplicateGrant { philosopher: PhilosopherId, fork: ForkId },
  #[error("philosopher {philosopher} received a second request for fork {fork} from {requester}")]
  DuplicateRequest {
    philosopher: PhilosopherId,
    fork: ForkId,
    requester: PhilosopherId,
  },
  #[error("philosopher {philosopher} tried to eat without holding fork {fork}")]
  EatWithoutForks { philosopher: PhilosopherId, fork: ForkId },
  #[error("philosopher {philosopher} tried to eat while neighbour {neighbour} is eating")]
  NeighbourEating {
    philosopher: PhilosopherId,
    neighbour: PhilosopherId,
  },
}

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum DiningError {
  #[error("I/O error: {0}")]
  Io(#[from] io::Error),

  #[error("Invalid argument provided: {0}")]
  InvalidArgument(String),

  #[error("Operation is invalid for the current table state: {0}")]
  InvalidState(&'static str),

  #[error("Protocol violation: {0}")]
  Protocol(#[from] ProtocolViolation),

  #[error("Mailbox of philosopher {philosopher} is closed")]
  MailboxClosed { philosopher: PhilosopherId },

  #[error("Operation timed out")]
  Timeout,

  #[error("Internal library error: {0}")]
  Internal(String),
}

impl DiningError {
  /// True for errors that indicate the protocol itself was broken.
  pub fn is_protocol_violation(&self) -> bool {
    matches!(self, DiningError::Protocol(_))
  }
}

pub type DiningResult<T> = Result<T, DiningError>;
