// src/topology.rs

//! Ring arithmetic: which forks and which neighbours belong to a seat, and the
//! initial fork/request assignment.

use crate::fork::ForkId;
use crate::philosopher::PhilosopherId;

/// One of the two forks adjacent to a philosopher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
  Left,
  Right,
}

impl Side {
  pub const BOTH: [Side; 2] = [Side::Left, Side::Right];

  pub fn index(self) -> usize {
    match self {
      Side::Left => 0,
      Side::Right => 1,
    }
  }
}

/// Initial holdings and request flags for one seat.
///
/// Chosen so that the "who yields to whom" relation is acyclic at startup:
/// seat 0 holds both forks, seat 1 holds none and owes both requests, every
/// other seat holds its left fork and owes a request for its right one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeatPlan {
  pub holds: [bool; 2],
  pub requested: [bool; 2],
}

/// A ring of `n` seats. Fork `i` is the left fork of seat `i` and the right
/// fork of seat `i - 1 mod n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ring {
  seats: usize,
}

impl Ring {
  /// Smallest table on which two distinct forks exist per philosopher.
  pub const MIN_SEATS: usize = 2;

  pub fn new(seats: usize) -> Option<Self> {
    if seats < Self::MIN_SEATS {
      None
    } else {
      Some(Self { seats })
    }
  }

  pub fn seats(&self) -> usize {
    self.seats
  }

  pub fn left_fork(&self, seat: PhilosopherId) -> ForkId {
    seat
  }

  pub fn right_fork(&self, seat: PhilosopherId) -> ForkId {
    (seat + 1) % self.seats
  }

  pub fn fork(&self, seat: PhilosopherId, side: Side) -> ForkId {
    match side {
      Side::Left => self.left_fork(seat),
      Side::Right => self.right_fork(seat),
    }
  }

  pub fn left_neighbour(&self, seat: PhilosopherId) -> PhilosopherId {
    (seat + self.seats - 1) % self.seats
  }

  pub fn right_neighbour(&self, seat: PhilosopherId) -> PhilosopherId {
    (seat + 1) % self.seats
  }

  /// The philosopher sharing the fork on `side` of `seat`.
  pub fn neighbour(&self, seat: PhilosopherId, side: Side) -> PhilosopherId {
    match side {
      Side::Left => self.left_neighbour(seat),
      Side::Right => self.right_neighbour(seat),
    }
  }

  /// Which side of `seat` the fork lies on, or `None` if it is not adjacent.
  pub fn side_of(&self, seat: PhilosopherId, fork: ForkId) -> Option<Side> {
    if fork == self.left_fork(seat) {
      Some(Side::Left)
    } else if fork == self.right_fork(seat) {
      Some(Side::Right)
    } else {
      None
    }
  }

  pub fn are_neighbours(&self, a: PhilosopherId, b: PhilosopherId) -> bool {
    a != b && (self.left_neighbour(a) == b || self.right_neighbour(a) == b)
  }

  pub fn initial_plan(&self, seat: PhilosopherId) -> SeatPlan {
    match seat {
      0 => SeatPlan {
        holds: [true, true],
        requested: [false, false],
      },
      1 => SeatPlan {
        holds: [false, false],
        requested: [true, true],
      },
      _ => SeatPlan {
        holds: [true, false],
        requested: [false, true],
      },
    }
  }
}
