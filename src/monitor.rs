// src/monitor.rs

//! An outside observer of the table. It sees only the event bus and checks
//! the two properties every correct algorithm must keep: neighbours never eat
//! at the same time, and a fork never has two holders.

use crate::fork::ForkId;
use crate::philosopher::PhilosopherId;
use crate::runtime::TableEvent;
use crate::state::PhilState;
use crate::topology::Ring;

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{error::RecvError, Receiver};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
  /// `philosopher` started eating while `neighbour` was eating.
  NeighboursEating {
    philosopher: PhilosopherId,
    neighbour: PhilosopherId,
  },
  /// `claimant` acquired `fork` while `holder` still held it.
  ForkDoubleHeld {
    fork: ForkId,
    holder: PhilosopherId,
    claimant: PhilosopherId,
  },
}

impl fmt::Display for Violation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Violation::NeighboursEating { philosopher, neighbour } => {
        write!(f, "philosopher {} ate while neighbour {} was eating", philosopher, neighbour)
      }
      Violation::ForkDoubleHeld { fork, holder, claimant } => {
        write!(f, "philosopher {} took fork {} still held by {}", claimant, fork, holder)
      }
    }
  }
}

/// What the monitor saw.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorReport {
  /// Meals started, per philosopher.
  pub meals: Vec<u64>,
  pub violations: Vec<Violation>,
  /// Events dropped because the monitor fell behind the bus.
  pub lagged: u64,
  /// Whether every philosopher reached the requested number of meals.
  pub completed: bool,
}

impl MonitorReport {
  pub fn is_safe(&self) -> bool {
    self.violations.is_empty()
  }

  pub fn total_meals(&self) -> u64 {
    self.meals.iter().sum()
  }

  pub fn min_meals(&self) -> u64 {
    self.meals.iter().copied().min().unwrap_or(0)
  }
}

impl fmt::Display for MonitorReport {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "meals: {:?} (total {})", self.meals, self.total_meals())?;
    if self.lagged > 0 {
      writeln!(f, "missed events: {}", self.lagged)?;
    }
    if self.violations.is_empty() {
      write!(f, "violations: none")
    } else {
      write!(f, "violations: {}", self.violations.len())?;
      for v in &self.violations {
        write!(f, "\n  {}", v)?;
      }
      Ok(())
    }
  }
}

#[derive(Debug)]
pub struct SafetyMonitor {
  ring: Ring,
  eating: Vec<bool>,
  holders: Vec<Option<PhilosopherId>>,
  report: Arc<Mutex<MonitorReport>>,
}

impl SafetyMonitor {
  pub fn new(ring: Ring) -> Self {
    let seats = ring.seats();
    Self {
      ring,
      eating: vec![false; seats],
      holders: vec![None; seats],
      report: Arc::new(Mutex::new(MonitorReport {
        meals: vec![0; seats],
        ..Default::default()
      })),
    }
  }

  /// Snapshot of the report so far.
  pub fn report(&self) -> MonitorReport {
    self.report.lock().clone()
  }

  /// Folds one event into the tracked state.
  pub fn observe(&mut self, event: &TableEvent) {
    match *event {
      TableEvent::StateChanged {
        philosopher,
        state: PhilState::Eating,
      } => {
        let mut report = self.report.lock();
        report.meals[philosopher] += 1;
        let (left, right) = (self.ring.left_neighbour(philosopher), self.ring.right_neighbour(philosopher));
        let neighbours = if left == right { vec![left] } else { vec![left, right] };
        for neighbour in neighbours {
          if self.eating[neighbour] {
            let v = Violation::NeighboursEating { philosopher, neighbour };
            tracing::warn!(violation = %v, "Safety violation observed");
            report.violations.push(v);
          }
        }
        self.eating[philosopher] = true;
      }
      TableEvent::StateChanged { philosopher, .. } => {
        self.eating[philosopher] = false;
      }
      TableEvent::ForkAcquired { philosopher, fork } => {
        if let Some(holder) = self.holders[fork].filter(|holder| *holder != philosopher) {
          let v = Violation::ForkDoubleHeld {
            fork,
            holder,
            claimant: philosopher,
          };
          tracing::warn!(violation = %v, "Mutual exclusion violation observed");
          self.report.lock().violations.push(v);
        }
        self.holders[fork] = Some(philosopher);
      }
      TableEvent::ForkReleased { philosopher, fork, .. } => {
        if self.holders[fork] == Some(philosopher) {
          self.holders[fork] = None;
        }
      }
      _ => {}
    }
  }

  fn lagged(&mut self, missed: u64) {
    tracing::warn!(missed, "Safety monitor lagged behind the event bus");
    // Forget what we knew rather than report violations from a partial history.
    self.eating.iter_mut().for_each(|e| *e = false);
    self.holders.iter_mut().for_each(|h| *h = None);
    self.report.lock().lagged += missed;
  }

  fn all_fed(&self, meals_each: u64) -> bool {
    self.report.lock().meals.iter().all(|m| *m >= meals_each)
  }

  /// Observes `events` until every philosopher has started `meals_each`
  /// meals, the table terminates, or `timeout` elapses.
  pub async fn run_until(mut self, events: &mut Receiver<TableEvent>, meals_each: u64, timeout: Duration) -> MonitorReport {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
      if self.all_fed(meals_each) {
        self.report.lock().completed = true;
        break;
      }
      match tokio::time::timeout_at(deadline, events.recv()).await {
        Ok(Ok(TableEvent::TableTerminating)) | Ok(Err(RecvError::Closed)) => break,
        Ok(Ok(event)) => self.observe(&event),
        Ok(Err(RecvError::Lagged(missed))) => self.lagged(missed),
        Err(_) => {
          tracing::debug!(?timeout, "Safety monitor deadline reached");
          break;
        }
      }
    }
    self.report()
  }

  /// Observes `events` in the background until the table terminates.
  pub fn spawn(mut self, mut events: Receiver<TableEvent>) -> MonitorHandle {
    let report = self.report.clone();
    let task = tokio::spawn(async move {
      loop {
        match events.recv().await {
          Ok(TableEvent::TableTerminating) | Err(RecvError::Closed) => break,
          Ok(event) => self.observe(&event),
          Err(RecvError::Lagged(missed)) => self.lagged(missed),
        }
      }
    });
    MonitorHandle { report, task }
  }
}

/// A monitor running in its own task.
#[derive(Debug)]
pub struct MonitorHandle {
  report: Arc<Mutex<MonitorReport>>,
  task: JoinHandle<()>,
}

impl MonitorHandle {
  pub fn report(&self) -> MonitorReport {
    self.report.lock().clone()
  }

  /// Waits for the monitor to see the table terminate and returns its report.
  pub async fn finish(self) -> MonitorReport {
    if let Err(e) = self.task.await {
      tracing::error!(error = %e, "Safety monitor task failed");
    }
    let report = self.report.lock().clone();
    report
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ring(n: usize) -> Ring {
    Ring::new(n).unwrap()
  }

  fn state(philosopher: PhilosopherId, state: PhilState) -> TableEvent {
    TableEvent::StateChanged { philosopher, state }
  }

  #[test]
  fn flags_adjacent_eaters() {
    let mut monitor = SafetyMonitor::new(ring(5));
    monitor.observe(&state(0, PhilState::Eating));
    monitor.observe(&state(2, PhilState::Eating));
    assert!(monitor.report().is_safe());
    monitor.observe(&state(1, PhilState::Eating));
    let report = monitor.report();
    assert_eq!(report.violations.len(), 2);
    assert_eq!(
      report.violations[0],
      Violation::NeighboursEating {
        philosopher: 1,
        neighbour: 0
      }
    );
    assert_eq!(report.meals, vec![1, 1, 1, 0, 0]);
  }

  #[test]
  fn leaving_the_table_clears_eating() {
    let mut monitor = SafetyMonitor::new(ring(3));
    monitor.observe(&state(0, PhilState::Eating));
    monitor.observe(&state(0, PhilState::Thinking));
    monitor.observe(&state(1, PhilState::Eating));
    assert!(monitor.report().is_safe());
  }

  #[test]
  fn two_seat_ring_reports_once() {
    let mut monitor = SafetyMonitor::new(ring(2));
    monitor.observe(&state(0, PhilState::Eating));
    monitor.observe(&state(1, PhilState::Eating));
    assert_eq!(monitor.report().violations.len(), 1);
  }

  #[test]
  fn flags_fork_taken_before_release() {
    let mut monitor = SafetyMonitor::new(ring(3));
    monitor.observe(&TableEvent::ForkAcquired { philosopher: 0, fork: 1 });
    monitor.observe(&TableEvent::ForkAcquired { philosopher: 1, fork: 1 });
    assert_eq!(
      monitor.report().violations,
      vec![Violation::ForkDoubleHeld {
        fork: 1,
        holder: 0,
        claimant: 1
      }]
    );

    let mut monitor = SafetyMonitor::new(ring(3));
    monitor.observe(&TableEvent::ForkAcquired { philosopher: 0, fork: 1 });
    monitor.observe(&TableEvent::ForkReleased {
      philosopher: 0,
      fork: 1,
      to: Some(1),
    });
    monitor.observe(&TableEvent::ForkAcquired { philosopher: 1, fork: 1 });
    assert!(monitor.report().is_safe());
  }

  #[tokio::test]
  async fn run_until_stops_when_everyone_has_eaten() {
    let bus = crate::runtime::EventBus::new();
    let mut rx = bus.subscribe();
    for p in 0..3 {
      bus.publish(state(p, PhilState::Eating)).unwrap();
      bus.publish(state(p, PhilState::Thinking)).unwrap();
    }
    let report = SafetyMonitor::new(ring(3))
      .run_until(&mut rx, 1, Duration::from_secs(1))
      .await;
    assert!(report.completed);
    assert!(report.is_safe());
    assert_eq!(report.total_meals(), 3);
  }

  #[tokio::test(start_paused = true)]
  async fn run_until_gives_up_at_the_deadline() {
    let bus = crate::runtime::EventBus::new();
    let mut rx = bus.subscribe();
    let report = SafetyMonitor::new(ring(3))
      .run_until(&mut rx, 1, Duration::from_secs(5))
      .await;
    assert!(!report.completed);
    assert_eq!(report.min_meals(), 0);
  }

  #[test]
  fn report_display_lists_violations() {
    let report = MonitorReport {
      meals: vec![1, 2],
      violations: vec![Violation::NeighboursEating {
        philosopher: 1,
        neighbour: 0,
      }],
      lagged: 0,
      completed: false,
    };
    let text = report.to_string();
    assert!(text.starts_with("meals: [1, 2] (total 3)"));
    assert!(text.contains("philosopher 1 ate while neighbour 0 was eating"));
  }
}
