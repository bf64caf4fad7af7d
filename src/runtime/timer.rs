// src/runtime/timer.rs

//! Delayed self-sends. This is the only way a philosopher "spends time":
//! thinking and eating are modelled as a message arriving in its own mailbox
//! later, never as a sleep inside the processing loop.

use crate::philosopher::PhilosopherId;
use crate::runtime::mailbox::MailboxSender;
use crate::runtime::message::Message;

use rand::Rng;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A half-open range `[min, max)` of durations to draw from uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationRange {
  min: Duration,
  max: Duration,
}

impl DurationRange {
  /// Returns `None` when `min > max`. An empty range (`min == max`) always
  /// yields `min`.
  pub fn new(min: Duration, max: Duration) -> Option<Self> {
    if min > max {
      None
    } else {
      Some(Self { min, max })
    }
  }

  pub fn from_millis(min: u64, max: u64) -> Option<Self> {
    Self::new(Duration::from_millis(min), Duration::from_millis(max))
  }

  pub fn from_secs(min: u64, max: u64) -> Option<Self> {
    Self::new(Duration::from_secs(min), Duration::from_secs(max))
  }

  /// For bounds known at compile time.
  pub(crate) const fn ordered_secs(min: u64, max: u64) -> Self {
    assert!(min <= max);
    Self {
      min: Duration::from_secs(min),
      max: Duration::from_secs(max),
    }
  }

  /// A range that always yields `d`.
  pub fn fixed(d: Duration) -> Self {
    Self { min: d, max: d }
  }

  pub fn min(&self) -> Duration {
    self.min
  }

  pub fn max(&self) -> Duration {
    self.max
  }

  pub fn sample(&self) -> Duration {
    self.sample_with(&mut rand::rng())
  }

  pub fn sample_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
    if self.min >= self.max {
      return self.min;
    }
    let span = (self.max - self.min).as_nanos() as u64;
    self.min + Duration::from_nanos(rng.random_range(0..span))
  }
}

/// Schedules messages into one philosopher's own mailbox.
///
/// Every scheduled message runs as its own timer task; all of them share a
/// cancellation token that is cancelled when the philosopher stops (or the
/// `SelfTimer` is dropped), so no message is delivered to a finished loop.
#[derive(Debug)]
pub struct SelfTimer {
  philosopher: PhilosopherId,
  mailbox: MailboxSender,
  cancel: CancellationToken,
}

impl SelfTimer {
  pub fn new(philosopher: PhilosopherId, mailbox: MailboxSender) -> Self {
    Self {
      philosopher,
      mailbox,
      cancel: CancellationToken::new(),
    }
  }

  /// Delivers `msg` after `delay`. Returns the timer task handle.
  pub fn send_in(&self, delay: Duration, msg: Message) -> JoinHandle<()> {
    let philosopher = self.philosopher;
    let mailbox = self.mailbox.clone();
    let cancel = self.cancel.child_token();
    tracing::trace!(philosopher, delay = ?delay, msg = %msg, "Scheduling delayed self-send");

    tokio::spawn(async move {
      tokio::select! {
        biased;
        _ = cancel.cancelled() => {
          tracing::trace!(philosopher, "Delayed self-send cancelled");
        }
        _ = tokio::time::sleep(delay) => {
          if mailbox.send(msg).await.is_err() {
            tracing::debug!(philosopher, "Mailbox closed before delayed self-send could be delivered");
          }
        }
      }
    })
  }

  /// Draws a delay from `range` and delivers `msg` after it.
  pub fn send_after(&self, range: &DurationRange, msg: Message) -> Duration {
    let delay = range.sample();
    self.send_in(delay, msg);
    delay
  }

  /// Cancels every pending delivery.
  pub fn cancel_all(&self) {
    self.cancel.cancel();
  }

  pub fn is_cancelled(&self) -> bool {
    self.cancel.is_cancelled()
  }
}

impl Drop for SelfTimer {
  fn drop(&mut self) {
    self.cancel.cancel();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::runtime::mailbox::mailbox;
  use crate::state::PhilState;
  use rand::{rngs::StdRng, SeedableRng};

  #[test]
  fn range_rejects_inverted_bounds() {
    assert!(DurationRange::from_millis(10, 5).is_none());
    assert!(DurationRange::from_millis(5, 5).is_some());
  }

  #[test]
  fn samples_stay_in_half_open_range() {
    let range = DurationRange::from_millis(5, 15).unwrap();
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..1000 {
      let d = range.sample_with(&mut rng);
      assert!(d >= Duration::from_millis(5), "{:?}", d);
      assert!(d < Duration::from_millis(15), "{:?}", d);
    }
  }

  #[test]
  fn fixed_range_is_constant() {
    let range = DurationRange::fixed(Duration::from_millis(3));
    assert_eq!(range.sample(), Duration::from_millis(3));
  }

  #[tokio::test(start_paused = true)]
  async fn delivers_after_delay() {
    let (tx, rx) = mailbox(4);
    let timer = SelfTimer::new(0, tx);
    timer.send_in(Duration::from_secs(5), Message::transition(PhilState::Hungry));

    tokio::time::sleep(Duration::from_secs(4)).await;
    assert!(rx.is_empty());

    tokio::time::sleep(Duration::from_secs(2)).await;
    let msg = rx.recv().await.unwrap();
    assert!(matches!(msg, Message::Transition { target: PhilState::Hungry }));
  }

  #[tokio::test(start_paused = true)]
  async fn cancelled_timers_never_deliver() {
    let (tx, rx) = mailbox(4);
    let timer = SelfTimer::new(0, tx);
    let handle = timer.send_in(Duration::from_secs(1), Message::transition(PhilState::Hungry));
    timer.cancel_all();
    handle.await.unwrap();

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(rx.is_empty());
    assert!(timer.is_cancelled());
  }
}
