// src/runtime/waitgroup.rs

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// An asynchronous WaitGroup, similar to Go's `sync.WaitGroup`.
///
/// The table `add`s one per spawned philosopher loop; each loop calls `done`
/// on exit, and `Table::join` waits for the count to return to zero.
#[derive(Debug, Clone)]
pub(crate) struct WaitGroup {
  count: Arc<AtomicUsize>,
  notify_on_zero: Arc<Notify>,
}

impl WaitGroup {
  /// Creates a new WaitGroup with an initial count of zero.
  pub fn new() -> Self {
    Self {
      count: Arc::new(AtomicUsize::new(0)),
      notify_on_zero: Arc::new(Notify::new()),
    }
  }

  /// Adds a delta to the WaitGroup counter.
  pub fn add(&self, delta: usize) {
    if delta == 0 {
      return;
    }
    let old_count = self.count.fetch_add(delta, Ordering::Relaxed);
    if old_count == 0 {
      tracing::trace!(delta, "WaitGroup count increased from zero");
    }
  }

  /// Decrements the counter by one, waking all waiters when it reaches zero.
  ///
  /// Panics if the counter would drop below zero.
  pub fn done(&self) {
    // AcqRel: work before done() is visible to tasks released by wait().
    let old_count = self.count.fetch_sub(1, Ordering::AcqRel);

    if old_count == 0 {
      self.count.fetch_add(1, Ordering::Relaxed);
      panic!("WaitGroup::done() called when count was already zero!");
    } else if old_count == 1 {
      self.notify_on_zero.notify_waiters();
      tracing::trace!("WaitGroup count reached zero, notifying waiters");
    }
  }

  /// Waits asynchronously until the counter becomes zero.
  pub async fn wait(&self) {
    loop {
      // Register interest before checking, so a done() racing with us is not lost.
      let notified = self.notify_on_zero.notified();
      if self.count.load(Ordering::Acquire) == 0 {
        return;
      }
      notified.await;
    }
  }

  pub fn get_count(&self) -> usize {
    self.count.load(Ordering::Relaxed)
  }
}
