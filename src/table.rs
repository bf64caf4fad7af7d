// src/table.rs

use crate::algorithm::Wiring;
use crate::board::StateBoard;
use crate::config::TableConfig;
use crate::error::{DiningError, DiningResult};
use crate::philosopher::{run_diner, CoreParams, Diner, PhilosopherCore, PhilosopherId};
use crate::render::{NullSink, RenderSink};
use crate::runtime::{mailbox, EventBus, MailboxReceiver, MailboxSender, Message, TableEvent, WaitGroup};
use crate::state::PhilState;
use crate::topology::Ring;

use futures::stream::{FuturesUnordered, StreamExt};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

type PendingSeat = (Box<dyn Diner>, MailboxReceiver);

/// State shared by every `Table` handle and the supervisor task.
pub(crate) struct TableInner {
  config: TableConfig,
  ring: Ring,
  board: StateBoard,
  events: EventBus,
  sink: Arc<dyn RenderSink>,
  /// Every philosopher's mailbox, indexed by id.
  mailboxes: Vec<MailboxSender>,
  /// Philosophers built by `new` and not yet spawned.
  pending: parking_lot::Mutex<Option<Vec<PendingSeat>>>,
  /// Resolves to the first philosopher error once every loop has exited.
  supervisor: tokio::sync::Mutex<Option<JoinHandle<DiningResult<()>>>>,
  /// Count of philosopher loops still running.
  wait_group: WaitGroup,
  started: AtomicBool,
  shutdown_initiated: AtomicBool,
}

impl TableInner {
  /// Publishes `TableTerminating` and delivers Stop to every philosopher.
  async fn shutdown(&self) {
    if self
      .shutdown_initiated
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
      .is_err()
    {
      tracing::debug!("Table shutdown already initiated.");
      return;
    }
    tracing::info!(active = self.wait_group.get_count(), "Table shutdown initiated.");
    let _ = self.events.publish(TableEvent::TableTerminating);

    if self.pending.lock().take().is_some() {
      tracing::debug!("Table stopped before it was started, discarding philosophers.");
    }

    let stops = self.mailboxes.iter().enumerate().map(|(philosopher, mb)| async move {
      // A loop that already exited has closed its mailbox.
      if mb.send(Message::stop()).await.is_err() {
        tracing::debug!(philosopher, "Philosopher already stopped, Stop not delivered");
      }
    });
    futures::future::join_all(stops).await;
    tracing::debug!("Sent Stop to every philosopher.");
  }
}

/// A set table: N philosophers on a ring, each running its own loop.
///
/// Handles are cheap to clone and can be shared between tasks.
#[derive(Clone)]
pub struct Table {
  inner: Arc<TableInner>,
}

impl Table {
  /// Validates `config` and builds every philosopher. Nothing runs until `start`.
  pub fn new(config: TableConfig) -> DiningResult<Self> {
    Self::with_sink(config, Arc::new(NullSink))
  }

  /// Like `new`, drawing status lines on `sink`.
  pub fn with_sink(config: TableConfig, sink: Arc<dyn RenderSink>) -> DiningResult<Self> {
    let ring = config.validate()?;
    let seats = ring.seats();
    tracing::debug!(algorithm = %config.algorithm, seats, "Creating new table");

    let board = StateBoard::new(seats);
    let events = EventBus::new();
    let (mailboxes, receivers): (Vec<MailboxSender>, Vec<MailboxReceiver>) =
      (0..seats).map(|_| mailbox(config.mailbox_capacity)).unzip();
    let wiring = Wiring::new(config.algorithm, mailboxes.clone());

    let pending = receivers
      .into_iter()
      .enumerate()
      .map(|(id, rx)| {
        let core = PhilosopherCore::new(CoreParams {
          id,
          name: config.names[id].clone(),
          ring,
          think: config.think,
          eat: config.eat,
          own_mailbox: mailboxes[id].clone(),
          board: board.clone(),
          events: events.clone(),
          sink: sink.clone(),
        });
        (config.algorithm.build(core, &wiring), rx)
      })
      .collect();

    Ok(Self {
      inner: Arc::new(TableInner {
        config,
        ring,
        board,
        events,
        sink,
        mailboxes,
        pending: parking_lot::Mutex::new(Some(pending)),
        supervisor: tokio::sync::Mutex::new(None),
        wait_group: WaitGroup::new(),
        started: AtomicBool::new(false),
        shutdown_initiated: AtomicBool::new(false),
      }),
    })
  }

  /// Spawns one loop per philosopher plus a supervisor that stops the whole
  /// table as soon as any philosopher fails. Must be called within a runtime.
  pub fn start(&self) -> DiningResult<()> {
    let mut slot = self
      .inner
      .supervisor
      .try_lock()
      .map_err(|_| DiningError::InvalidState("table is being joined"))?;
    let pending = self
      .inner
      .pending
      .lock()
      .take()
      .ok_or(DiningError::InvalidState("table already started or stopped"))?;
    self.inner.started.store(true, Ordering::Release);

    let mut handles = Vec::with_capacity(pending.len());
    for (diner, rx) in pending {
      self.inner.wait_group.add(1);
      handles.push(tokio::spawn(run_diner(diner, rx, self.inner.wait_group.clone())));
    }
    tracing::info!(
      algorithm = %self.inner.config.algorithm,
      philosophers = handles.len(),
      "Table started"
    );

    let inner = self.inner.clone();
    *slot = Some(tokio::spawn(async move {
      let mut running: FuturesUnordered<_> = handles.into_iter().collect();
      let mut first_error: Option<DiningError> = None;
      while let Some(joined) = running.next().await {
        let result = joined.unwrap_or_else(|e| Err(DiningError::Internal(format!("philosopher task failed: {}", e))));
        if let Err(e) = result {
          if first_error.is_none() {
            tracing::error!(error = %e, "Philosopher failed, stopping the table");
            first_error = Some(e);
            inner.shutdown().await;
          } else {
            tracing::debug!(error = %e, "Further philosopher failure during shutdown");
          }
        }
      }
      tracing::debug!("Every philosopher loop has exited");
      first_error.map_or(Ok(()), Err)
    }));
    Ok(())
  }

  /// Receives every `TableEvent` published after this call. Subscribe before
  /// `start` to see the initial fork holdings.
  pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<TableEvent> {
    self.inner.events.subscribe()
  }

  /// Published state of every seat.
  pub fn states(&self) -> Vec<PhilState> {
    self.inner.board.snapshot()
  }

  pub fn board(&self) -> &StateBoard {
    &self.inner.board
  }

  pub fn ring(&self) -> Ring {
    self.inner.ring
  }

  pub fn config(&self) -> &TableConfig {
    &self.inner.config
  }

  pub fn sink(&self) -> &Arc<dyn RenderSink> {
    &self.inner.sink
  }

  /// Line on which the operator prompt sits, just below the status lines.
  pub fn prompt_line(&self) -> usize {
    self.inner.ring.seats() + 2
  }

  /// Number of philosopher loops still running.
  pub fn active_philosophers(&self) -> usize {
    self.inner.wait_group.get_count()
  }

  pub fn is_stopping(&self) -> bool {
    self.inner.shutdown_initiated.load(Ordering::Acquire)
  }

  /// Delivers `msg` to one philosopher's mailbox, as if a neighbour had sent it.
  pub async fn send(&self, philosopher: PhilosopherId, msg: Message) -> DiningResult<()> {
    let mailbox = self.inner.mailboxes.get(philosopher).ok_or_else(|| {
      DiningError::InvalidArgument(format!("no philosopher {} at a table of {}", philosopher, self.inner.ring.seats()))
    })?;
    mailbox
      .send(msg)
      .await
      .map_err(|_| DiningError::MailboxClosed { philosopher })
  }

  /// Delivers Stop to every philosopher. Returns without waiting; idempotent.
  pub async fn stop(&self) -> DiningResult<()> {
    self.inner.shutdown().await;
    Ok(())
  }

  /// Waits until every philosopher loop has exited and returns the first
  /// failure, if any. Only the first completed `join` observes the failure.
  ///
  /// Cancel safe: dropping the future leaves the table joinable.
  pub async fn join(&self) -> DiningResult<()> {
    let mut slot = self.inner.supervisor.lock().await;
    let Some(handle) = slot.as_mut() else {
      return if self.inner.started.load(Ordering::Acquire) {
        Ok(())
      } else {
        Err(DiningError::InvalidState("table was never started"))
      };
    };
    let joined = handle.await;
    *slot = None;
    let result = joined.unwrap_or_else(|e| Err(DiningError::Internal(format!("table supervisor failed: {}", e))));
    self.inner.wait_group.wait().await;
    result
  }

  /// Stops every philosopher and waits for them, bounded by
  /// `TableConfig::shutdown_timeout`.
  pub async fn term(&self) -> DiningResult<()> {
    self.stop().await?;
    if !self.inner.started.load(Ordering::Acquire) {
      return Ok(());
    }
    match tokio::time::timeout(self.inner.config.shutdown_timeout, self.join()).await {
      Ok(result) => {
        tracing::info!("Table termination complete.");
        result
      }
      Err(_) => {
        tracing::warn!(
          active = self.active_philosophers(),
          timeout = ?self.inner.config.shutdown_timeout,
          "Timeout waiting for philosophers to stop"
        );
        Err(DiningError::Timeout)
      }
    }
  }
}

impl fmt::Debug for Table {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Table")
      .field("algorithm", &self.inner.config.algorithm)
      .field("seats", &self.inner.ring.seats())
      .field("active", &self.active_philosophers())
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::algorithm::Algorithm;
  use crate::runtime::DurationRange;
  use std::time::Duration;

  fn fast_config(n: usize) -> TableConfig {
    TableConfig::default()
      .with_philosophers(n)
      .with_think(DurationRange::from_millis(1, 5).unwrap())
      .with_eat(DurationRange::from_millis(1, 5).unwrap())
      .with_shutdown_timeout(Duration::from_secs(5))
  }

  #[test]
  fn new_rejects_invalid_config() {
    assert!(matches!(
      Table::new(TableConfig::default().with_philosophers(1)),
      Err(DiningError::InvalidArgument(_))
    ));
  }

  #[tokio::test]
  async fn start_twice_is_invalid() {
    let table = Table::new(fast_config(3)).unwrap();
    table.start().unwrap();
    assert!(matches!(table.start(), Err(DiningError::InvalidState(_))));
    table.term().await.unwrap();
  }

  #[tokio::test]
  async fn join_before_start_is_invalid() {
    let table = Table::new(fast_config(3)).unwrap();
    assert!(matches!(table.join().await, Err(DiningError::InvalidState(_))));
  }

  #[tokio::test]
  async fn stop_before_start_discards_philosophers() {
    let table = Table::new(fast_config(3)).unwrap();
    table.term().await.unwrap();
    assert!(table.is_stopping());
    assert!(table.start().is_err());
  }

  #[tokio::test]
  async fn term_stops_every_philosopher() {
    let table = Table::new(fast_config(5).with_algorithm(Algorithm::ResourceHierarchy)).unwrap();
    table.start().unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;
    table.term().await.unwrap();
    assert_eq!(table.active_philosophers(), 0);
    assert_eq!(table.states(), vec![PhilState::Stopped; 5]);
    // A second term is a no-op.
    table.term().await.unwrap();
  }

  #[tokio::test]
  async fn prompt_sits_below_the_status_lines() {
    let table = Table::new(fast_config(5)).unwrap();
    assert_eq!(table.prompt_line(), 7);
  }
}
