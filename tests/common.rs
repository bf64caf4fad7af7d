// tests/common.rs
#![allow(dead_code)]

use diningphils::{Algorithm, DurationRange, MonitorReport, SafetyMonitor, Table, TableConfig};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use std::sync::Once;
use std::time::Duration;

// Use std::sync::Once for one-time initialization
static TRACING_INIT: Once = Once::new();

/// Installs a test-writer subscriber once; `RUST_LOG` overrides the filter.
pub fn setup_tracing() {
  TRACING_INIT.call_once(|| {
    let default_filter = "diningphils=debug,warn";
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let subscriber = FmtSubscriber::builder()
      .with_max_level(tracing::Level::TRACE)
      .with_env_filter(env_filter)
      .with_target(true)
      .with_line_number(true)
      .with_test_writer()
      .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set global tracing subscriber");
  });
}

/// Millisecond-scale think and eat times so tables get through many meals quickly.
pub fn fast_config(algorithm: Algorithm, philosophers: usize) -> TableConfig {
  TableConfig::default()
    .with_algorithm(algorithm)
    .with_philosophers(philosophers)
    .with_think(DurationRange::from_millis(1, 4).unwrap())
    .with_eat(DurationRange::from_millis(1, 4).unwrap())
    .with_shutdown_timeout(Duration::from_secs(5))
}

/// Builds a table from `config`, watches it until every philosopher has
/// started `meals_each` meals (or `timeout` passes), then terminates it.
pub async fn run_monitored(
  config: TableConfig,
  meals_each: u64,
  timeout: Duration,
) -> anyhow::Result<MonitorReport> {
  setup_tracing();
  let table = Table::new(config)?;
  let mut events = table.subscribe();
  let monitor = SafetyMonitor::new(table.ring());
  table.start()?;

  let report = monitor.run_until(&mut events, meals_each, timeout).await;
  table.term().await?;
  Ok(report)
}
