// benches/meal_throughput.rs

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use diningphils::{Algorithm, DurationRange, SafetyMonitor, Table, TableConfig};
use std::time::Duration;
use tokio::runtime::Runtime;

// --- Benchmarking Constants ---
const MEALS_EACH: u64 = 20;
const RUN_TIMEOUT: Duration = Duration::from_secs(30);
const TABLE_SIZES: [usize; 3] = [3, 5, 9];

fn bench_config(algorithm: Algorithm, philosophers: usize) -> TableConfig {
  // Timer resolution is about a millisecond; shorter ranges only add noise.
  let tick = DurationRange::fixed(Duration::from_millis(1));
  TableConfig::default()
    .with_algorithm(algorithm)
    .with_philosophers(philosophers)
    .with_think(tick)
    .with_eat(tick)
}

/// Runs a table until everyone has started `MEALS_EACH` meals.
async fn feed_everyone(config: TableConfig) -> u64 {
  let table = Table::new(config).expect("valid bench config");
  let mut events = table.subscribe();
  let monitor = SafetyMonitor::new(table.ring());
  table.start().expect("table starts");
  let report = monitor.run_until(&mut events, MEALS_EACH, RUN_TIMEOUT).await;
  table.term().await.expect("table terminates cleanly");
  assert!(report.completed, "bench run did not complete: {:?}", report.meals);
  report.total_meals()
}

fn meal_throughput(c: &mut Criterion) {
  let rt = Runtime::new().expect("Failed to create Tokio runtime");
  let mut group = c.benchmark_group("meal_throughput");
  group.sample_size(10);

  for algorithm in [Algorithm::ChandyMisra, Algorithm::ResourceHierarchy] {
    for philosophers in TABLE_SIZES {
      group.throughput(Throughput::Elements(MEALS_EACH * philosophers as u64));
      group.bench_with_input(
        BenchmarkId::new(algorithm.as_str(), philosophers),
        &philosophers,
        |b, &n| {
          b.to_async(&rt).iter(|| feed_everyone(bench_config(algorithm, n)));
        },
      );
    }
  }
  group.finish();
}

criterion_group!(benches, meal_throughput);
criterion_main!(benches);
