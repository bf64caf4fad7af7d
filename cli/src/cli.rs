use clap::Parser;
use diningphils::{Algorithm, DurationRange, TableConfig};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[clap(name = "diningphils", version, about = "Dining philosophers simulator")]
pub struct Cli {
  #[clap(subcommand)]
  pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
  /// Seat a table and let it run until `q`, end of input or --duration
  Run(RunArgs),
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
  Ms,
  S,
}

impl TimeUnit {
  pub fn duration(self, amount: u64) -> Duration {
    match self {
      TimeUnit::Ms => Duration::from_millis(amount),
      TimeUnit::S => Duration::from_secs(amount),
    }
  }
}

/// `MIN..MAX` on the command line, in `--unit`s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeArg {
  pub min: u64,
  pub max: u64,
}

impl RangeArg {
  pub fn to_duration_range(self, unit: TimeUnit) -> DurationRange {
    // Parsing guarantees min <= max.
    DurationRange::new(unit.duration(self.min), unit.duration(self.max))
      .unwrap_or_else(|| DurationRange::fixed(unit.duration(self.min)))
  }
}

pub fn parse_range(s: &str) -> Result<RangeArg, String> {
  let (min, max) = match s.split_once("..") {
    Some((min, max)) => (min.trim(), max.trim()),
    None => (s.trim(), s.trim()),
  };
  let min: u64 = min.parse().map_err(|e| format!("invalid minimum '{}': {}", min, e))?;
  let max: u64 = max.parse().map_err(|e| format!("invalid maximum '{}': {}", max, e))?;
  if min > max {
    return Err(format!("minimum {} is larger than maximum {}", min, max));
  }
  Ok(RangeArg { min, max })
}

#[derive(Parser, Debug)]
pub struct RunArgs {
  /// Fork acquisition algorithm: chandy-misra, resource-hierarchy or fingers
  #[clap(long, short, default_value = "chandy-misra")]
  pub algorithm: Algorithm,

  /// Number of philosophers, named from the built-in list
  #[clap(long, short = 'n', conflicts_with = "names")]
  pub philosophers: Option<usize>,

  /// Comma separated philosopher names; one seat per name
  #[clap(long, value_delimiter = ',')]
  pub names: Option<Vec<String>>,

  /// Thinking time range, MIN..MAX
  #[clap(long, value_parser = parse_range, default_value = "5..15")]
  pub think: RangeArg,

  /// Eating time range, MIN..MAX
  #[clap(long, value_parser = parse_range, default_value = "5..15")]
  pub eat: RangeArg,

  /// Unit of --think and --eat
  #[clap(long, value_enum, default_value = "s")]
  pub unit: TimeUnit,

  /// Capacity of every philosopher's mailbox
  #[clap(long, default_value_t = diningphils::runtime::DEFAULT_MAILBOX_CAPACITY)]
  pub mailbox_capacity: usize,

  /// Stop automatically after this many seconds
  #[clap(long)]
  pub duration: Option<u64>,

  /// Log status lines instead of drawing the table
  #[clap(long, action)]
  pub plain: bool,

  /// Watch for safety violations and print a report at the end
  #[clap(long, action)]
  pub verify: bool,

  /// Write logs to this file instead of stderr
  #[clap(long)]
  pub log_file: Option<PathBuf>,
}

impl RunArgs {
  pub fn to_config(&self) -> TableConfig {
    let mut config = TableConfig::default()
      .with_algorithm(self.algorithm)
      .with_think(self.think.to_duration_range(self.unit))
      .with_eat(self.eat.to_duration_range(self.unit))
      .with_mailbox_capacity(self.mailbox_capacity);
    if let Some(names) = &self.names {
      config = config.with_names(names.iter().map(|n| n.trim().to_string()));
    } else if let Some(n) = self.philosophers {
      config = config.with_philosophers(n);
    }
    config
  }
}
