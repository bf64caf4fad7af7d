//! diningphils - The dining philosophers on Tokio, solved with the
//! Chandy-Misra hygienic protocol.
//!
//! Every philosopher is an actor: one task reading one mailbox, reacting to
//! one message at a time. Forks are values that move between neighbours
//! inside `Grant` messages, so no fork is ever shared or locked. Thinking and
//! eating take time only in the sense that a self-addressed message arrives
//! later.
//!
//! ```no_run
//! use diningphils::{Table, TableConfig};
//!
//! # async fn demo() -> Result<(), diningphils::DiningError> {
//! let table = Table::new(TableConfig::default())?;
//! table.start()?;
//! tokio::time::sleep(std::time::Duration::from_secs(60)).await;
//! table.term().await
//! # }
//! ```

pub mod algorithm;
pub mod board;
pub mod config;
pub mod error;
pub mod fork;
pub mod monitor;
pub mod philosopher;
pub mod render;
pub mod runtime;
pub mod state;
pub mod table;
pub mod topology;

// Re-export core types for user convenience
pub use algorithm::Algorithm;
pub use config::TableConfig;
pub use error::{DiningError, DiningResult, ProtocolViolation};
pub use fork::{Fork, ForkId};
pub use monitor::{MonitorReport, SafetyMonitor, Violation};
pub use philosopher::{Diner, PhilosopherId};
pub use render::{AnsiScreen, NullSink, RenderSink, TracingSink};
pub use runtime::{DurationRange, Message, TableEvent};
pub use state::PhilState;
pub use table::Table;
pub use topology::{Ring, Side};

// --- Top-Level Functions ---

const VERSION_MAJOR: i32 = 0;
const VERSION_MINOR: i32 = 1;
const VERSION_PATCH: i32 = 0;

/// Returns the library version as a tuple (major, minor, patch).
pub fn version() -> (i32, i32, i32) {
  (VERSION_MAJOR, VERSION_MINOR, VERSION_PATCH)
}

/// Returns the major version number of the library.
pub fn version_major() -> i32 {
  VERSION_MAJOR
}

/// Returns the minor version number of the library.
pub fn version_minor() -> i32 {
  VERSION_MINOR
}

/// Returns the patch version number of the library.
pub fn version_patch() -> i32 {
  VERSION_PATCH
}
