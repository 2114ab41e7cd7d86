// Exodus - Trading Pipeline Entry Point
// Parses run configuration, validates a time-series dataset, and dispatches
// to one of four operating modes (train, predict, backtest, optimize).

#![deny(clippy::unwrap_used)]

pub mod cli;
pub mod config;
pub mod data;
pub mod ml;
pub mod orchestrator;
pub mod system;
pub mod trading;

// Re-export commonly used items
pub use config::{ParameterOverrides, TradingParameters};
pub use data::{PipelineError, PipelineResult, RawRecordSet, TimeIndexedTable, ValidatedTable};
pub use orchestrator::{Mode, Orchestrator, RunOutcome, RunRequest};
