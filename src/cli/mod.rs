use std::path::PathBuf;

use clap::Parser;

use crate::config::ParameterOverrides;
use crate::orchestrator::{Mode, RunRequest};

/// Machine-learning trading pipeline: validates a time-series dataset and
/// dispatches to the selected operating mode.
#[derive(Parser, Debug)]
#[command(name = "exodus", version, about)]
pub struct Cli {
    /// Operating mode
    #[arg(long, value_enum, default_value_t = Mode::Backtest)]
    pub mode: Mode,

    /// Path to the source data file (CSV with a header row)
    #[arg(long)]
    pub data: PathBuf,

    /// Output directory, created if absent [default: output]
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Training epoch count [default: 10]
    #[arg(long)]
    pub epochs: Option<u32>,

    /// Sequence length for windowed models [default: 20]
    #[arg(long)]
    pub sequence_length: Option<usize>,

    /// Initial capital for backtesting [default: 350]
    #[arg(long, allow_negative_numbers = true)]
    pub initial_capital: Option<f64>,

    /// Per-trade fee rate [default: 0.0005]
    #[arg(long, allow_negative_numbers = true)]
    pub fee: Option<f64>,

    /// Trial count for optimization [default: 30]
    #[arg(long)]
    pub n_trials: Option<u32>,
}

impl Cli {
    /// Convert parsed arguments into a run request. Absent flags leave the
    /// corresponding parameter defaults untouched.
    pub fn into_request(self) -> RunRequest {
        RunRequest {
            mode: self.mode,
            data_path: self.data,
            overrides: ParameterOverrides {
                initial_capital: self.initial_capital,
                fee_rate: self.fee,
                epochs: self.epochs,
                sequence_length: self.sequence_length,
                n_trials: self.n_trials,
                output_dir: self.output,
            },
        }
    }
}
