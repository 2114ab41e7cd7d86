use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::data::{PipelineError, PipelineResult};

/// The run's tunable configuration.
///
/// Constructed with defaults, selectively overridden from CLI-derived values,
/// validated once, then treated as immutable for the rest of the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingParameters {
    /// Starting capital for backtests. Must be strictly positive.
    pub initial_capital: f64,
    /// Per-trade fee as a fraction of notional. Must lie in [0, 1).
    pub fee_rate: f64,
    /// Training epoch count. Must be at least 1.
    pub epochs: u32,
    /// Input sequence length for windowed models. Must be at least 2.
    pub sequence_length: usize,
    /// Trial count for hyperparameter optimization. Must be at least 1.
    pub n_trials: u32,
    /// Destination directory for run artifacts; created if absent.
    pub output_dir: PathBuf,
}

impl Default for TradingParameters {
    fn default() -> Self {
        Self {
            initial_capital: 350.0,
            fee_rate: 0.0005,
            epochs: 10,
            sequence_length: 20,
            n_trials: 30,
            output_dir: PathBuf::from("output"),
        }
    }
}

/// Optional overrides collected from the CLI. An absent value leaves the
/// corresponding default untouched.
#[derive(Debug, Clone, Default)]
pub struct ParameterOverrides {
    pub initial_capital: Option<f64>,
    pub fee_rate: Option<f64>,
    pub epochs: Option<u32>,
    pub sequence_length: Option<usize>,
    pub n_trials: Option<u32>,
    pub output_dir: Option<PathBuf>,
}

impl TradingParameters {
    /// Apply overrides field by field. Partial overrides are allowed and
    /// never force unrelated fields back to defaults.
    pub fn apply_overrides(&mut self, overrides: &ParameterOverrides) {
        if let Some(capital) = overrides.initial_capital {
            self.initial_capital = capital;
        }
        if let Some(fee) = overrides.fee_rate {
            self.fee_rate = fee;
        }
        if let Some(epochs) = overrides.epochs {
            self.epochs = epochs;
        }
        if let Some(len) = overrides.sequence_length {
            self.sequence_length = len;
        }
        if let Some(trials) = overrides.n_trials {
            self.n_trials = trials;
        }
        if let Some(ref dir) = overrides.output_dir {
            self.output_dir = dir.clone();
        }
    }

    /// Validate every field against its declared range.
    ///
    /// Pure and idempotent. Fails with a configuration error naming the
    /// first field that violates its range.
    pub fn validate(&self) -> PipelineResult<()> {
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(PipelineError::config(
                "initial_capital".to_string(),
                format!("must be > 0, got {}", self.initial_capital),
            ));
        }
        if !self.fee_rate.is_finite() || self.fee_rate < 0.0 || self.fee_rate >= 1.0 {
            return Err(PipelineError::config(
                "fee_rate".to_string(),
                format!("must lie in [0, 1), got {}", self.fee_rate),
            ));
        }
        if self.epochs < 1 {
            return Err(PipelineError::config(
                "epochs".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        if self.sequence_length < 2 {
            return Err(PipelineError::config(
                "sequence_length".to_string(),
                format!("must be at least 2, got {}", self.sequence_length),
            ));
        }
        if self.n_trials < 1 {
            return Err(PipelineError::config(
                "n_trials".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
