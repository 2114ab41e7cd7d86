//! Machine learning mode collaborators
//!
//! Reference implementations behind the orchestrator's collaborator seam.
//! The real model internals are external to this core; these keep the
//! dispatch contract honest: they consume a validated table and validated
//! parameters and either report a result or fail with a reportable error.

use anyhow::{bail, Result};
use serde_json::json;
use tracing::{debug, info};

use crate::config::TradingParameters;
use crate::data::ValidatedTable;
use crate::orchestrator::{ModeCollaborator, RunResult};

/// Training collaborator: windows the close series and fits a trivial
/// moving-average predictor over the configured epoch count.
pub struct Trainer;

impl ModeCollaborator for Trainer {
    fn name(&self) -> &'static str {
        "train"
    }

    fn run(&self, table: &ValidatedTable, params: &TradingParameters) -> Result<RunResult> {
        let closes = table.closes();
        let window = params.sequence_length;
        if closes.len() <= window {
            bail!(
                "not enough rows to train: {} rows for sequence length {}",
                closes.len(),
                window
            );
        }

        let n_windows = closes.len() - window;
        let mut loss = f64::MAX;
        for epoch in 0..params.epochs {
            // One pass of a window-mean baseline; loss is mean squared error
            // of predicting the next close from the window mean.
            let mut sse = 0.0;
            for start in 0..n_windows {
                let slice = &closes[start..start + window];
                let mean = slice.iter().sum::<f64>() / window as f64;
                let target = closes[start + window];
                sse += (target - mean).powi(2);
            }
            loss = sse / n_windows as f64;
            debug!(epoch, loss, "training epoch complete");
        }

        info!(windows = n_windows, epochs = params.epochs, loss, "training complete");
        Ok(RunResult {
            mode: self.name().to_string(),
            summary: format!(
                "trained over {} windows for {} epochs (mse {:.6})",
                n_windows, params.epochs, loss
            ),
            metrics: json!({
                "windows": n_windows,
                "epochs": params.epochs,
                "mse": loss,
            }),
        })
    }
}

/// Prediction collaborator: momentum forecast of the next close from the
/// last `sequence_length` closes.
pub struct Predictor;

impl ModeCollaborator for Predictor {
    fn name(&self) -> &'static str {
        "predict"
    }

    fn run(&self, table: &ValidatedTable, params: &TradingParameters) -> Result<RunResult> {
        let closes = table.closes();
        let window = params.sequence_length.min(closes.len());
        let recent = &closes[closes.len() - window..];

        let last = *recent.last().ok_or_else(|| anyhow::anyhow!("empty close series"))?;
        let mean = recent.iter().sum::<f64>() / recent.len() as f64;
        // Momentum: project the deviation of the last close from the window
        // mean one step forward.
        let forecast = last + (last - mean);

        info!(last_close = last, forecast, window, "prediction complete");
        Ok(RunResult {
            mode: self.name().to_string(),
            summary: format!("next close forecast {:.4} (last {:.4})", forecast, last),
            metrics: json!({
                "last_close": last,
                "window_mean": mean,
                "forecast": forecast,
                "window": window,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::validation::{Candle, ValidationReport};
    use chrono::{TimeZone, Utc};

    fn table(closes: &[f64]) -> ValidatedTable {
        let rows = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Candle {
                timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                    + chrono::Duration::minutes(i as i64),
                open: c,
                high: c + 1.0,
                low: c - 1.0,
                close: c,
                volume: 100.0,
            })
            .collect();
        ValidatedTable {
            rows,
            gaps: Vec::new(),
            report: ValidationReport::default(),
        }
    }

    fn params(sequence_length: usize) -> TradingParameters {
        TradingParameters {
            sequence_length,
            epochs: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_trainer_needs_enough_rows() {
        let result = Trainer.run(&table(&[10.0, 11.0]), &params(5));
        assert!(result.is_err());
    }

    #[test]
    fn test_trainer_reports_windows_and_loss() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let result = Trainer.run(&table(&closes), &params(5)).expect("trains");
        assert_eq!(result.metrics["windows"], 25);
        assert!(result.metrics["mse"].as_f64().expect("mse") > 0.0);
    }

    #[test]
    fn test_predictor_momentum_direction() {
        // Steadily rising closes: forecast must exceed the last close.
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let result = Predictor.run(&table(&closes), &params(5)).expect("predicts");
        let forecast = result.metrics["forecast"].as_f64().expect("forecast");
        let last = result.metrics["last_close"].as_f64().expect("last");
        assert!(forecast > last);
    }
}
