//! Trading mode collaborators: backtest and optimization
//!
//! Deliberately thin reference implementations behind the orchestrator's
//! collaborator seam; full P&L simulation and hyperparameter search are
//! external to this core.

use anyhow::{bail, Result};
use serde_json::json;
use tracing::{debug, info};

use crate::config::TradingParameters;
use crate::data::ValidatedTable;
use crate::orchestrator::{ModeCollaborator, RunResult};

/// Backtest collaborator: long-only buy-and-hold equity from first to last
/// close with entry and exit fees applied.
pub struct Backtester;

impl ModeCollaborator for Backtester {
    fn name(&self) -> &'static str {
        "backtest"
    }

    fn run(&self, table: &ValidatedTable, params: &TradingParameters) -> Result<RunResult> {
        let closes = table.closes();
        let (first, last) = match (closes.first(), closes.last()) {
            (Some(&f), Some(&l)) => (f, l),
            _ => bail!("backtest requires a non-empty close series"),
        };

        let entry_capital = params.initial_capital * (1.0 - params.fee_rate);
        let gross = entry_capital * (last / first);
        let final_equity = gross * (1.0 - params.fee_rate);
        let return_pct = (final_equity / params.initial_capital - 1.0) * 100.0;

        info!(
            rows = closes.len(),
            first_close = first,
            last_close = last,
            final_equity,
            return_pct = format!("{:.2}", return_pct),
            "backtest complete"
        );
        Ok(RunResult {
            mode: self.name().to_string(),
            summary: format!(
                "buy-and-hold over {} rows: {:.2} -> {:.2} ({:+.2}%)",
                closes.len(),
                params.initial_capital,
                final_equity,
                return_pct
            ),
            metrics: json!({
                "rows": closes.len(),
                "initial_capital": params.initial_capital,
                "final_equity": final_equity,
                "return_pct": return_pct,
                "fee_rate": params.fee_rate,
            }),
        })
    }
}

/// Optimization collaborator: evaluates `n_trials` momentum thresholds
/// against the close series and reports the best-performing one.
pub struct Optimizer;

impl Optimizer {
    /// Equity multiple of a threshold strategy: hold while the one-step
    /// return exceeds the threshold, pay the fee on each flip.
    fn evaluate(closes: &[f64], threshold: f64, fee_rate: f64) -> f64 {
        let mut equity = 1.0;
        let mut holding = false;
        for pair in closes.windows(2) {
            let ret = pair[1] / pair[0] - 1.0;
            if holding {
                equity *= 1.0 + ret;
            }
            let want_hold = ret > threshold;
            if want_hold != holding {
                equity *= 1.0 - fee_rate;
                holding = want_hold;
            }
        }
        equity
    }
}

impl ModeCollaborator for Optimizer {
    fn name(&self) -> &'static str {
        "optimize"
    }

    fn run(&self, table: &ValidatedTable, params: &TradingParameters) -> Result<RunResult> {
        let closes = table.closes();
        if closes.len() < 2 {
            bail!("optimization requires at least 2 rows");
        }

        let trials = params.n_trials;
        let mut best_threshold = 0.0;
        let mut best_equity = f64::MIN;
        for trial in 0..trials {
            // Thresholds spread over [0, 1%) one-step returns.
            let threshold = 0.01 * trial as f64 / trials as f64;
            let equity = Self::evaluate(&closes, threshold, params.fee_rate);
            debug!(trial, threshold, equity, "optimization trial");
            if equity > best_equity {
                best_equity = equity;
                best_threshold = threshold;
            }
        }

        info!(trials, best_threshold, best_equity, "optimization complete");
        Ok(RunResult {
            mode: self.name().to_string(),
            summary: format!(
                "{} trials: best threshold {:.5} (equity multiple {:.4})",
                trials, best_threshold, best_equity
            ),
            metrics: json!({
                "trials": trials,
                "best_threshold": best_threshold,
                "best_equity_multiple": best_equity,
            }),
        })
    }
}
