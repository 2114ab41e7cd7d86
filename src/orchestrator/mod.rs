//! Mode orchestrator: sequences load → validate → configure → dispatch →
//! report, with telemetry snapshots at fixed checkpoints
//!
//! Transitions are strictly sequential; any failure in an earlier stage
//! short-circuits to the failure path without entering a mode branch. Mode
//! branches are single dispatch points to a collaborator; the orchestrator
//! guarantees the collaborator receives a validated table and validated
//! parameters, and never swallows a collaborator failure.

use std::fs;
use std::path::PathBuf;

use clap::ValueEnum;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};

use crate::config::{ParameterOverrides, TradingParameters};
use crate::data::{
    DataValidator, PipelineError, PipelineResult, RawRecordSet, TimestampValidator, ValidatedTable,
};
use crate::system::{Checkpoint, SystemMonitor, TelemetrySnapshot};

/// Operating mode. Closed set: dispatch is exhaustive, not string-matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Train,
    Predict,
    Backtest,
    Optimize,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Train => "train",
            Mode::Predict => "predict",
            Mode::Backtest => "backtest",
            Mode::Optimize => "optimize",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contract between the orchestrator and a mode's external collaborator.
///
/// Synchronous call/return; a collaborator failure is wrapped as a mode
/// execution error with its source chain preserved.
pub trait ModeCollaborator {
    fn name(&self) -> &'static str;
    fn run(&self, table: &ValidatedTable, params: &TradingParameters)
        -> anyhow::Result<RunResult>;
}

/// Result reported by a mode collaborator.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub mode: String,
    pub summary: String,
    pub metrics: Value,
}

/// The orchestrator's final state for a successful run.
#[derive(Debug, Serialize)]
pub struct RunOutcome {
    pub mode: Mode,
    pub success: bool,
    pub rows: usize,
    pub result: RunResult,
    pub snapshots: Vec<(Checkpoint, TelemetrySnapshot)>,
}

/// One run's inputs: the selected mode, the data source, and any parameter
/// overrides from the CLI.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub mode: Mode,
    pub data_path: PathBuf,
    pub overrides: ParameterOverrides,
}

/// Sequences the pipeline and owns the shared telemetry monitor.
pub struct Orchestrator {
    monitor: SystemMonitor,
    trainer: Box<dyn ModeCollaborator>,
    predictor: Box<dyn ModeCollaborator>,
    backtester: Box<dyn ModeCollaborator>,
    optimizer: Box<dyn ModeCollaborator>,
}

impl Orchestrator {
    /// Orchestrator wired to the built-in reference collaborators.
    pub fn new() -> Self {
        Self {
            monitor: SystemMonitor::new(),
            trainer: Box::new(crate::ml::Trainer),
            predictor: Box::new(crate::ml::Predictor),
            backtester: Box::new(crate::trading::Backtester),
            optimizer: Box::new(crate::trading::Optimizer),
        }
    }

    /// Orchestrator with caller-supplied collaborators.
    pub fn with_collaborators(
        trainer: Box<dyn ModeCollaborator>,
        predictor: Box<dyn ModeCollaborator>,
        backtester: Box<dyn ModeCollaborator>,
        optimizer: Box<dyn ModeCollaborator>,
    ) -> Self {
        Self {
            monitor: SystemMonitor::new(),
            trainer,
            predictor,
            backtester,
            optimizer,
        }
    }

    fn collaborator(&self, mode: Mode) -> &dyn ModeCollaborator {
        match mode {
            Mode::Train => self.trainer.as_ref(),
            Mode::Predict => self.predictor.as_ref(),
            Mode::Backtest => self.backtester.as_ref(),
            Mode::Optimize => self.optimizer.as_ref(),
        }
    }

    /// Run the full pipeline for one request.
    ///
    /// On failure the error is logged with a telemetry snapshot captured at
    /// failure time, then propagated with its source chain intact.
    pub fn run(&mut self, request: RunRequest) -> PipelineResult<RunOutcome> {
        let mut snapshots = Vec::new();
        match self.execute(&request, &mut snapshots) {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                let snapshot = self.monitor.snapshot(Checkpoint::OnFailure);
                error!(
                    mode = request.mode.as_str(),
                    error = %err,
                    available_gb = format!("{:.2}", snapshot.available_memory_gb),
                    process_gb = format!("{:.3}", snapshot.process_memory_gb),
                    "run failed"
                );
                Err(err)
            }
        }
    }

    fn execute(
        &mut self,
        request: &RunRequest,
        snapshots: &mut Vec<(Checkpoint, TelemetrySnapshot)>,
    ) -> PipelineResult<RunOutcome> {
        info!(mode = request.mode.as_str(), data = %request.data_path.display(), "starting run");

        // Configured: build parameters and prepare the output directory.
        let mut params = TradingParameters::default();
        params.apply_overrides(&request.overrides);
        if !params.output_dir.exists() {
            fs::create_dir_all(&params.output_dir)?;
            info!(dir = %params.output_dir.display(), "created output directory");
        }
        snapshots.push((Checkpoint::Initial, self.monitor.snapshot(Checkpoint::Initial)));

        // DataLoaded: ingest and validate the time series.
        let raw = RawRecordSet::from_csv(&request.data_path)?;
        info!(rows = raw.len(), columns = raw.headers.len(), "raw data loaded");
        let table = TimestampValidator::new().validate(raw)?;
        let validated = DataValidator::new().validate(table)?;
        info!(rows = validated.len(), "data loaded and validated");

        // ParamsValidated: parameters must pass before any mode runs.
        params.validate()?;

        // Mode dispatch, bracketed by telemetry snapshots.
        snapshots.push((Checkpoint::PreMode, self.monitor.snapshot(Checkpoint::PreMode)));
        let collaborator = self.collaborator(request.mode);
        info!(mode = collaborator.name(), "dispatching to mode collaborator");
        let result = collaborator.run(&validated, &params).map_err(|source| {
            PipelineError::ModeExecution {
                mode: request.mode.as_str().to_string(),
                source,
            }
        })?;
        snapshots.push((Checkpoint::PostMode, self.monitor.snapshot(Checkpoint::PostMode)));

        // Reported.
        snapshots.push((Checkpoint::Final, self.monitor.snapshot(Checkpoint::Final)));
        info!(
            mode = request.mode.as_str(),
            summary = %result.summary,
            "run completed successfully"
        );

        Ok(RunOutcome {
            mode: request.mode,
            success: true,
            rows: validated.len(),
            result,
            snapshots: std::mem::take(snapshots),
        })
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}
