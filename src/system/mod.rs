// System Monitoring Module
// Point-in-time resource telemetry captured at orchestrator checkpoints

use chrono::{DateTime, Utc};
use serde::Serialize;
use sysinfo::{Pid, System};
use tracing::info;

const GB: u64 = 1024 * 1024 * 1024;

/// Fixed points in the run at which telemetry is sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Checkpoint {
    Initial,
    PreMode,
    PostMode,
    Final,
    OnFailure,
}

/// A point-in-time capture of process and host resource usage.
///
/// Observational only: snapshots are appended to the run outcome and never
/// feed back into control flow.
#[derive(Debug, Clone, Serialize)]
pub struct TelemetrySnapshot {
    pub captured_at: DateTime<Utc>,
    pub total_memory_gb: f64,
    pub available_memory_gb: f64,
    pub used_memory_gb: f64,
    pub memory_usage_pct: f64,
    pub process_memory_gb: f64,
    pub cpu_count: usize,
}

/// Monitor wrapping a sysinfo `System` handle.
pub struct SystemMonitor {
    system: System,
}

impl SystemMonitor {
    pub fn new() -> Self {
        Self {
            system: System::new_all(),
        }
    }

    /// Capture a telemetry snapshot and log it at the given checkpoint.
    pub fn snapshot(&mut self, checkpoint: Checkpoint) -> TelemetrySnapshot {
        self.system.refresh_memory();
        self.system.refresh_processes();

        let total_memory = self.system.total_memory();
        let available_memory = self.system.available_memory();
        let used_memory = self.system.used_memory();

        let process_memory_gb = self
            .system
            .process(Pid::from_u32(std::process::id()))
            .map(|p| p.memory() as f64 / GB as f64)
            .unwrap_or(0.0);

        let snapshot = TelemetrySnapshot {
            captured_at: Utc::now(),
            total_memory_gb: total_memory as f64 / GB as f64,
            available_memory_gb: available_memory as f64 / GB as f64,
            used_memory_gb: used_memory as f64 / GB as f64,
            memory_usage_pct: if total_memory > 0 {
                (used_memory as f64 / total_memory as f64) * 100.0
            } else {
                0.0
            },
            process_memory_gb,
            cpu_count: self.system.cpus().len(),
        };

        info!(
            checkpoint = ?checkpoint,
            available_gb = format!("{:.2}", snapshot.available_memory_gb),
            total_gb = format!("{:.2}", snapshot.total_memory_gb),
            usage_pct = format!("{:.1}", snapshot.memory_usage_pct),
            process_gb = format!("{:.3}", snapshot.process_memory_gb),
            "telemetry snapshot"
        );

        snapshot
    }
}

impl Default for SystemMonitor {
    fn default() -> Self {
        Self::new()
    }
}
