use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use exodus::cli::Cli;
use exodus::Orchestrator;

fn main() {
    // Initialize tracing with structured logging
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "Exodus starting up");

    let cli = Cli::parse();
    let request = cli.into_request();
    let mode = request.mode;

    let mut orchestrator = Orchestrator::new();
    match orchestrator.run(request) {
        Ok(outcome) => {
            info!(
                mode = mode.as_str(),
                rows = outcome.rows,
                summary = %outcome.result.summary,
                snapshots = outcome.snapshots.len(),
                "Exodus completed successfully"
            );
        }
        Err(err) => {
            // The orchestrator already logged the failure-time telemetry;
            // surface the full error chain and exit nonzero.
            let chain: Vec<String> = std::iter::successors(
                Some(&err as &dyn std::error::Error),
                |e| e.source(),
            )
            .map(|e| e.to_string())
            .collect();
            error!(error_chain = ?chain, "Exodus run failed");
            std::process::exit(1);
        }
    }
}
