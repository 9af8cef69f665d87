//! Command-line runner for the island simulation.

mod render;
mod telemetry;

use anyhow::{Context, Result};
use clap::Parser;
use isle_core::{Error, SimulationConfig, SpeciesRegistry, SpeciesTable};
use isle_world::{Island, RunOutcome};
use render::TextRenderer;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

/// Concurrent predator/prey island simulation
#[derive(Debug, Parser)]
#[command(name = "isle", version, about)]
struct Args {
    /// Simulation configuration (JSON); defaults apply to missing fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Species table (JSON); the built-in island table when omitted
    #[arg(long)]
    species: Option<PathBuf>,

    #[arg(long)]
    workers: Option<usize>,

    /// Stop after this many cycles
    #[arg(long)]
    max_cycles: Option<u64>,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long)]
    width: Option<i32>,

    #[arg(long)]
    height: Option<i32>,

    /// Do not draw the grid after each cycle
    #[arg(long)]
    no_render: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Write the final statistics to this file as JSON
    #[arg(long)]
    report: Option<PathBuf>,
}

impl Args {
    fn simulation_config(&self) -> Result<SimulationConfig> {
        let mut config = match &self.config {
            Some(path) => SimulationConfig::from_path(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => SimulationConfig::default(),
        };

        if let Some(workers) = self.workers {
            config.engine.workers = workers;
        }
        if let Some(seed) = self.seed {
            config.engine.seed = seed;
        }
        if let Some(width) = self.width {
            config.grid.width = width;
        }
        if let Some(height) = self.height {
            config.grid.height = height;
        }
        if self.max_cycles.is_some() {
            config.termination.max_cycles = self.max_cycles;
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }

    fn registry(&self) -> Result<SpeciesRegistry> {
        let table = match &self.species {
            Some(path) => SpeciesTable::from_path(path)
                .with_context(|| format!("failed to load species table {}", path.display()))?,
            None => SpeciesTable::builtin()?,
        };
        SpeciesRegistry::new(table).context("invalid species table")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    telemetry::init_telemetry(args.json_logs)?;

    let config = args.simulation_config()?;
    let registry = Arc::new(args.registry()?);

    info!("Starting island simulation");

    let mut island = Island::new(config, registry)?;
    if !args.no_render {
        island = island.with_renderer(Box::new(TextRenderer::stdout()));
    }
    let handle = island.shutdown_handle();

    let simulation = tokio::task::spawn_blocking(move || {
        let outcome = island.populate().and_then(|_| island.run());
        (island, outcome)
    });
    tokio::pin!(simulation);

    let (island, outcome) = tokio::select! {
        joined = &mut simulation => joined?,
        _ = shutdown_signal() => {
            handle.cancel();
            info!("Waiting for the current phase to stop");
            (&mut simulation).await?
        }
    };

    let shutdown = tokio::task::spawn_blocking(move || island.shutdown()).await?;
    if let Err(e) = shutdown {
        warn!(error = %e, "Worker pool did not drain in time");
    }

    match outcome {
        Ok(outcome) => {
            info!(
                end_reason = %outcome.end_reason,
                completed_cycles = outcome.completed_cycles,
                population = outcome.population,
                "Simulation complete"
            );
            if let Some(path) = &args.report {
                write_report(path, &outcome)?;
            }
            Ok(())
        }
        Err(Error::Cancelled(reason)) => {
            warn!(reason = %reason, "Simulation interrupted");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Simulation failed");
            Err(e.into())
        }
    }
}

fn write_report(path: &Path, outcome: &RunOutcome) -> Result<()> {
    let json = serde_json::to_string_pretty(outcome)?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write report {}", path.display()))?;
    info!(path = %path.display(), "Report written");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
