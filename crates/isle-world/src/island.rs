//! The island: an ecosystem, its scheduler and a renderer, run to completion.

use crate::ecosystem::Ecosystem;
use crate::pool::ShutdownHandle;
use crate::render::{Frame, NullRenderer, Renderer};
use crate::scheduler::{CycleReport, CycleScheduler};
use crate::seeder::{PopulationSeeder, SeedReport};
use isle_core::{EndReason, Error, Result, SimulationConfig, SpeciesRegistry, StatsSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{event, info, instrument, Level};

/// Final result of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub end_reason: EndReason,
    pub completed_cycles: u64,
    pub population: usize,
    pub census: BTreeMap<String, usize>,
    pub stats: StatsSnapshot,
}

pub struct Island {
    eco: Arc<Ecosystem>,
    scheduler: CycleScheduler,
    renderer: Box<dyn Renderer>,
}

impl Island {
    pub fn new(config: SimulationConfig, registry: Arc<SpeciesRegistry>) -> Result<Self> {
        let workers = config.engine.workers;
        let eco = Arc::new(Ecosystem::new(config, registry)?);
        let scheduler = CycleScheduler::new(workers)?;

        info!(
            width = eco.grid().width,
            height = eco.grid().height,
            species = eco.registry().len(),
            workers = workers,
            seed = eco.config().engine.seed,
            "Island created"
        );

        Ok(Self {
            eco,
            scheduler,
            renderer: Box::new(NullRenderer),
        })
    }

    pub fn with_renderer(mut self, renderer: Box<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn ecosystem(&self) -> &Arc<Ecosystem> {
        &self.eco
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.scheduler.shutdown_handle()
    }

    /// Seed every species' starting population
    pub fn populate(&self) -> Result<SeedReport> {
        PopulationSeeder::seed(&self.eco, self.scheduler.pool())
    }

    /// Run a single cycle and hand the frame to the renderer
    pub fn step(&mut self) -> Result<CycleReport> {
        let report = self.scheduler.run_cycle(&self.eco)?;
        let snapshot = self.eco.stats().snapshot(self.eco.registry());

        let frame = Frame {
            cycle: report.cycle,
            width: self.eco.grid().width,
            height: self.eco.grid().height,
            cells: &report.survey.glyphs,
            registry: self.eco.registry(),
            stats: &snapshot,
        };
        self.renderer.draw(&frame);

        let log_every = self.eco.config().engine.log_every;
        if log_every > 0 && report.completed_cycles % log_every == 0 {
            self.emit_population_metrics(&report);
        }
        Ok(report)
    }

    /// Run cycles until the termination policy fires
    #[instrument(skip(self), fields(max_cycles = ?self.eco.config().termination.max_cycles))]
    pub fn run(&mut self) -> Result<RunOutcome> {
        info!("Starting simulation");

        let end_reason = loop {
            let report = self.step()?;
            if let Some(reason) = report.end_reason {
                break reason;
            }
        };

        let outcome = RunOutcome {
            end_reason,
            completed_cycles: self.eco.stats().completed_cycles(),
            population: self.eco.census().values().sum(),
            census: self.eco.named_census(),
            stats: self.eco.stats().snapshot(self.eco.registry()),
        };
        self.emit_episode_summary(&outcome);
        self.renderer.finish(end_reason, &outcome.stats);
        Ok(outcome)
    }

    /// Stop the worker pool, waiting up to the configured grace period
    pub fn shutdown(self) -> Result<()> {
        let grace = self.eco.config().engine.shutdown_grace();
        if self.scheduler.shutdown(grace) {
            info!("Worker pool stopped");
            Ok(())
        } else {
            Err(Error::Cancelled(format!(
                "workers still busy after {} ms",
                grace.as_millis()
            )))
        }
    }

    fn emit_population_metrics(&self, report: &CycleReport) {
        let stats = self.eco.stats();
        let presence = report.survey.presence;

        info!(
            event = "population_metrics",
            cycle = report.cycle,
            total_population = report.survey.population,
            carnivores_present = presence.carnivores,
            herbivores_present = presence.herbivores,
            plants_present = presence.plants,
            births = stats.total_births(),
            sprouts = stats.sprouts(),
            feedings = stats.total_feedings(),
            moves = stats.moves(),
            contended_moves = stats.contended_moves(),
            move_ms = report.moves.elapsed.as_millis() as u64,
            live_ms = report.live.elapsed.as_millis() as u64,
            "Population metrics snapshot"
        );

        event!(
            Level::INFO,
            gauge_name = "population_total",
            gauge_value = report.survey.population,
            cycle = report.cycle,
            "Population gauge"
        );
    }

    fn emit_episode_summary(&self, outcome: &RunOutcome) {
        let deaths: u64 = outcome.stats.deaths.values().sum();

        info!(
            event = "episode_summary",
            end_reason = %outcome.end_reason,
            completed_cycles = outcome.completed_cycles,
            final_population = outcome.population,
            births_total = outcome.stats.births,
            sprouts_total = outcome.stats.sprouts,
            deaths_total = deaths,
            feedings_total = outcome.stats.feedings,
            task_failures = outcome.stats.task_failures,
            "Simulation finished"
        );

        for (name, count) in &outcome.census {
            info!(
                event = "species_survivors",
                species = %name,
                survivors = count,
                "Survivors"
            );
        }

        event!(
            Level::INFO,
            gauge_name = "final_population",
            gauge_value = outcome.population,
            "Final population gauge"
        );
    }
}

impl std::fmt::Debug for Island {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Island")
            .field("eco", &self.eco)
            .field("scheduler", &self.scheduler)
            .finish()
    }
}
