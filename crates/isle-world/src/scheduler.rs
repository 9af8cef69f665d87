//! Cycle scheduler: the move phase, the live phase and the barrier between them.
//!
//! Every cycle runs one move task and then one live task per cell on the
//! worker pool. No live task starts before every move task of the cycle has
//! arrived, and the next cycle waits for every live task. Within a phase each
//! task works on a snapshot of its own cell's buckets.

use crate::ecosystem::{Ecosystem, Survey};
use crate::movement::{relocate, MoveOutcome};
use crate::organism::Organism;
use crate::pool::{PhaseReport, ShutdownHandle, WorkerPool};
use isle_core::{EndReason, Phase, Result};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// Outcome of one full cycle
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// Zero-based index of the cycle that just ran
    pub cycle: u64,
    pub completed_cycles: u64,
    pub moves: PhaseReport,
    pub live: PhaseReport,
    pub survey: Survey,
    pub end_reason: Option<EndReason>,
}

/// Deterministic RNG for one task: the stream is the task index, so tasks of
/// the same phase never share a sequence.
pub(crate) fn task_rng(seed: u64, cycle: u64, phase: Phase, index: usize) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(
        seed ^ cycle.wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ phase.tag(),
    );
    rng.set_stream(index as u64);
    rng
}

#[derive(Debug)]
pub struct CycleScheduler {
    pool: WorkerPool,
}

impl CycleScheduler {
    pub fn new(workers: usize) -> Result<Self> {
        Ok(Self {
            pool: WorkerPool::new(workers)?,
        })
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.pool.shutdown_handle()
    }

    /// Run one cycle: move, barrier, live, barrier, then the sequential
    /// presence check and termination decision.
    pub fn run_cycle(&self, eco: &Arc<Ecosystem>) -> Result<CycleReport> {
        let stats = eco.stats();
        let cycle = stats.completed_cycles();
        let cells = eco.grid().len();

        let world = Arc::clone(eco);
        let moves = self.pool.fan_out(Phase::Move, cycle, cells, stats, move |index, cancel| {
            move_cell(&world, index, cycle, cancel)
        })?;

        let world = Arc::clone(eco);
        let live = self.pool.fan_out(Phase::Live, cycle, cells, stats, move |index, cancel| {
            live_cell(&world, index, cycle, cancel)
        })?;

        let survey = eco.survey();
        stats.set_presence(survey.presence);
        let completed_cycles = stats.advance_cycle();
        let end_reason = stats.evaluate(&eco.config().termination);

        debug!(
            cycle = cycle,
            population = survey.population,
            move_ms = moves.elapsed.as_millis() as u64,
            live_ms = live.elapsed.as_millis() as u64,
            end_reason = ?end_reason,
            "Cycle complete"
        );

        Ok(CycleReport {
            cycle,
            completed_cycles,
            moves,
            live,
            survey,
            end_reason,
        })
    }

    pub fn shutdown(self, grace: Duration) -> bool {
        self.pool.shutdown(grace)
    }
}

/// Move every mobile resident of one cell at most once
fn move_cell(eco: &Ecosystem, index: usize, cycle: u64, cancel: &AtomicBool) -> Result<()> {
    let mut rng = task_rng(eco.config().engine.seed, cycle, Phase::Move, index);
    let cell = eco.grid().cell(index);
    let stats = eco.stats();

    for species in cell.species_present() {
        let gait = eco.behaviors().gait(species);
        if !gait.is_mobile() {
            continue;
        }
        let cost = eco.registry().max_saturation(species) * eco.config().life.move_decay_rate;

        for organism in cell.snapshot_of(species) {
            if cancel.load(Ordering::Relaxed) {
                return Ok(());
            }
            if !organism.claim_move(cycle) {
                continue;
            }
            let steps = gait.stride(&mut rng);
            let target = eco.grid().random_walk(index, steps, &mut rng);

            match relocate(eco, &organism, target) {
                MoveOutcome::Moved { from, to } => {
                    organism.spend_saturation(cost);
                    stats.record_move();
                    trace!(organism_id = %organism.id(), from = from, to = to, "moved");
                }
                MoveOutcome::Contended => stats.record_contended_move(),
                MoveOutcome::Stayed | MoveOutcome::Overcrowded | MoveOutcome::Vanished => {}
            }
        }
    }
    Ok(())
}

/// Grow, feed and (on breeding cycles) pair every resident of one cell
fn live_cell(eco: &Ecosystem, index: usize, cycle: u64, cancel: &AtomicBool) -> Result<()> {
    let mut rng = task_rng(eco.config().engine.seed, cycle, Phase::Live, index);
    let cell = eco.grid().cell(index);
    let breeding = cycle % eco.config().life.breeding_interval == 0;

    for species in cell.species_present() {
        let members = cell.snapshot_of(species);
        for (position, organism) in members.iter().enumerate() {
            if cancel.load(Ordering::Relaxed) {
                return Ok(());
            }
            if organism.grow(eco, cycle).is_some() || !organism.is_alive() {
                continue;
            }
            organism.consume(eco, cycle, &mut rng);
            if breeding {
                breed(eco, &members, position, cycle);
            }
        }
    }
    Ok(())
}

/// Pair the member at `position` with the first eligible member after it
fn breed(eco: &Ecosystem, members: &[Arc<Organism>], position: usize, cycle: u64) {
    let organism = &members[position];
    if !organism.is_alive() || organism.has_bred(cycle) {
        return;
    }
    for partner in &members[position + 1..] {
        if organism.reproduce(eco, partner, cycle).is_some() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use isle_core::DeathCause;
    use rand::Rng;

    #[test]
    fn test_task_rng_streams_differ() {
        let mut a = task_rng(7, 3, Phase::Live, 0);
        let mut b = task_rng(7, 3, Phase::Live, 1);
        let mut again = task_rng(7, 3, Phase::Live, 0);
        let first: u64 = a.gen();
        assert_ne!(first, b.gen::<u64>());
        assert_eq!(first, again.gen::<u64>());
    }

    #[test]
    fn test_every_mobile_organism_moves_at_most_once() {
        let eco = testing::ecosystem(4, 4);
        let rabbit = eco.registry().id("rabbit").unwrap();
        let rabbits: Vec<_> = (0..16)
            .map(|i| eco.spawn(rabbit, i, 0.0, 8.0, 0).unwrap())
            .collect();
        let scheduler = CycleScheduler::new(3).unwrap();

        let report = scheduler.run_cycle(&eco).unwrap();
        assert_eq!(report.cycle, 0);
        assert_eq!(report.completed_cycles, 1);
        assert!(rabbits.iter().all(|r| r.has_moved(0)));
        assert!(eco.stats().moves() <= 16);
    }

    #[test]
    fn test_breeding_only_on_interval_cycles() {
        let eco = testing::ecosystem(1, 1);
        let rabbit = eco.registry().id("rabbit").unwrap();
        eco.spawn(rabbit, 0, 0.0, 8.0, 0).unwrap();
        eco.spawn(rabbit, 0, 0.0, 8.0, 0).unwrap();
        let scheduler = CycleScheduler::new(1).unwrap();

        // Cycle 0 breeds
        scheduler.run_cycle(&eco).unwrap();
        assert_eq!(eco.stats().births_of(rabbit), 1);
        assert_eq!(eco.grid().cell(0).count_of(rabbit), 3);

        // Cycles 1..=4 do not
        for _ in 1..5 {
            scheduler.run_cycle(&eco).unwrap();
        }
        assert_eq!(eco.stats().births_of(rabbit), 1);
    }

    #[test]
    fn test_termination_when_carnivores_missing() {
        let eco = testing::ecosystem(2, 2);
        let rabbit = eco.registry().id("rabbit").unwrap();
        let grass = eco.registry().id("grass").unwrap();
        eco.spawn(rabbit, 0, 0.0, 8.0, 0).unwrap();
        eco.spawn(grass, 3, 0.0, 1.0, 0).unwrap();
        let scheduler = CycleScheduler::new(2).unwrap();

        let report = scheduler.run_cycle(&eco).unwrap();
        assert_eq!(report.completed_cycles, 1);
        assert_eq!(report.end_reason, Some(EndReason::CarnivoresExtinct));
        assert!(report.survey.presence.herbivores);
    }

    #[test]
    fn test_predation_across_a_cycle() {
        let eco = testing::ecosystem(1, 1);
        let wolf = eco.registry().id("wolf").unwrap();
        let rabbit = eco.registry().id("rabbit").unwrap();
        let hunter = eco.spawn(wolf, 0, 0.0, 4.0, 0).unwrap();
        eco.spawn(rabbit, 0, 0.0, 8.0, 0).unwrap();
        let scheduler = CycleScheduler::new(1).unwrap();

        scheduler.run_cycle(&eco).unwrap();
        assert!(hunter.has_fed(0));
        assert_eq!(eco.stats().deaths_of(rabbit, DeathCause::Eaten), 1);
        assert_eq!(eco.grid().cell(0).count_of(rabbit), 0);
    }
}
