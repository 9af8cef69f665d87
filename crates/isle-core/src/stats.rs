//! Concurrent simulation statistics and the termination predicate.

use crate::{
    Category, DeathCause, EndReason, Kind, Phase, SpeciesId, SpeciesRegistry, TerminationPolicy,
};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Which categories had at least one living member at the end of a cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presence {
    pub animals: bool,
    pub carnivores: bool,
    pub herbivores: bool,
    pub plants: bool,
}

impl Presence {
    /// Mark the categories a resident of `kind` belongs to
    pub fn observe(&mut self, kind: Kind) {
        match kind {
            Kind::Carnivore => {
                self.animals = true;
                self.carnivores = true;
            }
            Kind::Herbivore => {
                self.animals = true;
                self.herbivores = true;
            }
            Kind::Plant => self.plants = true,
        }
    }

    pub fn merge(&mut self, other: Presence) {
        self.animals |= other.animals;
        self.carnivores |= other.carnivores;
        self.herbivores |= other.herbivores;
        self.plants |= other.plants;
    }

    pub fn is_present(&self, category: Category) -> bool {
        match category {
            Category::Animal => self.animals,
            Category::Carnivore => self.carnivores,
            Category::Herbivore => self.herbivores,
            Category::Plant => self.plants,
        }
    }
}

/// A per-cell task that returned an error or panicked
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskFailure {
    pub phase: Phase,
    pub cycle: u64,
    /// Cell index (or species index while seeding)
    pub index: usize,
    pub message: String,
}

/// Shared counters updated by every worker.
///
/// Each key is incremented under its shard lock, so concurrent increments of
/// the same key are never lost.
#[derive(Debug, Default)]
pub struct Statistics {
    deaths: DashMap<(SpeciesId, DeathCause), u64>,
    births: DashMap<SpeciesId, u64>,
    feedings: DashMap<SpeciesId, u64>,
    sprouts: AtomicU64,
    moves: AtomicU64,
    contended_moves: AtomicU64,
    completed_cycles: AtomicU64,
    presence: RwLock<Presence>,
    failures: Mutex<Vec<TaskFailure>>,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_death(&self, species: SpeciesId, cause: DeathCause) {
        *self.deaths.entry((species, cause)).or_insert(0) += 1;
    }

    pub fn record_birth(&self, species: SpeciesId) {
        *self.births.entry(species).or_insert(0) += 1;
    }

    /// Plant offspring; kept apart from animal births
    pub fn record_sprout(&self) {
        self.sprouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_feeding(&self, species: SpeciesId) {
        *self.feedings.entry(species).or_insert(0) += 1;
    }

    pub fn record_move(&self) {
        self.moves.fetch_add(1, Ordering::Relaxed);
    }

    /// A move abandoned because a cell lock could not be taken in time
    pub fn record_contended_move(&self) {
        self.contended_moves.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_task_failure(&self, failure: TaskFailure) {
        self.failures.lock().push(failure);
    }

    pub fn deaths_of(&self, species: SpeciesId, cause: DeathCause) -> u64 {
        self.deaths.get(&(species, cause)).map(|v| *v).unwrap_or(0)
    }

    /// Deaths from `cause` across all species
    pub fn deaths(&self, cause: DeathCause) -> u64 {
        self.deaths
            .iter()
            .filter(|entry| entry.key().1 == cause)
            .map(|entry| *entry.value())
            .sum()
    }

    pub fn births_of(&self, species: SpeciesId) -> u64 {
        self.births.get(&species).map(|v| *v).unwrap_or(0)
    }

    pub fn total_births(&self) -> u64 {
        self.births.iter().map(|entry| *entry.value()).sum()
    }

    pub fn feedings_of(&self, species: SpeciesId) -> u64 {
        self.feedings.get(&species).map(|v| *v).unwrap_or(0)
    }

    pub fn total_feedings(&self) -> u64 {
        self.feedings.iter().map(|entry| *entry.value()).sum()
    }

    pub fn sprouts(&self) -> u64 {
        self.sprouts.load(Ordering::Relaxed)
    }

    pub fn moves(&self) -> u64 {
        self.moves.load(Ordering::Relaxed)
    }

    pub fn contended_moves(&self) -> u64 {
        self.contended_moves.load(Ordering::Relaxed)
    }

    pub fn task_failures(&self) -> Vec<TaskFailure> {
        self.failures.lock().clone()
    }

    pub fn completed_cycles(&self) -> u64 {
        self.completed_cycles.load(Ordering::Acquire)
    }

    /// Count one more completed cycle and return the new total
    pub fn advance_cycle(&self) -> u64 {
        self.completed_cycles.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn set_presence(&self, presence: Presence) {
        *self.presence.write() = presence;
    }

    pub fn presence(&self) -> Presence {
        *self.presence.read()
    }

    /// Decide whether the simulation should stop after the last completed cycle
    pub fn evaluate(&self, policy: &TerminationPolicy) -> Option<EndReason> {
        let presence = self.presence();

        if policy.stop_when_animals_extinct && !presence.animals {
            return Some(EndReason::AnimalsExtinct);
        }
        if policy.stop_when_carnivores_extinct && !presence.carnivores {
            return Some(EndReason::CarnivoresExtinct);
        }
        if policy.stop_when_herbivores_extinct && !presence.herbivores {
            return Some(EndReason::HerbivoresExtinct);
        }
        if policy.stop_when_plants_extinct && !presence.plants {
            return Some(EndReason::PlantsExtinct);
        }
        match policy.max_cycles {
            Some(limit) if self.completed_cycles() >= limit => Some(EndReason::CycleLimitReached),
            _ => None,
        }
    }

    /// Serializable view keyed by species name
    pub fn snapshot(&self, registry: &SpeciesRegistry) -> StatsSnapshot {
        let mut species = BTreeMap::new();
        for id in registry.ids() {
            let deaths: BTreeMap<DeathCause, u64> = DeathCause::ALL
                .iter()
                .map(|&cause| (cause, self.deaths_of(id, cause)))
                .filter(|(_, count)| *count > 0)
                .collect();
            let tally = SpeciesTally {
                births: self.births_of(id),
                feedings: self.feedings_of(id),
                deaths,
            };
            if !tally.is_empty() {
                species.insert(registry.name(id).to_string(), tally);
            }
        }

        StatsSnapshot {
            completed_cycles: self.completed_cycles(),
            births: self.total_births(),
            sprouts: self.sprouts(),
            feedings: self.total_feedings(),
            deaths: DeathCause::ALL
                .iter()
                .map(|&cause| (cause, self.deaths(cause)))
                .collect(),
            moves: self.moves(),
            contended_moves: self.contended_moves(),
            task_failures: self.failures.lock().len(),
            presence: self.presence(),
            species,
        }
    }
}

/// Per-species counters inside a [`StatsSnapshot`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpeciesTally {
    pub births: u64,
    pub feedings: u64,
    pub deaths: BTreeMap<DeathCause, u64>,
}

impl SpeciesTally {
    fn is_empty(&self) -> bool {
        self.births == 0 && self.feedings == 0 && self.deaths.is_empty()
    }
}

/// Point-in-time copy of the statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub completed_cycles: u64,
    /// Animal births
    pub births: u64,
    pub sprouts: u64,
    pub feedings: u64,
    pub deaths: BTreeMap<DeathCause, u64>,
    pub moves: u64,
    pub contended_moves: u64,
    pub task_failures: usize,
    pub presence: Presence,
    pub species: BTreeMap<String, SpeciesTally>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn registry() -> SpeciesRegistry {
        SpeciesRegistry::builtin().unwrap()
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let registry = registry();
        let wolf = registry.id("wolf").unwrap();
        let stats = Arc::new(Statistics::new());

        thread::scope(|scope| {
            for _ in 0..8 {
                let stats = Arc::clone(&stats);
                scope.spawn(move || {
                    for _ in 0..1_000 {
                        stats.record_death(wolf, DeathCause::Hunger);
                        stats.record_birth(wolf);
                        stats.record_feeding(wolf);
                    }
                });
            }
        });

        assert_eq!(stats.deaths_of(wolf, DeathCause::Hunger), 8_000);
        assert_eq!(stats.deaths(DeathCause::Hunger), 8_000);
        assert_eq!(stats.births_of(wolf), 8_000);
        assert_eq!(stats.total_feedings(), 8_000);
    }

    #[test]
    fn test_termination_order() {
        let stats = Statistics::new();
        let policy = TerminationPolicy::default();

        // Nothing observed yet
        assert_eq!(stats.evaluate(&policy), Some(EndReason::AnimalsExtinct));

        let mut presence = Presence::default();
        presence.observe(Kind::Herbivore);
        presence.observe(Kind::Plant);
        stats.set_presence(presence);
        assert_eq!(stats.evaluate(&policy), Some(EndReason::CarnivoresExtinct));

        presence.observe(Kind::Carnivore);
        stats.set_presence(presence);
        assert_eq!(stats.evaluate(&policy), None);

        let plants_gone = Presence {
            plants: false,
            ..presence
        };
        stats.set_presence(plants_gone);
        assert_eq!(stats.evaluate(&policy), Some(EndReason::PlantsExtinct));
    }

    #[test]
    fn test_cycle_limit() {
        let stats = Statistics::new();
        let mut presence = Presence::default();
        presence.observe(Kind::Carnivore);
        presence.observe(Kind::Herbivore);
        presence.observe(Kind::Plant);
        stats.set_presence(presence);

        let policy = TerminationPolicy {
            max_cycles: Some(2),
            ..Default::default()
        };
        assert_eq!(stats.advance_cycle(), 1);
        assert_eq!(stats.evaluate(&policy), None);
        assert_eq!(stats.advance_cycle(), 2);
        assert_eq!(stats.evaluate(&policy), Some(EndReason::CycleLimitReached));
    }

    #[test]
    fn test_disabled_checks_are_skipped() {
        let stats = Statistics::new();
        let mut presence = Presence::default();
        presence.observe(Kind::Herbivore);
        stats.set_presence(presence);

        let policy = TerminationPolicy {
            max_cycles: None,
            stop_when_carnivores_extinct: false,
            stop_when_plants_extinct: false,
            ..Default::default()
        };
        assert_eq!(stats.evaluate(&policy), None);
    }

    #[test]
    fn test_snapshot() {
        let registry = registry();
        let fox = registry.id("fox").unwrap();
        let stats = Statistics::new();
        stats.record_death(fox, DeathCause::Eaten);
        stats.record_birth(fox);
        stats.record_move();
        stats.record_contended_move();

        let snapshot = stats.snapshot(&registry);
        assert_eq!(snapshot.births, 1);
        assert_eq!(snapshot.deaths[&DeathCause::Eaten], 1);
        assert_eq!(snapshot.deaths[&DeathCause::Hunger], 0);
        assert_eq!(snapshot.moves, 1);
        assert_eq!(snapshot.contended_moves, 1);
        assert_eq!(snapshot.species.len(), 1);
        assert_eq!(snapshot.species["fox"].deaths[&DeathCause::Eaten], 1);

        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"eaten\""));
    }
}
