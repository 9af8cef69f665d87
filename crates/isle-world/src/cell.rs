//! Grid cells and the per-species populations they hold.

use crate::organism::Organism;
use isle_core::{OrganismId, Position, SpeciesId};
use parking_lot::{Mutex, MutexGuard};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Result of offering an organism to a species bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    /// The bucket already holds the species' per-cell maximum
    Overcrowded,
}

/// Residents of one cell, bucketed by species.
///
/// Buckets keep insertion order and are removed as soon as they empty, so
/// `species()` only ever lists species with at least one resident.
#[derive(Debug, Default)]
pub struct Population {
    buckets: HashMap<SpeciesId, Vec<Arc<Organism>>>,
}

impl Population {
    pub fn insert(&mut self, organism: Arc<Organism>, capacity: usize) -> Admission {
        let species = organism.species();
        if self.count(species) >= capacity {
            return Admission::Overcrowded;
        }
        self.buckets.entry(species).or_default().push(organism);
        Admission::Admitted
    }

    /// Remove by identity; false when the organism was not here
    pub fn remove(&mut self, organism: &Organism) -> bool {
        let species = organism.species();
        let Some(bucket) = self.buckets.get_mut(&species) else {
            return false;
        };
        let Some(position) = bucket.iter().position(|o| o.id() == organism.id()) else {
            return false;
        };
        bucket.remove(position);
        if bucket.is_empty() {
            self.buckets.remove(&species);
        }
        true
    }

    pub fn contains(&self, organism: &Organism) -> bool {
        self.buckets
            .get(&organism.species())
            .map_or(false, |bucket| bucket.iter().any(|o| o.id() == organism.id()))
    }

    pub fn count(&self, species: SpeciesId) -> usize {
        self.buckets.get(&species).map_or(0, Vec::len)
    }

    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Species present, in ascending id order
    pub fn species(&self) -> Vec<SpeciesId> {
        let mut species: Vec<SpeciesId> = self.buckets.keys().copied().collect();
        species.sort_unstable();
        species
    }

    pub fn snapshot(&self, species: SpeciesId) -> Vec<Arc<Organism>> {
        self.buckets.get(&species).cloned().unwrap_or_default()
    }

    pub fn contains_any(&self, species: &[SpeciesId]) -> bool {
        species.iter().any(|s| self.buckets.contains_key(s))
    }

    pub fn members(&self) -> impl Iterator<Item = &Arc<Organism>> + '_ {
        self.buckets.values().flatten()
    }

    /// Pick a living resident of one of `allowed`.
    ///
    /// Species are visited in shuffled order and the first with an eligible
    /// member wins; within it the member is chosen uniformly.
    pub fn random_member(
        &self,
        allowed: &[SpeciesId],
        excluding: Option<OrganismId>,
        rng: &mut ChaCha8Rng,
    ) -> Option<Arc<Organism>> {
        let mut order: Vec<SpeciesId> = allowed
            .iter()
            .copied()
            .filter(|s| self.buckets.contains_key(s))
            .collect();
        order.shuffle(rng);

        for species in order {
            let eligible: Vec<&Arc<Organism>> = self.buckets[&species]
                .iter()
                .filter(|o| Some(o.id()) != excluding && o.is_alive())
                .collect();
            if !eligible.is_empty() {
                return Some(Arc::clone(eligible[rng.gen_range(0..eligible.len())]));
            }
        }
        None
    }

    /// The most numerous species among `candidates`; ties go to the lower id
    pub fn dominant(&self, candidates: &[SpeciesId]) -> Option<SpeciesId> {
        let mut best: Option<(SpeciesId, usize)> = None;
        for &species in candidates {
            let count = self.count(species);
            if count == 0 {
                continue;
            }
            match best {
                Some((current, top)) if top > count || (top == count && current < species) => {}
                _ => best = Some((species, count)),
            }
        }
        best.map(|(species, _)| species)
    }
}

/// One lockable square of the island
#[derive(Debug)]
pub struct Cell {
    index: usize,
    position: Position,
    neighbors: Vec<usize>,
    population: Mutex<Population>,
}

impl Cell {
    pub fn new(index: usize, position: Position, neighbors: Vec<usize>) -> Self {
        Self {
            index,
            position,
            neighbors,
            population: Mutex::new(Population::default()),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn neighbors(&self) -> &[usize] {
        &self.neighbors
    }

    /// Block until the cell is ours
    pub fn lock(&self) -> MutexGuard<'_, Population> {
        self.population.lock()
    }

    /// Bounded acquisition used by movement
    pub fn try_lock_for(&self, timeout: Duration) -> Option<MutexGuard<'_, Population>> {
        self.population.try_lock_for(timeout)
    }

    pub fn add(&self, organism: Arc<Organism>, capacity: usize) -> Admission {
        self.lock().insert(organism, capacity)
    }

    pub fn remove(&self, organism: &Organism) -> bool {
        self.lock().remove(organism)
    }

    pub fn contains(&self, organism: &Organism) -> bool {
        self.lock().contains(organism)
    }

    /// Copy of one bucket, safe to iterate while the cell keeps changing
    pub fn snapshot_of(&self, species: SpeciesId) -> Vec<Arc<Organism>> {
        self.lock().snapshot(species)
    }

    pub fn species_present(&self) -> Vec<SpeciesId> {
        self.lock().species()
    }

    pub fn count_of(&self, species: SpeciesId) -> usize {
        self.lock().count(species)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains_any(&self, species: &[SpeciesId]) -> bool {
        self.lock().contains_any(species)
    }

    pub fn random_member(
        &self,
        allowed: &[SpeciesId],
        excluding: Option<OrganismId>,
        rng: &mut ChaCha8Rng,
    ) -> Option<Arc<Organism>> {
        self.lock().random_member(allowed, excluding, rng)
    }

    pub fn dominant(&self, candidates: &[SpeciesId]) -> Option<SpeciesId> {
        self.lock().dominant(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use rand::SeedableRng;

    fn organism(species: SpeciesId) -> Arc<Organism> {
        Arc::new(Organism::new(species, testing::kind_of(species), 0, 0.0, 1.0, 0))
    }

    #[test]
    fn test_capacity_rejects_extra_member() {
        let registry = testing::registry();
        let wolf = registry.id("wolf").unwrap();
        let cell = Cell::new(0, Position::new(0, 0), vec![]);

        for _ in 0..3 {
            assert_eq!(cell.add(organism(wolf), 3), Admission::Admitted);
        }
        assert_eq!(cell.add(organism(wolf), 3), Admission::Overcrowded);
        assert_eq!(cell.count_of(wolf), 3);
    }

    #[test]
    fn test_empty_buckets_are_pruned() {
        let registry = testing::registry();
        let rabbit = registry.id("rabbit").unwrap();
        let cell = Cell::new(0, Position::new(0, 0), vec![]);

        let first = organism(rabbit);
        cell.add(Arc::clone(&first), 5);
        assert_eq!(cell.species_present(), vec![rabbit]);

        assert!(cell.remove(&first));
        assert!(!cell.remove(&first));
        assert!(cell.species_present().is_empty());
        assert!(cell.is_empty());
    }

    #[test]
    fn test_removal_keeps_order() {
        let registry = testing::registry();
        let rabbit = registry.id("rabbit").unwrap();
        let cell = Cell::new(0, Position::new(0, 0), vec![]);

        let members: Vec<_> = (0..4).map(|_| organism(rabbit)).collect();
        for member in &members {
            cell.add(Arc::clone(member), 5);
        }
        cell.remove(&members[1]);

        let ids: Vec<_> = cell.snapshot_of(rabbit).iter().map(|o| o.id()).collect();
        assert_eq!(ids, vec![members[0].id(), members[2].id(), members[3].id()]);
    }

    #[test]
    fn test_random_member_respects_filter_and_exclusion() {
        let registry = testing::registry();
        let rabbit = registry.id("rabbit").unwrap();
        let grass = registry.id("grass").unwrap();
        let wolf = registry.id("wolf").unwrap();
        let cell = Cell::new(0, Position::new(0, 0), vec![]);
        let mut rng = ChaCha8Rng::seed_from_u64(9);

        let lone = organism(rabbit);
        cell.add(Arc::clone(&lone), 5);
        cell.add(organism(grass), 5);

        assert!(cell.random_member(&[wolf], None, &mut rng).is_none());
        assert!(cell.random_member(&[rabbit], Some(lone.id()), &mut rng).is_none());
        for _ in 0..20 {
            let picked = cell.random_member(&[rabbit, grass], None, &mut rng).unwrap();
            assert!(picked.species() == rabbit || picked.species() == grass);
        }
    }

    #[test]
    fn test_random_member_spreads_across_species() {
        let registry = testing::registry();
        let rabbit = registry.id("rabbit").unwrap();
        let grass = registry.id("grass").unwrap();
        let cell = Cell::new(0, Position::new(0, 0), vec![]);
        cell.add(organism(rabbit), 5);
        for _ in 0..4 {
            cell.add(organism(grass), 5);
        }

        // Species are drawn evenly no matter the menu order or bucket sizes
        for allowed in [[rabbit, grass], [grass, rabbit]] {
            let mut rng = ChaCha8Rng::seed_from_u64(21);
            let rabbits = (0..400)
                .filter(|_| cell.random_member(&allowed, None, &mut rng).unwrap().species() == rabbit)
                .count();
            assert!((120..=280).contains(&rabbits), "rabbit picked {} of 400", rabbits);
        }
    }

    #[test]
    fn test_dominant_species() {
        let registry = testing::registry();
        let rabbit = registry.id("rabbit").unwrap();
        let wolf = registry.id("wolf").unwrap();
        let cell = Cell::new(0, Position::new(0, 0), vec![]);

        assert_eq!(cell.dominant(&[wolf, rabbit]), None);
        cell.add(organism(wolf), 3);
        cell.add(organism(rabbit), 5);
        // Tie resolves to the lower id
        assert_eq!(cell.dominant(&[rabbit, wolf]), Some(wolf.min(rabbit)));
        cell.add(organism(rabbit), 5);
        assert_eq!(cell.dominant(&[wolf, rabbit]), Some(rabbit));
    }
}
