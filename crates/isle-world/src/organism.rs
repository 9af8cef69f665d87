//! Organism state and lifecycle.
//!
//! An organism's mutable state sits behind its own lock. The only nesting
//! allowed is cell lock first, organism lock second; organism operations never
//! touch a cell while holding their own lock.

use crate::behavior::Food;
use crate::ecosystem::Ecosystem;
use isle_core::{DeathCause, Kind, OrganismId, SpeciesId};
use parking_lot::Mutex;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Life status of an organism
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Alive,
    Dead(DeathCause),
}

/// What an organism already did during `cycle`.
///
/// Flags stamped with an older cycle read as all false.
#[derive(Debug, Clone, Copy, Default)]
struct CycleFlags {
    cycle: u64,
    moved: bool,
    fed: bool,
    bred: bool,
}

impl CycleFlags {
    fn roll(&mut self, cycle: u64) -> &mut Self {
        if self.cycle != cycle {
            *self = CycleFlags {
                cycle,
                ..Default::default()
            };
        }
        self
    }

    fn at(&self, cycle: u64) -> CycleFlags {
        let mut flags = *self;
        flags.roll(cycle);
        flags
    }
}

#[derive(Debug)]
struct Vitals {
    age: f64,
    saturation: f64,
    status: Status,
    flags: CycleFlags,
}

/// A living (or recently dead) member of a species
#[derive(Debug)]
pub struct Organism {
    id: OrganismId,
    species: SpeciesId,
    kind: Kind,
    cell: AtomicUsize,
    vitals: Mutex<Vitals>,
}

impl Organism {
    pub fn new(
        species: SpeciesId,
        kind: Kind,
        cell: usize,
        age: f64,
        saturation: f64,
        cycle: u64,
    ) -> Self {
        Self {
            id: OrganismId::new(),
            species,
            kind,
            cell: AtomicUsize::new(cell),
            vitals: Mutex::new(Vitals {
                age,
                saturation,
                status: Status::Alive,
                flags: CycleFlags {
                    cycle,
                    ..Default::default()
                },
            }),
        }
    }

    /// Offspring born during `cycle`; it may not breed again that cycle
    pub fn newborn(species: SpeciesId, kind: Kind, cell: usize, saturation: f64, cycle: u64) -> Self {
        let organism = Self::new(species, kind, cell, 0.0, saturation, cycle);
        organism.vitals.lock().flags.bred = true;
        organism
    }

    pub fn id(&self) -> OrganismId {
        self.id
    }

    pub fn species(&self) -> SpeciesId {
        self.species
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Index of the cell the organism currently belongs to
    pub fn cell_index(&self) -> usize {
        self.cell.load(Ordering::Acquire)
    }

    /// Only called with both the old and the new cell locked
    pub(crate) fn set_cell(&self, index: usize) {
        self.cell.store(index, Ordering::Release);
    }

    pub fn status(&self) -> Status {
        self.vitals.lock().status
    }

    pub fn is_alive(&self) -> bool {
        self.status() == Status::Alive
    }

    pub fn age(&self) -> f64 {
        self.vitals.lock().age
    }

    pub fn saturation(&self) -> f64 {
        self.vitals.lock().saturation
    }

    pub fn has_moved(&self, cycle: u64) -> bool {
        self.vitals.lock().flags.at(cycle).moved
    }

    pub fn has_fed(&self, cycle: u64) -> bool {
        self.vitals.lock().flags.at(cycle).fed
    }

    pub fn has_bred(&self, cycle: u64) -> bool {
        self.vitals.lock().flags.at(cycle).bred
    }

    /// Claim this cycle's move. False when dead or already moved.
    pub fn claim_move(&self, cycle: u64) -> bool {
        let mut vitals = self.vitals.lock();
        if vitals.status != Status::Alive {
            return false;
        }
        let flags = vitals.flags.roll(cycle);
        if flags.moved {
            return false;
        }
        flags.moved = true;
        true
    }

    /// Saturation cost of a completed move
    pub(crate) fn spend_saturation(&self, amount: f64) {
        let mut vitals = self.vitals.lock();
        vitals.saturation = (vitals.saturation - amount).max(0.0);
    }

    /// Age by one time unit and burn saturation; dies of old age or hunger.
    ///
    /// Returns the cause when this call killed the organism.
    pub fn grow(&self, eco: &Ecosystem, cycle: u64) -> Option<DeathCause> {
        let registry = eco.registry();
        let life = &eco.config().life;

        let cause = {
            let mut vitals = self.vitals.lock();
            if vitals.status != Status::Alive {
                return None;
            }
            vitals.flags.roll(cycle);
            let decay = registry.max_saturation(self.species) * life.decay_rate;
            vitals.saturation = (vitals.saturation - decay).max(0.0);
            vitals.age += life.cycle_time_unit;

            if vitals.age >= registry.max_age(self.species) {
                Some(DeathCause::Natural)
            } else if vitals.saturation <= 0.0 {
                Some(DeathCause::Hunger)
            } else {
                None
            }
        };

        match cause {
            Some(cause) if self.die(eco, cause) => Some(cause),
            _ => None,
        }
    }

    /// Try to eat once from the current cell.
    ///
    /// Organisms at max saturation do not eat. Animal prey is caught with the
    /// eater's diet chance; plants and ambient energy always succeed.
    pub fn consume(&self, eco: &Ecosystem, cycle: u64, rng: &mut ChaCha8Rng) -> bool {
        let registry = eco.registry();
        let max = registry.max_saturation(self.species);
        {
            let mut vitals = self.vitals.lock();
            if vitals.status != Status::Alive || vitals.saturation >= max {
                return false;
            }
            vitals.flags.roll(cycle);
        }

        let cell = eco.grid().cell(self.cell_index());
        let Some(food) = eco.behaviors().forager(self.species).find_food(self, cell, rng) else {
            return false;
        };

        let gain = match food {
            Food::Ambient(energy) => energy,
            Food::Prey(prey) => {
                let chance = if prey.kind().is_animal() {
                    registry.diet_chance(self.species, prey.species())
                } else {
                    100
                };
                if rng.gen_range(0..100u32) >= u32::from(chance) {
                    return false;
                }
                match prey.be_consumed(eco) {
                    Some(weight) => weight,
                    None => return false,
                }
            }
        };

        {
            let mut vitals = self.vitals.lock();
            if vitals.status != Status::Alive {
                return false;
            }
            vitals.saturation = (vitals.saturation + gain).min(max);
            vitals.flags.roll(cycle).fed = true;
        }
        eco.stats().record_feeding(self.species);
        true
    }

    /// Breed with `partner` into the current cell.
    ///
    /// Both parents must be alive, of the same species and not yet bred this
    /// cycle. The newborn is returned even when its bucket was full, in which
    /// case it is already dead of overcrowding.
    pub fn reproduce(
        &self,
        eco: &Ecosystem,
        partner: &Organism,
        cycle: u64,
    ) -> Option<Arc<Organism>> {
        if self.id == partner.id || self.species != partner.species {
            return None;
        }

        {
            let (first, second) = if self.id < partner.id {
                (self, partner)
            } else {
                (partner, self)
            };
            let mut a = first.vitals.lock();
            let mut b = second.vitals.lock();
            if a.status != Status::Alive || b.status != Status::Alive {
                return None;
            }
            if a.flags.roll(cycle).bred || b.flags.roll(cycle).bred {
                return None;
            }
            a.flags.bred = true;
            b.flags.bred = true;
        }

        let newborn = Arc::new(Organism::newborn(
            self.species,
            self.kind,
            self.cell_index(),
            eco.registry().birth_saturation(self.species),
            cycle,
        ));
        if self.kind.is_animal() {
            eco.stats().record_birth(self.species);
        } else {
            eco.stats().record_sprout();
        }
        eco.place(&newborn);
        Some(newborn)
    }

    /// Mark dead, leave the cell and count the death. Only the first call wins.
    pub fn die(&self, eco: &Ecosystem, cause: DeathCause) -> bool {
        if !self.retire(cause) {
            return false;
        }
        eco.grid().cell(self.cell_index()).remove(self);
        eco.stats().record_death(self.species, cause);
        true
    }

    /// Death for an organism that is in no cell, usable under cell locks
    pub(crate) fn die_detached(&self, eco: &Ecosystem, cause: DeathCause) -> bool {
        if !self.retire(cause) {
            return false;
        }
        eco.stats().record_death(self.species, cause);
        true
    }

    /// Be eaten; yields the species weight to the eater when still alive
    pub fn be_consumed(&self, eco: &Ecosystem) -> Option<f64> {
        self.die(eco, DeathCause::Eaten)
            .then(|| eco.registry().weight(self.species))
    }

    fn retire(&self, cause: DeathCause) -> bool {
        let mut vitals = self.vitals.lock();
        if vitals.status != Status::Alive {
            return false;
        }
        vitals.status = Status::Dead(cause);
        true
    }
}
