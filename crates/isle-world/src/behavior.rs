//! Per-kind movement and feeding strategies.
//!
//! Each species gets a [`Behavior`] built once from a constructor table keyed
//! by its [`Kind`]; the hot loops only ever call through the two traits.

use crate::cell::Cell;
use crate::organism::Organism;
use isle_core::{Category, Kind, LifeConfig, SpeciesId, SpeciesRegistry};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;

/// How far an organism travels in one move phase
pub trait Movable: Send + Sync {
    /// Number of hops to take this cycle
    fn stride(&self, rng: &mut ChaCha8Rng) -> u32;

    fn is_mobile(&self) -> bool;
}

/// Something an organism can eat
#[derive(Debug, Clone)]
pub enum Food {
    /// Another resident of the same cell
    Prey(Arc<Organism>),
    /// Saturation from the environment itself
    Ambient(f64),
}

/// Chooses what an organism tries to eat
pub trait FoodFinder: Send + Sync {
    fn find_food(&self, eater: &Organism, cell: &Cell, rng: &mut ChaCha8Rng) -> Option<Food>;
}

/// Moves up to `max_speed` hops, chosen uniformly including zero
#[derive(Debug, Clone, Copy)]
pub struct Walker {
    pub max_speed: u32,
}

impl Movable for Walker {
    fn stride(&self, rng: &mut ChaCha8Rng) -> u32 {
        rng.gen_range(0..=self.max_speed)
    }

    fn is_mobile(&self) -> bool {
        self.max_speed > 0
    }
}

/// Never moves
#[derive(Debug, Clone, Copy)]
pub struct Rooted;

impl Movable for Rooted {
    fn stride(&self, _rng: &mut ChaCha8Rng) -> u32 {
        0
    }

    fn is_mobile(&self) -> bool {
        false
    }
}

/// Picks a random living cellmate from a fixed menu of species
#[derive(Debug, Clone)]
pub struct Forager {
    menu: Vec<SpeciesId>,
}

impl Forager {
    pub fn new(menu: Vec<SpeciesId>) -> Self {
        Self { menu }
    }

    pub fn menu(&self) -> &[SpeciesId] {
        &self.menu
    }
}

impl FoodFinder for Forager {
    fn find_food(&self, eater: &Organism, cell: &Cell, rng: &mut ChaCha8Rng) -> Option<Food> {
        if self.menu.is_empty() {
            return None;
        }
        cell.random_member(&self.menu, Some(eater.id()), rng)
            .map(Food::Prey)
    }
}

/// Plants feed on a constant ambient energy source
#[derive(Debug, Clone, Copy)]
pub struct Photosynthesis {
    pub energy: f64,
}

impl FoodFinder for Photosynthesis {
    fn find_food(&self, _eater: &Organism, _cell: &Cell, _rng: &mut ChaCha8Rng) -> Option<Food> {
        Some(Food::Ambient(self.energy))
    }
}

/// Strategies for one species
pub struct Behavior {
    pub gait: Box<dyn Movable>,
    pub forager: Box<dyn FoodFinder>,
}

type Constructor = fn(&SpeciesRegistry, SpeciesId, &LifeConfig) -> Behavior;

fn constructor(kind: Kind) -> Constructor {
    match kind {
        Kind::Carnivore => carnivore,
        Kind::Herbivore => herbivore,
        Kind::Plant => plant,
    }
}

fn gait(registry: &SpeciesRegistry, species: SpeciesId) -> Box<dyn Movable> {
    match registry.max_speed(species) {
        0 => Box::new(Rooted),
        max_speed => Box::new(Walker { max_speed }),
    }
}

/// Carnivores try any animal; the diet chance decides the outcome
/// Carnivores only hunt the animals their diet lists
fn carnivore(registry: &SpeciesRegistry, species: SpeciesId, _life: &LifeConfig) -> Behavior {
    let menu = registry
        .eats(species)
        .filter(|&prey| registry.kind(prey).is_animal())
        .collect();
    Behavior {
        gait: gait(registry, species),
        forager: Box::new(Forager::new(menu)),
    }
}

/// Herbivores graze on plants plus whatever animals their diet lists
fn herbivore(registry: &SpeciesRegistry, species: SpeciesId, _life: &LifeConfig) -> Behavior {
    let mut menu = registry.members(Category::Plant).to_vec();
    menu.extend(
        registry
            .eats(species)
            .filter(|&prey| registry.kind(prey).is_animal()),
    );
    Behavior {
        gait: gait(registry, species),
        forager: Box::new(Forager::new(menu)),
    }
}

fn plant(_registry: &SpeciesRegistry, _species: SpeciesId, life: &LifeConfig) -> Behavior {
    Behavior {
        gait: Box::new(Rooted),
        forager: Box::new(Photosynthesis {
            energy: life.ambient_energy,
        }),
    }
}

/// Behaviours for every registered species, indexed by [`SpeciesId`]
pub struct BehaviorTable {
    behaviors: Vec<Behavior>,
}

impl BehaviorTable {
    pub fn build(registry: &SpeciesRegistry, life: &LifeConfig) -> Self {
        let behaviors = registry
            .ids()
            .map(|species| constructor(registry.kind(species))(registry, species, life))
            .collect();
        Self { behaviors }
    }

    pub fn gait(&self, species: SpeciesId) -> &dyn Movable {
        self.behaviors[species.index()].gait.as_ref()
    }

    pub fn forager(&self, species: SpeciesId) -> &dyn FoodFinder {
        self.behaviors[species.index()].forager.as_ref()
    }
}

impl std::fmt::Debug for BehaviorTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BehaviorTable")
            .field("species", &self.behaviors.len())
            .finish()
    }
}
