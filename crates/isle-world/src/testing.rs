//! Small fixtures shared by the unit tests.

use crate::ecosystem::Ecosystem;
use isle_core::{Kind, SimulationConfig, SpeciesId, SpeciesRegistry, SpeciesTable};
use std::sync::Arc;

/// Wolves that always catch rabbits, rabbits, and grass
pub(crate) const SPECIES: &str = r#"{"species": [
    {"name": "wolf", "kind": "carnivore", "symbol": "W", "weight": 50,
     "max_age": 30, "max_per_cell": 3, "max_speed": 1, "max_saturation": 8,
     "start_amount": 2, "diet": {"rabbit": 100}},
    {"name": "rabbit", "kind": "herbivore", "symbol": "r", "weight": 2,
     "max_age": 10, "max_per_cell": 5, "max_speed": 1, "max_saturation": 8,
     "start_amount": 6, "birth_saturation": 8},
    {"name": "grass", "kind": "plant", "symbol": "g", "weight": 1,
     "max_age": 20, "max_per_cell": 10, "max_saturation": 1, "start_amount": 10}
]}"#;

pub(crate) fn registry() -> Arc<SpeciesRegistry> {
    registry_from(SPECIES)
}

pub(crate) fn registry_from(json: &str) -> Arc<SpeciesRegistry> {
    Arc::new(SpeciesRegistry::new(SpeciesTable::from_json(json).unwrap()).unwrap())
}

pub(crate) fn kind_of(species: SpeciesId) -> Kind {
    registry().kind(species)
}

pub(crate) fn config(width: i32, height: i32) -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.grid.width = width;
    config.grid.height = height;
    config.engine.workers = 2;
    config.engine.seed = 7;
    config
}

pub(crate) fn ecosystem(width: i32, height: i32) -> Arc<Ecosystem> {
    Arc::new(Ecosystem::new(config(width, height), registry()).unwrap())
}
