//! Shared world state handed to every worker task.

use crate::behavior::BehaviorTable;
use crate::cell::Admission;
use crate::grid::Grid;
use crate::organism::Organism;
use crate::render::CellGlyphs;
use isle_core::{
    Category, DeathCause, Error, Presence, Result, SimulationConfig, SpeciesId, SpeciesRegistry,
    Statistics,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Grid, species, behaviours and statistics of one island
#[derive(Debug)]
pub struct Ecosystem {
    config: SimulationConfig,
    registry: Arc<SpeciesRegistry>,
    behaviors: BehaviorTable,
    grid: Grid,
    stats: Arc<Statistics>,
}

/// One sequential pass over every cell
#[derive(Debug, Clone, Default)]
pub struct Survey {
    pub presence: Presence,
    pub population: usize,
    pub glyphs: Vec<CellGlyphs>,
}

impl Ecosystem {
    pub fn new(config: SimulationConfig, registry: Arc<SpeciesRegistry>) -> Result<Self> {
        config.validate()?;
        let grid = Grid::from_config(&config.grid)?;
        let behaviors = BehaviorTable::build(&registry, &config.life);

        Ok(Self {
            config,
            registry,
            behaviors,
            grid,
            stats: Arc::new(Statistics::new()),
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn registry(&self) -> &SpeciesRegistry {
        &self.registry
    }

    pub fn behaviors(&self) -> &BehaviorTable {
        &self.behaviors
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn stats(&self) -> &Arc<Statistics> {
        &self.stats
    }

    /// Create an organism and place it into `cell`.
    ///
    /// The organism is returned even when it died of overcrowding on arrival.
    pub fn spawn(
        &self,
        species: SpeciesId,
        cell: usize,
        age: f64,
        saturation: f64,
        cycle: u64,
    ) -> Result<Arc<Organism>> {
        if cell >= self.grid.len() {
            return Err(Error::InvalidState(format!(
                "cell {} outside a grid of {}",
                cell,
                self.grid.len()
            )));
        }
        if species.index() >= self.registry.len() {
            return Err(Error::UnknownSpecies(species.to_string()));
        }

        let organism = Arc::new(Organism::new(
            species,
            self.registry.kind(species),
            cell,
            age,
            saturation,
            cycle,
        ));
        self.place(&organism);
        Ok(organism)
    }

    /// Add an organism to the cell it points at; a full bucket kills it
    pub fn place(&self, organism: &Arc<Organism>) -> bool {
        let cell = self.grid.cell(organism.cell_index());
        let mut population = cell.lock();
        match population.insert(Arc::clone(organism), self.registry.max_per_cell(organism.species())) {
            Admission::Admitted => true,
            Admission::Overcrowded => {
                organism.die_detached(self, DeathCause::Overcrowding);
                false
            }
        }
    }

    /// Living organisms per species
    pub fn census(&self) -> BTreeMap<SpeciesId, usize> {
        let mut census = BTreeMap::new();
        for cell in self.grid.cells() {
            let population = cell.lock();
            for species in population.species() {
                *census.entry(species).or_insert(0) += population.count(species);
            }
        }
        census
    }

    /// Census keyed by species name, for reports
    pub fn named_census(&self) -> BTreeMap<String, usize> {
        self.census()
            .into_iter()
            .map(|(species, count)| (self.registry.name(species).to_string(), count))
            .collect()
    }

    /// Presence, head count and dominant glyphs, one cell at a time
    pub fn survey(&self) -> Survey {
        let animals = self.registry.members(Category::Animal);
        let plants = self.registry.members(Category::Plant);
        let mut survey = Survey {
            glyphs: Vec::with_capacity(self.grid.len()),
            ..Default::default()
        };

        for cell in self.grid.cells() {
            let population = cell.lock();
            for species in population.species() {
                survey.presence.observe(self.registry.kind(species));
            }
            survey.population += population.len();
            survey.glyphs.push(CellGlyphs {
                animal: population.dominant(animals),
                plant: population.dominant(plants),
            });
        }
        survey
    }
}
