//! Species table loading and the read-only species registry.
//!
//! The table is plain serde data; the registry validates it once at startup and
//! resolves every name into a dense [`SpeciesId`], so lookups during the
//! simulation are lock-free slice indexing.

use crate::{Category, Error, Kind, Result, SpeciesId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

const BUILTIN_TABLE: &str = include_str!("../assets/species.json");

/// Biological constants of one species
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeciesProfile {
    pub name: String,
    pub kind: Kind,
    /// Two-column glyph used by renderers
    pub symbol: String,
    /// Saturation a predator gains by eating one member
    pub weight: f64,
    pub max_age: f64,
    pub max_per_cell: usize,
    #[serde(default)]
    pub max_speed: u32,
    pub max_saturation: f64,
    /// Initial population; derived from the grid size when absent
    #[serde(default)]
    pub start_amount: Option<usize>,
    /// Saturation of newborns; the species' max saturation when absent
    #[serde(default)]
    pub birth_saturation: Option<f64>,
    /// Prey name -> percent chance of a successful feeding
    #[serde(default)]
    pub diet: BTreeMap<String, u8>,
}

/// Raw species table as found in JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeciesTable {
    pub species: Vec<SpeciesProfile>,
}

impl SpeciesTable {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// The classic island table: five carnivores, ten herbivores, three plants
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_TABLE)
    }
}

/// Validated, immutable species lookup
#[derive(Debug)]
pub struct SpeciesRegistry {
    profiles: Vec<SpeciesProfile>,
    names: HashMap<String, SpeciesId>,
    /// Row-major predator x prey percent chances
    diet: Vec<u8>,
    members: [Vec<SpeciesId>; 4],
}

impl SpeciesRegistry {
    pub fn new(table: SpeciesTable) -> Result<Self> {
        let profiles = table.species;
        if profiles.is_empty() {
            return Err(Error::Config("species table is empty".into()));
        }
        if profiles.len() > u16::MAX as usize {
            return Err(Error::Config("too many species".into()));
        }

        let mut names = HashMap::with_capacity(profiles.len());
        for (index, profile) in profiles.iter().enumerate() {
            validate_profile(profile)?;
            let key = profile.name.to_lowercase();
            if names.insert(key, SpeciesId::new(index)).is_some() {
                return Err(Error::Config(format!("duplicate species '{}'", profile.name)));
            }
        }

        let count = profiles.len();
        let mut diet = vec![0u8; count * count];
        for (predator, profile) in profiles.iter().enumerate() {
            for (prey_name, &chance) in &profile.diet {
                if chance > 100 {
                    return Err(Error::Config(format!(
                        "{} -> {}: diet chance {} exceeds 100",
                        profile.name, prey_name, chance
                    )));
                }
                let prey = names
                    .get(&prey_name.to_lowercase())
                    .ok_or_else(|| {
                        Error::UnknownSpecies(format!("{} (in diet of {})", prey_name, profile.name))
                    })?;
                diet[predator * count + prey.index()] = chance;
            }
        }

        let members = Category::ALL.map(|category| {
            profiles
                .iter()
                .enumerate()
                .filter(|(_, p)| category.contains(p.kind))
                .map(|(i, _)| SpeciesId::new(i))
                .collect::<Vec<_>>()
        });

        Ok(Self {
            profiles,
            names,
            diet,
            members,
        })
    }

    /// Registry over the built-in table
    pub fn builtin() -> Result<Self> {
        Self::new(SpeciesTable::builtin()?)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Resolve a species name (case-insensitive)
    pub fn id(&self, name: &str) -> Result<SpeciesId> {
        self.names
            .get(&name.to_lowercase())
            .copied()
            .ok_or_else(|| Error::UnknownSpecies(name.to_string()))
    }

    pub fn ids(&self) -> impl Iterator<Item = SpeciesId> + '_ {
        (0..self.profiles.len()).map(SpeciesId::new)
    }

    pub fn profile(&self, species: SpeciesId) -> &SpeciesProfile {
        &self.profiles[species.index()]
    }

    pub fn name(&self, species: SpeciesId) -> &str {
        &self.profile(species).name
    }

    pub fn kind(&self, species: SpeciesId) -> Kind {
        self.profile(species).kind
    }

    pub fn weight(&self, species: SpeciesId) -> f64 {
        self.profile(species).weight
    }

    pub fn max_age(&self, species: SpeciesId) -> f64 {
        self.profile(species).max_age
    }

    pub fn max_per_cell(&self, species: SpeciesId) -> usize {
        self.profile(species).max_per_cell
    }

    pub fn max_speed(&self, species: SpeciesId) -> u32 {
        self.profile(species).max_speed
    }

    pub fn max_saturation(&self, species: SpeciesId) -> f64 {
        self.profile(species).max_saturation
    }

    pub fn birth_saturation(&self, species: SpeciesId) -> f64 {
        let profile = self.profile(species);
        profile
            .birth_saturation
            .unwrap_or(profile.max_saturation)
            .min(profile.max_saturation)
    }

    pub fn symbol(&self, species: SpeciesId) -> &str {
        &self.profile(species).symbol
    }

    /// Initial population for a grid of the given size
    pub fn start_amount(&self, species: SpeciesId, width: i32, height: i32) -> usize {
        let profile = self.profile(species);
        profile.start_amount.unwrap_or_else(|| {
            let scale = (width + height) as f64 / 1000.0;
            (scale * profile.max_per_cell as f64).round() as usize
        })
    }

    /// Percent chance that `predator` successfully feeds on `prey`; 0 when not in its diet
    pub fn diet_chance(&self, predator: SpeciesId, prey: SpeciesId) -> u8 {
        self.diet[predator.index() * self.profiles.len() + prey.index()]
    }

    /// Prey species `predator` can feed on
    pub fn eats(&self, predator: SpeciesId) -> impl Iterator<Item = SpeciesId> + '_ {
        self.ids()
            .filter(move |&prey| self.diet_chance(predator, prey) > 0)
    }

    pub fn members(&self, category: Category) -> &[SpeciesId] {
        let slot = match category {
            Category::Animal => 0,
            Category::Carnivore => 1,
            Category::Herbivore => 2,
            Category::Plant => 3,
        };
        &self.members[slot]
    }
}

fn validate_profile(profile: &SpeciesProfile) -> Result<()> {
    if profile.name.trim().is_empty() {
        return Err(Error::Config("species with an empty name".into()));
    }
    if profile.max_age <= 0.0 {
        return Err(Error::Config(format!("{}: max_age must be positive", profile.name)));
    }
    if profile.weight < 0.0 || profile.max_saturation < 0.0 {
        return Err(Error::Config(format!(
            "{}: weight and max_saturation must not be negative",
            profile.name
        )));
    }
    if profile.kind == Kind::Plant && profile.max_speed > 0 {
        return Err(Error::Config(format!("{}: plants cannot move", profile.name)));
    }
    Ok(())
}
