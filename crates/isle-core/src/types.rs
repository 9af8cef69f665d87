//! Core type definitions for the simulation.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for an organism instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrganismId(pub Uuid);

impl OrganismId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OrganismId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrganismId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Dense index of a species inside a [`crate::SpeciesRegistry`].
///
/// Only the registry hands these out, so every id refers to a configured species.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpeciesId(u16);

impl SpeciesId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u16)
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SpeciesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 2D position on the island
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn add(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// True when the position lies on a `width` x `height` grid (no wraparound)
    pub fn in_bounds(&self, width: i32, height: i32) -> bool {
        self.x >= 0 && self.x < width && self.y >= 0 && self.y < height
    }
}

/// The eight Moore-neighbourhood directions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
}

impl Direction {
    pub fn to_delta(&self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::South => (0, 1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
            Direction::NorthEast => (1, -1),
            Direction::NorthWest => (-1, -1),
            Direction::SouthEast => (1, 1),
            Direction::SouthWest => (-1, 1),
        }
    }

    pub fn all() -> [Direction; 8] {
        [
            Direction::North,
            Direction::South,
            Direction::East,
            Direction::West,
            Direction::NorthEast,
            Direction::NorthWest,
            Direction::SouthEast,
            Direction::SouthWest,
        ]
    }
}

/// Trophic kind of a species
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Carnivore,
    Herbivore,
    Plant,
}

impl Kind {
    pub fn is_animal(&self) -> bool {
        !matches!(self, Kind::Plant)
    }
}

/// Group of species used for presence checks and rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Animal,
    Carnivore,
    Herbivore,
    Plant,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Animal,
        Category::Carnivore,
        Category::Herbivore,
        Category::Plant,
    ];

    pub fn contains(&self, kind: Kind) -> bool {
        match self {
            Category::Animal => kind.is_animal(),
            Category::Carnivore => kind == Kind::Carnivore,
            Category::Herbivore => kind == Kind::Herbivore,
            Category::Plant => kind == Kind::Plant,
        }
    }
}

/// Why an organism died
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeathCause {
    Natural,
    Eaten,
    Hunger,
    Overcrowding,
}

impl DeathCause {
    pub const ALL: [DeathCause; 4] = [
        DeathCause::Natural,
        DeathCause::Eaten,
        DeathCause::Hunger,
        DeathCause::Overcrowding,
    ];
}

impl fmt::Display for DeathCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeathCause::Natural => "natural",
            DeathCause::Eaten => "eaten",
            DeathCause::Hunger => "hunger",
            DeathCause::Overcrowding => "overcrowding",
        };
        f.write_str(name)
    }
}

/// Why the simulation stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    AnimalsExtinct,
    CarnivoresExtinct,
    HerbivoresExtinct,
    PlantsExtinct,
    CycleLimitReached,
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            EndReason::AnimalsExtinct => "all animals are extinct",
            EndReason::CarnivoresExtinct => "carnivores are extinct",
            EndReason::HerbivoresExtinct => "herbivores are extinct",
            EndReason::PlantsExtinct => "plants are extinct",
            EndReason::CycleLimitReached => "cycle limit reached",
        };
        f.write_str(text)
    }
}

/// A batch of parallel per-cell (or per-species) tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Seed,
    Move,
    Live,
}

impl Phase {
    /// Stable tag mixed into per-task RNG seeds
    pub fn tag(&self) -> u64 {
        match self {
            Phase::Seed => 0x5EED,
            Phase::Move => 0x30F3,
            Phase::Live => 0x11FE,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Seed => "seed",
            Phase::Move => "move",
            Phase::Live => "live",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_bounds() {
        assert!(Position::new(0, 0).in_bounds(10, 10));
        assert!(Position::new(9, 9).in_bounds(10, 10));
        assert!(!Position::new(-1, 0).in_bounds(10, 10));
        assert!(!Position::new(10, 3).in_bounds(10, 10));
        assert!(!Position::new(3, 10).in_bounds(10, 10));
    }

    #[test]
    fn test_direction_delta() {
        assert_eq!(Direction::North.to_delta(), (0, -1));
        assert_eq!(Direction::South.to_delta(), (0, 1));
        assert_eq!(Direction::East.to_delta(), (1, 0));
        assert_eq!(Direction::West.to_delta(), (-1, 0));
    }

    #[test]
    fn test_category_membership() {
        assert!(Category::Animal.contains(Kind::Carnivore));
        assert!(Category::Animal.contains(Kind::Herbivore));
        assert!(!Category::Animal.contains(Kind::Plant));
        assert!(Category::Plant.contains(Kind::Plant));
        assert!(!Category::Carnivore.contains(Kind::Herbivore));
    }

    #[test]
    fn test_kind_serialization() {
        let json = serde_json::to_string(&Kind::Herbivore).unwrap();
        assert_eq!(json, "\"herbivore\"");
        let kind: Kind = serde_json::from_str("\"plant\"").unwrap();
        assert_eq!(kind, Kind::Plant);
    }
}
