//! Core types and utilities for the Isle ecosystem simulation.

pub mod types;
pub mod config;
pub mod error;
pub mod species;
pub mod stats;

pub use error::{Error, Result};
pub use types::*;
pub use config::*;
pub use species::{SpeciesProfile, SpeciesRegistry, SpeciesTable};
pub use stats::{Presence, SpeciesTally, Statistics, StatsSnapshot, TaskFailure};
