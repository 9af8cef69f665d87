//! Configuration types for the simulation.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Upper bound on `width * height`
pub const MAX_CELLS: usize = 1 << 22;

/// Island grid dimensions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Number of columns
    pub width: i32,
    /// Number of rows
    pub height: i32,
}

impl GridConfig {
    /// Number of cells, or an error when the dimensions are unusable
    pub fn cell_count(&self) -> Result<usize> {
        if self.width <= 0 || self.height <= 0 {
            return Err(Error::Config(format!(
                "grid must be at least 1x1, got {}x{}",
                self.width, self.height
            )));
        }
        (self.width as usize)
            .checked_mul(self.height as usize)
            .filter(|&cells| cells <= MAX_CELLS)
            .ok_or_else(|| {
                Error::Config(format!(
                    "grid {}x{} exceeds {} cells",
                    self.width, self.height, MAX_CELLS
                ))
            })
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: 20,
            height: 20,
        }
    }
}

/// Worker pool and scheduling parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Size of the worker pool
    pub workers: usize,
    /// Bound on each cell lock acquisition during movement (milliseconds)
    pub lock_timeout_ms: u64,
    /// How long shutdown waits for in-flight tasks (milliseconds)
    pub shutdown_grace_ms: u64,
    /// Random seed for reproducibility
    pub seed: u64,
    /// Emit a population snapshot every N cycles
    pub log_every: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            lock_timeout_ms: 10,
            shutdown_grace_ms: 3_000,
            seed: 0,
            log_every: 10,
        }
    }
}

impl EngineConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

/// Biological constants shared by every species
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LifeConfig {
    /// Age added per cycle
    pub cycle_time_unit: f64,
    /// Fraction of max saturation lost per cycle
    pub decay_rate: f64,
    /// Fraction of max saturation lost per successful move
    pub move_decay_rate: f64,
    /// Breeding is attempted on cycles whose index is a multiple of this
    pub breeding_interval: u64,
    /// Saturation yielded by the ambient energy source plants feed on
    pub ambient_energy: f64,
}

impl Default for LifeConfig {
    fn default() -> Self {
        Self {
            cycle_time_unit: 1.0,
            decay_rate: 0.05,
            move_decay_rate: 0.02,
            breeding_interval: 5,
            ambient_energy: 0.05,
        }
    }
}

/// When the simulation stops
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminationPolicy {
    /// Stop once this many cycles have completed (`None` runs until an extinction)
    pub max_cycles: Option<u64>,
    pub stop_when_animals_extinct: bool,
    pub stop_when_carnivores_extinct: bool,
    pub stop_when_herbivores_extinct: bool,
    pub stop_when_plants_extinct: bool,
}

impl Default for TerminationPolicy {
    fn default() -> Self {
        Self {
            max_cycles: Some(500),
            stop_when_animals_extinct: true,
            stop_when_carnivores_extinct: true,
            stop_when_herbivores_extinct: true,
            stop_when_plants_extinct: true,
        }
    }
}

/// Full simulation configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub grid: GridConfig,
    pub engine: EngineConfig,
    pub life: LifeConfig,
    pub termination: TerminationPolicy,
}

impl SimulationConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SimulationConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Reject configurations the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        self.grid.cell_count()?;
        if self.engine.workers == 0 {
            return Err(Error::Config("worker pool needs at least one worker".into()));
        }
        if self.life.breeding_interval == 0 {
            return Err(Error::Config("breeding_interval must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.life.decay_rate)
            || !(0.0..=1.0).contains(&self.life.move_decay_rate)
        {
            return Err(Error::Config("decay rates must lie in [0, 1]".into()));
        }
        if self.life.cycle_time_unit <= 0.0 {
            return Err(Error::Config("cycle_time_unit must be positive".into()));
        }
        Ok(())
    }
}
