//! Island simulation engine.
//!
//! This crate implements the concurrent island: a fixed grid of lockable cells
//! populated by plants, herbivores and carnivores, advanced cycle by cycle by a
//! worker pool that runs every cell's tasks in parallel between barriers.

pub mod behavior;
pub mod cell;
pub mod ecosystem;
pub mod grid;
pub mod island;
pub mod latch;
pub mod movement;
pub mod organism;
pub mod pool;
pub mod render;
pub mod scheduler;
pub mod seeder;

#[cfg(test)]
pub(crate) mod testing;

pub use behavior::{BehaviorTable, Food, FoodFinder, Movable};
pub use cell::{Admission, Cell, Population};
pub use ecosystem::{Ecosystem, Survey};
pub use grid::Grid;
pub use island::{Island, RunOutcome};
pub use latch::{PhaseLatch, WaitOutcome};
pub use movement::{relocate, MoveOutcome};
pub use organism::{Organism, Status};
pub use pool::{PhaseReport, ShutdownHandle, WorkerPool};
pub use render::{CellGlyphs, Frame, NullRenderer, Renderer};
pub use scheduler::{CycleReport, CycleScheduler};
pub use seeder::{PopulationSeeder, SeedReport};
