//! Per-cycle frames handed to an optional renderer.

use isle_core::{EndReason, SpeciesId, SpeciesRegistry, StatsSnapshot};

/// Dominant animal and plant of one cell
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellGlyphs {
    pub animal: Option<SpeciesId>,
    pub plant: Option<SpeciesId>,
}

/// Everything a renderer needs to draw one cycle
#[derive(Debug)]
pub struct Frame<'a> {
    pub cycle: u64,
    pub width: i32,
    pub height: i32,
    pub cells: &'a [CellGlyphs],
    pub registry: &'a SpeciesRegistry,
    pub stats: &'a StatsSnapshot,
}

impl<'a> Frame<'a> {
    pub fn glyphs_at(&self, x: i32, y: i32) -> CellGlyphs {
        self.cells[(y * self.width + x) as usize]
    }

    pub fn animal_symbol(&self, x: i32, y: i32) -> Option<&'a str> {
        let registry = self.registry;
        self.glyphs_at(x, y)
            .animal
            .map(|species| registry.symbol(species))
    }

    pub fn plant_symbol(&self, x: i32, y: i32) -> Option<&'a str> {
        let registry = self.registry;
        self.glyphs_at(x, y)
            .plant
            .map(|species| registry.symbol(species))
    }
}

/// Receives a frame after every completed cycle
pub trait Renderer: Send {
    fn draw(&mut self, frame: &Frame<'_>);

    /// Called once when the run ends
    fn finish(&mut self, _reason: EndReason, _stats: &StatsSnapshot) {}
}

/// Draws nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn draw(&mut self, _frame: &Frame<'_>) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[test]
    fn test_frame_symbols() {
        let registry = testing::registry();
        let wolf = registry.id("wolf").unwrap();
        let grass = registry.id("grass").unwrap();
        let cells = [
            CellGlyphs {
                animal: Some(wolf),
                plant: None,
            },
            CellGlyphs {
                animal: None,
                plant: Some(grass),
            },
        ];
        let stats = StatsSnapshot::default();
        let frame = Frame {
            cycle: 0,
            width: 2,
            height: 1,
            cells: &cells,
            registry: &registry,
            stats: &stats,
        };

        assert_eq!(frame.animal_symbol(0, 0), Some("W"));
        assert_eq!(frame.plant_symbol(0, 0), None);
        assert_eq!(frame.plant_symbol(1, 0), Some("g"));
    }
}
