//! Box-drawn text rendering of the island.

use isle_core::{EndReason, StatsSnapshot};
use isle_world::{Frame, Renderer};
use std::io::{self, Write};
use tracing::warn;

/// Placeholder for a cell without animals or plants (two columns, like the emoji)
const EMPTY: &str = "  ";

/// Draws each cell as its dominant animal followed by its dominant plant
pub struct TextRenderer<W: Write + Send> {
    out: W,
    failed: bool,
}

impl TextRenderer<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> TextRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out, failed: false }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_frame(&mut self, frame: &Frame<'_>) -> io::Result<()> {
        let deaths: u64 = frame.stats.deaths.values().sum();
        writeln!(
            self.out,
            "Cycle {:>5} | births {:>6} | deaths {:>6} | feedings {:>6}",
            frame.cycle, frame.stats.births, deaths, frame.stats.feedings
        )?;

        let rule = "─".repeat(frame.width as usize * 4);
        writeln!(self.out, "┌{}┐", rule)?;
        for y in 0..frame.height {
            let mut row = String::with_capacity(frame.width as usize * 8);
            for x in 0..frame.width {
                row.push_str(frame.animal_symbol(x, y).unwrap_or(EMPTY));
                row.push_str(frame.plant_symbol(x, y).unwrap_or(EMPTY));
            }
            writeln!(self.out, "│{}│", row)?;
        }
        writeln!(self.out, "└{}┘", rule)?;
        self.out.flush()
    }

    fn report(&mut self, result: io::Result<()>) {
        if let Err(e) = result {
            if !self.failed {
                warn!(error = %e, "Rendering failed, further frames are dropped");
            }
            self.failed = true;
        }
    }
}

impl<W: Write + Send> Renderer for TextRenderer<W> {
    fn draw(&mut self, frame: &Frame<'_>) {
        if self.failed {
            return;
        }
        let result = self.write_frame(frame);
        self.report(result);
    }

    fn finish(&mut self, reason: EndReason, stats: &StatsSnapshot) {
        let result = writeln!(
            self.out,
            "Simulation ended after {} cycles: {}",
            stats.completed_cycles, reason
        )
        .and_then(|_| self.out.flush());
        self.report(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isle_core::SpeciesRegistry;
    use isle_world::CellGlyphs;

    #[test]
    fn test_frame_layout() {
        let registry = SpeciesRegistry::builtin().unwrap();
        let wolf = registry.id("wolf").unwrap();
        let grass = registry.id("grass").unwrap();
        let cells = [
            CellGlyphs {
                animal: Some(wolf),
                plant: Some(grass),
            },
            CellGlyphs::default(),
        ];
        let stats = StatsSnapshot {
            births: 3,
            ..Default::default()
        };
        let frame = Frame {
            cycle: 7,
            width: 2,
            height: 1,
            cells: &cells,
            registry: &registry,
            stats: &stats,
        };

        let mut renderer = TextRenderer::new(Vec::new());
        renderer.draw(&frame);
        renderer.finish(EndReason::PlantsExtinct, &stats);
        let text = String::from_utf8(renderer.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert!(lines[0].starts_with("Cycle     7"));
        assert!(lines[0].contains("births      3"));
        assert_eq!(lines[1], format!("┌{}┐", "─".repeat(8)));
        assert_eq!(
            lines[2],
            format!(
                "│{}{}{}{}│",
                registry.symbol(wolf),
                registry.symbol(grass),
                EMPTY,
                EMPTY
            )
        );
        assert!(lines[4].contains("plants are extinct"));
    }
}
