//! Bounded 2D grid of cells.

use crate::cell::Cell;
use isle_core::{Direction, GridConfig, Position, Result};
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

/// A rectangular, non-wrapping grid.
///
/// Cells are stored row-major; a cell's index is its lock rank during
/// movement. Neighbour lists are precomputed once and never change.
#[derive(Debug)]
pub struct Grid {
    pub width: i32,
    pub height: i32,
    cells: Vec<Cell>,
}

impl Grid {
    pub fn new(width: i32, height: i32) -> Result<Self> {
        let size = GridConfig { width, height }.cell_count()?;
        let mut cells = Vec::with_capacity(size);
        for index in 0..size {
            let position = Position::new(index as i32 % width, index as i32 / width);
            let neighbors = Direction::all()
                .iter()
                .map(|direction| {
                    let (dx, dy) = direction.to_delta();
                    position.add(dx, dy)
                })
                .filter(|pos| pos.in_bounds(width, height))
                .map(|pos| (pos.y * width + pos.x) as usize)
                .collect();
            cells.push(Cell::new(index, position, neighbors));
        }

        Ok(Self {
            width,
            height,
            cells,
        })
    }

    pub fn from_config(config: &GridConfig) -> Result<Self> {
        Self::new(config.width, config.height)
    }

    /// Cell by index. Indices come from the grid itself, so out of range is a bug.
    pub fn cell(&self, index: usize) -> &Cell {
        &self.cells[index]
    }

    pub fn get(&self, pos: Position) -> Option<&Cell> {
        self.index_of(pos).map(|index| &self.cells[index])
    }

    pub fn index_of(&self, pos: Position) -> Option<usize> {
        pos.in_bounds(self.width, self.height)
            .then(|| (pos.y * self.width + pos.x) as usize)
    }

    /// Get position from index
    pub fn index_to_pos(&self, index: usize) -> Position {
        let x = (index as i32) % self.width;
        let y = (index as i32) / self.width;
        Position::new(x, y)
    }

    pub fn neighbors(&self, index: usize) -> &[usize] {
        self.cells[index].neighbors()
    }

    pub fn cells(&self) -> impl Iterator<Item = &Cell> + '_ {
        self.cells.iter()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Walk `steps` hops from `start`, each to a uniformly chosen neighbour.
    ///
    /// A 1x1 grid has no neighbours, so the walk stays put.
    pub fn random_walk(&self, start: usize, steps: u32, rng: &mut ChaCha8Rng) -> usize {
        let mut current = start;
        for _ in 0..steps {
            match self.neighbors(current).choose(rng) {
                Some(&next) => current = next,
                None => break,
            }
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isle_core::Error;
    use proptest::prelude::*;
    use rand::SeedableRng;

    #[test]
    fn test_grid_creation() {
        let grid = Grid::new(10, 10).unwrap();
        assert_eq!(grid.width, 10);
        assert_eq!(grid.height, 10);
        assert_eq!(grid.len(), 100);
        assert_eq!(grid.index_to_pos(23), Position::new(3, 2));
        assert_eq!(grid.index_of(Position::new(3, 2)), Some(23));
    }

    #[test]
    fn test_invalid_dimensions() {
        assert!(matches!(Grid::new(0, 5), Err(Error::Config(_))));
        assert!(Grid::new(5, -1).is_err());
        assert!(matches!(
            Grid::new(i32::MAX, i32::MAX),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_no_wraparound() {
        let grid = Grid::new(10, 10).unwrap();
        assert!(grid.get(Position::new(-1, -1)).is_none());
        assert!(grid.get(Position::new(10, 0)).is_none());
        assert!(grid.get(Position::new(9, 9)).is_some());
    }

    #[test]
    fn test_neighbor_counts() {
        let grid = Grid::new(10, 10).unwrap();
        // Corner, edge, interior
        assert_eq!(grid.neighbors(0).len(), 3);
        assert_eq!(grid.neighbors(5).len(), 5);
        assert_eq!(grid.neighbors(55).len(), 8);

        let single = Grid::new(1, 1).unwrap();
        assert!(single.neighbors(0).is_empty());
    }

    #[test]
    fn test_random_walk_on_single_cell() {
        let grid = Grid::new(1, 1).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert_eq!(grid.random_walk(0, 5, &mut rng), 0);
    }

    proptest! {
        #[test]
        fn neighbors_are_symmetric_and_adjacent(width in 1i32..12, height in 1i32..12) {
            let grid = Grid::new(width, height).unwrap();
            for index in 0..grid.len() {
                let pos = grid.index_to_pos(index);
                for &other in grid.neighbors(index) {
                    prop_assert!(other < grid.len());
                    prop_assert!(grid.neighbors(other).contains(&index));
                    let peer = grid.index_to_pos(other);
                    prop_assert!((peer.x - pos.x).abs() <= 1 && (peer.y - pos.y).abs() <= 1);
                    prop_assert_ne!(other, index);
                }
            }
        }

        #[test]
        fn random_walk_stays_on_grid(
            width in 1i32..10,
            height in 1i32..10,
            steps in 0u32..8,
            seed in any::<u64>(),
        ) {
            let grid = Grid::new(width, height).unwrap();
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let start = (seed as usize) % grid.len();
            let end = grid.random_walk(start, steps, &mut rng);
            prop_assert!(end < grid.len());

            let (from, to) = (grid.index_to_pos(start), grid.index_to_pos(end));
            let reach = steps as i32;
            prop_assert!((from.x - to.x).abs() <= reach && (from.y - to.y).abs() <= reach);
        }
    }
}
