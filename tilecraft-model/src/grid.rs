//! Coordinate layout of a chunk while it is being generated.
//!
//! Only the bind phase needs coordinates; afterwards everything navigates the
//! persisted adjacency tables instead.

use crate::new_id;
use crate::tile::Direction;
use crate::world::Dimensions;

/// Position of one tile in the grid. `index` is row-major.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    pub index: usize,
    pub x: u32,
    pub y: u32,
}

/// Row-major table of tile ids for a `width x height` chunk.
#[derive(Debug, Clone)]
pub struct Grid {
    dimensions: Dimensions,
    ids: Vec<String>,
}

impl Grid {
    /// Allocate a fresh tile id for every coordinate.
    pub fn allocate(dimensions: Dimensions) -> Self {
        let ids = (0..dimensions.tile_count()).map(|_| new_id()).collect();
        Self { dimensions, ids }
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn cell(&self, x: u32, y: u32) -> Option<Cell> {
        if x < self.dimensions.width && y < self.dimensions.height {
            Some(Cell {
                index: y as usize * self.dimensions.width as usize + x as usize,
                x,
                y,
            })
        } else {
            None
        }
    }

    /// Every cell, row by row.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        let width = self.dimensions.width;
        (0..self.dimensions.height)
            .flat_map(move |y| (0..width).map(move |x| (x, y)))
            .filter_map(|(x, y)| self.cell(x, y))
    }

    pub fn id(&self, cell: &Cell) -> &str {
        &self.ids[cell.index]
    }

    pub fn id_at(&self, x: u32, y: u32) -> Option<&str> {
        self.cell(x, y).map(|cell| self.id(&cell))
    }

    /// Cells on the outer ring: x in {0, w-1} or y in {0, h-1}.
    pub fn is_border(&self, cell: &Cell) -> bool {
        cell.x == 0
            || cell.y == 0
            || cell.x + 1 == self.dimensions.width
            || cell.y + 1 == self.dimensions.height
    }

    /// The in-grid cell one step from `cell`, if any.
    pub fn neighbor(&self, cell: &Cell, direction: Direction) -> Option<Cell> {
        let (dx, dy) = direction.offset();
        let x = u32::try_from(i64::from(cell.x) + dx).ok()?;
        let y = u32::try_from(i64::from(cell.y) + dy).ok()?;
        self.cell(x, y)
    }
}
