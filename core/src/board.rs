// SPDX-License-Identifier: MIT OR Apache-2.0

//! Board representation as reported by the match server

use crate::{CellState, Color, Coord, GameError};

/// A rectangular grid of cell states
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Board {
    rows: usize,
    cols: usize,
    /// Positions on the board, row-major
    cells: Vec<CellState>,
}

impl Board {
    /// Create a new empty board with the specified dimensions
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![CellState::Empty; rows * cols],
        }
    }

    /// Build a board from server rows, rejecting ragged grids
    pub fn from_rows(rows: Vec<Vec<CellState>>) -> Result<Self, GameError> {
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        let mut cells = Vec::with_capacity(rows.len() * cols);

        for (row, line) in rows.iter().enumerate() {
            if line.len() != cols {
                return Err(GameError::RaggedBoard {
                    row,
                    found: line.len(),
                    expected: cols,
                });
            }
            cells.extend_from_slice(line);
        }

        Ok(Self {
            rows: rows.len(),
            cols,
            cells,
        })
    }

    /// Get the cell at the specified coordinate
    pub fn get(&self, coord: Coord) -> Option<CellState> {
        if !coord.is_within(self.rows, self.cols) {
            return None;
        }

        Some(self.cells[self.coord_to_index(coord)])
    }

    /// Get the stone at the specified coordinate
    pub fn stone_at(&self, coord: Coord) -> Option<Color> {
        self.get(coord).and_then(|cell| cell.stone())
    }

    /// Whether the coordinate is on the board and holds no stone
    pub fn is_empty_at(&self, coord: Coord) -> bool {
        matches!(self.get(coord), Some(CellState::Empty))
    }

    /// Place a stone at the specified coordinate
    pub fn place(&mut self, coord: Coord, color: Color) -> bool {
        if !self.is_empty_at(coord) {
            return false;
        }

        let idx = self.coord_to_index(coord);
        self.cells[idx] = color.into();
        true
    }

    /// Convert a coordinate to a vector index
    fn coord_to_index(&self, coord: Coord) -> usize {
        coord.row * self.cols + coord.col
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// A board with no cells, as sent by replies that omit the grid
    pub fn is_blank(&self) -> bool {
        self.cells.is_empty()
    }

    /// Count stones of specified color on the board
    pub fn count_stones_for(&self, color: Color) -> usize {
        self.cells
            .iter()
            .filter(|cell| cell.stone() == Some(color))
            .count()
    }
}
