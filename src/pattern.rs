//! Winning pattern evaluation
//!
//! Pure functions over a card's grid and the set of drawn numbers. The free
//! center cell always counts as marked.

use crate::catalog::{Card, CENTER, GRID_SIZE};
use std::collections::HashSet;

/// Patterns a claim can win with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    FourCorners,
    Row(usize),
    Column(usize),
    Cross,
    Diagonal,
    AntiDiagonal,
    FullCard,
}

/// Marked cells of one card for a given draw
pub struct MarkedGrid {
    marked: [[bool; GRID_SIZE]; GRID_SIZE],
}

impl MarkedGrid {
    pub fn new(card: &Card, drawn: &HashSet<u8>) -> Self {
        let mut marked = [[false; GRID_SIZE]; GRID_SIZE];
        for (row, cells) in marked.iter_mut().enumerate() {
            for (col, cell) in cells.iter_mut().enumerate() {
                *cell = (row == CENTER && col == CENTER) || drawn.contains(&card.cell(row, col));
            }
        }
        Self { marked }
    }

    fn is_marked(&self, row: usize, col: usize) -> bool {
        self.marked[row][col]
    }

    fn row_complete(&self, row: usize) -> bool {
        (0..GRID_SIZE).all(|col| self.is_marked(row, col))
    }

    fn column_complete(&self, col: usize) -> bool {
        (0..GRID_SIZE).all(|row| self.is_marked(row, col))
    }

    /// First completed pattern, if any
    pub fn completed_pattern(&self) -> Option<Pattern> {
        let last = GRID_SIZE - 1;
        if [(0, 0), (0, last), (last, 0), (last, last)]
            .iter()
            .all(|&(r, c)| self.is_marked(r, c))
        {
            return Some(Pattern::FourCorners);
        }

        if let Some(row) = (0..GRID_SIZE).find(|&r| self.row_complete(r)) {
            return Some(Pattern::Row(row));
        }
        if let Some(col) = (0..GRID_SIZE).find(|&c| self.column_complete(c)) {
            return Some(Pattern::Column(col));
        }

        if self.row_complete(CENTER) && self.column_complete(CENTER) {
            return Some(Pattern::Cross);
        }

        if (0..GRID_SIZE).all(|i| self.is_marked(i, i)) {
            return Some(Pattern::Diagonal);
        }
        if (0..GRID_SIZE).all(|i| self.is_marked(i, last - i)) {
            return Some(Pattern::AntiDiagonal);
        }

        if (0..GRID_SIZE).all(|r| self.row_complete(r)) {
            return Some(Pattern::FullCard);
        }

        None
    }
}

/// Whether `card` has any winning pattern given the drawn numbers
pub fn has_bingo(card: &Card, drawn: &HashSet<u8>) -> bool {
    MarkedGrid::new(card, drawn).completed_pattern().is_some()
}
