//! Index bounds of a label map

use serde::{Deserialize, Serialize};

/// A rectangular block of pixel indices: rows `row..row + rows`,
/// columns `col..col + cols`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Region {
    pub row: usize,
    pub col: usize,
    pub rows: usize,
    pub cols: usize,
}

impl Region {
    pub fn new(row: usize, col: usize, rows: usize, cols: usize) -> Self {
        Self { row, col, rows, cols }
    }

    /// Region anchored at the origin
    pub fn from_shape(rows: usize, cols: usize) -> Self {
        Self::new(0, 0, rows, cols)
    }

    /// One past the last row
    pub fn end_row(&self) -> usize {
        self.row + self.rows
    }

    /// One past the last column
    pub fn end_col(&self) -> usize {
        self.col + self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        row >= self.row && row < self.end_row() && col >= self.col && col < self.end_col()
    }

    /// Whether the horizontal span `col..col + length` on `row` lies inside
    pub fn contains_span(&self, row: usize, col: usize, length: usize) -> bool {
        length > 0 && self.contains(row, col) && col + length <= self.end_col()
    }

    /// Whether the pixel lies on the outer border of the region
    pub fn is_on_border(&self, row: usize, col: usize) -> bool {
        self.contains(row, col)
            && (row == self.row
                || row + 1 == self.end_row()
                || col == self.col
                || col + 1 == self.end_col())
    }

    /// Intersection with another region (empty region when disjoint)
    pub fn intersection(&self, other: &Region) -> Region {
        let row = self.row.max(other.row);
        let col = self.col.max(other.col);
        let end_row = self.end_row().min(other.end_row());
        let end_col = self.end_col().min(other.end_col());
        if end_row <= row || end_col <= col {
            return Region::new(row, col, 0, 0);
        }
        Region::new(row, col, end_row - row, end_col - col)
    }

    /// Grow the region by `border` pixels on every side, saturating at zero
    pub fn padded(&self, border: usize) -> Region {
        let row = self.row.saturating_sub(border);
        let col = self.col.saturating_sub(border);
        Region::new(
            row,
            col,
            self.end_row() + border - row,
            self.end_col() + border - col,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_contains() {
        let r = Region::new(2, 3, 4, 5);
        assert!(r.contains(2, 3));
        assert!(r.contains(5, 7));
        assert!(!r.contains(6, 3));
        assert!(!r.contains(2, 8));
        assert!(r.contains_span(2, 3, 5));
        assert!(!r.contains_span(2, 4, 5));
        assert!(!r.contains_span(2, 4, 0));
    }

    #[test]
    fn test_region_border() {
        let r = Region::from_shape(5, 5);
        assert!(r.is_on_border(0, 2));
        assert!(r.is_on_border(2, 4));
        assert!(!r.is_on_border(2, 2));
    }

    #[test]
    fn test_intersection_and_padding() {
        let a = Region::new(0, 0, 10, 10);
        let b = Region::new(5, 8, 10, 10);
        assert_eq!(a.intersection(&b), Region::new(5, 8, 5, 2));

        let disjoint = Region::new(20, 20, 1, 1);
        assert!(a.intersection(&disjoint).is_empty());

        let padded = Region::new(1, 4, 2, 2).padded(2);
        assert_eq!(padded, Region::new(0, 2, 5, 6));
    }
}
