//! Horizontal pixel runs

use serde::{Deserialize, Serialize};

/// A run of `length` consecutive pixels starting at `(row, col)` and
/// extending along the columns.
///
/// Runs never span more than one row and are never empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunLengthLine {
    pub row: usize,
    pub col: usize,
    pub length: usize,
}

impl RunLengthLine {
    pub fn new(row: usize, col: usize, length: usize) -> Self {
        debug_assert!(length >= 1, "a run-length line holds at least one pixel");
        Self { row, col, length }
    }

    /// One past the last column of the run
    pub fn end(&self) -> usize {
        self.col + self.length
    }

    /// Last column covered by the run
    pub fn last_col(&self) -> usize {
        self.end() - 1
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        self.row == row && col >= self.col && col < self.end()
    }

    /// Whether the two runs share a pixel
    pub fn overlaps(&self, other: &RunLengthLine) -> bool {
        self.row == other.row && self.col < other.end() && other.col < self.end()
    }

    /// Whether the two runs share a pixel or touch end to end
    pub fn touches(&self, other: &RunLengthLine) -> bool {
        self.row == other.row && self.col <= other.end() && other.col <= self.end()
    }

    /// Indices `(row, col)` of every pixel of the run
    pub fn pixels(&self) -> impl Iterator<Item = (usize, usize)> {
        let row = self.row;
        (self.col..self.end()).map(move |col| (row, col))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_extent() {
        let line = RunLengthLine::new(3, 2, 4);
        assert_eq!(line.end(), 6);
        assert_eq!(line.last_col(), 5);
        assert!(line.contains(3, 2));
        assert!(line.contains(3, 5));
        assert!(!line.contains(3, 6));
        assert!(!line.contains(2, 3));
        assert_eq!(line.pixels().count(), 4);
    }

    #[test]
    fn test_line_overlap_and_touch() {
        let a = RunLengthLine::new(0, 0, 3);
        let b = RunLengthLine::new(0, 3, 2);
        let c = RunLengthLine::new(0, 2, 2);
        let d = RunLengthLine::new(1, 0, 3);
        assert!(!a.overlaps(&b));
        assert!(a.touches(&b));
        assert!(a.overlaps(&c));
        assert!(!a.touches(&d));
    }
}
