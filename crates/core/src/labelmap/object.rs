//! A labeled region stored as run-length lines

use crate::error::{Error, Result};
use crate::labelmap::{AttributesMap, RunLengthLine};
use crate::raster::Label;

/// One object of a [`LabelMap`](crate::LabelMap): every pixel carrying the
/// same label, stored as horizontal runs, plus its named attributes and an
/// optional class label assigned by classifiers.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelObject<L: Label> {
    label: L,
    lines: Vec<RunLengthLine>,
    attributes: AttributesMap,
    class_label: Option<L>,
}

impl<L: Label> LabelObject<L> {
    /// Create an empty object
    pub fn new(label: L) -> Self {
        Self {
            label,
            lines: Vec::new(),
            attributes: AttributesMap::new(),
            class_label: None,
        }
    }

    pub fn label(&self) -> L {
        self.label
    }

    /// Relabel a detached object. The owning map keeps objects keyed by
    /// label, so this is only reachable before insertion.
    pub(crate) fn set_label(&mut self, label: L) {
        self.label = label;
    }

    pub fn class_label(&self) -> Option<L> {
        self.class_label
    }

    pub fn set_class_label(&mut self, class_label: Option<L>) {
        self.class_label = class_label;
    }

    // Lines

    pub fn lines(&self) -> &[RunLengthLine] {
        &self.lines
    }

    pub fn number_of_lines(&self) -> usize {
        self.lines.len()
    }

    /// Number of pixels, counting duplicates left by unchecked appends
    pub fn size(&self) -> usize {
        self.lines.iter().map(|l| l.length).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Append a run without checking it against the existing ones
    pub fn add_line(&mut self, line: RunLengthLine) {
        self.lines.push(line);
    }

    pub fn has_index(&self, row: usize, col: usize) -> bool {
        self.lines.iter().any(|l| l.contains(row, col))
    }

    /// Add one pixel, extending or joining neighbouring runs on the same row.
    ///
    /// Adding a pixel the object already holds is a no-op. Searching from the
    /// back keeps raster-order insertion cheap.
    pub fn add_index(&mut self, row: usize, col: usize) {
        if self.has_index(row, col) {
            return;
        }

        let left = self
            .lines
            .iter()
            .rposition(|l| l.row == row && l.end() == col);
        let right = self
            .lines
            .iter()
            .rposition(|l| l.row == row && l.col == col + 1);

        match (left, right) {
            (Some(i), Some(j)) => {
                let merged = self.lines[j].length;
                self.lines[i].length += 1 + merged;
                self.lines.remove(j);
            }
            (Some(i), None) => self.lines[i].length += 1,
            (None, Some(j)) => {
                self.lines[j].col -= 1;
                self.lines[j].length += 1;
            }
            (None, None) => self.lines.push(RunLengthLine::new(row, col, 1)),
        }
    }

    /// Remove one pixel, splitting its run when needed.
    ///
    /// Returns whether the pixel was part of the object.
    pub fn remove_index(&mut self, row: usize, col: usize) -> bool {
        let Some(i) = self.lines.iter().position(|l| l.contains(row, col)) else {
            return false;
        };

        let line = self.lines[i];
        if line.length == 1 {
            self.lines.remove(i);
        } else if col == line.col {
            self.lines[i].col += 1;
            self.lines[i].length -= 1;
        } else if col == line.last_col() {
            self.lines[i].length -= 1;
        } else {
            self.lines[i].length = col - line.col;
            self.lines
                .insert(i + 1, RunLengthLine::new(row, col + 1, line.end() - col - 1));
        }
        true
    }

    /// Sort the runs in raster order and merge the ones that overlap or touch
    pub fn optimize(&mut self) {
        if self.lines.len() < 2 {
            return;
        }
        self.lines.sort_unstable_by_key(|l| (l.row, l.col));

        let mut merged: Vec<RunLengthLine> = Vec::with_capacity(self.lines.len());
        for line in self.lines.drain(..) {
            match merged.last_mut() {
                Some(last) if last.touches(&line) => {
                    let end = last.end().max(line.end());
                    last.length = end - last.col;
                }
                _ => merged.push(line),
            }
        }
        self.lines = merged;
    }

    /// Every pixel `(row, col)` of the object, run by run
    pub fn pixels(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.lines.iter().flat_map(|l| l.pixels())
    }

    /// Inclusive index bounds `(min_row, min_col, max_row, max_col)`
    pub fn bounding_box(&self) -> Option<(usize, usize, usize, usize)> {
        let first = self.lines.first()?;
        let init = (first.row, first.col, first.row, first.last_col());
        Some(self.lines.iter().fold(init, |(r0, c0, r1, c1), l| {
            (r0.min(l.row), c0.min(l.col), r1.max(l.row), c1.max(l.last_col()))
        }))
    }

    // Attributes

    pub fn attributes(&self) -> &AttributesMap {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut AttributesMap {
        &mut self.attributes
    }

    /// Value of a named attribute; a missing name is an error, never a default
    pub fn attribute(&self, name: &str) -> Result<f64> {
        self.attributes
            .get(name)
            .ok_or_else(|| Error::attribute_not_found(name, self.label))
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: f64) {
        self.attributes.set(name, value);
    }
}
