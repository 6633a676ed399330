//! The label map container

use std::collections::BTreeMap;
use std::fmt;

use tracing::trace;

use crate::error::{Error, Result};
use crate::labelmap::{LabelObject, Region, RunLengthLine};
use crate::raster::{GeoTransform, Label};

/// A labeled raster stored as objects keyed by label.
///
/// The map owns every [`LabelObject`]. The background label is never a key:
/// pixels not covered by any object read back as background. Objects are
/// iterated in ascending label order, which is also the tie-break order of
/// the ranking filters.
///
/// # Example
/// ```
/// use obia_core::LabelMap;
///
/// let mut map = LabelMap::new(4, 4, 0u8);
/// map.set_line(1, 0, 3, 5).unwrap();
/// map.set_pixel(2, 2, 5).unwrap();
/// assert_eq!(map.get_pixel(1, 2), 5);
/// assert_eq!(map.get_pixel(0, 0), 0);
/// assert_eq!(map.label_object(5).unwrap().size(), 4);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LabelMap<L: Label> {
    objects: BTreeMap<L, LabelObject<L>>,
    background: L,
    region: Region,
    transform: GeoTransform,
}

impl<L: Label> LabelMap<L> {
    /// Create an empty map covering `rows x cols` pixels from the origin
    pub fn new(rows: usize, cols: usize, background: L) -> Self {
        Self::with_region(Region::from_shape(rows, cols), background)
    }

    /// Create an empty map over an arbitrary index region
    pub fn with_region(region: Region, background: L) -> Self {
        Self {
            objects: BTreeMap::new(),
            background,
            region,
            transform: GeoTransform::pixel_grid(),
        }
    }

    /// Empty map sharing this map's geometry and background
    pub fn empty_like(&self) -> Self {
        Self {
            objects: BTreeMap::new(),
            background: self.background,
            region: self.region,
            transform: self.transform,
        }
    }

    // Geometry

    pub fn background(&self) -> L {
        self.background
    }

    /// Change the background label.
    ///
    /// Fails when an object already uses the new value as its key.
    pub fn set_background(&mut self, background: L) -> Result<()> {
        if self.objects.contains_key(&background) {
            return Err(Error::BackgroundLabel(background.to_string()));
        }
        self.background = background;
        Ok(())
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn set_region(&mut self, region: Region) {
        self.region = region;
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    /// Builder-style transform setter
    pub fn with_transform(mut self, transform: GeoTransform) -> Self {
        self.transform = transform;
        self
    }

    /// `(rows, cols)` of the region
    pub fn shape(&self) -> (usize, usize) {
        self.region.shape()
    }

    fn check_index(&self, row: usize, col: usize) -> Result<()> {
        if self.region.contains(row, col) {
            Ok(())
        } else {
            Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.region.end_row(),
                cols: self.region.end_col(),
            })
        }
    }

    // Pixel access

    /// Assign one pixel to `label`.
    ///
    /// The pixel is first taken away from whichever object owned it (an
    /// object left without pixels is dropped). Setting the background label
    /// only performs that removal.
    pub fn set_pixel(&mut self, row: usize, col: usize, label: L) -> Result<()> {
        self.check_index(row, col)?;

        let owner = self
            .objects
            .values()
            .find(|obj| obj.has_index(row, col))
            .map(|obj| obj.label());

        if owner == Some(label) {
            return Ok(());
        }

        if let Some(owner) = owner {
            let emptied = match self.objects.get_mut(&owner) {
                Some(obj) => {
                    obj.remove_index(row, col);
                    obj.is_empty()
                }
                None => false,
            };
            if emptied {
                self.objects.remove(&owner);
            }
        }

        if label != self.background {
            self.objects
                .entry(label)
                .or_insert_with(|| LabelObject::new(label))
                .add_index(row, col);
        }
        Ok(())
    }

    /// Append the run `col..col + length` on `row` to the object for `label`.
    ///
    /// No overlap check is performed against existing runs; callers that
    /// cannot guarantee disjoint input should run [`check_disjoint`] after
    /// construction.
    ///
    /// [`check_disjoint`]: LabelMap::check_disjoint
    pub fn set_line(&mut self, row: usize, col: usize, length: usize, label: L) -> Result<()> {
        if label == self.background {
            return Err(Error::BackgroundLabel(label.to_string()));
        }
        if length == 0 {
            return Err(Error::InvalidParameter {
                name: "length",
                value: "0".to_string(),
                reason: "a run holds at least one pixel".to_string(),
            });
        }
        if !self.region.contains_span(row, col, length) {
            return Err(Error::IndexOutOfBounds {
                row,
                col: col + length - 1,
                rows: self.region.end_row(),
                cols: self.region.end_col(),
            });
        }

        self.objects
            .entry(label)
            .or_insert_with(|| LabelObject::new(label))
            .add_line(RunLengthLine::new(row, col, length));
        Ok(())
    }

    /// Label of the object holding the pixel, or the background label.
    ///
    /// This scans every object; rasterize the map for repeated lookups.
    pub fn get_pixel(&self, row: usize, col: usize) -> L {
        self.label_object_at(row, col)
            .map_or(self.background, |obj| obj.label())
    }

    // Object access

    pub fn label_object(&self, label: L) -> Result<&LabelObject<L>> {
        self.objects
            .get(&label)
            .ok_or_else(|| Error::label_not_found(label))
    }

    pub fn label_object_mut(&mut self, label: L) -> Result<&mut LabelObject<L>> {
        self.objects
            .get_mut(&label)
            .ok_or_else(|| Error::label_not_found(label))
    }

    /// Object holding the pixel `(row, col)`, if any
    pub fn label_object_at(&self, row: usize, col: usize) -> Option<&LabelObject<L>> {
        self.objects.values().find(|obj| obj.has_index(row, col))
    }

    /// True for every key present and for the background label
    pub fn has_label(&self, label: L) -> bool {
        label == self.background || self.objects.contains_key(&label)
    }

    /// The `n`-th object in label order
    pub fn nth_label_object(&self, n: usize) -> Result<&LabelObject<L>> {
        self.objects.values().nth(n).ok_or_else(|| Error::InvalidParameter {
            name: "n",
            value: n.to_string(),
            reason: format!("map holds {} objects", self.objects.len()),
        })
    }

    /// Insert an object under its own label, returning the object it replaced
    pub fn add_label_object(&mut self, object: LabelObject<L>) -> Result<Option<LabelObject<L>>> {
        if object.label() == self.background {
            return Err(Error::BackgroundLabel(object.label().to_string()));
        }
        Ok(self.objects.insert(object.label(), object))
    }

    /// Insert an object under a fresh label and return that label.
    ///
    /// The new label follows the largest one in use; when that overflows the
    /// label type, the smallest unused value is taken instead. The background
    /// label is always skipped.
    pub fn push_label_object(&mut self, mut object: LabelObject<L>) -> Result<L> {
        let label = self.next_free_label()?;
        object.set_label(label);
        self.objects.insert(label, object);
        Ok(label)
    }

    fn next_free_label(&self) -> Result<L> {
        let candidate = match self.objects.keys().next_back() {
            None => Some(L::zero()),
            Some(last) => last.successor(),
        };
        let candidate = match candidate {
            Some(c) if c == self.background => c.successor(),
            other => other,
        };
        if let Some(c) = candidate {
            if !self.objects.contains_key(&c) {
                return Ok(c);
            }
        }

        // Wrapped around: at most len + 1 values are taken, so a free one
        // turns up within len + 2 steps unless the type itself runs out.
        trace!(objects = self.objects.len(), "label range wrapped, scanning for a free label");
        let mut label = L::first();
        for _ in 0..self.objects.len() + 2 {
            if label != self.background && !self.objects.contains_key(&label) {
                return Ok(label);
            }
            label = label.successor().ok_or(Error::LabelsExhausted)?;
        }
        Err(Error::LabelsExhausted)
    }

    /// Remove an object by its label
    pub fn remove_label_object(&mut self, object: &LabelObject<L>) -> Option<LabelObject<L>> {
        self.remove_label(object.label())
    }

    pub fn remove_label(&mut self, label: L) -> Option<LabelObject<L>> {
        self.objects.remove(&label)
    }

    /// Drop every object; geometry and background are kept
    pub fn clear_labels(&mut self) {
        self.objects.clear();
    }

    pub fn number_of_label_objects(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Labels in ascending order
    pub fn labels(&self) -> impl Iterator<Item = L> + '_ {
        self.objects.keys().copied()
    }

    /// Objects in ascending label order
    pub fn iter(&self) -> impl Iterator<Item = &LabelObject<L>> {
        self.objects.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut LabelObject<L>> {
        self.objects.values_mut()
    }

    /// Keep only the objects matching the predicate, returning the others
    /// in label order.
    pub fn retain<F>(&mut self, mut keep: F) -> Vec<LabelObject<L>>
    where
        F: FnMut(&LabelObject<L>) -> bool,
    {
        let rejected: Vec<L> = self
            .objects
            .values()
            .filter(|obj| !keep(obj))
            .map(|obj| obj.label())
            .collect();
        rejected
            .into_iter()
            .filter_map(|label| self.objects.remove(&label))
            .collect()
    }

    /// Move every object out of the map, in label order
    pub fn take_objects(&mut self) -> Vec<LabelObject<L>> {
        std::mem::take(&mut self.objects).into_values().collect()
    }

    // Maintenance

    /// Sort and merge the runs of every object
    pub fn optimize(&mut self) {
        for obj in self.objects.values_mut() {
            obj.optimize();
        }
    }

    /// Verify that every run lies inside the map region.
    ///
    /// Objects inserted whole or edited through [`label_object_mut`] are not
    /// checked on the way in; readers that index rasters by region offset
    /// call this first.
    ///
    /// [`label_object_mut`]: LabelMap::label_object_mut
    pub fn check_bounds(&self) -> Result<()> {
        let region = self.region;
        for line in self.objects.values().flat_map(|obj| obj.lines()) {
            if !region.contains_span(line.row, line.col, line.length) {
                return Err(Error::IndexOutOfBounds {
                    row: line.row,
                    col: line.last_col(),
                    rows: region.end_row(),
                    cols: region.end_col(),
                });
            }
        }
        Ok(())
    }

    /// Verify that no pixel belongs to two objects, or twice to one object.
    ///
    /// Returns the first conflicting pixel in raster order.
    pub fn check_disjoint(&self) -> Result<()> {
        let mut runs: Vec<(RunLengthLine, L)> = self
            .objects
            .values()
            .flat_map(|obj| obj.lines().iter().map(move |l| (*l, obj.label())))
            .collect();
        runs.sort_unstable_by_key(|(l, label)| (l.row, l.col, *label));

        // Furthest-reaching run seen so far on the current row
        let mut reach: Option<(RunLengthLine, L)> = None;
        for (line, label) in runs {
            if let Some((prev, prev_label)) = reach {
                if prev.row == line.row && line.col < prev.end() {
                    return Err(Error::OverlappingObjects {
                        row: line.row,
                        col: line.col,
                        first: prev_label.to_string(),
                        second: label.to_string(),
                    });
                }
                if prev.row == line.row && prev.end() >= line.end() {
                    continue;
                }
            }
            reach = Some((line, label));
        }
        Ok(())
    }
}

impl<L: Label> fmt::Display for LabelMap<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LabelMap {}x{} at ({}, {}), background {}, {} objects",
            self.region.rows,
            self.region.cols,
            self.region.row,
            self.region.col,
            self.background,
            self.objects.len()
        )
    }
}
