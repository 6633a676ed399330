//! Labelizers: rasters to label maps
//!
//! Both labelizers scan the raster one row at a time and emit one run per
//! maximal span of equal labels, so construction is linear in the number of
//! pixels regardless of how many objects the raster holds.

use std::marker::PhantomData;

use crate::maybe_rayon::*;
use obia_core::{Algorithm, Error, Label, LabelMap, Raster, RasterElement, Result};
use tracing::debug;

/// Parameters for labelizing a label raster
#[derive(Debug, Clone)]
pub struct LabelImageParams<L> {
    /// Value marking pixels that belong to no object (default: 0)
    pub background: L,
}

impl<L: Label> Default for LabelImageParams<L> {
    fn default() -> Self {
        Self {
            background: L::zero(),
        }
    }
}

/// Label image to label map conversion
#[derive(Debug, Clone, Copy)]
pub struct LabelImageToLabelMap<L>(PhantomData<L>);

impl<L> Default for LabelImageToLabelMap<L> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<L: Label> Algorithm for LabelImageToLabelMap<L> {
    type Input = Raster<L>;
    type Output = LabelMap<L>;
    type Params = LabelImageParams<L>;
    type Error = Error;

    fn name(&self) -> &'static str {
        "LabelImageToLabelMap"
    }

    fn description(&self) -> &'static str {
        "Convert a raster of labels into a run-length encoded label map"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        label_image_to_label_map(&input, params.background)
    }
}

/// Convert a label raster into a label map.
///
/// Every maximal horizontal span of one non-background label becomes one
/// run of the object with that label. Nodata pixels are treated as
/// background. The map inherits the raster's geotransform.
pub fn label_image_to_label_map<L: Label>(image: &Raster<L>, background: L) -> Result<LabelMap<L>> {
    let (rows, cols) = image.shape();
    let nodata = image.nodata();

    let runs: Vec<Vec<(usize, usize, usize, L)>> = (0..rows)
        .into_par_iter()
        .map(|row| {
            let mut row_runs = Vec::new();
            let mut col = 0;
            while col < cols {
                let label = unsafe { image.get_unchecked(row, col) };
                let start = col;
                col += 1;
                while col < cols && unsafe { image.get_unchecked(row, col) } == label {
                    col += 1;
                }
                if label != background && !label.is_nodata(nodata) {
                    row_runs.push((row, start, col - start, label));
                }
            }
            row_runs
        })
        .collect();

    let mut map = LabelMap::new(rows, cols, background).with_transform(*image.transform());
    for (row, col, length, label) in runs.into_iter().flatten() {
        map.set_line(row, col, length, label)?;
    }

    debug!(
        rows,
        cols,
        objects = map.number_of_label_objects(),
        "labelized label image"
    );
    Ok(map)
}

/// Parameters for connected-component labelling of a binary raster
#[derive(Debug, Clone)]
pub struct BinaryImageParams {
    /// Pixel value considered foreground (default: 1.0)
    pub foreground_value: f64,
    /// Connect pixels through corners as well as faces (default: false)
    pub fully_connected: bool,
}

impl Default for BinaryImageParams {
    fn default() -> Self {
        Self {
            foreground_value: 1.0,
            fully_connected: false,
        }
    }
}

/// Binary image to label map conversion
#[derive(Debug, Clone, Copy)]
pub struct BinaryImageToLabelMap<L>(PhantomData<L>);

impl<L> Default for BinaryImageToLabelMap<L> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<L: Label> Algorithm for BinaryImageToLabelMap<L> {
    type Input = Raster<f64>;
    type Output = LabelMap<L>;
    type Params = BinaryImageParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "BinaryImageToLabelMap"
    }

    fn description(&self) -> &'static str {
        "Label the connected components of a binary raster"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        binary_image_to_label_map(&input, &params)
    }
}

/// Foreground run found while scanning a binary raster
#[derive(Debug, Clone, Copy)]
struct Run {
    row: usize,
    col: usize,
    end: usize,
}

/// Label the connected components of the foreground pixels.
///
/// Components are found with a union-find over the runs of consecutive
/// rows. Labels start at 1 (background is 0) and follow the raster order of
/// each component's first pixel.
pub fn binary_image_to_label_map<T, L>(image: &Raster<T>, params: &BinaryImageParams) -> Result<LabelMap<L>>
where
    T: RasterElement,
    L: Label,
{
    let (rows, cols) = image.shape();
    let foreground = params.foreground_value;

    let row_runs: Vec<Vec<Run>> = (0..rows)
        .into_par_iter()
        .map(|row| {
            let mut runs = Vec::new();
            let mut col = 0;
            while col < cols {
                if !is_foreground(unsafe { image.get_unchecked(row, col) }, foreground) {
                    col += 1;
                    continue;
                }
                let start = col;
                while col < cols && is_foreground(unsafe { image.get_unchecked(row, col) }, foreground) {
                    col += 1;
                }
                runs.push(Run { row, col: start, end: col });
            }
            runs
        })
        .collect();

    // Index of the first run of each row, plus a sentinel
    let mut offsets = Vec::with_capacity(rows + 1);
    let mut total = 0;
    for runs in &row_runs {
        offsets.push(total);
        total += runs.len();
    }
    offsets.push(total);
    let runs: Vec<Run> = row_runs.into_iter().flatten().collect();

    // Corner contact widens the overlap test by one column
    let slack = usize::from(params.fully_connected);
    let mut sets = DisjointSets::new(runs.len());
    for row in 1..rows {
        let (above, current) = (offsets[row - 1]..offsets[row], offsets[row]..offsets[row + 1]);
        let mut i = above.start;
        let mut j = current.start;
        while i < above.end && j < current.end {
            let (a, b) = (runs[i], runs[j]);
            if a.col < b.end + slack && b.col < a.end + slack {
                sets.union(i, j);
            }
            if a.end < b.end {
                i += 1;
            } else {
                j += 1;
            }
        }
    }

    let background = L::zero();
    let mut map = LabelMap::new(rows, cols, background).with_transform(*image.transform());
    let mut labels: Vec<Option<L>> = vec![None; runs.len()];
    let mut next = 1usize;
    for (index, run) in runs.iter().enumerate() {
        let root = sets.find(index);
        let label = match labels[root] {
            Some(label) => label,
            None => {
                let label = L::from_ordinal(next)
                    .filter(|l| *l != background)
                    .ok_or(Error::LabelsExhausted)?;
                next += 1;
                labels[root] = Some(label);
                label
            }
        };
        map.set_line(run.row, run.col, run.end - run.col, label)?;
    }

    debug!(
        rows,
        cols,
        runs = runs.len(),
        objects = map.number_of_label_objects(),
        fully_connected = params.fully_connected,
        "labelized binary image"
    );
    Ok(map)
}

fn is_foreground<T: RasterElement>(value: T, foreground: f64) -> bool {
    value.to_f64() == Some(foreground)
}

/// Union-find over run indices with path halving
struct DisjointSets {
    parent: Vec<usize>,
}

impl DisjointSets {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            // Keep the earlier run as root so roots stay in raster order
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[hi] = lo;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runs_of(map: &LabelMap<u16>, label: u16) -> Vec<(usize, usize, usize)> {
        let mut obj = map.label_object(label).unwrap().clone();
        obj.optimize();
        obj.lines().iter().map(|l| (l.row, l.col, l.length)).collect()
    }

    #[test]
    fn test_label_image_runs() {
        let image = Raster::from_rows(&[
            &[0u16, 3, 3, 0, 5],
            &[3, 3, 5, 5, 5],
            &[0, 0, 0, 0, 0],
        ])
        .unwrap();
        let map = label_image_to_label_map(&image, 0).unwrap();
        assert_eq!(map.number_of_label_objects(), 2);
        assert_eq!(runs_of(&map, 3), vec![(0, 1, 2), (1, 0, 2)]);
        assert_eq!(runs_of(&map, 5), vec![(0, 4, 1), (1, 2, 3)]);
        assert_eq!(map.label_object(3).unwrap().number_of_lines(), 2);
        assert!(map.check_disjoint().is_ok());
    }

    #[test]
    fn test_label_image_custom_background() {
        let image = Raster::from_rows(&[&[7u16, 7, 1], &[0, 7, 1]]).unwrap();
        let map = label_image_to_label_map(&image, 7).unwrap();
        assert_eq!(map.background(), 7);
        assert_eq!(map.labels().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(map.get_pixel(0, 0), 7);
    }

    #[test]
    fn test_binary_face_connectivity() {
        // Two diagonal blobs touching at a corner
        let image = Raster::from_rows(&[
            &[1.0, 1.0, 0.0, 0.0],
            &[1.0, 1.0, 0.0, 0.0],
            &[0.0, 0.0, 1.0, 1.0],
            &[0.0, 0.0, 1.0, 0.0],
        ])
        .unwrap();

        let map: LabelMap<u16> = binary_image_to_label_map(&image, &BinaryImageParams::default()).unwrap();
        assert_eq!(map.number_of_label_objects(), 2);
        assert_eq!(map.get_pixel(0, 0), 1);
        assert_eq!(map.get_pixel(3, 2), 2);
        assert_eq!(map.label_object(2).unwrap().size(), 3);

        let full = BinaryImageParams {
            fully_connected: true,
            ..Default::default()
        };
        let map: LabelMap<u16> = binary_image_to_label_map(&image, &full).unwrap();
        assert_eq!(map.number_of_label_objects(), 1);
        assert_eq!(map.label_object(1).unwrap().size(), 7);
    }

    #[test]
    fn test_binary_u_shape_merges() {
        // The two arms only meet on the last row
        let image = Raster::from_rows(&[
            &[1u8, 0, 1],
            &[1, 0, 1],
            &[1, 1, 1],
        ])
        .unwrap();
        let map: LabelMap<u32> = binary_image_to_label_map(&image, &BinaryImageParams::default()).unwrap();
        assert_eq!(map.number_of_label_objects(), 1);
        assert_eq!(map.label_object(1).unwrap().size(), 7);
    }

    #[test]
    fn test_binary_labels_in_raster_order() {
        let image = Raster::from_rows(&[
            &[0u8, 0, 0, 1],
            &[1, 0, 0, 1],
            &[1, 0, 1, 0],
        ])
        .unwrap();
        let map: LabelMap<u8> = binary_image_to_label_map(&image, &BinaryImageParams::default()).unwrap();
        assert_eq!(map.get_pixel(0, 3), 1);
        assert_eq!(map.get_pixel(1, 0), 2);
        assert_eq!(map.get_pixel(2, 2), 3);
    }

    #[test]
    fn test_binary_foreground_value() {
        let image = Raster::from_rows(&[&[255u8, 1, 255]]).unwrap();
        let params = BinaryImageParams {
            foreground_value: 255.0,
            ..Default::default()
        };
        let map: LabelMap<u8> = binary_image_to_label_map(&image, &params).unwrap();
        assert_eq!(map.number_of_label_objects(), 2);
    }
}
