//! Rasterizers: label maps back to rasters
//!
//! Runs are first bucketed by row, then each output row is painted
//! independently, so rows are filled in parallel without sharing state.

use std::marker::PhantomData;

use obia_core::{Algorithm, Error, GeoTransform, Label, LabelMap, LabelObject, Raster, RasterElement, Result};
use obia_parallel::{ParallelStrategy, ProcessingMode};
use tracing::debug;

/// Label map to label image conversion
#[derive(Debug, Clone, Copy)]
pub struct LabelMapToLabelImage<L>(PhantomData<L>);

impl<L> Default for LabelMapToLabelImage<L> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<L: Label> Algorithm for LabelMapToLabelImage<L> {
    type Input = LabelMap<L>;
    type Output = Raster<L>;
    type Params = ProcessingMode;
    type Error = Error;

    fn name(&self) -> &'static str {
        "LabelMapToLabelImage"
    }

    fn description(&self) -> &'static str {
        "Paint every object of a label map with its label"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        label_map_to_label_image(&input, params)
    }
}

/// Transform of the raster covering the map's region
fn region_transform<L: Label>(map: &LabelMap<L>) -> GeoTransform {
    let region = map.region();
    map.transform().shifted(region.col, region.row)
}

/// Paint the region of `map`: pixels of object `i` get `values[i]`, all
/// others `fill`. `values` follows the map's label order.
fn paint<L, T>(map: &LabelMap<L>, values: &[T], fill: T, mode: ProcessingMode) -> Result<Raster<T>>
where
    L: Label,
    T: RasterElement,
{
    let region = map.region();
    let (rows, cols) = region.shape();

    // (start col, length, object index) per region row
    let mut by_row: Vec<Vec<(usize, usize, usize)>> = vec![Vec::new(); rows];
    for (index, obj) in map.iter().enumerate() {
        for line in obj.lines() {
            if !region.contains_span(line.row, line.col, line.length) {
                return Err(Error::IndexOutOfBounds {
                    row: line.row,
                    col: line.last_col(),
                    rows: region.end_row(),
                    cols: region.end_col(),
                });
            }
            by_row[line.row - region.row].push((line.col - region.col, line.length, index));
        }
    }

    let painted = mode.par_map(0..rows, |row| {
        let mut row_data = vec![fill; cols];
        for &(col, length, index) in &by_row[row] {
            row_data[col..col + length].fill(values[index]);
        }
        row_data
    })?;

    let data: Vec<T> = painted.into_iter().flatten().collect();
    let mut raster = Raster::from_vec(data, rows, cols)?;
    raster.set_transform(region_transform(map));
    Ok(raster)
}

/// Rasterize a label map: each pixel gets the label of its object, or the
/// map's background label.
///
/// The output covers the map's region and is georeferenced accordingly.
pub fn label_map_to_label_image<L: Label>(map: &LabelMap<L>, mode: ProcessingMode) -> Result<Raster<L>> {
    let labels: Vec<L> = map.labels().collect();
    let raster = paint(map, &labels, map.background(), mode)?;
    debug!(objects = labels.len(), rows = raster.rows(), cols = raster.cols(), "rasterized label map");
    Ok(raster)
}

/// Parameters for binary rasterization
#[derive(Debug, Clone)]
pub struct BinaryRasterParams<T> {
    /// Value of pixels covered by an object (default: 1)
    pub foreground: T,
    /// Value of every other pixel (default: 0)
    pub background: T,
    pub mode: ProcessingMode,
}

impl Default for BinaryRasterParams<u8> {
    fn default() -> Self {
        Self {
            foreground: 1,
            background: 0,
            mode: ProcessingMode::default(),
        }
    }
}

/// Rasterize the union of all objects as a binary mask
pub fn label_map_to_binary_image<L, T>(map: &LabelMap<L>, params: &BinaryRasterParams<T>) -> Result<Raster<T>>
where
    L: Label,
    T: RasterElement,
{
    let values = vec![params.foreground; map.number_of_label_objects()];
    paint(map, &values, params.background, params.mode)
}

/// Paint every object with the value of one of its attributes.
///
/// Pixels outside all objects get `background_value`. An object lacking
/// the attribute fails the whole conversion.
pub fn label_map_to_attribute_image<L: Label>(
    map: &LabelMap<L>,
    attribute: &str,
    background_value: f64,
    mode: ProcessingMode,
) -> Result<Raster<f64>> {
    let values = map
        .iter()
        .map(|obj| obj.attribute(attribute))
        .collect::<Result<Vec<f64>>>()?;
    paint(map, &values, background_value, mode)
}

/// Parameters for masking an image with one object
#[derive(Debug, Clone)]
pub struct MaskParams<L, T> {
    /// Object whose pixels are kept
    pub label: L,
    /// Keep everything except the object instead
    pub negated: bool,
    /// Value written to masked-out pixels
    pub background: T,
    /// Crop the output to the object's bounding box
    pub crop: bool,
    /// Pixels added around the bounding box when cropping
    pub crop_border: usize,
    pub mode: ProcessingMode,
}

impl<L: Label, T: RasterElement> Default for MaskParams<L, T> {
    fn default() -> Self {
        Self {
            label: L::zero(),
            negated: false,
            background: T::zero(),
            crop: false,
            crop_border: 0,
            mode: ProcessingMode::default(),
        }
    }
}

/// Mask `image` with the pixels of one object of `map`.
///
/// The image must cover the map's region pixel for pixel. With `crop`, the
/// output shrinks to the object's bounding box grown by `crop_border`
/// (clamped to the region); cropping with `negated` keeps the full region.
pub fn label_map_mask_image<L, T>(
    map: &LabelMap<L>,
    image: &Raster<T>,
    params: &MaskParams<L, T>,
) -> Result<Raster<T>>
where
    L: Label,
    T: RasterElement,
{
    let region = map.region();
    image.check_shape(region.rows, region.cols)?;

    let object = map.label_object(params.label).ok();
    if object.is_none() && params.label != map.background() {
        return Err(Error::label_not_found(params.label));
    }

    // Membership raster: 1 inside the object
    let inside: Raster<u8> = match object {
        Some(obj) => paint(&single_object_map(map, obj)?, &[1u8], 0, params.mode)?,
        None => {
            // Masking by the background label keeps the uncovered pixels
            let values = vec![1u8; map.number_of_label_objects()];
            let covered = paint(map, &values, 0, params.mode)?;
            Raster::from_array(covered.data().mapv(|v| 1 - v))
        }
    };

    let (mut r0, mut c0, mut r1, mut c1) = (0, 0, region.rows, region.cols);
    if params.crop && !params.negated {
        if let Some((min_r, min_c, max_r, max_c)) = object.and_then(|obj| obj.bounding_box()) {
            let b = params.crop_border;
            r0 = (min_r - region.row).saturating_sub(b);
            c0 = (min_c - region.col).saturating_sub(b);
            r1 = (max_r - region.row + 1 + b).min(region.rows);
            c1 = (max_c - region.col + 1 + b).min(region.cols);
        }
    }

    let keep_inside = !params.negated;
    let data: Vec<T> = params.mode.par_map(r0..r1, |row| {
        (c0..c1)
            .map(|col| {
                let flag = unsafe { inside.get_unchecked(row, col) } == 1;
                if flag == keep_inside {
                    unsafe { image.get_unchecked(row, col) }
                } else {
                    params.background
                }
            })
            .collect::<Vec<T>>()
    })?
    .into_iter()
    .flatten()
    .collect();

    let mut out = Raster::from_vec(data, r1 - r0, c1 - c0)?;
    out.set_transform(image.transform().shifted(c0, r0));
    out.set_nodata(image.nodata());
    Ok(out)
}

fn single_object_map<L: Label>(map: &LabelMap<L>, obj: &LabelObject<L>) -> Result<LabelMap<L>> {
    let mut single = map.empty_like();
    single.add_label_object(obj.clone())?;
    Ok(single)
}
