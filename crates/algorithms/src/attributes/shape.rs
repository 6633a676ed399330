//! Shape attributes of label objects
//!
//! Computes size, bounding region, centroid and second-order moments of
//! each object from its runs, and optionally the perimeter and Feret
//! diameter from a rasterized copy of the map.
//!
//! Index 0 of every vector attribute is the x (column) axis, index 1 the
//! y (row) axis. Physical quantities go through the map's geotransform.

use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use obia_core::{Algorithm, Error, GeoTransform, Label, LabelMap, LabelObject, Raster, Region, Result, RunLengthLine};
use obia_parallel::{run_object_filter, ObjectFilter, ProcessingMode};
use tracing::{debug, warn};

use super::perimeter::{crofton_perimeter, feret_diameter, LabelGrid};
use crate::conversion::label_map_to_label_image;

/// Prefix shared by every shape attribute name
pub const SHAPE_PREFIX: &str = "SHAPE::";

/// Attributes written by [`shape_attributes`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeAttribute {
    /// Number of pixels
    Size,
    /// Area in physical units
    PhysicalSize,
    RegionIndex0,
    RegionIndex1,
    RegionSize0,
    RegionSize1,
    /// Ratio of the longest to the shortest side of the bounding region
    RegionElongation,
    /// Fraction of the bounding region covered by the object
    SizeRegionRatio,
    Centroid0,
    Centroid1,
    /// Number of pixels on the border of the map region
    SizeOnBorder,
    PrincipalMoments0,
    PrincipalMoments1,
    PrincipalAxes00,
    PrincipalAxes01,
    PrincipalAxes10,
    PrincipalAxes11,
    /// Square root of the ratio of the principal moments
    Elongation,
    /// Radius of the disk with the same area
    EquivalentRadius,
    /// Perimeter of the disk with the same area
    EquivalentPerimeter,
    EquivalentEllipsoidRadius0,
    EquivalentEllipsoidRadius1,
    /// Requires `compute_perimeter`
    Perimeter,
    /// Requires `compute_perimeter`
    Roundness,
    /// Requires `compute_feret_diameter`
    FeretDiameter,
}

impl ShapeAttribute {
    pub const ALL: [ShapeAttribute; 25] = [
        ShapeAttribute::Size,
        ShapeAttribute::PhysicalSize,
        ShapeAttribute::RegionIndex0,
        ShapeAttribute::RegionIndex1,
        ShapeAttribute::RegionSize0,
        ShapeAttribute::RegionSize1,
        ShapeAttribute::RegionElongation,
        ShapeAttribute::SizeRegionRatio,
        ShapeAttribute::Centroid0,
        ShapeAttribute::Centroid1,
        ShapeAttribute::SizeOnBorder,
        ShapeAttribute::PrincipalMoments0,
        ShapeAttribute::PrincipalMoments1,
        ShapeAttribute::PrincipalAxes00,
        ShapeAttribute::PrincipalAxes01,
        ShapeAttribute::PrincipalAxes10,
        ShapeAttribute::PrincipalAxes11,
        ShapeAttribute::Elongation,
        ShapeAttribute::EquivalentRadius,
        ShapeAttribute::EquivalentPerimeter,
        ShapeAttribute::EquivalentEllipsoidRadius0,
        ShapeAttribute::EquivalentEllipsoidRadius1,
        ShapeAttribute::Perimeter,
        ShapeAttribute::Roundness,
        ShapeAttribute::FeretDiameter,
    ];

    /// Full attribute name, e.g. `SHAPE::Size`
    pub fn name(&self) -> &'static str {
        match self {
            ShapeAttribute::Size => "SHAPE::Size",
            ShapeAttribute::PhysicalSize => "SHAPE::PhysicalSize",
            ShapeAttribute::RegionIndex0 => "SHAPE::RegionIndex0",
            ShapeAttribute::RegionIndex1 => "SHAPE::RegionIndex1",
            ShapeAttribute::RegionSize0 => "SHAPE::RegionSize0",
            ShapeAttribute::RegionSize1 => "SHAPE::RegionSize1",
            ShapeAttribute::RegionElongation => "SHAPE::RegionElongation",
            ShapeAttribute::SizeRegionRatio => "SHAPE::SizeRegionRatio",
            ShapeAttribute::Centroid0 => "SHAPE::Centroid0",
            ShapeAttribute::Centroid1 => "SHAPE::Centroid1",
            ShapeAttribute::SizeOnBorder => "SHAPE::SizeOnBorder",
            ShapeAttribute::PrincipalMoments0 => "SHAPE::PrincipalMoments0",
            ShapeAttribute::PrincipalMoments1 => "SHAPE::PrincipalMoments1",
            ShapeAttribute::PrincipalAxes00 => "SHAPE::PrincipalAxes00",
            ShapeAttribute::PrincipalAxes01 => "SHAPE::PrincipalAxes01",
            ShapeAttribute::PrincipalAxes10 => "SHAPE::PrincipalAxes10",
            ShapeAttribute::PrincipalAxes11 => "SHAPE::PrincipalAxes11",
            ShapeAttribute::Elongation => "SHAPE::Elongation",
            ShapeAttribute::EquivalentRadius => "SHAPE::EquivalentRadius",
            ShapeAttribute::EquivalentPerimeter => "SHAPE::EquivalentPerimeter",
            ShapeAttribute::EquivalentEllipsoidRadius0 => "SHAPE::EquivalentEllipsoidRadius0",
            ShapeAttribute::EquivalentEllipsoidRadius1 => "SHAPE::EquivalentEllipsoidRadius1",
            ShapeAttribute::Perimeter => "SHAPE::Perimeter",
            ShapeAttribute::Roundness => "SHAPE::Roundness",
            ShapeAttribute::FeretDiameter => "SHAPE::FeretDiameter",
        }
    }

    /// Resolve a name, with or without the `SHAPE::` prefix
    pub fn from_name(name: &str) -> Result<Self> {
        let bare = name.strip_prefix(SHAPE_PREFIX).unwrap_or(name);
        ShapeAttribute::ALL
            .iter()
            .copied()
            .find(|a| &a.name()[SHAPE_PREFIX.len()..] == bare)
            .ok_or_else(|| Error::UnknownAttribute(name.to_string()))
    }

    /// Value stored on an object by a previous shape run
    pub fn value<L: Label>(&self, object: &LabelObject<L>) -> Result<f64> {
        object.attribute(self.name())
    }
}

impl fmt::Display for ShapeAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ShapeAttribute {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ShapeAttribute::from_name(s)
    }
}

/// Parameters for shape attributes
#[derive(Debug, Clone, Default)]
pub struct ShapeParams {
    /// Also compute `Perimeter` and `Roundness` (default: false)
    pub compute_perimeter: bool,
    /// Also compute `FeretDiameter` (default: false)
    pub compute_feret_diameter: bool,
    pub mode: ProcessingMode,
}

impl ShapeParams {
    fn needs_label_image(&self) -> bool {
        self.compute_perimeter || self.compute_feret_diameter
    }
}

/// Shape attribute valuator
#[derive(Debug, Clone, Copy)]
pub struct ShapeAttributes<L>(PhantomData<L>);

impl<L> Default for ShapeAttributes<L> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<L: Label> Algorithm for ShapeAttributes<L> {
    type Input = LabelMap<L>;
    type Output = LabelMap<L>;
    type Params = ShapeParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "ShapeAttributes"
    }

    fn description(&self) -> &'static str {
        "Compute size, centroid, moments, perimeter and Feret diameter of each object"
    }

    fn execute(&self, mut input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        shape_attributes(&mut input, &params)?;
        Ok(input)
    }
}

/// Compute the shape attributes of every object of `map`.
///
/// When perimeter or Feret diameter are requested, the map is rasterized
/// once for the duration of the call.
pub fn shape_attributes<L: Label>(map: &mut LabelMap<L>, params: &ShapeParams) -> Result<()> {
    shape_attributes_with_label_image(map, params, None)
}

/// Like [`shape_attributes`], reusing a label image the caller already has.
///
/// The image must be the rasterization of `map` over its region; it is only
/// borrowed for this call.
pub fn shape_attributes_with_label_image<L: Label>(
    map: &mut LabelMap<L>,
    params: &ShapeParams,
    label_image: Option<&Raster<L>>,
) -> Result<()> {
    let mut filter = ShapeFilter {
        params,
        borrowed: label_image,
        built: None,
        region: map.region(),
        transform: *map.transform(),
    };
    run_object_filter(map, &mut filter, params.mode)
}

struct ShapeFilter<'a, L: Label> {
    params: &'a ShapeParams,
    borrowed: Option<&'a Raster<L>>,
    built: Option<Raster<L>>,
    region: Region,
    transform: GeoTransform,
}

impl<L: Label> ShapeFilter<'_, L> {
    fn label_grid(&self) -> Option<LabelGrid<'_, L>> {
        self.borrowed
            .or(self.built.as_ref())
            .map(|image| LabelGrid::new(image, self.region))
    }
}

impl<L: Label> ObjectFilter<L> for ShapeFilter<'_, L> {
    fn name(&self) -> &'static str {
        "shape"
    }

    fn before(&mut self, map: &LabelMap<L>) -> Result<()> {
        self.region = map.region();
        self.transform = *map.transform();
        if !self.params.needs_label_image() {
            return Ok(());
        }
        match self.borrowed {
            Some(image) => image.check_shape(self.region.rows, self.region.cols)?,
            None => {
                debug!("building label image cache for shape attributes");
                self.built = Some(label_map_to_label_image(map, self.params.mode)?);
            }
        }
        Ok(())
    }

    fn process(&self, object: &mut LabelObject<L>) -> Result<()> {
        let Some(moments) = Moments::of(object.lines()) else {
            warn!(label = %object.label(), "object has no pixels, skipping shape attributes");
            object.set_attribute(ShapeAttribute::Size.name(), 0.0);
            return Ok(());
        };
        write_shape(object, &moments, &self.region, &self.transform);

        if let Some(grid) = self.label_grid() {
            if self.params.compute_perimeter {
                let perimeter = crofton_perimeter(object, &grid, &self.transform);
                let equivalent = object.attribute(ShapeAttribute::EquivalentPerimeter.name())?;
                object.set_attribute(ShapeAttribute::Perimeter.name(), perimeter);
                let roundness = if perimeter > 0.0 { equivalent / perimeter } else { 0.0 };
                object.set_attribute(ShapeAttribute::Roundness.name(), roundness);
            }
            if self.params.compute_feret_diameter {
                let feret = feret_diameter(object, &grid, &self.transform);
                object.set_attribute(ShapeAttribute::FeretDiameter.name(), feret);
            }
        }
        Ok(())
    }

    fn after(&mut self, _map: &mut LabelMap<L>) -> Result<()> {
        self.built = None;
        Ok(())
    }
}

/// Raw pixel moments of an object, in index space relative to its
/// bounding box to keep the sums small
#[derive(Debug, Clone)]
struct Moments {
    count: usize,
    min_row: usize,
    min_col: usize,
    max_row: usize,
    max_col: usize,
    sum_x: f64,
    sum_y: f64,
    sum_xx: f64,
    sum_yy: f64,
    sum_xy: f64,
}

/// Sum of `k^2` for `k` in `0..=n`
fn sum_of_squares(n: f64) -> f64 {
    n * (n + 1.0) * (2.0 * n + 1.0) / 6.0
}

impl Moments {
    fn of(lines: &[RunLengthLine]) -> Option<Self> {
        let first = lines.first()?;
        let (mut min_row, mut min_col) = (first.row, first.col);
        let (mut max_row, mut max_col) = (first.row, first.last_col());
        for line in lines {
            min_row = min_row.min(line.row);
            max_row = max_row.max(line.row);
            min_col = min_col.min(line.col);
            max_col = max_col.max(line.last_col());
        }

        let mut m = Moments {
            count: 0,
            min_row,
            min_col,
            max_row,
            max_col,
            sum_x: 0.0,
            sum_y: 0.0,
            sum_xx: 0.0,
            sum_yy: 0.0,
            sum_xy: 0.0,
        };
        for line in lines {
            let len = line.length as f64;
            let c0 = (line.col - min_col) as f64;
            let c1 = (line.last_col() - min_col) as f64;
            let r = (line.row - min_row) as f64;
            let sum_c = len * (c0 + c1) / 2.0;
            m.count += line.length;
            m.sum_x += sum_c;
            m.sum_y += r * len;
            m.sum_xx += sum_of_squares(c1) - sum_of_squares(c0 - 1.0);
            m.sum_yy += r * r * len;
            m.sum_xy += r * sum_c;
        }
        Some(m)
    }

    /// Centroid as a fractional `(col, row)` index
    fn centroid_index(&self) -> (f64, f64) {
        let n = self.count as f64;
        (
            self.min_col as f64 + self.sum_x / n,
            self.min_row as f64 + self.sum_y / n,
        )
    }

    /// Covariance `(xx, yy, xy)` in index space, each pixel treated as a
    /// uniform unit square
    fn covariance_index(&self) -> (f64, f64, f64) {
        let n = self.count as f64;
        let (mx, my) = (self.sum_x / n, self.sum_y / n);
        (
            self.sum_xx / n - mx * mx + 1.0 / 12.0,
            self.sum_yy / n - my * my + 1.0 / 12.0,
            self.sum_xy / n - mx * my,
        )
    }
}

/// Eigen-decomposition of a symmetric 2x2 matrix `[[xx, xy], [xy, yy]]`.
///
/// Returns ascending eigenvalues and the matching unit eigenvectors.
fn symmetric_eigen(xx: f64, yy: f64, xy: f64) -> ([f64; 2], [[f64; 2]; 2]) {
    let half_trace = (xx + yy) / 2.0;
    let disc = (((xx - yy) / 2.0).powi(2) + xy * xy).sqrt();
    let values = [half_trace - disc, half_trace + disc];

    if xy.abs() <= 1e-12 * (xx.abs() + yy.abs()).max(f64::MIN_POSITIVE) {
        let axes = if xx <= yy {
            [[1.0, 0.0], [0.0, 1.0]]
        } else {
            [[0.0, 1.0], [1.0, 0.0]]
        };
        return (values, axes);
    }

    let axis = |lambda: f64| {
        let (x, y) = (lambda - yy, xy);
        let norm = x.hypot(y);
        [x / norm, y / norm]
    };
    (values, [axis(values[0]), axis(values[1])])
}

fn border_pixels(line: &RunLengthLine, region: &Region) -> usize {
    if line.row == region.row || line.row + 1 == region.end_row() {
        return line.length;
    }
    let left = line.col == region.col;
    let right = line.end() == region.end_col();
    match (left, right) {
        (true, true) if line.length == 1 => 1,
        (l, r) => usize::from(l) + usize::from(r),
    }
}

fn write_shape<L: Label>(object: &mut LabelObject<L>, m: &Moments, region: &Region, transform: &GeoTransform) {
    let n = m.count as f64;
    let physical_size = n * transform.pixel_area();

    // Bounding region
    let size0 = (m.max_col - m.min_col + 1) as f64;
    let size1 = (m.max_row - m.min_row + 1) as f64;
    let (sx, sy) = transform.spacing();
    let (ext0, ext1) = (size0 * sx, size1 * sy);
    let region_elongation = ext0.max(ext1) / ext0.min(ext1);

    let on_border: usize = object.lines().iter().map(|l| border_pixels(l, region)).sum();

    // Centroid and moments in physical space
    let (cc, cr) = m.centroid_index();
    let (centroid_x, centroid_y) = transform.index_to_geo(cc, cr);

    let (ixx, iyy, ixy) = m.covariance_index();
    let (a, b) = (transform.pixel_width, transform.row_rotation);
    let (c, d) = (transform.col_rotation, transform.pixel_height);
    let pxx = a * a * ixx + 2.0 * a * b * ixy + b * b * iyy;
    let pyy = c * c * ixx + 2.0 * c * d * ixy + d * d * iyy;
    let pxy = a * c * ixx + (a * d + b * c) * ixy + b * d * iyy;
    let (moments, axes) = symmetric_eigen(pxx, pyy, pxy);

    let elongation = if moments[0] > 0.0 {
        (moments[1] / moments[0]).sqrt()
    } else {
        1.0
    };

    let equivalent_radius = (physical_size / std::f64::consts::PI).sqrt();
    let equivalent_perimeter = 2.0 * std::f64::consts::PI * equivalent_radius;
    let edet = (moments[0] * moments[1]).sqrt();
    let ellipsoid = |pm: f64| {
        if edet > 0.0 {
            equivalent_radius * (pm / edet).sqrt()
        } else {
            0.0
        }
    };

    let values = [
        (ShapeAttribute::Size, n),
        (ShapeAttribute::PhysicalSize, physical_size),
        (ShapeAttribute::RegionIndex0, m.min_col as f64),
        (ShapeAttribute::RegionIndex1, m.min_row as f64),
        (ShapeAttribute::RegionSize0, size0),
        (ShapeAttribute::RegionSize1, size1),
        (ShapeAttribute::RegionElongation, region_elongation),
        (ShapeAttribute::SizeRegionRatio, n / (size0 * size1)),
        (ShapeAttribute::Centroid0, centroid_x),
        (ShapeAttribute::Centroid1, centroid_y),
        (ShapeAttribute::SizeOnBorder, on_border as f64),
        (ShapeAttribute::PrincipalMoments0, moments[0]),
        (ShapeAttribute::PrincipalMoments1, moments[1]),
        (ShapeAttribute::PrincipalAxes00, axes[0][0]),
        (ShapeAttribute::PrincipalAxes01, axes[0][1]),
        (ShapeAttribute::PrincipalAxes10, axes[1][0]),
        (ShapeAttribute::PrincipalAxes11, axes[1][1]),
        (ShapeAttribute::Elongation, elongation),
        (ShapeAttribute::EquivalentRadius, equivalent_radius),
        (ShapeAttribute::EquivalentPerimeter, equivalent_perimeter),
        (ShapeAttribute::EquivalentEllipsoidRadius0, ellipsoid(moments[0])),
        (ShapeAttribute::EquivalentEllipsoidRadius1, ellipsoid(moments[1])),
    ];
    for (attribute, value) in values {
        object.set_attribute(attribute.name(), value);
    }
}
