//! Perimeter and Feret diameter estimation on a rasterized label map

use geo::{ConvexHull, Coord, MultiPoint, Point};
use obia_core::{GeoTransform, Label, LabelObject, Raster, Region};

/// Read-only view of a label raster covering a map region
#[derive(Debug, Clone, Copy)]
pub(crate) struct LabelGrid<'a, L: Label> {
    image: &'a Raster<L>,
    region: Region,
}

impl<'a, L: Label> LabelGrid<'a, L> {
    pub(crate) fn new(image: &'a Raster<L>, region: Region) -> Self {
        Self { image, region }
    }

    /// Whether the pixel `(row + dr, col + dc)` carries `label`.
    /// Pixels outside the region never do.
    fn has_label(&self, row: usize, col: usize, dr: isize, dc: isize, label: L) -> bool {
        let (Some(r), Some(c)) = (row.checked_add_signed(dr), col.checked_add_signed(dc)) else {
            return false;
        };
        if !self.region.contains(r, c) {
            return false;
        }
        unsafe { self.image.get_unchecked(r - self.region.row, c - self.region.col) == label }
    }

    /// Whether one of the four face neighbours lies outside the object
    pub(crate) fn is_boundary(&self, row: usize, col: usize, label: L) -> bool {
        FACE_NEIGHBOURS
            .iter()
            .any(|&(dr, dc)| !self.has_label(row, col, dr, dc, label))
    }
}

const FACE_NEIGHBOURS: [(isize, isize); 4] = [(-1, 0), (0, -1), (0, 1), (1, 0)];

/// Neighbour offsets grouped by sampling direction: horizontal, vertical,
/// diagonal and anti-diagonal lines.
const DIRECTIONS: [[(isize, isize); 2]; 4] = [
    [(0, -1), (0, 1)],
    [(-1, 0), (1, 0)],
    [(-1, -1), (1, 1)],
    [(-1, 1), (1, -1)],
];

/// Cauchy-Crofton perimeter estimate over four line directions.
///
/// For each direction, the object is intersected by the family of pixel
/// lines running that way; every object pixel whose neighbour along the
/// line is outside the object counts one intersection. With `N_d`
/// intersections and line spacing `s_d`, the perimeter is
/// `pi / 8 * sum(N_d * s_d)`.
pub(crate) fn crofton_perimeter<L: Label>(
    object: &LabelObject<L>,
    grid: &LabelGrid<'_, L>,
    transform: &GeoTransform,
) -> f64 {
    let label = object.label();
    let mut counts = [0usize; 4];
    for (row, col) in object.pixels() {
        for (d, offsets) in DIRECTIONS.iter().enumerate() {
            for &(dr, dc) in offsets {
                if !grid.has_label(row, col, dr, dc, label) {
                    counts[d] += 1;
                }
            }
        }
    }

    let spacings = line_spacings(transform);
    let weighted: f64 = counts
        .iter()
        .zip(spacings.iter())
        .map(|(&n, &s)| n as f64 * s)
        .sum();
    std::f64::consts::PI / 8.0 * weighted
}

/// Distance between neighbouring parallel pixel lines, per direction.
///
/// Lines along the lattice vector `v` are `pixel_area / |v|` apart.
fn line_spacings(transform: &GeoTransform) -> [f64; 4] {
    let area = transform.pixel_area();
    let step = |dc: f64, dr: f64| {
        let x = dc * transform.pixel_width + dr * transform.row_rotation;
        let y = dc * transform.col_rotation + dr * transform.pixel_height;
        x.hypot(y)
    };
    [
        area / step(1.0, 0.0),
        area / step(0.0, 1.0),
        area / step(1.0, 1.0),
        area / step(1.0, -1.0),
    ]
}

/// Largest distance between the centres of two boundary pixels
pub(crate) fn feret_diameter<L: Label>(
    object: &LabelObject<L>,
    grid: &LabelGrid<'_, L>,
    transform: &GeoTransform,
) -> f64 {
    let label = object.label();
    let points: Vec<Point<f64>> = object
        .pixels()
        .filter(|&(row, col)| grid.is_boundary(row, col, label))
        .map(|(row, col)| Point::from(transform.pixel_to_geo(col, row)))
        .collect();

    if points.len() < 2 {
        return 0.0;
    }

    let hull = MultiPoint::from(points).convex_hull();
    let vertices: Vec<Coord<f64>> = hull.exterior().coords().copied().collect();
    max_pairwise_distance(&vertices)
}

fn max_pairwise_distance(coords: &[Coord<f64>]) -> f64 {
    let mut best = 0.0_f64;
    for (i, a) in coords.iter().enumerate() {
        for b in &coords[i + 1..] {
            best = best.max((a.x - b.x).hypot(a.y - b.y));
        }
    }
    best
}
