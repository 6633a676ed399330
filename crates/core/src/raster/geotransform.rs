//! Affine geotransformation for rasters and label maps

use serde::{Deserialize, Serialize};

/// Affine transformation coefficients for georeferencing rasters.
///
/// Converts between pixel coordinates (col, row) and geographic coordinates (x, y):
/// ```text
/// x = origin_x + col * pixel_width + row * row_rotation
/// y = origin_y + col * col_rotation + row * pixel_height
/// ```
///
/// `(col, row)` here addresses pixel corners; pixel `(c, r)` covers
/// `[c, c + 1) x [r, r + 1)` and its centre sits at `(c + 0.5, r + 0.5)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// X coordinate of the upper-left corner
    pub origin_x: f64,
    /// Y coordinate of the upper-left corner
    pub origin_y: f64,
    /// Pixel width (cell size in X direction)
    pub pixel_width: f64,
    /// Pixel height (cell size in Y direction, usually negative)
    pub pixel_height: f64,
    /// Rotation about X axis (usually 0)
    pub row_rotation: f64,
    /// Rotation about Y axis (usually 0)
    pub col_rotation: f64,
}

impl GeoTransform {
    /// Create a new GeoTransform with no rotation (north-up image)
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
            row_rotation: 0.0,
            col_rotation: 0.0,
        }
    }

    /// Index-space transform: the centre of pixel `(row, col)` maps to
    /// `(x = col, y = row)`.
    pub fn pixel_grid() -> Self {
        Self::new(-0.5, -0.5, 1.0, 1.0)
    }

    /// Map a fractional corner coordinate to geographic coordinates
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        let x = self.origin_x + col * self.pixel_width + row * self.row_rotation;
        let y = self.origin_y + col * self.col_rotation + row * self.pixel_height;
        (x, y)
    }

    /// Convert pixel coordinates to geographic coordinates
    ///
    /// Returns the coordinates of the pixel center
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        self.index_to_geo(col as f64, row as f64)
    }

    /// Convert a fractional pixel index (e.g. a centroid) to the geographic
    /// position of that index's centre
    pub fn index_to_geo(&self, col: f64, row: f64) -> (f64, f64) {
        self.apply(col + 0.5, row + 0.5)
    }

    /// Convert pixel coordinates to geographic coordinates (top-left corner)
    pub fn pixel_to_geo_corner(&self, col: usize, row: usize) -> (f64, f64) {
        self.apply(col as f64, row as f64)
    }

    /// Transform of a sub-grid whose first pixel is `(col, row)` of this grid
    pub fn shifted(&self, col: usize, row: usize) -> GeoTransform {
        let (origin_x, origin_y) = self.pixel_to_geo_corner(col, row);
        GeoTransform {
            origin_x,
            origin_y,
            ..*self
        }
    }

    /// Determinant of the linear part; its sign tells whether the transform
    /// mirrors the pixel grid
    pub fn determinant(&self) -> f64 {
        self.pixel_width * self.pixel_height - self.row_rotation * self.col_rotation
    }

    /// Ground area covered by one pixel
    pub fn pixel_area(&self) -> f64 {
        self.determinant().abs()
    }

    /// Physical length of one step along the columns (x) and rows (y)
    pub fn spacing(&self) -> (f64, f64) {
        (
            self.pixel_width.hypot(self.col_rotation),
            self.row_rotation.hypot(self.pixel_height),
        )
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}
