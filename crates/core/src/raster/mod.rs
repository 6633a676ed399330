//! Raster data structures and operations

mod element;
mod geotransform;
mod grid;

pub use element::{Label, RasterElement};
pub use geotransform::GeoTransform;
pub use grid::Raster;
