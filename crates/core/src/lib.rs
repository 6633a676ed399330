//! # obia core
//!
//! Core types for object-based image analysis on georeferenced rasters.
//!
//! This crate provides:
//! - `Raster<T>`: Generic 2-D raster grid
//! - `GeoTransform`: Affine transformation for georeferencing
//! - `LabelMap<L>`: run-length encoded collection of labeled objects
//! - `LabelObject<L>`: one connected region with its named attributes
//! - `FeatureCollection`: polygon features produced by vectorization
//! - The `Algorithm` trait implemented by every filter

pub mod error;
pub mod labelmap;
pub mod raster;
pub mod vector;

pub use error::{Error, Result};
pub use labelmap::{AttributesMap, LabelMap, LabelObject, Region, RunLengthLine};
pub use raster::{GeoTransform, Label, Raster, RasterElement};
pub use vector::{AttributeValue, Feature, FeatureCollection};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::labelmap::{AttributesMap, LabelMap, LabelObject, Region, RunLengthLine};
    pub use crate::raster::{GeoTransform, Label, Raster, RasterElement};
    pub use crate::vector::{AttributeValue, Feature, FeatureCollection};
    pub use crate::Algorithm;
}

/// Core trait for all filters in obia.
///
/// Filters consume an input (usually a `LabelMap`) and produce an output
/// according to their parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
