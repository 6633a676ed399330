//! Attribute valuators
//!
//! Valuators attach named attributes to label objects without changing
//! which pixels they own:
//! - Shape: size, bounding region, centroid, moments, perimeter, Feret diameter
//! - Statistics: per-object statistics of a feature raster
//! - Radiometric: statistics of radiometric indices of a multi-band image

mod perimeter;
mod radiometric;
mod shape;
mod statistics;

pub use radiometric::{radiometric_attributes, radiometric_features, RadiometricParams};
pub use shape::{
    shape_attributes, shape_attributes_with_label_image, ShapeAttribute, ShapeAttributes,
    ShapeParams, SHAPE_PREFIX,
};
pub use statistics::{statistics_attributes, Statistic, StatisticsParams, STATS_PREFIX};
