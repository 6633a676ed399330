//! # obia algorithms
//!
//! Object-based image analysis on label maps.
//!
//! ## Available Algorithm Categories
//!
//! - **conversion**: Label/binary rasters to label maps, label maps back to
//!   rasters, polygon vectorization
//! - **attributes**: Shape, statistics and radiometric valuators
//! - **filters**: Attribute openings, keep-N ranking, label selection, auto-crop
//! - **imagery**: Radiometric indices (NDVI, NDWI2, GEMI, soil indices, intensity)
//! - **classification**: K-means on object attributes
//! - **pipeline**: Common labelize / valuate / filter chains

pub mod attributes;
pub mod classification;
pub mod conversion;
pub mod filters;
pub mod imagery;
pub(crate) mod maybe_rayon;
pub mod pipeline;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::attributes::{
        radiometric_attributes, shape_attributes, statistics_attributes, RadiometricParams,
        ShapeAttribute, ShapeAttributes, ShapeParams, Statistic, StatisticsParams,
    };
    pub use crate::classification::{kmeans_attributes, KmeansParams};
    pub use crate::conversion::{
        binary_image_to_label_map, label_image_to_label_map, label_map_mask_image,
        label_map_to_attribute_image, label_map_to_binary_image, label_map_to_label_image,
        label_map_to_vector_data, BinaryImageParams, BinaryRasterParams, MaskParams,
    };
    pub use crate::filters::{
        attributes_opening, auto_crop, keep_n_objects, label_selection, shape_keep_n_objects,
        shape_opening, statistics_keep_n_objects, statistics_opening, KeepNParams, OpeningParams,
    };
    pub use crate::pipeline::{
        binary_image_to_shape_label_map, label_image_to_shape_label_map,
        label_image_to_statistics_label_map,
    };
    pub use obia_core::prelude::*;
    pub use obia_parallel::ProcessingMode;
}
