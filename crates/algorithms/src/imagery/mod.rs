//! Imagery algorithms
//!
//! Radiometric indices computed from single-band rasters:
//! - Vegetation and water: NDVI, NDWI2, GEMI
//! - Soil: redness (IR), colour (IC) and brightness (IB) indices
//! - Intensity: mean of all bands

mod indices;

pub use indices::{
    brightness_index, color_index, combine_bands, gemi, intensity, ndvi, ndwi2,
    normalized_difference, redness_index, RadiometricIndex,
};
