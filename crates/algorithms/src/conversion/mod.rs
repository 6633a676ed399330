//! Conversions between rasters, label maps and vector features
//!
//! - Labelizers: label or binary raster to label map
//! - Rasterizers: label map to label, binary, attribute or masked raster
//! - Vectorization: label map to polygon features

mod labelize;
mod rasterize;
mod vectorize;

pub use labelize::{
    binary_image_to_label_map, label_image_to_label_map, BinaryImageParams, BinaryImageToLabelMap,
    LabelImageParams, LabelImageToLabelMap,
};
pub use rasterize::{
    label_map_mask_image, label_map_to_attribute_image, label_map_to_binary_image,
    label_map_to_label_image, BinaryRasterParams, LabelMapToLabelImage, MaskParams,
};
pub use vectorize::{label_map_to_vector_data, LabelMapToVectorData};
