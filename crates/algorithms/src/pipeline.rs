//! Ready-made chains of labelizer, valuators and filters
//!
//! Each function runs a common sequence end to end: labelize, attach
//! attributes, optionally prune, and (for the image variants) rasterize
//! the result again.

use obia_core::{Label, LabelMap, Raster, RasterElement, Result};
use tracing::debug;

use crate::attributes::{
    shape_attributes, shape_attributes_with_label_image, statistics_attributes, ShapeAttribute,
    ShapeParams, StatisticsParams,
};
use crate::conversion::{
    binary_image_to_label_map, label_image_to_label_map, label_map_to_binary_image,
    label_map_to_label_image, BinaryImageParams, BinaryRasterParams,
};
use crate::filters::{shape_keep_n_objects, shape_opening};

/// Labelize `image` and compute shape attributes, reusing the image as
/// the label-image cache when its nodata cannot hide objects
fn shaped_label_map<L: Label>(image: &Raster<L>, background: L, shape: &ShapeParams) -> Result<LabelMap<L>> {
    let mut map = label_image_to_label_map(image, background)?;
    let cache_usable = image.nodata().map_or(true, |nodata| nodata == background);
    if cache_usable {
        shape_attributes_with_label_image(&mut map, shape, Some(image))?;
    } else {
        shape_attributes(&mut map, shape)?;
    }
    Ok(map)
}

/// Connected components of a binary raster, with shape attributes
pub fn binary_image_to_shape_label_map<T, L>(
    image: &Raster<T>,
    binary: &BinaryImageParams,
    shape: &ShapeParams,
) -> Result<LabelMap<L>>
where
    T: RasterElement,
    L: Label,
{
    let mut map = binary_image_to_label_map(image, binary)?;
    shape_attributes(&mut map, shape)?;
    debug!(objects = map.number_of_label_objects(), "binary image to shape label map");
    Ok(map)
}

/// Objects of a label raster, with shape attributes
pub fn label_image_to_shape_label_map<L: Label>(
    image: &Raster<L>,
    background: L,
    shape: &ShapeParams,
) -> Result<LabelMap<L>> {
    shaped_label_map(image, background, shape)
}

/// Objects of a label raster with shape attributes and statistics of
/// `feature` under each object
pub fn label_image_to_statistics_label_map<L, T>(
    image: &Raster<L>,
    feature: &Raster<T>,
    background: L,
    shape: &ShapeParams,
    statistics: &StatisticsParams,
) -> Result<LabelMap<L>>
where
    L: Label,
    T: RasterElement,
{
    let mut map = shaped_label_map(image, background, shape)?;
    statistics_attributes(&mut map, feature, statistics)?;
    debug!(
        objects = map.number_of_label_objects(),
        feature = %statistics.feature_name,
        "label image to statistics label map"
    );
    Ok(map)
}

/// Remove from a label raster the objects whose shape attribute is below
/// `lambda` (at or above when `reverse_ordering`).
pub fn label_shape_opening_image<L: Label>(
    image: &Raster<L>,
    background: L,
    attribute: ShapeAttribute,
    lambda: f64,
    reverse_ordering: bool,
    shape: &ShapeParams,
) -> Result<Raster<L>> {
    let mut map = shaped_label_map(image, background, shape)?;
    shape_opening(&mut map, attribute, lambda, reverse_ordering)?;
    label_map_to_label_image(&map, shape.mode)
}

/// Keep the `n` connected components of a binary raster ranking first on
/// a shape attribute; everything else becomes background.
pub fn binary_shape_keep_n_objects_image<T: RasterElement>(
    image: &Raster<T>,
    binary: &BinaryImageParams,
    attribute: ShapeAttribute,
    n: usize,
    reverse_ordering: bool,
    shape: &ShapeParams,
    output: &BinaryRasterParams<T>,
) -> Result<Raster<T>> {
    let mut map: LabelMap<u32> = binary_image_to_shape_label_map(image, binary, shape)?;
    shape_keep_n_objects(&mut map, attribute, n, reverse_ordering)?;
    label_map_to_binary_image(&map, output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use obia_core::GeoTransform;

    fn two_blobs() -> Raster<u8> {
        let mut image = Raster::new(6, 6);
        for (row, col) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
            image.set(row, col, 1).unwrap();
        }
        image.set(4, 4, 1).unwrap();
        image.set_transform(GeoTransform::pixel_grid());
        image
    }

    #[test]
    fn test_binary_to_shape_label_map() {
        let map: LabelMap<u16> =
            binary_image_to_shape_label_map(&two_blobs(), &BinaryImageParams::default(), &ShapeParams::default())
                .unwrap();
        assert_eq!(map.number_of_label_objects(), 2);
        assert_relative_eq!(map.label_object(1).unwrap().attribute("SHAPE::Size").unwrap(), 4.0);
        assert_relative_eq!(map.label_object(2).unwrap().attribute("SHAPE::Centroid0").unwrap(), 4.0);
    }

    #[test]
    fn test_statistics_label_map() {
        let mut labels: Raster<u8> = Raster::new(2, 3);
        labels.set(0, 0, 1).unwrap();
        labels.set(0, 1, 1).unwrap();
        labels.set(1, 2, 2).unwrap();
        let feature = Raster::from_vec(vec![1.0, 3.0, 0.0, 0.0, 0.0, 8.0], 2, 3).unwrap();

        let map = label_image_to_statistics_label_map(
            &labels,
            &feature,
            0,
            &ShapeParams::default(),
            &StatisticsParams::for_feature("Band1"),
        )
        .unwrap();
        let one = map.label_object(1).unwrap();
        assert_relative_eq!(one.attribute("STATS::Band1::Mean").unwrap(), 2.0);
        assert_relative_eq!(one.attribute("SHAPE::Size").unwrap(), 2.0);
        assert_relative_eq!(map.label_object(2).unwrap().attribute("STATS::Band1::Maximum").unwrap(), 8.0);
    }

    #[test]
    fn test_label_shape_opening_image() {
        let mut image: Raster<u8> = Raster::new(3, 4);
        image.set(0, 0, 5).unwrap();
        for col in 1..4 {
            image.set(2, col, 9).unwrap();
        }
        let opened =
            label_shape_opening_image(&image, 0, ShapeAttribute::Size, 2.0, false, &ShapeParams::default()).unwrap();
        assert_eq!(opened.get(0, 0).unwrap(), 0);
        assert_eq!(opened.get(2, 3).unwrap(), 9);
    }

    #[test]
    fn test_binary_keep_largest() {
        let kept = binary_shape_keep_n_objects_image(
            &two_blobs(),
            &BinaryImageParams::default(),
            ShapeAttribute::Size,
            1,
            false,
            &ShapeParams::default(),
            &BinaryRasterParams::default(),
        )
        .unwrap();
        assert_eq!(kept.get(1, 1).unwrap(), 1);
        assert_eq!(kept.get(4, 4).unwrap(), 0);
    }
}
