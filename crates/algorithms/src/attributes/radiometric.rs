//! Radiometric attributes of label objects
//!
//! Derives radiometric index rasters from a multi-band image and runs the
//! statistics valuator on each of them and on every original band.

use obia_core::{Error, Label, LabelMap, Raster, Result};
use obia_parallel::ProcessingMode;
use tracing::debug;

use super::statistics::{statistics_attributes, StatisticsParams};
use crate::imagery::{brightness_index, color_index, gemi, intensity, ndvi, ndwi2, redness_index, RadiometricIndex};

/// Parameters for radiometric attributes.
///
/// Band indices are zero-based positions in the band slice; the defaults
/// assume a standard B, G, R, NIR image.
#[derive(Debug, Clone)]
pub struct RadiometricParams {
    pub blue_index: usize,
    pub green_index: usize,
    pub red_index: usize,
    pub nir_index: usize,
    /// Only compute `Mean` and `Variance` per feature (default: false)
    pub reduced_attribute_set: bool,
    pub mode: ProcessingMode,
}

impl Default for RadiometricParams {
    fn default() -> Self {
        Self {
            blue_index: 0,
            green_index: 1,
            red_index: 2,
            nir_index: 3,
            reduced_attribute_set: false,
            mode: ProcessingMode::default(),
        }
    }
}

/// Compute the named radiometric feature rasters of a multi-band image.
///
/// Returns `(feature name, raster)` pairs: every index of
/// [`RadiometricIndex::ALL`] followed by the original bands as `Band1`,
/// `Band2`, and so on.
pub fn radiometric_features(bands: &[Raster<f64>], params: &RadiometricParams) -> Result<Vec<(String, Raster<f64>)>> {
    let band = |index: usize, name: &'static str| {
        bands.get(index).ok_or_else(|| Error::InvalidParameter {
            name,
            value: index.to_string(),
            reason: format!("image has {} bands", bands.len()),
        })
    };
    // Blue only matters for the band checks
    band(params.blue_index, "blue_index")?;
    let green = band(params.green_index, "green_index")?;
    let red = band(params.red_index, "red_index")?;
    let nir = band(params.nir_index, "nir_index")?;

    let all: Vec<&Raster<f64>> = bands.iter().collect();
    let mut features = Vec::with_capacity(RadiometricIndex::ALL.len() + bands.len());
    for index in RadiometricIndex::ALL {
        let raster = match index {
            RadiometricIndex::Ndvi => ndvi(nir, red)?,
            RadiometricIndex::Ndwi2 => ndwi2(green, nir)?,
            RadiometricIndex::Gemi => gemi(red, nir)?,
            RadiometricIndex::Ir => redness_index(red, green)?,
            RadiometricIndex::Ic => color_index(red, green)?,
            RadiometricIndex::Ib => brightness_index(red, green)?,
            RadiometricIndex::Intensity => intensity(&all)?,
        };
        features.push((index.feature_name().to_string(), raster));
    }
    for (i, band) in bands.iter().enumerate() {
        features.push((format!("Band{}", i + 1), band.clone()));
    }
    Ok(features)
}

/// Attach statistics of every radiometric feature to the objects of `map`
pub fn radiometric_attributes<L: Label>(
    map: &mut LabelMap<L>,
    bands: &[Raster<f64>],
    params: &RadiometricParams,
) -> Result<()> {
    let features = radiometric_features(bands, params)?;
    debug!(features = features.len(), objects = map.number_of_label_objects(), "radiometric attributes");

    for (name, raster) in &features {
        let stats = StatisticsParams {
            feature_name: name.clone(),
            reduced_attribute_set: params.reduced_attribute_set,
            mode: params.mode,
        };
        statistics_attributes(map, raster, &stats)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn image() -> Vec<Raster<f64>> {
        // B, G, R, NIR on a 2x2 grid
        [0.1, 0.2, 0.3, 0.9]
            .iter()
            .map(|&v| Raster::filled(2, 2, v))
            .collect()
    }

    #[test]
    fn test_radiometric_attributes() {
        let mut map = LabelMap::new(2, 2, 0u8);
        map.set_line(0, 0, 2, 1).unwrap();

        radiometric_attributes(&mut map, &image(), &RadiometricParams::default()).unwrap();
        let obj = map.label_object(1).unwrap();
        assert_relative_eq!(obj.attribute("STATS::Ndvi::Mean").unwrap(), 0.5, epsilon = 1e-12);
        assert_relative_eq!(obj.attribute("STATS::Intensity::Mean").unwrap(), 0.375, epsilon = 1e-12);
        assert_relative_eq!(obj.attribute("STATS::Band4::Maximum").unwrap(), 0.9);
        assert!(obj.attribute("STATS::Gemi::Mean").is_ok());
        assert_eq!(obj.attribute("STATS::Ndwi2::Count").unwrap(), 2.0);
    }

    #[test]
    fn test_custom_channels() {
        let params = RadiometricParams {
            red_index: 3,
            nir_index: 2,
            ..Default::default()
        };
        let features = radiometric_features(&image(), &params).unwrap();
        let (name, ndvi) = &features[0];
        assert_eq!(name, "Ndvi");
        assert_relative_eq!(ndvi.get(0, 0).unwrap(), -0.5, epsilon = 1e-12);
        assert_eq!(features.len(), RadiometricIndex::ALL.len() + 4);
    }

    #[test]
    fn test_missing_band() {
        let params = RadiometricParams {
            nir_index: 7,
            ..Default::default()
        };
        assert!(matches!(
            radiometric_features(&image(), &params),
            Err(Error::InvalidParameter { name: "nir_index", .. })
        ));
    }
}
