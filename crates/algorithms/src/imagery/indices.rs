//! Radiometric indices
//!
//! Pixel-wise indices computed from single-band rasters (one band per
//! raster), used as features by the radiometric valuator. Pixels where an
//! input is nodata, or where an index is undefined, are NaN.

use crate::maybe_rayon::*;
use obia_core::raster::Raster;
use obia_core::{Error, Result};

/// Radiometric indices available to the radiometric valuator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RadiometricIndex {
    /// Normalized Difference Vegetation Index
    Ndvi,
    /// Normalized Difference Water Index (McFeeters)
    Ndwi2,
    /// Global Environment Monitoring Index
    Gemi,
    /// Redness index
    Ir,
    /// Colour index
    Ic,
    /// Brightness index
    Ib,
    /// Mean of all bands
    Intensity,
}

impl RadiometricIndex {
    pub const ALL: [RadiometricIndex; 7] = [
        RadiometricIndex::Ndvi,
        RadiometricIndex::Ndwi2,
        RadiometricIndex::Gemi,
        RadiometricIndex::Ir,
        RadiometricIndex::Ic,
        RadiometricIndex::Ib,
        RadiometricIndex::Intensity,
    ];

    /// Feature name used in statistics attribute names
    pub fn feature_name(&self) -> &'static str {
        match self {
            RadiometricIndex::Ndvi => "Ndvi",
            RadiometricIndex::Ndwi2 => "Ndwi2",
            RadiometricIndex::Gemi => "Gemi",
            RadiometricIndex::Ir => "Ir",
            RadiometricIndex::Ic => "Ic",
            RadiometricIndex::Ib => "Ib",
            RadiometricIndex::Intensity => "Intensity",
        }
    }
}

// ---------------------------------------------------------------------------
// Generic pixel-wise combination
// ---------------------------------------------------------------------------

/// Apply `f` to the values of every band at each pixel.
///
/// All bands must share the shape of the first one; the output takes its
/// metadata from the first band.
pub fn combine_bands<F>(bands: &[&Raster<f64>], f: F) -> Result<Raster<f64>>
where
    F: Fn(&[f64]) -> f64 + Sync + Send,
{
    let first = bands
        .first()
        .ok_or_else(|| Error::Algorithm("at least one band is required".into()))?;
    for band in &bands[1..] {
        check_dimensions(first, band)?;
    }

    let (rows, cols) = first.shape();
    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            let mut values = vec![0.0; bands.len()];
            for col in 0..cols {
                let mut valid = true;
                for (value, band) in values.iter_mut().zip(bands) {
                    *value = unsafe { band.get_unchecked(row, col) };
                    if is_nodata_f64(*value, band.nodata()) {
                        valid = false;
                        break;
                    }
                }
                if valid {
                    let v = f(&values);
                    row_data[col] = if v.is_finite() { v } else { f64::NAN };
                }
            }
            row_data
        })
        .collect();

    build_output(first, rows, cols, data)
}

/// Compute the normalized difference between two bands:
///
/// `(band_a - band_b) / (band_a + band_b)`
///
/// Result is in the range [-1, 1]. Pixels where both bands are zero
/// or either is nodata are set to NaN.
pub fn normalized_difference(band_a: &Raster<f64>, band_b: &Raster<f64>) -> Result<Raster<f64>> {
    combine_bands(&[band_a, band_b], |v| {
        let sum = v[0] + v[1];
        if sum.abs() < 1e-10 {
            f64::NAN
        } else {
            (v[0] - v[1]) / sum
        }
    })
}

/// Normalized Difference Vegetation Index
///
/// `NDVI = (NIR - Red) / (NIR + Red)`
pub fn ndvi(nir: &Raster<f64>, red: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(nir, red)
}

/// Normalized Difference Water Index (McFeeters, 1996)
///
/// `NDWI2 = (Green - NIR) / (Green + NIR)`
pub fn ndwi2(green: &Raster<f64>, nir: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(green, nir)
}

/// Global Environment Monitoring Index (Pinty & Verstraete, 1992)
///
/// ```text
/// eta  = (2 (NIR² - Red²) + 1.5 NIR + 0.5 Red) / (NIR + Red + 0.5)
/// GEMI = eta (1 - 0.25 eta) - (Red - 0.125) / (1 - Red)
/// ```
pub fn gemi(red: &Raster<f64>, nir: &Raster<f64>) -> Result<Raster<f64>> {
    combine_bands(&[red, nir], |v| {
        let (r, n) = (v[0], v[1]);
        let denom = n + r + 0.5;
        if denom.abs() < 1e-10 || (1.0 - r).abs() < 1e-10 {
            return f64::NAN;
        }
        let eta = (2.0 * (n * n - r * r) + 1.5 * n + 0.5 * r) / denom;
        eta * (1.0 - 0.25 * eta) - (r - 0.125) / (1.0 - r)
    })
}

/// Redness index
///
/// `IR = Red² / Green³`
pub fn redness_index(red: &Raster<f64>, green: &Raster<f64>) -> Result<Raster<f64>> {
    combine_bands(&[red, green], |v| {
        let g3 = v[1] * v[1] * v[1];
        if g3.abs() < 1e-10 {
            f64::NAN
        } else {
            v[0] * v[0] / g3
        }
    })
}

/// Colour index
///
/// `IC = (Red - Green) / (Red + Green)`
pub fn color_index(red: &Raster<f64>, green: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(red, green)
}

/// Brightness index
///
/// `IB = sqrt((Red² + Green²) / 2)`
pub fn brightness_index(red: &Raster<f64>, green: &Raster<f64>) -> Result<Raster<f64>> {
    combine_bands(&[red, green], |v| ((v[0] * v[0] + v[1] * v[1]) / 2.0).sqrt())
}

/// Mean of all bands at each pixel
pub fn intensity(bands: &[&Raster<f64>]) -> Result<Raster<f64>> {
    combine_bands(bands, |v| v.iter().sum::<f64>() / v.len() as f64)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn is_nodata_f64(value: f64, nodata: Option<f64>) -> bool {
    if value.is_nan() {
        return true;
    }
    match nodata {
        Some(nd) => (value - nd).abs() < f64::EPSILON,
        None => false,
    }
}

fn check_dimensions(a: &Raster<f64>, b: &Raster<f64>) -> Result<()> {
    if a.shape() != b.shape() {
        return Err(Error::SizeMismatch {
            er: a.rows(),
            ec: a.cols(),
            ar: b.rows(),
            ac: b.cols(),
        });
    }
    Ok(())
}

fn build_output(template: &Raster<f64>, rows: usize, cols: usize, data: Vec<f64>) -> Result<Raster<f64>> {
    let mut output = Raster::from_vec(data, rows, cols)?;
    output.set_transform(*template.transform());
    output.set_nodata(Some(f64::NAN));
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn band(values: &[f64]) -> Raster<f64> {
        Raster::from_vec(values.to_vec(), 1, values.len()).unwrap()
    }

    #[test]
    fn test_ndvi() {
        let nir = band(&[0.8, 0.0, 0.3]);
        let red = band(&[0.2, 0.0, f64::NAN]);
        let out = ndvi(&nir, &red).unwrap();
        assert_relative_eq!(out.get(0, 0).unwrap(), 0.6, epsilon = 1e-12);
        assert!(out.get(0, 1).unwrap().is_nan());
        assert!(out.get(0, 2).unwrap().is_nan());
    }

    #[test]
    fn test_gemi() {
        let out = gemi(&band(&[0.1]), &band(&[0.5])).unwrap();
        let eta = (2.0 * (0.25 - 0.01) + 0.75 + 0.05) / 1.1;
        let expected = eta * (1.0 - 0.25 * eta) - (0.1 - 0.125) / 0.9;
        assert_relative_eq!(out.get(0, 0).unwrap(), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_soil_indices() {
        let red = band(&[4.0]);
        let green = band(&[2.0]);
        assert_relative_eq!(redness_index(&red, &green).unwrap().get(0, 0).unwrap(), 2.0);
        assert_relative_eq!(color_index(&red, &green).unwrap().get(0, 0).unwrap(), 1.0 / 3.0);
        assert_relative_eq!(brightness_index(&red, &green).unwrap().get(0, 0).unwrap(), 10.0f64.sqrt());
    }

    #[test]
    fn test_intensity() {
        let out = intensity(&[&band(&[1.0, 2.0]), &band(&[3.0, 4.0]), &band(&[5.0, 9.0])]).unwrap();
        assert_relative_eq!(out.get(0, 0).unwrap(), 3.0);
        assert_relative_eq!(out.get(0, 1).unwrap(), 5.0);
    }

    #[test]
    fn test_nodata_handling() {
        let mut a = band(&[1.0, -1.0]);
        a.set_nodata(Some(-1.0));
        let out = normalized_difference(&a, &band(&[1.0, 1.0])).unwrap();
        assert_relative_eq!(out.get(0, 0).unwrap(), 0.0);
        assert!(out.get(0, 1).unwrap().is_nan());
    }

    #[test]
    fn test_dimension_mismatch() {
        let result = ndvi(&band(&[1.0, 2.0]), &band(&[1.0]));
        assert!(matches!(result, Err(Error::SizeMismatch { .. })));
        assert!(intensity(&[]).is_err());
    }
}
