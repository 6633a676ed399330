//! Statistics attributes of label objects
//!
//! Samples a feature raster under each object and stores per-object
//! statistics as `STATS::<feature>::<statistic>` attributes. NaN and
//! nodata feature values are skipped.

use std::fmt;
use std::str::FromStr;

use obia_core::{Error, GeoTransform, Label, LabelMap, LabelObject, Raster, RasterElement, Region, Result};
use obia_parallel::{run_object_filter, ObjectFilter, ProcessingMode};
use tracing::trace;

/// Prefix shared by every statistics attribute name
pub const STATS_PREFIX: &str = "STATS::";

/// Statistics written per feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Statistic {
    Mean,
    Sum,
    Variance,
    Sigma,
    Minimum,
    Maximum,
    Median,
    Skewness,
    Kurtosis,
    /// Number of valid samples
    Count,
    /// Value-weighted centroid, x coordinate
    CenterOfGravity0,
    /// Value-weighted centroid, y coordinate
    CenterOfGravity1,
}

impl Statistic {
    pub const ALL: [Statistic; 12] = [
        Statistic::Mean,
        Statistic::Sum,
        Statistic::Variance,
        Statistic::Sigma,
        Statistic::Minimum,
        Statistic::Maximum,
        Statistic::Median,
        Statistic::Skewness,
        Statistic::Kurtosis,
        Statistic::Count,
        Statistic::CenterOfGravity0,
        Statistic::CenterOfGravity1,
    ];

    /// Name of the statistic inside an attribute name, e.g. `Mean`
    pub fn key(&self) -> &'static str {
        match self {
            Statistic::Mean => "Mean",
            Statistic::Sum => "Sum",
            Statistic::Variance => "Variance",
            Statistic::Sigma => "Sigma",
            Statistic::Minimum => "Minimum",
            Statistic::Maximum => "Maximum",
            Statistic::Median => "Median",
            Statistic::Skewness => "Skewness",
            Statistic::Kurtosis => "Kurtosis",
            Statistic::Count => "Count",
            Statistic::CenterOfGravity0 => "CenterOfGravity0",
            Statistic::CenterOfGravity1 => "CenterOfGravity1",
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        Statistic::ALL
            .iter()
            .copied()
            .find(|s| s.key() == name)
            .ok_or_else(|| Error::UnknownAttribute(name.to_string()))
    }

    /// Full attribute name for a feature, e.g. `STATS::Ndvi::Mean`
    pub fn attribute_name(&self, feature: &str) -> String {
        format!("{STATS_PREFIX}{feature}::{}", self.key())
    }

    /// Value stored on an object by a previous statistics run
    pub fn value<L: Label>(&self, object: &LabelObject<L>, feature: &str) -> Result<f64> {
        object.attribute(&self.attribute_name(feature))
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Statistic {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Statistic::from_name(s)
    }
}

/// Parameters for statistics attributes
#[derive(Debug, Clone)]
pub struct StatisticsParams {
    /// Feature name used in the attribute names (default: "Band1")
    pub feature_name: String,
    /// Only compute `Mean` and `Variance` (default: false)
    pub reduced_attribute_set: bool,
    pub mode: ProcessingMode,
}

impl Default for StatisticsParams {
    fn default() -> Self {
        Self {
            feature_name: "Band1".to_string(),
            reduced_attribute_set: false,
            mode: ProcessingMode::default(),
        }
    }
}

impl StatisticsParams {
    /// Parameters for a named feature, other fields at their defaults
    pub fn for_feature(name: impl Into<String>) -> Self {
        Self {
            feature_name: name.into(),
            ..Default::default()
        }
    }
}

/// Compute statistics of `feature` under every object of `map`.
///
/// The feature raster must cover the map region pixel for pixel. An object
/// without any valid sample gets `Count = 0` and NaN for the rest.
pub fn statistics_attributes<L, T>(map: &mut LabelMap<L>, feature: &Raster<T>, params: &StatisticsParams) -> Result<()>
where
    L: Label,
    T: RasterElement,
{
    let region = map.region();
    feature.check_shape(region.rows, region.cols)?;
    // Samples are read unchecked at region offsets
    map.check_bounds()?;

    let mut filter = StatisticsFilter {
        feature,
        params,
        region,
        transform: *map.transform(),
    };
    run_object_filter(map, &mut filter, params.mode)
}

struct StatisticsFilter<'a, T: RasterElement> {
    feature: &'a Raster<T>,
    params: &'a StatisticsParams,
    region: Region,
    transform: GeoTransform,
}

impl<L: Label, T: RasterElement> ObjectFilter<L> for StatisticsFilter<'_, T> {
    fn name(&self) -> &'static str {
        "statistics"
    }

    fn process(&self, object: &mut LabelObject<L>) -> Result<()> {
        let nodata = self.feature.nodata();
        let mut samples: Vec<(usize, usize, f64)> = Vec::with_capacity(object.size());
        for (row, col) in object.pixels() {
            let raw = unsafe { self.feature.get_unchecked(row - self.region.row, col - self.region.col) };
            if raw.is_nodata(nodata) {
                continue;
            }
            match raw.to_f64() {
                Some(v) if !v.is_nan() => samples.push((row, col, v)),
                _ => {}
            }
        }
        trace!(label = %object.label(), samples = samples.len(), "sampled feature");

        let summary = Summary::of(&mut samples, &self.transform);
        let feature = &self.params.feature_name;
        let wanted: &[Statistic] = if self.params.reduced_attribute_set {
            &[Statistic::Mean, Statistic::Variance]
        } else {
            &Statistic::ALL
        };
        for stat in wanted {
            object.set_attribute(stat.attribute_name(feature), summary.get(*stat));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Summary {
    count: usize,
    sum: f64,
    mean: f64,
    variance: f64,
    min: f64,
    max: f64,
    median: f64,
    skewness: f64,
    kurtosis: f64,
    center_of_gravity: (f64, f64),
}

impl Summary {
    fn of(samples: &mut [(usize, usize, f64)], transform: &GeoTransform) -> Self {
        let count = samples.len();
        if count == 0 {
            return Summary {
                count: 0,
                sum: f64::NAN,
                mean: f64::NAN,
                variance: f64::NAN,
                min: f64::NAN,
                max: f64::NAN,
                median: f64::NAN,
                skewness: f64::NAN,
                kurtosis: f64::NAN,
                center_of_gravity: (f64::NAN, f64::NAN),
            };
        }

        let n = count as f64;
        let sum: f64 = samples.iter().map(|s| s.2).sum();
        let mean = sum / n;
        let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
        for &(_, _, v) in samples.iter() {
            let d = v - mean;
            m2 += d * d;
            m3 += d * d * d;
            m4 += d * d * d * d;
        }
        let variance = m2 / n;
        let sigma = variance.sqrt();
        let (skewness, kurtosis) = if sigma > 0.0 {
            (m3 / n / sigma.powi(3), m4 / n / variance.powi(2) - 3.0)
        } else {
            (0.0, 0.0)
        };

        // Weighted by value; an all-zero object falls back to its plain centroid
        let weight_sum: f64 = samples.iter().map(|s| s.2).sum();
        let (mut cx, mut cy) = (0.0, 0.0);
        let use_weights = weight_sum != 0.0;
        for &(row, col, v) in samples.iter() {
            let w = if use_weights { v } else { 1.0 };
            cx += w * col as f64;
            cy += w * row as f64;
        }
        let total = if use_weights { weight_sum } else { n };
        let center_of_gravity = transform.index_to_geo(cx / total, cy / total);

        samples.sort_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal));
        let min = samples[0].2;
        let max = samples[count - 1].2;
        let median = if count % 2 == 0 {
            (samples[count / 2 - 1].2 + samples[count / 2].2) / 2.0
        } else {
            samples[count / 2].2
        };

        Summary {
            count,
            sum,
            mean,
            variance,
            min,
            max,
            median,
            skewness,
            kurtosis,
            center_of_gravity,
        }
    }

    fn get(&self, stat: Statistic) -> f64 {
        match stat {
            Statistic::Mean => self.mean,
            Statistic::Sum => self.sum,
            Statistic::Variance => self.variance,
            Statistic::Sigma => self.variance.sqrt(),
            Statistic::Minimum => self.min,
            Statistic::Maximum => self.max,
            Statistic::Median => self.median,
            Statistic::Skewness => self.skewness,
            Statistic::Kurtosis => self.kurtosis,
            Statistic::Count => self.count as f64,
            Statistic::CenterOfGravity0 => self.center_of_gravity.0,
            Statistic::CenterOfGravity1 => self.center_of_gravity.1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use obia_core::RunLengthLine;

    fn two_objects() -> LabelMap<u8> {
        let mut map = LabelMap::new(2, 4, 0);
        map.set_line(0, 0, 2, 1).unwrap();
        map.set_line(1, 0, 2, 1).unwrap();
        map.set_line(0, 3, 1, 2).unwrap();
        map
    }

    fn feature() -> Raster<f64> {
        Raster::from_rows(&[&[1.0, 2.0, 50.0, 7.0], &[3.0, 4.0, 50.0, 9.0]]).unwrap()
    }

    #[test]
    fn test_basic_statistics() {
        let mut map = two_objects();
        let params = StatisticsParams::for_feature("Ndvi");
        statistics_attributes(&mut map, &feature(), &params).unwrap();

        let obj = map.label_object(1).unwrap();
        let stat = |s: Statistic| s.value(obj, "Ndvi").unwrap();
        assert_relative_eq!(stat(Statistic::Mean), 2.5);
        assert_relative_eq!(stat(Statistic::Sum), 10.0);
        assert_relative_eq!(stat(Statistic::Variance), 1.25);
        assert_relative_eq!(stat(Statistic::Sigma), 1.25f64.sqrt());
        assert_relative_eq!(stat(Statistic::Minimum), 1.0);
        assert_relative_eq!(stat(Statistic::Maximum), 4.0);
        assert_relative_eq!(stat(Statistic::Median), 2.5);
        assert_relative_eq!(stat(Statistic::Skewness), 0.0, epsilon = 1e-12);
        assert_relative_eq!(stat(Statistic::Kurtosis), 1.64 - 3.0, epsilon = 1e-12);
        assert_eq!(stat(Statistic::Count), 4.0);
        // Weighted by value: x = (2 + 4) / 10, y = (3 + 4) / 10
        assert_relative_eq!(stat(Statistic::CenterOfGravity0), 0.6, epsilon = 1e-12);
        assert_relative_eq!(stat(Statistic::CenterOfGravity1), 0.7, epsilon = 1e-12);

        assert!(obj.attribute("STATS::Ndvi::Mean").is_ok());
        assert_eq!(Statistic::Count.value(map.label_object(2).unwrap(), "Ndvi").unwrap(), 1.0);
    }

    #[test]
    fn test_nan_and_nodata_skipped() {
        let mut map = two_objects();
        let mut values = Raster::from_rows(&[&[1.0, f64::NAN, 0.0, -9.0], &[3.0, -9.0, 0.0, 5.0]]).unwrap();
        values.set_nodata(Some(-9.0));
        statistics_attributes(&mut map, &values, &StatisticsParams::default()).unwrap();

        let obj = map.label_object(1).unwrap();
        assert_eq!(Statistic::Count.value(obj, "Band1").unwrap(), 2.0);
        assert_relative_eq!(Statistic::Mean.value(obj, "Band1").unwrap(), 2.0);
    }

    #[test]
    fn test_empty_sample_set() {
        let mut map = two_objects();
        let values = Raster::filled(2, 4, f64::NAN);
        statistics_attributes(&mut map, &values, &StatisticsParams::default()).unwrap();
        let obj = map.label_object(2).unwrap();
        assert_eq!(Statistic::Count.value(obj, "Band1").unwrap(), 0.0);
        assert!(Statistic::Mean.value(obj, "Band1").unwrap().is_nan());
    }

    #[test]
    fn test_reduced_set_and_integer_feature() {
        let mut map = two_objects();
        let values = Raster::from_rows(&[&[1u16, 2, 0, 7], &[3, 4, 0, 9]]).unwrap();
        let params = StatisticsParams {
            reduced_attribute_set: true,
            ..StatisticsParams::for_feature("Band2")
        };
        statistics_attributes(&mut map, &values, &params).unwrap();
        let obj = map.label_object(1).unwrap();
        assert_eq!(obj.attributes().len(), 2);
        assert_relative_eq!(Statistic::Mean.value(obj, "Band2").unwrap(), 2.5);
    }

    #[test]
    fn test_size_mismatch() {
        let mut map = two_objects();
        let values = Raster::<f64>::new(3, 4);
        assert!(matches!(
            statistics_attributes(&mut map, &values, &StatisticsParams::default()),
            Err(Error::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_object_outside_region() {
        let mut map = LabelMap::new(2, 2, 0u8);
        map.add_label_object(LabelObject::new(1)).unwrap();
        map.label_object_mut(1).unwrap().add_line(RunLengthLine::new(5, 0, 2));
        let values = Raster::filled(2, 2, 1.0);

        let result = statistics_attributes(&mut map, &values, &StatisticsParams::default());
        assert!(matches!(result, Err(Error::IndexOutOfBounds { row: 5, col: 1, .. })));
        assert!(map.label_object(1).unwrap().attributes().is_empty());
    }

    #[test]
    fn test_statistic_names() {
        assert_eq!(Statistic::Mean.attribute_name("Ndvi"), "STATS::Ndvi::Mean");
        assert_eq!("Kurtosis".parse::<Statistic>().unwrap(), Statistic::Kurtosis);
        assert!(Statistic::from_name("Mode").is_err());
    }
}
