//! Attribute openings
//!
//! An opening removes every object whose attribute fails a threshold
//! test. Removed objects are returned in a second map with the same
//! geometry so they can still be inspected.

use std::marker::PhantomData;

use obia_core::{Algorithm, Error, Label, LabelMap, LabelObject, Result};
use tracing::debug;

use crate::attributes::{ShapeAttribute, Statistic};

/// Parameters for an opening on a named attribute
#[derive(Debug, Clone)]
pub struct OpeningParams {
    /// Attribute to test (default: "SHAPE::Size")
    pub attribute: String,
    /// Threshold (default: 0.0)
    pub lambda: f64,
    /// Remove objects at or above `lambda` instead of below (default: false)
    pub reverse_ordering: bool,
}

impl Default for OpeningParams {
    fn default() -> Self {
        Self {
            attribute: ShapeAttribute::Size.name().to_string(),
            lambda: 0.0,
            reverse_ordering: false,
        }
    }
}

/// Opening on a named attribute
#[derive(Debug, Clone, Copy)]
pub struct AttributesOpening<L>(PhantomData<L>);

impl<L> Default for AttributesOpening<L> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<L: Label> Algorithm for AttributesOpening<L> {
    type Input = LabelMap<L>;
    /// Kept and rejected objects
    type Output = (LabelMap<L>, LabelMap<L>);
    type Params = OpeningParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "AttributesOpening"
    }

    fn description(&self) -> &'static str {
        "Remove objects whose attribute is below a threshold"
    }

    fn execute(&self, mut input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        let rejected = attributes_opening(&mut input, &params)?;
        Ok((input, rejected))
    }
}

/// Remove the objects for which `(accessor(object) < lambda) XOR reverse`.
///
/// Every value is read before any object moves, so a failing accessor
/// leaves `map` untouched. Returns the removed objects.
pub fn opening_by<L, F>(map: &mut LabelMap<L>, accessor: F, lambda: f64, reverse_ordering: bool) -> Result<LabelMap<L>>
where
    L: Label,
    F: Fn(&LabelObject<L>) -> Result<f64>,
{
    let values = map
        .iter()
        .map(|obj| Ok((obj.label(), accessor(obj)?)))
        .collect::<Result<Vec<(L, f64)>>>()?;

    let mut rejected = map.empty_like();
    for (label, value) in values {
        if (value < lambda) != reverse_ordering {
            if let Some(obj) = map.remove_label(label) {
                rejected.add_label_object(obj)?;
            }
        }
    }

    debug!(
        lambda,
        reverse_ordering,
        kept = map.number_of_label_objects(),
        rejected = rejected.number_of_label_objects(),
        "opening"
    );
    Ok(rejected)
}

/// Opening on an attribute looked up by name
pub fn attributes_opening<L: Label>(map: &mut LabelMap<L>, params: &OpeningParams) -> Result<LabelMap<L>> {
    let name = params.attribute.as_str();
    opening_by(map, |obj| obj.attribute(name), params.lambda, params.reverse_ordering)
}

/// Opening on a shape attribute
pub fn shape_opening<L: Label>(
    map: &mut LabelMap<L>,
    attribute: ShapeAttribute,
    lambda: f64,
    reverse_ordering: bool,
) -> Result<LabelMap<L>> {
    opening_by(map, |obj| attribute.value(obj), lambda, reverse_ordering)
}

/// Opening on a shape attribute given by name.
///
/// Names not resolving to a [`ShapeAttribute`] fail with
/// `UnknownAttribute` before the map is touched.
pub fn shape_opening_by_name<L: Label>(map: &mut LabelMap<L>, params: &OpeningParams) -> Result<LabelMap<L>> {
    let attribute = ShapeAttribute::from_name(&params.attribute)?;
    shape_opening(map, attribute, params.lambda, params.reverse_ordering)
}

/// Opening on one statistic of a feature
pub fn statistics_opening<L: Label>(
    map: &mut LabelMap<L>,
    feature: &str,
    statistic: Statistic,
    lambda: f64,
    reverse_ordering: bool,
) -> Result<LabelMap<L>> {
    let name = statistic.attribute_name(feature);
    opening_by(map, |obj| obj.attribute(&name), lambda, reverse_ordering)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Objects 1..=5 with `SHAPE::Size` equal to their label
    fn sized_map() -> LabelMap<u8> {
        let mut map = LabelMap::new(5, 5, 0);
        for label in 1..=5u8 {
            map.set_line(label as usize - 1, 0, label as usize, label).unwrap();
        }
        for obj in map.iter_mut() {
            let size = obj.size() as f64;
            obj.set_attribute("SHAPE::Size", size);
        }
        map
    }

    fn labels(map: &LabelMap<u8>) -> Vec<u8> {
        map.labels().collect()
    }

    #[test]
    fn test_opening_removes_below() {
        let mut map = sized_map();
        let params = OpeningParams {
            lambda: 3.0,
            ..Default::default()
        };
        let rejected = attributes_opening(&mut map, &params).unwrap();
        assert_eq!(labels(&map), vec![3, 4, 5]);
        assert_eq!(labels(&rejected), vec![1, 2]);
        assert_eq!(rejected.region(), map.region());
    }

    #[test]
    fn test_opening_reversed() {
        let mut map = sized_map();
        let params = OpeningParams {
            lambda: 3.0,
            reverse_ordering: true,
            ..Default::default()
        };
        let rejected = attributes_opening(&mut map, &params).unwrap();
        assert_eq!(labels(&map), vec![1, 2]);
        assert_eq!(labels(&rejected), vec![3, 4, 5]);
    }

    #[test]
    fn test_opening_monotonic() {
        let mut previous: Option<Vec<u8>> = None;
        for lambda in [0.0, 1.5, 2.0, 4.0, 9.0] {
            let mut map = sized_map();
            shape_opening(&mut map, ShapeAttribute::Size, lambda, false).unwrap();
            let kept = labels(&map);
            if let Some(prev) = previous {
                assert!(kept.iter().all(|l| prev.contains(l)));
            }
            previous = Some(kept);
        }
    }

    #[test]
    fn test_missing_attribute_leaves_map_untouched() {
        let mut map = sized_map();
        map.label_object_mut(4).unwrap().attributes_mut().clear();
        let before = map.clone();
        let params = OpeningParams {
            lambda: 3.0,
            ..Default::default()
        };
        let err = attributes_opening(&mut map, &params).unwrap_err();
        assert_eq!(err, Error::attribute_not_found("SHAPE::Size", 4));
        assert_eq!(map, before);
    }

    #[test]
    fn test_unknown_shape_attribute() {
        let mut map = sized_map();
        let params = OpeningParams {
            attribute: "Wobbliness".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            shape_opening_by_name(&mut map, &params),
            Err(Error::UnknownAttribute(_))
        ));
        assert_eq!(map.number_of_label_objects(), 5);
    }

    #[test]
    fn test_statistics_opening() {
        let mut map = sized_map();
        for obj in map.iter_mut() {
            let mean = 10.0 * obj.label() as f64;
            obj.set_attribute("STATS::Ndvi::Mean", mean);
        }
        let rejected = statistics_opening(&mut map, "Ndvi", Statistic::Mean, 25.0, false).unwrap();
        assert_eq!(labels(&map), vec![3, 4, 5]);
        assert_eq!(rejected.number_of_label_objects(), 2);
    }

    #[test]
    fn test_algorithm_trait() {
        let (kept, rejected) = AttributesOpening::default()
            .execute(sized_map(), OpeningParams { lambda: 5.0, ..Default::default() })
            .unwrap();
        assert_eq!(labels(&kept), vec![5]);
        assert_eq!(rejected.number_of_label_objects(), 4);
    }
}
