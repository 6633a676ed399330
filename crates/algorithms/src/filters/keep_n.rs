//! Keep the N best-ranked objects

use std::cmp::Ordering;
use std::marker::PhantomData;

use obia_core::{Algorithm, Error, Label, LabelMap, LabelObject, Result};
use tracing::debug;

use crate::attributes::{ShapeAttribute, Statistic};

/// Parameters for [`KeepNObjects`]
#[derive(Debug, Clone)]
pub struct KeepNParams {
    /// Attribute used for ranking (default: "SHAPE::Size")
    pub attribute: String,
    /// Number of objects to keep (default: 1)
    pub number_of_objects: usize,
    /// Keep the smallest values instead of the largest (default: false)
    pub reverse_ordering: bool,
}

impl Default for KeepNParams {
    fn default() -> Self {
        Self {
            attribute: ShapeAttribute::Size.name().to_string(),
            number_of_objects: 1,
            reverse_ordering: false,
        }
    }
}

/// Keep the N objects ranking highest on a named attribute
#[derive(Debug, Clone, Copy)]
pub struct KeepNObjects<L>(PhantomData<L>);

impl<L> Default for KeepNObjects<L> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<L: Label> Algorithm for KeepNObjects<L> {
    type Input = LabelMap<L>;
    /// Kept and rejected objects
    type Output = (LabelMap<L>, LabelMap<L>);
    type Params = KeepNParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "KeepNObjects"
    }

    fn description(&self) -> &'static str {
        "Keep the N objects with the highest attribute values"
    }

    fn execute(&self, mut input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        let rejected = keep_n_objects(&mut input, &params)?;
        Ok((input, rejected))
    }
}

/// Rank order of two attribute values: NaN always sorts last, the rest
/// descending (ascending when `reverse_ordering`).
fn rank(a: f64, b: f64, reverse_ordering: bool) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let ord = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
            if reverse_ordering {
                ord
            } else {
                ord.reverse()
            }
        }
    }
}

/// Keep the `n` objects ranking first by `accessor`.
///
/// Ties keep the lower label. When the map holds `n` objects or fewer
/// nothing is removed. Returns the removed objects.
pub fn keep_n_objects_by<L, F>(
    map: &mut LabelMap<L>,
    accessor: F,
    n: usize,
    reverse_ordering: bool,
) -> Result<LabelMap<L>>
where
    L: Label,
    F: Fn(&LabelObject<L>) -> Result<f64>,
{
    let mut ranked = map
        .iter()
        .map(|obj| Ok((obj.label(), accessor(obj)?)))
        .collect::<Result<Vec<(L, f64)>>>()?;

    // Stable sort on label-ordered input keeps the lower label on ties
    ranked.sort_by(|a, b| rank(a.1, b.1, reverse_ordering));

    let mut rejected = map.empty_like();
    for (label, _) in ranked.into_iter().skip(n) {
        if let Some(obj) = map.remove_label(label) {
            rejected.add_label_object(obj)?;
        }
    }

    debug!(
        n,
        kept = map.number_of_label_objects(),
        rejected = rejected.number_of_label_objects(),
        "keep n objects"
    );
    Ok(rejected)
}

/// Keep N objects ranked on an attribute looked up by name
pub fn keep_n_objects<L: Label>(map: &mut LabelMap<L>, params: &KeepNParams) -> Result<LabelMap<L>> {
    let name = params.attribute.as_str();
    keep_n_objects_by(
        map,
        |obj| obj.attribute(name),
        params.number_of_objects,
        params.reverse_ordering,
    )
}

/// Keep N objects ranked on a shape attribute
pub fn shape_keep_n_objects<L: Label>(
    map: &mut LabelMap<L>,
    attribute: ShapeAttribute,
    n: usize,
    reverse_ordering: bool,
) -> Result<LabelMap<L>> {
    keep_n_objects_by(map, |obj| attribute.value(obj), n, reverse_ordering)
}

/// Keep N objects ranked on one statistic of a feature
pub fn statistics_keep_n_objects<L: Label>(
    map: &mut LabelMap<L>,
    feature: &str,
    statistic: Statistic,
    n: usize,
    reverse_ordering: bool,
) -> Result<LabelMap<L>> {
    let name = statistic.attribute_name(feature);
    keep_n_objects_by(map, |obj| obj.attribute(&name), n, reverse_ordering)
}
