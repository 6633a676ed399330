//! Selection of objects by label

use std::collections::BTreeSet;

use obia_core::{Label, LabelMap, Result};
use tracing::debug;

/// Move the objects whose label is (or, with `exclude`, is not) in `labels`
/// into a second map, which is returned.
///
/// With `exclude == false` the listed labels are the ones removed.
/// Listed labels that are absent from the map are ignored.
pub fn label_selection<L: Label>(map: &mut LabelMap<L>, labels: &[L], exclude: bool) -> Result<LabelMap<L>> {
    let selected: BTreeSet<L> = labels.iter().copied().collect();

    let mut rejected = map.empty_like();
    for obj in map.retain(|obj| selected.contains(&obj.label()) == exclude) {
        rejected.add_label_object(obj)?;
    }

    debug!(
        selected = selected.len(),
        exclude,
        removed = rejected.number_of_label_objects(),
        "label selection"
    );
    Ok(rejected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LabelMap<i32> {
        let mut map = LabelMap::new(1, 6, 0);
        for label in 1..=6 {
            map.set_pixel(0, label as usize - 1, label).unwrap();
        }
        map
    }

    #[test]
    fn test_remove_listed() {
        let mut map = sample();
        let removed = label_selection(&mut map, &[2, 4, 42], false).unwrap();
        assert_eq!(map.labels().collect::<Vec<_>>(), vec![1, 3, 5, 6]);
        assert_eq!(removed.labels().collect::<Vec<_>>(), vec![2, 4]);
    }

    #[test]
    fn test_keep_listed() {
        let mut map = sample();
        let removed = label_selection(&mut map, &[2, 4], true).unwrap();
        assert_eq!(map.labels().collect::<Vec<_>>(), vec![2, 4]);
        assert_eq!(removed.number_of_label_objects(), 4);
    }

    #[test]
    fn test_empty_list() {
        let mut map = sample();
        let removed = label_selection(&mut map, &[], false).unwrap();
        assert_eq!(map.number_of_label_objects(), 6);
        assert!(removed.is_empty());
    }
}
