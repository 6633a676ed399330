//! Named numeric attributes attached to label objects

use std::collections::btree_map;
use std::collections::BTreeMap;

/// A string-keyed bag of `f64` attribute values.
///
/// Keys are kept sorted so that enumeration (and therefore vector export)
/// is deterministic. Setting an existing key overwrites its value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributesMap {
    values: BTreeMap<String, f64>,
}

impl AttributesMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an attribute, overwriting any previous value
    pub fn set(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<f64> {
        self.values.remove(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Attribute names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Copy every attribute of `other` into `self`
    pub fn extend_from(&mut self, other: &AttributesMap) {
        self.values
            .extend(other.values.iter().map(|(k, v)| (k.clone(), *v)));
    }
}

impl<'a> IntoIterator for &'a AttributesMap {
    type Item = (&'a String, &'a f64);
    type IntoIter = btree_map::Iter<'a, String, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for AttributesMap {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_overwrites() {
        let mut attrs = AttributesMap::new();
        attrs.set("SHAPE::Size", 4.0);
        attrs.set("SHAPE::Size", 9.0);
        assert_eq!(attrs.get("SHAPE::Size"), Some(9.0));
        assert_eq!(attrs.len(), 1);
    }

    #[test]
    fn test_missing_attribute() {
        let attrs = AttributesMap::new();
        assert_eq!(attrs.get("SHAPE::Perimeter"), None);
        assert!(!attrs.contains("SHAPE::Perimeter"));
    }

    #[test]
    fn test_names_sorted() {
        let attrs: AttributesMap = [("b", 1.0), ("a", 2.0), ("c", 3.0)].into_iter().collect();
        let names: Vec<&str> = attrs.names().collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }
}
