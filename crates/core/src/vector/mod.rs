//! Vector features produced from label maps
//!
//! A [`Feature`] pairs a `geo_types` geometry with named properties; the
//! vectorizer emits one feature per label object, carrying its attributes.

use geo_types::{Coord, Geometry, LineString, Polygon};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// Attribute value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl AttributeValue {
    /// Numeric view of the value, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Int(v) => Some(*v as f64),
            AttributeValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    fn to_json(&self) -> Value {
        match self {
            AttributeValue::Null => Value::Null,
            AttributeValue::Bool(b) => Value::Bool(*b),
            AttributeValue::Int(i) => json!(i),
            // Non-finite floats have no JSON representation
            AttributeValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            AttributeValue::String(s) => Value::String(s.clone()),
        }
    }
}

/// A geographic feature with geometry and attributes
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Feature geometry
    pub geometry: Option<Geometry<f64>>,
    /// Feature attributes, ordered by name
    pub properties: BTreeMap<String, AttributeValue>,
    /// Optional feature ID
    pub id: Option<String>,
}

impl Feature {
    /// Create a new feature with geometry
    pub fn new(geometry: Geometry<f64>) -> Self {
        Self {
            geometry: Some(geometry),
            properties: BTreeMap::new(),
            id: None,
        }
    }

    /// Create a feature with no geometry
    pub fn empty() -> Self {
        Self {
            geometry: None,
            properties: BTreeMap::new(),
            id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set an attribute
    pub fn set_property(&mut self, key: impl Into<String>, value: AttributeValue) {
        self.properties.insert(key.into(), value);
    }

    /// Get an attribute
    pub fn get_property(&self, key: &str) -> Option<&AttributeValue> {
        self.properties.get(key)
    }

    /// GeoJSON `Feature` object
    pub fn to_geojson_value(&self) -> Value {
        let properties: Map<String, Value> = self
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();

        let mut feature = json!({
            "type": "Feature",
            "geometry": self.geometry.as_ref().map_or(Value::Null, geometry_to_json),
            "properties": properties,
        });
        if let (Some(id), Value::Object(obj)) = (&self.id, &mut feature) {
            obj.insert("id".to_string(), Value::String(id.clone()));
        }
        feature
    }
}

/// Collection of features
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new() -> Self {
        Self { features: Vec::new() }
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    /// Feature with the given id
    pub fn find(&self, id: &str) -> Option<&Feature> {
        self.features.iter().find(|f| f.id.as_deref() == Some(id))
    }

    /// GeoJSON `FeatureCollection` value
    pub fn to_geojson_value(&self) -> Value {
        json!({
            "type": "FeatureCollection",
            "features": self.features.iter().map(Feature::to_geojson_value).collect::<Vec<_>>(),
        })
    }

    /// Serialize as a GeoJSON document
    pub fn to_geojson(&self) -> String {
        self.to_geojson_value().to_string()
    }
}

impl IntoIterator for FeatureCollection {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}

fn coord_json(c: &Coord<f64>) -> Value {
    json!([c.x, c.y])
}

fn ring_json(ring: &LineString<f64>) -> Value {
    Value::Array(ring.coords().map(coord_json).collect())
}

fn polygon_json(polygon: &Polygon<f64>) -> Value {
    let rings = std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(ring_json)
        .collect();
    Value::Array(rings)
}

fn geometry_to_json(geometry: &Geometry<f64>) -> Value {
    match geometry {
        Geometry::Point(p) => json!({"type": "Point", "coordinates": coord_json(&p.0)}),
        Geometry::LineString(ls) => json!({"type": "LineString", "coordinates": ring_json(ls)}),
        Geometry::Polygon(p) => json!({"type": "Polygon", "coordinates": polygon_json(p)}),
        Geometry::MultiPoint(mp) => json!({
            "type": "MultiPoint",
            "coordinates": mp.iter().map(|p| coord_json(&p.0)).collect::<Vec<_>>(),
        }),
        Geometry::MultiLineString(mls) => json!({
            "type": "MultiLineString",
            "coordinates": mls.iter().map(ring_json).collect::<Vec<_>>(),
        }),
        Geometry::MultiPolygon(mp) => json!({
            "type": "MultiPolygon",
            "coordinates": mp.iter().map(polygon_json).collect::<Vec<_>>(),
        }),
        Geometry::Rect(r) => geometry_to_json(&Geometry::Polygon(r.to_polygon())),
        Geometry::Triangle(t) => geometry_to_json(&Geometry::Polygon(t.to_polygon())),
        Geometry::Line(l) => json!({
            "type": "LineString",
            "coordinates": [coord_json(&l.start), coord_json(&l.end)],
        }),
        Geometry::GeometryCollection(gc) => json!({
            "type": "GeometryCollection",
            "geometries": gc.iter().map(geometry_to_json).collect::<Vec<_>>(),
        }),
    }
}
