//! Feature layers passed between stages.

use serde_json::Value;

use super::{Attributes, FieldValue};
use crate::error::{Error, Result};

/// A single feature: geometry plus attributes
#[derive(Debug, Clone, PartialEq)]
pub struct Feature<G> {
    pub id: u64,
    pub geometry: G,
    pub attributes: Attributes,
}

impl<G> Feature<G> {
    pub fn new(id: u64, geometry: G, attributes: Attributes) -> Self {
        Self {
            id,
            geometry,
            attributes,
        }
    }
}

/// An ordered collection of features sharing a geometry type.
///
/// `crs` is the legacy GeoJSON `crs` member, carried unchanged from input to output.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer<G> {
    pub name: String,
    pub crs: Option<Value>,
    pub features: Vec<Feature<G>>,
}

impl<G> Layer<G> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            crs: None,
            features: Vec::new(),
        }
    }

    /// Start an empty layer that inherits the CRS of `other`
    pub fn derived<H>(name: impl Into<String>, other: &Layer<H>) -> Self {
        Self {
            name: name.into(),
            crs: other.crs.clone(),
            features: Vec::new(),
        }
    }

    /// Append a feature, assigning the next sequential id
    pub fn push(&mut self, geometry: G, attributes: Attributes) {
        let id = self.features.len() as u64 + 1;
        self.features.push(Feature::new(id, geometry, attributes));
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature<G>> {
        self.features.iter()
    }

    /// Look up a field that must be present on the feature
    pub fn field<'a>(&self, feature: &'a Feature<G>, name: &str) -> Result<&'a FieldValue> {
        feature
            .attributes
            .get(name)
            .ok_or_else(|| Error::MissingField {
                layer: self.name.clone(),
                feature: feature.id,
                field: name.to_string(),
            })
    }

    pub fn f64_field(&self, feature: &Feature<G>, name: &str) -> Result<f64> {
        self.field(feature, name)?
            .as_f64()
            .ok_or_else(|| Error::FieldType {
                field: name.to_string(),
                feature: feature.id,
                expected: "numeric",
            })
    }

    pub fn i64_field(&self, feature: &Feature<G>, name: &str) -> Result<i64> {
        self.field(feature, name)?
            .as_i64()
            .ok_or_else(|| Error::FieldType {
                field: name.to_string(),
                feature: feature.id,
                expected: "an integer",
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Point;

    #[test]
    fn test_push_assigns_sequential_ids() {
        let mut layer = Layer::new("points");
        layer.push(Point::new(0.0, 0.0), Attributes::new());
        layer.push(Point::new(1.0, 0.0), Attributes::new());
        let ids: Vec<u64> = layer.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_missing_field_names_layer() {
        let mut layer = Layer::new("roads");
        layer.push(Point::new(0.0, 0.0), Attributes::new().with("cat", "a"));
        let feature = &layer.features[0];

        assert!(matches!(
            layer.f64_field(feature, "cost"),
            Err(Error::MissingField { ref layer, .. }) if layer == "roads"
        ));
        assert!(matches!(
            layer.i64_field(feature, "cat"),
            Err(Error::FieldType { .. })
        ));
    }
}
