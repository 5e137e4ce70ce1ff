use geo::{unary_union, MultiPolygon, Polygon};
use tracing::debug;

use crate::models::{Attributes, FieldValue, Layer};

/// Union polygons sharing the same values of `fields` into one multipolygon each.
///
/// Groups come out in order of first appearance and keep only the dissolve fields.
pub fn dissolve(layer: Layer<Polygon<f64>>, fields: &[&str]) -> Layer<MultiPolygon<f64>> {
    let mut keys: Vec<Vec<FieldValue>> = Vec::new();
    let mut groups: Vec<Vec<Polygon<f64>>> = Vec::new();
    let mut lookup: hashbrown::HashMap<Vec<FieldValue>, usize> = hashbrown::HashMap::new();

    let mut output = Layer::derived("dissolved", &layer);
    for feature in layer.features {
        let key: Vec<FieldValue> = fields
            .iter()
            .map(|name| feature.attributes.get(name).cloned().unwrap_or(FieldValue::Null))
            .collect();
        let group = *lookup.entry(key.clone()).or_insert_with(|| {
            keys.push(key);
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[group].push(feature.geometry);
    }

    for (key, polygons) in keys.into_iter().zip(groups) {
        debug!("Dissolving {} polygons for {:?}", polygons.len(), key);
        let merged = unary_union(&polygons);
        let mut attributes = Attributes::new();
        for (name, value) in fields.iter().zip(key) {
            attributes.set(name, value);
        }
        output.push(merged, attributes);
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Area};

    fn square(x: f64, y: f64) -> Polygon<f64> {
        polygon![
            (x: x, y: y),
            (x: x + 1.0, y: y),
            (x: x + 1.0, y: y + 1.0),
            (x: x, y: y + 1.0),
        ]
    }

    #[test]
    fn test_adjacent_cells_merge_by_category() {
        let mut layer = Layer::new("cells");
        layer.push(square(0.0, 0.0), Attributes::new().with("cat", 2).with("seed", 1));
        layer.push(square(5.0, 5.0), Attributes::new().with("cat", 1).with("seed", 2));
        layer.push(square(1.0, 0.0), Attributes::new().with("cat", 2).with("seed", 3));

        let zones = dissolve(layer, &["cat"]);
        assert_eq!(zones.len(), 2);

        let first = &zones.features[0];
        assert_eq!(first.attributes.get("cat"), Some(&FieldValue::Int(2)));
        assert_eq!(first.attributes.len(), 1);
        assert_eq!(first.geometry.0.len(), 1);
        assert!((first.geometry.unsigned_area() - 2.0).abs() < 1e-9);

        assert_eq!(zones.features[1].attributes.get("cat"), Some(&FieldValue::Int(1)));
    }

    #[test]
    fn test_disjoint_cells_stay_separate_parts() {
        let mut layer = Layer::new("cells");
        layer.push(square(0.0, 0.0), Attributes::new().with("cat", 7));
        layer.push(square(3.0, 0.0), Attributes::new().with("cat", 7));

        let zones = dissolve(layer, &["cat"]);
        assert_eq!(zones.len(), 1);
        assert_eq!(zones.features[0].geometry.0.len(), 2);
    }
}
