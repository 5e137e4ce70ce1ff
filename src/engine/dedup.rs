use hashbrown::HashSet;
use tracing::debug;

use crate::models::{FieldValue, Layer};

/// Keep the first feature for each distinct combination of `fields`.
///
/// Missing fields count as `Null`. Input order is preserved.
pub fn remove_duplicates_by_fields<G>(layer: Layer<G>, fields: &[&str]) -> Layer<G> {
    let mut seen: HashSet<Vec<FieldValue>> = HashSet::new();
    let total = layer.len();
    let mut output = Layer::derived("deduplicated", &layer);

    for feature in layer.features {
        let key: Vec<FieldValue> = fields
            .iter()
            .map(|name| feature.attributes.get(name).cloned().unwrap_or(FieldValue::Null))
            .collect();
        if seen.insert(key) {
            output.push(feature.geometry, feature.attributes);
        }
    }

    debug!("Removed {} duplicate features", total - output.len());
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Attributes;
    use geo::Point;

    #[test]
    fn test_first_feature_per_key_survives() {
        let mut layer = Layer::new("seeds");
        let rows = [(1, 0.1, 5.0, 1), (1, 0.1, 5.0, 2), (2, 0.1, 5.0, 3), (1, 0.2, 5.0, 4)];
        for (cat_unique, x, y, cat) in rows {
            layer.push(
                Point::new(x, y),
                Attributes::new()
                    .with("cat_unique", cat_unique)
                    .with("x", x)
                    .with("y", y)
                    .with("cat", cat),
            );
        }

        let deduped = remove_duplicates_by_fields(layer, &["cat_unique", "x", "y"]);
        let cats: Vec<&FieldValue> = deduped
            .iter()
            .filter_map(|f| f.attributes.get("cat"))
            .collect();
        assert_eq!(
            cats,
            vec![&FieldValue::Int(1), &FieldValue::Int(3), &FieldValue::Int(4)]
        );
    }
}
