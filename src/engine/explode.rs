use geo::{Line, LineString};

use crate::models::Layer;

/// Split every line into its straight segments, copying the attributes to each
pub fn explode_lines(layer: Layer<LineString<f64>>) -> Layer<Line<f64>> {
    let mut output = Layer::derived("exploded_lines", &layer);
    for feature in layer.features {
        for line in feature.geometry.lines() {
            output.push(line, feature.attributes.clone());
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Attributes;
    use geo::Coord;

    #[test]
    fn test_explode_copies_attributes() {
        let mut layer = Layer::new("allocation");
        layer.push(
            LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]),
            Attributes::new().with("cat", 3),
        );
        layer.push(
            LineString::from(vec![(5.0, 5.0), (6.0, 5.0)]),
            Attributes::new().with("cat", 4),
        );

        let exploded = explode_lines(layer);
        assert_eq!(exploded.len(), 3);
        assert_eq!(
            exploded.features[1].geometry,
            Line::new(Coord { x: 1.0, y: 0.0 }, Coord { x: 1.0, y: 1.0 })
        );
        assert_eq!(exploded.features[1].attributes.get("cat"), Some(&3.into()));
        assert_eq!(exploded.features[2].id, 3);
    }
}
