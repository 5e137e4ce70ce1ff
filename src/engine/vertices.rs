use geo::{Coord, CoordsIter, Distance, Euclidean, Point};

use crate::engine::linear::angle_at_vertex;
use crate::models::Layer;

/// Emit every vertex of every geometry as a point feature.
///
/// Each point keeps the parent's attributes and gains `vertex_index`,
/// `vertex_part`, `vertex_part_index`, `distance` (along the parent) and
/// `angle` (degrees clockwise from north).
pub fn extract_vertices<G>(layer: Layer<G>) -> Layer<Point<f64>>
where
    G: CoordsIter<Scalar = f64>,
{
    let mut output = Layer::derived("vertices", &layer);
    for feature in layer.features {
        let coords: Vec<Coord<f64>> = feature.geometry.coords_iter().collect();
        let mut distance = 0.0;
        for (i, &c) in coords.iter().enumerate() {
            if i > 0 {
                distance += Euclidean.distance(coords[i - 1], c);
            }
            let attributes = feature
                .attributes
                .clone()
                .with("vertex_index", i as i64)
                .with("vertex_part", 0)
                .with("vertex_part_index", i as i64)
                .with("distance", distance)
                .with("angle", angle_at_vertex(&coords, i));
            output.push(Point::from(c), attributes);
        }
    }
    output
}
