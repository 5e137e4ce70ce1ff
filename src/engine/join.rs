//! Join attributes by location (summary).

use geo::{Coord, Intersects, Line, Point};
use hashbrown::HashSet;
use rstar::primitives::GeomWithData;
use rstar::{RTree, AABB};
use tracing::debug;

use crate::models::{FieldValue, Layer};

type JoinPoint = GeomWithData<[f64; 2], usize>;

/// For every line, count the distinct values of `field` among the join points
/// that intersect it, and store the count in `output_field`.
///
/// Lines without any matching point are kept with a `Null` count.
pub fn join_unique_count(
    lines: Layer<Line<f64>>,
    join: &Layer<Point<f64>>,
    field: &str,
    output_field: &str,
) -> Layer<Line<f64>> {
    let tree: RTree<JoinPoint> = RTree::bulk_load(
        join.iter()
            .enumerate()
            .map(|(i, f)| JoinPoint::new([f.geometry.x(), f.geometry.y()], i))
            .collect(),
    );

    let mut unmatched = 0usize;
    let mut output = Layer::derived("joined", &lines);
    for mut feature in lines.features {
        let line = feature.geometry;
        let envelope = AABB::from_corners([line.start.x, line.start.y], [line.end.x, line.end.y]);

        let mut seen: HashSet<&FieldValue> = HashSet::new();
        let mut matched = false;
        for candidate in tree.locate_in_envelope_intersecting(&envelope) {
            let [x, y] = *candidate.geom();
            if !line.intersects(&Coord { x, y }) {
                continue;
            }
            matched = true;
            if let Some(value) = join.features[candidate.data].attributes.get(field) {
                if !value.is_null() {
                    seen.insert(value);
                }
            }
        }

        if matched {
            feature.attributes.set(output_field, seen.len() as i64);
        } else {
            unmatched += 1;
            feature.attributes.set(output_field, FieldValue::Null);
        }
        output.push(line, feature.attributes);
    }

    if unmatched > 0 {
        debug!("{} lines had no intersecting join feature", unmatched);
    }
    output
}
