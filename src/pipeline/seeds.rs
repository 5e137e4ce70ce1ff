use geo::Point;

use super::centering::Axis;
use crate::engine::calculator::round_to;
use crate::models::{Feature, FieldValue};

/// Seed coordinate rounded for duplicate detection
pub fn rounded_coordinate(feature: &Feature<Point<f64>>, axis: Axis, precision: u32) -> FieldValue {
    let value = match axis {
        Axis::X => feature.geometry.x(),
        Axis::Y => feature.geometry.y(),
    };
    FieldValue::Float(round_to(value, precision))
}
