//! Segment length used when rebuilding centered segments.

use geo::{Euclidean, Length, Line};

use crate::engine::calculator::round_to;
use crate::error::Result;
use crate::models::{Feature, FieldValue, Layer};

/// Decimal places kept in `outlen`
pub const LENGTH_PRECISION: u32 = 8;

/// Segment length, shortened by `shrink` when the segment touches more than one zone.
///
/// A `Null` zone count counts as a single zone.
pub fn outlen(layer: &Layer<Line<f64>>, feature: &Feature<Line<f64>>, shrink: f64) -> Result<FieldValue> {
    let length = Euclidean.length(&feature.geometry);
    let zones = match layer.field(feature, "cat_unique")? {
        FieldValue::Null => 1,
        value => value.as_i64().unwrap_or(1),
    };
    let value = if zones > 1 {
        length - length * shrink
    } else {
        length
    };
    Ok(FieldValue::Float(round_to(value, LENGTH_PRECISION)))
}
