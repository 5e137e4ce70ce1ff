//! Endpoints of the shortened segment, centered on the original segment's midpoint.

use geo::{Centroid, Line};

use crate::engine::calculator::round_to;
use crate::engine::linear::angle_at_vertex;
use crate::error::Result;
use crate::models::{Feature, FieldValue, Layer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum End {
    /// `x0`/`y0`: half a length back from the midpoint
    Start,
    /// `x1`/`y1`: half a length forward
    End,
}

/// Decimal places kept in `x0`, `y0`, `x1` and `y1`
pub const COORDINATE_PRECISION: u32 = 3;

/// One coordinate of a centered endpoint, using the segment's `outlen`
pub fn endpoint(
    layer: &Layer<Line<f64>>,
    feature: &Feature<Line<f64>>,
    end: End,
    axis: Axis,
) -> Result<FieldValue> {
    let line = feature.geometry;
    let half = layer.f64_field(feature, "outlen")? / 2.0;
    let theta = angle_at_vertex(&[line.start, line.end], 0).to_radians();
    let midpoint = line.centroid();

    let (center, step) = match axis {
        Axis::X => (midpoint.x(), half * theta.sin()),
        Axis::Y => (midpoint.y(), half * theta.cos()),
    };
    let value = match end {
        End::Start => center - step,
        End::End => center + step,
    };
    Ok(FieldValue::Float(round_to(value, COORDINATE_PRECISION)))
}
