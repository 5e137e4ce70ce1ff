use geo::{Coord, Line};

use crate::error::Result;
use crate::models::Layer;

/// Field names holding the two endpoints of a rebuilt line, start first
#[derive(Debug, Clone, Copy)]
pub struct EndpointFields<'a> {
    pub start_x: &'a str,
    pub start_y: &'a str,
    pub end_x: &'a str,
    pub end_y: &'a str,
}

/// Replace every geometry with the line between two coordinates read from its fields
pub fn line_from_fields<G>(layer: Layer<G>, fields: EndpointFields<'_>) -> Result<Layer<Line<f64>>> {
    let mut output = Layer::derived("geometry_by_expression", &layer);
    for feature in &layer.features {
        let start = Coord {
            x: layer.f64_field(feature, fields.start_x)?,
            y: layer.f64_field(feature, fields.start_y)?,
        };
        let end = Coord {
            x: layer.f64_field(feature, fields.end_x)?,
            y: layer.f64_field(feature, fields.end_y)?,
        };
        output.push(Line::new(start, end), feature.attributes.clone());
    }
    Ok(output)
}
