//! Line helpers on top of geo: azimuths, vertex angles and substrings.

use geo::{Coord, Euclidean, InterpolateLine, Length, LineString};

/// Azimuth from `a` to `b` in degrees clockwise from north, in `[0, 360)`.
///
/// Coincident points give 0.
pub fn azimuth(a: Coord<f64>, b: Coord<f64>) -> f64 {
    if a == b {
        return 0.0;
    }
    (b.x - a.x).atan2(b.y - a.y).to_degrees().rem_euclid(360.0)
}

/// Angle of the line at a vertex, in degrees clockwise from north.
///
/// End vertices take the azimuth of their only segment. Interior vertices take
/// the bisector of the incoming and outgoing azimuths.
pub fn angle_at_vertex(coords: &[Coord<f64>], index: usize) -> f64 {
    let n = coords.len();
    if n < 2 || index >= n {
        return 0.0;
    }
    if index == 0 {
        return azimuth(coords[0], coords[1]);
    }
    if index == n - 1 {
        return azimuth(coords[n - 2], coords[n - 1]);
    }
    let incoming = azimuth(coords[index - 1], coords[index]).to_radians();
    let outgoing = azimuth(coords[index], coords[index + 1]).to_radians();
    let (sin, cos) = (
        incoming.sin() + outgoing.sin(),
        incoming.cos() + outgoing.cos(),
    );
    if sin == 0.0 && cos == 0.0 {
        // Full reversal: the bisector is perpendicular to the incoming segment
        return (incoming.to_degrees() + 90.0).rem_euclid(360.0);
    }
    sin.atan2(cos).to_degrees().rem_euclid(360.0)
}

/// Coordinate at `distance` along the line, clamped to its ends
pub fn interpolate(line: &LineString<f64>, distance: f64) -> Option<Coord<f64>> {
    Euclidean
        .point_at_distance_from_start(line, distance)
        .map(|p| p.0)
}

/// The part of `line` between two distances along it.
///
/// Returns `None` when the requested range is empty.
pub fn substring(line: &LineString<f64>, start: f64, end: f64) -> Option<LineString<f64>> {
    if end <= start || line.0.len() < 2 {
        return None;
    }
    let mut coords = vec![interpolate(line, start)?];
    let mut walked = 0.0;
    for segment in line.lines() {
        walked += Euclidean.length(&segment);
        if walked > start && walked < end {
            coords.push(segment.end);
        }
    }
    coords.push(interpolate(line, end)?);
    coords.dedup();
    if coords.len() < 2 {
        return None;
    }
    Some(LineString::new(coords))
}
