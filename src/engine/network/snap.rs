//! Spatial index for snapping service points onto network arcs.

use geo::{Closest, ClosestPoint, Coord, Distance, Euclidean, Length, Line, LineLocatePoint, Point};
use rstar::{PointDistance, RTree, RTreeObject, AABB};

use super::graph::RoadGraph;

/// One straight segment of a network arc
#[derive(Debug, Clone)]
pub struct IndexedSegment {
    pub arc: usize,
    /// Distance along the arc where this segment starts
    pub offset: f64,
    line: Line<f64>,
    envelope: AABB<[f64; 2]>,
}

impl IndexedSegment {
    fn closest(&self, point: Point<f64>) -> Point<f64> {
        match self.line.closest_point(&point) {
            Closest::Intersection(p) | Closest::SinglePoint(p) => p,
            // Zero-length segment
            Closest::Indeterminate => self.line.start_point(),
        }
    }
}

impl RTreeObject for IndexedSegment {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl PointDistance for IndexedSegment {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let point = Point::new(point[0], point[1]);
        let distance = Euclidean.distance(self.closest(point), point);
        distance * distance
    }
}

/// Where a point meets the network
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snap {
    pub arc: usize,
    /// Distance along the arc
    pub offset: f64,
    pub location: Coord<f64>,
    pub distance: f64,
}

pub struct SnapIndex {
    tree: RTree<IndexedSegment>,
}

impl SnapIndex {
    pub fn build(graph: &RoadGraph) -> Self {
        let mut segments = Vec::new();
        for (arc, network_arc) in graph.arcs().iter().enumerate() {
            let mut offset = 0.0;
            for line in network_arc.geometry.lines() {
                segments.push(IndexedSegment {
                    arc,
                    offset,
                    line,
                    envelope: AABB::from_corners(
                        [line.start.x, line.start.y],
                        [line.end.x, line.end.y],
                    ),
                });
                offset += Euclidean.length(&line);
            }
        }
        Self {
            tree: RTree::bulk_load(segments),
        }
    }

    /// Nearest arc location within `max_distance` of `point`
    pub fn nearest(&self, point: Coord<f64>, max_distance: f64) -> Option<Snap> {
        let segment = self.tree.nearest_neighbor(&[point.x, point.y])?;
        let point = Point::from(point);
        let closest = segment.closest(point);
        let distance = Euclidean.distance(closest, point);
        if distance > max_distance {
            return None;
        }
        let fraction = segment.line.line_locate_point(&closest)?;
        Some(Snap {
            arc: segment.arc,
            offset: segment.offset + fraction * Euclidean.length(&segment.line),
            location: closest.0,
            distance,
        })
    }
}
