//! Voronoi polygons over point features.
//!
//! Cells come from the Delaunay triangulation: each seed's cell is the extent
//! rectangle clipped by the perpendicular bisectors to its Delaunay neighbours.

use geo::{BoundingRect, Coord, LineString, MultiPoint, Point, Polygon, Rect};
use rstar::RTree;
use spade::{DelaunayTriangulation, Point2, Triangulation};
use tracing::{debug, info};

use crate::models::Layer;

/// Extent of the tessellation: bounding box of the seeds grown by `buffer_percent`.
///
/// A flat extent is padded by half its larger side, or by one unit when the seeds coincide.
pub fn tessellation_extent(points: &[Point<f64>], buffer_percent: f64) -> Option<Rect<f64>> {
    let rect = MultiPoint::new(points.to_vec()).bounding_rect()?;
    let (mut width, mut height) = (rect.width(), rect.height());
    let (mut min, mut max) = (rect.min(), rect.max());

    if width == 0.0 || height == 0.0 {
        let pad = (width.max(height) / 2.0).max(1.0);
        if width == 0.0 {
            min.x -= pad;
            max.x += pad;
            width = 2.0 * pad;
        }
        if height == 0.0 {
            min.y -= pad;
            max.y += pad;
            height = 2.0 * pad;
        }
    }

    let grow_x = width * buffer_percent / 100.0;
    let grow_y = height * buffer_percent / 100.0;
    Some(Rect::new(
        Coord {
            x: min.x - grow_x,
            y: min.y - grow_y,
        },
        Coord {
            x: max.x + grow_x,
            y: max.y + grow_y,
        },
    ))
}

/// Keep the part of a convex ring on `site`'s side of the bisector with `other`
fn clip_to_bisector(ring: &[Coord<f64>], site: Coord<f64>, other: Coord<f64>) -> Vec<Coord<f64>> {
    let normal = Coord {
        x: other.x - site.x,
        y: other.y - site.y,
    };
    let mid = Coord {
        x: (site.x + other.x) / 2.0,
        y: (site.y + other.y) / 2.0,
    };
    let side = |p: Coord<f64>| (p.x - mid.x) * normal.x + (p.y - mid.y) * normal.y;

    let mut clipped = Vec::with_capacity(ring.len() + 1);
    for (i, &current) in ring.iter().enumerate() {
        let previous = ring[(i + ring.len() - 1) % ring.len()];
        let (s_cur, s_prev) = (side(current), side(previous));
        if s_cur <= 0.0 {
            if s_prev > 0.0 {
                clipped.push(crossing(previous, current, s_prev, s_cur));
            }
            clipped.push(current);
        } else if s_prev <= 0.0 {
            clipped.push(crossing(previous, current, s_prev, s_cur));
        }
    }
    clipped
}

fn crossing(a: Coord<f64>, b: Coord<f64>, side_a: f64, side_b: f64) -> Coord<f64> {
    let t = side_a / (side_a - side_b);
    Coord {
        x: a.x + t * (b.x - a.x),
        y: a.y + t * (b.y - a.y),
    }
}

fn cell(extent: &Rect<f64>, site: Coord<f64>, neighbours: impl Iterator<Item = Coord<f64>>) -> Option<Vec<Coord<f64>>> {
    let mut ring = vec![
        extent.min(),
        Coord {
            x: extent.max().x,
            y: extent.min().y,
        },
        extent.max(),
        Coord {
            x: extent.min().x,
            y: extent.max().y,
        },
    ];
    for other in neighbours {
        ring = clip_to_bisector(&ring, site, other);
        if ring.len() < 3 {
            return None;
        }
    }
    Some(ring)
}

/// Cell corners seen so far.
///
/// Each cell is clipped on its own, so a corner shared by neighbouring cells
/// comes out a few ulps apart in each of them. Every corner is replaced by the
/// first pooled corner within a billionth of the extent diagonal.
struct VertexPool {
    tree: RTree<[f64; 2]>,
    tolerance_2: f64,
}

impl VertexPool {
    fn new(extent: &Rect<f64>) -> Self {
        let tolerance = extent.width().hypot(extent.height()) * 1e-9;
        Self {
            tree: RTree::new(),
            tolerance_2: tolerance * tolerance,
        }
    }

    fn shared(&mut self, c: Coord<f64>) -> Coord<f64> {
        let query = [c.x, c.y];
        if let Some(&[x, y]) = self.tree.locate_within_distance(query, self.tolerance_2).next() {
            return Coord { x, y };
        }
        self.tree.insert(query);
        c
    }

    /// Polygon over the pooled corners; `None` once the ring collapses
    fn polygon(&mut self, ring: Vec<Coord<f64>>) -> Option<Polygon<f64>> {
        let mut coords: Vec<Coord<f64>> = ring.into_iter().map(|c| self.shared(c)).collect();
        coords.dedup();
        if coords.len() > 1 && coords.first() == coords.last() {
            coords.pop();
        }
        if coords.len() < 3 {
            return None;
        }
        Some(Polygon::new(LineString::new(coords), vec![]))
    }
}

/// Build one Voronoi cell per distinct seed position, carrying the seed's attributes.
///
/// Seeds at an already-seen position are dropped, the first one wins.
pub fn voronoi_polygons(points: Layer<Point<f64>>, buffer_percent: f64) -> Layer<Polygon<f64>> {
    let mut output = Layer::derived("voronoi_polygons", &points);
    let positions: Vec<Point<f64>> = points.iter().map(|f| f.geometry).collect();
    let Some(extent) = tessellation_extent(&positions, buffer_percent) else {
        return output;
    };

    let mut triangulation: DelaunayTriangulation<Point2<f64>> = DelaunayTriangulation::new();
    // Seed feature per triangulation vertex index
    let mut owners: Vec<Option<usize>> = Vec::new();
    let mut rejected = 0usize;

    for (i, p) in positions.iter().enumerate() {
        match triangulation.insert(Point2::new(p.x(), p.y())) {
            Ok(handle) => {
                let index = handle.index();
                if owners.len() <= index {
                    owners.resize(index + 1, None);
                }
                if owners[index].is_none() {
                    owners[index] = Some(i);
                } else {
                    rejected += 1;
                }
            }
            Err(e) => {
                debug!("Seed {} rejected by triangulation: {:?}", i, e);
                rejected += 1;
            }
        }
    }
    if rejected > 0 {
        debug!("{} seeds share a position with an earlier seed", rejected);
    }

    // Output in seed order
    let mut pool = VertexPool::new(&extent);
    let mut cells: Vec<(usize, Polygon<f64>)> = Vec::with_capacity(triangulation.num_vertices());
    for vertex in triangulation.vertices() {
        let Some(seed) = owners.get(vertex.fix().index()).copied().flatten() else {
            continue;
        };
        let site = vertex.position();
        let neighbours = vertex.out_edges().map(|edge| {
            let p = edge.to().position();
            Coord { x: p.x, y: p.y }
        });
        let polygon = cell(&extent, Coord { x: site.x, y: site.y }, neighbours)
            .and_then(|ring| pool.polygon(ring));
        if let Some(polygon) = polygon {
            cells.push((seed, polygon));
        }
    }
    cells.sort_by_key(|(seed, _)| *seed);

    let mut features = points.features;
    for (seed, polygon) in cells {
        let attributes = std::mem::take(&mut features[seed].attributes);
        output.push(polygon, attributes);
    }

    info!("Built {} Voronoi cells", output.len());
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Attributes, FieldValue};
    use geo::Area;

    fn seeds(coords: &[(f64, f64)]) -> Layer<Point<f64>> {
        let mut layer = Layer::new("seeds");
        for (i, &(x, y)) in coords.iter().enumerate() {
            layer.push(Point::new(x, y), Attributes::new().with("seed", i as i64));
        }
        layer
    }

    #[test]
    fn test_cells_tile_the_extent() {
        let layer = seeds(&[(0.0, 0.0), (10.0, 0.0), (0.0, 10.0), (10.0, 10.0), (4.0, 6.0)]);
        let cells = voronoi_polygons(layer, 0.0);

        assert_eq!(cells.len(), 5);
        let total: f64 = cells.iter().map(|f| f.geometry.unsigned_area()).sum();
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_neighbouring_cells_share_corners() {
        // Bisector crossings land on thirds and sixths, which do not round evenly
        let layer = seeds(&[(0.0, 0.0), (40.0, 10.0), (100.0, 0.0), (90.0, 60.0), (10.0, 80.0), (55.0, 45.0)]);
        let cells = voronoi_polygons(layer, 0.0);
        assert_eq!(cells.len(), 6);

        let corners: Vec<&Coord<f64>> = cells.iter().flat_map(|f| f.geometry.exterior().0.iter()).collect();
        for a in &corners {
            for b in &corners {
                let apart = (a.x - b.x).hypot(a.y - b.y);
                assert!(apart == 0.0 || apart > 1e-6, "{:?} and {:?} nearly coincide", a, b);
            }
        }
    }

    #[test]
    fn test_two_seeds_split_at_bisector() {
        let cells = voronoi_polygons(seeds(&[(0.0, 0.0), (10.0, 4.0)]), 0.0);
        assert_eq!(cells.len(), 2);
        for f in cells.iter() {
            assert!((f.geometry.unsigned_area() - 20.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_duplicate_seed_dropped() {
        let cells = voronoi_polygons(seeds(&[(0.0, 0.0), (5.0, 5.0), (0.0, 0.0), (5.0, 0.0)]), 0.0);
        assert_eq!(cells.len(), 3);
        let kept: Vec<&FieldValue> = cells.iter().filter_map(|f| f.attributes.get("seed")).collect();
        assert_eq!(
            kept,
            vec![&FieldValue::Int(0), &FieldValue::Int(1), &FieldValue::Int(3)]
        );
    }

    #[test]
    fn test_collinear_seeds_get_padded_extent() {
        let cells = voronoi_polygons(seeds(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0)]), 0.0);
        assert_eq!(cells.len(), 3);
        let total: f64 = cells.iter().map(|f| f.geometry.unsigned_area()).sum();
        // 20 wide, padded by 10 on each side vertically
        assert!((total - 400.0).abs() < 1e-9);
    }

    #[test]
    fn test_buffer_grows_extent() {
        let extent = tessellation_extent(&[Point::new(0.0, 0.0), Point::new(10.0, 20.0)], 10.0).unwrap();
        assert_eq!(extent.min(), Coord { x: -1.0, y: -2.0 });
        assert_eq!(extent.max(), Coord { x: 11.0, y: 22.0 });
    }
}
