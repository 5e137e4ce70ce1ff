//! Network allocation: assign every arc to the nearest service point by network cost.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use geo::{Coord, LineString, MultiLineString, Point};
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::graph::{ArcKind, RoadGraph};
use super::snap::SnapIndex;
use crate::engine::linear::substring;
use crate::error::{Error, Result};
use crate::models::{Attributes, Layer};

/// Set of point categories allowed to act as centers, e.g. `1-100000` or `1-10,15`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "String")]
pub struct CategorySet {
    ranges: Vec<RangeInclusive<i64>>,
    source: String,
}

impl CategorySet {
    pub fn parse(source: &str) -> Result<Self> {
        let invalid = || Error::InvalidCategoryRange(source.to_string());
        let item = Regex::new(r"^\s*(-?\d+)\s*(?:-\s*(-?\d+)\s*)?$").map_err(|_| invalid())?;

        let mut ranges = Vec::new();
        for part in source.split(',') {
            let caps = item.captures(part).ok_or_else(invalid)?;
            let start: i64 = caps[1].parse().map_err(|_| invalid())?;
            let end: i64 = match caps.get(2) {
                Some(m) => m.as_str().parse().map_err(|_| invalid())?,
                None => start,
            };
            if end < start {
                return Err(invalid());
            }
            ranges.push(start..=end);
        }

        Ok(Self {
            ranges,
            source: source.trim().to_string(),
        })
    }

    pub fn contains(&self, cat: i64) -> bool {
        self.ranges.iter().any(|r| r.contains(&cat))
    }
}

impl Default for CategorySet {
    fn default() -> Self {
        Self {
            ranges: vec![1..=100_000],
            source: "1-100000".to_string(),
        }
    }
}

impl FromStr for CategorySet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CategorySet {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl fmt::Display for CategorySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AllocationParams {
    /// Maximum distance for connecting a point to the network, in map units
    pub threshold: f64,
    pub arc_types: Vec<ArcKind>,
    pub center_cats: CategorySet,
}

impl Default for AllocationParams {
    fn default() -> Self {
        Self {
            threshold: 500.0,
            arc_types: vec![ArcKind::Line, ArcKind::Boundary],
            center_cats: CategorySet::default(),
        }
    }
}

/// Dijkstra queue entry (min-heap via reversed ordering)
#[derive(Debug, Clone, Copy, PartialEq)]
struct State {
    cost: f64,
    cat: i64,
    node: usize,
}

impl Eq for State {}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.cat.cmp(&self.cat))
            .then_with(|| other.node.cmp(&self.node))
    }
}

/// Reached cost and owning category per node
type Reach = Option<(f64, i64)>;

fn improves(cost: f64, cat: i64, current: Reach) -> bool {
    match current {
        None => true,
        Some((c, k)) => cost < c || (cost == c && cat < k),
    }
}

/// Multi-source Dijkstra from every center
fn shortest_reach(graph: &RoadGraph, centers: &[(usize, i64)]) -> Vec<Reach> {
    let adjacency = graph.adjacency();
    let arcs = graph.arcs();
    let mut best: Vec<Reach> = vec![None; graph.node_count()];
    let mut heap = BinaryHeap::new();

    for &(node, cat) in centers {
        if improves(0.0, cat, best[node]) {
            best[node] = Some((0.0, cat));
            heap.push(State {
                cost: 0.0,
                cat,
                node,
            });
        }
    }

    while let Some(State { cost, cat, node }) = heap.pop() {
        if best[node] != Some((cost, cat)) {
            continue;
        }
        for &(arc, next) in &adjacency[node] {
            let next_cost = cost + arcs[arc].length;
            if improves(next_cost, cat, best[next]) {
                best[next] = Some((next_cost, cat));
                heap.push(State {
                    cost: next_cost,
                    cat,
                    node: next,
                });
            }
        }
    }

    best
}

/// Connect centers to the graph; returns `(node, category)` per connected center
fn connect_centers(
    graph: &mut RoadGraph,
    points: &Layer<Point<f64>>,
    params: &AllocationParams,
) -> Vec<(usize, i64)> {
    let index = SnapIndex::build(graph);

    // Snaps grouped per arc, in arc order for a deterministic split sequence
    let mut by_arc: BTreeMap<usize, Vec<(f64, usize)>> = BTreeMap::new();
    let mut snapped = Vec::new();

    for feature in points.iter() {
        let cat = feature.id as i64;
        if !params.center_cats.contains(cat) {
            debug!("Point {} is outside center categories {}", cat, params.center_cats);
            continue;
        }
        let location: Coord<f64> = feature.geometry.into();
        match index.nearest(location, params.threshold) {
            Some(snap) => {
                by_arc
                    .entry(snap.arc)
                    .or_default()
                    .push((snap.offset, snapped.len()));
                snapped.push((cat, location, snap));
            }
            None => warn!(
                "Point {} is farther than {} from the network, not allocated",
                cat, params.threshold
            ),
        }
    }

    let mut split_nodes = vec![0usize; snapped.len()];
    for (arc, entries) in by_arc {
        let offsets: Vec<f64> = entries.iter().map(|(offset, _)| *offset).collect();
        let nodes = graph.split_arc(arc, &offsets);
        for ((_, center), node) in entries.iter().zip(nodes) {
            split_nodes[*center] = node;
        }
    }

    let mut centers = Vec::with_capacity(snapped.len());
    for ((cat, location, snap), split_node) in snapped.into_iter().zip(split_nodes) {
        let on_network = graph.node(split_node);
        if snap.distance > 0.0 && location != on_network {
            let connector = LineString::new(vec![location, on_network]);
            if let Some(arc) = graph.add_arc(connector, true) {
                centers.push((graph.arcs()[arc].from, cat));
                continue;
            }
        }
        centers.push((split_node, cat));
    }
    centers
}

fn emit(output: &mut Layer<LineString<f64>>, geometry: LineString<f64>, cat: i64, cost: f64) {
    output.push(geometry, Attributes::new().with("cat", cat).with("cost", cost));
}

/// Allocate every road arc to its nearest connected point.
///
/// Output features carry `cat` (the owning point category) and `cost` (the
/// largest network cost from that point to any location on the feature).
/// Arcs no point can reach are left out.
pub fn allocate(
    points: &Layer<Point<f64>>,
    roads: &Layer<MultiLineString<f64>>,
    params: &AllocationParams,
) -> Result<Layer<LineString<f64>>> {
    if points.is_empty() {
        return Err(Error::EmptyLayer(points.name.clone()));
    }
    let mut graph = RoadGraph::build(roads, &params.arc_types);
    if graph.arcs().is_empty() {
        return Err(Error::EmptyLayer(roads.name.clone()));
    }

    let centers = connect_centers(&mut graph, points, params);
    if centers.is_empty() {
        return Err(Error::NoCenters {
            threshold: params.threshold,
        });
    }
    info!(
        "Connected {} of {} points to a network of {} arcs",
        centers.len(),
        points.len(),
        graph.arcs().len()
    );

    let reach = shortest_reach(&graph, &centers);

    let mut output = Layer::derived("network_allocation", roads);
    let mut unreachable = 0usize;

    for arc in graph.arcs() {
        let len = arc.length;
        match (reach[arc.from], reach[arc.to]) {
            (None, None) => unreachable += 1,
            (Some((du, cat)), None) => emit(&mut output, arc.geometry.clone(), cat, du + len),
            (None, Some((dv, cat))) => emit(&mut output, arc.geometry.clone(), cat, dv + len),
            (Some((du, cu)), Some((dv, cv))) if cu == cv => {
                let cost = ((du + dv + len) / 2.0).max(du.max(dv));
                emit(&mut output, arc.geometry.clone(), cu, cost);
            }
            (Some((du, cu)), Some((dv, cv))) => {
                // Point where both centers arrive at the same cost
                let t = ((dv + len - du) / 2.0).clamp(0.0, len);
                if let Some(piece) = substring(&arc.geometry, 0.0, t) {
                    emit(&mut output, piece, cu, du + t);
                }
                if let Some(piece) = substring(&arc.geometry, t, len) {
                    emit(&mut output, piece, cv, dv + (len - t));
                }
            }
        }
    }

    if unreachable > 0 {
        warn!("{} arcs are not reachable from any point", unreachable);
    }
    info!("Allocated {} network segments", output.len());
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FieldValue;

    fn line_roads(lines: Vec<Vec<(f64, f64)>>) -> Layer<MultiLineString<f64>> {
        let mut layer = Layer::new("roads");
        for line in lines {
            layer.push(
                MultiLineString::new(vec![LineString::from(line)]),
                Attributes::new(),
            );
        }
        layer
    }

    fn points(coords: Vec<(f64, f64)>) -> Layer<Point<f64>> {
        let mut layer = Layer::new("points");
        for (x, y) in coords {
            layer.push(Point::new(x, y), Attributes::new());
        }
        layer
    }

    fn cat(f: &crate::models::Feature<LineString<f64>>) -> i64 {
        f.attributes.get("cat").and_then(FieldValue::as_i64).unwrap()
    }

    #[test]
    fn test_category_set_parsing() {
        let set = CategorySet::parse("1-10, 15,20 - 30").unwrap();
        assert!(set.contains(1));
        assert!(set.contains(15));
        assert!(set.contains(25));
        assert!(!set.contains(11));
        assert!(CategorySet::parse("10-1").is_err());
        assert!(CategorySet::parse("a-b").is_err());
        assert!(CategorySet::default().contains(100_000));
        assert!(!CategorySet::default().contains(0));
    }

    #[test]
    fn test_two_points_split_shared_road() {
        let roads = line_roads(vec![vec![(0.0, 0.0), (100.0, 0.0)]]);
        let pts = points(vec![(0.0, 0.0), (100.0, 0.0)]);
        let out = allocate(&pts, &roads, &AllocationParams::default()).unwrap();

        assert_eq!(out.len(), 2);
        assert_eq!(cat(&out.features[0]), 1);
        assert_eq!(cat(&out.features[1]), 2);
        assert_eq!(
            out.features[0].geometry,
            LineString::from(vec![(0.0, 0.0), (50.0, 0.0)])
        );
        let cost = out.features[1].attributes.get("cost").and_then(FieldValue::as_f64);
        assert_eq!(cost, Some(50.0));
    }

    #[test]
    fn test_offset_point_gets_connector() {
        let roads = line_roads(vec![vec![(0.0, 0.0), (100.0, 0.0)]]);
        let pts = points(vec![(30.0, 10.0)]);
        let out = allocate(&pts, &roads, &AllocationParams::default()).unwrap();

        // Two road pieces either side of the snap plus the connector
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|f| cat(f) == 1));
        assert!(out
            .iter()
            .any(|f| f.geometry == LineString::from(vec![(30.0, 10.0), (30.0, 0.0)])));
    }

    #[test]
    fn test_far_points_and_empty_inputs() {
        let roads = line_roads(vec![vec![(0.0, 0.0), (100.0, 0.0)]]);
        let pts = points(vec![(0.0, 1000.0)]);
        assert!(matches!(
            allocate(&pts, &roads, &AllocationParams::default()),
            Err(Error::NoCenters { .. })
        ));
        assert!(matches!(
            allocate(&points(vec![]), &roads, &AllocationParams::default()),
            Err(Error::EmptyLayer(_))
        ));
    }

    #[test]
    fn test_disconnected_arcs_are_dropped() {
        let roads = line_roads(vec![
            vec![(0.0, 0.0), (100.0, 0.0)],
            vec![(0.0, 200.0), (100.0, 200.0)],
        ]);
        let pts = points(vec![(0.0, 0.0)]);
        let out = allocate(&pts, &roads, &AllocationParams::default()).unwrap();
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_center_categories_filter_points() {
        let roads = line_roads(vec![vec![(0.0, 0.0), (100.0, 0.0)]]);
        let pts = points(vec![(0.0, 0.0), (100.0, 0.0)]);
        let params = AllocationParams {
            center_cats: CategorySet::parse("2").unwrap(),
            ..AllocationParams::default()
        };
        let out = allocate(&pts, &roads, &params).unwrap();
        assert!(out.iter().all(|f| cat(f) == 2));
    }

    fn cost(f: &crate::models::Feature<LineString<f64>>) -> f64 {
        f.attributes.get("cost").and_then(FieldValue::as_f64).unwrap()
    }

    #[test]
    fn test_loop_arc_reached_from_both_ends() {
        let roads = line_roads(vec![
            vec![(0.0, 0.0), (100.0, 0.0)],
            vec![(100.0, 0.0), (100.0, 100.0)],
            vec![(100.0, 100.0), (0.0, 0.0)],
        ]);
        let out = allocate(&points(vec![(0.0, 0.0)]), &roads, &AllocationParams::default()).unwrap();
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|f| cat(f) == 1));

        // The far side is entered at 100 and at the diagonal; the costliest spot is inside it
        let far = out
            .iter()
            .find(|f| f.geometry == LineString::from(vec![(100.0, 0.0), (100.0, 100.0)]))
            .unwrap();
        let diagonal = 20000f64.sqrt();
        assert!((cost(far) - (100.0 + diagonal + 100.0) / 2.0).abs() < 1e-9);
        assert!((cost(far) - 170.710678).abs() < 1e-6);
    }

    #[test]
    fn test_uneven_centers_split_at_equal_cost() {
        let roads = line_roads(vec![
            vec![(0.0, 0.0), (100.0, 0.0)],
            vec![(100.0, 0.0), (200.0, 0.0)],
        ]);
        let pts = points(vec![(0.0, 0.0), (160.0, 0.0)]);
        let out = allocate(&pts, &roads, &AllocationParams::default()).unwrap();

        // 1 covers 80 from the west, 2 covers 60 + 20 from the east
        assert_eq!(
            out.features[0].geometry,
            LineString::from(vec![(0.0, 0.0), (80.0, 0.0)])
        );
        assert_eq!((cat(&out.features[0]), cost(&out.features[0])), (1, 80.0));
        assert_eq!(
            out.features[1].geometry,
            LineString::from(vec![(80.0, 0.0), (100.0, 0.0)])
        );
        assert_eq!((cat(&out.features[1]), cost(&out.features[1])), (2, 80.0));
        assert!(out.iter().skip(2).all(|f| cat(f) == 2));
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn test_equal_cost_node_goes_to_lower_category() {
        let roads = line_roads(vec![
            vec![(0.0, 0.0), (100.0, 0.0)],
            vec![(100.0, 0.0), (200.0, 0.0)],
            vec![(100.0, 0.0), (100.0, 50.0)],
        ]);
        // Category 2 sits west, category 1 east; both reach (100, 0) at 100
        let pts = points(vec![(200.0, 0.0), (0.0, 0.0)]);
        let out = allocate(&pts, &roads, &AllocationParams::default()).unwrap();

        let spur = out
            .iter()
            .find(|f| f.geometry == LineString::from(vec![(100.0, 0.0), (100.0, 50.0)]))
            .unwrap();
        assert_eq!(cat(spur), 1);
        assert_eq!(cost(spur), 150.0);

        let west = out
            .iter()
            .find(|f| f.geometry == LineString::from(vec![(0.0, 0.0), (100.0, 0.0)]))
            .unwrap();
        assert_eq!((cat(west), cost(west)), (2, 100.0));
    }
}
