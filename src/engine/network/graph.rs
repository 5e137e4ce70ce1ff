//! Road network graph: nodes at arc endpoints, arcs carrying their full geometry.

use geo::{Coord, Euclidean, Length, LineString, MultiLineString};
use hashbrown::HashMap;
use serde::Deserialize;
use tracing::debug;

use crate::engine::linear::{interpolate, substring};
use crate::models::{FieldValue, Layer};

/// Kind of network arc, selected by the road property `arc_type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArcKind {
    Line,
    Boundary,
}

impl ArcKind {
    pub fn from_field(value: Option<&FieldValue>) -> Self {
        match value {
            Some(FieldValue::Text(s)) if s.eq_ignore_ascii_case("boundary") => ArcKind::Boundary,
            _ => ArcKind::Line,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NetworkArc {
    pub from: usize,
    pub to: usize,
    pub geometry: LineString<f64>,
    pub length: f64,
    /// Added to link a service point to the network
    pub connector: bool,
}

#[derive(Debug, Default)]
pub struct RoadGraph {
    nodes: Vec<Coord<f64>>,
    node_lookup: HashMap<(u64, u64), usize>,
    arcs: Vec<NetworkArc>,
}

fn coord_key(c: Coord<f64>) -> (u64, u64) {
    // Fold -0.0 into 0.0 so both spellings land on one node
    let bits = |v: f64| if v == 0.0 { 0.0f64.to_bits() } else { v.to_bits() };
    (bits(c.x), bits(c.y))
}

impl RoadGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph from every road part whose kind is in `kinds`
    pub fn build(roads: &Layer<MultiLineString<f64>>, kinds: &[ArcKind]) -> Self {
        let mut graph = Self::new();
        let mut skipped = 0usize;

        for feature in roads.iter() {
            let kind = ArcKind::from_field(feature.attributes.get("arc_type"));
            if !kinds.contains(&kind) {
                skipped += 1;
                continue;
            }
            for part in &feature.geometry.0 {
                let mut coords = part.0.clone();
                coords.dedup();
                if graph.add_arc(LineString::new(coords), false).is_none() {
                    debug!("Skipping degenerate part of road feature {}", feature.id);
                }
            }
        }

        debug!(
            "Road graph: {} nodes, {} arcs ({} features filtered by arc type)",
            graph.nodes.len(),
            graph.arcs.len(),
            skipped
        );
        graph
    }

    fn node_at(&mut self, c: Coord<f64>) -> usize {
        let next = self.nodes.len();
        let id = *self.node_lookup.entry(coord_key(c)).or_insert(next);
        if id == next {
            self.nodes.push(c);
        }
        id
    }

    /// Add an arc; returns `None` for geometries with fewer than two points
    pub fn add_arc(&mut self, geometry: LineString<f64>, connector: bool) -> Option<usize> {
        let first = *geometry.0.first()?;
        let last = *geometry.0.last()?;
        if geometry.0.len() < 2 {
            return None;
        }
        let from = self.node_at(first);
        let to = self.node_at(last);
        let length = Euclidean.length(&geometry);
        self.arcs.push(NetworkArc {
            from,
            to,
            geometry,
            length,
            connector,
        });
        Some(self.arcs.len() - 1)
    }

    /// Split an arc at the given offsets along it.
    ///
    /// Returns the node for each offset, in the order given. Offsets at or
    /// beyond the ends map to the end nodes. The first piece keeps the arc's
    /// index and the remaining pieces are appended, so other arc indices stay valid.
    pub fn split_arc(&mut self, arc: usize, offsets: &[f64]) -> Vec<usize> {
        let original = self.arcs[arc].clone();

        let node_for = |graph: &mut Self, offset: f64| -> usize {
            if offset <= 0.0 {
                original.from
            } else if offset >= original.length {
                original.to
            } else {
                match interpolate(&original.geometry, offset) {
                    Some(c) => graph.node_at(c),
                    None => original.from,
                }
            }
        };

        let nodes: Vec<usize> = offsets.iter().map(|&o| node_for(self, o)).collect();

        let mut cuts: Vec<(f64, usize)> = offsets
            .iter()
            .zip(&nodes)
            .filter(|(o, _)| **o > 0.0 && **o < original.length)
            .map(|(&o, &n)| (o, n))
            .collect();
        cuts.sort_by(|a, b| a.0.total_cmp(&b.0));
        cuts.dedup_by(|a, b| a.1 == b.1);

        if cuts.is_empty() {
            return nodes;
        }

        let mut bounds = Vec::with_capacity(cuts.len() + 2);
        bounds.push((0.0, original.from));
        bounds.extend(cuts);
        bounds.push((original.length, original.to));

        let mut pieces = Vec::new();
        for pair in bounds.windows(2) {
            let ((start, from), (end, to)) = (pair[0], pair[1]);
            if let Some(mut piece) = substring(&original.geometry, start, end) {
                // Pin piece ends to the node coordinates so adjacency stays exact
                let n = piece.0.len();
                piece.0[0] = self.nodes[from];
                piece.0[n - 1] = self.nodes[to];
                let length = Euclidean.length(&piece);
                pieces.push(NetworkArc {
                    from,
                    to,
                    geometry: piece,
                    length,
                    connector: original.connector,
                });
            }
        }

        let mut pieces = pieces.into_iter();
        if let Some(first) = pieces.next() {
            self.arcs[arc] = first;
        }
        self.arcs.extend(pieces);
        nodes
    }

    /// For every node, the arcs touching it and the node at their other end
    pub fn adjacency(&self) -> Vec<Vec<(usize, usize)>> {
        let mut adjacency = vec![Vec::new(); self.nodes.len()];
        for (i, arc) in self.arcs.iter().enumerate() {
            adjacency[arc.from].push((i, arc.to));
            if arc.to != arc.from {
                adjacency[arc.to].push((i, arc.from));
            }
        }
        adjacency
    }

    pub fn node(&self, id: usize) -> Coord<f64> {
        self.nodes[id]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn arcs(&self) -> &[NetworkArc] {
        &self.arcs
    }
}
