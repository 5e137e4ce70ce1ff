//! Road network allocation.
//!
//! Builds a graph from the road layer, snaps service points onto it within a
//! distance threshold and assigns every arc to its nearest point by network cost.

mod allocate;
mod graph;
mod snap;

pub use allocate::{allocate, AllocationParams, CategorySet};
pub use graph::{ArcKind, NetworkArc, RoadGraph};
pub use snap::{Snap, SnapIndex};
