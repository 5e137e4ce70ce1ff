//! Geoprocessing operations used by the subnet-area pipeline.

pub mod calculator;
pub mod dedup;
pub mod dissolve;
pub mod explode;
pub mod geometry;
pub mod join;
pub mod linear;
pub mod network;
pub mod vertices;
pub mod voronoi;
