//! Subnet areas: partition a road network around service points and derive
//! one polygon zone per point.
//!
//! The library exposes the geoprocessing engine, GeoJSON I/O and the
//! sixteen-stage pipeline driven by the `subnet-areas` binary.

pub mod engine;
pub mod error;
pub mod io;
pub mod models;
pub mod pipeline;
pub mod report;

pub use error::{Error, Result};
pub use io::Destination;
pub use models::{Attributes, Feature, FieldValue, Layer};
pub use pipeline::{CancellationToken, Feedback, Inputs, OutputName, Outputs, Pipeline, PipelineParams, Stage};
