//! Core data models shared by the engine and the pipeline.

pub mod field;
pub mod layer;

pub use field::{Attributes, FieldValue};
pub use layer::{Feature, Layer};
