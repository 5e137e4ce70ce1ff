//! Error type shared by the engine and the pipeline.

use std::path::PathBuf;

use crate::pipeline::Stage;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("layer `{0}` has no features")]
    EmptyLayer(String),

    #[error("`Network_allocation` must be saved to a file, a temporary output is not supported")]
    TransientDestination,

    #[error("invalid category list `{0}`")]
    InvalidCategoryRange(String),

    #[error("no service point lies within {threshold} units of the road network")]
    NoCenters { threshold: f64 },

    #[error("feature {feature} in layer `{layer}` has no field `{field}`")]
    MissingField {
        layer: String,
        feature: u64,
        field: String,
    },

    #[error("field `{field}` of feature {feature} is not {expected}")]
    FieldType {
        field: String,
        feature: u64,
        expected: &'static str,
    },

    #[error("unsupported geometry `{kind}` in {path}")]
    UnsupportedGeometry { kind: String, path: PathBuf },

    #[error("invalid GeoJSON in {path}: {reason}")]
    GeoJson { path: PathBuf, reason: String },

    #[error("stage {stage} failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<Error>,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Persist(#[from] tempfile::PersistError),
}
