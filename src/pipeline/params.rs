use serde::Deserialize;

use crate::engine::network::AllocationParams;

/// Tunables for a run. Every section falls back to its defaults when omitted.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct PipelineParams {
    pub allocation: AllocationParams,
    pub segments: SegmentParams,
    pub seeds: SeedParams,
    pub voronoi: VoronoiParams,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SegmentParams {
    /// Fraction removed from segments that touch more than one zone
    pub boundary_shrink: f64,
}

impl Default for SegmentParams {
    fn default() -> Self {
        Self {
            boundary_shrink: 0.005,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SeedParams {
    /// Decimal places kept when comparing seed coordinates
    pub precision: u32,
}

impl Default for SeedParams {
    fn default() -> Self {
        Self { precision: 1 }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct VoronoiParams {
    /// Extent growth, in percent of the seeds' bounding box
    pub buffer: f64,
}
