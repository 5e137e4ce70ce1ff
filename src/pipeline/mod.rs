//! The subnet-area pipeline.
//!
//! Sixteen stages run strictly in order, each consuming the previous stage's
//! layer. Cancellation is polled after every stage; a canceled run reports no
//! outputs and never writes `Subnet_areas`.

pub mod centering;
mod feedback;
pub mod normalize;
mod params;
pub mod seeds;
mod stage;

use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use geo::{LineString, MultiLineString, MultiPolygon, Point};
use tracing::{info, info_span, warn};

pub use feedback::{CancellationToken, Feedback};
pub use params::{PipelineParams, SeedParams, SegmentParams, VoronoiParams};
pub use stage::Stage;

use crate::engine::calculator::calculate_field;
use crate::engine::dedup::remove_duplicates_by_fields;
use crate::engine::dissolve::dissolve;
use crate::engine::explode::explode_lines;
use crate::engine::geometry::{line_from_fields, EndpointFields};
use crate::engine::join::join_unique_count;
use crate::engine::network::allocate;
use crate::engine::vertices::extract_vertices;
use crate::engine::voronoi::voronoi_polygons;
use crate::error::{Error, Result};
use crate::io::geojson::{encode_layer, write_layer, LayerDigest, ToGeoJson};
use crate::io::Destination;
use crate::models::Layer;
use crate::report::RunReport;
use centering::{endpoint, Axis, End};

/// Input layers and output destinations of a run
#[derive(Debug, Clone)]
pub struct Inputs {
    pub points: Layer<Point<f64>>,
    pub roads: Layer<MultiLineString<f64>>,
    pub network_allocation: Destination,
    pub subnet_areas: Destination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OutputName {
    NetworkAllocation,
    SubnetAreas,
}

impl OutputName {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputName::NetworkAllocation => "Network_allocation",
            OutputName::SubnetAreas => "Subnet_areas",
        }
    }
}

impl fmt::Display for OutputName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub enum OutputLayer {
    NetworkAllocation(Layer<LineString<f64>>),
    SubnetAreas(Layer<MultiPolygon<f64>>),
}

#[derive(Debug, Clone)]
pub struct Output {
    pub destination: Destination,
    pub layer: OutputLayer,
    pub digest: LayerDigest,
}

/// Result mapping of a run. Empty when the run was canceled.
#[derive(Debug, Clone)]
pub struct Outputs {
    entries: BTreeMap<OutputName, Output>,
    pub report: RunReport,
}

impl Outputs {
    fn canceled(mut report: RunReport) -> Self {
        report.finish(true);
        Self {
            entries: BTreeMap::new(),
            report,
        }
    }

    pub fn get(&self, name: OutputName) -> Option<&Output> {
        self.entries.get(&name)
    }

    pub fn keys(&self) -> impl Iterator<Item = OutputName> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn network_allocation(&self) -> Option<&Layer<LineString<f64>>> {
        match &self.get(OutputName::NetworkAllocation)?.layer {
            OutputLayer::NetworkAllocation(layer) => Some(layer),
            OutputLayer::SubnetAreas(_) => None,
        }
    }

    pub fn subnet_areas(&self) -> Option<&Layer<MultiPolygon<f64>>> {
        match &self.get(OutputName::SubnetAreas)?.layer {
            OutputLayer::SubnetAreas(layer) => Some(layer),
            OutputLayer::NetworkAllocation(_) => None,
        }
    }

    pub fn digest(&self, name: OutputName) -> Option<LayerDigest> {
        self.get(name).map(|o| o.digest)
    }
}

/// Anything a stage produces that can be counted for the report
trait StageOutput {
    fn feature_count(&self) -> usize;
}

impl<G> StageOutput for Layer<G> {
    fn feature_count(&self) -> usize {
        self.len()
    }
}

impl<G> StageOutput for (Layer<G>, LayerDigest) {
    fn feature_count(&self) -> usize {
        self.0.len()
    }
}

/// Persist a layer to its destination, returning its digest
fn store<G: ToGeoJson>(layer: &Layer<G>, destination: &Destination) -> Result<LayerDigest> {
    match destination {
        Destination::Temporary => Ok(encode_layer(layer)?.1),
        Destination::File(path) => write_layer(layer, path),
    }
}

struct Run<'f, F: Feedback> {
    feedback: &'f mut F,
    report: RunReport,
}

impl<F: Feedback> Run<'_, F> {
    /// Run one stage, then honor cancellation. `None` means the run was canceled.
    fn step<T: StageOutput>(
        &mut self,
        stage: Stage,
        work: impl FnOnce() -> Result<T>,
    ) -> Result<Option<T>> {
        let span = info_span!("stage", index = stage.index(), stage = stage.name());
        let _guard = span.enter();

        let started = Instant::now();
        let output = work().map_err(|source| Error::Stage {
            stage,
            source: Box::new(source),
        })?;
        let elapsed = started.elapsed();

        info!(
            "{} produced {} features in {:.2?}",
            stage,
            output.feature_count(),
            elapsed
        );
        self.report.record(stage, output.feature_count(), elapsed);

        self.feedback.set_current_step(stage.index());
        if self.feedback.is_canceled() {
            warn!("Run canceled after stage {} ({})", stage.index(), stage);
            return Ok(None);
        }
        Ok(Some(output))
    }
}

pub struct Pipeline {
    params: PipelineParams,
}

impl Pipeline {
    pub fn new(params: PipelineParams) -> Self {
        Self { params }
    }

    pub fn run<F: Feedback>(&self, inputs: &Inputs, feedback: &mut F) -> Result<Outputs> {
        if inputs.network_allocation.is_temporary() {
            return Err(Error::TransientDestination);
        }

        let params = &self.params;
        let mut run = Run {
            feedback,
            report: RunReport::start(),
        };

        info!(
            "Subnet areas: {} points, {} roads",
            inputs.points.len(),
            inputs.roads.len()
        );

        let Some((allocation, allocation_digest)) = run.step(Stage::NetworkAllocation, || {
            let layer = allocate(&inputs.points, &inputs.roads, &params.allocation)?;
            let digest = store(&layer, &inputs.network_allocation)?;
            Ok((layer, digest))
        })?
        else {
            return Ok(Outputs::canceled(run.report));
        };

        let Some(segments) = run.step(Stage::ExplodeLines, || Ok(explode_lines(allocation.clone())))? else {
            return Ok(Outputs::canceled(run.report));
        };

        let Some(vertices) = run.step(Stage::ExtractVertices, || Ok(extract_vertices(segments.clone())))? else {
            return Ok(Outputs::canceled(run.report));
        };

        let Some(joined) = run.step(Stage::JoinByLocationSummary, || {
            Ok(join_unique_count(segments, &vertices, "cat", "cat_unique"))
        })?
        else {
            return Ok(Outputs::canceled(run.report));
        };
        drop(vertices);

        let shrink = params.segments.boundary_shrink;
        let Some(measured) = run.step(Stage::OutLength, || {
            calculate_field(joined, "outlen", |layer, f| normalize::outlen(layer, f, shrink))
        })?
        else {
            return Ok(Outputs::canceled(run.report));
        };

        let mut centered = measured;
        for (stage, field, end, axis) in [
            (Stage::StartX, "x0", End::Start, Axis::X),
            (Stage::StartY, "y0", End::Start, Axis::Y),
            (Stage::EndX, "x1", End::End, Axis::X),
            (Stage::EndY, "y1", End::End, Axis::Y),
        ] {
            let Some(next) = run.step(stage, || {
                calculate_field(centered, field, |layer, f| endpoint(layer, f, end, axis))
            })?
            else {
                return Ok(Outputs::canceled(run.report));
            };
            centered = next;
        }

        let Some(lines) = run.step(Stage::GeometryByExpression, || {
            line_from_fields(
                centered,
                EndpointFields {
                    start_x: "x1",
                    start_y: "y1",
                    end_x: "x0",
                    end_y: "y0",
                },
            )
        })?
        else {
            return Ok(Outputs::canceled(run.report));
        };

        let Some(mut seeds) = run.step(Stage::ExtractSeedVertices, || Ok(extract_vertices(lines)))? else {
            return Ok(Outputs::canceled(run.report));
        };

        let precision = params.seeds.precision;
        for (stage, field, axis) in [(Stage::SeedX, "x", Axis::X), (Stage::SeedY, "y", Axis::Y)] {
            let Some(next) = run.step(stage, || {
                calculate_field(seeds, field, |_, f| {
                    Ok(self::seeds::rounded_coordinate(f, axis, precision))
                })
            })?
            else {
                return Ok(Outputs::canceled(run.report));
            };
            seeds = next;
        }

        let Some(unique) = run.step(Stage::DeleteDuplicates, || {
            Ok(remove_duplicates_by_fields(seeds, &["cat_unique", "x", "y"]))
        })?
        else {
            return Ok(Outputs::canceled(run.report));
        };

        let buffer = params.voronoi.buffer;
        let Some(cells) = run.step(Stage::VoronoiPolygons, || Ok(voronoi_polygons(unique, buffer)))? else {
            return Ok(Outputs::canceled(run.report));
        };

        let Some(areas) = run.step(Stage::Dissolve, || Ok(dissolve(cells, &["cat"])))? else {
            return Ok(Outputs::canceled(run.report));
        };

        let areas_digest = store(&areas, &inputs.subnet_areas).map_err(|source| Error::Stage {
            stage: Stage::Dissolve,
            source: Box::new(source),
        })?;

        let mut report = run.report;
        report.record_digest(OutputName::NetworkAllocation.as_str(), allocation_digest);
        report.record_digest(OutputName::SubnetAreas.as_str(), areas_digest);
        report.finish(false);

        info!(
            "Produced {} subnet areas from {} allocated segments",
            areas.len(),
            allocation.len()
        );

        let mut entries = BTreeMap::new();
        entries.insert(
            OutputName::NetworkAllocation,
            Output {
                destination: inputs.network_allocation.clone(),
                layer: OutputLayer::NetworkAllocation(allocation),
                digest: allocation_digest,
            },
        );
        entries.insert(
            OutputName::SubnetAreas,
            Output {
                destination: inputs.subnet_areas.clone(),
                layer: OutputLayer::SubnetAreas(areas),
                digest: areas_digest,
            },
        );
        Ok(Outputs { entries, report })
    }
}
