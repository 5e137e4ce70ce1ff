//! Subnet areas command line tool.
//!
//! Reads a point layer and a road layer, allocates the network to the points
//! and writes the allocated network plus one dissolved area per point.

mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use subnet_areas::engine::network::CategorySet;
use subnet_areas::io::{read_lines, read_points, summarize, write_summary, TEMPORARY_OUTPUT};
use subnet_areas::{CancellationToken, Destination, Inputs, Pipeline, PipelineParams};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "subnet-areas")]
#[command(about = "Create areas closest to each point along a road network")]
struct Args {
    /// Point layer (GeoJSON) holding the service points
    #[arg(long)]
    points: PathBuf,

    /// Road layer (GeoJSON) with LineString or MultiLineString features
    #[arg(long)]
    roads: PathBuf,

    /// Allocated network output; must be a file
    #[arg(long)]
    network_allocation: Destination,

    /// Subnet area output, or TEMPORARY_OUTPUT to keep it in memory
    #[arg(long, default_value = TEMPORARY_OUTPUT)]
    subnet_areas: Destination,

    /// TOML file with run parameters
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Maximum distance between a point and the network
    #[arg(long)]
    threshold: Option<f64>,

    /// Point categories allowed as centers, e.g. "1-100000" or "1-10,15"
    #[arg(long)]
    center_cats: Option<CategorySet>,

    /// Fraction trimmed from segments that touch two zones
    #[arg(long)]
    boundary_shrink: Option<f64>,

    /// Per-zone summary CSV (optional)
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Run report JSON (optional)
    #[arg(long)]
    report: Option<PathBuf>,
}

impl Args {
    fn params(&self) -> Result<PipelineParams> {
        let mut params = match &self.config {
            Some(path) => config::load_from_file(path)?,
            None => PipelineParams::default(),
        };
        if let Some(threshold) = self.threshold {
            params.allocation.threshold = threshold;
        }
        if let Some(cats) = &self.center_cats {
            params.allocation.center_cats = cats.clone();
        }
        if let Some(shrink) = self.boundary_shrink {
            params.segments.boundary_shrink = shrink;
        }
        Ok(params)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    info!("Subnet Areas");
    info!("Points: {}", args.points.display());
    info!("Roads: {}", args.roads.display());

    let params = args.params()?;
    let inputs = Inputs {
        points: read_points(&args.points).context("Failed to read points layer")?,
        roads: read_lines(&args.roads).context("Failed to read roads layer")?,
        network_allocation: args.network_allocation.clone(),
        subnet_areas: args.subnet_areas.clone(),
    };

    // Ctrl-C cancels at the next stage boundary
    let token = CancellationToken::new();
    let watcher = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current stage");
            watcher.cancel();
        }
    });

    let pipeline = Pipeline::new(params);
    let mut feedback = token;
    let outputs = tokio::task::spawn_blocking(move || pipeline.run(&inputs, &mut feedback))
        .await
        .context("Pipeline task failed")??;

    if let Some(path) = &args.report {
        outputs.report.write(path).context("Failed to write run report")?;
        info!("Run report written to {}", path.display());
    }

    if outputs.is_empty() {
        warn!("Run canceled, no outputs produced");
        return Ok(());
    }

    if let (Some(path), Some(allocation), Some(areas)) = (
        &args.summary,
        outputs.network_allocation(),
        outputs.subnet_areas(),
    ) {
        let rows = summarize(allocation, areas);
        write_summary(&rows, path).context("Failed to write summary")?;
    }

    for name in outputs.keys() {
        if let Some(output) = outputs.get(name) {
            info!("{}: {} ({:016x})", name, output.destination, output.digest);
        }
    }
    if let Some(areas) = outputs.subnet_areas() {
        info!("{} subnet areas", areas.len());
    }
    Ok(())
}
