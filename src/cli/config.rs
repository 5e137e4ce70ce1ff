use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use subnet_areas::PipelineParams;

/// Load run parameters from a TOML file with optional
/// `[allocation]`, `[segments]`, `[seeds]` and `[voronoi]` sections
pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<PipelineParams> {
    let content = fs::read_to_string(path).context("Failed to read config file")?;
    let params: PipelineParams = toml::from_str(&content).context("Failed to parse config file")?;
    Ok(params)
}
