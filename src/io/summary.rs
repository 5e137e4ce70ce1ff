//! Per-zone summary table.

use std::collections::BTreeMap;
use std::path::Path;

use geo::{Area, Euclidean, Length, LineString, MultiPolygon};
use serde::Serialize;
use tracing::info;

use super::staging_file;
use crate::error::Result;
use crate::models::{FieldValue, Layer};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubnetSummary {
    pub cat: i64,
    pub arcs: usize,
    pub network_length: f64,
    pub max_cost: f64,
    pub area: f64,
}

impl SubnetSummary {
    fn new(cat: i64) -> Self {
        Self {
            cat,
            arcs: 0,
            network_length: 0.0,
            max_cost: 0.0,
            area: 0.0,
        }
    }
}

/// Combine the allocated network and the dissolved areas into one row per category, sorted by `cat`
pub fn summarize(
    allocation: &Layer<LineString<f64>>,
    areas: &Layer<MultiPolygon<f64>>,
) -> Vec<SubnetSummary> {
    let mut rows: BTreeMap<i64, SubnetSummary> = BTreeMap::new();

    for feature in allocation.iter() {
        let Some(cat) = feature.attributes.get("cat").and_then(FieldValue::as_i64) else {
            continue;
        };
        let row = rows.entry(cat).or_insert_with(|| SubnetSummary::new(cat));
        row.arcs += 1;
        row.network_length += Euclidean.length(&feature.geometry);
        if let Some(cost) = feature.attributes.get("cost").and_then(FieldValue::as_f64) {
            row.max_cost = row.max_cost.max(cost);
        }
    }

    for feature in areas.iter() {
        let Some(cat) = feature.attributes.get("cat").and_then(FieldValue::as_i64) else {
            continue;
        };
        rows.entry(cat)
            .or_insert_with(|| SubnetSummary::new(cat))
            .area += feature.geometry.unsigned_area();
    }

    rows.into_values().collect()
}

pub fn write_summary(rows: &[SubnetSummary], path: &Path) -> Result<()> {
    let tmp = staging_file(path)?;
    {
        let mut writer = csv::Writer::from_writer(tmp.as_file());
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
    }
    tmp.persist(path)?;
    info!("Wrote summary for {} zones to {}", rows.len(), path.display());
    Ok(())
}
