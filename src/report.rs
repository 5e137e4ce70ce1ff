//! Run report: what each stage did and how long it took.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::io::staging_file;
use crate::pipeline::Stage;

#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub index: usize,
    pub name: String,
    pub features: usize,
    pub millis: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub canceled: bool,
    pub stages: Vec<StageReport>,
    /// xxh64 digests of the written outputs, hex encoded
    pub digests: BTreeMap<String, String>,
}

impl RunReport {
    pub fn start() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            canceled: false,
            stages: Vec::new(),
            digests: BTreeMap::new(),
        }
    }

    pub fn record(&mut self, stage: Stage, features: usize, elapsed: Duration) {
        self.stages.push(StageReport {
            index: stage.index(),
            name: stage.to_string(),
            features,
            millis: elapsed.as_secs_f64() * 1000.0,
        });
    }

    pub fn record_digest(&mut self, output: &str, digest: u64) {
        self.digests.insert(output.to_string(), format!("{:016x}", digest));
    }

    pub fn finish(&mut self, canceled: bool) {
        self.canceled = canceled;
        self.finished_at = Some(Utc::now());
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let tmp = staging_file(path)?;
        serde_json::to_writer_pretty(tmp.as_file(), self)?;
        tmp.persist(path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_serializes_stages() {
        let mut report = RunReport::start();
        report.record(Stage::NetworkAllocation, 12, Duration::from_millis(3));
        report.record_digest("Network_allocation", 0xabc);
        report.finish(false);

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["stages"][0]["index"], 1);
        assert_eq!(value["stages"][0]["name"], "Network allocation");
        assert_eq!(value["digests"]["Network_allocation"], "0000000000000abc");
        assert_eq!(value["canceled"], false);
    }
}
