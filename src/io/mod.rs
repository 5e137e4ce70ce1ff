//! Reading inputs and writing outputs.

pub mod geojson;
pub mod summary;

use std::convert::Infallible;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tempfile::NamedTempFile;

pub use geojson::{read_lines, read_points, write_layer, LayerDigest, ToGeoJson};
pub use summary::{summarize, write_summary, SubnetSummary};

/// Temporary file next to `path`, persisted over it once fully written
pub(crate) fn staging_file(path: &Path) -> std::io::Result<NamedTempFile> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => NamedTempFile::new_in(parent),
        _ => NamedTempFile::new_in("."),
    }
}

/// Sentinel accepted in place of a path for an in-memory output
pub const TEMPORARY_OUTPUT: &str = "TEMPORARY_OUTPUT";

/// Where an output layer goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Kept in memory only
    Temporary,
    File(PathBuf),
}

impl Destination {
    pub fn is_temporary(&self) -> bool {
        matches!(self, Destination::Temporary)
    }
}

impl FromStr for Destination {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == TEMPORARY_OUTPUT || s.starts_with("memory:") {
            Ok(Destination::Temporary)
        } else {
            Ok(Destination::File(PathBuf::from(s)))
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Temporary => f.write_str(TEMPORARY_OUTPUT),
            Destination::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_sentinels() {
        assert_eq!("TEMPORARY_OUTPUT".parse::<Destination>().unwrap(), Destination::Temporary);
        assert_eq!("memory:zones".parse::<Destination>().unwrap(), Destination::Temporary);
        assert_eq!(
            "out/zones.geojson".parse::<Destination>().unwrap(),
            Destination::File(PathBuf::from("out/zones.geojson"))
        );
    }
}
