use std::fmt;

/// The sixteen pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    NetworkAllocation,
    ExplodeLines,
    ExtractVertices,
    JoinByLocationSummary,
    OutLength,
    StartX,
    StartY,
    EndX,
    EndY,
    GeometryByExpression,
    ExtractSeedVertices,
    SeedX,
    SeedY,
    DeleteDuplicates,
    VoronoiPolygons,
    Dissolve,
}

impl Stage {
    pub const ALL: [Stage; 16] = [
        Stage::NetworkAllocation,
        Stage::ExplodeLines,
        Stage::ExtractVertices,
        Stage::JoinByLocationSummary,
        Stage::OutLength,
        Stage::StartX,
        Stage::StartY,
        Stage::EndX,
        Stage::EndY,
        Stage::GeometryByExpression,
        Stage::ExtractSeedVertices,
        Stage::SeedX,
        Stage::SeedY,
        Stage::DeleteDuplicates,
        Stage::VoronoiPolygons,
        Stage::Dissolve,
    ];

    /// 1-based position, the step number reported to feedback once the stage completes
    pub fn index(self) -> usize {
        self as usize + 1
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::NetworkAllocation => "Network allocation",
            Stage::ExplodeLines => "Explode lines",
            Stage::ExtractVertices => "Extract vertices",
            Stage::JoinByLocationSummary => "Join attributes by location (summary)",
            Stage::OutLength => "outlen",
            Stage::StartX => "x0",
            Stage::StartY => "y0",
            Stage::EndX => "x1",
            Stage::EndY => "y1",
            Stage::GeometryByExpression => "Geometry by expression",
            Stage::ExtractSeedVertices => "Extract vertices 2",
            Stage::SeedX => "x",
            Stage::SeedY => "y",
            Stage::DeleteDuplicates => "Delete duplicates by attribute",
            Stage::VoronoiPolygons => "Voronoi polygons",
            Stage::Dissolve => "Dissolve",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_follow_execution_order() {
        let indices: Vec<usize> = Stage::ALL.iter().map(|s| s.index()).collect();
        assert_eq!(indices, (1..=16).collect::<Vec<_>>());
        assert_eq!(Stage::Dissolve.to_string(), "Dissolve");
    }
}
