use std::{fmt, time::Duration};

use gridtree_core::{containers::PointSet, Result};
use log::debug;
use rayon::prelude::*;

use crate::{
    acceleration_structures::{Octree, OctreeParameters, AUTO_MAX_DEPTH},
    uniform_grid::{GridParameters, UniformGrid},
};

/// The kind of structure a [StatsReport] describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StructureKind {
    UniformGrid,
    Octree,
}

impl fmt::Display for StructureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructureKind::UniformGrid => write!(f, "Uniform grid"),
            StructureKind::Octree => write!(f, "Octree"),
        }
    }
}

/// Descriptive statistics of a single spatial index. Occupancy values only consider occupied cells or leaves
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatsReport {
    pub kind: StructureKind,
    /// Cells of the dense grid, or nodes of the octree
    pub total_count: usize,
    /// Terminal cells: every grid cell, or the leaves of the octree
    pub leaf_count: usize,
    /// Cells or leaves with at least one point
    pub occupied_count: usize,
    /// Cells or leaves without points
    pub empty_count: usize,
    /// Largest number of points in a single cell or leaf
    pub max_occupancy: usize,
    /// Mean number of points per occupied cell or leaf
    pub average_occupancy: f64,
    /// Always 1 for the grid, the deepest node depth for the octree
    pub depth: usize,
    pub build_duration: Duration,
}

impl StatsReport {
    /// Returns the report as a list of text lines, headed by the structure kind
    pub fn lines(&self) -> Vec<String> {
        let (total_label, leaf_label) = match self.kind {
            StructureKind::UniformGrid => ("total cells", "cells"),
            StructureKind::Octree => ("total nodes", "leaves"),
        };
        vec![
            format!("{}:", self.kind),
            format!("  {}: {}", total_label, self.total_count),
            format!("  {}: {}", leaf_label, self.leaf_count),
            format!("  occupied: {}", self.occupied_count),
            format!("  empty: {}", self.empty_count),
            format!("  max points: {}", self.max_occupancy),
            format!("  average points: {:.2}", self.average_occupancy),
            format!("  depth: {}", self.depth),
            format!("  build time: {:.3}s", self.build_duration.as_secs_f64()),
        ]
    }
}

impl fmt::Display for StatsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.lines() {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

/// Returns `(occupied, max, average)` over the given per-cell point counts, ignoring empty cells
fn occupancy<I: Iterator<Item = usize>>(counts: I) -> (usize, usize, f64) {
    let (occupied, max, sum) = counts
        .filter(|count| *count > 0)
        .fold((0, 0, 0), |(occupied, max, sum), count| {
            (occupied + 1, usize::max(max, count), sum + count)
        });
    let average = if occupied > 0 {
        sum as f64 / occupied as f64
    } else {
        0.0
    };
    (occupied, max, average)
}

/// Computes the [StatsReport] of a uniform grid. The grid is flat, so its depth is reported as 1
pub fn grid_report(grid: &UniformGrid) -> StatsReport {
    let (occupied_count, max_occupancy, average_occupancy) =
        occupancy(grid.cells().map(|(_, count)| count));
    StatsReport {
        kind: StructureKind::UniformGrid,
        total_count: grid.total_cell_count(),
        leaf_count: grid.total_cell_count(),
        occupied_count,
        empty_count: grid.empty_cell_count(),
        max_occupancy,
        average_occupancy,
        depth: 1,
        build_duration: grid.build_duration(),
    }
}

/// Computes the [StatsReport] of an octree from its leaves
pub fn octree_report(octree: &Octree) -> StatsReport {
    let (occupied_count, max_occupancy, average_occupancy) =
        occupancy(octree.leaves().map(|leaf| leaf.point_count()));
    StatsReport {
        kind: StructureKind::Octree,
        total_count: octree.node_count(),
        leaf_count: octree.leaf_count(),
        occupied_count,
        empty_count: octree.leaf_count() - occupied_count,
        max_occupancy,
        average_occupancy,
        depth: octree.max_depth_reached(),
        build_duration: octree.build_duration(),
    }
}

/// Computes the reports of a grid and an octree that were built from the same points. This is purely descriptive,
/// neither structure is checked against the other
pub fn compare(grid: &UniformGrid, octree: &Octree) -> (StatsReport, StatsReport) {
    (grid_report(grid), octree_report(octree))
}

/// Parameters of one comparison run
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ComparisonParameters {
    pub grid: GridParameters,
    pub octree: OctreeParameters,
    /// Remove duplicate positions before building the structures
    #[cfg_attr(feature = "serde", serde(default = "default_deduplicate"))]
    pub deduplicate: bool,
}

#[cfg(feature = "serde")]
fn default_deduplicate() -> bool {
    true
}

impl ComparisonParameters {
    /// Pairs a grid cell size with an octree of matching minimum node size
    fn preset(cell_size: f64, min_node_size: f64, min_points_per_leaf: usize) -> Self {
        Self {
            grid: GridParameters { cell_size },
            octree: OctreeParameters {
                max_depth: AUTO_MAX_DEPTH,
                min_points_per_leaf,
                min_node_size: Some(min_node_size),
            },
            deduplicate: true,
        }
    }

    /// The three standard parameter sets: a unit grid against an octree with unit minimum node size, a finer
    /// half-unit setup, and a coarse grid against an octree with larger leaves
    pub fn presets() -> Vec<ComparisonParameters> {
        vec![
            Self::preset(1.0, 1.0, 100),
            Self::preset(0.5, 0.5, 100),
            Self::preset(3.0, 1.0, 300),
        ]
    }

    pub fn validate(&self) -> Result<()> {
        self.grid.validate()?;
        self.octree.validate()
    }
}

impl Default for ComparisonParameters {
    fn default() -> Self {
        Self {
            grid: GridParameters::default(),
            octree: OctreeParameters::default(),
            deduplicate: true,
        }
    }
}

/// Result of one comparison run
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Comparison {
    pub parameters: ComparisonParameters,
    /// Number of points both structures were built from, after deduplication
    pub point_count: usize,
    pub grid: StatsReport,
    pub octree: StatsReport,
}

/// Builds a grid and an octree from `points` and reports on both. The two builds only read `points`, so they run
/// concurrently
///
/// # Examples
/// ```
/// # use gridtree_core::containers::PointSet;
/// # use gridtree_algorithms::comparison::{run_comparison, ComparisonParameters};
/// let points = PointSet::from_coordinates(vec![[0.0, 0.0, 0.0], [1.0, 1.0, 1.0], [2.0, 2.0, 2.0]]).unwrap();
/// let comparison = run_comparison(&points, &ComparisonParameters::default()).unwrap();
/// assert_eq!(3, comparison.grid.occupied_count);
/// assert_eq!(1, comparison.octree.occupied_count);
/// ```
pub fn run_comparison(points: &PointSet, parameters: &ComparisonParameters) -> Result<Comparison> {
    parameters.validate()?;

    let deduplicated;
    let points = if parameters.deduplicate {
        deduplicated = points.deduplicated();
        &deduplicated
    } else {
        points
    };

    let (grid, octree) = rayon::join(
        || UniformGrid::build(points, &parameters.grid),
        || Octree::build(points, &parameters.octree),
    );
    let (grid, octree) = compare(&grid?, &octree?);
    debug!(
        "Compared grid ({} occupied cells) and octree ({} occupied leaves) over {} points",
        grid.occupied_count,
        octree.occupied_count,
        points.len()
    );

    Ok(Comparison {
        parameters: *parameters,
        point_count: points.len(),
        grid,
        octree,
    })
}

/// Runs [run_comparison] for every entry in `parameter_sets`. The results are in the same order as the parameters
pub fn run_presets(
    points: &PointSet,
    parameter_sets: &[ComparisonParameters],
) -> Result<Vec<Comparison>> {
    parameter_sets
        .par_iter()
        .map(|parameters| run_comparison(points, parameters))
        .collect()
}
