#![warn(clippy::all)]
//! Spatial indices that operate on a [PointSet](gridtree_core::containers::PointSet).
//!
//! gridtree builds two structures over the same points, a uniform occupancy grid and an adaptive octree, and
//! reports comparable statistics for both.

// Adaptive octree with a depth limit and a points-per-leaf split threshold
pub mod acceleration_structures;
// Side-by-side statistics for a grid and an octree built from the same points
pub mod comparison;
// Fixed-cell-size occupancy grid over the bounding box of a point set
pub mod uniform_grid;
