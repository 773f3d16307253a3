#![warn(clippy::all)]

//! Core data structures for indexing point cloud positions
//!
//! gridtree compares two spatial indices, a uniform occupancy grid and an adaptive octree, over the same set
//! of 3D points. This crate holds the pieces both indices share: the immutable [PointSet](crate::containers::PointSet)
//! that owns the input positions, the [AABB](crate::math::AABB) type and the octant math used during subdivision.
//! The indices themselves live in `gridtree-algorithms`.

pub extern crate nalgebra;

/// Containers for point data
pub mod containers;
mod error;
pub use self::error::*;
/// Bounding boxes and octant math
pub mod math;
