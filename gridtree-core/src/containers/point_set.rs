use std::ops::Index;

use itertools::Itertools;
use log::debug;
use nalgebra::Point3;

use crate::{math::AABB, Error, Result};

/// Immutable, ordered collection of 3D positions together with their bounding box. The order of the points carries
/// no meaning for the spatial indices, but it is preserved so that point indices stay reproducible across runs.
///
/// ```
/// # use gridtree_core::containers::PointSet;
/// # use gridtree_core::nalgebra::Point3;
/// let points = PointSet::from_coordinates(vec![[0.0, 0.0, 0.0], [1.0, 2.0, 3.0]]).unwrap();
/// assert_eq!(2, points.len());
/// assert_eq!(Point3::new(1.0, 2.0, 3.0), points[1]);
/// assert_eq!(Point3::new(1.0, 2.0, 3.0), *points.bounds().max());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PointSet {
    points: Vec<Point3<f64>>,
    bounds: AABB<f64>,
}

impl PointSet {
    /// Creates a new `PointSet` from the given positions. Fails with [Error::EmptyInput] if `points` is empty and with
    /// [Error::NonFiniteCoordinate] if any coordinate is NaN or infinite
    pub fn new(points: Vec<Point3<f64>>) -> Result<Self> {
        if let Some(index) = points
            .iter()
            .position(|point| point.iter().any(|coordinate| !coordinate.is_finite()))
        {
            return Err(Error::NonFiniteCoordinate { index });
        }
        let bounds = AABB::from_points(points.iter()).ok_or(Error::EmptyInput)?;
        debug!(
            "Created point set with {} points within {:?} - {:?}",
            points.len(),
            bounds.min(),
            bounds.max()
        );
        Ok(Self { points, bounds })
    }

    /// Creates a new `PointSet` from decoded `[x, y, z]` coordinate triples
    pub fn from_coordinates<I: IntoIterator<Item = [f64; 3]>>(coordinates: I) -> Result<Self> {
        Self::new(coordinates.into_iter().map(Point3::from).collect())
    }

    /// Returns the number of points in this `PointSet`
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if this `PointSet` holds no points. A successfully constructed `PointSet` is never empty
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns the point at `index`, or `None` if `index` is out of bounds
    pub fn get(&self, index: usize) -> Option<&Point3<f64>> {
        self.points.get(index)
    }

    /// Returns all points as a slice
    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    /// Returns an iterator over all points in order
    pub fn iter(&self) -> std::slice::Iter<'_, Point3<f64>> {
        self.points.iter()
    }

    /// Returns the bounding box of all points. For a single point, or many coincident points, the bounding box
    /// is degenerate with `min == max` on every axis
    pub fn bounds(&self) -> &AABB<f64> {
        &self.bounds
    }

    /// Returns a new `PointSet` with exact duplicate positions removed. The first occurrence of each position is kept
    /// and the relative order of the remaining points is preserved. `0.0` and `-0.0` count as the same coordinate
    /// ```
    /// # use gridtree_core::containers::PointSet;
    /// let points = PointSet::from_coordinates(vec![
    ///     [1.0, 1.0, 1.0],
    ///     [0.0, 0.0, 0.0],
    ///     [1.0, 1.0, 1.0],
    ///     [-0.0, 0.0, 0.0],
    /// ])
    /// .unwrap();
    /// let unique = points.deduplicated();
    /// assert_eq!(2, unique.len());
    /// assert_eq!(points[0], unique[0]);
    /// assert_eq!(points[1], unique[1]);
    /// ```
    pub fn deduplicated(&self) -> PointSet {
        // Adding 0.0 turns -0.0 into 0.0 so both hash to the same key
        let points = self
            .points
            .iter()
            .copied()
            .unique_by(|point| {
                [
                    (point.x + 0.0).to_bits(),
                    (point.y + 0.0).to_bits(),
                    (point.z + 0.0).to_bits(),
                ]
            })
            .collect::<Vec<_>>();
        debug!(
            "Removed {} duplicate points",
            self.points.len() - points.len()
        );
        // Removing duplicates keeps every distinct position, so the bounds do not change
        Self {
            points,
            bounds: self.bounds,
        }
    }
}

impl Index<usize> for PointSet {
    type Output = Point3<f64>;

    fn index(&self, index: usize) -> &Self::Output {
        &self.points[index]
    }
}

impl<'a> IntoIterator for &'a PointSet {
    type Item = &'a Point3<f64>;
    type IntoIter = std::slice::Iter<'a, Point3<f64>>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}
