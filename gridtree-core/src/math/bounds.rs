use nalgebra::{ClosedSub, Point3, Scalar, Vector3};

use super::Octant;

/// 3D axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AABB<T: Scalar + PartialOrd> {
    min: Point3<T>,
    max: Point3<T>,
}

impl<T: Scalar + ClosedSub + PartialOrd + Copy> AABB<T> {
    /// Box spanning `min` to `max`.
    ///
    /// # Panics
    ///
    /// If `min` exceeds `max` on any axis. Equal coordinates are allowed, so a single position is a valid box
    /// ```
    /// # use gridtree_core::math::AABB;
    /// # use gridtree_core::nalgebra::Point3;
    /// let flat = AABB::from_min_max(Point3::new(0.0, 0.0, 2.0), Point3::new(1.0, 1.0, 2.0));
    /// assert_eq!(2.0, flat.min().z);
    /// ```
    pub fn from_min_max(min: Point3<T>, max: Point3<T>) -> Self {
        assert!(
            (0..3).all(|axis| min[axis] <= max[axis]),
            "AABB corners are inverted on at least one axis"
        );
        Self { min, max }
    }

    /// Like [AABB::from_min_max], for corners that are already known to be ordered
    pub fn from_min_max_unchecked(min: Point3<T>, max: Point3<T>) -> Self {
        Self { min, max }
    }

    pub fn min(&self) -> &Point3<T> {
        &self.min
    }

    pub fn max(&self) -> &Point3<T> {
        &self.max
    }

    /// Edge lengths per axis
    /// ```
    /// # use gridtree_core::math::AABB;
    /// # use gridtree_core::nalgebra::{Point3, Vector3};
    /// let bounds = AABB::from_min_max(Point3::new(-1.0, 0.0, 0.0), Point3::new(1.0, 2.0, 3.0));
    /// assert_eq!(Vector3::new(2.0, 2.0, 3.0), bounds.extent());
    /// ```
    pub fn extent(&self) -> Vector3<T> {
        self.max - self.min
    }

    /// Closed-interval overlap test on all three axes, so boxes sharing only a face or a corner intersect
    /// ```
    /// # use gridtree_core::math::AABB;
    /// # use gridtree_core::nalgebra::Point3;
    /// let lower = AABB::from_min_max(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
    /// let touching = AABB::from_min_max(Point3::new(1.0, 0.0, 0.0), Point3::new(2.0, 1.0, 1.0));
    /// let apart = AABB::from_min_max(Point3::new(1.5, 0.0, 0.0), Point3::new(2.0, 1.0, 1.0));
    /// assert!(lower.intersects(&touching));
    /// assert!(!lower.intersects(&apart));
    /// ```
    pub fn intersects(&self, other: &AABB<T>) -> bool {
        (0..3).all(|axis| self.min[axis] <= other.max[axis] && other.min[axis] <= self.max[axis])
    }

    /// Closed containment test, positions on a face of the box are inside
    /// ```
    /// # use gridtree_core::math::AABB;
    /// # use gridtree_core::nalgebra::Point3;
    /// let bounds = AABB::from_min_max(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
    /// assert!(bounds.contains(&Point3::new(1.0, 0.5, 0.0)));
    /// assert!(!bounds.contains(&Point3::new(1.5, 0.5, 0.5)));
    /// ```
    pub fn contains(&self, point: &Point3<T>) -> bool {
        (0..3).all(|axis| self.min[axis] <= point[axis] && point[axis] <= self.max[axis])
    }
}

impl AABB<f64> {
    /// Computes the tightest bounding box of `points` in a single pass. Returns `None` if `points` is empty
    /// ```
    /// # use gridtree_core::math::AABB;
    /// # use gridtree_core::nalgebra::Point3;
    /// let points = [Point3::new(1.0, -2.0, 0.0), Point3::new(-1.0, 4.0, 0.5)];
    /// let bounds = AABB::from_points(points.iter()).unwrap();
    /// assert_eq!(*bounds.min(), Point3::new(-1.0, -2.0, 0.0));
    /// assert_eq!(*bounds.max(), Point3::new(1.0, 4.0, 0.5));
    /// ```
    pub fn from_points<'a, I: IntoIterator<Item = &'a Point3<f64>>>(points: I) -> Option<Self> {
        let mut points = points.into_iter();
        let first = *points.next()?;
        let (min, max) = points.fold((first, first), |(min, max), point| {
            (min.inf(point), max.sup(point))
        });
        Some(Self::from_min_max_unchecked(min, max))
    }

    /// Returns the center of this AABB
    /// ```
    /// # use gridtree_core::math::AABB;
    /// let bounds = AABB::from_min_max_unchecked(nalgebra::Point3::new(0.0, 0.0, 0.0), nalgebra::Point3::new(2.0, 4.0, 6.0));
    /// assert_eq!(bounds.center(), nalgebra::Point3::new(1.0, 2.0, 3.0));
    /// ```
    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Returns half of the extent along each axis
    pub fn half_extent(&self) -> Vector3<f64> {
        self.extent() * 0.5
    }

    /// Returns the largest extent over all three axes
    pub fn largest_extent(&self) -> f64 {
        self.extent().max()
    }

    /// Returns the volume of this AABB. Degenerate boxes have a volume of zero
    pub fn volume(&self) -> f64 {
        let extent = self.extent();
        extent.x * extent.y * extent.z
    }

    /// Returns true if the center of this AABB lies strictly between its minimum and maximum on every axis, i.e.
    /// splitting it at the center yields eight boxes with positive extent. This turns false for boxes that are
    /// degenerate or so small that their center rounds onto one of the boundaries
    pub fn is_subdividable(&self) -> bool {
        let center = self.center();
        (0..3).all(|axis| self.min[axis] < center[axis] && center[axis] < self.max[axis])
    }

    /// Returns the sub-box of this AABB that belongs to `octant` when the box is split at its center
    /// ```
    /// # use gridtree_core::math::{AABB, Octant};
    /// # use gridtree_core::nalgebra::Point3;
    /// let bounds = AABB::from_min_max_unchecked(Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 2.0, 2.0));
    /// // Octant 1 is the upper half on the x-axis and the lower half on y and z
    /// let octant_bounds = bounds.octant_bounds(Octant::new(1).unwrap());
    /// assert_eq!(*octant_bounds.min(), Point3::new(1.0, 0.0, 0.0));
    /// assert_eq!(*octant_bounds.max(), Point3::new(2.0, 1.0, 1.0));
    /// ```
    pub fn octant_bounds(&self, octant: Octant) -> AABB<f64> {
        let center = self.center();
        let mut min = self.min;
        let mut max = self.max;
        for axis in 0..3 {
            if octant.is_upper(axis) {
                min[axis] = center[axis];
            } else {
                max[axis] = center[axis];
            }
        }
        Self::from_min_max(min, max)
    }

    /// Pads every axis with zero extent so that its half-extent becomes `max(largest half-extent, min_half_extent)`.
    /// Axes with a positive extent are left untouched. Returns the padded box and whether any padding took place
    /// ```
    /// # use gridtree_core::math::AABB;
    /// # use gridtree_core::nalgebra::Point3;
    /// let flat = AABB::from_min_max_unchecked(Point3::new(0.0, 0.0, 3.0), Point3::new(4.0, 2.0, 3.0));
    /// let (padded, was_padded) = flat.padded_to_non_degenerate(0.5);
    /// assert!(was_padded);
    /// assert_eq!(*padded.min(), Point3::new(0.0, 0.0, 1.0));
    /// assert_eq!(*padded.max(), Point3::new(4.0, 2.0, 5.0));
    /// ```
    pub fn padded_to_non_degenerate(&self, min_half_extent: f64) -> (AABB<f64>, bool) {
        let half_extent = self.half_extent();
        let padding = half_extent.max().max(min_half_extent);
        let mut min = self.min;
        let mut max = self.max;
        let mut was_padded = false;
        for axis in 0..3 {
            if half_extent[axis] <= 0.0 {
                min[axis] -= padding;
                max[axis] += padding;
                was_padded = true;
            }
        }
        (Self::from_min_max_unchecked(min, max), was_padded)
    }

    /// Returns the squared distance from `point` to the closest position inside this AABB. Zero if `point` is inside
    pub fn squared_distance_to(&self, point: &Point3<f64>) -> f64 {
        (0..3)
            .map(|axis| {
                let d = if point[axis] < self.min[axis] {
                    self.min[axis] - point[axis]
                } else if point[axis] > self.max[axis] {
                    point[axis] - self.max[axis]
                } else {
                    0.0
                };
                d * d
            })
            .sum()
    }

    /// Returns the squared distance from `point` to the farthest corner of this AABB
    pub fn squared_max_distance_to(&self, point: &Point3<f64>) -> f64 {
        (0..3)
            .map(|axis| {
                let d = f64::max(
                    (point[axis] - self.min[axis]).abs(),
                    (point[axis] - self.max[axis]).abs(),
                );
                d * d
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_cube() -> AABB<f64> {
        AABB::from_min_max(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0))
    }

    #[test]
    #[should_panic]
    fn test_from_min_max_rejects_inverted_bounds() {
        AABB::from_min_max(Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 1.0));
    }

    #[test]
    fn test_octants_tile_parent() {
        let bounds = AABB::from_min_max(Point3::new(-1.0, 2.0, 0.0), Point3::new(3.0, 4.0, 8.0));
        let total: f64 = Octant::ALL
            .iter()
            .map(|octant| bounds.octant_bounds(*octant).volume())
            .sum();
        assert_eq!(bounds.volume(), total);
        for octant in Octant::ALL {
            let child = bounds.octant_bounds(octant);
            assert!(bounds.contains(child.min()));
            assert!(bounds.contains(child.max()));
        }
    }

    #[test]
    fn test_degenerate_box_is_not_subdividable() {
        let point = Point3::new(5.0, 5.0, 5.0);
        let bounds = AABB::from_min_max(point, point);
        assert!(!bounds.is_subdividable());

        let (padded, was_padded) = bounds.padded_to_non_degenerate(0.5);
        assert!(was_padded);
        assert!(padded.is_subdividable());
        assert_eq!(*padded.min(), Point3::new(4.5, 4.5, 4.5));
        assert_eq!(*padded.max(), Point3::new(5.5, 5.5, 5.5));
    }

    #[test]
    fn test_padding_keeps_regular_box() {
        let (padded, was_padded) = unit_cube().padded_to_non_degenerate(0.5);
        assert!(!was_padded);
        assert_eq!(padded, unit_cube());
    }

    #[test]
    fn test_tiny_box_is_not_subdividable() {
        let min = Point3::new(1.0, 1.0, 1.0);
        let max = Point3::new(1.0 + f64::EPSILON, 2.0, 2.0);
        assert!(!AABB::from_min_max(min, max).is_subdividable());
    }

    #[test]
    fn test_intersection_and_containment_per_axis() {
        let bounds = unit_cube();
        for axis in 0..3 {
            let mut outside = Point3::new(0.5, 0.5, 0.5);
            outside[axis] = 1.0 + f64::EPSILON * 4.0;
            assert!(!bounds.contains(&outside));

            let mut shifted_min = Point3::new(0.0, 0.0, 0.0);
            shifted_min[axis] = 2.0;
            let mut shifted_max = Point3::new(1.0, 1.0, 1.0);
            shifted_max[axis] = 3.0;
            assert!(!bounds.intersects(&AABB::from_min_max(shifted_min, shifted_max)));
        }
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_json_round_trip() {
        let bounds = AABB::from_min_max(Point3::new(-1.0, 0.0, 2.5), Point3::new(1.0, 4.0, 3.0));
        let json = serde_json::to_value(bounds).unwrap();
        assert!(json.get("min").is_some());
        assert!(json.get("max").is_some());
        let parsed: AABB<f64> = serde_json::from_value(json).unwrap();
        assert_eq!(bounds, parsed);
    }

    #[test]
    fn test_distances() {
        let bounds = unit_cube();
        assert_eq!(0.0, bounds.squared_distance_to(&Point3::new(0.5, 0.5, 0.5)));
        assert_eq!(4.0, bounds.squared_distance_to(&Point3::new(3.0, 0.5, 0.5)));
        assert_eq!(3.0, bounds.squared_max_distance_to(&Point3::new(0.0, 0.0, 0.0)));
    }
}
