use nalgebra::Point3;
use std::fmt::Display;

/// One of the eight children of a subdivided box. The index encodes the half per axis: bit 0 is set for the upper
/// half on the x-axis, bit 1 for y and bit 2 for z (ZYX order, the least significant bit encodes X). Iterating
/// over [Octant::ALL] visits the children in ascending index order
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Octant(u8);

impl Octant {
    /// All octants in ascending index order
    pub const ALL: [Octant; 8] = [
        Octant(0),
        Octant(1),
        Octant(2),
        Octant(3),
        Octant(4),
        Octant(5),
        Octant(6),
        Octant(7),
    ];

    /// Creates the octant with the given index. Returns `None` if `index` is not in [0;7]
    /// ```
    /// # use gridtree_core::math::Octant;
    /// assert_eq!(Some(5), Octant::new(5).map(|o| o.index()));
    /// assert_eq!(None, Octant::new(8));
    /// ```
    pub fn new(index: u8) -> Option<Self> {
        if index > 7 {
            return None;
        }
        Some(Self(index))
    }

    /// Returns the octant that `point` falls into relative to `center`. A coordinate selects the upper half only if it
    /// is strictly greater than the center coordinate, so points on a splitting plane always go to the lower half
    /// ```
    /// # use gridtree_core::math::Octant;
    /// # use gridtree_core::nalgebra::Point3;
    /// let center = Point3::new(0.0, 0.0, 0.0);
    /// assert_eq!(7, Octant::of_point(&Point3::new(1.0, 1.0, 1.0), &center).index());
    /// assert_eq!(0, Octant::of_point(&Point3::new(0.0, 0.0, 0.0), &center).index());
    /// assert_eq!(4, Octant::of_point(&Point3::new(-1.0, 0.0, 0.5), &center).index());
    /// ```
    pub fn of_point(point: &Point3<f64>, center: &Point3<f64>) -> Self {
        let mut index = 0;
        for axis in 0..3 {
            if point[axis] > center[axis] {
                index |= 1 << axis;
            }
        }
        Self(index)
    }

    /// Returns the index of this octant, in [0;7]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns true if this octant covers the upper half of its parent along `axis` (0 = x, 1 = y, 2 = z)
    pub fn is_upper(self, axis: usize) -> bool {
        (self.0 >> axis) & 1 == 1
    }
}

impl Display for Octant {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(fmt, "{}", self.0)
    }
}
