use std::{
    fmt,
    time::{Duration, Instant},
};

use gridtree_core::{
    containers::PointSet,
    math::{Octant, AABB},
    nalgebra::{Point3, Vector3},
    Error, Result,
};
use log::{debug, trace};

/// Default depth limit of [OctreeParameters]
pub const DEFAULT_MAX_DEPTH: usize = 10;
/// Default split threshold of [OctreeParameters]
pub const DEFAULT_MIN_POINTS_PER_LEAF: usize = 100;
/// Depth limit used by [OctreeParameters::auto_for] and the comparison presets. Splitting stops long before this in
/// practice because of the node-size rule
pub const AUTO_MAX_DEPTH: usize = 21;
/// Smallest half-extent given to a root axis along which all points share the same coordinate
const MIN_ROOT_HALF_EXTENT: f64 = 0.5;

/// Configuration of an [Octree]
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OctreeParameters {
    /// Nodes at this depth are never split. The root has depth 0
    pub max_depth: usize,
    /// A node is split only if it holds more than this many points. Must be at least 1
    pub min_points_per_leaf: usize,
    /// If set, a node is split only if its largest extent exceeds this size. Must be finite and positive
    #[cfg_attr(feature = "serde", serde(default))]
    pub min_node_size: Option<f64>,
}

impl OctreeParameters {
    /// Creates validated `OctreeParameters` without a node-size limit
    pub fn new(max_depth: usize, min_points_per_leaf: usize) -> Result<Self> {
        let parameters = Self {
            max_depth,
            min_points_per_leaf,
            min_node_size: None,
        };
        parameters.validate()?;
        Ok(parameters)
    }

    /// Returns a copy of these parameters that additionally stops splitting nodes whose largest extent is
    /// `min_node_size` or smaller
    pub fn with_min_node_size(self, min_node_size: f64) -> Result<Self> {
        let parameters = Self {
            min_node_size: Some(min_node_size),
            ..self
        };
        parameters.validate()?;
        Ok(parameters)
    }

    /// Fails with `Error::InvalidConfig` if `min_points_per_leaf` is zero or `min_node_size` is set but not a finite,
    /// positive value
    pub fn validate(&self) -> Result<()> {
        if self.min_points_per_leaf < 1 {
            return Err(Error::invalid_config(
                "min_points_per_leaf must be at least 1",
            ));
        }
        if let Some(size) = self.min_node_size {
            if !size.is_finite() || size <= 0.0 {
                return Err(Error::invalid_config(format!(
                    "min_node_size must be a finite value > 0 (got {})",
                    size
                )));
            }
        }
        Ok(())
    }

    /// Derives parameters from the size of `points`: leaves hold up to `max(n / 1000, 10)` points, and nodes
    /// smaller than 1/50th of the largest extent of the point set are not split further
    /// ```
    /// # use gridtree_core::containers::PointSet;
    /// # use gridtree_algorithms::acceleration_structures::OctreeParameters;
    /// let points = PointSet::from_coordinates((0..20_000).map(|i| [i as f64 * 0.01, 0.0, 0.0])).unwrap();
    /// let parameters = OctreeParameters::auto_for(&points);
    /// assert_eq!(20, parameters.min_points_per_leaf);
    /// assert!((parameters.min_node_size.unwrap() - 199.99 / 50.0).abs() < 1e-9);
    /// ```
    pub fn auto_for(points: &PointSet) -> Self {
        let largest_extent = points.bounds().largest_extent();
        Self {
            max_depth: AUTO_MAX_DEPTH,
            min_points_per_leaf: usize::max(points.len() / 1000, 10),
            min_node_size: if largest_extent > 0.0 {
                Some(largest_extent / 50.0)
            } else {
                None
            },
        }
    }
}

impl Default for OctreeParameters {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            min_points_per_leaf: DEFAULT_MIN_POINTS_PER_LEAF,
            min_node_size: None,
        }
    }
}

/// Relation between the bounds of a node and a query sphere
enum SphereRelation {
    /// The whole node lies inside the sphere
    Inside,
    /// Node and sphere are disjoint
    Outside,
    /// Node and sphere intersect, or the node contains the whole sphere
    Partial,
}

/// A node of an [Octree]. Internal nodes own exactly eight children and store no points themselves, leaves own
/// the indices of the points that fall into their region
#[derive(Debug, Clone)]
pub struct OctreeNode {
    bounds: AABB<f64>,
    depth: usize,
    children: Option<Box<[OctreeNode; 8]>>,
    points: Vec<usize>,
}

impl OctreeNode {
    /// Region covered by this node
    pub fn bounds(&self) -> &AABB<f64> {
        &self.bounds
    }

    pub fn center(&self) -> Point3<f64> {
        self.bounds.center()
    }

    pub fn half_extent(&self) -> Vector3<f64> {
        self.bounds.half_extent()
    }

    /// Depth of this node. The root has depth 0
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// A node is a leaf iff it has no children
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Returns the eight children of this node in octant order, or `None` for a leaf
    pub fn children(&self) -> Option<&[OctreeNode; 8]> {
        self.children.as_deref()
    }

    /// Returns the child in the given `octant`, or `None` for a leaf
    pub fn child(&self, octant: Octant) -> Option<&OctreeNode> {
        self.children
            .as_ref()
            .map(|children| &children[octant.index()])
    }

    /// Number of points stored in this node. Always zero for internal nodes
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Indices into the [PointSet] of the points stored in this node, in ascending order. Empty for internal nodes
    pub fn points(&self) -> &[usize] {
        &self.points
    }

    /// True for leaves that hold at least one point
    pub fn is_occupied_leaf(&self) -> bool {
        self.is_leaf() && !self.points.is_empty()
    }

    /// Returns an iterator over all leaves below (and including) this node in depth-first octant order
    pub fn leaves(&self) -> Leaves<'_> {
        Leaves {
            worklist: vec![self],
        }
    }

    fn relation_to_sphere(&self, center: &Point3<f64>, radius: f64) -> SphereRelation {
        let radius_squared = radius * radius;
        if self.bounds.squared_distance_to(center) > radius_squared {
            return SphereRelation::Outside;
        }
        if self.bounds.squared_max_distance_to(center) <= radius_squared {
            return SphereRelation::Inside;
        }
        SphereRelation::Partial
    }
}

impl fmt::Display for OctreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "####### Octree Node #######")?;
        writeln!(f, "Bounds: {:?} - {:?}", self.bounds.min(), self.bounds.max())?;
        writeln!(f, "Depth: {}", self.depth)?;
        match &self.children {
            Some(children) => {
                writeln!(f, "Children:")?;
                for child in children.iter() {
                    write!(f, "  {}", child)?;
                }
            }
            None => writeln!(f, "Leaf with {} points", self.points.len())?,
        }
        writeln!(f, "##########")
    }
}

/// Depth-first iterator over the leaves of an [Octree]. Children are visited in ascending octant order, so the
/// sequence is the same every time it is requested
pub struct Leaves<'o> {
    worklist: Vec<&'o OctreeNode>,
}

impl<'o> Iterator for Leaves<'o> {
    type Item = &'o OctreeNode;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.worklist.pop() {
            match node.children.as_ref() {
                // Reversed so that octant 0 is popped first
                Some(children) => self.worklist.extend(children.iter().rev()),
                None => return Some(node),
            }
        }
        None
    }
}

struct OctreeBuilder<'p> {
    points: &'p PointSet,
    parameters: &'p OctreeParameters,
    /// Nodes this small or smaller are never split. One unit of round-off relative to the root, which caps the depth
    /// at about 53 levels wherever the root lies
    min_splittable_extent: f64,
    node_count: usize,
    leaf_count: usize,
    max_depth_reached: usize,
}

impl<'p> OctreeBuilder<'p> {
    fn should_split(&self, bounds: &AABB<f64>, depth: usize, point_count: usize) -> bool {
        point_count > self.parameters.min_points_per_leaf
            && depth < self.parameters.max_depth
            && self
                .parameters
                .min_node_size
                .map_or(true, |size| bounds.largest_extent() > size)
            && bounds.largest_extent() > self.min_splittable_extent
            // Stops at the limit of floating-point precision, so no child ever has zero extent
            && bounds.is_subdividable()
    }

    fn build_node(&mut self, bounds: AABB<f64>, depth: usize, points: Vec<usize>) -> OctreeNode {
        self.node_count += 1;
        self.max_depth_reached = usize::max(self.max_depth_reached, depth);

        if !self.should_split(&bounds, depth, points.len()) {
            self.leaf_count += 1;
            return OctreeNode {
                bounds,
                depth,
                children: None,
                points,
            };
        }

        let center = bounds.center();
        let mut partitions: [Vec<usize>; 8] = Default::default();
        for point_index in points {
            let octant = Octant::of_point(&self.points[point_index], &center);
            partitions[octant.index()].push(point_index);
        }
        trace!(
            "Splitting node at depth {} into partitions of size {:?}",
            depth,
            partitions.iter().map(Vec::len).collect::<Vec<_>>()
        );

        let children: [OctreeNode; 8] = std::array::from_fn(|index| {
            let octant = Octant::ALL[index];
            self.build_node(
                bounds.octant_bounds(octant),
                depth + 1,
                std::mem::take(&mut partitions[index]),
            )
        });
        OctreeNode {
            bounds,
            depth,
            children: Some(Box::new(children)),
            points: vec![],
        }
    }
}

/// Adaptive octree over a [PointSet]. The root covers the bounding box of the points, padded along axes on which all
/// points share the same coordinate. A node is split into eight equal octants while it holds more than
/// `min_points_per_leaf` points, lies above `max_depth` and (if configured) is larger than `min_node_size`. Points
/// on a splitting plane go to the lower octant on that axis, so every point ends up in exactly one leaf.
///
/// Coincident points can never be separated: with a small `min_points_per_leaf` they are pushed down a chain of
/// single occupied nodes until `max_depth` is reached.
///
/// # Examples
/// ```
/// # use gridtree_core::containers::PointSet;
/// # use gridtree_algorithms::acceleration_structures::{Octree, OctreeParameters};
/// let points = PointSet::from_coordinates(vec![[0.0, 0.0, 0.0], [1.0, 1.0, 1.0], [2.0, 2.0, 2.0]]).unwrap();
/// let octree = Octree::build(&points, &OctreeParameters::new(4, 1).unwrap()).unwrap();
/// assert_eq!(3, octree.leaves().filter(|leaf| leaf.point_count() > 0).count());
/// assert_eq!(3, octree.leaves().map(|leaf| leaf.point_count()).sum::<usize>());
/// ```
#[derive(Debug, Clone)]
pub struct Octree<'a> {
    points: &'a PointSet,
    parameters: OctreeParameters,
    root: OctreeNode,
    node_count: usize,
    leaf_count: usize,
    max_depth_reached: usize,
    build_duration: Duration,
}

impl<'a> Octree<'a> {
    /// Builds an `Octree` over all points in `points`. Fails with `Error::InvalidConfig` if `parameters` are invalid
    pub fn build(points: &'a PointSet, parameters: &OctreeParameters) -> Result<Self> {
        parameters.validate()?;
        let t_start = Instant::now();

        let (root_bounds, was_padded) = points
            .bounds()
            .padded_to_non_degenerate(MIN_ROOT_HALF_EXTENT);
        if was_padded {
            debug!(
                "Points are degenerate along at least one axis, padded octree root to {:?} - {:?}",
                root_bounds.min(),
                root_bounds.max()
            );
        }

        let mut builder = OctreeBuilder {
            points,
            parameters,
            min_splittable_extent: root_bounds.largest_extent() * f64::EPSILON,
            node_count: 0,
            leaf_count: 0,
            max_depth_reached: 0,
        };
        let root = builder.build_node(root_bounds, 0, (0..points.len()).collect());

        let octree = Self {
            points,
            parameters: *parameters,
            root,
            node_count: builder.node_count,
            leaf_count: builder.leaf_count,
            max_depth_reached: builder.max_depth_reached,
            build_duration: t_start.elapsed(),
        };
        debug!(
            "Built octree: {} nodes, {} leaves, depth {}, took {:.3}s",
            octree.node_count,
            octree.leaf_count,
            octree.max_depth_reached,
            octree.build_duration.as_secs_f64()
        );
        Ok(octree)
    }

    /// The point set this octree was built from
    pub fn point_set(&self) -> &'a PointSet {
        self.points
    }

    pub fn parameters(&self) -> &OctreeParameters {
        &self.parameters
    }

    pub fn root(&self) -> &OctreeNode {
        &self.root
    }

    /// Region covered by the root node
    pub fn bounds(&self) -> &AABB<f64> {
        &self.root.bounds
    }

    /// Deepest depth of any node in this octree. Zero if the root is a leaf
    pub fn max_depth_reached(&self) -> usize {
        self.max_depth_reached
    }

    /// Total number of nodes, internal nodes and leaves
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Number of leaves, occupied or empty
    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    pub fn internal_node_count(&self) -> usize {
        self.node_count - self.leaf_count
    }

    /// Returns an iterator over all leaves in depth-first order, children visited in ascending octant order
    pub fn leaves(&self) -> Leaves<'_> {
        self.root.leaves()
    }

    /// Returns an iterator over all leaves that hold at least one point, in the same order as [leaves](Octree::leaves)
    pub fn occupied_leaves(&self) -> impl Iterator<Item = &OctreeNode> + '_ {
        self.leaves().filter(|leaf| leaf.is_occupied_leaf())
    }

    /// Returns the leaf whose region owns `point`, following the same tie rule as the construction. Returns `None` if
    /// `point` lies outside of the root region
    pub fn locate(&self, point: &Point3<f64>) -> Option<&OctreeNode> {
        if !self.root.bounds.contains(point) {
            return None;
        }
        let mut node = &self.root;
        while let Some(children) = node.children.as_ref() {
            node = &children[Octant::of_point(point, &node.center()).index()];
        }
        Some(node)
    }

    /// Returns the indices of all points within `radius` of `center` (boundary inclusive), in ascending order. Nodes
    /// that lie completely inside the query sphere are accepted without testing their points
    pub fn points_in_radius(&self, center: &Point3<f64>, radius: f64) -> Vec<usize> {
        if radius.is_nan() || radius < 0.0 {
            return vec![];
        }
        let radius_squared = radius * radius;
        let mut found = vec![];
        let mut worklist = vec![&self.root];
        while let Some(node) = worklist.pop() {
            match node.relation_to_sphere(center, radius) {
                SphereRelation::Outside => {}
                SphereRelation::Inside => {
                    found.extend(node.leaves().flat_map(|leaf| leaf.points.iter().copied()));
                }
                SphereRelation::Partial => match node.children.as_ref() {
                    Some(children) => worklist.extend(
                        children
                            .iter()
                            .filter(|child| !child.is_leaf() || !child.points.is_empty()),
                    ),
                    None => found.extend(node.points.iter().copied().filter(|point_index| {
                        (self.points[*point_index] - center).norm_squared() <= radius_squared
                    })),
                },
            }
        }
        found.sort_unstable();
        found
    }

    /// Selects at most `max_leaves` occupied leaves for drawing. If there are more occupied leaves than `max_leaves`,
    /// leaves are picked at a regular stride over the depth-first order; otherwise all occupied leaves are returned.
    /// A `max_leaves` of zero means no limit
    pub fn representative_leaves(&self, max_leaves: usize) -> Vec<&OctreeNode> {
        let occupied = self.occupied_leaves().collect::<Vec<_>>();
        if max_leaves == 0 || occupied.len() <= max_leaves {
            return occupied;
        }
        let stride = occupied.len() as f64 / max_leaves as f64;
        (0..max_leaves)
            .map(|i| occupied[(i as f64 * stride) as usize])
            .collect()
    }

    /// Time spent building this octree
    pub fn build_duration(&self) -> Duration {
        self.build_duration
    }
}
