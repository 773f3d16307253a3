use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use gridtree_core::{
    containers::PointSet,
    math::AABB,
    nalgebra::{Point3, Vector3},
    Error, Result,
};
use log::debug;

/// Integer position of a cell within a [UniformGrid], counted in cells from the minimum corner of the bounding box
pub type CellIndex = (usize, usize, usize);

/// Configuration of a [UniformGrid]
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridParameters {
    /// Edge length of the cubic cells. Must be finite and positive
    pub cell_size: f64,
}

impl GridParameters {
    /// Creates validated `GridParameters`
    pub fn new(cell_size: f64) -> Result<Self> {
        let parameters = Self { cell_size };
        parameters.validate()?;
        Ok(parameters)
    }

    /// Fails with `Error::InvalidConfig` unless the cell size is finite and positive
    pub fn validate(&self) -> Result<()> {
        if !self.cell_size.is_finite() || self.cell_size <= 0.0 {
            return Err(Error::invalid_config(format!(
                "cell_size must be a finite value > 0 (got {})",
                self.cell_size
            )));
        }
        Ok(())
    }
}

impl Default for GridParameters {
    fn default() -> Self {
        Self { cell_size: 1.0 }
    }
}

/// An occupied cell of a [UniformGrid] together with the indices of the points that fall into it
#[derive(Debug, Clone, PartialEq)]
pub struct GridCell {
    index: CellIndex,
    points: Vec<usize>,
}

impl GridCell {
    pub fn index(&self) -> CellIndex {
        self.index
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Indices into the [PointSet] of all points in this cell, in ascending order
    pub fn points(&self) -> &[usize] {
        &self.points
    }
}

/// Uniform occupancy grid with cubic cells of a fixed size, anchored at the minimum corner of the bounding box of a
/// [PointSet]. Only occupied cells are stored. Every point is assigned to exactly one cell: the cell index along each
/// axis is `floor((p - min) / cell_size)`, clamped to the last cell so that points on the maximum boundary never
/// spill into a cell outside the grid.
///
/// # Examples
/// ```
/// # use gridtree_core::containers::PointSet;
/// # use gridtree_algorithms::uniform_grid::{GridParameters, UniformGrid};
/// let points = PointSet::from_coordinates(vec![[0.0, 0.0, 0.0], [1.0, 1.0, 1.0], [2.0, 2.0, 2.0]]).unwrap();
/// let grid = UniformGrid::build(&points, &GridParameters::new(1.0).unwrap()).unwrap();
/// assert_eq!(3, grid.occupied_cell_count());
/// assert_eq!(27, grid.total_cell_count());
/// assert_eq!(1, grid.point_count((1, 1, 1)));
/// assert_eq!(0, grid.point_count((1, 0, 0)));
/// ```
#[derive(Debug, Clone)]
pub struct UniformGrid<'a> {
    points: &'a PointSet,
    cell_size: f64,
    dimensions: CellIndex,
    total_cell_count: usize,
    cells: HashMap<CellIndex, GridCell>,
    build_duration: Duration,
}

/// Number of cells needed along an axis with the given extent
fn axis_dimension(extent: f64, cell_size: f64) -> Result<usize> {
    let cells = (extent / cell_size).floor();
    if !cells.is_finite() || cells >= usize::MAX as f64 {
        return Err(Error::invalid_config(format!(
            "cell_size {} is too small for an extent of {}",
            cell_size, extent
        )));
    }
    Ok(cells as usize + 1)
}

/// Cell coordinate of `offset` along one axis, clamped to `[0, dimension - 1]`
fn clamped_axis_index(offset: f64, cell_size: f64, dimension: usize) -> usize {
    let cell = (offset / cell_size).floor();
    if cell <= 0.0 {
        return 0;
    }
    usize::min(cell as usize, dimension - 1)
}

impl<'a> UniformGrid<'a> {
    /// Builds a `UniformGrid` over all points in `points`. Fails with `Error::InvalidConfig` if the cell size is not
    /// finite and positive, or if it is so small that the number of cells covering the bounding box does not fit
    /// into a `usize`
    pub fn build(points: &'a PointSet, parameters: &GridParameters) -> Result<Self> {
        parameters.validate()?;
        let t_start = Instant::now();

        let cell_size = parameters.cell_size;
        let extent = points.bounds().extent();
        let dimensions = (
            axis_dimension(extent.x, cell_size)?,
            axis_dimension(extent.y, cell_size)?,
            axis_dimension(extent.z, cell_size)?,
        );
        let total_cell_count = dimensions
            .0
            .checked_mul(dimensions.1)
            .and_then(|count| count.checked_mul(dimensions.2))
            .ok_or_else(|| {
                Error::invalid_config(format!(
                    "cell_size {} yields {:?} cells, which overflows the cell count",
                    cell_size, dimensions
                ))
            })?;

        let mut grid = Self {
            points,
            cell_size,
            dimensions,
            total_cell_count,
            cells: HashMap::new(),
            build_duration: Duration::default(),
        };

        for (point_index, point) in points.iter().enumerate() {
            let index = grid.clamped_cell_index(point);
            grid.cells
                .entry(index)
                .or_insert_with(|| GridCell {
                    index,
                    points: vec![],
                })
                .points
                .push(point_index);
        }

        grid.build_duration = t_start.elapsed();
        debug!(
            "Built uniform grid with cell size {}: {} of {} cells occupied, took {:.3}s",
            cell_size,
            grid.cells.len(),
            total_cell_count,
            grid.build_duration.as_secs_f64()
        );
        Ok(grid)
    }

    fn clamped_cell_index(&self, point: &Point3<f64>) -> CellIndex {
        let offset = point - self.origin();
        (
            clamped_axis_index(offset.x, self.cell_size, self.dimensions.0),
            clamped_axis_index(offset.y, self.cell_size, self.dimensions.1),
            clamped_axis_index(offset.z, self.cell_size, self.dimensions.2),
        )
    }

    /// The point set this grid was built from
    pub fn point_set(&self) -> &'a PointSet {
        self.points
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Minimum corner of the grid, which is the minimum corner of the bounding box of the point set
    pub fn origin(&self) -> &Point3<f64> {
        self.points.bounds().min()
    }

    /// Number of cells along the x, y and z axis
    pub fn dimensions(&self) -> CellIndex {
        self.dimensions
    }

    /// Total number of cells in the dense grid spanning the bounding box, occupied or not
    pub fn total_cell_count(&self) -> usize {
        self.total_cell_count
    }

    /// Number of cells that contain at least one point
    pub fn occupied_cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Number of cells in the dense grid that contain no points
    pub fn empty_cell_count(&self) -> usize {
        self.total_cell_count - self.cells.len()
    }

    /// Returns the number of points in the cell at `index`. Unoccupied cells, including cells outside of the grid,
    /// contain zero points
    pub fn point_count(&self, index: CellIndex) -> usize {
        self.cells
            .get(&index)
            .map(GridCell::point_count)
            .unwrap_or(0)
    }

    /// Returns the occupied cell at `index`, or `None` if the cell contains no points
    pub fn cell(&self, index: CellIndex) -> Option<&GridCell> {
        self.cells.get(&index)
    }

    /// Returns an iterator over `(cell index, point count)` for all occupied cells. The grid never changes after it
    /// was built, so every call yields the same pairs in the same order
    pub fn cells(&self) -> impl Iterator<Item = (CellIndex, usize)> + '_ {
        self.cells
            .values()
            .map(|cell| (cell.index, cell.point_count()))
    }

    /// Returns an iterator over all occupied cells including their point indices
    pub fn occupied_cells(&self) -> impl Iterator<Item = &GridCell> + '_ {
        self.cells.values()
    }

    /// Returns the index of the cell that would contain `point`, or `None` if `point` lies outside of the bounding box
    /// of the grid
    pub fn cell_index_of(&self, point: &Point3<f64>) -> Option<CellIndex> {
        if !self.points.bounds().contains(point) {
            return None;
        }
        Some(self.clamped_cell_index(point))
    }

    /// Returns the bounding box of the cell at `index`
    pub fn cell_bounds(&self, index: CellIndex) -> AABB<f64> {
        let min = self.origin()
            + Vector3::new(index.0 as f64, index.1 as f64, index.2 as f64) * self.cell_size;
        let max = min + Vector3::repeat(self.cell_size);
        AABB::from_min_max_unchecked(min, max)
    }

    /// Returns the indices of all points within `radius` of `center` (boundary inclusive), in ascending order. Only
    /// the cells overlapping the bounding box of the query sphere are visited
    pub fn points_in_radius(&self, center: &Point3<f64>, radius: f64) -> Vec<usize> {
        if radius.is_nan() || radius < 0.0 {
            return vec![];
        }
        let query_bounds = AABB::from_min_max_unchecked(
            center - Vector3::repeat(radius),
            center + Vector3::repeat(radius),
        );
        if !query_bounds.intersects(self.points.bounds()) {
            return vec![];
        }

        let lower = self.clamped_cell_index(query_bounds.min());
        let upper = self.clamped_cell_index(query_bounds.max());
        let visited_cells =
            (upper.0 - lower.0 + 1) as f64 * (upper.1 - lower.1 + 1) as f64 * (upper.2 - lower.2 + 1) as f64;

        let radius_squared = radius * radius;
        let mut found = vec![];
        let mut collect_from = |cell: &GridCell| {
            found.extend(cell.points.iter().copied().filter(|point_index| {
                (self.points[*point_index] - center).norm_squared() <= radius_squared
            }));
        };

        if visited_cells > self.cells.len() as f64 {
            // Sparse grid: scanning the occupied cells is cheaper than walking the index range
            self.cells
                .values()
                .filter(|cell| {
                    (lower.0..=upper.0).contains(&cell.index.0)
                        && (lower.1..=upper.1).contains(&cell.index.1)
                        && (lower.2..=upper.2).contains(&cell.index.2)
                })
                .for_each(&mut collect_from);
        } else {
            for x in lower.0..=upper.0 {
                for y in lower.1..=upper.1 {
                    for z in lower.2..=upper.2 {
                        if let Some(cell) = self.cells.get(&(x, y, z)) {
                            collect_from(cell);
                        }
                    }
                }
            }
        }

        found.sort_unstable();
        found
    }

    /// Time spent building this grid
    pub fn build_duration(&self) -> Duration {
        self.build_duration
    }
}
