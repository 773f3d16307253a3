use assert_approx_eq::assert_approx_eq;
use gridtree_algorithms::{
    acceleration_structures::{Octree, OctreeParameters},
    comparison::{compare, run_comparison, ComparisonParameters},
    uniform_grid::{GridParameters, UniformGrid},
};
use gridtree_core::{containers::PointSet, nalgebra::Point3};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Clouds with different shapes: a noisy volume, a flat plane, a straight line and a few clustered blobs
fn test_clouds() -> Vec<PointSet> {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let volume = (0..3000)
        .map(|_| {
            [
                rng.gen_range(-50.0..50.0),
                rng.gen_range(-50.0..50.0),
                rng.gen_range(0.0..10.0),
            ]
        })
        .collect::<Vec<_>>();
    let plane = (0..2000)
        .map(|_| [rng.gen_range(0.0..8.0), rng.gen_range(0.0..8.0), 1.5])
        .collect::<Vec<_>>();
    let line = (0..500)
        .map(|i| [i as f64 * 0.1, 2.0, -3.0])
        .collect::<Vec<_>>();
    let blobs = (0..2500)
        .map(|i| {
            let center = [(i % 5) as f64 * 20.0, 0.0, 0.0];
            [
                center[0] + rng.gen_range(-0.5..0.5),
                center[1] + rng.gen_range(-0.5..0.5),
                center[2] + rng.gen_range(-0.5..0.5),
            ]
        })
        .collect::<Vec<_>>();

    vec![volume, plane, line, blobs]
        .into_iter()
        .map(|coordinates| PointSet::from_coordinates(coordinates).unwrap())
        .collect()
}

fn octree_parameters() -> OctreeParameters {
    OctreeParameters::new(9, 12).unwrap()
}

#[test]
fn every_point_is_in_exactly_one_cell_and_one_leaf() {
    for points in test_clouds() {
        let grid = UniformGrid::build(&points, &GridParameters::new(0.8).unwrap()).unwrap();
        let octree = Octree::build(&points, &octree_parameters()).unwrap();

        let mut cell_hits = vec![0usize; points.len()];
        for cell in grid.occupied_cells() {
            for point_index in cell.points() {
                cell_hits[*point_index] += 1;
            }
        }
        let mut leaf_hits = vec![0usize; points.len()];
        for leaf in octree.leaves() {
            for point_index in leaf.points() {
                leaf_hits[*point_index] += 1;
            }
        }

        assert!(cell_hits.iter().all(|hits| *hits == 1));
        assert!(leaf_hits.iter().all(|hits| *hits == 1));
    }
}

#[test]
fn counts_sum_to_point_count() {
    for points in test_clouds() {
        let grid = UniformGrid::build(&points, &GridParameters::new(2.0).unwrap()).unwrap();
        let octree = Octree::build(&points, &octree_parameters()).unwrap();

        let cell_sum: usize = grid.cells().map(|(_, count)| count).sum();
        let leaf_sum: usize = octree.leaves().map(|leaf| leaf.point_count()).sum();
        assert_eq!(points.len(), cell_sum);
        assert_eq!(points.len(), leaf_sum);
    }
}

#[test]
fn leaf_volumes_add_up_to_root_volume() {
    for points in test_clouds() {
        let octree = Octree::build(&points, &octree_parameters()).unwrap();
        let root_volume = octree.bounds().volume();
        let leaf_volume: f64 = octree.leaves().map(|leaf| leaf.bounds().volume()).sum();
        assert!(root_volume > 0.0);
        assert_approx_eq!(root_volume, leaf_volume, root_volume * 1e-9);
    }
}

#[test]
fn leaves_do_not_overlap() {
    let points = &test_clouds()[0];
    let octree = Octree::build(points, &OctreeParameters::new(4, 50).unwrap()).unwrap();
    let leaves = octree.leaves().collect::<Vec<_>>();
    for (i, a) in leaves.iter().enumerate() {
        for b in leaves.iter().skip(i + 1) {
            // Neighbouring leaves may share a face, but never a volume
            let overlap = (0..3)
                .map(|axis| {
                    f64::min(a.bounds().max()[axis], b.bounds().max()[axis])
                        - f64::max(a.bounds().min()[axis], b.bounds().min()[axis])
                })
                .map(|length| length.max(0.0))
                .product::<f64>();
            assert_eq!(0.0, overlap);
        }
    }
}

#[test]
fn rebuilding_yields_identical_assignments() {
    for points in test_clouds() {
        let grid_parameters = GridParameters::new(1.25).unwrap();
        let first_grid = UniformGrid::build(&points, &grid_parameters).unwrap();
        let second_grid = UniformGrid::build(&points, &grid_parameters).unwrap();
        let mut first_cells = first_grid
            .occupied_cells()
            .map(|cell| (cell.index(), cell.points().to_vec()))
            .collect::<Vec<_>>();
        let mut second_cells = second_grid
            .occupied_cells()
            .map(|cell| (cell.index(), cell.points().to_vec()))
            .collect::<Vec<_>>();
        first_cells.sort();
        second_cells.sort();
        assert_eq!(first_cells, second_cells);

        let first_octree = Octree::build(&points, &octree_parameters()).unwrap();
        let second_octree = Octree::build(&points, &octree_parameters()).unwrap();
        assert_eq!(first_octree.leaf_count(), second_octree.leaf_count());
        assert!(first_octree
            .leaves()
            .zip(second_octree.leaves())
            .all(|(a, b)| a.bounds() == b.bounds() && a.points() == b.points()));

        let (first_grid_report, first_octree_report) = compare(&first_grid, &first_octree);
        let (second_grid_report, second_octree_report) = compare(&second_grid, &second_octree);
        assert_eq!(first_grid_report.occupied_count, second_grid_report.occupied_count);
        assert_eq!(first_octree_report.occupied_count, second_octree_report.occupied_count);
    }
}

#[test]
fn single_point_yields_one_cell_and_one_leaf() {
    let points = PointSet::from_coordinates(vec![[-3.0, 8.0, 0.25]]).unwrap();
    for min_points_per_leaf in [1, 2, 100] {
        let grid = UniformGrid::build(&points, &GridParameters::default()).unwrap();
        let octree =
            Octree::build(&points, &OctreeParameters::new(10, min_points_per_leaf).unwrap())
                .unwrap();
        assert_eq!(1, grid.occupied_cell_count());
        assert_eq!(1, octree.leaf_count());
        assert!(octree.root().is_leaf());
    }
}

#[test]
fn coincident_points_report() {
    let points = PointSet::from_coordinates(vec![[5.0, 5.0, 5.0]; 100]).unwrap();
    let parameters = ComparisonParameters {
        grid: GridParameters::new(1.0).unwrap(),
        octree: OctreeParameters::new(10, 1).unwrap(),
        deduplicate: false,
    };
    let comparison = run_comparison(&points, &parameters).unwrap();

    assert_eq!(1, comparison.grid.occupied_count);
    assert_eq!(100, comparison.grid.max_occupancy);
    assert_eq!(10, comparison.octree.depth);
    assert_eq!(1, comparison.octree.occupied_count);
    assert_eq!(100, comparison.octree.max_occupancy);
}

#[test]
fn grid_and_octree_radius_queries_agree() {
    let mut rng = StdRng::seed_from_u64(99);
    for points in test_clouds() {
        let grid = UniformGrid::build(&points, &GridParameters::new(1.5).unwrap()).unwrap();
        let octree = Octree::build(&points, &octree_parameters()).unwrap();
        for _ in 0..20 {
            let probe = points[rng.gen_range(0..points.len())];
            let center = Point3::new(probe.x + 0.3, probe.y - 0.2, probe.z);
            let radius = rng.gen_range(0.0..6.0);
            assert_eq!(
                grid.points_in_radius(&center, radius),
                octree.points_in_radius(&center, radius)
            );
        }
    }
}
