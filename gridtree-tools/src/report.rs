use gridtree_algorithms::{
    acceleration_structures::{OctreeNode, OctreeParameters},
    comparison::Comparison,
};

const COLUMN_SEPARATOR: &str = " | ";

/// Describes the octree parameters in a single line
fn octree_parameter_line(parameters: &OctreeParameters) -> String {
    match parameters.min_node_size {
        Some(size) => format!(
            "  max_depth: {}, min_points_per_leaf: {}, min_node_size: {}",
            parameters.max_depth, parameters.min_points_per_leaf, size
        ),
        None => format!(
            "  max_depth: {}, min_points_per_leaf: {}",
            parameters.max_depth, parameters.min_points_per_leaf
        ),
    }
}

/// Text lines describing one comparison run, to be shown as one column of the side-by-side report
pub fn comparison_column(cloud_name: &str, comparison: &Comparison) -> Vec<String> {
    let mut column = vec![
        format!("Analyzing: {}", cloud_name),
        "Comparative analysis".to_string(),
        format!("Points: {}", comparison.point_count),
        format!("  cell_size: {}", comparison.parameters.grid.cell_size),
    ];
    column.extend(comparison.grid.lines());
    column.push(octree_parameter_line(&comparison.parameters.octree));
    column.extend(comparison.octree.lines());
    column
}

/// Lays out `columns` next to each other. Every column is padded to the width of the longest line plus two, columns
/// are separated by `" | "` and the table is framed by dashed lines. Shorter columns are filled with blank lines
pub fn side_by_side(columns: &[Vec<String>]) -> String {
    if columns.is_empty() {
        return String::new();
    }

    let row_count = columns.iter().map(|column| column.len()).max().unwrap_or(0);
    let width = columns
        .iter()
        .flat_map(|column| column.iter().map(|line| line.chars().count()))
        .max()
        .unwrap_or(0)
        + 2;
    let border = "-".repeat(columns.len() * width + (columns.len() - 1) * COLUMN_SEPARATOR.len());

    let mut table = String::new();
    table.push_str(&border);
    table.push('\n');
    for row in 0..row_count {
        let line = columns
            .iter()
            .map(|column| {
                let cell = column.get(row).map(String::as_str).unwrap_or("");
                format!("{:<width$}", cell, width = width)
            })
            .collect::<Vec<_>>()
            .join(COLUMN_SEPARATOR);
        table.push_str(&line);
        table.push('\n');
    }
    table.push_str(&border);
    table.push('\n');
    table
}

/// One line per leaf with the center, edge lengths and point count of its box
pub fn leaf_line(leaf: &OctreeNode) -> String {
    let center = leaf.center();
    let extent = leaf.bounds().extent();
    format!(
        "center ({:.4}, {:.4}, {:.4})  extent ({:.4}, {:.4}, {:.4})  count {}",
        center.x,
        center.y,
        center.z,
        extent.x,
        extent.y,
        extent.z,
        leaf.point_count()
    )
}
