#![warn(clippy::all)]

use std::{ffi::OsString, fs, path::PathBuf, time::Instant};

use anyhow::{anyhow, Context, Result};
use clap::{value_t, App, AppSettings, Arg, ArgMatches, SubCommand};
use gridtree_algorithms::{
    acceleration_structures::{Octree, OctreeParameters},
    comparison::{run_presets, ComparisonParameters},
};
use gridtree_core::containers::PointSet;
use log::info;

mod report;
mod synthetic;

use report::{comparison_column, leaf_line, side_by_side};
use synthetic::{CloudDescription, CloudShape};

/// Where the parameter sets of a comparison come from
#[derive(Debug, Clone, PartialEq)]
enum ParameterSource {
    /// The three standard parameter sets
    Presets,
    /// A JSON file holding a list of parameter sets
    File(PathBuf),
    /// A single parameter set assembled from command line flags
    Explicit(ComparisonParameters),
}

#[derive(Debug, Clone, PartialEq)]
enum Command {
    /// Build grid and octree for every parameter set and print the statistics side by side
    Compare {
        parameters: ParameterSource,
        keep_duplicates: bool,
    },
    /// Build an octree with automatic parameters and print a selection of its occupied leaves
    Leaves { max_leaves: Option<usize> },
}

#[derive(Debug, Clone, PartialEq)]
struct Args {
    pub cloud: CloudDescription,
    pub command: Command,
}

fn cloud_args() -> Vec<Arg<'static, 'static>> {
    vec![
        Arg::with_name("SHAPE")
            .short("s")
            .long("shape")
            .takes_value(true)
            .possible_values(&CloudShape::NAMES)
            .default_value("uniform")
            .help("Shape of the synthetic point cloud"),
        Arg::with_name("POINTS")
            .short("n")
            .long("points")
            .takes_value(true)
            .default_value("100000")
            .help("Number of points to generate"),
        Arg::with_name("EXTENT")
            .long("extent")
            .takes_value(true)
            .default_value("100")
            .help("Edge length of the cube the points are drawn from"),
        Arg::with_name("SEED")
            .long("seed")
            .takes_value(true)
            .default_value("42")
            .help("Seed of the random number generator"),
    ]
}

fn get_cloud(matches: &ArgMatches) -> Result<CloudDescription> {
    Ok(CloudDescription {
        shape: matches
            .value_of("SHAPE")
            .unwrap_or("uniform")
            .parse()?,
        point_count: value_t!(matches, "POINTS", usize)?,
        extent: value_t!(matches, "EXTENT", f64)?,
        seed: value_t!(matches, "SEED", u64)?,
    })
}

fn get_parameter_source(matches: &ArgMatches) -> Result<ParameterSource> {
    let explicit_flags = ["CELL_SIZE", "MAX_DEPTH", "MIN_POINTS", "MIN_NODE_SIZE"];
    let has_explicit_flags = explicit_flags.iter().any(|flag| matches.is_present(flag));

    if let Some(path) = matches.value_of("PRESETS") {
        if has_explicit_flags {
            return Err(anyhow!(
                "--presets can not be combined with explicit grid or octree parameters"
            ));
        }
        return Ok(ParameterSource::File(PathBuf::from(path)));
    }
    if !has_explicit_flags {
        return Ok(ParameterSource::Presets);
    }

    let mut parameters = ComparisonParameters::default();
    if matches.is_present("CELL_SIZE") {
        parameters.grid.cell_size = value_t!(matches, "CELL_SIZE", f64)?;
    }
    if matches.is_present("MAX_DEPTH") {
        parameters.octree.max_depth = value_t!(matches, "MAX_DEPTH", usize)?;
    }
    if matches.is_present("MIN_POINTS") {
        parameters.octree.min_points_per_leaf = value_t!(matches, "MIN_POINTS", usize)?;
    }
    if matches.is_present("MIN_NODE_SIZE") {
        parameters.octree.min_node_size = Some(value_t!(matches, "MIN_NODE_SIZE", f64)?);
    }
    parameters.validate()?;
    Ok(ParameterSource::Explicit(parameters))
}

fn parse_args<I, T>(args: I) -> Result<Args>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = App::new("gridtree")
        .version("0.1")
        .about("Compares a uniform occupancy grid with an adaptive octree on synthetic point clouds")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommand(
            SubCommand::with_name("compare")
                .about("Prints grid and octree statistics side by side for one or more parameter sets")
                .args(&cloud_args())
                .arg(
                    Arg::with_name("PRESETS")
                        .short("p")
                        .long("presets")
                        .takes_value(true)
                        .value_name("FILE")
                        .help("JSON file with a list of parameter sets to use instead of the standard presets"),
                )
                .arg(
                    Arg::with_name("CELL_SIZE")
                        .long("cell-size")
                        .takes_value(true)
                        .help("Edge length of the grid cells"),
                )
                .arg(
                    Arg::with_name("MAX_DEPTH")
                        .long("max-depth")
                        .takes_value(true)
                        .help("Depth at which octree nodes are no longer split"),
                )
                .arg(
                    Arg::with_name("MIN_POINTS")
                        .long("min-points")
                        .takes_value(true)
                        .help("Octree nodes with at most this many points are not split"),
                )
                .arg(
                    Arg::with_name("MIN_NODE_SIZE")
                        .long("min-node-size")
                        .takes_value(true)
                        .help("Octree nodes with at most this edge length are not split"),
                )
                .arg(
                    Arg::with_name("KEEP_DUPLICATES")
                        .long("keep-duplicates")
                        .help("Do not remove duplicate points before building the structures"),
                ),
        )
        .subcommand(
            SubCommand::with_name("leaves")
                .about("Prints the boxes of representative occupied octree leaves")
                .args(&cloud_args())
                .arg(
                    Arg::with_name("MAX_LEAVES")
                        .short("m")
                        .long("max-leaves")
                        .takes_value(true)
                        .help("Maximum number of leaves to print, 0 prints all of them. Defaults to min(n / 10, 10000)"),
                ),
        )
        .get_matches_from_safe(args)?;

    match matches.subcommand() {
        ("compare", Some(sub_matches)) => Ok(Args {
            cloud: get_cloud(sub_matches)?,
            command: Command::Compare {
                parameters: get_parameter_source(sub_matches)?,
                keep_duplicates: sub_matches.is_present("KEEP_DUPLICATES"),
            },
        }),
        ("leaves", Some(sub_matches)) => Ok(Args {
            cloud: get_cloud(sub_matches)?,
            command: Command::Leaves {
                max_leaves: if sub_matches.is_present("MAX_LEAVES") {
                    Some(value_t!(sub_matches, "MAX_LEAVES", usize)?)
                } else {
                    None
                },
            },
        }),
        (other, _) => Err(anyhow!("Unknown command '{}'", other)),
    }
}

fn load_parameter_sets(source: &ParameterSource) -> Result<Vec<ComparisonParameters>> {
    let parameter_sets = match source {
        ParameterSource::Presets => ComparisonParameters::presets(),
        ParameterSource::Explicit(parameters) => vec![*parameters],
        ParameterSource::File(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("Could not read presets file {}", path.display()))?;
            let parameter_sets: Vec<ComparisonParameters> = serde_json::from_str(&json)
                .with_context(|| format!("Invalid presets file {}", path.display()))?;
            if parameter_sets.is_empty() {
                return Err(anyhow!("Presets file {} is empty", path.display()));
            }
            parameter_sets
        }
    };
    for parameters in &parameter_sets {
        parameters.validate()?;
    }
    Ok(parameter_sets)
}

fn compare(
    cloud: &CloudDescription,
    points: &PointSet,
    source: &ParameterSource,
    keep_duplicates: bool,
) -> Result<()> {
    let mut parameter_sets = load_parameter_sets(source)?;
    if keep_duplicates {
        for parameters in parameter_sets.iter_mut() {
            parameters.deduplicate = false;
        }
    }
    info!(
        "Comparing grid and octree for {} parameter set(s)",
        parameter_sets.len()
    );
    let comparisons = run_presets(points, &parameter_sets)?;

    let cloud_name = cloud.to_string();
    let columns = comparisons
        .iter()
        .map(|comparison| comparison_column(&cloud_name, comparison))
        .collect::<Vec<_>>();
    print!("{}", side_by_side(&columns));
    Ok(())
}

fn leaves(points: &PointSet, max_leaves: Option<usize>) -> Result<()> {
    let parameters = OctreeParameters::auto_for(points);
    let max_leaves = max_leaves.unwrap_or_else(|| usize::min(points.len() / 10, 10_000));
    println!(
        "Auto parameters -> min_node_size: {:.3}, min_points_per_leaf: {}, max_leaves: {}",
        parameters.min_node_size.unwrap_or(0.0),
        parameters.min_points_per_leaf,
        max_leaves
    );

    let t_start = Instant::now();
    let octree = Octree::build(points, &parameters)?;
    println!("Built octree in {:.2}s", t_start.elapsed().as_secs_f64());

    let occupied_count = octree.occupied_leaves().count();
    println!("Occupied leaves: {}", occupied_count);
    let selected = octree.representative_leaves(max_leaves);
    if selected.len() < occupied_count {
        println!("Selected {} representative leaves", selected.len());
    } else {
        println!("Showing all {} leaves", occupied_count);
    }
    for leaf in selected {
        println!("{}", leaf_line(leaf));
    }
    Ok(())
}

fn main() -> Result<()> {
    pretty_env_logger::init();

    let args = match parse_args(std::env::args_os()) {
        Ok(args) => args,
        // Help, version and usage errors are printed by clap, which also picks the exit code
        Err(error) => match error.downcast::<clap::Error>() {
            Ok(clap_error) => clap_error.exit(),
            Err(error) => return Err(error),
        },
    };
    let t_start = Instant::now();
    let points = args.cloud.generate()?;
    info!(
        "Generated {} in {:.2}s",
        args.cloud,
        t_start.elapsed().as_secs_f64()
    );

    match &args.command {
        Command::Compare {
            parameters,
            keep_duplicates,
        } => compare(&args.cloud, &points, parameters, *keep_duplicates),
        Command::Leaves { max_leaves } => leaves(&points, *max_leaves),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::ErrorKind;
    use gridtree_algorithms::uniform_grid::GridParameters;

    #[test]
    fn test_compare_defaults_to_presets() {
        let args = parse_args(vec!["gridtree", "compare"]).unwrap();
        assert_eq!(
            CloudDescription {
                shape: CloudShape::Uniform,
                point_count: 100_000,
                extent: 100.0,
                seed: 42,
            },
            args.cloud
        );
        assert_eq!(
            Command::Compare {
                parameters: ParameterSource::Presets,
                keep_duplicates: false,
            },
            args.command
        );
    }

    #[test]
    fn test_compare_with_explicit_parameters() {
        let args = parse_args(vec![
            "gridtree",
            "compare",
            "--shape",
            "plane",
            "-n",
            "500",
            "--cell-size",
            "2.5",
            "--min-points",
            "8",
            "--keep-duplicates",
        ])
        .unwrap();
        assert_eq!(CloudShape::Plane, args.cloud.shape);
        assert_eq!(500, args.cloud.point_count);

        let expected = ComparisonParameters {
            grid: GridParameters { cell_size: 2.5 },
            octree: OctreeParameters {
                min_points_per_leaf: 8,
                ..OctreeParameters::default()
            },
            deduplicate: true,
        };
        assert_eq!(
            Command::Compare {
                parameters: ParameterSource::Explicit(expected),
                keep_duplicates: true,
            },
            args.command
        );
    }

    #[test]
    fn test_help_and_version_are_left_to_clap() {
        for (args, expected_kind) in [
            (vec!["gridtree", "--help"], ErrorKind::HelpDisplayed),
            (vec!["gridtree", "compare", "--help"], ErrorKind::HelpDisplayed),
            (vec!["gridtree", "--version"], ErrorKind::VersionDisplayed),
        ] {
            let error = parse_args(args).unwrap_err();
            let clap_error = error
                .downcast_ref::<clap::Error>()
                .expect("help and version requests must surface as clap errors");
            assert_eq!(expected_kind, clap_error.kind);
            // clap exits with 0 for these
            assert!(!clap_error.use_stderr());
        }
    }

    #[test]
    fn test_invalid_arguments() {
        assert!(parse_args(vec!["gridtree", "compare", "--cell-size", "0"]).is_err());
        assert!(parse_args(vec!["gridtree", "compare", "--min-points", "0"]).is_err());
        assert!(parse_args(vec!["gridtree", "compare", "--shape", "sphere"]).is_err());
        assert!(parse_args(vec!["gridtree", "leaves", "--max-leaves", "many"]).is_err());
        assert!(parse_args(vec![
            "gridtree",
            "compare",
            "--presets",
            "presets.json",
            "--max-depth",
            "3"
        ])
        .is_err());
        assert!(parse_args(vec!["gridtree"]).is_err());
    }

    #[test]
    fn test_leaves_arguments() {
        let args = parse_args(vec!["gridtree", "leaves", "--seed", "3", "-m", "25"]).unwrap();
        assert_eq!(3, args.cloud.seed);
        assert_eq!(
            Command::Leaves {
                max_leaves: Some(25)
            },
            args.command
        );

        let args = parse_args(vec!["gridtree", "leaves"]).unwrap();
        assert_eq!(Command::Leaves { max_leaves: None }, args.command);
    }

    #[test]
    fn test_load_parameter_sets_from_file() {
        let path = std::env::temp_dir().join("gridtree_tools_test_presets.json");
        fs::write(
            &path,
            r#"[
                {"grid": {"cell_size": 2.0}, "octree": {"max_depth": 6, "min_points_per_leaf": 4}},
                {"grid": {"cell_size": 0.5}, "octree": {"max_depth": 8, "min_points_per_leaf": 1, "min_node_size": 0.25}, "deduplicate": false}
            ]"#,
        )
        .unwrap();

        let parameter_sets = load_parameter_sets(&ParameterSource::File(path.clone())).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(2, parameter_sets.len());
        assert!(parameter_sets[0].deduplicate);
        assert_eq!(None, parameter_sets[0].octree.min_node_size);
        assert!(!parameter_sets[1].deduplicate);
        assert_eq!(Some(0.25), parameter_sets[1].octree.min_node_size);
    }

    #[test]
    fn test_missing_presets_file() {
        let source = ParameterSource::File(PathBuf::from("/nonexistent/gridtree/presets.json"));
        assert!(load_parameter_sets(&source).is_err());
    }

    #[test]
    fn test_presets_are_the_standard_ones() {
        assert_eq!(
            ComparisonParameters::presets(),
            load_parameter_sets(&ParameterSource::Presets).unwrap()
        );
    }
}
