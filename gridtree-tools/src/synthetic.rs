use std::{fmt, str::FromStr};

use anyhow::{anyhow, Result};
use gridtree_core::{containers::PointSet, nalgebra::Point3};
use rand::{distributions::Uniform, rngs::SmallRng, Rng, SeedableRng};

/// Shape of a synthetic point cloud
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloudShape {
    /// Points spread uniformly through a cube
    Uniform,
    /// Points on the z = 0 plane
    Plane,
    /// Points on the x axis
    Line,
    /// All points at the center of the cube
    Coincident,
}

impl CloudShape {
    pub const NAMES: [&'static str; 4] = ["uniform", "plane", "line", "coincident"];
}

impl FromStr for CloudShape {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "uniform" => Ok(CloudShape::Uniform),
            "plane" => Ok(CloudShape::Plane),
            "line" => Ok(CloudShape::Line),
            "coincident" => Ok(CloudShape::Coincident),
            other => Err(anyhow!(
                "Unknown cloud shape '{}', expected one of {}",
                other,
                CloudShape::NAMES.join(", ")
            )),
        }
    }
}

impl fmt::Display for CloudShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CloudShape::Uniform => "uniform",
            CloudShape::Plane => "plane",
            CloudShape::Line => "line",
            CloudShape::Coincident => "coincident",
        };
        write!(f, "{}", name)
    }
}

/// Description of a synthetic cloud. The same description always produces the same points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CloudDescription {
    pub shape: CloudShape,
    pub point_count: usize,
    /// Edge length of the cube `[0, extent)^3` the points are drawn from
    pub extent: f64,
    pub seed: u64,
}

impl CloudDescription {
    pub fn generate(&self) -> Result<PointSet> {
        if !self.extent.is_finite() || self.extent <= 0.0 {
            return Err(anyhow!(
                "Cloud extent must be a finite value > 0 (got {})",
                self.extent
            ));
        }

        let mut rng = SmallRng::seed_from_u64(self.seed);
        let range = Uniform::new(0.0, self.extent);
        let half = self.extent / 2.0;
        let points = (0..self.point_count)
            .map(|_| match self.shape {
                CloudShape::Uniform => {
                    Point3::new(rng.sample(range), rng.sample(range), rng.sample(range))
                }
                CloudShape::Plane => Point3::new(rng.sample(range), rng.sample(range), 0.0),
                CloudShape::Line => Point3::new(rng.sample(range), 0.0, 0.0),
                CloudShape::Coincident => Point3::new(half, half, half),
            })
            .collect();
        Ok(PointSet::new(points)?)
    }
}

impl fmt::Display for CloudDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} cloud ({} points, extent {}, seed {})",
            self.shape, self.point_count, self.extent, self.seed
        )
    }
}
