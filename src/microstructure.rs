//! Microstructures: grain geometry, grain phases and grain orientations.
use crate::error::{Error, Result};
use crate::orientation::Orientation;
use nalgebra::{distance_squared, Point3};
use std::fmt::Debug;

/// Capability interface of a polycrystal microstructure.
///
/// Grains are identified by dense IDs `0..num_grains()`, and every grain references a phase
/// in `0..num_phases()`.
pub trait Microstructure: Debug + Send + Sync {
    fn num_grains(&self) -> usize;

    fn num_phases(&self) -> usize;

    /// Phase (material index) of the given grain.
    ///
    /// # Panics
    ///
    /// Panics if `grain >= self.num_grains()`.
    fn phase_of(&self, grain: usize) -> usize;

    /// Orientation of the given grain.
    ///
    /// # Panics
    ///
    /// Panics if `grain >= self.num_grains()`.
    fn orientation_of(&self, grain: usize) -> &Orientation;

    /// Grain IDs of the given points.
    fn grain_of(&self, points: &[Point3<f64>]) -> Vec<usize>;
}

/// A single grain filling the whole domain.
#[derive(Debug, Clone, PartialEq)]
pub struct SingleCrystal {
    orientation: Orientation,
}

impl SingleCrystal {
    pub fn new(orientation: Orientation) -> Self {
        Self { orientation }
    }
}

impl Microstructure for SingleCrystal {
    fn num_grains(&self) -> usize {
        1
    }

    fn num_phases(&self) -> usize {
        1
    }

    fn phase_of(&self, grain: usize) -> usize {
        assert_eq!(grain, 0, "single crystal has only grain 0");
        0
    }

    fn orientation_of(&self, grain: usize) -> &Orientation {
        assert_eq!(grain, 0, "single crystal has only grain 0");
        &self.orientation
    }

    fn grain_of(&self, points: &[Point3<f64>]) -> Vec<usize> {
        vec![0; points.len()]
    }
}

/// Per-grain orientations and phases shared by the multi-grain microstructures.
#[derive(Debug, Clone, PartialEq)]
struct GrainTable {
    orientations: Vec<Orientation>,
    phases: Vec<usize>,
    num_phases: usize,
}

impl GrainTable {
    fn new(num_grains: usize, orientations: Vec<Orientation>, phases: Option<Vec<usize>>) -> Result<Self> {
        if num_grains == 0 {
            return Err(Error::InvalidInput("microstructure must have at least one grain".to_string()));
        }
        if orientations.len() != num_grains {
            return Err(Error::OrientationCount {
                expected: num_grains,
                actual: orientations.len(),
            });
        }
        let phases = phases.unwrap_or_else(|| vec![0; num_grains]);
        if phases.len() != num_grains {
            return Err(Error::InvalidInput(format!(
                "expected one phase per grain ({num_grains}), got {}",
                phases.len()
            )));
        }
        let num_phases = phases.iter().max().map(|&p| p + 1).unwrap_or(1);
        Ok(Self {
            orientations,
            phases,
            num_phases,
        })
    }
}

/// Grains as Voronoi cells of a set of seed points.
///
/// A point belongs to the grain of its nearest seed, ties going to the lowest grain ID.
#[derive(Debug, Clone, PartialEq)]
pub struct VoronoiPolycrystal {
    seeds: Vec<Point3<f64>>,
    grains: GrainTable,
}

impl VoronoiPolycrystal {
    /// Constructs a Voronoi polycrystal with one orientation per seed.
    ///
    /// `phases` defaults to a single phase shared by all grains.
    pub fn new(seeds: Vec<Point3<f64>>, orientations: Vec<Orientation>, phases: Option<Vec<usize>>) -> Result<Self> {
        let grains = GrainTable::new(seeds.len(), orientations, phases)?;
        Ok(Self { seeds, grains })
    }

    pub fn seeds(&self) -> &[Point3<f64>] {
        &self.seeds
    }
}

impl Microstructure for VoronoiPolycrystal {
    fn num_grains(&self) -> usize {
        self.seeds.len()
    }

    fn num_phases(&self) -> usize {
        self.grains.num_phases
    }

    fn phase_of(&self, grain: usize) -> usize {
        self.grains.phases[grain]
    }

    fn orientation_of(&self, grain: usize) -> &Orientation {
        &self.grains.orientations[grain]
    }

    fn grain_of(&self, points: &[Point3<f64>]) -> Vec<usize> {
        points
            .iter()
            .map(|x| {
                let mut nearest = 0;
                let mut nearest_dist2 = f64::INFINITY;
                for (grain, seed) in self.seeds.iter().enumerate() {
                    let dist2 = distance_squared(x, seed);
                    if dist2 < nearest_dist2 {
                        nearest = grain;
                        nearest_dist2 = dist2;
                    }
                }
                nearest
            })
            .collect()
    }
}

/// Grains as parallel slabs stacked along a coordinate axis.
///
/// Interfaces `z_0 < z_1 < ... < z_{n-1}` split the axis into `n + 1` grains, with points on an
/// interface belonging to the grain above it.
#[derive(Debug, Clone, PartialEq)]
pub struct LayeredPolycrystal {
    axis: usize,
    interfaces: Vec<f64>,
    grains: GrainTable,
}

impl LayeredPolycrystal {
    pub fn new(
        axis: usize,
        interfaces: Vec<f64>,
        orientations: Vec<Orientation>,
        phases: Option<Vec<usize>>,
    ) -> Result<Self> {
        if axis >= 3 {
            return Err(Error::InvalidInput(format!("layer axis must be 0, 1 or 2, got {axis}")));
        }
        if interfaces.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::InvalidInput("layer interfaces must be strictly increasing".to_string()));
        }
        let grains = GrainTable::new(interfaces.len() + 1, orientations, phases)?;
        Ok(Self {
            axis,
            interfaces,
            grains,
        })
    }
}

impl Microstructure for LayeredPolycrystal {
    fn num_grains(&self) -> usize {
        self.interfaces.len() + 1
    }

    fn num_phases(&self) -> usize {
        self.grains.num_phases
    }

    fn phase_of(&self, grain: usize) -> usize {
        self.grains.phases[grain]
    }

    fn orientation_of(&self, grain: usize) -> &Orientation {
        &self.grains.orientations[grain]
    }

    fn grain_of(&self, points: &[Point3<f64>]) -> Vec<usize> {
        points
            .iter()
            .map(|x| {
                let coord = x[self.axis];
                self.interfaces.partition_point(|&z| z <= coord)
            })
            .collect()
    }
}
