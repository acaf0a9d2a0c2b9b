//! Built-in demonstration suites.
//!
//! A suite is a named list of jobs sharing an output subtree. The linear elasticity suite uses
//! uniform displacement gradients, for which the discrete solution is exact and the grain
//! averages can be checked against the applied gradient.
use crate::boundary::{retain_components, uniform_traction, BoundaryCondition, BoundarySection};
use crate::comm::ExecutionContext;
use crate::error::{Error, Result};
use crate::function::{FunctionInput, Interpolant};
use crate::input::{
    CellType, ElasticDeformationInput, HeatDeformationInput, Job, MaterialInput, MeshInput, MeshSource,
    PolycrystalInput, ProcessInput, SlipDeformationInput,
};
use crate::material::{ElasticCrystal, ElasticMaterial, SlipCrystal, ThermalCrystal};
use crate::microstructure::{LayeredPolycrystal, SingleCrystal, VoronoiPolycrystal};
use crate::orientation::Orientation;
use crate::process::{run_job, JobReport, ProcessKind};
use crate::Extents;
use log::info;
use nalgebra::{Matrix3, Point3, Vector3};
use std::path::Path;

pub const LINEAR_SINGLE_CRYSTAL: &str = "linear-single-crystal";
pub const HEAT_POLYCRYSTAL: &str = "heat-polycrystal";
pub const SLIP_POLYCRYSTAL: &str = "slip-polycrystal";

pub const SUITES: [&str; 3] = [LINEAR_SINGLE_CRYSTAL, HEAT_POLYCRYSTAL, SLIP_POLYCRYSTAL];

/// Extents of the box used by the linear elasticity suite.
pub const SINGLE_CRYSTAL_EXTENTS: Extents = [[0.0, 1.0], [0.0, 2.0], [0.0, 3.0]];
const UNIT_CUBE: Extents = [[0.0, 1.0], [0.0, 1.0], [0.0, 1.0]];

/// Displacement gradient applied by the linear elasticity suite.
pub fn applied_gradient() -> Matrix3<f64> {
    Matrix3::new(1e-3, 2e-4, 0.0, 0.0, -5e-4, 1e-4, 3e-4, 0.0, 2e-3)
}

/// Isotropic material whose Mandel stiffness is the identity.
pub fn identity_iso() -> ElasticCrystal {
    ElasticCrystal::isotropic(1.0 / 3.0, 0.5)
}

/// Jobs of the named suite.
pub fn jobs(suite: &str) -> Result<Vec<Job>> {
    match suite {
        LINEAR_SINGLE_CRYSTAL => linear_single_crystal(),
        HEAT_POLYCRYSTAL => heat_polycrystal(),
        SLIP_POLYCRYSTAL => slip_polycrystal(),
        other => Err(Error::InvalidInput(format!(
            "unknown suite \"{other}\", expected one of {SUITES:?}"
        ))),
    }
}

/// Runs all jobs of a suite, optionally restricted to one process.
pub fn run_suite(
    ctx: &ExecutionContext,
    suite: &str,
    output_root: &Path,
    process: Option<ProcessKind>,
) -> eyre::Result<Vec<JobReport>> {
    let jobs: Vec<Job> = jobs(suite)?
        .into_iter()
        .filter(|job| process.map_or(true, |kind| job.process.kind() == kind))
        .collect();
    info!("Suite \"{suite}\": {} jobs", jobs.len());
    jobs.iter().map(|job| run_job(ctx, job, output_root)).collect()
}

fn box_mesh(name: &str, extents: Extents, divisions: [usize; 3], cell_type: CellType) -> Result<MeshInput> {
    let zmax = extents[2][1];
    MeshInput::builder(name, MeshSource::Box)
        .with_extents(extents)
        .with_divisions(divisions)
        .with_cell_type(cell_type)
        .with_boundary_section(BoundarySection::new("not-zmax", move |x| x.z < zmax - 1e-14))
        .build()
}

fn rotated() -> Result<Orientation> {
    Orientation::from_axis_angle(&Vector3::new(1.0, 1.0, 1.0), 0.4)
}

fn linear_single_crystal() -> Result<Vec<Job>> {
    let materials = [
        ("identity-iso", identity_iso()),
        ("cubic-211", ElasticCrystal::cubic(2.0, 1.0, 1.0)),
    ];
    let meshes = [
        box_mesh("box-tet", SINGLE_CRYSTAL_EXTENTS, [1, 2, 3], CellType::Tetrahedron)?,
        box_mesh("box-hex", SINGLE_CRYSTAL_EXTENTS, [1, 2, 3], CellType::Hexahedron)?,
    ];
    let orientations = [("identity", Orientation::identity()), ("rotated", rotated()?)];

    let a = applied_gradient();
    let displacement = FunctionInput::Interpolation(Interpolant::linear(a, None));
    let mut jobs = Vec::new();
    for (material_name, material) in &materials {
        for mesh in &meshes {
            for (polycrystal_name, orientation) in &orientations {
                let polycrystal = PolycrystalInput::new(*polycrystal_name, SingleCrystal::new(*orientation));
                let traction = uniform_traction(&a, orientation.matrix(), material.stiffness(), &Vector3::z());
                let deformations = [
                    ElasticDeformationInput::new("full")
                        .with_displacement_bc(BoundaryCondition::new("boundary", displacement.clone())),
                    ElasticDeformationInput::new("zmax-traction")
                        .with_displacement_bc(BoundaryCondition::new("not-zmax", displacement.clone()))
                        .with_traction_bc(BoundaryCondition::new("zmax", FunctionInput::constant(traction.as_slice()))),
                    ElasticDeformationInput::new("zmax-traction-z")
                        .with_displacement_bc(BoundaryCondition::new("not-zmax", displacement.clone()))
                        .with_traction_bc(BoundaryCondition::new(
                            "zmax",
                            FunctionInput::constant(retain_components(&traction, [false, false, true]).as_slice()),
                        )),
                    ElasticDeformationInput::new("zmax-traction-xy")
                        .with_displacement_bc(BoundaryCondition::new("not-zmax", displacement.clone()))
                        .with_traction_bc(BoundaryCondition::new(
                            "zmax",
                            FunctionInput::constant(retain_components(&traction, [true, true, false]).as_slice()),
                        )),
                ];
                for deformation in deformations {
                    jobs.push(Job::new(
                        LINEAR_SINGLE_CRYSTAL,
                        mesh.clone(),
                        polycrystal.clone(),
                        ProcessInput::LinearElasticity {
                            material: MaterialInput::single(*material_name, material.clone()),
                            deformation,
                        },
                    ));
                }
            }
        }
    }
    Ok(jobs)
}

fn layered(orientations: Vec<Orientation>) -> Result<LayeredPolycrystal> {
    LayeredPolycrystal::new(2, vec![0.5], orientations, None)
}

fn heat_polycrystal() -> Result<Vec<Job>> {
    let material = MaterialInput::single("ortho-123", ThermalCrystal::orthotropic([1.0, 2.0, 3.0])?);
    let mesh = box_mesh("cube-hex", UNIT_CUBE, [4, 4, 4], CellType::Hexahedron)?;
    let polycrystal = PolycrystalInput::new("layers", layered(vec![Orientation::identity(), rotated()?])?);
    let deformations = [
        HeatDeformationInput::new("gradient-x")
            .with_temperature_bc(BoundaryCondition::new("xmin", FunctionInput::constant(&[0.0])))
            .with_temperature_bc(BoundaryCondition::new("xmax", FunctionInput::constant(&[1.0]))),
        HeatDeformationInput::new("source-flux")
            .with_body_heat(FunctionInput::constant(&[1.0]))
            .with_temperature_bc(BoundaryCondition::new("zmin", FunctionInput::constant(&[0.0])))
            .with_flux_bc(BoundaryCondition::new("zmax", FunctionInput::constant(&[-0.5]))),
    ];
    Ok(deformations
        .into_iter()
        .map(|deformation| {
            Job::new(
                HEAT_POLYCRYSTAL,
                mesh.clone(),
                polycrystal.clone(),
                ProcessInput::HeatTransfer {
                    material: material.clone(),
                    deformation,
                },
            )
        })
        .collect())
}

fn slip_polycrystal() -> Result<Vec<Job>> {
    let material = MaterialInput::single("fcc", SlipCrystal::fcc(1e-3, 10.0, 100.0, 200.0)?);
    let mesh = box_mesh("cube-hex", UNIT_CUBE, [2, 2, 2], CellType::Hexahedron)?;
    let seeds = vec![Point3::new(0.25, 0.5, 0.5), Point3::new(0.75, 0.5, 0.5)];
    let voronoi = VoronoiPolycrystal::new(seeds, vec![Orientation::identity(), rotated()?], None)?;
    let polycrystal = PolycrystalInput::new("voronoi-2", voronoi);
    let deformation = SlipDeformationInput::uniform(
        "uniaxial-z",
        &[50.0],
        &Matrix3::zeros(),
        &Matrix3::from_diagonal(&Vector3::new(0.0, 0.0, 100.0)),
        1.0,
        20,
    )?;
    Ok(vec![Job::new(
        SLIP_POLYCRYSTAL,
        mesh,
        polycrystal,
        ProcessInput::Slip { material, deformation },
    )])
}
