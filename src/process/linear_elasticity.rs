//! Anisotropic linear elasticity of a polycrystal.
//!
//! The stress is `σ = C (ε(u) - β - α)`, with `C` the rotated crystal stiffness, `β` the
//! sample-frame plastic distortion and `α` the crystal-frame thermal expansion strain.
use crate::assembly::{apply_dirichlet, assemble_elasticity, displacement_gradient, ElasticityCoefficients};
use crate::boundary::{resolve_essential, resolve_natural};
use crate::comm::ExecutionContext;
use crate::element::ElementQuadrature;
use crate::error::{Error, Result};
use crate::field::{orientation_field, stiffness_field, CellField, NodalField};
use crate::function::FunctionInput;
use crate::input::{ElasticDeformationInput, Job, MaterialInput};
use crate::io::vtk::FiniteElementMeshDataSetBuilder;
use crate::material::ElasticCrystal;
use crate::microstructure::Microstructure;
use crate::output;
use crate::process::postprocess::{global_cell_averages, global_grain_ids, load_tensor_cells, to_tensors};
use crate::process::{log_solver_report, Discretization, GrainAverages, JobReport, MeshCell, ProcessKind};
use crate::reduction::{grain_averages_components, grain_integrals_components, grain_volumes, CellIntegrand};
use crate::solver::LinearSolver;
use crate::tensor::{sample_stress, sym, totensor};
use log::info;
use nalgebra::{DVector, Matrix3, Matrix6};
use std::path::Path;

/// Small strain `sym(∇u)` as nine row-major components.
#[derive(Debug, Clone, Copy)]
pub struct StrainIntegrand<'a> {
    pub displacement: &'a NodalField,
}

impl<'a> CellIntegrand for StrainIntegrand<'a> {
    fn num_components(&self) -> usize {
        9
    }

    fn evaluate(&self, _local_cell: usize, quadrature: &ElementQuadrature, q: usize, values: &mut [f64]) {
        let strain = sym(&displacement_gradient(quadrature, q, self.displacement.values()));
        write_row_major(&strain, values);
    }
}

/// Sample-frame stress as nine row-major components.
#[derive(Debug, Clone, Copy)]
pub struct StressIntegrand<'a> {
    pub displacement: &'a NodalField,
    pub coefficients: ElasticityCoefficients<'a>,
}

impl<'a> StressIntegrand<'a> {
    pub fn stress(&self, local_cell: usize, quadrature: &ElementQuadrature, q: usize) -> Matrix3<f64> {
        let grad_u = displacement_gradient(quadrature, q, self.displacement.values());
        let stiffness = &self.coefficients.stiffness[local_cell];
        let r = &self.coefficients.orientation[local_cell];
        sample_stress(&grad_u, stiffness, r) - totensor(&self.coefficients.eigenstress(local_cell))
    }
}

impl<'a> CellIntegrand for StressIntegrand<'a> {
    fn num_components(&self) -> usize {
        9
    }

    fn evaluate(&self, local_cell: usize, quadrature: &ElementQuadrature, q: usize, values: &mut [f64]) {
        write_row_major(&self.stress(local_cell, quadrature, q), values);
    }
}

fn write_row_major(m: &Matrix3<f64>, values: &mut [f64]) {
    for i in 0..3 {
        for j in 0..3 {
            values[3 * i + j] = m[(i, j)];
        }
    }
}

/// Cell coefficient fields of the owned cells.
struct ElasticityFields {
    stiffness: CellField<Matrix6<f64>>,
    orientation: CellField<Matrix3<f64>>,
    plastic_distortion: Option<CellField<Matrix3<f64>>>,
    thermal_expansion: Option<CellField<Matrix3<f64>>>,
}

fn load_fields<C: MeshCell>(
    discretization: &Discretization<C>,
    microstructure: &dyn Microstructure,
    material: &MaterialInput<ElasticCrystal>,
    deformation: &ElasticDeformationInput,
) -> Result<ElasticityFields> {
    let grain_cells = &discretization.grain_cells;
    let centroids = discretization.owned_centroids();
    let load = |function: &Option<FunctionInput>| {
        function
            .as_ref()
            .map(|f| load_tensor_cells(f, &centroids))
            .transpose()
    };
    Ok(ElasticityFields {
        stiffness: stiffness_field(grain_cells, microstructure, material.materials())?,
        orientation: orientation_field(grain_cells, microstructure)?,
        plastic_distortion: load(&deformation.plastic_distortion)?,
        thermal_expansion: load(&deformation.thermal_expansion)?,
    })
}

pub fn run<C: MeshCell>(
    ctx: &ExecutionContext,
    job: &Job,
    material: &MaterialInput<ElasticCrystal>,
    deformation: &ElasticDeformationInput,
    directory: &Path,
) -> eyre::Result<JobReport> {
    let options = job.effective_options();
    let discretization = Discretization::<C>::new(ctx, &job.mesh, &job.polycrystal)?;
    let microstructure = job.polycrystal.microstructure();

    let fields = ctx.agree(load_fields(&discretization, microstructure, material, deformation), || {
        Error::PeerFailed("elasticity coefficient fields".to_string())
    })?;
    if let Some(force_density) = &deformation.force_density {
        force_density.check_components(3)?;
    }
    let coefficients = ElasticityCoefficients {
        stiffness: &fields.stiffness,
        orientation: &fields.orientation,
        force_density: deformation.force_density.as_ref(),
        plastic_distortion: fields.plastic_distortion.as_ref(),
        thermal_expansion: fields.thermal_expansion.as_ref(),
    };

    let mesh = &discretization.mesh;
    let essential = resolve_essential(&discretization.boundary, mesh.vertices(), &deformation.displacement_bcs, 3)?;
    let tractions = resolve_natural(&discretization.boundary, &deformation.traction_bcs, 3)?;
    info!(
        "Elasticity: {} constrained DOFs, {} traction conditions",
        essential.len(),
        tractions.len()
    );

    let mut system = assemble_elasticity(
        ctx,
        mesh,
        &discretization.distribution,
        &discretization.quadratures,
        &coefficients,
        &discretization.boundary,
        &tractions,
    )?;
    apply_dirichlet(&mut system, &essential)?;
    let mut u = DVector::zeros(system.rhs.len());
    let solver_report = options.solver().solve(&system.matrix, &system.rhs, &mut u)?;
    log_solver_report(&solver_report);
    let displacement = NodalField::from_values(3, u)?;

    let strain = StrainIntegrand {
        displacement: &displacement,
    };
    let stress = StressIntegrand {
        displacement: &displacement,
        coefficients,
    };
    let quadratures = &discretization.quadratures;
    let grain_cells = &discretization.grain_cells;
    let volumes = grain_volumes(ctx, quadratures, grain_cells)?;
    let strain_averages = grain_averages_components(
        &grain_integrals_components(ctx, quadratures, grain_cells, &strain)?,
        &volumes,
    );
    let stress_averages = grain_averages_components(
        &grain_integrals_components(ctx, quadratures, grain_cells, &stress)?,
        &volumes,
    );
    let grain_averages = GrainAverages::new(volumes)
        .with_quantity("strain", &strain_averages)
        .with_quantity("stress", &stress_averages);

    let fields_file = if options.write_fields {
        let grain_ids = global_grain_ids(ctx, &discretization);
        let cell_strain = to_tensors(&global_cell_averages(ctx, &discretization, &strain));
        let cell_stress = to_tensors(&global_cell_averages(ctx, &discretization, &stress));
        let displacements: Vec<_> = (0..displacement.num_nodes())
            .map(|node| displacement.node_vector3(node))
            .collect();
        let path = output::write_fields(ctx, directory, |path| {
            FiniteElementMeshDataSetBuilder::from_mesh(mesh)
                .with_title(ProcessKind::LinearElasticity.name())
                .with_cell_index_attributes("grain-id", &grain_ids)?
                .with_point_vector_attributes("displacement", &displacements)?
                .with_cell_tensor_attributes("strain", &cell_strain)?
                .with_cell_tensor_attributes("stress", &cell_stress)?
                .try_export(path)
        })?;
        Some(path)
    } else {
        None
    };
    let archive_file = output::write_grain_archive(ctx, directory, &grain_averages)?;

    Ok(JobReport {
        process: ProcessKind::LinearElasticity,
        output_directory: directory.to_path_buf(),
        solver: Some(solver_report),
        grain_averages,
        fields_file,
        archive_file,
    })
}
