//! Stationary anisotropic heat conduction of a polycrystal.
use crate::assembly::{apply_dirichlet, assemble_heat, scalar_gradient, HeatCoefficients};
use crate::boundary::{resolve_essential, resolve_natural};
use crate::comm::ExecutionContext;
use crate::error::Error;
use crate::element::ElementQuadrature;
use crate::field::{conductivity_field, orientation_field, CellField, NodalField};
use crate::input::{HeatDeformationInput, Job, MaterialInput};
use crate::io::vtk::FiniteElementMeshDataSetBuilder;
use crate::material::ThermalCrystal;
use crate::output;
use crate::process::postprocess::{global_cell_averages, global_grain_ids, to_vectors};
use crate::process::{log_solver_report, Discretization, GrainAverages, JobReport, MeshCell, ProcessKind};
use crate::reduction::{
    grain_averages_components, grain_integrals_components, grain_volumes, CellIntegrand, NodalComponent,
};
use crate::solver::LinearSolver;
use crate::tensor::sample_conductivity;
use log::info;
use nalgebra::{DVector, Matrix3};
use std::path::Path;

/// Heat flux `q = -R K Rᵀ ∇T`.
#[derive(Debug, Clone, Copy)]
pub struct FluxIntegrand<'a> {
    pub temperature: &'a NodalField,
    /// Crystal-frame conductivity.
    pub conductivity: &'a CellField<Matrix3<f64>>,
    pub orientation: &'a CellField<Matrix3<f64>>,
}

impl<'a> CellIntegrand for FluxIntegrand<'a> {
    fn num_components(&self) -> usize {
        3
    }

    fn evaluate(&self, local_cell: usize, quadrature: &ElementQuadrature, q: usize, values: &mut [f64]) {
        let k_s = sample_conductivity(&self.conductivity[local_cell], &self.orientation[local_cell]);
        let flux = -(k_s * scalar_gradient(quadrature, q, self.temperature.values()));
        values.copy_from_slice(flux.as_slice());
    }
}

pub fn run<C: MeshCell>(
    ctx: &ExecutionContext,
    job: &Job,
    material: &MaterialInput<ThermalCrystal>,
    deformation: &HeatDeformationInput,
    directory: &Path,
) -> eyre::Result<JobReport> {
    let options = job.effective_options();
    let discretization = Discretization::<C>::new(ctx, &job.mesh, &job.polycrystal)?;
    let microstructure = job.polycrystal.microstructure();

    let grain_cells = &discretization.grain_cells;
    let fields = conductivity_field(grain_cells, microstructure, material.materials())
        .and_then(|conductivity| Ok((conductivity, orientation_field(grain_cells, microstructure)?)));
    let (conductivity, orientation) =
        ctx.agree(fields, || Error::PeerFailed("heat coefficient fields".to_string()))?;
    if let Some(body_heat) = &deformation.body_heat {
        body_heat.check_components(1)?;
    }
    let coefficients = HeatCoefficients {
        conductivity: &conductivity,
        orientation: &orientation,
        body_heat: deformation.body_heat.as_ref(),
    };

    let mesh = &discretization.mesh;
    let essential = resolve_essential(&discretization.boundary, mesh.vertices(), &deformation.temperature_bcs, 1)?;
    let fluxes = resolve_natural(&discretization.boundary, &deformation.flux_bcs, 1)?;
    info!(
        "Heat transfer: {} constrained DOFs, {} flux conditions",
        essential.len(),
        fluxes.len()
    );

    let mut system = assemble_heat(
        ctx,
        mesh,
        &discretization.distribution,
        &discretization.quadratures,
        &coefficients,
        &discretization.boundary,
        &fluxes,
    )?;
    apply_dirichlet(&mut system, &essential)?;
    let mut t = DVector::zeros(system.rhs.len());
    let solver_report = options.solver().solve(&system.matrix, &system.rhs, &mut t)?;
    log_solver_report(&solver_report);
    let temperature = NodalField::from_values(1, t)?;

    let flux = FluxIntegrand {
        temperature: &temperature,
        conductivity: &conductivity,
        orientation: &orientation,
    };
    let temperature_component = NodalComponent {
        field: &temperature,
        component: 0,
    };
    let quadratures = &discretization.quadratures;
    let volumes = grain_volumes(ctx, quadratures, grain_cells)?;
    let temperature_averages = grain_averages_components(
        &grain_integrals_components(ctx, quadratures, grain_cells, &temperature_component)?,
        &volumes,
    );
    let flux_averages = grain_averages_components(
        &grain_integrals_components(ctx, quadratures, grain_cells, &flux)?,
        &volumes,
    );
    let grain_averages = GrainAverages::new(volumes)
        .with_quantity("temperature", &temperature_averages)
        .with_quantity("flux", &flux_averages);

    let fields_file = if options.write_fields {
        let grain_ids = global_grain_ids(ctx, &discretization);
        let cell_flux = to_vectors(&global_cell_averages(ctx, &discretization, &flux));
        let nodal_temperature = temperature.values().as_slice().to_vec();
        let path = output::write_fields(ctx, directory, |path| {
            FiniteElementMeshDataSetBuilder::from_mesh(mesh)
                .with_title(ProcessKind::HeatTransfer.name())
                .with_cell_index_attributes("grain-id", &grain_ids)?
                .with_point_scalar_attributes("temperature", 1, nodal_temperature)?
                .with_cell_vector_attributes("flux", &cell_flux)?
                .try_export(path)
        })?;
        Some(path)
    } else {
        None
    };
    let archive_file = output::write_grain_archive(ctx, directory, &grain_averages)?;

    Ok(JobReport {
        process: ProcessKind::HeatTransfer,
        output_directory: directory.to_path_buf(),
        solver: Some(solver_report),
        grain_averages,
        fields_file,
        archive_file,
    })
}
