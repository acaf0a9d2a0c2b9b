//! Explicit stress-controlled integration of crystal slip hardening.
//!
//! Every cell is integrated independently in the crystal frame of its grain, with the loading
//! evaluated at the cell centroid. The crystal-frame stress is ramped linearly from `σ₀` to `σ_T`
//! over `nsteps` forward Euler steps.
use crate::comm::ExecutionContext;
use crate::error::{Error, Result};
use crate::field::{check_materials, material_of, CellField};
use crate::function::load_cells;
use crate::input::{Job, MaterialInput, SlipDeformationInput};
use crate::io::vtk::FiniteElementMeshDataSetBuilder;
use crate::material::{SlipCrystal, SlipMaterial};
use crate::microstructure::Microstructure;
use crate::output;
use crate::partition::GrainCells;
use crate::process::postprocess::{global_cell_averages, global_grain_ids, load_tensor_cells};
use crate::process::{Discretization, GrainAverages, JobReport, MeshCell, ProcessKind};
use crate::reduction::{grain_averages_components, grain_integrals_components, grain_volumes, CellComponents};
use crate::tensor::tocrystal;
use log::{debug, info};
use nalgebra::{DVector, Matrix3, Point3};
use std::path::Path;

/// Rejects microstructures the slip process cannot handle.
pub fn check_supported(microstructure: &dyn Microstructure) -> Result<()> {
    if microstructure.num_phases() > 1 {
        return Err(Error::NotImplemented(format!(
            "slip process on a microstructure with {} phases",
            microstructure.num_phases()
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlipPhase {
    Initialized,
    /// The number of completed steps.
    Stepping(usize),
    Finalized,
}

/// Forward Euler integration of a slip material under a linearly ramped crystal-frame stress.
#[derive(Debug, Clone)]
pub struct SlipIntegrator<'a, M> {
    material: &'a M,
    state: Vec<f64>,
    derivative: Vec<f64>,
    stress: Matrix3<f64>,
    increment: Matrix3<f64>,
    dt: f64,
    nsteps: usize,
    phase: SlipPhase,
}

impl<'a, M: SlipMaterial> SlipIntegrator<'a, M> {
    /// Starts an integration at the crystal-frame stress `stress_0`.
    pub fn new(
        material: &'a M,
        initial_state: Vec<f64>,
        stress_0: Matrix3<f64>,
        stress_t: Matrix3<f64>,
        dt: f64,
        nsteps: usize,
    ) -> Result<Self> {
        let num_state_variables = material.num_state_variables();
        if initial_state.len() != num_state_variables {
            return Err(Error::InvalidInput(format!(
                "slip material has {num_state_variables} state variables, got an initial state of length {}",
                initial_state.len()
            )));
        }
        if nsteps == 0 {
            return Err(Error::InvalidInput("nsteps must be positive".to_string()));
        }
        Ok(Self {
            material,
            state: initial_state,
            derivative: vec![0.0; num_state_variables],
            stress: stress_0,
            increment: (stress_t - stress_0) / nsteps as f64,
            dt,
            nsteps,
            phase: SlipPhase::Initialized,
        })
    }

    pub fn phase(&self) -> SlipPhase {
        self.phase
    }

    pub fn state(&self) -> &[f64] {
        &self.state
    }

    /// The current crystal-frame stress.
    pub fn stress(&self) -> &Matrix3<f64> {
        &self.stress
    }

    /// Advances one step. Returns `false` without changes once finalized.
    pub fn step(&mut self) -> bool {
        let completed = match self.phase {
            SlipPhase::Initialized => 0,
            SlipPhase::Stepping(k) => k,
            SlipPhase::Finalized => return false,
        };
        self.material
            .state_derivative(&self.stress, &self.state, &mut self.derivative);
        for (s, ds) in self.state.iter_mut().zip(&self.derivative) {
            *s += self.dt * ds;
        }
        self.stress += self.increment;

        let completed = completed + 1;
        self.phase = if completed == self.nsteps {
            SlipPhase::Finalized
        } else {
            SlipPhase::Stepping(completed)
        };
        true
    }

    /// Steps until finalized and returns the final state.
    pub fn run(mut self) -> Vec<f64> {
        while self.step() {}
        self.state
    }
}

/// Final state of every local cell.
///
/// `centroids` holds one point per local cell, in the order of the local cell indices.
pub fn integrate_cells<M: SlipMaterial>(
    microstructure: &dyn Microstructure,
    materials: &[M],
    grain_cells: &GrainCells,
    centroids: &[Point3<f64>],
    deformation: &SlipDeformationInput,
) -> Result<CellField<DVector<f64>>> {
    check_supported(microstructure)?;
    let grains = grain_cells.cell_tags();
    if centroids.len() != grains.len() {
        return Err(Error::InvalidInput(format!(
            "expected {} cell centroids, got {}",
            grains.len(),
            centroids.len()
        )));
    }
    let s0 = load_cells(deformation.s0(), centroids, deformation.s0().num_components().unwrap_or(1))?;
    let stress_0 = load_tensor_cells(deformation.stress_0(), centroids)?;
    let stress_t = load_tensor_cells(deformation.stress_t(), centroids)?;

    let states = grains
        .iter()
        .enumerate()
        .map(|(cell, &grain)| {
            let material = material_of(microstructure, materials, grain)?;
            let r = microstructure.orientation_of(grain).matrix();
            let integrator = SlipIntegrator::new(
                material,
                deformation.initial_state(s0[cell].as_slice(), material.num_state_variables())?,
                tocrystal(&stress_0[cell], r),
                tocrystal(&stress_t[cell], r),
                deformation.dt(),
                deformation.nsteps(),
            )?;
            Ok(DVector::from_vec(integrator.run()))
        })
        .collect::<Result<Vec<_>>>()?;
    debug!("Integrated slip on {} local cells", states.len());
    Ok(CellField::from_values(states))
}

pub fn run<C: MeshCell>(
    ctx: &ExecutionContext,
    job: &Job,
    material: &MaterialInput<SlipCrystal>,
    deformation: &SlipDeformationInput,
    directory: &Path,
) -> eyre::Result<JobReport> {
    let options = job.effective_options();
    let microstructure = job.polycrystal.microstructure();
    check_supported(microstructure)?;
    let discretization = Discretization::<C>::new(ctx, &job.mesh, &job.polycrystal)?;

    info!(
        "Slip: {} steps of size {} on {} grains",
        deformation.nsteps(),
        deformation.dt(),
        microstructure.num_grains()
    );
    let materials = material.materials();
    check_materials(microstructure, materials)?;
    let num_state_variables = materials.first().map_or(0, |m| m.num_state_variables());
    let centroids = discretization.owned_centroids();
    let local = integrate_cells(microstructure, materials, &discretization.grain_cells, &centroids, deformation);
    let cell_states = ctx.agree(local, || Error::PeerFailed("slip integration".to_string()))?;
    let integrand = CellComponents {
        num_components: num_state_variables,
        field: &cell_states,
    };

    let volumes = grain_volumes(ctx, &discretization.quadratures, &discretization.grain_cells)?;
    let integrals = grain_integrals_components(ctx, &discretization.quadratures, &discretization.grain_cells, &integrand)?;
    let state_averages = grain_averages_components(&integrals, &volumes);
    for (grain, state) in state_averages.iter().enumerate() {
        debug!("Grain {grain}: average slip state {:?}", state.as_slice());
    }
    let grain_averages = GrainAverages::new(volumes).with_quantity("state", &state_averages);

    let fields_file = if options.write_fields {
        let global_states = global_cell_averages(ctx, &discretization, &integrand);
        let grain_ids = global_grain_ids(ctx, &discretization);
        let mesh = &discretization.mesh;
        let path = output::write_fields(ctx, directory, |path| {
            FiniteElementMeshDataSetBuilder::from_mesh(mesh)
                .with_title(ProcessKind::Slip.name())
                .with_cell_index_attributes("grain-id", &grain_ids)?
                .with_cell_scalar_attributes("state", num_state_variables, global_states)?
                .try_export(path)
        })?;
        Some(path)
    } else {
        None
    };
    let archive_file = output::write_grain_archive(ctx, directory, &grain_averages)?;

    Ok(JobReport {
        process: ProcessKind::Slip,
        output_directory: directory.to_path_buf(),
        solver: None,
        grain_averages,
        fields_file,
        archive_file,
    })
}
