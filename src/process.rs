//! Job orchestration.
//!
//! [`run_job`] prepares the output directory, loads the mesh, assigns and partitions grains
//! and dispatches to the process selected by the job's [`ProcessInput`].
use crate::boundary::BoundaryMap;
use crate::comm::ExecutionContext;
use crate::connectivity::{Hex8Connectivity, Tet4Connectivity};
use crate::element::{CellConnectivity, CellQuadratures};
use crate::error::{Error, Result};
use crate::input::{CellType, Job, MeshInput, MeshSpec, PolycrystalInput, ProcessInput};
use crate::io::msh::{load_msh_from_file, MshConnectivity};
use crate::io::vtk::VtkCellConnectivity;
use crate::mesh::procedural::{create_box_hex_mesh, create_box_tet_mesh};
use crate::mesh::Mesh;
use crate::output::prepare_output_directory;
use crate::partition::{assign_grains, partition, CellDistribution, GrainCells};
use crate::solver::SolverReport;
use crate::Extents;
use eyre::Context;
use log::{info, warn};
use nalgebra::{DVector, Point3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub mod heat_transfer;
pub mod linear_elasticity;
mod postprocess;
pub mod slip;

/// The registered processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProcessKind {
    LinearElasticity,
    HeatTransfer,
    Slip,
}

impl ProcessKind {
    pub const ALL: [ProcessKind; 3] = [Self::LinearElasticity, Self::HeatTransfer, Self::Slip];

    pub fn name(&self) -> &'static str {
        match self {
            Self::LinearElasticity => "linear-elasticity",
            Self::HeatTransfer => "heat-transfer",
            Self::Slip => "slip",
        }
    }
}

impl FromStr for ProcessKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| Error::ProcessNotRegistered(s.to_string()))
    }
}

impl fmt::Display for ProcessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Per-grain results, as written to the grain archive.
///
/// Every quantity holds one vector of components per grain. Tensors are stored row-major.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrainAverages {
    pub volume: Vec<f64>,
    #[serde(flatten)]
    pub quantities: BTreeMap<String, Vec<Vec<f64>>>,
}

impl GrainAverages {
    pub fn new(volume: Vec<f64>) -> Self {
        Self {
            volume,
            quantities: BTreeMap::new(),
        }
    }

    pub fn with_quantity(mut self, name: impl Into<String>, averages: &[DVector<f64>]) -> Self {
        let values = averages
            .iter()
            .map(|average| average.iter().copied().collect())
            .collect();
        self.quantities.insert(name.into(), values);
        self
    }

    pub fn quantity(&self, name: &str) -> Option<&[Vec<f64>]> {
        self.quantities.get(name).map(Vec::as_slice)
    }
}

/// Outcome of a job.
#[derive(Debug, Clone)]
pub struct JobReport {
    pub process: ProcessKind,
    pub output_directory: PathBuf,
    /// `None` for processes without a linear solve.
    pub solver: Option<SolverReport>,
    pub grain_averages: GrainAverages,
    pub fields_file: Option<PathBuf>,
    pub archive_file: PathBuf,
}

/// Cell types that can be generated, read from Gmsh files and written to VTK files.
pub trait MeshCell: CellConnectivity + MshConnectivity + VtkCellConnectivity {
    fn create_box_mesh(extents: &Extents, divisions: [usize; 3]) -> Result<Mesh<Self>>;
}

impl MeshCell for Tet4Connectivity {
    fn create_box_mesh(extents: &Extents, divisions: [usize; 3]) -> Result<Mesh<Self>> {
        create_box_tet_mesh(extents, divisions)
    }
}

impl MeshCell for Hex8Connectivity {
    fn create_box_mesh(extents: &Extents, divisions: [usize; 3]) -> Result<Mesh<Self>> {
        create_box_hex_mesh(extents, divisions)
    }
}

/// A mesh together with the grain tags it carries, if any.
#[derive(Debug, Clone)]
pub struct LoadedMesh<C> {
    pub mesh: Mesh<C>,
    pub cell_tags: Option<Vec<usize>>,
}

pub fn load_mesh<C: MeshCell>(input: &MeshInput) -> eyre::Result<LoadedMesh<C>> {
    match input.spec() {
        MeshSpec::Box {
            extents, divisions, ..
        } => Ok(LoadedMesh {
            mesh: C::create_box_mesh(extents, *divisions)?,
            cell_tags: None,
        }),
        MeshSpec::Gmsh { file, .. } => {
            let msh = load_msh_from_file::<C, _>(file)
                .wrap_err_with(|| format!("failed to load mesh \"{}\"", input.name()))?;
            Ok(LoadedMesh {
                mesh: msh.mesh,
                cell_tags: msh.cell_tags,
            })
        }
        MeshSpec::Xdmf { file } => {
            Err(Error::NotImplemented(format!("reading XDMF mesh {}", file.display())).into())
        }
    }
}

/// The mesh, the cells owned by this rank with their quadratures and grains, and the
/// resolved boundary sections.
#[derive(Debug, Clone)]
pub struct Discretization<C: CellConnectivity> {
    pub mesh: Mesh<C>,
    pub distribution: CellDistribution,
    pub quadratures: CellQuadratures,
    pub grain_cells: GrainCells,
    pub boundary: BoundaryMap<C::Face>,
}

impl<C: MeshCell> Discretization<C> {
    pub fn new(ctx: &ExecutionContext, mesh_input: &MeshInput, polycrystal: &PolycrystalInput) -> eyre::Result<Self> {
        let LoadedMesh { mesh, cell_tags } = load_mesh::<C>(mesh_input)?;
        let distribution = CellDistribution::from_context(ctx, mesh.num_cells());
        info!(
            "Mesh \"{}\": {} vertices, {} cells ({} owned by rank {})",
            mesh_input.name(),
            mesh.num_vertices(),
            mesh.num_cells(),
            distribution.num_owned_cells(),
            ctx.rank()
        );

        let microstructure = polycrystal.microstructure();
        // Grain tags and element geometry are only checked for owned cells
        let local = assign_grains(
            &mesh,
            &distribution,
            microstructure,
            polycrystal.use_mesh_tags(),
            cell_tags.as_deref(),
        )
        .and_then(|tags| partition(&tags, microstructure.num_grains()))
        .and_then(|grain_cells| {
            let quadratures = CellQuadratures::new(mesh.vertices(), mesh.connectivity(), distribution.owned_cells())?;
            Ok((grain_cells, quadratures))
        });
        let (grain_cells, quadratures) =
            ctx.agree(local, || Error::PeerFailed("grain assignment".to_string()))?;
        let boundary = BoundaryMap::resolve(&mesh, mesh_input.extents(), mesh_input.boundary_sections())?;

        Ok(Self {
            mesh,
            distribution,
            quadratures,
            grain_cells,
            boundary,
        })
    }
}

impl<C: CellConnectivity> Discretization<C> {
    /// Centroids of the owned cells, indexed by local cell.
    pub fn owned_centroids(&self) -> Vec<Point3<f64>> {
        self.mesh.cell_centroids(self.distribution.owned_cells())
    }
}

pub(crate) fn log_solver_report(report: &SolverReport) {
    if report.converged {
        info!(
            "Linear solver converged after {} iterations (relative residual {:e})",
            report.iterations, report.relative_residual
        );
    } else {
        warn!(
            "Linear solver did not converge after {} iterations (relative residual {:e})",
            report.iterations, report.relative_residual
        );
    }
}

/// Runs a job with outputs below `output_root`.
///
/// Collective: every rank of `ctx` must call this with the same job.
pub fn run_job(ctx: &ExecutionContext, job: &Job, output_root: impl AsRef<Path>) -> eyre::Result<JobReport> {
    if let ProcessInput::Slip { .. } = &job.process {
        slip::check_supported(job.polycrystal.microstructure())?;
    }

    let directory = job.output_directory(output_root);
    info!(
        "Running {} job \"{}\" of suite \"{}\"",
        job.process.kind(),
        directory
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default(),
        job.suite
    );
    prepare_output_directory(ctx, &directory)?;

    match job.mesh.cell_type() {
        CellType::Tetrahedron => run_process::<Tet4Connectivity>(ctx, job, &directory),
        CellType::Hexahedron => run_process::<Hex8Connectivity>(ctx, job, &directory),
    }
}

fn run_process<C: MeshCell>(ctx: &ExecutionContext, job: &Job, directory: &Path) -> eyre::Result<JobReport> {
    match &job.process {
        ProcessInput::LinearElasticity { material, deformation } => {
            linear_elasticity::run::<C>(ctx, job, material, deformation, directory)
        }
        ProcessInput::HeatTransfer { material, deformation } => {
            heat_transfer::run::<C>(ctx, job, material, deformation, directory)
        }
        ProcessInput::Slip { material, deformation } => slip::run::<C>(ctx, job, material, deformation, directory),
    }
}
