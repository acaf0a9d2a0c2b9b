use crate::input::deformation::{ElasticDeformationInput, HeatDeformationInput, SlipDeformationInput};
use crate::input::material::MaterialInput;
use crate::input::mesh::MeshInput;
use crate::input::options::Options;
use crate::input::polycrystal::PolycrystalInput;
use crate::material::{ElasticCrystal, SlipCrystal, ThermalCrystal};
use crate::output;
use crate::process::ProcessKind;
use std::path::{Path, PathBuf};

/// Process-specific material and deformation inputs.
#[derive(Debug, Clone)]
pub enum ProcessInput {
    LinearElasticity {
        material: MaterialInput<ElasticCrystal>,
        deformation: ElasticDeformationInput,
    },
    HeatTransfer {
        material: MaterialInput<ThermalCrystal>,
        deformation: HeatDeformationInput,
    },
    Slip {
        material: MaterialInput<SlipCrystal>,
        deformation: SlipDeformationInput,
    },
}

impl ProcessInput {
    pub fn kind(&self) -> ProcessKind {
        match self {
            Self::LinearElasticity { .. } => ProcessKind::LinearElasticity,
            Self::HeatTransfer { .. } => ProcessKind::HeatTransfer,
            Self::Slip { .. } => ProcessKind::Slip,
        }
    }

    pub fn material_name(&self) -> &str {
        match self {
            Self::LinearElasticity { material, .. } => material.name(),
            Self::HeatTransfer { material, .. } => material.name(),
            Self::Slip { material, .. } => material.name(),
        }
    }

    pub fn deformation_name(&self) -> &str {
        match self {
            Self::LinearElasticity { deformation, .. } => &deformation.name,
            Self::HeatTransfer { deformation, .. } => &deformation.name,
            Self::Slip { deformation, .. } => deformation.name(),
        }
    }
}

/// A complete simulation job.
#[derive(Debug, Clone)]
pub struct Job {
    pub suite: String,
    pub mesh: MeshInput,
    pub polycrystal: PolycrystalInput,
    pub process: ProcessInput,
    pub options: Option<Options>,
}

impl Job {
    pub fn new(suite: impl Into<String>, mesh: MeshInput, polycrystal: PolycrystalInput, process: ProcessInput) -> Self {
        Self {
            suite: suite.into(),
            mesh,
            polycrystal,
            process,
            options: None,
        }
    }

    pub fn with_options(self, options: Options) -> Self {
        Self {
            options: Some(options),
            ..self
        }
    }

    /// The given options, or the defaults.
    pub fn effective_options(&self) -> Options {
        self.options.clone().unwrap_or_default()
    }

    /// Output directory of this job below `root`.
    pub fn output_directory(&self, root: impl AsRef<Path>) -> PathBuf {
        output::output_directory(
            root,
            &self.suite,
            self.process.kind(),
            &[
                self.process.material_name(),
                self.mesh.name(),
                self.polycrystal.name(),
                self.process.deformation_name(),
            ],
            self.options.as_ref().map(|options| options.name.as_str()),
        )
    }
}
