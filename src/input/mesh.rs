use crate::boundary::BoundarySection;
use crate::error::{Error, Result};
use crate::Extents;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeshSource {
    Box,
    Xdmf,
    Gmsh,
}

impl FromStr for MeshSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "box" => Ok(Self::Box),
            "xdmf" => Ok(Self::Xdmf),
            "gmsh" => Ok(Self::Gmsh),
            other => Err(Error::InvalidInput(format!("unknown mesh source \"{other}\""))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellType {
    /// Linear tetrahedra. Box meshes split every grid cell into six tetrahedra.
    Tetrahedron,
    /// Trilinear hexahedra.
    Hexahedron,
}

impl FromStr for CellType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "tetrahedron" => Ok(Self::Tetrahedron),
            "hexahedron" => Ok(Self::Hexahedron),
            other => Err(Error::InvalidInput(format!("unknown cell type \"{other}\""))),
        }
    }
}

impl fmt::Display for CellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tetrahedron => write!(f, "tetrahedron"),
            Self::Hexahedron => write!(f, "hexahedron"),
        }
    }
}

/// Number of grid cells of a box mesh, either along all axes or per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Divisions {
    Uniform(usize),
    PerAxis([usize; 3]),
}

impl Divisions {
    pub fn per_axis(&self) -> [usize; 3] {
        match *self {
            Self::Uniform(n) => [n; 3],
            Self::PerAxis(n) => n,
        }
    }
}

impl From<usize> for Divisions {
    fn from(n: usize) -> Self {
        Self::Uniform(n)
    }
}

impl From<[usize; 3]> for Divisions {
    fn from(n: [usize; 3]) -> Self {
        Self::PerAxis(n)
    }
}

/// Validated mesh source description.
#[derive(Debug, Clone, PartialEq)]
pub enum MeshSpec {
    Box {
        extents: Extents,
        divisions: [usize; 3],
        cell_type: CellType,
    },
    Xdmf {
        file: PathBuf,
    },
    Gmsh {
        file: PathBuf,
        cell_type: CellType,
    },
}

#[derive(Debug, Clone)]
pub struct MeshInput {
    name: String,
    spec: MeshSpec,
    boundary_sections: Vec<BoundarySection>,
}

impl MeshInput {
    pub fn builder(name: impl Into<String>, source: MeshSource) -> MeshInputBuilder {
        MeshInputBuilder::new(name, source)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn spec(&self) -> &MeshSpec {
        &self.spec
    }

    pub fn cell_type(&self) -> CellType {
        match self.spec {
            MeshSpec::Box { cell_type, .. } | MeshSpec::Gmsh { cell_type, .. } => cell_type,
            MeshSpec::Xdmf { .. } => CellType::Tetrahedron,
        }
    }

    /// Extents of box meshes, which define the flat boundary sections.
    pub fn extents(&self) -> Option<&Extents> {
        match &self.spec {
            MeshSpec::Box { extents, .. } => Some(extents),
            _ => None,
        }
    }

    /// User defined boundary sections, in addition to the predefined ones.
    pub fn boundary_sections(&self) -> &[BoundarySection] {
        &self.boundary_sections
    }
}

/// Builder for [`MeshInput`].
///
/// `box` meshes require extents, divisions and a cell type; `xdmf` and `gmsh` meshes require a
/// file. Gmsh files are read as tetrahedral meshes unless a cell type is given.
#[derive(Debug, Clone)]
pub struct MeshInputBuilder {
    name: String,
    source: MeshSource,
    extents: Option<Extents>,
    divisions: Option<Divisions>,
    cell_type: Option<CellType>,
    file: Option<PathBuf>,
    boundary_sections: Vec<BoundarySection>,
}

impl MeshInputBuilder {
    pub fn new(name: impl Into<String>, source: MeshSource) -> Self {
        Self {
            name: name.into(),
            source,
            extents: None,
            divisions: None,
            cell_type: None,
            file: None,
            boundary_sections: Vec::new(),
        }
    }

    pub fn with_extents(self, extents: Extents) -> Self {
        Self {
            extents: Some(extents),
            ..self
        }
    }

    pub fn with_divisions(self, divisions: impl Into<Divisions>) -> Self {
        Self {
            divisions: Some(divisions.into()),
            ..self
        }
    }

    pub fn with_cell_type(self, cell_type: CellType) -> Self {
        Self {
            cell_type: Some(cell_type),
            ..self
        }
    }

    pub fn with_file(self, file: impl Into<PathBuf>) -> Self {
        Self {
            file: Some(file.into()),
            ..self
        }
    }

    pub fn with_boundary_section(mut self, section: BoundarySection) -> Self {
        self.boundary_sections.push(section);
        self
    }

    pub fn build(self) -> Result<MeshInput> {
        const RECORD: &str = "mesh";
        let missing = |field| Error::MissingField { record: RECORD, field };
        let spec = match self.source {
            MeshSource::Box => {
                let extents = self.extents.ok_or_else(|| missing("extents"))?;
                let divisions = self.divisions.ok_or_else(|| missing("divisions"))?;
                let cell_type = self.cell_type.ok_or_else(|| missing("celltype"))?;
                let divisions = divisions.per_axis();
                if divisions.contains(&0) {
                    return Err(Error::InvalidInput(format!(
                        "mesh \"{}\": divisions must be positive, got {divisions:?}",
                        self.name
                    )));
                }
                if extents.iter().any(|&[min, max]| !(min < max)) {
                    return Err(Error::InvalidInput(format!(
                        "mesh \"{}\": extents must satisfy min < max, got {extents:?}",
                        self.name
                    )));
                }
                MeshSpec::Box {
                    extents,
                    divisions,
                    cell_type,
                }
            }
            MeshSource::Xdmf => MeshSpec::Xdmf {
                file: self.file.ok_or_else(|| missing("file"))?,
            },
            MeshSource::Gmsh => MeshSpec::Gmsh {
                file: self.file.ok_or_else(|| missing("file"))?,
                cell_type: self.cell_type.unwrap_or(CellType::Tetrahedron),
            },
        };
        Ok(MeshInput {
            name: self.name,
            spec,
            boundary_sections: self.boundary_sections,
        })
    }
}
