//! Input records describing a job.
//!
//! Records are validated when they are built: a missing field required by the chosen source or
//! variant is reported immediately as [`Error::MissingField`](crate::Error::MissingField),
//! never at solve time.
pub mod deformation;
pub mod function;
pub mod job;
pub mod material;
pub mod mesh;
pub mod options;
pub mod polycrystal;

pub use deformation::{ElasticDeformationInput, HeatDeformationInput, SlipDeformationInput};
pub use function::FunctionRecord;
pub use job::{Job, ProcessInput};
pub use material::MaterialInput;
pub use mesh::{CellType, Divisions, MeshInput, MeshInputBuilder, MeshSource, MeshSpec};
pub use options::Options;
pub use polycrystal::PolycrystalInput;
