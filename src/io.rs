//! Mesh input and field output.
pub mod msh;
pub mod vtk;
