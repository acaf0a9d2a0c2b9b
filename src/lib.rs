//! Grain-aware finite element simulations of polycrystals.
//!
//! A polycrystal is a domain partitioned into grains, each grain carrying a crystallographic
//! orientation and a phase (material). The crate builds per-grain coefficient fields from
//! crystal-frame material tensors, assembles and solves the weak forms of linear elasticity
//! and heat transfer, integrates slip hardening state, and reduces fields over grains
//! to report homogenized per-grain averages.
//!
//! Execution is SPMD: every rank owns a contiguous block of cells and all cross-rank
//! communication goes through the [`comm::Communicator`] carried in an
//! [`comm::ExecutionContext`].
use nalgebra::RealField;

pub mod assembly;
pub mod boundary;
pub mod comm;
pub mod connectivity;
pub mod element;
pub mod error;
pub mod field;
pub mod function;
pub mod input;
pub mod io;
pub mod material;
pub mod mesh;
pub mod microstructure;
pub mod orientation;
pub mod output;
pub mod partition;
pub mod process;
pub mod quadrature;
pub mod reduction;
pub mod solver;
pub mod suite;
pub mod tensor;

#[cfg(feature = "proptest")]
pub mod proptest;

pub extern crate nalgebra;
pub extern crate nalgebra_sparse;
pub extern crate vtkio;

pub use error::{Error, Result};

/// Real scalar types usable with the generic tensor routines.
pub trait Real: RealField + Copy {}

impl<T> Real for T where T: RealField + Copy {}

/// Axis-aligned box extents, one `[min, max]` pair per coordinate axis.
pub type Extents = [[f64; 2]; 3];
