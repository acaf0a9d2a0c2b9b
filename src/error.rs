//! Error types for configuration, lookup and unsupported-feature failures.
//!
//! Solver non-convergence is deliberately not an error: it is reported through
//! [`SolverReport`](crate::solver::SolverReport) and the caller decides what to do.
use thiserror::Error;

/// Errors raised by the core.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A required field for the chosen variant of an input record is missing.
    #[error("{record} input is missing required field `{field}`")]
    MissingField { record: &'static str, field: &'static str },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("expected one orientation per grain ({expected}), got {actual}")]
    OrientationCount { expected: usize, actual: usize },
    #[error("matrix is not a proper rotation")]
    InvalidOrientation,
    #[error("grain id {grain} is out of range for {num_grains} grains")]
    GrainIdOutOfRange { grain: usize, num_grains: usize },
    #[error("process \"{0}\" is not registered")]
    ProcessNotRegistered(String),
    #[error("unknown boundary section \"{0}\"")]
    UnknownBoundarySection(String),
    #[error("no material for phase {phase}")]
    UnknownMaterial { phase: usize },
    #[error("not implemented: {0}")]
    NotImplemented(String),
    #[error("degenerate element geometry in cell {cell}")]
    SingularElement { cell: usize },
    #[error("assembly failed: {0}")]
    Assembly(String),
    #[error("invalid mesh: {0}")]
    Mesh(String),
    /// Another rank of the group failed during the named step.
    #[error("{0} failed on another rank")]
    PeerFailed(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
