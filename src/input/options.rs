use crate::solver::ConjugateGradient;
use serde::{Deserialize, Serialize};

/// Named solver and output options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    pub name: String,
    /// Relative residual tolerance of the linear solver.
    pub tolerance: f64,
    pub max_iterations: usize,
    /// Whether to write the VTK field file.
    pub write_fields: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            tolerance: 1e-10,
            max_iterations: 5000,
            write_fields: true,
        }
    }
}

impl Options {
    pub fn solver(&self) -> ConjugateGradient {
        ConjugateGradient::new()
            .with_rtol(self.tolerance)
            .with_max_iter(self.max_iterations)
    }
}
