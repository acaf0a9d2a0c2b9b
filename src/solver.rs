//! Iterative solution of the assembled linear systems.
//!
//! Non-convergence is not an error: solvers return a [`SolverReport`] and the caller decides
//! how to proceed.
use crate::error::{Error, Result};
use nalgebra::DVector;
use nalgebra_sparse::ops::serial::spmm_csr_dense;
use nalgebra_sparse::ops::Op;
use nalgebra_sparse::CsrMatrix;
use serde::Serialize;

/// Outcome of a linear solve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SolverReport {
    pub iterations: usize,
    pub converged: bool,
    /// `‖b − A x‖ / ‖b‖` as tracked by the solver.
    pub relative_residual: f64,
}

pub trait LinearSolver {
    /// Solves `A x = b`, using the contents of `x` as initial guess.
    fn solve(&mut self, matrix: &CsrMatrix<f64>, b: &DVector<f64>, x: &mut DVector<f64>) -> Result<SolverReport>;
}

/// Jacobi-preconditioned conjugate gradient for symmetric positive definite systems.
///
/// Converges when `‖r‖ ≤ max(rtol ‖b‖, atol)`.
#[derive(Debug, Clone)]
pub struct ConjugateGradient {
    rtol: f64,
    atol: f64,
    max_iter: usize,
}

impl Default for ConjugateGradient {
    fn default() -> Self {
        Self {
            rtol: 1e-6,
            atol: 1e-10,
            max_iter: 5000,
        }
    }
}

impl ConjugateGradient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rtol(self, rtol: f64) -> Self {
        Self { rtol, ..self }
    }

    pub fn with_atol(self, atol: f64) -> Self {
        Self { atol, ..self }
    }

    pub fn with_max_iter(self, max_iter: usize) -> Self {
        Self { max_iter, ..self }
    }
}

/// y = Ax
fn apply_operator(y: &mut DVector<f64>, a: &CsrMatrix<f64>, x: &DVector<f64>) {
    spmm_csr_dense(0.0, &mut *y, 1.0, Op::NoOp(a), Op::NoOp(x));
}

fn jacobi_preconditioner(matrix: &CsrMatrix<f64>) -> Result<DVector<f64>> {
    let mut inverse_diagonal = DVector::zeros(matrix.nrows());
    for (i, row) in matrix.row_iter().enumerate() {
        let diagonal = row
            .col_indices()
            .iter()
            .zip(row.values())
            .find(|&(&j, _)| j == i)
            .map(|(_, &v)| v)
            .unwrap_or(0.0);
        if !(diagonal > 0.0) {
            return Err(Error::Assembly(format!(
                "matrix has non-positive diagonal entry {diagonal} in row {i}"
            )));
        }
        inverse_diagonal[i] = 1.0 / diagonal;
    }
    Ok(inverse_diagonal)
}

impl LinearSolver for ConjugateGradient {
    #[allow(non_snake_case)]
    fn solve(&mut self, matrix: &CsrMatrix<f64>, b: &DVector<f64>, x: &mut DVector<f64>) -> Result<SolverReport> {
        if matrix.nrows() != matrix.ncols() || matrix.nrows() != b.len() || b.len() != x.len() {
            return Err(Error::Assembly(format!(
                "incompatible dimensions: matrix {}x{}, rhs {}, solution {}",
                matrix.nrows(),
                matrix.ncols(),
                b.len(),
                x.len()
            )));
        }

        let inverse_diagonal = jacobi_preconditioner(matrix)?;
        let b_norm = b.norm();
        let tolerance = (self.rtol * b_norm).max(self.atol);
        let relative = |r_norm: f64| if b_norm > 0.0 { r_norm / b_norm } else { r_norm };

        // r = b - Ax
        let mut r = DVector::zeros(b.len());
        apply_operator(&mut r, matrix, x);
        r.axpy(1.0, b, -1.0);

        let mut r_norm = r.norm();
        if r_norm <= tolerance {
            return Ok(SolverReport {
                iterations: 0,
                converged: true,
                relative_residual: relative(r_norm),
            });
        }

        // z = Pr
        let mut z = r.component_mul(&inverse_diagonal);
        let mut p = z.clone();
        let mut Ap = DVector::zeros(b.len());
        let mut zTr = z.dot(&r);

        for iteration in 1..=self.max_iter {
            apply_operator(&mut Ap, matrix, &p);
            let pAp = p.dot(&Ap);
            if !(pAp > 0.0) {
                // Operator is indefinite or singular on the search direction
                return Ok(SolverReport {
                    iterations: iteration - 1,
                    converged: false,
                    relative_residual: relative(r_norm),
                });
            }

            let alpha = zTr / pAp;
            x.axpy(alpha, &p, 1.0);
            r.axpy(-alpha, &Ap, 1.0);

            r_norm = r.norm();
            if r_norm <= tolerance {
                return Ok(SolverReport {
                    iterations: iteration,
                    converged: true,
                    relative_residual: relative(r_norm),
                });
            }

            z.copy_from(&r);
            z.component_mul_assign(&inverse_diagonal);
            let zTr_next = z.dot(&r);
            let beta = zTr_next / zTr;
            zTr = zTr_next;

            // p = z + beta * p
            p.axpy(1.0, &z, beta);
        }

        Ok(SolverReport {
            iterations: self.max_iter,
            converged: false,
            relative_residual: relative(r_norm),
        })
    }
}
