//! Assembly of the weak forms of anisotropic linear elasticity and heat transfer.
//!
//! The sparsity pattern is always built from the whole mesh, so that it is identical on every
//! rank. Each rank adds the contributions of its owned cells and owned boundary facets, after
//! which the matrix values and the right-hand side are summed over all ranks.
use crate::boundary::{BoundaryMap, EssentialBcs, NaturalBc};
use crate::comm::ExecutionContext;
use crate::connectivity::Connectivity;
use crate::element::{CellConnectivity, CellQuadratures, ElementQuadrature, FaceConnectivity};
use crate::error::{Error, Result};
use crate::field::CellField;
use crate::function::FunctionInput;
use crate::mesh::Mesh;
use crate::partition::CellDistribution;
use crate::tensor::{apply_crystal_stiffness, sample_conductivity, sample_stiffness, sample_stress, sym, to6vector, tosample};
use log::debug;
use nalgebra::{DMatrix, DVector, Matrix3, Matrix6, Vector3, Vector6};
use nalgebra_sparse::pattern::SparsityPattern;
use nalgebra_sparse::CsrMatrix;
use std::collections::BTreeSet;

/// The linear system `A u = b`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearSystem {
    pub matrix: CsrMatrix<f64>,
    pub rhs: DVector<f64>,
}

/// Computes the sparsity pattern of a matrix with `solution_dim` unknowns per vertex.
pub fn sparsity_pattern<C: Connectivity>(mesh: &Mesh<C>, solution_dim: usize) -> Result<SparsityPattern> {
    // Collecting into a BTreeSet stores each matrix entry exactly once, already sorted
    let mut matrix_entries = BTreeSet::new();
    for cell in mesh.connectivity() {
        let nodes = cell.vertex_indices();
        for node_i in nodes {
            for node_j in nodes {
                for s_i in 0..solution_dim {
                    for s_j in 0..solution_dim {
                        matrix_entries.insert((solution_dim * node_i + s_i, solution_dim * node_j + s_j));
                    }
                }
            }
        }
    }

    let num_rows = solution_dim * mesh.num_vertices();
    let mut offsets = Vec::with_capacity(num_rows + 1);
    let mut column_indices = Vec::with_capacity(matrix_entries.len());

    offsets.push(0);
    let mut current_row = 0;
    for (i, j) in matrix_entries {
        while current_row < i {
            offsets.push(column_indices.len());
            current_row += 1;
        }
        column_indices.push(j);
    }
    while offsets.len() < num_rows + 1 {
        offsets.push(column_indices.len());
    }

    SparsityPattern::try_from_offsets_and_indices(num_rows, num_rows, offsets, column_indices)
        .map_err(|e| Error::Assembly(format!("invalid sparsity pattern: {e}")))
}

fn zero_system<C: Connectivity>(mesh: &Mesh<C>, solution_dim: usize) -> Result<LinearSystem> {
    let pattern = sparsity_pattern(mesh, solution_dim)?;
    let nnz = pattern.nnz();
    let matrix = CsrMatrix::try_from_pattern_and_values(pattern, vec![0.0; nnz])
        .map_err(|e| Error::Assembly(format!("failed to create CSR matrix: {e}")))?;
    let rhs = DVector::zeros(solution_dim * mesh.num_vertices());
    Ok(LinearSystem { matrix, rhs })
}

/// Adds a dense element matrix to the rows and columns of the given nodes.
fn add_element_matrix(
    matrix: &mut CsrMatrix<f64>,
    nodes: &[usize],
    solution_dim: usize,
    element_matrix: &DMatrix<f64>,
) -> Result<()> {
    for (local_node_i, &node_i) in nodes.iter().enumerate() {
        for s_i in 0..solution_dim {
            let local_row = solution_dim * local_node_i + s_i;
            let mut row = matrix.row_mut(solution_dim * node_i + s_i);
            let (cols, values) = row.cols_and_values_mut();
            for (local_node_j, &node_j) in nodes.iter().enumerate() {
                for s_j in 0..solution_dim {
                    let global_col = solution_dim * node_j + s_j;
                    let idx = cols.binary_search(&global_col).map_err(|_| {
                        Error::Assembly(format!("entry ({}, {global_col}) not in sparsity pattern", solution_dim * node_i + s_i))
                    })?;
                    values[idx] += element_matrix[(local_row, solution_dim * local_node_j + s_j)];
                }
            }
        }
    }
    Ok(())
}

fn sum_over_ranks(ctx: &ExecutionContext, system: &mut LinearSystem) {
    ctx.all_reduce_sum(system.matrix.values_mut());
    ctx.all_reduce_sum(system.rhs.as_mut_slice());
}

/// Mandel strain of the displacement `φ e_k` for a basis function with gradient `gradient`.
pub fn mandel_strain_basis(gradient: &Vector3<f64>, k: usize) -> Vector6<f64> {
    let mut m = Matrix3::zeros();
    m.set_row(k, &gradient.transpose());
    to6vector(&sym(&m))
}

/// Displacement gradient at quadrature point `q` from nodal displacements.
pub fn displacement_gradient(quadrature: &ElementQuadrature, q: usize, u: &DVector<f64>) -> Matrix3<f64> {
    let mut grad_u = Matrix3::zeros();
    for (&node, gradient) in quadrature.nodes().iter().zip(quadrature.gradients(q)) {
        let u_node = Vector3::new(u[3 * node], u[3 * node + 1], u[3 * node + 2]);
        grad_u += u_node * gradient.transpose();
    }
    grad_u
}

/// Gradient of a scalar nodal field at quadrature point `q`.
pub fn scalar_gradient(quadrature: &ElementQuadrature, q: usize, u: &DVector<f64>) -> Vector3<f64> {
    quadrature
        .nodes()
        .iter()
        .zip(quadrature.gradients(q))
        .fold(Vector3::zeros(), |acc, (&node, gradient)| acc + gradient * u[node])
}

/// Cell coefficients of the elasticity problem.
///
/// Stiffness and thermal expansion are crystal-frame values, the plastic distortion is given
/// in the sample frame.
#[derive(Debug, Clone, Copy)]
pub struct ElasticityCoefficients<'a> {
    pub stiffness: &'a CellField<Matrix6<f64>>,
    pub orientation: &'a CellField<Matrix3<f64>>,
    pub force_density: Option<&'a FunctionInput>,
    pub plastic_distortion: Option<&'a CellField<Matrix3<f64>>>,
    pub thermal_expansion: Option<&'a CellField<Matrix3<f64>>>,
}

impl<'a> ElasticityCoefficients<'a> {
    /// Sample-frame Mandel eigenstress `C β + C α` of the given local cell.
    pub fn eigenstress(&self, local_cell: usize) -> Vector6<f64> {
        let stiffness = &self.stiffness[local_cell];
        let r = &self.orientation[local_cell];
        let mut sigma = Matrix3::zeros();
        if let Some(beta) = self.plastic_distortion {
            sigma += sample_stress(&beta[local_cell], stiffness, r);
        }
        if let Some(alpha) = self.thermal_expansion {
            sigma += tosample(&apply_crystal_stiffness(&alpha[local_cell], stiffness), r);
        }
        to6vector(&sigma)
    }
}

/// Unknowns per vertex of the elasticity problem.
const SDIM: usize = 3;

/// Assembles the elasticity system
///
/// ```text
/// a(u, v) = ∫ ε(v) : C ε(u) dx
/// L(v)    = ∫ f·v dx + ∫ (C β + C α) : ε(v) dx + Σ ∫ t·v ds
/// ```
///
/// over the owned cells and sums the result over all ranks.
pub fn assemble_elasticity<C: CellConnectivity>(
    ctx: &ExecutionContext,
    mesh: &Mesh<C>,
    distribution: &CellDistribution,
    quadratures: &CellQuadratures,
    coefficients: &ElasticityCoefficients,
    boundary: &BoundaryMap<C::Face>,
    tractions: &[NaturalBc],
) -> Result<LinearSystem> {
    let mut system = zero_system(mesh, SDIM)?;
    let local = add_elasticity_cells(quadratures, coefficients, &mut system)
        .and_then(|_| add_natural_contributions(mesh, distribution, boundary, tractions, SDIM, &mut system.rhs));
    ctx.agree(local, || Error::PeerFailed("elasticity assembly".to_string()))?;
    sum_over_ranks(ctx, &mut system);
    debug!(
        "Assembled elasticity system with {} unknowns and {} non-zeros",
        system.rhs.len(),
        system.matrix.nnz()
    );
    Ok(system)
}

fn add_elasticity_cells(
    quadratures: &CellQuadratures,
    coefficients: &ElasticityCoefficients,
    system: &mut LinearSystem,
) -> Result<()> {
    let mut element_matrix = DMatrix::zeros(0, 0);
    let mut strain_basis: Vec<Vector6<f64>> = Vec::new();
    for (local_cell, quadrature) in quadratures.iter().enumerate() {
        let n = quadrature.num_nodes();
        let r = &coefficients.orientation[local_cell];
        let d_s = sample_stiffness(&coefficients.stiffness[local_cell], r);
        let eigenstress = coefficients.eigenstress(local_cell);

        element_matrix.resize_mut(SDIM * n, SDIM * n, 0.0);
        element_matrix.fill(0.0);

        for q in 0..quadrature.num_points() {
            let w = quadrature.weights()[q];
            strain_basis.clear();
            for gradient in quadrature.gradients(q) {
                for k in 0..SDIM {
                    strain_basis.push(mandel_strain_basis(gradient, k));
                }
            }

            for (i, b_i) in strain_basis.iter().enumerate() {
                let d_b_i = d_s.transpose() * b_i;
                for (j, b_j) in strain_basis.iter().enumerate() {
                    element_matrix[(i, j)] += w * d_b_i.dot(b_j);
                }
            }

            let force = match coefficients.force_density {
                Some(f) => Some(f.evaluate(&quadrature.points()[q])?),
                None => None,
            };
            for (a, (&node, &phi)) in quadrature.nodes().iter().zip(quadrature.basis(q)).enumerate() {
                for k in 0..SDIM {
                    let mut contribution = w * eigenstress.dot(&strain_basis[SDIM * a + k]);
                    if let Some(force) = &force {
                        contribution += w * phi * force[k];
                    }
                    system.rhs[SDIM * node + k] += contribution;
                }
            }
        }

        add_element_matrix(&mut system.matrix, quadrature.nodes(), SDIM, &element_matrix)?;
    }
    Ok(())
}

/// Cell coefficients of the heat transfer problem.
#[derive(Debug, Clone, Copy)]
pub struct HeatCoefficients<'a> {
    /// Crystal-frame conductivity.
    pub conductivity: &'a CellField<Matrix3<f64>>,
    pub orientation: &'a CellField<Matrix3<f64>>,
    pub body_heat: Option<&'a FunctionInput>,
}

/// Assembles the heat transfer system
///
/// ```text
/// a(u, v) = ∫ ∇v · (R K Rᵀ ∇u) dx
/// L(v)    = ∫ q v dx + Σ ∫ g v ds
/// ```
///
/// over the owned cells and sums the result over all ranks.
pub fn assemble_heat<C: CellConnectivity>(
    ctx: &ExecutionContext,
    mesh: &Mesh<C>,
    distribution: &CellDistribution,
    quadratures: &CellQuadratures,
    coefficients: &HeatCoefficients,
    boundary: &BoundaryMap<C::Face>,
    fluxes: &[NaturalBc],
) -> Result<LinearSystem> {
    let mut system = zero_system(mesh, 1)?;
    let local = add_heat_cells(quadratures, coefficients, &mut system)
        .and_then(|_| add_natural_contributions(mesh, distribution, boundary, fluxes, 1, &mut system.rhs));
    ctx.agree(local, || Error::PeerFailed("heat assembly".to_string()))?;
    sum_over_ranks(ctx, &mut system);
    debug!(
        "Assembled heat system with {} unknowns and {} non-zeros",
        system.rhs.len(),
        system.matrix.nnz()
    );
    Ok(system)
}

fn add_heat_cells(quadratures: &CellQuadratures, coefficients: &HeatCoefficients, system: &mut LinearSystem) -> Result<()> {
    let mut element_matrix = DMatrix::zeros(0, 0);
    for (local_cell, quadrature) in quadratures.iter().enumerate() {
        let n = quadrature.num_nodes();
        let k_s = sample_conductivity(
            &coefficients.conductivity[local_cell],
            &coefficients.orientation[local_cell],
        );

        element_matrix.resize_mut(n, n, 0.0);
        element_matrix.fill(0.0);
        for q in 0..quadrature.num_points() {
            let w = quadrature.weights()[q];
            let gradients = quadrature.gradients(q);
            for (i, g_i) in gradients.iter().enumerate() {
                let k_g_i = k_s.transpose() * g_i;
                for (j, g_j) in gradients.iter().enumerate() {
                    element_matrix[(i, j)] += w * k_g_i.dot(g_j);
                }
            }

            if let Some(body_heat) = coefficients.body_heat {
                let source = body_heat.evaluate(&quadrature.points()[q])?;
                for (&node, &phi) in quadrature.nodes().iter().zip(quadrature.basis(q)) {
                    system.rhs[node] += w * phi * source[0];
                }
            }
        }

        add_element_matrix(&mut system.matrix, quadrature.nodes(), 1, &element_matrix)?;
    }
    Ok(())
}

/// Accumulates `∫ g·v ds` of every natural condition over its owned facets.
fn add_natural_contributions<C: CellConnectivity>(
    mesh: &Mesh<C>,
    distribution: &CellDistribution,
    boundary: &BoundaryMap<C::Face>,
    conditions: &[NaturalBc],
    solution_dim: usize,
    rhs: &mut DVector<f64>,
) -> Result<()> {
    for condition in conditions {
        for &facet_index in &condition.facets {
            let facet = &boundary.facets()[facet_index];
            if !distribution.is_owned(facet.cell) {
                continue;
            }
            let quadrature = facet.connectivity.surface_quadrature(mesh.vertices())?;
            for q in 0..quadrature.num_points() {
                let w = quadrature.weights()[q];
                let value = condition.value.evaluate(&quadrature.points()[q])?;
                for (&node, &phi) in quadrature.nodes().iter().zip(quadrature.basis(q)) {
                    for k in 0..solution_dim {
                        rhs[solution_dim * node + k] += w * phi * value[k];
                    }
                }
            }
        }
        debug!(
            "Natural condition {} acts on {} facets",
            condition.tag,
            condition.facets.len()
        );
    }
    Ok(())
}

/// Applies essential boundary conditions by symmetric elimination.
///
/// Constrained rows and columns are zeroed, the diagonal entry `d` of a constrained row is kept
/// if positive (otherwise set to one) and the right-hand side becomes `d g`. The known values
/// are moved to the right-hand side of the unconstrained rows, so the matrix stays symmetric.
pub fn apply_dirichlet(system: &mut LinearSystem, bcs: &EssentialBcs) -> Result<()> {
    let n = system.rhs.len();
    let mut prescribed: Vec<Option<f64>> = vec![None; n];
    for (dof, value) in bcs.iter() {
        *prescribed
            .get_mut(dof)
            .ok_or_else(|| Error::Assembly(format!("constrained DOF {dof} out of range for {n} unknowns")))? =
            Some(value);
    }

    let (offsets, cols, values) = system.matrix.csr_data_mut();
    for row in 0..n {
        let range = offsets[row]..offsets[row + 1];
        match prescribed[row] {
            None => {
                for idx in range {
                    if let Some(g) = prescribed[cols[idx]] {
                        system.rhs[row] -= values[idx] * g;
                        values[idx] = 0.0;
                    }
                }
            }
            Some(g) => {
                let mut diagonal = 1.0;
                for idx in range {
                    if cols[idx] == row {
                        if values[idx] > 0.0 {
                            diagonal = values[idx];
                        }
                    } else {
                        values[idx] = 0.0;
                    }
                }
                for idx in offsets[row]..offsets[row + 1] {
                    if cols[idx] == row {
                        values[idx] = diagonal;
                    }
                }
                system.rhs[row] = diagonal * g;
            }
        }
    }
    Ok(())
}
