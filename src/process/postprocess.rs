//! Helpers shared by the processes for turning local results into global output fields.
use crate::comm::ExecutionContext;
use crate::element::CellConnectivity;
use crate::error::Result;
use crate::field::CellField;
use crate::function::{load_cells, tensor_from_components, FunctionInput};
use crate::process::Discretization;
use crate::reduction::CellIntegrand;
use nalgebra::{Matrix3, Point3, Vector3};

/// Cell averages of `integrand` for every global cell, with `num_components` values per cell.
///
/// Every rank fills its owned cells, the result is summed over ranks.
pub(crate) fn global_cell_averages<C: CellConnectivity>(
    ctx: &ExecutionContext,
    discretization: &Discretization<C>,
    integrand: &dyn CellIntegrand,
) -> Vec<f64> {
    let num_components = integrand.num_components();
    let distribution = &discretization.distribution;
    let mut averages = vec![0.0; num_components * distribution.num_global_cells()];
    let mut values = vec![0.0; num_components];
    for (local_cell, quadrature) in discretization.quadratures.iter().enumerate() {
        let global_cell = distribution.global_cell(local_cell);
        let average = &mut averages[num_components * global_cell..num_components * (global_cell + 1)];
        for (q, &w) in quadrature.weights().iter().enumerate() {
            integrand.evaluate(local_cell, quadrature, q, &mut values);
            for (a, v) in average.iter_mut().zip(&values) {
                *a += w * v;
            }
        }
        let volume = quadrature.volume();
        if volume > 0.0 {
            average.iter_mut().for_each(|a| *a /= volume);
        }
    }
    ctx.all_reduce_sum(&mut averages);
    averages
}

/// Grain ID of every global cell.
pub(crate) fn global_grain_ids<C: CellConnectivity>(ctx: &ExecutionContext, discretization: &Discretization<C>) -> Vec<usize> {
    let distribution = &discretization.distribution;
    let mut ids = vec![0.0; distribution.num_global_cells()];
    for (local_cell, grain) in discretization.grain_cells.cell_tags().into_iter().enumerate() {
        ids[distribution.global_cell(local_cell)] = grain as f64;
    }
    ctx.all_reduce_sum(&mut ids);
    ids.into_iter().map(|id| id.round() as usize).collect()
}

/// Loads a tensor function with nine row-major components at the given points.
pub(crate) fn load_tensor_cells(function: &FunctionInput, points: &[Point3<f64>]) -> Result<CellField<Matrix3<f64>>> {
    let components = load_cells(function, points, 9)?;
    let tensors = components
        .values()
        .iter()
        .map(tensor_from_components)
        .collect::<Result<Vec<_>>>()?;
    Ok(CellField::from_values(tensors))
}

/// Splits interleaved values into row-major 3×3 tensors.
pub(crate) fn to_tensors(values: &[f64]) -> Vec<Matrix3<f64>> {
    values.chunks_exact(9).map(Matrix3::from_row_slice).collect()
}

pub(crate) fn to_vectors(values: &[f64]) -> Vec<Vector3<f64>> {
    values.chunks_exact(3).map(Vector3::from_column_slice).collect()
}
