//! Grain volumes, grain integrals and grain averages reduced over all ranks.
//!
//! Every reduction visits the grains in ID order and calls exactly one all-reduce per grain on
//! every rank. A rank owning no cells of a grain contributes zero without evaluating anything.
use crate::comm::ExecutionContext;
use crate::element::{CellQuadratures, ElementQuadrature};
use crate::error::{Error, Result};
use crate::field::{CellField, NodalField};
use crate::partition::GrainCells;
use log::debug;
use nalgebra::DVector;

/// Indicator function of the cells of one grain, reused across grains.
#[derive(Debug, Clone)]
pub struct GrainMask<'a> {
    grain_cells: &'a GrainCells,
    indicator: Vec<f64>,
    selected: Option<usize>,
}

impl<'a> GrainMask<'a> {
    pub fn new(grain_cells: &'a GrainCells) -> Self {
        Self {
            grain_cells,
            indicator: vec![0.0; grain_cells.num_cells()],
            selected: None,
        }
    }

    /// Makes the indicator one on the cells of `grain` and zero elsewhere.
    ///
    /// Only the cells of the previously selected grain and of `grain` are touched.
    pub fn select(&mut self, grain: usize) -> &'a [usize] {
        if let Some(previous) = self.selected {
            for &cell in self.grain_cells.cells(previous) {
                self.indicator[cell] = 0.0;
            }
        }
        let cells = self.grain_cells.cells(grain);
        for &cell in cells {
            self.indicator[cell] = 1.0;
        }
        self.selected = Some(grain);
        cells
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn indicator(&self) -> &[f64] {
        &self.indicator
    }
}

/// A quantity that can be integrated over cells.
pub trait CellIntegrand {
    fn num_components(&self) -> usize;

    /// Evaluates the integrand at quadrature point `q` of the given local cell.
    fn evaluate(&self, local_cell: usize, quadrature: &ElementQuadrature, q: usize, values: &mut [f64]);
}

/// The constant function one.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unit;

impl CellIntegrand for Unit {
    fn num_components(&self) -> usize {
        1
    }

    fn evaluate(&self, _local_cell: usize, _quadrature: &ElementQuadrature, _q: usize, values: &mut [f64]) {
        values[0] = 1.0;
    }
}

impl CellIntegrand for CellField<f64> {
    fn num_components(&self) -> usize {
        1
    }

    fn evaluate(&self, local_cell: usize, _quadrature: &ElementQuadrature, _q: usize, values: &mut [f64]) {
        values[0] = self[local_cell];
    }
}

/// A piecewise-constant field with a fixed number of components per cell.
#[derive(Debug, Clone, Copy)]
pub struct CellComponents<'a> {
    pub num_components: usize,
    pub field: &'a CellField<DVector<f64>>,
}

impl<'a> CellIntegrand for CellComponents<'a> {
    fn num_components(&self) -> usize {
        self.num_components
    }

    fn evaluate(&self, local_cell: usize, _quadrature: &ElementQuadrature, _q: usize, values: &mut [f64]) {
        values.copy_from_slice(self.field[local_cell].as_slice());
    }
}

/// All components of a nodal field, interpolated with the element basis.
impl CellIntegrand for NodalField {
    fn num_components(&self) -> usize {
        NodalField::num_components(self)
    }

    fn evaluate(&self, _local_cell: usize, quadrature: &ElementQuadrature, q: usize, values: &mut [f64]) {
        values.fill(0.0);
        for (&node, &phi) in quadrature.nodes().iter().zip(quadrature.basis(q)) {
            for (v, u) in values.iter_mut().zip(self.node_value(node)) {
                *v += phi * u;
            }
        }
    }
}

/// A single component of a nodal field.
#[derive(Debug, Clone, Copy)]
pub struct NodalComponent<'a> {
    pub field: &'a NodalField,
    pub component: usize,
}

impl<'a> CellIntegrand for NodalComponent<'a> {
    fn num_components(&self) -> usize {
        1
    }

    fn evaluate(&self, _local_cell: usize, quadrature: &ElementQuadrature, q: usize, values: &mut [f64]) {
        values[0] = quadrature
            .nodes()
            .iter()
            .zip(quadrature.basis(q))
            .map(|(&node, &phi)| phi * self.field.node_value(node)[self.component])
            .sum();
    }
}

fn check_local_cells(quadratures: &CellQuadratures, grain_cells: &GrainCells) -> Result<()> {
    if quadratures.len() != grain_cells.num_cells() {
        return Err(Error::Mesh(format!(
            "{} local cell quadratures, but {} cells in the grain partition",
            quadratures.len(),
            grain_cells.num_cells()
        )));
    }
    Ok(())
}

/// Volume of every grain.
pub fn grain_volumes(ctx: &ExecutionContext, quadratures: &CellQuadratures, grain_cells: &GrainCells) -> Result<Vec<f64>> {
    ctx.agree(check_local_cells(quadratures, grain_cells), || {
        Error::PeerFailed("grain reduction".to_string())
    })?;
    let mut mask = GrainMask::new(grain_cells);
    let mut volumes = Vec::with_capacity(grain_cells.num_grains());
    for grain in 0..grain_cells.num_grains() {
        let cells = mask.select(grain);
        let local_volume: f64 = cells
            .iter()
            .map(|&cell| mask.indicator()[cell] * quadratures.cell(cell).volume())
            .sum();
        let volume = ctx.all_reduce_sum_scalar(local_volume);
        debug!("Grain {grain}: volume {volume:e} ({} local cells)", cells.len());
        volumes.push(volume);
    }
    Ok(volumes)
}

/// Integral of every component of `integrand` over every grain.
pub fn grain_integrals_components(
    ctx: &ExecutionContext,
    quadratures: &CellQuadratures,
    grain_cells: &GrainCells,
    integrand: &dyn CellIntegrand,
) -> Result<Vec<DVector<f64>>> {
    ctx.agree(check_local_cells(quadratures, grain_cells), || {
        Error::PeerFailed("grain reduction".to_string())
    })?;
    let num_components = integrand.num_components();
    let mut mask = GrainMask::new(grain_cells);
    let mut values = vec![0.0; num_components];
    let mut integrals = Vec::with_capacity(grain_cells.num_grains());
    for grain in 0..grain_cells.num_grains() {
        let cells = mask.select(grain);
        let mut local = DVector::zeros(num_components);
        for &cell in cells {
            let indicator = mask.indicator()[cell];
            let quadrature = quadratures.cell(cell);
            for (q, &w) in quadrature.weights().iter().enumerate() {
                integrand.evaluate(cell, quadrature, q, &mut values);
                for (l, v) in local.iter_mut().zip(&values) {
                    *l += w * indicator * v;
                }
            }
        }
        ctx.all_reduce_sum(local.as_mut_slice());
        integrals.push(local);
    }
    Ok(integrals)
}

/// Integral of a scalar integrand over every grain.
pub fn grain_integrals(
    ctx: &ExecutionContext,
    quadratures: &CellQuadratures,
    grain_cells: &GrainCells,
    integrand: &dyn CellIntegrand,
) -> Result<Vec<f64>> {
    if integrand.num_components() != 1 {
        return Err(Error::InvalidInput(format!(
            "expected a scalar integrand, got {} components",
            integrand.num_components()
        )));
    }
    Ok(grain_integrals_components(ctx, quadratures, grain_cells, integrand)?
        .into_iter()
        .map(|integral| integral[0])
        .collect())
}

/// Grain integrals divided by grain volumes. Grains without volume average to zero.
pub fn grain_averages(integrals: &[f64], volumes: &[f64]) -> Vec<f64> {
    integrals
        .iter()
        .zip(volumes)
        .map(|(&integral, &volume)| if volume > 0.0 { integral / volume } else { 0.0 })
        .collect()
}

pub fn grain_averages_components(integrals: &[DVector<f64>], volumes: &[f64]) -> Vec<DVector<f64>> {
    integrals
        .iter()
        .zip(volumes)
        .map(|(integral, &volume)| {
            if volume > 0.0 {
                integral / volume
            } else {
                DVector::zeros(integral.len())
            }
        })
        .collect()
}
