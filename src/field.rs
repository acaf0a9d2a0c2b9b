//! Piecewise-constant per-grain cell fields and nodal fields.
//!
//! Material fields hold crystal-frame values. Rotation into the sample frame happens where the
//! values are used, together with the [`orientation_field`].
use crate::error::{Error, Result};
use crate::material::{ElasticMaterial, ThermalMaterial};
use crate::microstructure::Microstructure;
use crate::partition::GrainCells;
use log::debug;
use nalgebra::{DVector, Matrix3, Matrix6, Vector3};

/// One value per local cell.
#[derive(Debug, Clone, PartialEq)]
pub struct CellField<V> {
    values: Vec<V>,
}

impl<V> CellField<V> {
    pub fn from_values(values: Vec<V>) -> Self {
        Self { values }
    }

    /// Builds a field that is constant on every grain.
    ///
    /// `grain_value` is evaluated once per grain that owns at least one local cell.
    pub fn from_grain_values(grain_cells: &GrainCells, mut grain_value: impl FnMut(usize) -> Result<V>) -> Result<Self>
    where
        V: Clone,
    {
        let mut slots: Vec<Option<V>> = vec![None; grain_cells.num_cells()];
        for (grain, cells) in grain_cells.iter() {
            if cells.is_empty() {
                continue;
            }
            let value = grain_value(grain)?;
            for &cell in cells {
                let slot = slots.get_mut(cell).ok_or_else(|| {
                    Error::Mesh(format!("grain {grain} references local cell {cell} out of range"))
                })?;
                *slot = Some(value.clone());
            }
        }
        let values = slots
            .into_iter()
            .enumerate()
            .map(|(cell, value)| value.ok_or_else(|| Error::Mesh(format!("local cell {cell} belongs to no grain"))))
            .collect::<Result<_>>()?;
        Ok(Self { values })
    }

    pub fn values(&self) -> &[V] {
        &self.values
    }

    pub fn get(&self, cell: usize) -> Option<&V> {
        self.values.get(cell)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn map<W>(&self, f: impl FnMut(&V) -> W) -> CellField<W> {
        CellField {
            values: self.values.iter().map(f).collect(),
        }
    }
}

impl<V> std::ops::Index<usize> for CellField<V> {
    type Output = V;

    fn index(&self, cell: usize) -> &V {
        &self.values[cell]
    }
}

fn check_grain_count(grain_cells: &GrainCells, microstructure: &dyn Microstructure) -> Result<()> {
    if grain_cells.num_grains() != microstructure.num_grains() {
        return Err(Error::OrientationCount {
            expected: microstructure.num_grains(),
            actual: grain_cells.num_grains(),
        });
    }
    Ok(())
}

/// Looks up the material of the phase the given grain belongs to.
pub fn material_of<'a, M>(microstructure: &dyn Microstructure, materials: &'a [M], grain: usize) -> Result<&'a M> {
    let phase = microstructure.phase_of(grain);
    materials.get(phase).ok_or(Error::UnknownMaterial { phase })
}

/// Checks that every grain of the microstructure has a material, whether or not it owns
/// local cells, so that all ranks agree on the outcome.
pub fn check_materials<M>(microstructure: &dyn Microstructure, materials: &[M]) -> Result<()> {
    for grain in 0..microstructure.num_grains() {
        material_of(microstructure, materials, grain)?;
    }
    Ok(())
}

/// Rotation matrix of every local cell.
pub fn orientation_field(grain_cells: &GrainCells, microstructure: &dyn Microstructure) -> Result<CellField<Matrix3<f64>>> {
    check_grain_count(grain_cells, microstructure)?;
    CellField::from_grain_values(grain_cells, |grain| Ok(*microstructure.orientation_of(grain).matrix()))
}

/// Crystal-frame Mandel stiffness of every local cell.
pub fn stiffness_field<M: ElasticMaterial>(
    grain_cells: &GrainCells,
    microstructure: &dyn Microstructure,
    materials: &[M],
) -> Result<CellField<Matrix6<f64>>> {
    check_grain_count(grain_cells, microstructure)?;
    check_materials(microstructure, materials)?;
    CellField::from_grain_values(grain_cells, |grain| {
        let material = material_of(microstructure, materials, grain)?;
        debug!("Grain {grain}: phase {}", microstructure.phase_of(grain));
        Ok(*material.stiffness())
    })
}

/// Crystal-frame conductivity of every local cell.
pub fn conductivity_field<M: ThermalMaterial>(
    grain_cells: &GrainCells,
    microstructure: &dyn Microstructure,
    materials: &[M],
) -> Result<CellField<Matrix3<f64>>> {
    check_grain_count(grain_cells, microstructure)?;
    check_materials(microstructure, materials)?;
    CellField::from_grain_values(grain_cells, |grain| {
        let material = material_of(microstructure, materials, grain)?;
        Ok(*material.conductivity())
    })
}

/// A field with `num_components` values per mesh vertex, interleaved by vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct NodalField {
    num_components: usize,
    values: DVector<f64>,
}

impl NodalField {
    pub fn zeros(num_nodes: usize, num_components: usize) -> Self {
        Self {
            num_components,
            values: DVector::zeros(num_nodes * num_components),
        }
    }

    pub fn from_values(num_components: usize, values: DVector<f64>) -> Result<Self> {
        if num_components == 0 || values.len() % num_components != 0 {
            return Err(Error::InvalidInput(format!(
                "{} nodal values cannot be split into {num_components} components",
                values.len()
            )));
        }
        Ok(Self { num_components, values })
    }

    pub fn num_components(&self) -> usize {
        self.num_components
    }

    pub fn num_nodes(&self) -> usize {
        self.values.len() / self.num_components
    }

    pub fn values(&self) -> &DVector<f64> {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut DVector<f64> {
        &mut self.values
    }

    pub fn into_values(self) -> DVector<f64> {
        self.values
    }

    /// All components at the given node.
    pub fn node_value(&self, node: usize) -> &[f64] {
        let n = self.num_components;
        &self.values.as_slice()[node * n..(node + 1) * n]
    }

    pub fn node_value_mut(&mut self, node: usize) -> &mut [f64] {
        let n = self.num_components;
        &mut self.values.as_mut_slice()[node * n..(node + 1) * n]
    }

    /// The value at the given node as a 3-vector, zero-padded for fewer components.
    pub fn node_vector3(&self, node: usize) -> Vector3<f64> {
        let mut v = Vector3::zeros();
        for (v_i, x) in v.iter_mut().zip(self.node_value(node)) {
            *v_i = *x;
        }
        v
    }
}
