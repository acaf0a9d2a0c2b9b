//! Function inputs and their interpolation onto nodal and cell degrees of freedom.
use crate::error::{Error, Result};
use crate::field::{CellField, NodalField};
use nalgebra::{DVector, Matrix3, Point3, Vector3};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

type PointFunction = dyn Fn(&Point3<f64>) -> DVector<f64> + Send + Sync;

/// A function of the spatial position with a fixed number of components.
///
/// Tensor-valued functions have nine components in row-major order.
#[derive(Clone)]
pub struct Interpolant {
    num_components: usize,
    function: Arc<PointFunction>,
}

impl fmt::Debug for Interpolant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interpolant")
            .field("num_components", &self.num_components)
            .finish_non_exhaustive()
    }
}

impl Interpolant {
    pub fn new<F>(num_components: usize, function: F) -> Self
    where
        F: Fn(&Point3<f64>) -> DVector<f64> + Send + Sync + 'static,
    {
        Self {
            num_components,
            function: Arc::new(function),
        }
    }

    pub fn constant(values: &[f64]) -> Self {
        let values = DVector::from_column_slice(values);
        Self::new(values.len(), move |_| values.clone())
    }

    /// The vector field `x ↦ A x + b`.
    pub fn linear(a: Matrix3<f64>, b: Option<Vector3<f64>>) -> Self {
        let b = b.unwrap_or_else(Vector3::zeros);
        Self::new(3, move |x| {
            let y = a * x.coords + b;
            DVector::from_column_slice(y.as_slice())
        })
    }

    /// The scalar field `x ↦ g·x + c`.
    pub fn affine_scalar(g: Vector3<f64>, c: f64) -> Self {
        Self::new(1, move |x| DVector::from_element(1, g.dot(&x.coords) + c))
    }

    /// A tensor field that is constant in space.
    pub fn constant_tensor(m: &Matrix3<f64>) -> Self {
        Self::constant(m.transpose().as_slice())
    }

    pub fn num_components(&self) -> usize {
        self.num_components
    }

    pub fn evaluate(&self, x: &Point3<f64>) -> Result<DVector<f64>> {
        let value = (self.function)(x);
        if value.len() != self.num_components {
            return Err(Error::InvalidInput(format!(
                "function declared {} components, but returned {}",
                self.num_components,
                value.len()
            )));
        }
        Ok(value)
    }
}

/// A validated function input.
#[derive(Debug, Clone)]
pub enum FunctionInput {
    Constant(DVector<f64>),
    Interpolation(Interpolant),
    /// A function stored in an XDMF file. Loading is not supported.
    Xdmf { file: PathBuf, name: String },
}

impl FunctionInput {
    pub fn constant(values: &[f64]) -> Self {
        Self::Constant(DVector::from_column_slice(values))
    }

    pub fn constant_tensor(m: &Matrix3<f64>) -> Self {
        Self::constant(m.transpose().as_slice())
    }

    pub fn num_components(&self) -> Option<usize> {
        match self {
            Self::Constant(value) => Some(value.len()),
            Self::Interpolation(interpolant) => Some(interpolant.num_components()),
            Self::Xdmf { .. } => None,
        }
    }

    pub fn evaluate(&self, x: &Point3<f64>) -> Result<DVector<f64>> {
        match self {
            Self::Constant(value) => Ok(value.clone()),
            Self::Interpolation(interpolant) => interpolant.evaluate(x),
            Self::Xdmf { file, name } => Err(Error::NotImplemented(format!(
                "loading function \"{name}\" from XDMF file {}",
                file.display()
            ))),
        }
    }

    /// Fails unless the function has exactly `expected` components.
    pub fn check_components(&self, expected: usize) -> Result<()> {
        match self.num_components() {
            Some(n) if n != expected => Err(Error::InvalidInput(format!(
                "expected a function with {expected} components, got {n}"
            ))),
            // XDMF inputs fail on evaluation
            _ => Ok(()),
        }
    }
}

/// Interpolates `function` at every vertex.
pub fn load_nodal(function: &FunctionInput, vertices: &[Point3<f64>], num_components: usize) -> Result<NodalField> {
    function.check_components(num_components)?;
    let mut field = NodalField::zeros(vertices.len(), num_components);
    for (node, x) in vertices.iter().enumerate() {
        let value = function.evaluate(x)?;
        field
            .node_value_mut(node)
            .copy_from_slice(value.as_slice());
    }
    Ok(field)
}

/// Evaluates `function` at one point per local cell, typically the cell centroids.
pub fn load_cells(function: &FunctionInput, points: &[Point3<f64>], num_components: usize) -> Result<CellField<DVector<f64>>> {
    function.check_components(num_components)?;
    let values = points
        .iter()
        .map(|x| function.evaluate(x))
        .collect::<Result<Vec<_>>>()?;
    Ok(CellField::from_values(values))
}

/// Interprets nine row-major components as a 3x3 tensor.
pub fn tensor_from_components(values: &DVector<f64>) -> Result<Matrix3<f64>> {
    if values.len() != 9 {
        return Err(Error::InvalidInput(format!(
            "a tensor needs 9 components, got {}",
            values.len()
        )));
    }
    Ok(Matrix3::from_row_slice(values.as_slice()))
}

pub fn vector_from_components(values: &DVector<f64>) -> Result<Vector3<f64>> {
    if values.len() != 3 {
        return Err(Error::InvalidInput(format!(
            "a vector needs 3 components, got {}",
            values.len()
        )));
    }
    Ok(Vector3::from_column_slice(values.as_slice()))
}
