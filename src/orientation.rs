use crate::error::{Error, Result};
use nalgebra::{Matrix3, Rotation3, Unit, Vector3};
use serde::Serialize;

/// Tolerance for the orthonormality and determinant checks of [`Orientation::try_from_matrix`].
pub const ORIENTATION_TOLERANCE: f64 = 1e-10;

/// A proper rotation mapping crystal-frame quantities to the sample frame.
///
/// The invariant `R Rᵀ = I`, `det R = 1` is checked on construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Orientation(Matrix3<f64>);

impl Orientation {
    pub fn identity() -> Self {
        Self(Matrix3::identity())
    }

    pub fn try_from_matrix(matrix: Matrix3<f64>) -> Result<Self> {
        let orthonormality_defect = (matrix * matrix.transpose() - Matrix3::identity()).norm();
        let det = matrix.determinant();
        if orthonormality_defect <= ORIENTATION_TOLERANCE && (det - 1.0).abs() <= ORIENTATION_TOLERANCE {
            Ok(Self(matrix))
        } else {
            Err(Error::InvalidOrientation)
        }
    }

    /// Rotation by `angle` radians about `axis` (which need not be normalized).
    pub fn from_axis_angle(axis: &Vector3<f64>, angle: f64) -> Result<Self> {
        let axis = Unit::try_new(*axis, f64::EPSILON)
            .ok_or_else(|| Error::InvalidInput("rotation axis must be non-zero".to_string()))?;
        Ok(Self::from_rotation(&Rotation3::from_axis_angle(&axis, angle)))
    }

    pub fn from_rotation(rotation: &Rotation3<f64>) -> Self {
        Self(*rotation.matrix())
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.0
    }
}

impl Default for Orientation {
    fn default() -> Self {
        Self::identity()
    }
}
