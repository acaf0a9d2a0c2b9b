//! Mandel 6-vector conversion and crystal/sample frame rotation.
//!
//! Symmetric rank-2 tensors are stored as 6-vectors in the Mandel convention,
//! with component order
//!
//! ```text
//! [W00, W11, W22, √2 W12, √2 W20, √2 W01]
//! ```
//!
//! so that the Euclidean inner product of two 6-vectors equals the double contraction
//! of the tensors. Rank-4 stiffness tensors are 6×6 matrices acting on such vectors.
//!
//! An orientation `R` maps crystal-frame quantities to the sample frame:
//! `tosample(W, R) = R W Rᵀ` and `tocrystal(W, R) = Rᵀ W R`.
//! A stiffness matrix is only meaningful in the frame it was defined in, which for all
//! material models in this crate is the crystal frame.
use crate::Real;
use nalgebra::{Matrix3, Matrix6, Vector3, Vector6};
use numeric_literals::replace_float_literals;

/// Symmetric part of a 3×3 tensor.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub fn sym<T: Real>(w: &Matrix3<T>) -> Matrix3<T> {
    (w + w.transpose()) * 0.5
}

/// Mandel 6-vector of a symmetric 3×3 tensor.
///
/// Only the upper triangle of `w` is read for the off-diagonal terms, so callers are expected
/// to pass a symmetric tensor.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub fn to6vector<T: Real>(w: &Matrix3<T>) -> Vector6<T> {
    let r2 = T::sqrt(2.0);
    Vector6::new(
        w[(0, 0)],
        w[(1, 1)],
        w[(2, 2)],
        r2 * w[(1, 2)],
        r2 * w[(2, 0)],
        r2 * w[(0, 1)],
    )
}

/// Symmetric 3×3 tensor from its Mandel 6-vector.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub fn totensor<T: Real>(v: &Vector6<T>) -> Matrix3<T> {
    let r2 = T::sqrt(2.0);
    let (w12, w20, w01) = (v[3] / r2, v[4] / r2, v[5] / r2);
    #[rustfmt::skip]
    let w = Matrix3::new(
        v[0], w01, w20,
        w01, v[1], w12,
        w20, w12, v[2],
    );
    w
}

/// Rotates a sample-frame tensor into the crystal frame, `Rᵀ W R`.
pub fn tocrystal<T: Real>(w: &Matrix3<T>, r: &Matrix3<T>) -> Matrix3<T> {
    r.transpose() * w * r
}

/// Rotates a crystal-frame tensor into the sample frame, `R W Rᵀ`.
pub fn tosample<T: Real>(w: &Matrix3<T>, r: &Matrix3<T>) -> Matrix3<T> {
    r * w * r.transpose()
}

/// Applies a crystal-frame stiffness to a crystal-frame tensor.
///
/// The tensor is symmetrized first, since the stiffness only acts on symmetric tensors.
pub fn apply_crystal_stiffness<T: Real>(w_c: &Matrix3<T>, stiffness_c: &Matrix6<T>) -> Matrix3<T> {
    totensor(&(stiffness_c * to6vector(&sym(w_c))))
}

/// Crystal-frame stress produced by a sample-frame strain (or displacement gradient).
pub fn crystal_stress<T: Real>(strain_s: &Matrix3<T>, stiffness_c: &Matrix6<T>, r: &Matrix3<T>) -> Matrix3<T> {
    let strain_c = tocrystal(&sym(strain_s), r);
    totensor(&(stiffness_c * to6vector(&strain_c)))
}

/// Sample-frame stress produced by a sample-frame strain (or displacement gradient).
///
/// The order of operations is: symmetrize, rotate to the crystal frame, convert to a Mandel
/// vector, apply the crystal stiffness, convert back to a tensor and rotate back to the sample
/// frame.
pub fn sample_stress<T: Real>(strain_s: &Matrix3<T>, stiffness_c: &Matrix6<T>, r: &Matrix3<T>) -> Matrix3<T> {
    tosample(&crystal_stress(strain_s, stiffness_c, r), r)
}

/// The sample-frame Mandel stiffness operator of a crystal with orientation `r`.
///
/// Column `j` is the Mandel vector of [`sample_stress`] applied to the `j`-th Mandel basis
/// tensor, so multiplying a sample-frame strain vector by this matrix reproduces
/// [`sample_stress`] exactly.
pub fn sample_stiffness<T: Real>(stiffness_c: &Matrix6<T>, r: &Matrix3<T>) -> Matrix6<T> {
    let mut stiffness_s = Matrix6::zeros();
    for j in 0..6 {
        let basis_tensor = totensor(&Vector6::ith(j, T::one()));
        let column = to6vector(&sample_stress(&basis_tensor, stiffness_c, r));
        stiffness_s.set_column(j, &column);
    }
    stiffness_s
}

/// Sample-frame conductivity `R K Rᵀ` of a crystal-frame conductivity `K`.
pub fn sample_conductivity<T: Real>(conductivity_c: &Matrix3<T>, r: &Matrix3<T>) -> Matrix3<T> {
    tosample(conductivity_c, r)
}

/// Traction `σ n` on a surface with normal `n`.
pub fn traction<T: Real>(stress: &Matrix3<T>, normal: &Vector3<T>) -> Vector3<T> {
    stress * normal
}
