//! Quadrature rules on the reference domains.
//!
//! All reference domains live in `[-1, 1]^d`: the reference triangle and tetrahedron are the
//! corners of that cube adjacent to `(-1, ..., -1)`.
use nalgebra::{Point2, Point3};

pub type QuadraturePair<P> = (Vec<f64>, Vec<P>);
pub type QuadraturePair2d = QuadraturePair<Point2<f64>>;
pub type QuadraturePair3d = QuadraturePair<Point3<f64>>;

/// Two-point Gauss-Legendre rule on `[-1, 1]`, exact for cubics.
fn gauss_2() -> ([f64; 2], [f64; 2]) {
    let a = 1.0 / f64::sqrt(3.0);
    ([1.0, 1.0], [-a, a])
}

/// Tensor-product 2×2×2 Gauss rule on the reference hexahedron.
pub fn hex_gauss_2x2x2() -> QuadraturePair3d {
    let (w1d, p1d) = gauss_2();
    let mut weights = Vec::with_capacity(8);
    let mut points = Vec::with_capacity(8);
    for k in 0..2 {
        for j in 0..2 {
            for i in 0..2 {
                weights.push(w1d[i] * w1d[j] * w1d[k]);
                points.push(Point3::new(p1d[i], p1d[j], p1d[k]));
            }
        }
    }
    (weights, points)
}

/// Tensor-product 2×2 Gauss rule on the reference quadrilateral.
pub fn quad_gauss_2x2() -> QuadraturePair2d {
    let (w1d, p1d) = gauss_2();
    let mut weights = Vec::with_capacity(4);
    let mut points = Vec::with_capacity(4);
    for j in 0..2 {
        for i in 0..2 {
            weights.push(w1d[i] * w1d[j]);
            points.push(Point2::new(p1d[i], p1d[j]));
        }
    }
    (weights, points)
}

/// Four-point rule on the reference tetrahedron, exact for quadratics.
pub fn tet_quadrature_4() -> QuadraturePair3d {
    // Barycentric coordinates of the rule on the unit simplex
    let a = 0.5854101966249685;
    let b = 0.1381966011250105;
    let to_reference = |l: [f64; 3]| Point3::new(2.0 * l[0] - 1.0, 2.0 * l[1] - 1.0, 2.0 * l[2] - 1.0);
    let points = vec![
        to_reference([b, b, b]),
        to_reference([a, b, b]),
        to_reference([b, a, b]),
        to_reference([b, b, a]),
    ];
    // Reference volume is 4/3
    let weights = vec![1.0 / 3.0; 4];
    (weights, points)
}

/// Three-point rule on the reference triangle, exact for quadratics.
pub fn tri_quadrature_3() -> QuadraturePair2d {
    let to_reference = |l: [f64; 2]| Point2::new(2.0 * l[0] - 1.0, 2.0 * l[1] - 1.0);
    let points = vec![
        to_reference([1.0 / 6.0, 1.0 / 6.0]),
        to_reference([2.0 / 3.0, 1.0 / 6.0]),
        to_reference([1.0 / 6.0, 2.0 / 3.0]),
    ];
    // Reference area is 2
    let weights = vec![2.0 / 3.0; 3];
    (weights, points)
}
