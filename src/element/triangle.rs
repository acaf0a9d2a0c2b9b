use crate::connectivity::Tri3d3Connectivity;
use crate::element::FaceConnectivity;
use crate::quadrature::{tri_quadrature_3, QuadraturePair2d};
use nalgebra::{Point2, Vector2};

/// Linear triangle on the reference triangle `(-1, -1)`, `(1, -1)`, `(-1, 1)`.
impl FaceConnectivity for Tri3d3Connectivity {
    fn reference_quadrature() -> QuadraturePair2d {
        tri_quadrature_3()
    }

    fn populate_basis(basis_values: &mut [f64], xi: &Point2<f64>) {
        assert_eq!(basis_values.len(), 3);
        basis_values.copy_from_slice(&[-0.5 * (xi.x + xi.y), 0.5 * (1.0 + xi.x), 0.5 * (1.0 + xi.y)]);
    }

    fn populate_basis_gradients(basis_gradients: &mut [Vector2<f64>], _xi: &Point2<f64>) {
        assert_eq!(basis_gradients.len(), 3);
        basis_gradients.copy_from_slice(&[
            Vector2::new(-0.5, -0.5),
            Vector2::new(0.5, 0.0),
            Vector2::new(0.0, 0.5),
        ]);
    }

    fn triangulation() -> &'static [[usize; 3]] {
        &[[0, 1, 2]]
    }
}
