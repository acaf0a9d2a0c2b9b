use crate::connectivity::Quad4d3Connectivity;
use crate::element::FaceConnectivity;
use crate::quadrature::{quad_gauss_2x2, QuadraturePair2d};
use nalgebra::{Point2, Vector2};

const QUAD4_REFERENCE_NODES: [[f64; 2]; 4] = [[-1.0, -1.0], [1.0, -1.0], [1.0, 1.0], [-1.0, 1.0]];

impl FaceConnectivity for Quad4d3Connectivity {
    fn reference_quadrature() -> QuadraturePair2d {
        quad_gauss_2x2()
    }

    fn populate_basis(basis_values: &mut [f64], xi: &Point2<f64>) {
        assert_eq!(basis_values.len(), 4);
        for (phi, [a, b]) in basis_values.iter_mut().zip(QUAD4_REFERENCE_NODES) {
            *phi = 0.25 * (1.0 + a * xi.x) * (1.0 + b * xi.y);
        }
    }

    fn populate_basis_gradients(basis_gradients: &mut [Vector2<f64>], xi: &Point2<f64>) {
        assert_eq!(basis_gradients.len(), 4);
        for (grad, [a, b]) in basis_gradients.iter_mut().zip(QUAD4_REFERENCE_NODES) {
            *grad = 0.25 * Vector2::new(a * (1.0 + b * xi.y), b * (1.0 + a * xi.x));
        }
    }

    fn triangulation() -> &'static [[usize; 3]] {
        &[[0, 1, 2], [0, 2, 3]]
    }
}
