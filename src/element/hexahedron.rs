use crate::connectivity::{Connectivity, Hex8Connectivity, Quad4d3Connectivity};
use crate::element::CellConnectivity;
use crate::quadrature::{hex_gauss_2x2x2, QuadraturePair3d};
use nalgebra::{Point3, Vector3};

/// Reference coordinates of the Hex8 nodes on `[-1, 1]^3`.
#[rustfmt::skip]
const HEX8_REFERENCE_NODES: [[f64; 3]; 8] = [
    [-1.0, -1.0, -1.0],
    [ 1.0, -1.0, -1.0],
    [ 1.0,  1.0, -1.0],
    [-1.0,  1.0, -1.0],
    [-1.0, -1.0,  1.0],
    [ 1.0, -1.0,  1.0],
    [ 1.0,  1.0,  1.0],
    [-1.0,  1.0,  1.0],
];

impl CellConnectivity for Hex8Connectivity {
    type Face = Quad4d3Connectivity;

    fn face(&self, index: usize) -> Option<Self::Face> {
        self.get_face_connectivity(index)
    }

    fn reference_quadrature() -> QuadraturePair3d {
        hex_gauss_2x2x2()
    }

    fn populate_basis(basis_values: &mut [f64], xi: &Point3<f64>) {
        assert_eq!(basis_values.len(), 8);
        for (phi, [a, b, c]) in basis_values.iter_mut().zip(HEX8_REFERENCE_NODES) {
            *phi = 0.125 * (1.0 + a * xi.x) * (1.0 + b * xi.y) * (1.0 + c * xi.z);
        }
    }

    fn populate_basis_gradients(basis_gradients: &mut [Vector3<f64>], xi: &Point3<f64>) {
        assert_eq!(basis_gradients.len(), 8);
        for (grad, [a, b, c]) in basis_gradients.iter_mut().zip(HEX8_REFERENCE_NODES) {
            let (fx, fy, fz) = (1.0 + a * xi.x, 1.0 + b * xi.y, 1.0 + c * xi.z);
            *grad = 0.125 * Vector3::new(a * fy * fz, b * fx * fz, c * fx * fy);
        }
    }
}
