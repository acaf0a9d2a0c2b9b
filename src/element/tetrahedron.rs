use crate::connectivity::{Connectivity, Tet4Connectivity, Tri3d3Connectivity};
use crate::element::CellConnectivity;
use crate::quadrature::{tet_quadrature_4, QuadraturePair3d};
use nalgebra::{Point3, Vector3};

/// Linear tetrahedron on the reference tetrahedron with vertices
/// `(-1, -1, -1)`, `(1, -1, -1)`, `(-1, 1, -1)` and `(-1, -1, 1)`.
impl CellConnectivity for Tet4Connectivity {
    type Face = Tri3d3Connectivity;

    fn face(&self, index: usize) -> Option<Self::Face> {
        self.get_face_connectivity(index)
    }

    fn reference_quadrature() -> QuadraturePair3d {
        tet_quadrature_4()
    }

    #[rustfmt::skip]
    fn populate_basis(basis_values: &mut [f64], xi: &Point3<f64>) {
        assert_eq!(basis_values.len(), 4);
        basis_values.copy_from_slice(&[
            -0.5 * xi.x - 0.5 * xi.y - 0.5 * xi.z - 0.5,
            0.5 * xi.x + 0.5,
            0.5 * xi.y + 0.5,
            0.5 * xi.z + 0.5,
        ]);
    }

    #[rustfmt::skip]
    fn populate_basis_gradients(basis_gradients: &mut [Vector3<f64>], _xi: &Point3<f64>) {
        assert_eq!(basis_gradients.len(), 4);
        basis_gradients.copy_from_slice(&[
            Vector3::new(-0.5, -0.5, -0.5),
            Vector3::new(0.5, 0.0, 0.0),
            Vector3::new(0.0, 0.5, 0.0),
            Vector3::new(0.0, 0.0, 0.5),
        ]);
    }
}
