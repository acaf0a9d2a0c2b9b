//! Lagrange elements for cells and boundary faces.
//!
//! A [`CellConnectivity`] knows its reference basis and quadrature, and maps them onto
//! physical cells as an [`ElementQuadrature`]: quadrature weights scaled by the Jacobian
//! determinant, physical quadrature points, basis values and physical basis gradients.
//! A [`FaceConnectivity`] does the same for boundary faces with surface measure.
use crate::connectivity::Connectivity;
use crate::error::{Error, Result};
use crate::quadrature::{QuadraturePair2d, QuadraturePair3d};
use itertools::izip;
use nalgebra::{Matrix3, Point2, Point3, Vector2, Vector3};
use std::fmt::Debug;

mod hexahedron;
mod quadrilateral;
mod tetrahedron;
mod triangle;

/// Volumetric cell connectivity with an associated Lagrange element.
pub trait CellConnectivity: Connectivity + Copy + Debug + Send + Sync {
    type Face: FaceConnectivity;

    /// The outward oriented face with the given local index.
    fn face(&self, index: usize) -> Option<Self::Face>;

    fn reference_quadrature() -> QuadraturePair3d;

    /// Evaluates all nodal basis functions at the reference coordinates `xi`.
    fn populate_basis(basis_values: &mut [f64], xi: &Point3<f64>);

    /// Evaluates all reference gradients of the nodal basis functions at `xi`.
    fn populate_basis_gradients(basis_gradients: &mut [Vector3<f64>], xi: &Point3<f64>);

    /// Arithmetic mean of the cell vertices.
    fn centroid(&self, vertices: &[Point3<f64>]) -> Point3<f64> {
        vertex_mean(self.vertex_indices(), vertices)
    }

    /// Maps the reference quadrature onto this cell.
    ///
    /// Returns [`Error::SingularElement`] with the given `cell` index if the geometry is degenerate.
    fn element_quadrature(&self, vertices: &[Point3<f64>], cell: usize) -> Result<ElementQuadrature> {
        let nodes = self.vertex_indices().to_vec();
        let n = nodes.len();
        let node_coords = gather_vertices(&nodes, vertices)?;
        let (ref_weights, ref_points) = Self::reference_quadrature();

        let mut quadrature = ElementQuadrature {
            nodes,
            weights: Vec::with_capacity(ref_weights.len()),
            points: Vec::with_capacity(ref_weights.len()),
            basis: Vec::with_capacity(ref_weights.len() * n),
            gradients: Vec::with_capacity(ref_weights.len() * n),
        };

        let mut phi = vec![0.0; n];
        let mut phi_grad_ref = vec![Vector3::zeros(); n];
        for (w, xi) in izip!(&ref_weights, &ref_points) {
            Self::populate_basis(&mut phi, xi);
            Self::populate_basis_gradients(&mut phi_grad_ref, xi);

            let mut x = Vector3::zeros();
            let mut j = Matrix3::zeros();
            for (x_i, phi_i, grad_i) in izip!(&node_coords, &phi, &phi_grad_ref) {
                x += x_i * *phi_i;
                j += x_i * grad_i.transpose();
            }

            let j_det = j.determinant();
            if !(j_det.abs() > 0.0) || !j_det.is_finite() {
                return Err(Error::SingularElement { cell });
            }
            let j_inv_t = j
                .try_inverse()
                .ok_or(Error::SingularElement { cell })?
                .transpose();

            quadrature.weights.push(*w * j_det.abs());
            quadrature.points.push(Point3::from(x));
            quadrature.basis.extend_from_slice(&phi);
            quadrature
                .gradients
                .extend(phi_grad_ref.iter().map(|grad| j_inv_t * grad));
        }

        Ok(quadrature)
    }
}

/// Boundary face connectivity with an associated Lagrange surface element.
pub trait FaceConnectivity: Connectivity + Copy + Debug + Send + Sync {
    fn reference_quadrature() -> QuadraturePair2d;

    fn populate_basis(basis_values: &mut [f64], xi: &Point2<f64>);

    fn populate_basis_gradients(basis_gradients: &mut [Vector2<f64>], xi: &Point2<f64>);

    /// Triangles covering the face, in terms of local vertex indices.
    fn triangulation() -> &'static [[usize; 3]];

    fn midpoint(&self, vertices: &[Point3<f64>]) -> Point3<f64> {
        vertex_mean(self.vertex_indices(), vertices)
    }

    /// Whether `point` lies on the face, up to the relative tolerance `tol`.
    fn contains_point(&self, vertices: &[Point3<f64>], point: &Point3<f64>, tol: f64) -> bool {
        let v = self.vertex_indices();
        Self::triangulation().iter().any(|&[a, b, c]| {
            match (vertices.get(v[a]), vertices.get(v[b]), vertices.get(v[c])) {
                (Some(a), Some(b), Some(c)) => triangle_contains_point([a, b, c], point, tol),
                _ => false,
            }
        })
    }

    /// Maps the reference quadrature onto this face, with weights in surface measure.
    fn surface_quadrature(&self, vertices: &[Point3<f64>]) -> Result<SurfaceQuadrature> {
        let nodes = self.vertex_indices().to_vec();
        let n = nodes.len();
        let node_coords = gather_vertices(&nodes, vertices)?;
        let (ref_weights, ref_points) = Self::reference_quadrature();

        let mut quadrature = SurfaceQuadrature {
            nodes,
            weights: Vec::with_capacity(ref_weights.len()),
            points: Vec::with_capacity(ref_weights.len()),
            basis: Vec::with_capacity(ref_weights.len() * n),
        };

        let mut phi = vec![0.0; n];
        let mut phi_grad_ref = vec![Vector2::zeros(); n];
        for (w, xi) in izip!(&ref_weights, &ref_points) {
            Self::populate_basis(&mut phi, xi);
            Self::populate_basis_gradients(&mut phi_grad_ref, xi);

            let mut x = Vector3::zeros();
            let mut tangent_0 = Vector3::zeros();
            let mut tangent_1 = Vector3::zeros();
            for (x_i, phi_i, grad_i) in izip!(&node_coords, &phi, &phi_grad_ref) {
                x += x_i * *phi_i;
                tangent_0 += x_i * grad_i.x;
                tangent_1 += x_i * grad_i.y;
            }

            quadrature.weights.push(*w * tangent_0.cross(&tangent_1).norm());
            quadrature.points.push(Point3::from(x));
            quadrature.basis.extend_from_slice(&phi);
        }

        Ok(quadrature)
    }
}

/// Quadrature data of a single physical cell.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementQuadrature {
    nodes: Vec<usize>,
    weights: Vec<f64>,
    points: Vec<Point3<f64>>,
    basis: Vec<f64>,
    gradients: Vec<Vector3<f64>>,
}

impl ElementQuadrature {
    /// Global vertex indices of the element nodes.
    pub fn nodes(&self) -> &[usize] {
        &self.nodes
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_points(&self) -> usize {
        self.weights.len()
    }

    /// Quadrature weights including the Jacobian determinant.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    /// Basis function values at quadrature point `q`.
    pub fn basis(&self, q: usize) -> &[f64] {
        let n = self.num_nodes();
        &self.basis[q * n..(q + 1) * n]
    }

    /// Physical basis gradients at quadrature point `q`.
    pub fn gradients(&self, q: usize) -> &[Vector3<f64>] {
        let n = self.num_nodes();
        &self.gradients[q * n..(q + 1) * n]
    }

    pub fn volume(&self) -> f64 {
        self.weights.iter().sum()
    }
}

/// Quadrature data of a single physical boundary face.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceQuadrature {
    nodes: Vec<usize>,
    weights: Vec<f64>,
    points: Vec<Point3<f64>>,
    basis: Vec<f64>,
}

impl SurfaceQuadrature {
    pub fn nodes(&self) -> &[usize] {
        &self.nodes
    }

    pub fn num_points(&self) -> usize {
        self.weights.len()
    }

    /// Quadrature weights including the surface measure.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    pub fn basis(&self, q: usize) -> &[f64] {
        let n = self.nodes.len();
        &self.basis[q * n..(q + 1) * n]
    }

    pub fn area(&self) -> f64 {
        self.weights.iter().sum()
    }
}

fn gather_vertices(nodes: &[usize], vertices: &[Point3<f64>]) -> Result<Vec<Vector3<f64>>> {
    nodes
        .iter()
        .map(|&idx| {
            vertices
                .get(idx)
                .map(|v| v.coords)
                .ok_or_else(|| Error::Mesh(format!("vertex index {idx} out of bounds")))
        })
        .collect()
}

fn vertex_mean(indices: &[usize], vertices: &[Point3<f64>]) -> Point3<f64> {
    let sum = indices
        .iter()
        .fold(Vector3::zeros(), |acc, &idx| acc + vertices[idx].coords);
    Point3::from(sum / indices.len() as f64)
}

fn triangle_contains_point([a, b, c]: [&Point3<f64>; 3], p: &Point3<f64>, tol: f64) -> bool {
    let normal = (b - a).cross(&(c - a));
    let normal_norm2 = normal.norm_squared();
    if normal_norm2 == 0.0 {
        return false;
    }
    let scale = (b - a).norm().max((c - a).norm()).max((c - b).norm());
    let plane_distance = (p - a).dot(&normal).abs() / normal_norm2.sqrt();
    if plane_distance > tol * scale {
        return false;
    }
    let u = (c - b).cross(&(p - b)).dot(&normal) / normal_norm2;
    let v = (a - c).cross(&(p - c)).dot(&normal) / normal_norm2;
    let w = 1.0 - u - v;
    u >= -tol && v >= -tol && w >= -tol
}

/// Element quadratures of the owned cells of a mesh, indexed by local cell.
#[derive(Debug, Clone, PartialEq)]
pub struct CellQuadratures {
    quadratures: Vec<ElementQuadrature>,
}

impl CellQuadratures {
    /// Maps the reference quadrature onto every cell with a global index in `cells`.
    pub fn new<C: CellConnectivity>(
        vertices: &[Point3<f64>],
        connectivity: &[C],
        cells: impl IntoIterator<Item = usize>,
    ) -> Result<Self> {
        let quadratures = cells
            .into_iter()
            .map(|cell| {
                connectivity
                    .get(cell)
                    .ok_or_else(|| Error::Mesh(format!("cell index {cell} out of bounds")))?
                    .element_quadrature(vertices, cell)
            })
            .collect::<Result<_>>()?;
        Ok(Self { quadratures })
    }

    pub fn len(&self) -> usize {
        self.quadratures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quadratures.is_empty()
    }

    pub fn cell(&self, local_cell: usize) -> &ElementQuadrature {
        &self.quadratures[local_cell]
    }

    pub fn iter(&self) -> impl Iterator<Item = &ElementQuadrature> {
        self.quadratures.iter()
    }
}
