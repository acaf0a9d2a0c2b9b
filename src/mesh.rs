use crate::connectivity::Connectivity;
use crate::element::CellConnectivity;
use crate::error::{Error, Result};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod procedural;

/// Index-based data structure for conforming 3D meshes (i.e. no hanging nodes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mesh<Connectivity> {
    vertices: Vec<Point3<f64>>,
    connectivity: Vec<Connectivity>,
}

/// A face that is connected to exactly one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundaryFace<F> {
    pub connectivity: F,
    /// Index of the cell the face belongs to.
    pub cell: usize,
    /// Local index of the face within its cell.
    pub local_index: usize,
}

impl<C> Mesh<C> {
    pub fn vertices(&self) -> &[Point3<f64>] {
        &self.vertices
    }

    pub fn connectivity(&self) -> &[C] {
        &self.connectivity
    }

    pub fn num_cells(&self) -> usize {
        self.connectivity.len()
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }
}

impl<C: Connectivity> Mesh<C> {
    /// Construct a mesh from vertices and connectivity.
    ///
    /// Returns an error if the connectivity references vertices out of bounds.
    pub fn from_vertices_and_connectivity(vertices: Vec<Point3<f64>>, connectivity: Vec<C>) -> Result<Self> {
        for (cell, conn) in connectivity.iter().enumerate() {
            if let Some(&idx) = conn.vertex_indices().iter().find(|&&idx| idx >= vertices.len()) {
                return Err(Error::Mesh(format!(
                    "cell {cell} references vertex {idx}, but the mesh only has {} vertices",
                    vertices.len()
                )));
            }
        }
        Ok(Self { vertices, connectivity })
    }
}

impl<C: CellConnectivity> Mesh<C> {
    /// Finds faces which are only connected to exactly one cell, along with the connected cell
    /// index and the local index of the face within that cell.
    ///
    /// The faces are returned in a deterministic order.
    pub fn find_boundary_faces(&self) -> Vec<BoundaryFace<C::Face>> {
        // Count occurrences of faces keyed by their sorted vertex indices. Use a BTreeMap to
        // avoid non-determinism due to HashMap's internal randomization.
        let mut face_counts: BTreeMap<Vec<usize>, (BoundaryFace<C::Face>, usize)> = BTreeMap::new();
        for (cell, cell_conn) in self.connectivity.iter().enumerate() {
            for local_index in 0..cell_conn.num_faces() {
                if let Some(face_conn) = cell_conn.face(local_index) {
                    let mut key = face_conn.vertex_indices().to_vec();
                    key.sort_unstable();
                    let face = BoundaryFace {
                        connectivity: face_conn,
                        cell,
                        local_index,
                    };
                    face_counts
                        .entry(key)
                        .and_modify(|(_, count)| *count += 1)
                        .or_insert((face, 1));
                }
            }
        }

        face_counts
            .into_values()
            .filter(|&(_, count)| count == 1)
            .map(|(face, _)| face)
            .collect()
    }

    /// Centroids of the cells with the given indices.
    pub fn cell_centroids(&self, cells: impl IntoIterator<Item = usize>) -> Vec<Point3<f64>> {
        cells
            .into_iter()
            .map(|cell| self.connectivity[cell].centroid(&self.vertices))
            .collect()
    }
}
