//! Basic procedural mesh generation routines.
use crate::connectivity::{Hex8Connectivity, Tet4Connectivity};
use crate::error::{Error, Result};
use crate::mesh::Mesh;
use crate::Extents;
use nalgebra::{Matrix3, Point3};

/// Vertices and hexahedral cells of a uniform grid over `extents`.
fn box_grid(extents: &Extents, divisions: [usize; 3]) -> Result<(Vec<Point3<f64>>, Vec<Hex8Connectivity>)> {
    if divisions.iter().any(|&n| n == 0) {
        return Err(Error::InvalidInput(format!(
            "box divisions must be positive, got {divisions:?}"
        )));
    }
    if extents.iter().any(|[min, max]| !(min < max)) {
        return Err(Error::InvalidInput(format!("box extents must satisfy min < max, got {extents:?}")));
    }

    let [nx, ny, nz] = divisions;
    let num_vertices_x = nx + 1;
    let num_vertices_y = ny + 1;
    let num_vertices_z = nz + 1;

    let coord = |axis: usize, i: usize| {
        let [min, max] = extents[axis];
        // Hit the upper extent exactly, so that flat boundary predicates are exact
        if i == divisions[axis] {
            max
        } else {
            min + (max - min) * (i as f64) / (divisions[axis] as f64)
        }
    };

    let mut vertices = Vec::with_capacity(num_vertices_x * num_vertices_y * num_vertices_z);
    for k in 0..num_vertices_z {
        for j in 0..num_vertices_y {
            for i in 0..num_vertices_x {
                vertices.push(Point3::new(coord(0, i), coord(1, j), coord(2, k)));
            }
        }
    }

    let to_global_vertex_index =
        |i: usize, j: usize, k: usize| (num_vertices_x * num_vertices_y) * k + (num_vertices_x) * j + i;

    let mut cells = Vec::with_capacity(nx * ny * nz);
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                let idx = &to_global_vertex_index;
                cells.push(Hex8Connectivity([
                    idx(i, j, k),
                    idx(i + 1, j, k),
                    idx(i + 1, j + 1, k),
                    idx(i, j + 1, k),
                    idx(i, j, k + 1),
                    idx(i + 1, j, k + 1),
                    idx(i + 1, j + 1, k + 1),
                    idx(i, j + 1, k + 1),
                ]));
            }
        }
    }

    Ok((vertices, cells))
}

/// Creates a uniform hexahedral mesh of an axis-aligned box.
pub fn create_box_hex_mesh(extents: &Extents, divisions: [usize; 3]) -> Result<Mesh<Hex8Connectivity>> {
    let (vertices, cells) = box_grid(extents, divisions)?;
    Mesh::from_vertices_and_connectivity(vertices, cells)
}

/// Creates a tetrahedral mesh of an axis-aligned box by splitting each cell of a uniform grid
/// into six tetrahedra.
///
/// All six tetrahedra of a grid cell share the diagonal from its lowest to its highest corner,
/// which makes the split conforming across neighboring cells. Every tetrahedron is positively
/// oriented.
pub fn create_box_tet_mesh(extents: &Extents, divisions: [usize; 3]) -> Result<Mesh<Tet4Connectivity>> {
    let (vertices, hexes) = box_grid(extents, divisions)?;

    // Monotone paths from local vertex 0 to local vertex 6, one per axis permutation
    const KUHN_TETS: [[usize; 4]; 6] = [
        [0, 1, 2, 6],
        [0, 1, 5, 6],
        [0, 3, 2, 6],
        [0, 3, 7, 6],
        [0, 4, 5, 6],
        [0, 4, 7, 6],
    ];

    let mut tets = Vec::with_capacity(6 * hexes.len());
    for hex in &hexes {
        for local in KUHN_TETS {
            let mut tet = local.map(|l| hex.0[l]);
            if signed_volume_6(&vertices, &tet) < 0.0 {
                tet.swap(2, 3);
            }
            tets.push(Tet4Connectivity(tet));
        }
    }

    Mesh::from_vertices_and_connectivity(vertices, tets)
}

fn signed_volume_6(vertices: &[Point3<f64>], tet: &[usize; 4]) -> f64 {
    let a = vertices[tet[0]];
    let edges = Matrix3::from_columns(&[
        vertices[tet[1]] - a,
        vertices[tet[2]] - a,
        vertices[tet[3]] - a,
    ]);
    edges.determinant()
}
