use crate::connectivity::{Connectivity, Hex8Connectivity, Tet4Connectivity};
use crate::mesh::Mesh;
use eyre::{eyre, Context};
use nalgebra::{Matrix3, Vector3};
use std::path::Path;
use vtkio::model::{
    Attribute, Attributes, ByteOrder, CellType, Cells, DataArray, DataSet, ElementType, IOBuffer, Piece,
    UnstructuredGridPiece, Version, VertexNumbers, Vtk,
};

/// Represents connectivity that is supported by VTK.
pub trait VtkCellConnectivity: Connectivity {
    fn num_nodes(&self) -> usize {
        self.vertex_indices().len()
    }

    fn cell_type(&self) -> CellType;

    /// Write connectivity in VTK node order.
    ///
    /// Panics if `connectivity.len() != self.num_nodes()`.
    fn write_vtk_connectivity(&self, connectivity: &mut [usize]) {
        assert_eq!(connectivity.len(), self.vertex_indices().len());
        connectivity.clone_from_slice(self.vertex_indices());
    }
}

impl VtkCellConnectivity for Tet4Connectivity {
    fn cell_type(&self) -> CellType {
        CellType::Tetra
    }
}

impl VtkCellConnectivity for Hex8Connectivity {
    fn cell_type(&self) -> CellType {
        CellType::Hexahedron
    }
}

/// Builds an unstructured grid data set from a mesh together with point and cell attributes.
pub struct FiniteElementMeshDataSetBuilder<'a, C> {
    mesh: &'a Mesh<C>,
    // Only used for exporting directly to file
    title: Option<String>,
    point_attributes: Vec<Attribute>,
    cell_attributes: Vec<Attribute>,
}

impl<'a, C> FiniteElementMeshDataSetBuilder<'a, C> {
    pub fn from_mesh(mesh: &'a Mesh<C>) -> Self {
        Self {
            mesh,
            title: None,
            point_attributes: Vec::new(),
            cell_attributes: Vec::new(),
        }
    }

    pub fn with_title(self, title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..self
        }
    }

    /// Adds a point attribute with `num_comp` scalar components per vertex.
    pub fn with_point_scalar_attributes(
        mut self,
        name: impl Into<String>,
        num_comp: usize,
        values: Vec<f64>,
    ) -> eyre::Result<Self> {
        let expected = num_comp * self.mesh.num_vertices();
        check_len(&values, expected)?;
        self.point_attributes.push(scalars(name, num_comp, values)?);
        Ok(self)
    }

    pub fn with_point_vector_attributes(mut self, name: impl Into<String>, values: &[Vector3<f64>]) -> eyre::Result<Self> {
        check_len(values, self.mesh.num_vertices())?;
        self.point_attributes.push(vectors(name, values));
        Ok(self)
    }

    /// Adds a cell attribute with `num_comp` scalar components per cell.
    pub fn with_cell_scalar_attributes(
        mut self,
        name: impl Into<String>,
        num_comp: usize,
        values: Vec<f64>,
    ) -> eyre::Result<Self> {
        let expected = num_comp * self.mesh.num_cells();
        check_len(&values, expected)?;
        self.cell_attributes.push(scalars(name, num_comp, values)?);
        Ok(self)
    }

    pub fn with_cell_vector_attributes(mut self, name: impl Into<String>, values: &[Vector3<f64>]) -> eyre::Result<Self> {
        check_len(values, self.mesh.num_cells())?;
        self.cell_attributes.push(vectors(name, values));
        Ok(self)
    }

    pub fn with_cell_tensor_attributes(mut self, name: impl Into<String>, values: &[Matrix3<f64>]) -> eyre::Result<Self> {
        check_len(values, self.mesh.num_cells())?;
        // Tensors are written row by row
        let data: Vec<f64> = values
            .iter()
            .flat_map(|m| m.transpose().as_slice().to_vec())
            .collect();
        self.cell_attributes.push(Attribute::DataArray(DataArray {
            name: name.into(),
            elem: ElementType::Tensors,
            data: IOBuffer::F64(data),
        }));
        Ok(self)
    }

    /// Adds an integer cell attribute, such as grain IDs.
    pub fn with_cell_index_attributes(mut self, name: impl Into<String>, values: &[usize]) -> eyre::Result<Self> {
        check_len(values, self.mesh.num_cells())?;
        let data = values
            .iter()
            .map(|&v| i32::try_from(v))
            .collect::<Result<Vec<_>, _>>()
            .wrap_err("cell index does not fit into VTK integer type")?;
        self.cell_attributes.push(Attribute::DataArray(DataArray {
            name: name.into(),
            elem: ElementType::Scalars {
                num_comp: 1,
                lookup_table: None,
            },
            data: IOBuffer::I32(data),
        }));
        Ok(self)
    }
}

impl<'a, C> FiniteElementMeshDataSetBuilder<'a, C>
where
    C: VtkCellConnectivity,
{
    pub fn try_build(&self) -> eyre::Result<DataSet> {
        let points: Vec<f64> = self
            .mesh
            .vertices()
            .iter()
            .flat_map(|v| v.coords.iter().copied())
            .collect();

        // Vertices is laid out as follows: N, i_1, i_2, ... i_N,
        // so for e.g. hexahedra this becomes 8 followed by the eight indices making up the cell
        let mut vertices = Vec::new();
        let mut cell_types = Vec::new();
        let mut vertex_indices = Vec::new();
        for cell in self.mesh.connectivity() {
            vertices.push(u32::try_from(cell.num_nodes())?);

            vertex_indices.clear();
            vertex_indices.resize(cell.num_nodes(), 0);
            cell.write_vtk_connectivity(&mut vertex_indices);

            for &idx in &vertex_indices {
                vertices.push(u32::try_from(idx)?);
            }
            cell_types.push(cell.cell_type());
        }

        let piece = UnstructuredGridPiece {
            points: points.into(),
            cells: Cells {
                cell_verts: VertexNumbers::Legacy {
                    num_cells: u32::try_from(self.mesh.num_cells())?,
                    vertices,
                },
                types: cell_types,
            },
            data: Attributes {
                point: self.point_attributes.clone(),
                cell: self.cell_attributes.clone(),
            },
        };

        Ok(DataSet::UnstructuredGrid {
            meta: None,
            pieces: vec![Piece::Inline(Box::new(piece))],
        })
    }

    /// Convenience function for directly exporting the dataset to a legacy VTK file.
    pub fn try_export(&self, filename: impl AsRef<Path>) -> eyre::Result<()> {
        let filepath = filename.as_ref();
        let fallback_title = filepath
            .file_stem()
            .map(|os_str| os_str.to_string_lossy().to_string())
            .unwrap_or_else(|| "untitled".to_string());
        let dataset = self.try_build()?;
        Vtk {
            version: Version { major: 4, minor: 1 },
            // If we don't have a title then just make the filepath the title
            title: self.title.clone().unwrap_or(fallback_title),
            byte_order: ByteOrder::BigEndian,
            data: dataset,
            file_path: None,
        }
        .export(filepath)
        .map_err(|e| eyre!("failed to export VTK file {}: {}", filepath.display(), e))?;
        Ok(())
    }
}

fn check_len<V>(values: &[V], expected: usize) -> eyre::Result<()> {
    if values.len() != expected {
        return Err(eyre!(
            "attribute has {} entries, but the mesh requires {}",
            values.len(),
            expected
        ));
    }
    Ok(())
}

fn scalars(name: impl Into<String>, num_comp: usize, values: Vec<f64>) -> eyre::Result<Attribute> {
    Ok(Attribute::DataArray(DataArray {
        name: name.into(),
        elem: ElementType::Scalars {
            num_comp: u32::try_from(num_comp)?,
            lookup_table: None,
        },
        data: IOBuffer::F64(values),
    }))
}

fn vectors(name: impl Into<String>, values: &[Vector3<f64>]) -> Attribute {
    Attribute::DataArray(DataArray {
        name: name.into(),
        elem: ElementType::Vectors,
        data: IOBuffer::F64(values.iter().flat_map(|v| v.iter().copied()).collect()),
    })
}
