use crate::connectivity::{Hex8Connectivity, Tet4Connectivity};
use crate::mesh::Mesh;
use eyre::{eyre, Context};
use log::{debug, warn};
use std::collections::HashMap;
use std::path::Path;

/// A mesh loaded from a Gmsh file, along with per-cell grain tags if the file assigns
/// physical groups to its volumes.
#[derive(Debug, Clone)]
pub struct MshMesh<C> {
    pub mesh: Mesh<C>,
    /// Grain ID of every cell, derived from the physical tag of the owning volume entity
    /// as `physical_tag - 1`.
    pub cell_tags: Option<Vec<usize>>,
}

/// Loads a [`Mesh`] from a Gmsh MSH file at the given path.
pub fn load_msh_from_file<C, P: AsRef<Path>>(file_path: P) -> eyre::Result<MshMesh<C>>
where
    C: MshConnectivity,
{
    let msh_bytes = std::fs::read(file_path).wrap_err("failed to read file")?;
    load_msh_from_bytes(&msh_bytes).wrap_err("failed to load mesh from msh file")
}

/// Loads a [`Mesh`] by parsing the given bytes as a Gmsh MSH file.
pub fn load_msh_from_bytes<C>(bytes: &[u8]) -> eyre::Result<MshMesh<C>>
where
    C: MshConnectivity,
{
    let mut msh_file = mshio::parse_msh_bytes(bytes).map_err(|e| eyre!("failed to parse msh file: {}", e))?;

    let msh_nodes = msh_file
        .data
        .nodes
        .take()
        .ok_or(eyre!("MSH file does not contain nodes"))?;
    let msh_elements = msh_file
        .data
        .elements
        .take()
        .ok_or(eyre!("MSH file does not contain elements"))?;

    // Volume entity tag -> first physical tag
    let volume_physical_tags: HashMap<i32, i32> = msh_file
        .data
        .entities
        .as_ref()
        .map(|entities| {
            entities
                .volumes
                .iter()
                .filter_map(|volume| volume.physical_tags.first().map(|&tag| (volume.tag, tag)))
                .collect()
        })
        .unwrap_or_default();

    let mut vertices = Vec::new();
    for node_block in &msh_nodes.node_blocks {
        // Ensure that node tags are consecutive
        if node_block.node_tags.is_some() {
            return Err(eyre!("node block tags are not consecutive in msh file"));
        }
        vertices.extend(
            node_block
                .nodes
                .iter()
                .map(|node| nalgebra::Point3::new(node.x, node.y, node.z)),
        );
    }

    let mut connectivity = Vec::new();
    let mut cell_tags = Vec::new();
    let mut all_cells_tagged = true;
    for element_block in &msh_elements.element_blocks {
        if element_block.element_type != C::msh_element_type() || element_block.entity_dim != 3 {
            // Just ignore blocks that don't match the requested connectivity
            debug!(
                "skipping msh element block of type {:?} (dim {})",
                element_block.element_type, element_block.entity_dim
            );
            continue;
        }
        if element_block.element_tags.is_some() {
            return Err(eyre!("element block tags are not consecutive in msh file"));
        }

        let grain = match volume_physical_tags.get(&element_block.entity_tag) {
            Some(&physical_tag) if physical_tag >= 1 => Some((physical_tag - 1) as usize),
            Some(&physical_tag) => {
                return Err(eyre!("physical tag {} cannot be mapped to a grain ID", physical_tag));
            }
            None => None,
        };
        if grain.is_none() {
            all_cells_tagged = false;
        }

        for element in &element_block.elements {
            connectivity.push(C::try_connectivity_from_msh_element(element)?);
            cell_tags.push(grain.unwrap_or(0));
        }
    }

    if connectivity.is_empty() {
        return Err(eyre!(
            "MSH file does not contain an element block of the requested type ({:?})",
            C::msh_element_type()
        ));
    }

    if !all_cells_tagged {
        warn!("Not all volumes in the msh file carry physical tags. Cell tags are unavailable.");
    }

    let mesh = Mesh::from_vertices_and_connectivity(vertices, connectivity)?;
    Ok(MshMesh {
        mesh,
        cell_tags: all_cells_tagged.then_some(cell_tags),
    })
}

/// Allows conversion from `mshio::Element`s to connectivity types.
pub trait MshConnectivity: crate::element::CellConnectivity {
    /// Returns the MSH element type corresponding to this connectivity.
    fn msh_element_type() -> mshio::ElementType;

    /// Tries to construct the element connectivity from the given MSH element.
    fn try_connectivity_from_msh_element(element: &mshio::Element<u64>) -> eyre::Result<Self>;
}

/// Converts 1-based MSH node tags to 0-based vertex indices.
fn vertex_indices_from_msh_element<const N: usize>(element: &mshio::Element<u64>) -> eyre::Result<[usize; N]> {
    if element.nodes.len() < N {
        return Err(eyre!("not enough nodes to initialize connectivity"));
    }
    let mut indices = [0; N];
    for (index, &tag) in indices.iter_mut().zip(&element.nodes) {
        *index = usize::try_from(tag)
            .ok()
            .and_then(|tag| tag.checked_sub(1))
            .ok_or_else(|| eyre!("invalid node tag {} in msh element", tag))?;
    }
    Ok(indices)
}

impl MshConnectivity for Tet4Connectivity {
    fn msh_element_type() -> mshio::ElementType {
        mshio::ElementType::Tet4
    }

    fn try_connectivity_from_msh_element(element: &mshio::Element<u64>) -> eyre::Result<Self> {
        Ok(Self(vertex_indices_from_msh_element(element)?))
    }
}

impl MshConnectivity for Hex8Connectivity {
    fn msh_element_type() -> mshio::ElementType {
        mshio::ElementType::Hex8
    }

    fn try_connectivity_from_msh_element(element: &mshio::Element<u64>) -> eyre::Result<Self> {
        Ok(Self(vertex_indices_from_msh_element(element)?))
    }
}
