//! Distribution of cells over ranks and partitioning of owned cells into grains.
use crate::comm::ExecutionContext;
use crate::element::CellConnectivity;
use crate::error::{Error, Result};
use crate::mesh::Mesh;
use crate::microstructure::Microstructure;
use log::debug;
use std::ops::Range;

/// Grain ID of every owned cell, indexed by local cell.
pub type CellTags = Vec<usize>;

/// Contiguous block distribution of the global cells over the ranks of a group.
///
/// The first `num_cells % size` ranks own one cell more than the others.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellDistribution {
    num_global_cells: usize,
    size: usize,
    owned: Range<usize>,
}

impl CellDistribution {
    pub fn new(num_global_cells: usize, rank: usize, size: usize) -> Self {
        assert!(rank < size, "rank {rank} out of range for group of size {size}");
        Self {
            num_global_cells,
            size,
            owned: block_range(num_global_cells, rank, size),
        }
    }

    pub fn from_context(ctx: &ExecutionContext, num_global_cells: usize) -> Self {
        Self::new(num_global_cells, ctx.rank(), ctx.size())
    }

    pub fn num_global_cells(&self) -> usize {
        self.num_global_cells
    }

    pub fn num_owned_cells(&self) -> usize {
        self.owned.len()
    }

    /// Global indices of the owned cells.
    pub fn owned_cells(&self) -> Range<usize> {
        self.owned.clone()
    }

    pub fn is_owned(&self, global_cell: usize) -> bool {
        self.owned.contains(&global_cell)
    }

    pub fn global_cell(&self, local_cell: usize) -> usize {
        self.owned.start + local_cell
    }

    pub fn local_cell(&self, global_cell: usize) -> Option<usize> {
        self.is_owned(global_cell)
            .then(|| global_cell - self.owned.start)
    }

    /// The rank owning the given global cell.
    pub fn owner_of(&self, global_cell: usize) -> usize {
        (0..self.size)
            .find(|&rank| block_range(self.num_global_cells, rank, self.size).contains(&global_cell))
            .unwrap_or(self.size - 1)
    }
}

fn block_range(num: usize, rank: usize, size: usize) -> Range<usize> {
    let base = num / size;
    let remainder = num % size;
    let start = rank * base + rank.min(remainder);
    let len = base + usize::from(rank < remainder);
    start..start + len
}

/// Determines the grain of every owned cell.
///
/// With `use_mesh_tags`, the grain IDs are taken from `mesh_tags` (indexed by global cell).
/// Otherwise the microstructure is evaluated at the owned cell centroids.
pub fn assign_grains<C: CellConnectivity>(
    mesh: &Mesh<C>,
    distribution: &CellDistribution,
    microstructure: &dyn Microstructure,
    use_mesh_tags: bool,
    mesh_tags: Option<&[usize]>,
) -> Result<CellTags> {
    if distribution.num_global_cells() != mesh.num_cells() {
        return Err(Error::Mesh(format!(
            "cell distribution covers {} cells, but the mesh has {}",
            distribution.num_global_cells(),
            mesh.num_cells()
        )));
    }

    let tags = if use_mesh_tags {
        let mesh_tags = mesh_tags.ok_or_else(|| {
            Error::InvalidInput("polycrystal requests mesh tags, but the mesh does not carry any".to_string())
        })?;
        if mesh_tags.len() != mesh.num_cells() {
            return Err(Error::Mesh(format!(
                "mesh has {} cells, but {} cell tags",
                mesh.num_cells(),
                mesh_tags.len()
            )));
        }
        mesh_tags[distribution.owned_cells()].to_vec()
    } else {
        let centroids = mesh.cell_centroids(distribution.owned_cells());
        microstructure.grain_of(&centroids)
    };

    let num_grains = microstructure.num_grains();
    if let Some(&grain) = tags.iter().find(|&&grain| grain >= num_grains) {
        return Err(Error::GrainIdOutOfRange { grain, num_grains });
    }
    debug!(
        "Assigned {} owned cells to grains (mesh tags: {})",
        tags.len(),
        use_mesh_tags
    );
    Ok(tags)
}

/// The owned cells of every grain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrainCells {
    cells: Vec<Vec<usize>>,
}

impl GrainCells {
    pub fn num_grains(&self) -> usize {
        self.cells.len()
    }

    /// Sorted local cell indices of the given grain. Empty if the grain owns no local cells.
    pub fn cells(&self, grain: usize) -> &[usize] {
        &self.cells[grain]
    }

    /// Total number of local cells over all grains.
    pub fn num_cells(&self) -> usize {
        self.cells.iter().map(Vec::len).sum()
    }

    /// Iterates over `(grain, cells)` in grain ID order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[usize])> {
        self.cells
            .iter()
            .enumerate()
            .map(|(grain, cells)| (grain, cells.as_slice()))
    }

    /// The grain of every local cell.
    pub fn cell_tags(&self) -> CellTags {
        let mut tags = vec![0; self.num_cells()];
        for (grain, cells) in self.iter() {
            for &cell in cells {
                tags[cell] = grain;
            }
        }
        tags
    }
}

/// Groups local cells by grain. Every local cell appears in exactly one grain.
pub fn partition(cell_tags: &[usize], num_grains: usize) -> Result<GrainCells> {
    let mut cells = vec![Vec::new(); num_grains];
    for (cell, &grain) in cell_tags.iter().enumerate() {
        cells
            .get_mut(grain)
            .ok_or(Error::GrainIdOutOfRange { grain, num_grains })?
            .push(cell);
    }
    Ok(GrainCells { cells })
}
