use crate::microstructure::Microstructure;
use std::sync::Arc;

/// A named microstructure, and whether the grains are taken from mesh tags.
#[derive(Debug, Clone)]
pub struct PolycrystalInput {
    name: String,
    microstructure: Arc<dyn Microstructure>,
    use_mesh_tags: bool,
}

impl PolycrystalInput {
    pub fn new(name: impl Into<String>, microstructure: impl Microstructure + 'static) -> Self {
        Self {
            name: name.into(),
            microstructure: Arc::new(microstructure),
            use_mesh_tags: false,
        }
    }

    /// Assigns grains from the cell tags of the mesh instead of evaluating the microstructure.
    pub fn with_mesh_tags(self) -> Self {
        Self {
            use_mesh_tags: true,
            ..self
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn microstructure(&self) -> &dyn Microstructure {
        self.microstructure.as_ref()
    }

    pub fn use_mesh_tags(&self) -> bool {
        self.use_mesh_tags
    }
}
