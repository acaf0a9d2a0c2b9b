use crate::error::{Error, Result};

/// Named list of materials, one per phase.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialInput<M> {
    name: String,
    materials: Vec<M>,
}

impl<M> MaterialInput<M> {
    pub fn new(name: impl Into<String>, materials: Vec<M>) -> Result<Self> {
        let name = name.into();
        if materials.is_empty() {
            return Err(Error::InvalidInput(format!("material input \"{name}\" has no materials")));
        }
        Ok(Self { name, materials })
    }

    /// A material input with a single phase.
    pub fn single(name: impl Into<String>, material: M) -> Self {
        Self {
            name: name.into(),
            materials: vec![material],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Materials indexed by phase.
    pub fn materials(&self) -> &[M] {
        &self.materials
    }
}
