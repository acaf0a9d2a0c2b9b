//! Boundary sections and the resolution of essential and natural boundary conditions.
//!
//! A [`BoundarySection`] selects boundary facets by evaluating a predicate at their midpoints.
//! The [`BoundaryMap`] always contains the predefined `"boundary"` section with every boundary
//! facet, and the six flat sections `"xmin"` to `"zmax"` when the domain extents are known.
use crate::element::{CellConnectivity, FaceConnectivity};
use crate::error::{Error, Result};
use crate::function::FunctionInput;
use crate::mesh::{BoundaryFace, Mesh};
use crate::tensor::{sample_stress, traction};
use crate::Extents;
use log::debug;
use nalgebra::{Matrix3, Matrix6, Point3, Vector3};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Name of the section containing the entire domain boundary.
pub const BOUNDARY: &str = "boundary";

type SectionPredicate = dyn Fn(&Point3<f64>) -> bool + Send + Sync;

/// A named selection of boundary facets.
#[derive(Clone)]
pub struct BoundarySection {
    name: String,
    predicate: Arc<SectionPredicate>,
}

impl fmt::Debug for BoundarySection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundarySection")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl BoundarySection {
    pub fn new<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Point3<f64>) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            predicate: Arc::new(predicate),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Evaluates the predicate at a facet midpoint.
    pub fn selects(&self, midpoint: &Point3<f64>) -> bool {
        (self.predicate)(midpoint)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Min,
    Max,
}

/// A plane bounding an axis-aligned box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatBoundary {
    pub axis: usize,
    pub value: f64,
    pub side: Side,
}

impl FlatBoundary {
    pub const TOLERANCE: f64 = 1e-14;

    /// Whether `x` lies on the plane or outside of the box.
    pub fn contains(&self, x: &Point3<f64>) -> bool {
        let sign = match self.side {
            Side::Min => -1.0,
            Side::Max => 1.0,
        };
        (x[self.axis] - self.value) * sign > -Self::TOLERANCE
    }

    pub fn name(&self) -> String {
        let axis = ["x", "y", "z"][self.axis];
        let side = match self.side {
            Side::Min => "min",
            Side::Max => "max",
        };
        format!("{axis}{side}")
    }

    pub fn into_section(self) -> BoundarySection {
        BoundarySection::new(self.name(), move |x| self.contains(x))
    }
}

/// The six sections `xmin`, `xmax`, `ymin`, `ymax`, `zmin`, `zmax` of a box.
pub fn flat_sections(extents: &Extents) -> Vec<BoundarySection> {
    let mut sections = Vec::with_capacity(6);
    for (axis, &[min, max]) in extents.iter().enumerate() {
        for (value, side) in [(min, Side::Min), (max, Side::Max)] {
            sections.push(FlatBoundary { axis, value, side }.into_section());
        }
    }
    sections
}

#[derive(Debug, Clone, PartialEq)]
struct ResolvedSection {
    name: String,
    facets: Vec<usize>,
}

/// Boundary facets of a mesh and the facets selected by each section.
#[derive(Debug, Clone)]
pub struct BoundaryMap<F> {
    facets: Vec<BoundaryFace<F>>,
    sections: Vec<ResolvedSection>,
}

impl<F: FaceConnectivity> BoundaryMap<F> {
    /// Resolves the predefined sections and the given user sections on the boundary of `mesh`.
    ///
    /// Section names must be unique.
    pub fn resolve<C>(mesh: &Mesh<C>, extents: Option<&Extents>, user_sections: &[BoundarySection]) -> Result<Self>
    where
        C: CellConnectivity<Face = F>,
    {
        let facets = mesh.find_boundary_faces();
        let midpoints: Vec<_> = facets
            .iter()
            .map(|facet| facet.connectivity.midpoint(mesh.vertices()))
            .collect();

        let mut sections = vec![ResolvedSection {
            name: BOUNDARY.to_string(),
            facets: (0..facets.len()).collect(),
        }];

        let flat = extents.map(flat_sections).unwrap_or_default();
        for section in flat.iter().chain(user_sections) {
            if sections.iter().any(|s| s.name == section.name()) {
                return Err(Error::InvalidInput(format!(
                    "boundary section \"{}\" is defined more than once",
                    section.name()
                )));
            }
            let selected: Vec<usize> = midpoints
                .iter()
                .enumerate()
                .filter(|(_, x)| section.selects(x))
                .map(|(i, _)| i)
                .collect();
            debug!("Boundary section \"{}\": {} facets", section.name(), selected.len());
            sections.push(ResolvedSection {
                name: section.name().to_string(),
                facets: selected,
            });
        }

        Ok(Self { facets, sections })
    }

    pub fn facets(&self) -> &[BoundaryFace<F>] {
        &self.facets
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.name.as_str())
    }

    /// Sorted indices into [`facets`](Self::facets) of the facets selected by the named section.
    pub fn section(&self, name: &str) -> Result<&[usize]> {
        self.sections
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.facets.as_slice())
            .ok_or_else(|| Error::UnknownBoundarySection(name.to_string()))
    }

    /// Sorted, deduplicated vertex indices of the facets of the named section.
    pub fn section_nodes(&self, name: &str) -> Result<Vec<usize>> {
        let mut nodes: Vec<usize> = self
            .section(name)?
            .iter()
            .flat_map(|&facet| self.facets[facet].connectivity.vertex_indices().to_vec())
            .collect();
        nodes.sort_unstable();
        nodes.dedup();
        Ok(nodes)
    }

    /// Names of all sections with a facet containing `point`.
    pub fn sections_containing(&self, vertices: &[Point3<f64>], point: &Point3<f64>) -> Vec<&str> {
        const CONTAINMENT_TOLERANCE: f64 = 1e-12;
        self.sections
            .iter()
            .filter(|section| {
                section.facets.iter().any(|&facet| {
                    self.facets[facet]
                        .connectivity
                        .contains_point(vertices, point, CONTAINMENT_TOLERANCE)
                })
            })
            .map(|section| section.name.as_str())
            .collect()
    }
}

/// A boundary condition prescribing `value` on a named section.
///
/// With `component`, only that component of a vector unknown is affected.
#[derive(Debug, Clone)]
pub struct BoundaryCondition {
    pub section: String,
    pub value: FunctionInput,
    pub component: Option<usize>,
}

impl BoundaryCondition {
    pub fn new(section: impl Into<String>, value: FunctionInput) -> Self {
        Self {
            section: section.into(),
            value,
            component: None,
        }
    }

    pub fn with_component(self, component: usize) -> Self {
        Self {
            component: Some(component),
            ..self
        }
    }
}

/// Prescribed values of constrained degrees of freedom.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EssentialBcs {
    values: BTreeMap<usize, f64>,
}

impl EssentialBcs {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, dof: usize) -> Option<f64> {
        self.values.get(&dof).copied()
    }

    pub fn contains(&self, dof: usize) -> bool {
        self.values.contains_key(&dof)
    }

    /// Constrained degrees of freedom and their values, in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.values.iter().map(|(&dof, &value)| (dof, value))
    }
}

impl FromIterator<(usize, f64)> for EssentialBcs {
    /// Collects `(dof, value)` pairs. Later duplicates of a DOF are ignored.
    fn from_iter<I: IntoIterator<Item = (usize, f64)>>(iter: I) -> Self {
        let mut values = BTreeMap::new();
        for (dof, value) in iter {
            values.entry(dof).or_insert(value);
        }
        Self { values }
    }
}

/// Resolves essential conditions to constrained degrees of freedom with `num_components` per node.
///
/// When conditions overlap, the first registered condition wins.
pub fn resolve_essential<F: FaceConnectivity>(
    map: &BoundaryMap<F>,
    vertices: &[Point3<f64>],
    conditions: &[BoundaryCondition],
    num_components: usize,
) -> Result<EssentialBcs> {
    let mut bcs = EssentialBcs::default();
    for (index, condition) in conditions.iter().enumerate() {
        let nodes = map.section_nodes(&condition.section)?;
        let components: Vec<usize> = match condition.component {
            Some(c) if c >= num_components => {
                return Err(Error::InvalidInput(format!(
                    "component {c} out of range for {num_components} components"
                )));
            }
            Some(c) => vec![c],
            None => (0..num_components).collect(),
        };
        let function_components = condition.value.num_components();
        let scalar_value = condition.component.is_some() && function_components == Some(1);
        if !scalar_value {
            condition.value.check_components(num_components)?;
        }

        let mut skipped = 0;
        for node in nodes {
            let value = condition.value.evaluate(&vertices[node])?;
            for &c in &components {
                let dof = num_components * node + c;
                let v = if scalar_value { value[0] } else { value[c] };
                if bcs.values.contains_key(&dof) {
                    skipped += 1;
                } else {
                    bcs.values.insert(dof, v);
                }
            }
        }
        if skipped > 0 {
            debug!(
                "Essential condition {index} on \"{}\": {skipped} DOFs already constrained by an earlier condition",
                condition.section
            );
        }
    }
    Ok(bcs)
}

/// A natural condition together with its tag and facet set.
#[derive(Debug, Clone)]
pub struct NaturalBc {
    pub tag: usize,
    /// Indices into the facets of the boundary map.
    pub facets: Vec<usize>,
    pub value: FunctionInput,
}

/// Resolves natural (traction or flux) conditions. Condition `i` gets the tag `i + 1`.
///
/// Conditions acting on a single component of a vector unknown are not supported.
pub fn resolve_natural<F: FaceConnectivity>(
    map: &BoundaryMap<F>,
    conditions: &[BoundaryCondition],
    num_components: usize,
) -> Result<Vec<NaturalBc>> {
    conditions
        .iter()
        .enumerate()
        .map(|(i, condition)| {
            if let Some(c) = condition.component {
                return Err(Error::NotImplemented(format!(
                    "natural condition on component {c} of section \"{}\"",
                    condition.section
                )));
            }
            condition.value.check_components(num_components)?;
            Ok(NaturalBc {
                tag: i + 1,
                facets: map.section(&condition.section)?.to_vec(),
                value: condition.value.clone(),
            })
        })
        .collect()
}

/// Traction on a plane with unit normal `normal` under the uniform displacement gradient `a`.
pub fn uniform_traction(
    a: &Matrix3<f64>,
    orientation: &Matrix3<f64>,
    stiffness_c: &Matrix6<f64>,
    normal: &Vector3<f64>,
) -> Vector3<f64> {
    traction(&sample_stress(a, stiffness_c, orientation), normal)
}

/// Zeroes the components not selected by `mask`.
pub fn retain_components(t: &Vector3<f64>, mask: [bool; 3]) -> Vector3<f64> {
    Vector3::from_fn(|i, _| if mask[i] { t[i] } else { 0.0 })
}
