use crate::boundary::BoundaryCondition;
use crate::error::{Error, Result};
use crate::function::FunctionInput;
use nalgebra::Matrix3;

/// Loading of a linear elasticity problem.
///
/// The plastic distortion is a sample-frame tensor field, the thermal expansion a crystal-frame
/// expansion strain such as `ΔT·cte`. Tensor functions have nine row-major components.
#[derive(Debug, Clone)]
pub struct ElasticDeformationInput {
    pub name: String,
    pub force_density: Option<FunctionInput>,
    pub plastic_distortion: Option<FunctionInput>,
    pub thermal_expansion: Option<FunctionInput>,
    pub displacement_bcs: Vec<BoundaryCondition>,
    pub traction_bcs: Vec<BoundaryCondition>,
}

impl ElasticDeformationInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            force_density: None,
            plastic_distortion: None,
            thermal_expansion: None,
            displacement_bcs: Vec::new(),
            traction_bcs: Vec::new(),
        }
    }

    pub fn with_force_density(self, force_density: FunctionInput) -> Self {
        Self {
            force_density: Some(force_density),
            ..self
        }
    }

    pub fn with_plastic_distortion(self, plastic_distortion: FunctionInput) -> Self {
        Self {
            plastic_distortion: Some(plastic_distortion),
            ..self
        }
    }

    pub fn with_thermal_expansion(self, thermal_expansion: FunctionInput) -> Self {
        Self {
            thermal_expansion: Some(thermal_expansion),
            ..self
        }
    }

    pub fn with_displacement_bc(mut self, bc: BoundaryCondition) -> Self {
        self.displacement_bcs.push(bc);
        self
    }

    pub fn with_traction_bc(mut self, bc: BoundaryCondition) -> Self {
        self.traction_bcs.push(bc);
        self
    }
}

/// Loading of a heat transfer problem.
#[derive(Debug, Clone)]
pub struct HeatDeformationInput {
    pub name: String,
    pub body_heat: Option<FunctionInput>,
    pub temperature_bcs: Vec<BoundaryCondition>,
    pub flux_bcs: Vec<BoundaryCondition>,
}

impl HeatDeformationInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body_heat: None,
            temperature_bcs: Vec::new(),
            flux_bcs: Vec::new(),
        }
    }

    pub fn with_body_heat(self, body_heat: FunctionInput) -> Self {
        Self {
            body_heat: Some(body_heat),
            ..self
        }
    }

    pub fn with_temperature_bc(mut self, bc: BoundaryCondition) -> Self {
        self.temperature_bcs.push(bc);
        self
    }

    pub fn with_flux_bc(mut self, bc: BoundaryCondition) -> Self {
        self.flux_bcs.push(bc);
        self
    }
}

/// A stress-controlled slip hardening history.
///
/// The initial state and the stresses are functions of the position, evaluated at the cell
/// centroids. The stresses are given in the sample frame and rotated into the frame of the grain
/// owning each cell.
#[derive(Debug, Clone)]
pub struct SlipDeformationInput {
    name: String,
    s0: FunctionInput,
    stress_0: FunctionInput,
    stress_t: FunctionInput,
    dt: f64,
    nsteps: usize,
}

impl SlipDeformationInput {
    /// `s0` is the initial state, either one value per state variable or a single value used
    /// for all of them. The stresses are tensor functions.
    pub fn new(
        name: impl Into<String>,
        s0: FunctionInput,
        stress_0: FunctionInput,
        stress_t: FunctionInput,
        dt: f64,
        nsteps: usize,
    ) -> Result<Self> {
        let name = name.into();
        if nsteps == 0 {
            return Err(Error::InvalidInput(format!("slip deformation \"{name}\": nsteps must be positive")));
        }
        if !(dt > 0.0 && dt.is_finite()) {
            return Err(Error::InvalidInput(format!(
                "slip deformation \"{name}\": dt must be positive, got {dt}"
            )));
        }
        if s0.num_components() == Some(0) {
            return Err(Error::MissingField {
                record: "slip deformation",
                field: "s0",
            });
        }
        stress_0.check_components(9)?;
        stress_t.check_components(9)?;
        Ok(Self {
            name,
            s0,
            stress_0,
            stress_t,
            dt,
            nsteps,
        })
    }

    /// A history that is the same in every cell.
    pub fn uniform(
        name: impl Into<String>,
        s0: &[f64],
        stress_0: &Matrix3<f64>,
        stress_t: &Matrix3<f64>,
        dt: f64,
        nsteps: usize,
    ) -> Result<Self> {
        Self::new(
            name,
            FunctionInput::constant(s0),
            FunctionInput::constant_tensor(stress_0),
            FunctionInput::constant_tensor(stress_t),
            dt,
            nsteps,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn s0(&self) -> &FunctionInput {
        &self.s0
    }

    /// Expands initial state values evaluated at one point to `num_state_variables` values.
    pub fn initial_state(&self, values: &[f64], num_state_variables: usize) -> Result<Vec<f64>> {
        match values.len() {
            1 => Ok(vec![values[0]; num_state_variables]),
            n if n == num_state_variables => Ok(values.to_vec()),
            n => Err(Error::InvalidInput(format!(
                "slip deformation \"{}\": expected 1 or {num_state_variables} initial state values, got {n}",
                self.name
            ))),
        }
    }

    pub fn stress_0(&self) -> &FunctionInput {
        &self.stress_0
    }

    pub fn stress_t(&self) -> &FunctionInput {
        &self.stress_t
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn nsteps(&self) -> usize {
        self.nsteps
    }
}
