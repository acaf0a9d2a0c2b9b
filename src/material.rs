//! Crystal material models.
//!
//! All tensors are expressed in the crystal frame. Each process consumes one capability
//! trait: [`ElasticMaterial`] for linear elasticity, [`ThermalMaterial`] for heat transfer and
//! [`SlipMaterial`] for slip hardening.
use crate::error::{Error, Result};
use crate::tensor::sym;
use nalgebra::{Matrix3, Matrix6, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// A material with a crystal-frame Mandel stiffness.
pub trait ElasticMaterial: Debug + Send + Sync {
    /// Crystal-frame 6×6 stiffness in the Mandel convention.
    fn stiffness(&self) -> &Matrix6<f64>;

    /// Crystal-frame coefficient of thermal expansion.
    fn cte(&self) -> Matrix3<f64> {
        Matrix3::zeros()
    }
}

/// A material with a crystal-frame conductivity.
pub trait ThermalMaterial: Debug + Send + Sync {
    fn conductivity(&self) -> &Matrix3<f64>;
}

/// A material with rate-form state evolution driven by crystal-frame stress.
pub trait SlipMaterial: Debug + Send + Sync {
    fn num_state_variables(&self) -> usize;

    /// Writes the time derivative of `state` under the crystal-frame stress `stress_c`
    /// into `derivative`.
    ///
    /// # Panics
    ///
    /// May panic if `state` or `derivative` do not have length
    /// [`num_state_variables`](Self::num_state_variables).
    fn state_derivative(&self, stress_c: &Matrix3<f64>, state: &[f64], derivative: &mut [f64]);
}

/// Linear elastic single crystal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElasticCrystal {
    stiffness: Matrix6<f64>,
    cte: Matrix3<f64>,
}

impl ElasticCrystal {
    /// Constructs a crystal from a Mandel stiffness matrix, which must be symmetric.
    pub fn from_mandel(stiffness: Matrix6<f64>) -> Result<Self> {
        let asymmetry = (stiffness - stiffness.transpose()).norm();
        if asymmetry > 1e-12 * stiffness.norm().max(1.0) {
            return Err(Error::InvalidInput("stiffness matrix must be symmetric".to_string()));
        }
        Ok(Self {
            stiffness,
            cte: Matrix3::zeros(),
        })
    }

    /// Isotropic crystal with bulk modulus `k` and shear modulus `g`.
    pub fn isotropic(k: f64, g: f64) -> Self {
        Self::cubic(k, g, g)
    }

    /// Cubic crystal with bulk modulus `k` and the two shear moduli `gd` (deviatoric
    /// diagonal) and `gs` (shear).
    ///
    /// In Mandel form the stiffness has `c11 = k + 4gd/3`, `c12 = k - 2gd/3` in the upper left
    /// block and `2gs` on the lower right diagonal.
    pub fn cubic(k: f64, gd: f64, gs: f64) -> Self {
        let c11 = k + 4.0 * gd / 3.0;
        let c12 = k - 2.0 * gd / 3.0;
        let mut stiffness = Matrix6::zeros();
        for i in 0..3 {
            for j in 0..3 {
                stiffness[(i, j)] = if i == j { c11 } else { c12 };
            }
            stiffness[(i + 3, i + 3)] = 2.0 * gs;
        }
        Self {
            stiffness,
            cte: Matrix3::zeros(),
        }
    }

    /// Isotropic crystal from Young's modulus and Poisson's ratio.
    pub fn from_young_poisson(young: f64, poisson: f64) -> Result<Self> {
        if young <= 0.0 || poisson <= -1.0 || poisson >= 0.5 {
            return Err(Error::InvalidInput(format!(
                "invalid Young's modulus {young} or Poisson's ratio {poisson}"
            )));
        }
        let k = young / (3.0 * (1.0 - 2.0 * poisson));
        let g = young / (2.0 * (1.0 + poisson));
        Ok(Self::isotropic(k, g))
    }

    /// Sets an isotropic coefficient of thermal expansion.
    pub fn with_linear_cte(self, alpha: f64) -> Self {
        self.with_cte(Matrix3::from_diagonal_element(alpha))
    }

    pub fn with_cte(self, cte: Matrix3<f64>) -> Self {
        Self { cte: sym(&cte), ..self }
    }
}

impl ElasticMaterial for ElasticCrystal {
    fn stiffness(&self) -> &Matrix6<f64> {
        &self.stiffness
    }

    fn cte(&self) -> Matrix3<f64> {
        self.cte
    }
}

/// Heat conducting single crystal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermalCrystal {
    conductivity: Matrix3<f64>,
}

impl ThermalCrystal {
    /// Constructs a crystal from a symmetric positive definite conductivity.
    pub fn from_conductivity(conductivity: Matrix3<f64>) -> Result<Self> {
        if (conductivity - conductivity.transpose()).norm() > 1e-12 * conductivity.norm().max(1.0) {
            return Err(Error::InvalidInput("conductivity must be symmetric".to_string()));
        }
        if conductivity.cholesky().is_none() {
            return Err(Error::InvalidInput("conductivity must be positive definite".to_string()));
        }
        Ok(Self { conductivity })
    }

    pub fn isotropic(k: f64) -> Result<Self> {
        Self::from_conductivity(Matrix3::from_diagonal_element(k))
    }

    /// Conductivity `diag(k0, k1, k2)` along the crystal axes.
    pub fn orthotropic(k: [f64; 3]) -> Result<Self> {
        Self::from_conductivity(Matrix3::from_diagonal(&Vector3::from(k)))
    }
}

impl ThermalMaterial for ThermalCrystal {
    fn conductivity(&self) -> &Matrix3<f64> {
        &self.conductivity
    }
}

/// FCC crystal with a single isotropic slip system strength as state.
///
/// Each of the twelve `{111}<110>` systems slips at the power-law rate
/// `γ̇ = γ̇₀ |τ / s|^m`, with `τ` the resolved shear stress. The strength evolves by
/// Voce-type hardening `ṡ = h₀ (1 - s / s_sat) Σ |γ̇|`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlipCrystal {
    reference_rate: f64,
    rate_exponent: f64,
    hardening_modulus: f64,
    saturation_strength: f64,
    #[serde(skip, default = "fcc_schmid_tensors")]
    schmid_tensors: Vec<Matrix3<f64>>,
}

impl SlipCrystal {
    pub fn fcc(
        reference_rate: f64,
        rate_exponent: f64,
        hardening_modulus: f64,
        saturation_strength: f64,
    ) -> Result<Self> {
        if reference_rate < 0.0 || rate_exponent < 1.0 || saturation_strength <= 0.0 {
            return Err(Error::InvalidInput(
                "slip parameters require a non-negative rate, exponent >= 1 and positive saturation".to_string(),
            ));
        }
        Ok(Self {
            reference_rate,
            rate_exponent,
            hardening_modulus,
            saturation_strength,
            schmid_tensors: fcc_schmid_tensors(),
        })
    }

    pub fn num_slip_systems(&self) -> usize {
        self.schmid_tensors.len()
    }

    /// Resolved shear stresses on all slip systems.
    pub fn resolved_shear_stresses(&self, stress_c: &Matrix3<f64>) -> Vec<f64> {
        self.schmid_tensors
            .iter()
            .map(|p| p.component_mul(stress_c).sum())
            .collect()
    }
}

impl SlipMaterial for SlipCrystal {
    fn num_state_variables(&self) -> usize {
        1
    }

    fn state_derivative(&self, stress_c: &Matrix3<f64>, state: &[f64], derivative: &mut [f64]) {
        assert_eq!(state.len(), 1);
        assert_eq!(derivative.len(), 1);
        let strength = state[0];
        if strength <= 0.0 {
            derivative[0] = 0.0;
            return;
        }
        let total_rate: f64 = self
            .resolved_shear_stresses(stress_c)
            .into_iter()
            .map(|tau| self.reference_rate * (tau / strength).abs().powf(self.rate_exponent))
            .sum();
        derivative[0] = self.hardening_modulus * (1.0 - strength / self.saturation_strength) * total_rate;
    }
}

/// Symmetrized Schmid tensors `sym(d ⊗ n)` of the twelve FCC slip systems.
fn fcc_schmid_tensors() -> Vec<Matrix3<f64>> {
    #[rustfmt::skip]
    let systems: [([f64; 3], [f64; 3]); 12] = [
        ([1.0, 1.0, 1.0], [0.0, 1.0, -1.0]),
        ([1.0, 1.0, 1.0], [-1.0, 0.0, 1.0]),
        ([1.0, 1.0, 1.0], [1.0, -1.0, 0.0]),
        ([-1.0, 1.0, 1.0], [0.0, 1.0, -1.0]),
        ([-1.0, 1.0, 1.0], [1.0, 0.0, 1.0]),
        ([-1.0, 1.0, 1.0], [1.0, 1.0, 0.0]),
        ([1.0, -1.0, 1.0], [0.0, 1.0, 1.0]),
        ([1.0, -1.0, 1.0], [1.0, 0.0, -1.0]),
        ([1.0, -1.0, 1.0], [1.0, 1.0, 0.0]),
        ([1.0, 1.0, -1.0], [0.0, 1.0, 1.0]),
        ([1.0, 1.0, -1.0], [1.0, 0.0, 1.0]),
        ([1.0, 1.0, -1.0], [1.0, -1.0, 0.0]),
    ];
    systems
        .iter()
        .map(|(n, d)| {
            let n = Vector3::from(*n).normalize();
            let d = Vector3::from(*d).normalize();
            sym(&(d * n.transpose()))
        })
        .collect()
}
