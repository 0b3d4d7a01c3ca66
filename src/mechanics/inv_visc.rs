//! Inverse-viscosity fields
//!
//! The relaxation term of the Maxwell law, `μ g(x, σ) σ_c`, is evaluated at
//! quadrature points through the [`InvViscosity`] trait. Models may depend on
//! position only (layered media) or also on the local stress state
//! (power-law creep).

use nalgebra::Point2;

/// Stress state at a point: [Szx, Szy]
pub type StressState = [f64; 2];

/// Spatially and stress dependent inverse viscosity g = 1/η (1/(Pa·s))
pub trait InvViscosity: Send + Sync {
    /// g at a point for a given stress state
    fn value(&self, p: &Point2<f64>, stress: &StressState) -> f64;

    /// ∂g/∂σ_c at a point
    ///
    /// Zero for models that do not depend on stress.
    fn strs_deriv(&self, _p: &Point2<f64>, _stress: &StressState, _component: usize) -> f64 {
        0.0
    }

    /// Short name used in log output
    fn name(&self) -> &str;
}

/// Uniform Newtonian medium
#[derive(Debug, Clone, Copy)]
pub struct ConstantInvViscosity {
    inv_viscosity: f64,
}

impl ConstantInvViscosity {
    /// # Arguments
    /// * `viscosity` - η (Pa·s); `f64::INFINITY` gives a purely elastic medium
    ///
    /// # Panics
    /// Panics if η ≤ 0
    pub fn new(viscosity: f64) -> Self {
        assert!(viscosity > 0.0, "Viscosity must be positive");
        Self {
            inv_viscosity: 1.0 / viscosity,
        }
    }

    /// Build directly from g; g = 0 switches relaxation off
    pub fn from_inverse(inv_viscosity: f64) -> Self {
        assert!(inv_viscosity >= 0.0, "Inverse viscosity must be non-negative");
        Self { inv_viscosity }
    }
}

impl InvViscosity for ConstantInvViscosity {
    fn value(&self, _p: &Point2<f64>, _stress: &StressState) -> f64 {
        self.inv_viscosity
    }

    fn name(&self) -> &str {
        "constant"
    }
}

/// Elastic layer over a Maxwell half-space
///
/// Matches the two-layer analytic model: g = 0 for depths above the layer
/// thickness (the fault locking depth), g = 1/η below it. Depth is measured
/// along +y from the surface.
#[derive(Debug, Clone, Copy)]
pub struct InvViscosityTla {
    layer_depth: f64,
    inv_viscosity: f64,
}

impl InvViscosityTla {
    /// # Arguments
    /// * `layer_depth` - Thickness of the elastic layer (m)
    /// * `viscosity` - Half-space viscosity η (Pa·s)
    pub fn new(layer_depth: f64, viscosity: f64) -> Self {
        assert!(layer_depth >= 0.0, "Layer depth must be non-negative");
        assert!(viscosity > 0.0, "Viscosity must be positive");
        Self {
            layer_depth,
            inv_viscosity: 1.0 / viscosity,
        }
    }

    pub fn layer_depth(&self) -> f64 {
        self.layer_depth
    }
}

impl InvViscosity for InvViscosityTla {
    fn value(&self, p: &Point2<f64>, _stress: &StressState) -> f64 {
        if p.y < self.layer_depth {
            0.0
        } else {
            self.inv_viscosity
        }
    }

    fn name(&self) -> &str {
        "two-layer"
    }
}

/// Power-law creep: g = A |σ|^(n-1)
///
/// |σ| is the magnitude of the antiplane shear traction vector (Szx, Szy).
#[derive(Debug, Clone, Copy)]
pub struct PowerLawInvViscosity {
    /// Pre-factor A (Pa^-n s^-1)
    pub prefactor: f64,
    /// Stress exponent n (1 recovers a Newtonian medium)
    pub exponent: f64,
}

impl PowerLawInvViscosity {
    pub fn new(prefactor: f64, exponent: f64) -> Self {
        assert!(prefactor >= 0.0, "Power-law prefactor must be non-negative");
        assert!(exponent >= 1.0, "Stress exponent must be at least 1");
        Self { prefactor, exponent }
    }

    fn magnitude(stress: &StressState) -> f64 {
        (stress[0] * stress[0] + stress[1] * stress[1]).sqrt()
    }
}

impl InvViscosity for PowerLawInvViscosity {
    fn value(&self, _p: &Point2<f64>, stress: &StressState) -> f64 {
        if self.exponent == 1.0 {
            return self.prefactor;
        }
        self.prefactor * Self::magnitude(stress).powf(self.exponent - 1.0)
    }

    /// ∂g/∂σ_c = A (n-1) |σ|^(n-3) σ_c, taken as 0 at zero stress
    fn strs_deriv(&self, _p: &Point2<f64>, stress: &StressState, component: usize) -> f64 {
        let s = Self::magnitude(stress);
        if self.exponent == 1.0 || s == 0.0 {
            return 0.0;
        }
        self.prefactor * (self.exponent - 1.0) * s.powf(self.exponent - 3.0) * stress[component]
    }

    fn name(&self) -> &str {
        "power-law"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_constant() {
        let g = ConstantInvViscosity::new(1e19);
        let p = Point2::new(0.0, 5.0);
        assert_relative_eq!(g.value(&p, &[1.0, 2.0]), 1e-19);
        assert_eq!(g.strs_deriv(&p, &[1.0, 2.0], 0), 0.0);
    }

    #[test]
    fn test_two_layer_switches_at_depth() {
        let g = InvViscosityTla::new(10e3, 1e19);
        assert_eq!(g.value(&Point2::new(0.0, 9.9e3), &[0.0; 2]), 0.0);
        assert_relative_eq!(g.value(&Point2::new(0.0, 10e3), &[0.0; 2]), 1e-19);
    }

    #[test]
    fn test_power_law_derivative_matches_finite_difference() {
        let g = PowerLawInvViscosity::new(2e-20, 3.0);
        let p = Point2::origin();
        let s = [1.5e6, -0.7e6];
        let h = 1.0;
        for c in 0..2 {
            let mut plus = s;
            let mut minus = s;
            plus[c] += h;
            minus[c] -= h;
            let fd = (g.value(&p, &plus) - g.value(&p, &minus)) / (2.0 * h);
            assert_relative_eq!(g.strs_deriv(&p, &s, c), fd, max_relative = 1e-6);
        }
    }

    #[test]
    fn test_power_law_linear_limit() {
        let g = PowerLawInvViscosity::new(3e-19, 1.0);
        assert_relative_eq!(g.value(&Point2::origin(), &[0.0, 0.0]), 3e-19);
        assert_eq!(g.strs_deriv(&Point2::origin(), &[1.0, 0.0], 0), 0.0);
    }
}
