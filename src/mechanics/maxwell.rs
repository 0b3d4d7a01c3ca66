/// Linear Maxwell material for antiplane shear
///
/// Elastic shear modulus μ in series with a Newtonian dashpot η.
///
/// # References
/// - Nur & Mavko (1974), "Postseismic viscoelastic rebound"
#[derive(Debug, Clone, Copy)]
pub struct MaxwellMaterial {
    /// μ (Pa)
    pub shear_modulus: f64,
    /// η (Pa·s)
    pub viscosity: f64,
}

impl MaxwellMaterial {
    /// # Panics
    /// Panics if μ ≤ 0 or η ≤ 0
    pub fn new(shear_modulus: f64, viscosity: f64) -> Self {
        assert!(shear_modulus > 0.0, "Shear modulus must be positive");
        assert!(viscosity > 0.0, "Viscosity must be positive");
        Self { shear_modulus, viscosity }
    }

    /// Maxwell relaxation time τ_M = η/μ (s)
    pub fn relaxation_time(&self) -> f64 {
        self.viscosity / self.shear_modulus
    }

    /// Relaxation time of the two-layer image solution, 2η/μ
    pub fn two_layer_relaxation_time(&self) -> f64 {
        2.0 * self.relaxation_time()
    }

    pub fn inv_viscosity(&self) -> f64 {
        1.0 / self.viscosity
    }
}
