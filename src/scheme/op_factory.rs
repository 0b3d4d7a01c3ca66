use std::fmt;
use std::sync::Arc;

use crate::error::{Result, ViscoError};
use crate::mechanics::InvViscosity;
use crate::scheme::{StepCoefficients, StepPhase};
use crate::stress::StressOp;
use crate::DIM;

/// Builds stress operators for one phase
///
/// Holds only what is fixed between reinits (phase, μ, the inverse-viscosity
/// handle); step weights arrive with each `create` call. Safe to share
/// across threads and to call concurrently for different components.
#[derive(Clone)]
pub struct OpFactory {
    phase: StepPhase,
    shear_modulus: f64,
    inv_visc: Arc<dyn InvViscosity>,
}

impl OpFactory {
    pub fn new(phase: StepPhase, shear_modulus: f64, inv_visc: Arc<dyn InvViscosity>) -> Self {
        Self {
            phase,
            shear_modulus,
            inv_visc,
        }
    }

    pub fn phase(&self) -> StepPhase {
        self.phase
    }

    pub fn shear_modulus(&self) -> f64 {
        self.shear_modulus
    }

    /// Fresh operator for one stress component
    ///
    /// # Arguments
    /// * `component` - 0 for Szx, 1 for Szy
    /// * `phase` - Must match the phase this factory was built for
    /// * `coefficients` - Weights of the step being taken
    pub fn create(&self, component: usize, phase: StepPhase, coefficients: &StepCoefficients) -> Result<StressOp> {
        if component >= DIM {
            return Err(ViscoError::InvalidComponent(component));
        }
        if phase != self.phase {
            return Err(ViscoError::PhaseMismatch {
                expected: self.phase,
                requested: phase,
            });
        }
        Ok(StressOp::new(
            component,
            phase,
            *coefficients,
            self.shear_modulus,
            self.inv_visc.clone(),
        ))
    }
}

impl fmt::Debug for OpFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpFactory")
            .field("phase", &self.phase)
            .field("shear_modulus", &self.shear_modulus)
            .field("inv_visc", &self.inv_visc.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mechanics::ConstantInvViscosity;

    fn factory() -> OpFactory {
        OpFactory::new(StepPhase::Tentative, 3e10, Arc::new(ConstantInvViscosity::new(1e19)))
    }

    #[test]
    fn test_create_binds_component_and_phase() {
        let coeffs = StepCoefficients::forward_euler(1.0);
        let op = factory().create(1, StepPhase::Tentative, &coeffs).unwrap();
        assert_eq!(op.component(), 1);
        assert_eq!(op.phase(), StepPhase::Tentative);
        assert_eq!(op.coefficients(), &coeffs);
    }

    #[test]
    fn test_rejects_bad_requests() {
        let coeffs = StepCoefficients::forward_euler(1.0);
        assert!(matches!(
            factory().create(2, StepPhase::Tentative, &coeffs),
            Err(ViscoError::InvalidComponent(2))
        ));
        assert!(matches!(
            factory().create(0, StepPhase::Correction, &coeffs),
            Err(ViscoError::PhaseMismatch { .. })
        ));
    }
}
