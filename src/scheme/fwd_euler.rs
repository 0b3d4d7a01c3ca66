use crate::bc::BoundaryCond;
use crate::error::Result;
use crate::problem::ProblemData;
use crate::scheme::{check_poisson_len, Scheme, SchemeContext, StepCoefficients, StepSizes};
use crate::solution::Solution;

/// Explicit first-order scheme
///
/// Relaxation is evaluated at σ^n and the velocity solve returns v^{n+1}
/// directly, so only the latest committed level is read.
#[derive(Debug, Default)]
pub struct FwdEuler {
    context: Option<SchemeContext>,
}

impl FwdEuler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Scheme for FwdEuler {
    fn name(&self) -> &'static str {
        "FwdEuler"
    }

    fn order(&self) -> usize {
        1
    }

    fn required_levels(&self) -> usize {
        1
    }

    fn reinit(&mut self, pd: &ProblemData) {
        self.context = Some(SchemeContext::new(pd));
    }

    fn context(&self) -> Option<&SchemeContext> {
        self.context.as_ref()
    }

    fn coefficients(&self, steps: &StepSizes) -> Result<StepCoefficients> {
        Ok(StepCoefficients::forward_euler(steps.dt))
    }

    fn handle_poisson_soln(&self, soln: &mut Solution, poisson_result: &[f64]) -> Result<()> {
        check_poisson_len(soln, poisson_result)?;
        soln.poisson_soln.copy_from_slice(poisson_result);
        soln.current.vel.copy_from_slice(poisson_result);
        Ok(())
    }

    fn handle_bc(&self, bc: &dyn BoundaryCond, _steps: &StepSizes) -> Result<Box<dyn BoundaryCond>> {
        Ok(bc.box_clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bc::ConstantBc;
    use crate::error::ViscoError;
    use nalgebra::Point2;

    #[test]
    fn test_factor_is_dt() {
        let scheme = FwdEuler::new();
        for dt in [1e-3, 0.5, 3.15e7] {
            let steps = StepSizes::new(dt, Some(2.0 * dt));
            assert_eq!(scheme.poisson_rhs_factor(&steps).unwrap(), dt);
            assert_eq!(scheme.poisson_rhs_factor(&StepSizes::new(dt, None)).unwrap(), dt);
        }
    }

    #[test]
    fn test_factories_need_reinit() {
        let scheme = FwdEuler::new();
        assert!(matches!(
            scheme.tentative_step_factory(),
            Err(ViscoError::NotInitialized { .. })
        ));
        assert!(scheme.correction_step_factory().is_err());
        assert_eq!(scheme.generation(), None);
    }

    #[test]
    fn test_handle_bc_copies() {
        let scheme = FwdEuler::new();
        let mut bc = ConstantBc::new(2.0);
        bc.set_t(5.0);
        let handled = scheme.handle_bc(&bc, &StepSizes::new(1.0, None)).unwrap();
        assert_eq!(handled.time(), 5.0);
        assert_eq!(handled.value(&Point2::origin()), 2.0);
    }
}
