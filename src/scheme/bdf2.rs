use log::debug;

use crate::bc::BoundaryCond;
use crate::error::{Result, ViscoError};
use crate::problem::ProblemData;
use crate::scheme::{
    check_poisson_len, BootstrapPolicy, Scheme, SchemeContext, StepCoefficients, StepSizes,
};
use crate::solution::Solution;

/// Variable-step second-order backward differences
///
/// The velocity solve returns v^{n+1} itself, so boundary data pass through
/// unchanged. Only the stress history and the relaxation term (IMEX,
/// extrapolated stress) reach back to level n-1.
#[derive(Debug, Default)]
pub struct Bdf2 {
    context: Option<SchemeContext>,
    bootstrap: BootstrapPolicy,
}

impl Bdf2 {
    pub fn new(bootstrap: BootstrapPolicy) -> Self {
        Self {
            context: None,
            bootstrap,
        }
    }

    pub fn bootstrap(&self) -> BootstrapPolicy {
        self.bootstrap
    }
}

impl Scheme for Bdf2 {
    fn name(&self) -> &'static str {
        "BDF2"
    }

    fn order(&self) -> usize {
        2
    }

    fn required_levels(&self) -> usize {
        2
    }

    fn reinit(&mut self, pd: &ProblemData) {
        self.context = Some(SchemeContext::new(pd));
    }

    fn context(&self) -> Option<&SchemeContext> {
        self.context.as_ref()
    }

    fn coefficients(&self, steps: &StepSizes) -> Result<StepCoefficients> {
        match (steps.dt_prev, self.bootstrap) {
            (Some(dt_prev), _) => Ok(StepCoefficients::bdf2(steps.dt, dt_prev)),
            (None, BootstrapPolicy::FirstOrder) => {
                debug!("BDF2 without step history: first-order start");
                Ok(StepCoefficients::forward_euler(steps.dt))
            }
            (None, BootstrapPolicy::Reject) => Err(ViscoError::InsufficientHistory {
                scheme: self.name(),
                required: 2,
                available: 1,
            }),
        }
    }

    fn handle_poisson_soln(&self, soln: &mut Solution, poisson_result: &[f64]) -> Result<()> {
        check_poisson_len(soln, poisson_result)?;
        let coeffs = self.coefficients(&soln.step_sizes()?)?;
        soln.require_levels(self.name(), coeffs.required_levels())?;

        soln.poisson_soln.copy_from_slice(poisson_result);
        soln.current.vel.copy_from_slice(poisson_result);
        Ok(())
    }

    /// Same data as `bc`; fails like every other phase when the step
    /// history does not satisfy the bootstrap policy
    fn handle_bc(&self, bc: &dyn BoundaryCond, steps: &StepSizes) -> Result<Box<dyn BoundaryCond>> {
        self.coefficients(steps)?;
        Ok(bc.box_clone())
    }
}
