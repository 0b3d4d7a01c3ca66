//! Two-phase stress update
//!
//! Each time step updates every stress component twice:
//!
//! 1. `tentative_step`: history and relaxation, written to
//!    `Solution::tent_strs`;
//! 2. `correction_step`: adds the gradient of the velocity-solve result,
//!    written to `Solution::current`.
//!
//! Both reduce to [`Stress::generic_step`]: apply the operator matrix-free and
//! project with a mass-matrix CG solve. Components are independent within a
//! phase and run in parallel.

pub mod stress_op;

use log::{debug, warn};
use rayon::prelude::*;

use crate::error::{Result, ViscoError};
use crate::fem::{Constraints, MatrixFree};
use crate::linalg::{ConjugateGradient, JacobiPreconditioner, Solver};
use crate::problem::ProblemData;
use crate::scheme::{Scheme, StepCoefficients, StepPhase};
use crate::solution::{Solution, StepState};
use crate::DIM;

pub use stress_op::{MassOperator, StressOp};

/// Mesh-dependent data rebuilt by `reinit`
struct StressContext {
    generation: u64,
    mf: MatrixFree,
    constraints: Constraints,
    mass_precond: JacobiPreconditioner,
    solver: ConjugateGradient,
}

#[derive(Default)]
pub struct Stress {
    context: Option<StressContext>,
}

impl Stress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild constraints and the matrix-free context for the current mesh
    ///
    /// The stress space carries no constraints on a conforming mesh. The
    /// empty set is still applied around every operator evaluation.
    pub fn reinit(&mut self, pd: &ProblemData) {
        let mf = MatrixFree::new(pd.dofs());
        let constraints = Constraints::new(pd.n_dofs());
        let mass_precond =
            JacobiPreconditioner::from_diagonal(MassOperator::new(&mf, &constraints).diagonal());
        let solver = ConjugateGradient::new()
            .with_tolerance(pd.solver().stress_tolerance)
            .with_max_iterations(pd.solver().stress_max_iterations);

        debug!(
            "Stress reinit: {} DOFs, generation {}",
            pd.n_dofs(),
            pd.generation()
        );
        self.context = Some(StressContext {
            generation: pd.generation(),
            mf,
            constraints,
            mass_precond,
            solver,
        });
    }

    pub fn is_initialized(&self) -> bool {
        self.context.is_some()
    }

    pub fn matrix_free(&self) -> Result<&MatrixFree> {
        Ok(&self.context()?.mf)
    }

    fn context(&self) -> Result<&StressContext> {
        self.context
            .as_ref()
            .ok_or(ViscoError::NotInitialized { component: "Stress" })
    }

    /// Context checked against the solution and scheme bindings
    fn checked_context(&self, soln: &Solution, scheme: &dyn Scheme) -> Result<&StressContext> {
        let ctx = self.context()?;
        let scheme_generation = scheme
            .generation()
            .ok_or(ViscoError::NotInitialized { component: "Scheme" })?;
        for (component, found) in [("Solution", soln.generation()), ("Scheme", scheme_generation)] {
            if found != ctx.generation {
                return Err(ViscoError::StaleContext {
                    component,
                    expected: ctx.generation,
                    found,
                });
            }
        }
        Ok(ctx)
    }

    /// First phase: σ* for every component into `soln.tent_strs`
    pub fn tentative_step(&self, soln: &mut Solution, scheme: &dyn Scheme) -> Result<()> {
        self.checked_context(soln, scheme)?;
        if soln.state() != StepState::Started {
            return Err(ViscoError::StepOrder(format!(
                "tentative step requires a started step, solution is {:?}",
                soln.state()
            )));
        }

        let coeffs = scheme.coefficients(&soln.step_sizes()?)?;
        soln.require_levels(scheme.name(), coeffs.required_levels())?;
        if coeffs.order < scheme.order() {
            warn!(
                "{}: order-{} step at t = {:.6e} (not enough history)",
                scheme.name(),
                coeffs.order,
                soln.time()
            );
        }

        let factory = scheme.tentative_step_factory()?;
        let results = self.run_phase(&coeffs, StepPhase::Tentative, |c| {
            let op = factory.create(c, StepPhase::Tentative, &coeffs)?;
            let input = soln.level(0).map(|l| l.strs[c].as_slice()).unwrap_or(&[]);
            let mut out = Vec::new();
            self.generic_step(input, &mut out, soln, c, &op)?;
            Ok(out)
        })?;

        soln.tent_strs = results;
        soln.advance(StepState::Started, StepState::Tentative)
    }

    /// Second phase: add the velocity gradient to σ*
    ///
    /// Must follow the velocity solve of the same step.
    pub fn correction_step(&self, soln: &mut Solution, scheme: &dyn Scheme) -> Result<()> {
        self.checked_context(soln, scheme)?;
        if soln.state() != StepState::VelocitySolved {
            return Err(ViscoError::StepOrder(format!(
                "correction step requires a solved velocity, solution is {:?}",
                soln.state()
            )));
        }

        let coeffs = scheme.coefficients(&soln.step_sizes()?)?;
        let factory = scheme.correction_step_factory()?;
        let results = self.run_phase(&coeffs, StepPhase::Correction, |c| {
            let op = factory.create(c, StepPhase::Correction, &coeffs)?;
            let mut out = Vec::new();
            self.generic_step(&soln.tent_strs[c], &mut out, soln, c, &op)?;
            Ok(out)
        })?;

        soln.current.strs = results;
        soln.advance(StepState::VelocitySolved, StepState::Corrected)
    }

    fn run_phase<F>(
        &self,
        coeffs: &StepCoefficients,
        phase: StepPhase,
        per_component: F,
    ) -> Result<[Vec<f64>; DIM]>
    where
        F: Fn(usize) -> Result<Vec<f64>> + Send + Sync,
    {
        debug!("{:?} stress phase, κ = {:.6e}", phase, coeffs.kappa);
        let outputs: Vec<Vec<f64>> = (0..DIM)
            .into_par_iter()
            .map(per_component)
            .collect::<Result<Vec<_>>>()?;
        let [szx, szy]: [Vec<f64>; DIM] = outputs.try_into().map_err(|v: Vec<Vec<f64>>| {
            ViscoError::DimensionMismatch {
                what: "stress components",
                expected: DIM,
                found: v.len(),
            }
        })?;
        Ok([szx, szy])
    }

    /// Apply `op` to `input` and project: solve `M output = op(input)`
    ///
    /// `soln` supplies the other fields the operator reads. Non-convergence
    /// of the mass solve is returned as an error without retry.
    pub fn generic_step(
        &self,
        input: &[f64],
        output: &mut Vec<f64>,
        soln: &Solution,
        component: usize,
        op: &StressOp,
    ) -> Result<()> {
        let ctx = self.context()?;
        if op.component() != component {
            return Err(ViscoError::InvalidComponent(component));
        }

        let mut src = input.to_vec();
        ctx.constraints.distribute(&mut src);
        let mut rhs = op.apply(&ctx.mf, soln, &src)?;
        ctx.constraints.set_zero(&mut rhs);

        let mass = MassOperator::new(&ctx.mf, &ctx.constraints);
        let (mut x, stats) = ctx
            .solver
            .solve_with_operator(&mass, &rhs, &ctx.mass_precond);
        stats.check(&format!("{:?} stress component {}", op.phase(), component))?;
        debug!(
            "{:?} σ_{}: {} CG iterations, residual {:.3e}",
            op.phase(),
            component,
            stats.iterations,
            stats.relative_residual
        );

        ctx.constraints.distribute(&mut x);
        *output = x;
        Ok(())
    }
}
