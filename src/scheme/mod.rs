//! Time integration schemes
//!
//! A [`Scheme`] supplies the step weights that turn one generic stress
//! operator into a Forward Euler or a BDF2 update, the scaling of the
//! velocity right-hand side, and the treatment of boundary data and of the
//! velocity-solve result. Assembly and matrix-free evaluation live in
//! `stress` and `velocity` and are shared by all schemes.
//!
//! Every scheme discretizes, per stress component c,
//!
//! ```text
//! σ^{n+1} = h0 σ^n + h1 σ^{n-1} + κ μ ∂_c v^{n+1} - κ μ g(σ_ext) σ_ext
//! ```
//!
//! where the relaxation term is taken at the extrapolated stress σ_ext and
//! v^{n+1} is the velocity returned by the solve of the same step.

pub mod bdf2;
pub mod fwd_euler;
pub mod op_factory;

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::bc::BoundaryCond;
use crate::config::SchemeKind;
use crate::error::{Result, ViscoError};
use crate::fem::FeCell;
use crate::problem::ProblemData;
use crate::solution::Solution;

pub use bdf2::Bdf2;
pub use fwd_euler::FwdEuler;
pub use op_factory::OpFactory;

/// Phase of the two-phase stress update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepPhase {
    /// Stress from history and relaxation, before the velocity solve
    Tentative,
    /// Velocity-gradient correction, after the velocity solve
    Correction,
}

/// Size of the current step and of the last committed one
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepSizes {
    pub dt: f64,
    pub dt_prev: Option<f64>,
}

impl StepSizes {
    pub fn new(dt: f64, dt_prev: Option<f64>) -> Self {
        Self { dt, dt_prev }
    }
}

/// What a two-level scheme does when only one level exists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BootstrapPolicy {
    /// Take a first-order step with the same operators
    #[default]
    FirstOrder,
    /// Fail with `InsufficientHistory`
    Reject,
}

/// Weights of one step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepCoefficients {
    pub dt: f64,
    /// Scale of the rate terms, also the Poisson right-hand-side factor
    pub kappa: f64,
    /// Weights of σ^n and σ^{n-1}
    pub history: [f64; 2],
    /// Weights of σ^n and σ^{n-1} in the relaxation stress
    pub extrapolation: [f64; 2],
    /// Formal order of accuracy of the step
    pub order: usize,
}

impl StepCoefficients {
    pub fn forward_euler(dt: f64) -> Self {
        Self {
            dt,
            kappa: dt,
            history: [1.0, 0.0],
            extrapolation: [1.0, 0.0],
            order: 1,
        }
    }

    /// Variable-step BDF2 with ω = dt / dt_prev
    pub fn bdf2(dt: f64, dt_prev: f64) -> Self {
        let omega = dt / dt_prev;
        let denom = 1.0 + 2.0 * omega;
        Self {
            dt,
            kappa: dt * (1.0 + omega) / denom,
            history: [(1.0 + omega).powi(2) / denom, -omega * omega / denom],
            extrapolation: [1.0 + omega, -omega],
            order: 2,
        }
    }

    /// Committed levels the weights actually reference
    pub fn required_levels(&self) -> usize {
        if self.history[1] != 0.0 || self.extrapolation[1] != 0.0 {
            2
        } else {
            1
        }
    }
}

/// Mesh binding of a scheme: the mesh generation and both factories
#[derive(Debug, Clone)]
pub struct SchemeContext {
    pub generation: u64,
    pub tentative: OpFactory,
    pub correction: OpFactory,
}

impl SchemeContext {
    pub fn new(pd: &ProblemData) -> Self {
        let mu = pd.shear_modulus();
        let inv_visc = pd.inv_viscosity().clone();
        Self {
            generation: pd.generation(),
            tentative: OpFactory::new(StepPhase::Tentative, mu, inv_visc.clone()),
            correction: OpFactory::new(StepPhase::Correction, mu, inv_visc),
        }
    }
}

/// One time integration method
pub trait Scheme: Send + Sync {
    fn name(&self) -> &'static str;

    /// Formal order once enough history exists
    fn order(&self) -> usize;

    /// Committed levels needed for a full-order step
    fn required_levels(&self) -> usize;

    /// Bind to the current mesh; repeatable
    fn reinit(&mut self, pd: &ProblemData);

    /// Binding made by the last `reinit`
    fn context(&self) -> Option<&SchemeContext>;

    fn generation(&self) -> Option<u64> {
        self.context().map(|ctx| ctx.generation)
    }

    fn tentative_step_factory(&self) -> Result<&OpFactory> {
        self.context()
            .map(|ctx| &ctx.tentative)
            .ok_or(ViscoError::NotInitialized { component: "Scheme" })
    }

    fn correction_step_factory(&self) -> Result<&OpFactory> {
        self.context()
            .map(|ctx| &ctx.correction)
            .ok_or(ViscoError::NotInitialized { component: "Scheme" })
    }

    fn coefficients(&self, steps: &StepSizes) -> Result<StepCoefficients>;

    /// κ in `∫ μ ∇w·∇φ = -(1/κ) ∫ σ*·∇φ`
    fn poisson_rhs_factor(&self, steps: &StepSizes) -> Result<f64> {
        Ok(self.coefficients(steps)?.kappa)
    }

    /// Store the velocity-solve result and form the new velocity
    fn handle_poisson_soln(&self, soln: &mut Solution, poisson_result: &[f64]) -> Result<()>;

    /// Boundary data for the quantity the velocity solve computes
    fn handle_bc(&self, bc: &dyn BoundaryCond, steps: &StepSizes) -> Result<Box<dyn BoundaryCond>>;

    /// Extra gradient term of the velocity right-hand side at each
    /// quadrature point of a cell; zero unless a scheme adds one
    fn rhs_grad_terms(&self, _cell: &FeCell<'_>, _soln: &Solution, retval: &mut [Vector2<f64>]) {
        retval.fill(Vector2::zeros());
    }
}

/// Scheme selected by configuration, not yet bound to a mesh
pub fn build_scheme(kind: SchemeKind, bootstrap: BootstrapPolicy) -> Box<dyn Scheme> {
    match kind {
        SchemeKind::FwdEuler => Box::new(FwdEuler::new()),
        SchemeKind::Bdf2 => Box::new(Bdf2::new(bootstrap)),
    }
}

/// Check a velocity-solve result against the solution size
pub(crate) fn check_poisson_len(soln: &Solution, poisson_result: &[f64]) -> Result<()> {
    if poisson_result.len() != soln.n_dofs() {
        return Err(ViscoError::DimensionMismatch {
            what: "velocity solve result",
            expected: soln.n_dofs(),
            found: poisson_result.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_forward_euler_weights() {
        let c = StepCoefficients::forward_euler(0.3);
        assert_eq!(c.kappa, 0.3);
        assert_eq!(c.required_levels(), 1);
    }

    #[test]
    fn test_equal_steps_bdf2() {
        // ω = 1: (3/2) y^{n+1} - 2 y^n + (1/2) y^{n-1} = dt f
        let c = StepCoefficients::bdf2(1.0, 1.0);
        assert_relative_eq!(c.history[0], 4.0 / 3.0, epsilon = 1e-15);
        assert_relative_eq!(c.history[1], -1.0 / 3.0, epsilon = 1e-15);
        assert_relative_eq!(c.kappa, 2.0 / 3.0, epsilon = 1e-15);
        assert_eq!(c.extrapolation, [2.0, -1.0]);
        assert_eq!(c.required_levels(), 2);
    }

    #[test]
    fn test_bdf2_weights_consistent() {
        // Weights of a constant solution sum to one for any step ratio
        for (dt, dt_prev) in [(1.0, 1.0), (0.5, 2.0), (3.0, 0.7)] {
            let c = StepCoefficients::bdf2(dt, dt_prev);
            assert_relative_eq!(c.history[0] + c.history[1], 1.0, epsilon = 1e-14);
            assert_relative_eq!(c.extrapolation[0] + c.extrapolation[1], 1.0, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_default_rhs_grad_terms_zero() {
        let scheme = FwdEuler::new();
        let mesh = crate::mesh::StructuredMesh::new(0.0, 1.0, 0.0, 1.0, 1, 1, 1);
        let pd = ProblemData::new(
            mesh,
            1.0,
            std::sync::Arc::new(crate::mechanics::ConstantInvViscosity::new(1.0)),
        );
        let soln = Solution::new(&pd);
        let mf = crate::fem::MatrixFree::new(pd.dofs());
        let mut retval = vec![Vector2::new(1.0, 1.0); mf.num_quadrature_points()];
        scheme.rhs_grad_terms(&mf.cell(0), &soln, &mut retval);
        assert!(retval.iter().all(|g| g.norm() == 0.0));
    }
}
