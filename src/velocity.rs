//! Velocity solve
//!
//! Equilibrium of the corrected stress `σ* + κ μ ∇w` gives, for the unknown
//! `w`,
//!
//! ```text
//! ∫ μ ∇w·∇φ = -(1/κ) ∫ σ*·∇φ + ∫ r·∇φ
//! ```
//!
//! with `r` from `Scheme::rhs_grad_terms`, prescribed `w` on the Dirichlet
//! sides and the traction-free condition on the remaining sides built in.
//! The scheme stores `w` as the new velocity.

use log::debug;
use nalgebra::{Point2, Vector2};
use sprs::CsMat;

use crate::bc::BoundaryCond;
use crate::error::{Result, ViscoError};
use crate::fem::{Assembler, Constraints, FeCell, MatrixFree};
use crate::linalg::{ConjugateGradient, JacobiPreconditioner, Solver};
use crate::problem::ProblemData;
use crate::scheme::Scheme;
use crate::solution::{Solution, StepState};

/// Mesh-dependent data rebuilt by `reinit`
struct VelocityContext {
    generation: u64,
    mf: MatrixFree,
    /// K = ∫ μ ∇φ_i·∇φ_j before elimination
    stiffness: CsMat<f64>,
    /// K with Dirichlet rows and columns eliminated
    condensed: CsMat<f64>,
    precond: JacobiPreconditioner,
    constraints: Constraints,
    /// Support points of the constrained DOFs, in `constrained_dofs` order
    boundary_points: Vec<(usize, Point2<f64>)>,
    solver: ConjugateGradient,
}

#[derive(Default)]
pub struct Velocity {
    context: Option<VelocityContext>,
}

impl Velocity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble the stiffness matrix and Dirichlet pattern for the current mesh
    #[allow(non_snake_case)]
    pub fn reinit(&mut self, pd: &ProblemData) {
        let mf = MatrixFree::new(pd.dofs());
        let K = Assembler::assemble_stiffness_parallel(&mf, pd.shear_modulus());

        let mut constraints = Constraints::new(pd.n_dofs());
        for &side in pd.dirichlet_sides() {
            for dof in pd.dofs().boundary_dofs(side) {
                constraints.set_dirichlet(dof, 0.0);
            }
        }
        let boundary_points = constraints
            .constrained_dofs()
            .map(|dof| (dof, pd.dofs().support_point(dof)))
            .collect();

        let condensed = constraints.condense_matrix(&K);
        let precond = JacobiPreconditioner::new(&condensed);
        let solver = ConjugateGradient::new()
            .with_tolerance(pd.solver().velocity_tolerance)
            .with_max_iterations(pd.solver().velocity_max_iterations);

        debug!(
            "Velocity reinit: {} DOFs, {} constrained, {} nonzeros",
            pd.n_dofs(),
            constraints.num_constrained(),
            condensed.nnz()
        );
        self.context = Some(VelocityContext {
            generation: pd.generation(),
            mf,
            stiffness: K,
            condensed,
            precond,
            constraints,
            boundary_points,
            solver,
        });
    }

    pub fn is_initialized(&self) -> bool {
        self.context.is_some()
    }

    /// Solve for the velocity of the step in progress
    ///
    /// Requires the tentative stress of the same step. The result is handed
    /// to `scheme.handle_poisson_soln`.
    pub fn step(&self, soln: &mut Solution, scheme: &dyn Scheme, bc: &dyn BoundaryCond) -> Result<()> {
        let ctx = self
            .context
            .as_ref()
            .ok_or(ViscoError::NotInitialized { component: "Velocity" })?;
        if soln.generation() != ctx.generation {
            return Err(ViscoError::StaleContext {
                component: "Velocity",
                expected: ctx.generation,
                found: soln.generation(),
            });
        }
        if soln.state() != StepState::Tentative {
            return Err(ViscoError::StepOrder(format!(
                "velocity solve requires the tentative stress, solution is {:?}",
                soln.state()
            )));
        }

        let steps = soln.step_sizes()?;
        let kappa = scheme.poisson_rhs_factor(&steps)?;
        let mut handled = scheme.handle_bc(bc, &steps)?;
        handled.set_t(soln.time() + steps.dt);

        let mut constraints = ctx.constraints.clone();
        for (dof, p) in &ctx.boundary_points {
            constraints.set_value(*dof, handled.value(p));
        }

        let rhs = {
            let soln: &Solution = soln;
            ctx.mf.cell_loop(|cell: &FeCell<'_>| {
                let nq = cell.n_q_points();
                let szx = cell.values(&soln.tent_strs[0]);
                let szy = cell.values(&soln.tent_strs[1]);
                let mut extra = vec![Vector2::zeros(); nq];
                scheme.rhs_grad_terms(cell, soln, &mut extra);
                let grads: Vec<Vector2<f64>> = (0..nq)
                    .map(|q| Vector2::new(szx[q], szy[q]) * (-1.0 / kappa) + extra[q])
                    .collect();
                cell.integrate_gradients(&grads)
            })
        };

        let f = constraints.condense_rhs(&ctx.stiffness, &rhs);
        let (w, stats) = ctx
            .solver
            .solve_with_operator(&ctx.condensed, &f, &ctx.precond);
        stats.check("velocity")?;
        debug!(
            "Velocity solve: {} CG iterations, residual {:.3e}",
            stats.iterations, stats.relative_residual
        );

        scheme.handle_poisson_soln(soln, &w)?;
        soln.advance(StepState::Tentative, StepState::VelocitySolved)
    }
}
