use std::time::Instant;

use super::preconditioner::Preconditioner;
use super::solver::{LinearOperator, Solver, SolverStats, SolverUtils};

/// Preconditioned Conjugate Gradient for symmetric positive definite systems
///
/// Used both for the matrix-free stress mass systems and for the assembled
/// velocity stiffness system.
#[derive(Debug, Clone)]
pub struct ConjugateGradient {
    max_iterations: usize,
    tolerance: f64,
}

impl Default for ConjugateGradient {
    fn default() -> Self {
        Self::new()
    }
}

impl ConjugateGradient {
    pub fn new() -> Self {
        Self {
            max_iterations: 1000,
            tolerance: 1e-10,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Relative tolerance ||r|| <= tol ||b||
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

impl Solver for ConjugateGradient {
    /// Solve starting from x = 0
    ///
    /// A right-hand side with vanishing norm returns the zero vector at once.
    fn solve_with_operator<O, P>(&self, a: &O, b: &[f64], precond: &P) -> (Vec<f64>, SolverStats)
    where
        O: LinearOperator,
        P: Preconditioner,
    {
        let n = b.len();
        let start = Instant::now();
        let b_norm = SolverUtils::norm(b);

        if b_norm < 1e-300 {
            return (
                vec![0.0; n],
                SolverStats {
                    converged: true,
                    solve_time: start.elapsed().as_secs_f64(),
                    ..SolverStats::new()
                },
            );
        }

        let mut x = vec![0.0; n];
        let mut r = b.to_vec();

        let mut z = precond.apply(&r);
        let mut p = z.clone();
        let mut rz = SolverUtils::dot(&r, &z);

        let mut iteration = 0;
        let mut converged = false;
        let mut final_res = b_norm;

        while iteration < self.max_iterations {
            let ap = a.apply(&p);
            let p_ap = SolverUtils::dot(&p, &ap);

            if p_ap.abs() < 1e-300 {
                break;
            }
            let alpha = rz / p_ap;

            for i in 0..n {
                x[i] += alpha * p[i];
                r[i] -= alpha * ap[i];
            }
            iteration += 1;

            let r_norm = SolverUtils::norm(&r);
            final_res = r_norm;
            if r_norm <= self.tolerance * b_norm {
                converged = true;
                break;
            }

            z = precond.apply(&r);
            let rz_new = SolverUtils::dot(&r, &z);
            let beta = rz_new / rz;
            rz = rz_new;

            for i in 0..n {
                p[i] = z[i] + beta * p[i];
            }
        }

        (
            x,
            SolverStats {
                iterations: iteration,
                residual_norm: final_res,
                relative_residual: final_res / b_norm,
                converged,
                solve_time: start.elapsed().as_secs_f64(),
            },
        )
    }
}
