use sprs::CsMat;

use crate::error::{Result, ViscoError};

/// Statistics from an iterative solve
#[derive(Debug, Clone, Default)]
pub struct SolverStats {
    /// Number of iterations
    pub iterations: usize,

    /// Final residual norm ||b - Ax||
    pub residual_norm: f64,

    /// Relative residual ||r|| / ||b||
    pub relative_residual: f64,

    pub converged: bool,

    /// Solve time in seconds
    pub solve_time: f64,
}

impl SolverStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Turn a failed solve into an error naming the system
    ///
    /// # Arguments
    /// * `what` - Name of the system, e.g. "stress mass system"
    pub fn check(&self, what: &str) -> Result<()> {
        if self.converged {
            Ok(())
        } else {
            Err(ViscoError::NonConvergence {
                what: what.to_string(),
                iterations: self.iterations,
                residual: self.residual_norm,
            })
        }
    }
}

/// Linear operator A applied to a vector x to get Ax
pub trait LinearOperator {
    /// out = A * v
    fn apply(&self, v: &[f64]) -> Vec<f64>;

    /// out += A * v
    fn apply_add(&self, v: &[f64], out: &mut [f64]) {
        let result = self.apply(v);
        for (o, val) in out.iter_mut().zip(result) {
            *o += val;
        }
    }

    /// Number of rows (output dimension)
    fn rows(&self) -> usize;

    /// Number of columns (input dimension)
    fn cols(&self) -> usize;
}

impl LinearOperator for CsMat<f64> {
    fn apply(&self, v: &[f64]) -> Vec<f64> {
        let mut result = vec![0.0; self.rows()];
        self.apply_add(v, &mut result);
        result
    }

    fn apply_add(&self, v: &[f64], out: &mut [f64]) {
        for (row_idx, row) in self.outer_iterator().enumerate() {
            let mut sum = 0.0;
            for (col_idx, &val) in row.iter() {
                sum += val * v[col_idx];
            }
            out[row_idx] += sum;
        }
    }

    fn rows(&self) -> usize {
        CsMat::rows(self)
    }

    fn cols(&self) -> usize {
        CsMat::cols(self)
    }
}

/// Linear system solver
pub trait Solver {
    /// Solve A x = b for an assembled or matrix-free operator
    ///
    /// # Returns
    /// * Solution vector x (n)
    /// * Solver statistics
    #[allow(non_snake_case)]
    fn solve_with_operator<O, P>(&self, A: &O, b: &[f64], precond: &P) -> (Vec<f64>, SolverStats)
    where
        O: LinearOperator,
        P: crate::linalg::preconditioner::Preconditioner;
}

/// Vector helpers shared by the solvers
pub struct SolverUtils;

impl SolverUtils {
    pub fn norm(v: &[f64]) -> f64 {
        Self::dot(v, v).sqrt()
    }

    pub fn dot(a: &[f64], b: &[f64]) -> f64 {
        a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use sprs::TriMat;

    #[test]
    fn test_norm() {
        assert_relative_eq!(SolverUtils::norm(&[3.0, 4.0]), 5.0, epsilon = 1e-14);
    }

    #[test]
    #[allow(non_snake_case)]
    fn test_csr_apply() {
        // [2 1; 1 2] [1; 1] = [3; 3]
        let mut triplets = TriMat::new((2, 2));
        triplets.add_triplet(0, 0, 2.0);
        triplets.add_triplet(0, 1, 1.0);
        triplets.add_triplet(1, 0, 1.0);
        triplets.add_triplet(1, 1, 2.0);
        let A: CsMat<f64> = triplets.to_csr();

        assert_eq!(A.apply(&[1.0, 1.0]), vec![3.0, 3.0]);
        let mut out = vec![1.0, -1.0];
        A.apply_add(&[1.0, 0.0], &mut out);
        assert_eq!(out, vec![3.0, 0.0]);
    }

    #[test]
    fn test_failed_stats_become_error() {
        let stats = SolverStats {
            iterations: 12,
            residual_norm: 0.5,
            ..SolverStats::new()
        };
        let err = stats.check("velocity system").unwrap_err();
        assert!(matches!(err, ViscoError::NonConvergence { iterations: 12, .. }));
    }
}
