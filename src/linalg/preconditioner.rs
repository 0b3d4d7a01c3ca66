use sprs::CsMat;

/// Approximate inverse used by the iterative solvers
///
/// Solves M z = r approximately (where M ≈ A)
pub trait Preconditioner {
    /// z = M⁻¹ r
    fn apply(&self, r: &[f64]) -> Vec<f64>;
}

/// Jacobi (diagonal) preconditioner
///
/// M = diag(A). For the mass matrices of the stress update this is already
/// a good spectral approximation.
#[derive(Debug, Clone)]
pub struct JacobiPreconditioner {
    /// 1/A_ii, or 1 where the diagonal vanishes
    diag_inv: Vec<f64>,
}

impl JacobiPreconditioner {
    /// Extract the diagonal of an assembled matrix
    #[allow(non_snake_case)]
    pub fn new(A: &CsMat<f64>) -> Self {
        let diagonal = (0..A.rows())
            .map(|i| A.get(i, i).copied().unwrap_or(0.0))
            .collect();
        Self::from_diagonal(diagonal)
    }

    /// Build from a diagonal computed without assembling the matrix
    pub fn from_diagonal(diagonal: Vec<f64>) -> Self {
        let diag_inv = diagonal
            .into_iter()
            .map(|d| if d.abs() > 1e-300 { 1.0 / d } else { 1.0 })
            .collect();
        Self { diag_inv }
    }

}

impl Preconditioner for JacobiPreconditioner {
    fn apply(&self, r: &[f64]) -> Vec<f64> {
        r.iter()
            .zip(self.diag_inv.iter())
            .map(|(&ri, &di)| ri * di)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprs::TriMat;

    #[test]
    #[allow(non_snake_case)]
    fn test_jacobi_inverts_diagonal() {
        let mut tri = TriMat::new((3, 3));
        tri.add_triplet(0, 0, 2.0);
        tri.add_triplet(1, 1, 4.0);
        tri.add_triplet(1, 0, 1.0);
        tri.add_triplet(2, 2, 0.5);
        let A: CsMat<f64> = tri.to_csr();

        let precond = JacobiPreconditioner::new(&A);
        assert_eq!(precond.apply(&[2.0, 2.0, 2.0]), vec![1.0, 0.5, 4.0]);
    }

    #[test]
    fn test_zero_diagonal_falls_back_to_identity() {
        let precond = JacobiPreconditioner::from_diagonal(vec![0.0, 5.0]);
        assert_eq!(precond.apply(&[3.0, 10.0]), vec![3.0, 2.0]);
    }
}
