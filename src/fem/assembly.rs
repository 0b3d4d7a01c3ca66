use nalgebra::DMatrix;
use rayon::prelude::*;
use sprs::{CsMat, TriMat};

use crate::fem::{ElementMatrix, FeCell, MatrixFree};

/// Global sparse matrix assembler
///
/// Only the velocity problem assembles a matrix; the stress update is
/// matrix-free. Element matrices are computed in parallel, triplets are
/// merged serially in cell order.
pub struct Assembler;

impl Assembler {
    /// Assemble global stiffness matrix K = Σ_e K_e for a uniform coefficient
    ///
    /// # Arguments
    /// * `mf` - Evaluation context of the current mesh
    /// * `coefficient` - Diffusion coefficient (shear modulus)
    ///
    /// # Returns
    /// Global stiffness matrix in CSR format
    pub fn assemble_stiffness_parallel(mf: &MatrixFree, coefficient: f64) -> CsMat<f64> {
        Self::assemble_parallel(mf, |cell| ElementMatrix::stiffness(cell, coefficient))
    }

    /// Assemble the consistent mass matrix M = Σ_e M_e
    pub fn assemble_mass_parallel(mf: &MatrixFree) -> CsMat<f64> {
        Self::assemble_parallel(mf, ElementMatrix::mass)
    }

    fn assemble_parallel<F>(mf: &MatrixFree, element: F) -> CsMat<f64>
    where
        F: Fn(&FeCell<'_>) -> DMatrix<f64> + Sync,
    {
        let n_dofs = mf.n_dofs();

        // Compute element matrices in parallel
        let element_matrices: Vec<DMatrix<f64>> = (0..mf.num_cells())
            .into_par_iter()
            .map(|c| element(&mf.cell(c)))
            .collect();

        // Sequential assembly of triplets
        let mut triplets = TriMat::new((n_dofs, n_dofs));

        for (c, k_elem) in element_matrices.iter().enumerate() {
            let cell = mf.cell(c);
            let dofs = cell.dofs();
            for (i, &global_i) in dofs.iter().enumerate() {
                for (j, &global_j) in dofs.iter().enumerate() {
                    triplets.add_triplet(global_i, global_j, k_elem[(i, j)]);
                }
            }
        }

        // Duplicate entries are summed by the conversion
        triplets.to_csr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fem::DofHandler;
    use crate::linalg::LinearOperator;
    use crate::mesh::StructuredMesh;
    use approx::assert_relative_eq;

    fn mf() -> (DofHandler, MatrixFree) {
        let mesh = StructuredMesh::new(0.0, 1.0, 0.0, 1.0, 3, 3, 2);
        let dofs = DofHandler::new(&mesh);
        let mf = MatrixFree::new(&dofs);
        (dofs, mf)
    }

    #[test]
    #[allow(non_snake_case)]
    fn test_stiffness_kills_constants() {
        let (dofs, mf) = mf();
        let K = Assembler::assemble_stiffness_parallel(&mf, 2.0);
        assert_eq!(K.rows(), dofs.total_dofs());

        let r = K.apply(&vec![1.0; dofs.total_dofs()]);
        assert!(r.iter().all(|v| v.abs() < 1e-11));
    }

    #[test]
    #[allow(non_snake_case)]
    fn test_stiffness_energy_of_linear_field() {
        // u = x on the unit square: u^T K u = ∫ |∇u|² = 1
        let (dofs, mf) = mf();
        let K = Assembler::assemble_stiffness_parallel(&mf, 1.0);
        let u: Vec<f64> = (0..dofs.total_dofs()).map(|d| dofs.support_point(d).x).collect();
        let ku = K.apply(&u);
        let energy: f64 = u.iter().zip(ku.iter()).map(|(a, b)| a * b).sum();
        assert_relative_eq!(energy, 1.0, epsilon = 1e-12);
    }

    #[test]
    #[allow(non_snake_case)]
    fn test_mass_total() {
        let (dofs, mf) = mf();
        let M = Assembler::assemble_mass_parallel(&mf);
        let ones = vec![1.0; dofs.total_dofs()];
        let total: f64 = M.apply(&ones).iter().sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-12);
    }
}
