use nalgebra::DMatrix;

use crate::fem::FeCell;

/// Element matrix computation for tensor-product Lagrange cells
pub struct ElementMatrix;

impl ElementMatrix {
    /// Compute element stiffness matrix for a scalar diffusion operator
    ///
    /// K_e = ∫ (∇N)^T k (∇N) dA
    ///
    /// # Arguments
    /// * `cell` - Cell evaluation view
    /// * `coefficient` - Uniform diffusion coefficient k (shear modulus for
    ///   the antiplane velocity problem)
    ///
    /// # Returns
    /// n×n symmetric element matrix, n = DOFs per cell
    pub fn stiffness(cell: &FeCell<'_>, coefficient: f64) -> DMatrix<f64> {
        let n = cell.n_dofs();
        let mut k_elem = DMatrix::zeros(n, n);

        for q in 0..cell.n_q_points() {
            let w = coefficient * cell.jxw(q);
            let grads: Vec<_> = (0..n).map(|i| cell.shape_grad(i, q)).collect();
            for i in 0..n {
                for j in 0..n {
                    k_elem[(i, j)] += w * grads[i].dot(&grads[j]);
                }
            }
        }

        k_elem
    }

    /// Compute consistent element mass matrix
    ///
    /// M_e = ∫ N^T N dA
    pub fn mass(cell: &FeCell<'_>) -> DMatrix<f64> {
        let n = cell.n_dofs();
        let mut m_elem = DMatrix::zeros(n, n);

        for q in 0..cell.n_q_points() {
            let w = cell.jxw(q);
            for i in 0..n {
                let ni = cell.shape_value(i, q);
                for j in 0..n {
                    m_elem[(i, j)] += w * ni * cell.shape_value(j, q);
                }
            }
        }

        m_elem
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fem::{DofHandler, MatrixFree};
    use crate::mesh::StructuredMesh;
    use approx::assert_relative_eq;

    fn single_cell(degree: usize) -> MatrixFree {
        let mesh = StructuredMesh::new(0.0, 2.0, 0.0, 0.5, 1, 1, degree);
        MatrixFree::new(&DofHandler::new(&mesh))
    }

    #[test]
    fn test_stiffness_symmetric_with_constant_nullspace() {
        let mf = single_cell(2);
        let k = ElementMatrix::stiffness(&mf.cell(0), 3.0);

        assert_relative_eq!(k.clone(), k.transpose(), epsilon = 1e-12);
        for i in 0..k.nrows() {
            let row_sum: f64 = k.row(i).iter().sum();
            assert_relative_eq!(row_sum, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_mass_sums_to_area() {
        for degree in 1..=2 {
            let mf = single_cell(degree);
            let m = ElementMatrix::mass(&mf.cell(0));
            assert_relative_eq!(m.sum(), 1.0, epsilon = 1e-13);
        }
    }

    #[test]
    fn test_q1_stiffness_diagonal() {
        // Unit square Q1: diagonal entries of the Laplacian are 2/3
        let mesh = StructuredMesh::new(0.0, 1.0, 0.0, 1.0, 1, 1, 1);
        let mf = MatrixFree::new(&DofHandler::new(&mesh));
        let k = ElementMatrix::stiffness(&mf.cell(0), 1.0);
        for i in 0..4 {
            assert_relative_eq!(k[(i, i)], 2.0 / 3.0, epsilon = 1e-13);
        }
    }
}
