use sprs::{CsMat, TriMat};

/// Constrained DOFs with prescribed (possibly inhomogeneous) values
///
/// Applied around every operator evaluation: `set_zero` before an apply so
/// constrained entries do not feed the cell loop, `distribute` afterwards to
/// write the prescribed values back.
#[derive(Debug, Clone)]
pub struct Constraints {
    constrained: Vec<bool>,
    values: Vec<f64>,
    count: usize,
}

impl Constraints {
    /// No constraints over `n_dofs` DOFs
    pub fn new(n_dofs: usize) -> Self {
        Self {
            constrained: vec![false; n_dofs],
            values: vec![0.0; n_dofs],
            count: 0,
        }
    }

    /// Constrain a DOF to a prescribed value
    ///
    /// # Arguments
    /// * `dof` - Global DOF index
    /// * `value` - Prescribed value
    pub fn set_dirichlet(&mut self, dof: usize, value: f64) {
        debug_assert!(dof < self.constrained.len(), "DOF index out of bounds");

        if !self.constrained[dof] {
            self.constrained[dof] = true;
            self.count += 1;
        }
        self.values[dof] = value;
    }

    /// Update the value of an already constrained DOF
    pub fn set_value(&mut self, dof: usize, value: f64) {
        debug_assert!(self.constrained[dof], "DOF {} is not constrained", dof);
        self.values[dof] = value;
    }

    pub fn is_constrained(&self, dof: usize) -> bool {
        self.constrained[dof]
    }

    pub fn value(&self, dof: usize) -> f64 {
        self.values[dof]
    }

    pub fn num_constrained(&self) -> usize {
        self.count
    }

    pub fn n_dofs(&self) -> usize {
        self.constrained.len()
    }

    /// Constrained DOFs in increasing order
    pub fn constrained_dofs(&self) -> impl Iterator<Item = usize> + '_ {
        self.constrained
            .iter()
            .enumerate()
            .filter_map(|(i, &c)| c.then_some(i))
    }

    /// Zero the constrained entries of a vector
    pub fn set_zero(&self, v: &mut [f64]) {
        for dof in self.constrained_dofs() {
            v[dof] = 0.0;
        }
    }

    /// Write the prescribed values into a vector
    pub fn distribute(&self, v: &mut [f64]) {
        for dof in self.constrained_dofs() {
            v[dof] = self.values[dof];
        }
    }

    /// Eliminate constrained rows and columns
    ///
    /// Constrained rows become identity rows; columns of constrained DOFs are
    /// dropped from free rows. Pair with [`Constraints::condense_rhs`].
    #[allow(non_snake_case)]
    pub fn condense_matrix(&self, K: &CsMat<f64>) -> CsMat<f64> {
        let n = K.rows();
        let mut tri = TriMat::new((n, n));

        for (row_idx, row) in K.outer_iterator().enumerate() {
            if self.constrained[row_idx] {
                tri.add_triplet(row_idx, row_idx, 1.0);
            } else {
                for (col_idx, &val) in row.iter() {
                    if !self.constrained[col_idx] {
                        tri.add_triplet(row_idx, col_idx, val);
                    }
                }
            }
        }

        tri.to_csr()
    }

    /// Move the coupling to prescribed values to the right-hand side
    ///
    /// For free row j: f[j] -= Σ_i K[j,i] v_i over constrained i.
    /// For constrained row i: f[i] = v_i.
    #[allow(non_snake_case)]
    pub fn condense_rhs(&self, K: &CsMat<f64>, f: &[f64]) -> Vec<f64> {
        let mut f_new = f.to_vec();

        for (row_idx, row) in K.outer_iterator().enumerate() {
            if self.constrained[row_idx] {
                f_new[row_idx] = self.values[row_idx];
            } else {
                for (col_idx, &val) in row.iter() {
                    if self.constrained[col_idx] {
                        f_new[row_idx] -= val * self.values[col_idx];
                    }
                }
            }
        }

        f_new
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirichlet_bookkeeping() {
        let mut constraints = Constraints::new(10);

        assert_eq!(constraints.num_constrained(), 0);

        constraints.set_dirichlet(0, 100.0);
        constraints.set_dirichlet(0, 50.0);

        assert!(constraints.is_constrained(0));
        assert!(!constraints.is_constrained(1));
        assert_eq!(constraints.value(0), 50.0);
        assert_eq!(constraints.num_constrained(), 1);
    }

    #[test]
    fn test_set_zero_and_distribute() {
        let mut constraints = Constraints::new(4);
        constraints.set_dirichlet(1, 2.5);
        constraints.set_dirichlet(3, -1.0);

        let mut v = vec![1.0; 4];
        constraints.set_zero(&mut v);
        assert_eq!(v, vec![1.0, 0.0, 1.0, 0.0]);

        constraints.distribute(&mut v);
        assert_eq!(v, vec![1.0, 2.5, 1.0, -1.0]);
    }

    #[test]
    #[allow(non_snake_case)]
    fn test_condensation_solves_constrained_system() {
        // [2 -1; -1 2] u = [0; 0] with u_0 = 1 prescribed -> u_1 = 0.5
        let mut tri = TriMat::new((2, 2));
        tri.add_triplet(0, 0, 2.0);
        tri.add_triplet(0, 1, -1.0);
        tri.add_triplet(1, 0, -1.0);
        tri.add_triplet(1, 1, 2.0);
        let K: CsMat<f64> = tri.to_csr();

        let mut constraints = Constraints::new(2);
        constraints.set_dirichlet(0, 1.0);

        let K_bc = constraints.condense_matrix(&K);
        let f_bc = constraints.condense_rhs(&K, &[0.0, 0.0]);

        assert_eq!(K_bc.get(0, 0), Some(&1.0));
        assert_eq!(K_bc.get(1, 0), None);
        assert_eq!(f_bc, vec![1.0, 1.0]);
        // Row 1: 2 u_1 = 1
        assert_eq!(f_bc[1] / K_bc.get(1, 1).copied().unwrap_or(0.0), 0.5);
    }
}
