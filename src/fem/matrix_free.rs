//! Matrix-free evaluation context
//!
//! Caches, per cell, everything an operator needs to apply its weak form
//! without assembling a matrix: DOF indices, JxW at each quadrature point,
//! the (diagonal) inverse Jacobian and the physical quadrature points.
//!
//! Cell loops evaluate cells in parallel but accumulate the local vectors
//! serially in ascending cell order, so results are bit-reproducible
//! regardless of the thread count.

use nalgebra::{Point2, Vector2};
use rayon::prelude::*;

use crate::fem::{DofHandler, GaussLegendre, LagrangeBasis, QuadRule};

/// Per-cell geometric data
#[derive(Debug, Clone)]
struct CellData {
    dofs: Vec<usize>,
    jxw: Vec<f64>,
    /// Diagonal of the inverse Jacobian (1/hx, 1/hy)
    inv_jacobian: Vector2<f64>,
    points: Vec<Point2<f64>>,
}

#[derive(Debug, Clone)]
pub struct MatrixFree {
    basis: LagrangeBasis,
    quad: QuadRule,
    /// shape_values[q][i]
    shape_values: Vec<Vec<f64>>,
    /// Reference gradients, shape_gradients[q][i]
    shape_gradients: Vec<Vec<Vector2<f64>>>,
    cells: Vec<CellData>,
    n_dofs: usize,
}

impl MatrixFree {
    /// Build the evaluation context for the current mesh
    ///
    /// Uses the (p+1)-point Gauss rule per direction.
    pub fn new(dofs: &DofHandler) -> Self {
        let mesh = dofs.mesh();
        let basis = LagrangeBasis::new(mesh.degree);
        let quad = QuadRule::tensor(&GaussLegendre::new(mesh.degree + 1));

        let shape_values = quad.points.iter().map(|xi| basis.shape_values(xi)).collect();
        let shape_gradients = quad.points.iter().map(|xi| basis.shape_gradients(xi)).collect();

        let (hx, hy) = mesh.cell_size();
        let det_j = hx * hy;

        let cells = (0..mesh.num_cells())
            .map(|c| CellData {
                dofs: dofs.cell_dofs(c).to_vec(),
                jxw: quad.weights.iter().map(|w| w * det_j).collect(),
                inv_jacobian: Vector2::new(1.0 / hx, 1.0 / hy),
                points: quad.points.iter().map(|xi| mesh.map_to_physical(c, xi)).collect(),
            })
            .collect();

        Self {
            basis,
            quad,
            shape_values,
            shape_gradients,
            cells,
            n_dofs: dofs.total_dofs(),
        }
    }

    pub fn n_dofs(&self) -> usize {
        self.n_dofs
    }

    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn basis(&self) -> &LagrangeBasis {
        &self.basis
    }

    pub fn num_quadrature_points(&self) -> usize {
        self.quad.num_points()
    }

    /// View of one cell for evaluation and integration
    pub fn cell(&self, cell: usize) -> FeCell<'_> {
        FeCell {
            mf: self,
            data: &self.cells[cell],
            index: cell,
        }
    }

    /// Run a cell kernel over all cells and sum the local vectors
    ///
    /// The kernel returns one entry per local DOF. Cells are processed in
    /// parallel; accumulation into the global vector happens in cell order.
    pub fn cell_loop<F>(&self, kernel: F) -> Vec<f64>
    where
        F: Fn(&FeCell<'_>) -> Vec<f64> + Sync,
    {
        let local: Vec<Vec<f64>> = (0..self.cells.len())
            .into_par_iter()
            .map(|c| kernel(&self.cell(c)))
            .collect();

        let mut dst = vec![0.0; self.n_dofs];
        for (cell, values) in self.cells.iter().zip(local.iter()) {
            for (&dof, &v) in cell.dofs.iter().zip(values.iter()) {
                dst[dof] += v;
            }
        }
        dst
    }
}

/// Evaluation helpers for a single cell (FEValues analogue)
pub struct FeCell<'a> {
    mf: &'a MatrixFree,
    data: &'a CellData,
    index: usize,
}

impl<'a> FeCell<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn dofs(&self) -> &[usize] {
        &self.data.dofs
    }

    pub fn n_dofs(&self) -> usize {
        self.data.dofs.len()
    }

    pub fn n_q_points(&self) -> usize {
        self.data.jxw.len()
    }

    pub fn jxw(&self, q: usize) -> f64 {
        self.data.jxw[q]
    }

    pub fn quadrature_point(&self, q: usize) -> &Point2<f64> {
        &self.data.points[q]
    }

    pub fn shape_value(&self, i: usize, q: usize) -> f64 {
        self.mf.shape_values[q][i]
    }

    /// Physical gradient of shape function i at point q
    pub fn shape_grad(&self, i: usize, q: usize) -> Vector2<f64> {
        self.mf.shape_gradients[q][i].component_mul(&self.data.inv_jacobian)
    }

    /// Interpolate a global vector at the quadrature points
    pub fn values(&self, src: &[f64]) -> Vec<f64> {
        (0..self.n_q_points())
            .map(|q| {
                self.data
                    .dofs
                    .iter()
                    .enumerate()
                    .map(|(i, &dof)| src[dof] * self.mf.shape_values[q][i])
                    .sum()
            })
            .collect()
    }

    /// Gradient of a global vector at the quadrature points
    pub fn gradients(&self, src: &[f64]) -> Vec<Vector2<f64>> {
        (0..self.n_q_points())
            .map(|q| {
                let g = self
                    .data
                    .dofs
                    .iter()
                    .enumerate()
                    .fold(Vector2::zeros(), |acc, (i, &dof)| {
                        acc + self.mf.shape_gradients[q][i] * src[dof]
                    });
                g.component_mul(&self.data.inv_jacobian)
            })
            .collect()
    }

    /// Test quadrature-point values against the shape functions:
    /// out_i = Σ_q JxW_q v_q φ_i(q)
    pub fn integrate_values(&self, values: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; self.n_dofs()];
        for (q, &v) in values.iter().enumerate() {
            let w = v * self.data.jxw[q];
            for (i, o) in out.iter_mut().enumerate() {
                *o += w * self.mf.shape_values[q][i];
            }
        }
        out
    }

    /// Test quadrature-point vectors against shape gradients:
    /// out_i = Σ_q JxW_q g_q · ∇φ_i(q)
    pub fn integrate_gradients(&self, gradients: &[Vector2<f64>]) -> Vec<f64> {
        let mut out = vec![0.0; self.n_dofs()];
        for (q, g) in gradients.iter().enumerate() {
            let scaled = g.component_mul(&self.data.inv_jacobian) * self.data.jxw[q];
            for (i, o) in out.iter_mut().enumerate() {
                *o += scaled.dot(&self.mf.shape_gradients[q][i]);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::StructuredMesh;
    use approx::assert_relative_eq;

    fn context(degree: usize) -> (DofHandler, MatrixFree) {
        let mesh = StructuredMesh::new(0.0, 3.0, 0.0, 2.0, 3, 4, degree);
        let dofs = DofHandler::new(&mesh);
        let mf = MatrixFree::new(&dofs);
        (dofs, mf)
    }

    #[test]
    fn test_integrating_one_gives_area() {
        for degree in 1..=2 {
            let (_, mf) = context(degree);
            let ones = mf.cell_loop(|cell| cell.integrate_values(&vec![1.0; cell.n_q_points()]));
            let area: f64 = ones.iter().sum();
            assert_relative_eq!(area, 6.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_gradient_of_linear_field() {
        let (dofs, mf) = context(2);
        let u: Vec<f64> = (0..dofs.total_dofs())
            .map(|d| {
                let p = dofs.support_point(d);
                3.0 * p.x - 0.5 * p.y
            })
            .collect();

        for c in 0..mf.num_cells() {
            for g in mf.cell(c).gradients(&u) {
                assert_relative_eq!(g.x, 3.0, epsilon = 1e-12);
                assert_relative_eq!(g.y, -0.5, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_values_at_quadrature_points() {
        let (dofs, mf) = context(1);
        let u: Vec<f64> = (0..dofs.total_dofs())
            .map(|d| dofs.support_point(d).x)
            .collect();
        let cell = mf.cell(4);
        let vals = cell.values(&u);
        for (q, v) in vals.iter().enumerate() {
            assert_relative_eq!(*v, cell.quadrature_point(q).x, epsilon = 1e-13);
        }
    }

    #[test]
    fn test_cell_loop_is_deterministic() {
        let (dofs, mf) = context(2);
        let u: Vec<f64> = (0..dofs.total_dofs()).map(|d| (d as f64 * 0.37).sin()).collect();
        let run = || mf.cell_loop(|cell| cell.integrate_gradients(&cell.gradients(&u)));
        let first = run();
        for _ in 0..5 {
            assert_eq!(run(), first);
        }
    }

    #[test]
    fn test_integrate_gradients_annihilates_constants() {
        // ∫ ∇c · ∇φ_i = 0 for a constant field
        let (dofs, mf) = context(1);
        let u = vec![4.2; dofs.total_dofs()];
        let r = mf.cell_loop(|cell| cell.integrate_gradients(&cell.gradients(&u)));
        assert!(r.iter().all(|v| v.abs() < 1e-12));
    }
}
