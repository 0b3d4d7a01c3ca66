//! Matrix-free stress operators
//!
//! A [`StressOp`] computes the right-hand side `b_i = Σ_q JxW φ_i g(q)` of the
//! projection `M σ_c = b` for one stress component and one phase. Nothing is
//! assembled: every apply sweeps the cells of the [`MatrixFree`] context.

use std::sync::Arc;

use crate::error::{Result, ViscoError};
use crate::fem::{Constraints, FeCell, MatrixFree};
use crate::linalg::LinearOperator;
use crate::mechanics::{InvViscosity, StressState};
use crate::scheme::{StepCoefficients, StepPhase};
use crate::solution::Solution;
use crate::DIM;

pub struct StressOp {
    component: usize,
    phase: StepPhase,
    coefficients: StepCoefficients,
    shear_modulus: f64,
    inv_visc: Arc<dyn InvViscosity>,
}

impl StressOp {
    pub fn new(
        component: usize,
        phase: StepPhase,
        coefficients: StepCoefficients,
        shear_modulus: f64,
        inv_visc: Arc<dyn InvViscosity>,
    ) -> Self {
        debug_assert!(component < DIM);
        Self {
            component,
            phase,
            coefficients,
            shear_modulus,
            inv_visc,
        }
    }

    pub fn component(&self) -> usize {
        self.component
    }

    pub fn phase(&self) -> StepPhase {
        self.phase
    }

    pub fn coefficients(&self) -> &StepCoefficients {
        &self.coefficients
    }

    /// Weak-form action against `src`
    ///
    /// Tentative: `src` is σ^n of this component. Correction: `src` is the
    /// tentative stress and the velocity is `soln.poisson_soln`.
    pub fn apply(&self, mf: &MatrixFree, soln: &Solution, src: &[f64]) -> Result<Vec<f64>> {
        if src.len() != mf.n_dofs() {
            return Err(ViscoError::DimensionMismatch {
                what: "stress operator input",
                expected: mf.n_dofs(),
                found: src.len(),
            });
        }
        match self.phase {
            StepPhase::Tentative => self.apply_tentative(mf, soln, src),
            StepPhase::Correction => Ok(self.apply_correction(mf, soln, src)),
        }
    }

    /// g = h0 src + h1 σ^{n-1}_c - κ μ g(σ_ext) σ_ext,c
    fn apply_tentative(&self, mf: &MatrixFree, soln: &Solution, src: &[f64]) -> Result<Vec<f64>> {
        let c = self.component;
        let other = 1 - c;
        let k = &self.coefficients;
        let needed = k.required_levels();
        soln.require_levels("tentative stress operator", needed)?;

        let current = soln
            .level(0)
            .ok_or(ViscoError::InsufficientHistory {
                scheme: "tentative stress operator",
                required: needed,
                available: 0,
            })?;
        let previous = if needed > 1 { soln.level(1) } else { None };
        let kappa_mu = k.kappa * self.shear_modulus;

        Ok(mf.cell_loop(|cell: &FeCell<'_>| {
            let nq = cell.n_q_points();
            let own = cell.values(src);
            let cross = cell.values(&current.strs[other]);
            let prev_strs = match previous {
                Some(level) => [cell.values(&level.strs[0]), cell.values(&level.strs[1])],
                None => [vec![0.0; nq], vec![0.0; nq]],
            };

            let values: Vec<f64> = (0..nq)
                .map(|q| {
                    let mut s_n: StressState = [0.0; DIM];
                    s_n[c] = own[q];
                    s_n[other] = cross[q];
                    let s_prev: StressState = [prev_strs[0][q], prev_strs[1][q]];
                    let s_ext: StressState = [
                        k.extrapolation[0] * s_n[0] + k.extrapolation[1] * s_prev[0],
                        k.extrapolation[0] * s_n[1] + k.extrapolation[1] * s_prev[1],
                    ];
                    let g = self.inv_visc.value(cell.quadrature_point(q), &s_ext);

                    k.history[0] * own[q] + k.history[1] * s_prev[c] - kappa_mu * g * s_ext[c]
                })
                .collect();

            cell.integrate_values(&values)
        }))
    }

    /// g = src + κ μ ∂_c w
    fn apply_correction(&self, mf: &MatrixFree, soln: &Solution, src: &[f64]) -> Vec<f64> {
        let c = self.component;
        let kappa_mu = self.coefficients.kappa * self.shear_modulus;
        let w = &soln.poisson_soln;

        mf.cell_loop(|cell: &FeCell<'_>| {
            let tent = cell.values(src);
            let dw = cell.gradients(w);
            let values: Vec<f64> = tent
                .iter()
                .zip(dw.iter())
                .map(|(s, g)| s + kappa_mu * g[c])
                .collect();
            cell.integrate_values(&values)
        })
    }
}

/// Mass matrix action with identity rows on constrained DOFs
pub struct MassOperator<'a> {
    mf: &'a MatrixFree,
    constraints: &'a Constraints,
}

impl<'a> MassOperator<'a> {
    pub fn new(mf: &'a MatrixFree, constraints: &'a Constraints) -> Self {
        Self { mf, constraints }
    }

    /// diag(M), computed cell by cell
    pub fn diagonal(&self) -> Vec<f64> {
        let mut diag = self.mf.cell_loop(|cell| {
            (0..cell.n_dofs())
                .map(|i| {
                    (0..cell.n_q_points())
                        .map(|q| cell.jxw(q) * cell.shape_value(i, q).powi(2))
                        .sum::<f64>()
                })
                .collect()
        });
        for dof in self.constraints.constrained_dofs() {
            diag[dof] = 1.0;
        }
        diag
    }
}

impl LinearOperator for MassOperator<'_> {
    fn apply(&self, v: &[f64]) -> Vec<f64> {
        let mut src = v.to_vec();
        self.constraints.set_zero(&mut src);
        let mut out = self.mf.cell_loop(|cell| cell.integrate_values(&cell.values(&src)));
        for dof in self.constraints.constrained_dofs() {
            out[dof] = v[dof];
        }
        out
    }

    fn rows(&self) -> usize {
        self.mf.n_dofs()
    }

    fn cols(&self) -> usize {
        self.mf.n_dofs()
    }
}
