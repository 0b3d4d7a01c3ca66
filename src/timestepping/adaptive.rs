//! Time step limits for viscous relaxation
//!
//! The relaxation term `-μ g(σ) σ_c` is treated explicitly by every scheme.
//! Linearized around the current stress it decays at rate
//! `λ_c = μ (g + σ_c ∂g/∂σ_c)`, and the explicit update stays stable for
//! `dt ≤ 2/λ_c`. The Maxwell time `1/(μ g)` is reported as the accuracy
//! scale.

use crate::mechanics::StressState;
use crate::problem::ProblemData;
use crate::solution::Solution;
use crate::utils::units;
use crate::DIM;

/// Step size limits and the data behind them
#[derive(Debug, Clone, Copy)]
pub struct TimestepLimit {
    /// Accepted step (seconds)
    pub dt: f64,
    /// Explicit relaxation stability bound 2/λ_max (seconds)
    pub stability_dt: f64,
    /// Shortest Maxwell time 1/(μ g) (seconds)
    pub maxwell_dt: f64,
    /// Largest linearized relaxation rate λ (1/s)
    pub max_rate: f64,
}

impl TimestepLimit {
    /// Which constraint set `dt`
    pub fn limiting_constraint(&self) -> &'static str {
        if self.dt == self.stability_dt {
            "Relaxation stability"
        } else if self.dt == self.maxwell_dt {
            "Maxwell"
        } else {
            "Requested"
        }
    }

    pub fn dt_years(&self) -> f64 {
        units::seconds_to_years(self.dt)
    }

    /// True if `dt` would violate the explicit stability bound
    pub fn exceeded_by(&self, dt: f64) -> bool {
        dt > self.stability_dt
    }
}

/// Evaluate the relaxation limits at the DOF support points
///
/// Uses the latest committed stress of `soln`.
///
/// # Arguments
/// * `pd` - Mesh, μ and the inverse-viscosity field
/// * `soln` - Solution providing the stress state
/// * `dt_requested` - Step the caller intends to take (seconds)
/// * `use_maxwell_constraint` - Also cap dt at the Maxwell time
pub fn compute_relaxation_limit(
    pd: &ProblemData,
    soln: &Solution,
    dt_requested: f64,
    use_maxwell_constraint: bool,
) -> TimestepLimit {
    let mu = pd.shear_modulus();
    let inv_visc = pd.inv_viscosity();
    let level = soln.level(0).unwrap_or(&soln.current);

    let mut max_rate: f64 = 0.0;
    let mut max_g: f64 = 0.0;
    for dof in 0..level.n_dofs() {
        let p = pd.dofs().support_point(dof);
        let stress: StressState = [level.strs[0][dof], level.strs[1][dof]];
        let g = inv_visc.value(&p, &stress);
        max_g = max_g.max(g);
        for c in 0..DIM {
            let rate = mu * (g + stress[c] * inv_visc.strs_deriv(&p, &stress, c));
            max_rate = max_rate.max(rate);
        }
    }

    let stability_dt = if max_rate > 0.0 { 2.0 / max_rate } else { f64::INFINITY };
    let maxwell_dt = if max_g > 0.0 { 1.0 / (mu * max_g) } else { f64::INFINITY };

    let mut dt = dt_requested.min(stability_dt);
    if use_maxwell_constraint {
        dt = dt.min(maxwell_dt);
    }

    TimestepLimit {
        dt,
        stability_dt,
        maxwell_dt,
        max_rate,
    }
}
