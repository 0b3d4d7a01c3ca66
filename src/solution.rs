//! Field storage across time levels
//!
//! Holds the committed history (front = level n, then n-1, ...), the working
//! level being built by the current step, the tentative stress buffer and the
//! raw velocity-solve result. A small state machine enforces the phase order
//! of a step:
//!
//! ```text
//! Committed -> Started -> Tentative -> VelocitySolved -> Corrected -> Committed
//! ```

use std::collections::VecDeque;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ViscoError};
use crate::fem::{interpolate_function, transfer_field, MatrixFree};
use crate::ic::SpatialFunction;
use crate::mesh::StructuredMesh;
use crate::problem::ProblemData;
use crate::scheme::StepSizes;
use crate::DIM;

/// Number of committed levels kept; enough for every two-level scheme
pub const MAX_LEVELS: usize = 2;

/// Velocity and stress at one time level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldLevel {
    pub vel: Vec<f64>,
    /// [Szx, Szy]
    pub strs: [Vec<f64>; DIM],
}

impl FieldLevel {
    pub fn zeros(n_dofs: usize) -> Self {
        Self {
            vel: vec![0.0; n_dofs],
            strs: [vec![0.0; n_dofs], vec![0.0; n_dofs]],
        }
    }

    /// Nodal interpolation of the three fields on the mesh of `pd`
    ///
    /// Fails with `NonFiniteField` if any function is NaN or infinite at a
    /// support point.
    pub fn interpolate(
        pd: &ProblemData,
        vel: &dyn SpatialFunction,
        szx: &dyn SpatialFunction,
        szy: &dyn SpatialFunction,
    ) -> Result<Self> {
        let dofs = pd.dofs();
        let level = Self {
            vel: interpolate_function(dofs, vel),
            strs: [interpolate_function(dofs, szx), interpolate_function(dofs, szy)],
        };
        let fields = [
            ("velocity", &level.vel),
            ("Szx", &level.strs[0]),
            ("Szy", &level.strs[1]),
        ];
        for (field, values) in fields {
            if let Some(dof) = values.iter().position(|v| !v.is_finite()) {
                return Err(ViscoError::NonFiniteField { field, dof });
            }
        }
        Ok(level)
    }

    pub fn n_dofs(&self) -> usize {
        self.vel.len()
    }
}

/// Phase reached by the step in progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepState {
    Committed,
    Started,
    Tentative,
    VelocitySolved,
    Corrected,
}

/// Snapshot of the committed levels, taken before a refinement event
///
/// Carries the mesh the levels live on so they can be interpolated onto
/// whatever mesh exists after the refinement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionTransfer {
    pub mesh: StructuredMesh,
    pub levels: Vec<FieldLevel>,
    pub dt_history: Vec<f64>,
    pub time: f64,
}

impl SolutionTransfer {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug, Clone)]
pub struct Solution {
    history: VecDeque<FieldLevel>,
    /// Sizes of the committed steps, most recent first
    dt_history: VecDeque<f64>,
    /// Level n+1 under construction
    pub current: FieldLevel,
    pub tent_strs: [Vec<f64>; DIM],
    /// Result of the last velocity solve
    pub poisson_soln: Vec<f64>,
    time: f64,
    dt: f64,
    state: StepState,
    generation: u64,
}

impl Solution {
    /// Zero fields on the current mesh of `pd`
    pub fn new(pd: &ProblemData) -> Self {
        let n = pd.n_dofs();
        Self {
            history: VecDeque::from(vec![FieldLevel::zeros(n)]),
            dt_history: VecDeque::new(),
            current: FieldLevel::zeros(n),
            tent_strs: [vec![0.0; n], vec![0.0; n]],
            poisson_soln: vec![0.0; n],
            time: 0.0,
            dt: 0.0,
            state: StepState::Committed,
            generation: pd.generation(),
        }
    }

    /// Interpolate initial velocity and stress at time `t0`
    ///
    /// Discards any previous history.
    pub fn apply_init_cond(
        &mut self,
        pd: &ProblemData,
        t0: f64,
        vel: &dyn SpatialFunction,
        szx: &dyn SpatialFunction,
        szy: &dyn SpatialFunction,
    ) -> Result<()> {
        self.check_generation(pd)?;
        let level = FieldLevel::interpolate(pd, vel, szx, szy)?;
        self.current = level.clone();
        self.history = VecDeque::from(vec![level]);
        self.dt_history.clear();
        self.time = t0;
        self.state = StepState::Committed;
        Ok(())
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn state(&self) -> StepState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn n_dofs(&self) -> usize {
        self.current.n_dofs()
    }

    /// Committed level k steps back (0 = level n)
    pub fn level(&self, k: usize) -> Option<&FieldLevel> {
        self.history.get(k)
    }

    pub fn num_levels(&self) -> usize {
        self.history.len()
    }

    /// Size of the step in progress and of the last committed step
    pub fn step_sizes(&self) -> Result<StepSizes> {
        if self.state == StepState::Committed {
            return Err(ViscoError::StepOrder(
                "step sizes requested outside of a time step".into(),
            ));
        }
        Ok(StepSizes {
            dt: self.dt,
            dt_prev: self.dt_history.front().copied(),
        })
    }

    /// Fail unless `required` committed levels are available
    pub fn require_levels(&self, scheme: &'static str, required: usize) -> Result<()> {
        let available = self.history.len();
        if available < required {
            return Err(ViscoError::InsufficientHistory {
                scheme,
                required,
                available,
            });
        }
        Ok(())
    }

    pub fn check_generation(&self, pd: &ProblemData) -> Result<()> {
        if self.generation != pd.generation() {
            return Err(ViscoError::StaleContext {
                component: "Solution",
                expected: self.generation,
                found: pd.generation(),
            });
        }
        Ok(())
    }

    /// Open a step of size dt from the last committed level
    pub fn start_timestep(&mut self, dt: f64) -> Result<()> {
        self.advance(StepState::Committed, StepState::Started)?;
        if !(dt > 0.0 && dt.is_finite()) {
            self.state = StepState::Committed;
            return Err(ViscoError::StepOrder(format!("invalid time step {}", dt)));
        }
        self.dt = dt;
        if let Some(last) = self.history.front() {
            self.current.clone_from(last);
        }
        debug!("Step t = {:.6e} -> {:.6e}", self.time, self.time + dt);
        Ok(())
    }

    /// Move from one phase to the next, rejecting out-of-order calls
    pub fn advance(&mut self, from: StepState, to: StepState) -> Result<()> {
        if self.state != from {
            return Err(ViscoError::StepOrder(format!(
                "cannot enter {:?} from {:?} (expected {:?})",
                to, self.state, from
            )));
        }
        self.state = to;
        Ok(())
    }

    /// Push the corrected level into history and advance time
    pub fn commit_timestep(&mut self) -> Result<()> {
        self.advance(StepState::Corrected, StepState::Committed)?;
        self.history.push_front(self.current.clone());
        self.history.truncate(MAX_LEVELS);
        self.dt_history.push_front(self.dt);
        self.dt_history.truncate(MAX_LEVELS);
        self.time += self.dt;
        Ok(())
    }

    /// Abandon the step in progress and restore the last committed state
    pub fn abort_timestep(&mut self) {
        if let Some(last) = self.history.front() {
            self.current.clone_from(last);
        }
        self.state = StepState::Committed;
    }

    /// Seed multistep history after a sub-stepped first step
    ///
    /// Keeps the latest level and puts the initial condition, interpolated on
    /// the current mesh, one level back at `t0`. Intermediate sub-steps are
    /// dropped: the next step sees one previous step of size `time - t0`.
    pub fn init_multistep(
        &mut self,
        pd: &ProblemData,
        t0: f64,
        vel: &dyn SpatialFunction,
        szx: &dyn SpatialFunction,
        szy: &dyn SpatialFunction,
    ) -> Result<()> {
        self.check_generation(pd)?;
        if self.state != StepState::Committed {
            return Err(ViscoError::StepOrder(
                "multistep history seeded in the middle of a step".into(),
            ));
        }
        let elapsed = self.time - t0;
        if !(elapsed > 0.0) {
            return Err(ViscoError::StepOrder(format!(
                "no step taken since t0 = {:.6e}",
                t0
            )));
        }

        let initial = FieldLevel::interpolate(pd, vel, szx, szy)?;
        let latest = self.history.front().cloned().unwrap_or_else(|| self.current.clone());
        self.history = VecDeque::from(vec![latest, initial]);
        self.dt_history = VecDeque::from(vec![elapsed]);
        Ok(())
    }

    /// Resize all buffers for the current mesh of `pd`
    ///
    /// History is reset to a single zero level; [`Solution::post_refine`]
    /// fills it from a snapshot.
    pub fn reinit(&mut self, pd: &ProblemData) {
        let n = pd.n_dofs();
        self.history = VecDeque::from(vec![FieldLevel::zeros(n)]);
        self.current = FieldLevel::zeros(n);
        self.tent_strs = [vec![0.0; n], vec![0.0; n]];
        self.poisson_soln = vec![0.0; n];
        self.state = StepState::Committed;
        self.generation = pd.generation();
    }

    /// Snapshot the committed levels before refinement
    pub fn start_refine(&self, pd: &ProblemData) -> Result<SolutionTransfer> {
        if self.state != StepState::Committed {
            return Err(ViscoError::StepOrder(
                "refinement requested in the middle of a step".into(),
            ));
        }
        self.check_generation(pd)?;
        Ok(SolutionTransfer {
            mesh: pd.mesh().clone(),
            levels: self.history.iter().cloned().collect(),
            dt_history: self.dt_history.iter().copied().collect(),
            time: self.time,
        })
    }

    /// Interpolate a snapshot onto the current mesh of `pd`
    pub fn post_refine(&mut self, pd: &ProblemData, transfer: &SolutionTransfer) -> Result<()> {
        self.check_generation(pd)?;
        let expected = transfer.mesh.num_nodes();
        let dofs = pd.dofs();

        let mut history = VecDeque::with_capacity(transfer.levels.len());
        for level in &transfer.levels {
            if level.n_dofs() != expected {
                return Err(ViscoError::DimensionMismatch {
                    what: "transferred level",
                    expected,
                    found: level.n_dofs(),
                });
            }
            history.push_back(FieldLevel {
                vel: transfer_field(&transfer.mesh, &level.vel, dofs),
                strs: [
                    transfer_field(&transfer.mesh, &level.strs[0], dofs),
                    transfer_field(&transfer.mesh, &level.strs[1], dofs),
                ],
            });
        }
        if history.is_empty() {
            history.push_back(FieldLevel::zeros(pd.n_dofs()));
        }

        self.current = history[0].clone();
        self.history = history;
        self.dt_history = transfer.dt_history.iter().copied().collect();
        self.time = transfer.time;
        self.state = StepState::Committed;
        Ok(())
    }

    /// ||v_h - v||_L2 of the latest committed velocity
    pub fn velocity_l2_error(&self, pd: &ProblemData, exact: &dyn SpatialFunction) -> Result<f64> {
        self.check_generation(pd)?;
        let vel = &self.history[0].vel;
        let mf = MatrixFree::new(pd.dofs());
        let per_cell: f64 = (0..mf.num_cells())
            .map(|c| {
                let cell = mf.cell(c);
                cell.values(vel)
                    .iter()
                    .enumerate()
                    .map(|(q, vh)| {
                        let e = vh - exact.value(cell.quadrature_point(q));
                        e * e * cell.jxw(q)
                    })
                    .sum::<f64>()
            })
            .sum();
        Ok(per_cell.sqrt())
    }
}
