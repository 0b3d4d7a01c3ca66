//! Time loop
//!
//! One step is `start_timestep → tentative stress → velocity → stress
//! correction → commit`. A run starts with sub-stepped Forward Euler, then
//! seeds the multistep history with the initial condition and switches to
//! the configured scheme. Refinement
//! events snapshot the solution, refine, and rebuild every mesh-dependent
//! context.

use std::sync::Arc;

use log::{info, warn};

use crate::analytic::{SimpleVelocity, TwoLayerAnalytic};
use crate::bc::{BoundaryCond, ZeroBc};
use crate::config::{BoundaryValue, SimulationConfig};
use crate::error::Result;
use crate::ic::{InitialState, SpatialFunction};
use crate::problem::ProblemData;
use crate::scheme::{build_scheme, FwdEuler, Scheme};
use crate::solution::Solution;
use crate::stress::Stress;
use crate::timestepping::compute_relaxation_limit;
use crate::utils::units;
use crate::velocity::Velocity;

/// Outcome of [`SimpleSolver::run`]
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub steps: usize,
    pub refinements: usize,
    /// Final time (seconds), equal to `t_end`
    pub time: f64,
    /// ||v_h - v||_L2 at the final time, if a reference was supplied
    pub velocity_error: Option<f64>,
}

pub struct SimpleSolver {
    config: SimulationConfig,
    pd: ProblemData,
    soln: Solution,
    scheme: Box<dyn Scheme>,
    stress: Stress,
    velocity: Velocity,
    vel_bc: Box<dyn BoundaryCond>,
    step_index: usize,
    refinements: usize,
}

impl SimpleSolver {
    /// Set up all components on the mesh of `pd`, starting with Forward Euler
    pub fn new(config: SimulationConfig, pd: ProblemData, vel_bc: Box<dyn BoundaryCond>) -> Self {
        let soln = Solution::new(&pd);
        let mut scheme: Box<dyn Scheme> = Box::new(FwdEuler::new());
        scheme.reinit(&pd);
        let mut stress = Stress::new();
        stress.reinit(&pd);
        let mut velocity = Velocity::new();
        velocity.reinit(&pd);

        Self {
            config,
            pd,
            soln,
            scheme,
            stress,
            velocity,
            vel_bc,
            step_index: 0,
            refinements: 0,
        }
    }

    /// Problem, boundary data and analytic reference from a configuration
    pub fn from_config(config: SimulationConfig) -> Result<(Self, Arc<TwoLayerAnalytic>)> {
        let pd = ProblemData::from_config(&config)?;
        let tla = Arc::new(TwoLayerAnalytic::from_config(&config));
        let vel_bc: Box<dyn BoundaryCond> = match config.boundary.value {
            BoundaryValue::Zero => Box::new(ZeroBc::new()),
            BoundaryValue::Exact => Box::new(SimpleVelocity::new(tla.clone())),
        };
        Ok((Self::new(config, pd, vel_bc), tla))
    }

    pub fn problem(&self) -> &ProblemData {
        &self.pd
    }

    pub fn solution(&self) -> &Solution {
        &self.soln
    }

    pub fn scheme(&self) -> &dyn Scheme {
        self.scheme.as_ref()
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    /// Replace the scheme and bind it to the current mesh
    pub fn set_scheme(&mut self, mut scheme: Box<dyn Scheme>) {
        scheme.reinit(&self.pd);
        self.scheme = scheme;
    }

    /// One full step of size dt
    ///
    /// On failure the solution is rolled back to the last committed state.
    pub fn step(&mut self, dt: f64) -> Result<()> {
        self.soln.start_timestep(dt)?;
        let result = self.run_phases(dt);
        if result.is_err() {
            self.soln.abort_timestep();
        }
        result
    }

    fn run_phases(&mut self, dt: f64) -> Result<()> {
        if self.config.time_stepping.check_stability && self.scheme.order() == 1 {
            let limit = compute_relaxation_limit(&self.pd, &self.soln, dt, false);
            if limit.exceeded_by(dt) {
                warn!(
                    "dt = {:.3e} s exceeds the explicit relaxation limit {:.3e} s",
                    dt, limit.stability_dt
                );
            }
        }

        self.stress.tentative_step(&mut self.soln, self.scheme.as_ref())?;
        self.vel_bc.set_t(self.soln.time() + dt);
        self.velocity
            .step(&mut self.soln, self.scheme.as_ref(), self.vel_bc.as_ref())?;
        self.stress.correction_step(&mut self.soln, self.scheme.as_ref())?;
        self.soln.commit_timestep()
    }

    /// Refinement event: snapshot, refine, transfer, rebuild contexts
    ///
    /// Returns whether the mesh actually changed.
    pub fn refine(&mut self) -> Result<bool> {
        self.pd.start_refine();
        let transfer = self.soln.start_refine(&self.pd)?;
        let refined = self.pd.execute_refine();
        self.soln.reinit(&self.pd);
        self.soln.post_refine(&self.pd, &transfer)?;
        self.scheme.reinit(&self.pd);
        self.velocity.reinit(&self.pd);
        self.stress.reinit(&self.pd);
        if refined {
            self.refinements += 1;
        }
        Ok(refined)
    }

    pub fn apply_init_cond(&mut self, init: &InitialState<'_>) -> Result<()> {
        let t0 = self.config.time_stepping.t_start();
        self.soln
            .apply_init_cond(&self.pd, t0, init.vel, init.szx, init.szy)
    }

    /// Refine on the first sub-step before the real run starts
    ///
    /// Each cycle applies the initial condition, takes one sub-step and
    /// refines, so the final mesh has resolved the first step.
    pub fn initial_adaptive(&mut self, init: &InitialState<'_>) -> Result<()> {
        let ts = &self.config.time_stepping;
        let dt = ts.dt() / ts.first_step_substeps as f64;
        for cycle in 0..self.config.refinement.initial_adaptive_refinement {
            self.apply_init_cond(init)?;
            self.step(dt)?;
            let refined = self.refine()?;
            info!("Initial adaptive cycle {}: refined = {}", cycle, refined);
        }
        Ok(())
    }

    /// Integrate from `t_start` to `t_end`
    ///
    /// Steps have the configured size except the last one, which is cut short
    /// when `t_end - t_start` is not a multiple of `dt`.
    pub fn run(&mut self, init: &InitialState<'_>, exact: Option<&dyn SpatialFunction>) -> Result<RunSummary> {
        self.initial_adaptive(init)?;
        if self.scheme.name() != "FwdEuler" {
            self.set_scheme(Box::new(FwdEuler::new()));
        }
        self.apply_init_cond(init)?;

        let ts = self.config.time_stepping.clone();
        let t_end = ts.t_end();
        let refine_interval = self.config.refinement.refine_interval;
        let mut substeps = ts.first_step_substeps;
        let mut first = true;
        let mut steps = 0;

        let end_tol = 1e-9 * ts.dt();
        while self.soln.time() < t_end - end_tol {
            let dt = ts.dt() / substeps as f64;
            for _ in 0..substeps {
                // The last step is shortened to land on t_end
                let remaining = t_end - self.soln.time();
                if remaining <= end_tol {
                    break;
                }
                self.step(dt.min(remaining))?;
                steps += 1;
                self.step_index += 1;
                if refine_interval > 0 && self.step_index % refine_interval == 0 {
                    self.refine()?;
                }
            }

            if first {
                first = false;
                substeps = 1;
                self.soln
                    .init_multistep(&self.pd, ts.t_start(), init.vel, init.szx, init.szy)?;
                self.set_scheme(build_scheme(ts.scheme, ts.bootstrap));
            }

            info!(
                "Step {}: t = {:.3} yr ({})",
                self.step_index,
                units::seconds_to_years(self.soln.time()),
                self.scheme.name()
            );
        }

        let velocity_error = match exact {
            Some(f) => Some(self.soln.velocity_l2_error(&self.pd, f)?),
            None => None,
        };

        Ok(RunSummary {
            steps,
            refinements: self.refinements,
            time: self.soln.time(),
            velocity_error,
        })
    }
}
