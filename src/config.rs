//! Configuration management for post-seismic relaxation runs
//!
//! Reads TOML configuration files and provides structured data for the mesh,
//! material model, fault source, time stepping, refinement and solvers. Every
//! field has a default so partial files are accepted.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Result, ViscoError};
use crate::mesh::BoundarySide;
use crate::scheme::BootstrapPolicy;
use crate::utils::units;

/// Main simulation configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub domain: DomainConfig,
    pub material: MaterialConfig,
    pub fault: FaultConfig,
    pub time_stepping: TimeSteppingConfig,
    pub refinement: RefinementConfig,
    pub solver: SolverConfig,
    pub boundary: BoundaryConfig,
}

/// Rectangular domain; y is depth, positive downwards
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DomainConfig {
    /// Horizontal extent (m)
    pub x_min: f64,
    pub x_max: f64,
    /// Surface (m)
    pub y_min: f64,
    /// Bottom of the model (m)
    pub y_max: f64,
    pub nx: usize,
    pub ny: usize,
    /// Polynomial degree of the Lagrange elements (1 or 2)
    pub degree: usize,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            x_min: -100e3,
            x_max: 100e3,
            y_min: 0.0,
            y_max: 100e3,
            nx: 16,
            ny: 8,
            degree: 2,
        }
    }
}

/// Inverse-viscosity model selection
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViscosityModel {
    /// Uniform Maxwell medium with `material.viscosity`
    Constant,
    /// Elastic layer of `fault.depth` thickness over a Maxwell half-space
    TwoLayer,
    /// g = A |σ|^(n-1)
    PowerLaw { prefactor: f64, exponent: f64 },
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MaterialConfig {
    /// μ (Pa)
    pub shear_modulus: f64,
    /// η (Pa·s)
    pub viscosity: f64,
    pub model: ViscosityModel,
}

impl Default for MaterialConfig {
    fn default() -> Self {
        Self {
            shear_modulus: 3e10,
            viscosity: 1e19,
            model: ViscosityModel::TwoLayer,
        }
    }
}

/// Slip distribution along the fault
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlipProfile {
    Constant,
    Cos,
}

/// Surface-breaking strike-slip fault at x = 0
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FaultConfig {
    /// Locking depth D, also the elastic layer thickness (m)
    pub depth: f64,
    /// Coseismic slip (m)
    pub slip: f64,
    pub profile: SlipProfile,
    /// Terms of the image sum
    pub image_terms: usize,
}

impl Default for FaultConfig {
    fn default() -> Self {
        Self {
            depth: 10e3,
            slip: 1.0,
            profile: SlipProfile::Constant,
            image_terms: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemeKind {
    FwdEuler,
    Bdf2,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeSteppingConfig {
    pub t_start_years: f64,
    pub t_end_years: f64,
    pub dt_years: f64,
    /// Scheme used after the first step
    pub scheme: SchemeKind,
    /// Forward Euler sub-steps used to start the run
    pub first_step_substeps: usize,
    pub bootstrap: BootstrapPolicy,
    /// Warn when a Forward Euler step exceeds the explicit relaxation limit
    pub check_stability: bool,
}

impl Default for TimeSteppingConfig {
    fn default() -> Self {
        Self {
            t_start_years: 0.0,
            t_end_years: 50.0,
            dt_years: 1.0,
            scheme: SchemeKind::Bdf2,
            first_step_substeps: 4,
            bootstrap: BootstrapPolicy::FirstOrder,
            check_stability: true,
        }
    }
}

impl TimeSteppingConfig {
    pub fn t_start(&self) -> f64 {
        units::years_to_seconds(self.t_start_years)
    }

    pub fn t_end(&self) -> f64 {
        units::years_to_seconds(self.t_end_years)
    }

    pub fn dt(&self) -> f64 {
        units::years_to_seconds(self.dt_years)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RefinementConfig {
    /// Uniform refinements applied before the initial condition
    pub initial_refinement: usize,
    /// Refine-and-reinterpolate cycles on the initial condition
    pub initial_adaptive_refinement: usize,
    pub max_refinement_level: usize,
    /// Refine every n steps (0 disables)
    pub refine_interval: usize,
}

impl Default for RefinementConfig {
    fn default() -> Self {
        Self {
            initial_refinement: 0,
            initial_adaptive_refinement: 0,
            max_refinement_level: 3,
            refine_interval: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Relative tolerance of the velocity CG solve
    pub velocity_tolerance: f64,
    pub velocity_max_iterations: usize,
    /// Relative tolerance of the stress mass solves
    pub stress_tolerance: f64,
    pub stress_max_iterations: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            velocity_tolerance: 1e-10,
            velocity_max_iterations: 5000,
            stress_tolerance: 1e-12,
            stress_max_iterations: 500,
        }
    }
}

/// Boundary value applied on the Dirichlet sides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryValue {
    Zero,
    /// Two-layer analytic velocity
    Exact,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BoundaryConfig {
    /// Sides with prescribed velocity; the rest are traction free
    pub dirichlet_sides: Vec<BoundarySide>,
    pub value: BoundaryValue,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            dirichlet_sides: vec![BoundarySide::Left, BoundarySide::Right, BoundarySide::Bottom],
            value: BoundaryValue::Exact,
        }
    }
}

impl SimulationConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the solver cannot run
    pub fn validate(&self) -> Result<()> {
        let d = &self.domain;
        if d.x_max <= d.x_min || d.y_max <= d.y_min {
            return Err(ViscoError::Config("domain must have positive extent".into()));
        }
        if d.nx == 0 || d.ny == 0 {
            return Err(ViscoError::Config("mesh needs at least one cell per direction".into()));
        }
        if !(1..=2).contains(&d.degree) {
            return Err(ViscoError::Config(format!(
                "element degree must be 1 or 2, got {}",
                d.degree
            )));
        }
        if self.material.shear_modulus <= 0.0 || self.material.viscosity <= 0.0 {
            return Err(ViscoError::Config("shear modulus and viscosity must be positive".into()));
        }
        if let ViscosityModel::PowerLaw { prefactor, exponent } = self.material.model {
            if prefactor < 0.0 || exponent < 1.0 {
                return Err(ViscoError::Config(
                    "power law needs prefactor >= 0 and exponent >= 1".into(),
                ));
            }
        }
        if self.fault.depth <= 0.0 || self.fault.image_terms == 0 {
            return Err(ViscoError::Config("fault depth and image terms must be positive".into()));
        }
        let ts = &self.time_stepping;
        if ts.dt_years <= 0.0 || ts.t_end_years < ts.t_start_years {
            return Err(ViscoError::Config("time step must be positive and t_end >= t_start".into()));
        }
        if ts.first_step_substeps == 0 {
            return Err(ViscoError::Config("first_step_substeps must be at least 1".into()));
        }
        if self.solver.velocity_tolerance <= 0.0 || self.solver.stress_tolerance <= 0.0 {
            return Err(ViscoError::Config("solver tolerances must be positive".into()));
        }
        if self.boundary.dirichlet_sides.is_empty() {
            return Err(ViscoError::Config(
                "at least one side needs a prescribed velocity".into(),
            ));
        }
        Ok(())
    }

    pub fn print_summary(&self) {
        let d = &self.domain;
        println!("═══════════════════════════════════════════════════════════════");
        println!("  Post-seismic Relaxation Configuration");
        println!("═══════════════════════════════════════════════════════════════");
        println!("Domain:");
        println!(
            "  x: [{:.1}, {:.1}] km, depth: [{:.1}, {:.1}] km",
            units::m_to_km(d.x_min),
            units::m_to_km(d.x_max),
            units::m_to_km(d.y_min),
            units::m_to_km(d.y_max)
        );
        println!("  Grid: {} × {} cells, Q{} elements", d.nx, d.ny, d.degree);

        println!("\nMaterial:");
        println!(
            "  μ = {:.2e} Pa, η = {:.2e} Pa·s, model: {:?}",
            self.material.shear_modulus, self.material.viscosity, self.material.model
        );

        println!("\nFault:");
        println!(
            "  Depth: {:.1} km, slip: {:.2} m ({:?})",
            units::m_to_km(self.fault.depth),
            self.fault.slip,
            self.fault.profile
        );

        let ts = &self.time_stepping;
        println!("\nTime stepping:");
        println!(
            "  {:.1} → {:.1} yr, dt = {:.3} yr, scheme {:?} (bootstrap {:?})",
            ts.t_start_years, ts.t_end_years, ts.dt_years, ts.scheme, ts.bootstrap
        );

        println!("\nBoundary:");
        println!(
            "  Dirichlet on {:?}, value {:?}",
            self.boundary.dirichlet_sides, self.boundary.value
        );
        println!("═══════════════════════════════════════════════════════════════\n");
    }
}
