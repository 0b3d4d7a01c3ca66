//! Mesh and finite element context shared by all solver components
//!
//! `ProblemData` owns the mesh, the DOF handler and the material handles.
//! Every refinement event bumps a generation counter; components that cache
//! mesh-dependent data record the generation at `reinit` and refuse to step
//! once it no longer matches.

use std::sync::Arc;

use log::{debug, info};

use crate::config::{SimulationConfig, SolverConfig, ViscosityModel};
use crate::error::Result;
use crate::fem::DofHandler;
use crate::mechanics::{ConstantInvViscosity, InvViscosity, InvViscosityTla, PowerLawInvViscosity};
use crate::mesh::{BoundarySide, StructuredMesh};

pub struct ProblemData {
    mesh: StructuredMesh,
    dofs: DofHandler,
    shear_modulus: f64,
    inv_visc: Arc<dyn InvViscosity>,
    solver: SolverConfig,
    dirichlet_sides: Vec<BoundarySide>,
    max_refinement_level: usize,
    generation: u64,
    refine_flagged: bool,
}

impl ProblemData {
    /// # Arguments
    /// * `mesh` - Initial mesh
    /// * `shear_modulus` - μ (Pa)
    /// * `inv_visc` - Inverse-viscosity field
    ///
    /// # Panics
    /// Panics if μ ≤ 0
    pub fn new(mesh: StructuredMesh, shear_modulus: f64, inv_visc: Arc<dyn InvViscosity>) -> Self {
        assert!(shear_modulus > 0.0, "Shear modulus must be positive");
        let dofs = DofHandler::new(&mesh);
        Self {
            mesh,
            dofs,
            shear_modulus,
            inv_visc,
            solver: SolverConfig::default(),
            dirichlet_sides: vec![BoundarySide::Left, BoundarySide::Right, BoundarySide::Bottom],
            max_refinement_level: 3,
            generation: 0,
            refine_flagged: false,
        }
    }

    pub fn with_solver(mut self, solver: SolverConfig) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_dirichlet_sides(mut self, sides: Vec<BoundarySide>) -> Self {
        self.dirichlet_sides = sides;
        self
    }

    pub fn with_max_refinement_level(mut self, level: usize) -> Self {
        self.max_refinement_level = level;
        self
    }

    /// Build mesh and material from a validated configuration
    pub fn from_config(config: &SimulationConfig) -> Result<Self> {
        config.validate()?;
        let d = &config.domain;
        let mut mesh = StructuredMesh::new(d.x_min, d.x_max, d.y_min, d.y_max, d.nx, d.ny, d.degree);
        for _ in 0..config.refinement.initial_refinement {
            mesh = mesh.refined();
        }

        let m = &config.material;
        let inv_visc: Arc<dyn InvViscosity> = match m.model {
            ViscosityModel::Constant => Arc::new(ConstantInvViscosity::new(m.viscosity)),
            ViscosityModel::TwoLayer => Arc::new(InvViscosityTla::new(config.fault.depth, m.viscosity)),
            ViscosityModel::PowerLaw { prefactor, exponent } => {
                Arc::new(PowerLawInvViscosity::new(prefactor, exponent))
            }
        };
        info!(
            "Problem: {} cells, {} DOFs per field, {} inverse viscosity",
            mesh.num_cells(),
            mesh.num_nodes(),
            inv_visc.name()
        );

        Ok(Self::new(mesh, m.shear_modulus, inv_visc)
            .with_solver(config.solver.clone())
            .with_dirichlet_sides(config.boundary.dirichlet_sides.clone())
            .with_max_refinement_level(config.refinement.max_refinement_level))
    }

    pub fn mesh(&self) -> &StructuredMesh {
        &self.mesh
    }

    pub fn dofs(&self) -> &DofHandler {
        &self.dofs
    }

    pub fn n_dofs(&self) -> usize {
        self.dofs.total_dofs()
    }

    pub fn shear_modulus(&self) -> f64 {
        self.shear_modulus
    }

    pub fn inv_viscosity(&self) -> &Arc<dyn InvViscosity> {
        &self.inv_visc
    }

    pub fn solver(&self) -> &SolverConfig {
        &self.solver
    }

    pub fn dirichlet_sides(&self) -> &[BoundarySide] {
        &self.dirichlet_sides
    }

    /// Mesh generation; incremented by every refinement event
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Flag the mesh for uniform refinement
    ///
    /// Returns false when the maximum refinement level is reached.
    pub fn start_refine(&mut self) -> bool {
        self.refine_flagged = self.mesh.level < self.max_refinement_level;
        if !self.refine_flagged {
            debug!("Refinement skipped: mesh at maximum level {}", self.mesh.level);
        }
        self.refine_flagged
    }

    /// Carry out the flagged refinement
    ///
    /// The generation advances even if nothing was flagged: solution vectors
    /// and cached contexts must be rebuilt after every refinement event.
    pub fn execute_refine(&mut self) -> bool {
        let refined = std::mem::take(&mut self.refine_flagged);
        if refined {
            self.mesh = self.mesh.refined();
            self.dofs = DofHandler::new(&self.mesh);
        }
        self.generation += 1;
        info!(
            "Refinement event {}: {} cells (level {})",
            self.generation,
            self.mesh.num_cells(),
            self.mesh.level
        );
        refined
    }
}
