pub mod error;
pub mod utils;
pub mod mesh;
pub mod fem;
pub mod linalg;
pub mod mechanics;
pub mod ic;     // Initial conditions
pub mod bc;     // Boundary conditions
pub mod config;
pub mod problem;
pub mod solution;
pub mod scheme;
pub mod stress;
pub mod velocity;
pub mod analytic;
pub mod timestepping;
pub mod driver;

/// Spatial dimension; stress has one component per direction
pub const DIM: usize = 2;

pub use error::{Result, ViscoError};
pub use mesh::{BoundarySide, StructuredMesh};
pub use fem::{Assembler, Constraints, DofHandler, ElementMatrix, LagrangeBasis, MatrixFree};
pub use linalg::{ConjugateGradient, JacobiPreconditioner, LinearOperator, Solver};
pub use mechanics::{ConstantInvViscosity, InvViscosity, InvViscosityTla, MaxwellMaterial, PowerLawInvViscosity};
pub use ic::{InitialState, SpatialFunction};
pub use bc::{BoundaryCond, ConstantBc, FnBc, ZeroBc};
pub use config::SimulationConfig;
pub use problem::ProblemData;
pub use solution::{Solution, StepState};
pub use scheme::{build_scheme, Bdf2, BootstrapPolicy, FwdEuler, OpFactory, Scheme, StepCoefficients, StepPhase};
pub use stress::{Stress, StressOp};
pub use velocity::Velocity;
pub use analytic::{ExactVelocity, TwoLayerAnalytic};
pub use timestepping::{compute_relaxation_limit, TimestepLimit};
pub use driver::{RunSummary, SimpleSolver};
pub use utils::units;
