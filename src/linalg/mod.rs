pub mod iterative;
pub mod preconditioner;
pub mod solver;

pub use iterative::ConjugateGradient;
pub use preconditioner::{JacobiPreconditioner, Preconditioner};
pub use solver::{LinearOperator, Solver, SolverStats, SolverUtils};
