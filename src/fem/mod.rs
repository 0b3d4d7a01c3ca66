pub mod basis;
pub mod quadrature;
pub mod dof;
pub mod constraints;
pub mod matrix_free;
pub mod element;
pub mod assembly;
pub mod transfer;

pub use basis::LagrangeBasis;
pub use quadrature::{GaussLegendre, QuadRule};
pub use dof::DofHandler;
pub use constraints::Constraints;
pub use matrix_free::{FeCell, MatrixFree};
pub use element::ElementMatrix;
pub use assembly::Assembler;
pub use transfer::{interpolate_function, transfer_field};
