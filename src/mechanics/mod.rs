/// Rheology for antiplane viscoelastic relaxation
///
/// - Inverse-viscosity fields evaluated at quadrature points
/// - Linear Maxwell material parameters

pub mod inv_visc;
pub mod maxwell;

pub use inv_visc::{
    ConstantInvViscosity, InvViscosity, InvViscosityTla, PowerLawInvViscosity, StressState,
};
pub use maxwell::MaxwellMaterial;
