//! Analytic reference solutions for verification and initial data

pub mod slip;
pub mod two_layer;

pub use slip::{ConstantSlipFnc, CosSlipFnc, SlipFnc};
pub use two_layer::{ExactVelocity, InitSzx, InitSzy, SimpleVelocity, TwoLayerAnalytic};
