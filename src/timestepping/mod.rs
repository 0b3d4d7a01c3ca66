//! Time step control for the stress update
//!
//! Stability and accuracy limits of the explicit relaxation term.

pub mod adaptive;

pub use adaptive::{compute_relaxation_limit, TimestepLimit};
