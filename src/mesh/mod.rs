pub mod geometry;

pub use geometry::{BoundarySide, StructuredMesh};
