//! Moving finite element fields between meshes and sampling functions

use nalgebra::Point2;

use crate::fem::{DofHandler, LagrangeBasis};
use crate::ic::SpatialFunction;
use crate::mesh::StructuredMesh;

/// Evaluate a nodal field of `mesh` at an arbitrary point
pub fn evaluate(mesh: &StructuredMesh, values: &[f64], p: &Point2<f64>) -> f64 {
    let basis = LagrangeBasis::new(mesh.degree);
    let (cell, xi) = mesh.locate(p);
    mesh.cell_nodes(cell)
        .iter()
        .zip(basis.shape_values(&xi))
        .map(|(&node, n)| values[node] * n)
        .sum()
}

/// Interpolate a field from `old_mesh` onto the DOFs of a new mesh
///
/// Exact whenever the new mesh refines the old one with the same degree,
/// since every old shape function is reproduced on the children.
pub fn transfer_field(old_mesh: &StructuredMesh, old_values: &[f64], new_dofs: &DofHandler) -> Vec<f64> {
    assert_eq!(
        old_values.len(),
        old_mesh.num_nodes(),
        "Field size must match the source mesh"
    );
    (0..new_dofs.total_dofs())
        .map(|d| evaluate(old_mesh, old_values, &new_dofs.support_point(d)))
        .collect()
}

/// Nodal interpolation of a spatial function
pub fn interpolate_function(dofs: &DofHandler, f: &dyn SpatialFunction) -> Vec<f64> {
    (0..dofs.total_dofs())
        .map(|d| f.value(&dofs.support_point(d)))
        .collect()
}
