use nalgebra::Point2;

use crate::mesh::{BoundarySide, StructuredMesh};

/// Degree of Freedom (DOF) handler
///
/// Scalar Lagrange fields carry one DOF per mesh node, so DOF numbers coincide
/// with node numbers. Every field of the solver (velocity and each stress
/// component) shares this numbering.
#[derive(Debug, Clone)]
pub struct DofHandler {
    mesh: StructuredMesh,
    /// Global DOFs of every cell, in cell order
    cell_dofs: Vec<Vec<usize>>,
}

impl DofHandler {
    pub fn new(mesh: &StructuredMesh) -> Self {
        let cell_dofs = (0..mesh.num_cells()).map(|c| mesh.cell_nodes(c)).collect();
        Self {
            mesh: mesh.clone(),
            cell_dofs,
        }
    }

    /// Get total number of DOFs
    pub fn total_dofs(&self) -> usize {
        self.mesh.num_nodes()
    }

    pub fn num_cells(&self) -> usize {
        self.cell_dofs.len()
    }

    pub fn dofs_per_cell(&self) -> usize {
        (self.mesh.degree + 1) * (self.mesh.degree + 1)
    }

    /// Global DOF indices of a cell (lexicographic local order)
    pub fn cell_dofs(&self, cell: usize) -> &[usize] {
        &self.cell_dofs[cell]
    }

    /// Physical location of a DOF (its Lagrange node)
    pub fn support_point(&self, dof: usize) -> Point2<f64> {
        self.mesh.node_point(dof)
    }

    /// DOFs located on one side of the domain
    pub fn boundary_dofs(&self, side: BoundarySide) -> Vec<usize> {
        self.mesh.boundary_nodes(side)
    }

    pub fn mesh(&self) -> &StructuredMesh {
        &self.mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_dof_numbering() {
        let mesh = StructuredMesh::new(0.0, 1.0, 0.0, 1.0, 2, 2, 1);
        let dofs = DofHandler::new(&mesh);

        assert_eq!(dofs.total_dofs(), 9);
        assert_eq!(dofs.num_cells(), 4);
        assert_eq!(dofs.cell_dofs(0), &[0, 1, 3, 4]);
        assert_eq!(dofs.cell_dofs(3), &[4, 5, 7, 8]);
    }

    #[test]
    fn test_quadratic_dofs_per_cell() {
        let mesh = StructuredMesh::new(0.0, 1.0, 0.0, 1.0, 3, 2, 2);
        let dofs = DofHandler::new(&mesh);

        assert_eq!(dofs.dofs_per_cell(), 9);
        assert_eq!(dofs.total_dofs(), 7 * 5);
        // Shared edge between cells 0 and 1 carries three DOFs
        let left = dofs.cell_dofs(0);
        let right = dofs.cell_dofs(1);
        let shared = left.iter().filter(|d| right.contains(d)).count();
        assert_eq!(shared, 3);
    }

    #[test]
    fn test_boundary_dofs_positions() {
        let mesh = StructuredMesh::new(-1.0, 1.0, 0.0, 2.0, 2, 2, 2);
        let dofs = DofHandler::new(&mesh);
        for dof in dofs.boundary_dofs(BoundarySide::Bottom) {
            assert_eq!(dofs.support_point(dof).y, 2.0);
        }
    }
}
