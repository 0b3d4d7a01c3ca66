use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Side of the rectangular domain
///
/// The y axis points downwards (depth), so `Top` is the free surface y = y_min.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundarySide {
    /// x = x_min
    Left,
    /// x = x_max
    Right,
    /// y = y_min (surface)
    Top,
    /// y = y_max
    Bottom,
}

impl BoundarySide {
    pub fn all() -> [BoundarySide; 4] {
        [BoundarySide::Left, BoundarySide::Right, BoundarySide::Top, BoundarySide::Bottom]
    }
}

/// Structured mesh of axis-aligned rectangular cells
///
/// Cells are numbered row by row (`c = j * nx + i`), which is also the
/// traversal order of every cell loop. Nodes form a (nx·p + 1) × (ny·p + 1)
/// grid for polynomial degree p and are numbered with x running fastest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredMesh {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    pub nx: usize,
    pub ny: usize,
    /// Polynomial degree of the nodal grid
    pub degree: usize,
    /// Number of uniform refinements applied since construction
    pub level: usize,
}

impl StructuredMesh {
    /// # Panics
    /// Panics on an empty or inverted domain
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64, nx: usize, ny: usize, degree: usize) -> Self {
        assert!(x_max > x_min && y_max > y_min, "Domain must have positive extent");
        assert!(nx > 0 && ny > 0, "Mesh needs at least one cell per direction");
        assert!(degree > 0, "Degree must be positive");

        Self { x_min, x_max, y_min, y_max, nx, ny, degree, level: 0 }
    }

    pub fn num_cells(&self) -> usize {
        self.nx * self.ny
    }

    /// Nodes along x
    pub fn nodes_x(&self) -> usize {
        self.nx * self.degree + 1
    }

    /// Nodes along y
    pub fn nodes_y(&self) -> usize {
        self.ny * self.degree + 1
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes_x() * self.nodes_y()
    }

    /// Cell size (hx, hy)
    pub fn cell_size(&self) -> (f64, f64) {
        (
            (self.x_max - self.x_min) / self.nx as f64,
            (self.y_max - self.y_min) / self.ny as f64,
        )
    }

    pub fn min_cell_size(&self) -> f64 {
        let (hx, hy) = self.cell_size();
        hx.min(hy)
    }

    /// Grid position (i, j) of a cell
    pub fn cell_index(&self, cell: usize) -> (usize, usize) {
        (cell % self.nx, cell / self.nx)
    }

    pub fn node_point(&self, node: usize) -> Point2<f64> {
        let nxn = self.nodes_x();
        let (ii, jj) = (node % nxn, node / nxn);
        let p = self.degree as f64;
        let (hx, hy) = self.cell_size();
        Point2::new(
            self.x_min + ii as f64 * hx / p,
            self.y_min + jj as f64 * hy / p,
        )
    }

    /// Global node indices of a cell in lexicographic local order
    pub fn cell_nodes(&self, cell: usize) -> Vec<usize> {
        let (i, j) = self.cell_index(cell);
        let p = self.degree;
        let nxn = self.nodes_x();
        let mut nodes = Vec::with_capacity((p + 1) * (p + 1));
        for b in 0..=p {
            for a in 0..=p {
                nodes.push((j * p + b) * nxn + i * p + a);
            }
        }
        nodes
    }

    /// Map reference coordinates of a cell to the physical point
    pub fn map_to_physical(&self, cell: usize, xi: &[f64; 2]) -> Point2<f64> {
        let (i, j) = self.cell_index(cell);
        let (hx, hy) = self.cell_size();
        Point2::new(
            self.x_min + (i as f64 + xi[0]) * hx,
            self.y_min + (j as f64 + xi[1]) * hy,
        )
    }

    /// Find the cell containing p and its reference coordinates
    ///
    /// Points outside the domain are clamped onto the nearest cell, so the
    /// reference coordinates may fall slightly outside [0, 1].
    pub fn locate(&self, p: &Point2<f64>) -> (usize, [f64; 2]) {
        let (hx, hy) = self.cell_size();
        let sx = (p.x - self.x_min) / hx;
        let sy = (p.y - self.y_min) / hy;
        let i = (sx.floor().max(0.0) as usize).min(self.nx - 1);
        let j = (sy.floor().max(0.0) as usize).min(self.ny - 1);
        (j * self.nx + i, [sx - i as f64, sy - j as f64])
    }

    /// Nodes lying on one side of the domain, in increasing order
    pub fn boundary_nodes(&self, side: BoundarySide) -> Vec<usize> {
        let (nxn, nyn) = (self.nodes_x(), self.nodes_y());
        match side {
            BoundarySide::Left => (0..nyn).map(|jj| jj * nxn).collect(),
            BoundarySide::Right => (0..nyn).map(|jj| jj * nxn + nxn - 1).collect(),
            BoundarySide::Top => (0..nxn).collect(),
            BoundarySide::Bottom => (0..nxn).map(|ii| (nyn - 1) * nxn + ii).collect(),
        }
    }

    /// Uniformly refined copy: every cell split into four
    pub fn refined(&self) -> Self {
        Self {
            nx: self.nx * 2,
            ny: self.ny * 2,
            level: self.level + 1,
            ..self.clone()
        }
    }
}
