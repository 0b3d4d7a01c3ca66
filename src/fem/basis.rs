use nalgebra::Vector2;

/// Tensor-product Lagrange basis on the unit square
///
/// Degree p uses (p+1)² nodes on an equispaced grid. Local node (a, b)
/// sits at (a/p, b/p) and has index `b * (p + 1) + a` (ξ runs fastest).
///
/// Degree 1 is the bilinear Q1 element, degree 2 the biquadratic Q2 element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LagrangeBasis {
    degree: usize,
}

impl LagrangeBasis {
    /// # Panics
    /// Panics unless degree is 1 or 2
    pub fn new(degree: usize) -> Self {
        assert!(
            degree == 1 || degree == 2,
            "Only Q1 and Q2 elements are supported, got degree {}",
            degree
        );
        Self { degree }
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Nodes per direction (p + 1)
    pub fn nodes_per_direction(&self) -> usize {
        self.degree + 1
    }

    /// Nodes per cell (p + 1)²
    pub fn num_nodes(&self) -> usize {
        self.nodes_per_direction() * self.nodes_per_direction()
    }

    /// 1-D Lagrange polynomial values at t
    fn values_1d(&self, t: f64) -> Vec<f64> {
        let p = self.degree;
        (0..=p)
            .map(|a| {
                let ta = a as f64 / p as f64;
                (0..=p)
                    .filter(|&k| k != a)
                    .map(|k| {
                        let tk = k as f64 / p as f64;
                        (t - tk) / (ta - tk)
                    })
                    .product()
            })
            .collect()
    }

    /// 1-D Lagrange polynomial derivatives at t
    fn derivatives_1d(&self, t: f64) -> Vec<f64> {
        let p = self.degree;
        (0..=p)
            .map(|a| {
                let ta = a as f64 / p as f64;
                let mut sum = 0.0;
                for m in (0..=p).filter(|&m| m != a) {
                    let tm = m as f64 / p as f64;
                    let mut term = 1.0 / (ta - tm);
                    for k in (0..=p).filter(|&k| k != a && k != m) {
                        let tk = k as f64 / p as f64;
                        term *= (t - tk) / (ta - tk);
                    }
                    sum += term;
                }
                sum
            })
            .collect()
    }

    /// Shape function values N_i(ξ, η)
    pub fn shape_values(&self, xi: &[f64; 2]) -> Vec<f64> {
        let nx = self.values_1d(xi[0]);
        let ny = self.values_1d(xi[1]);
        let n = self.nodes_per_direction();
        let mut out = Vec::with_capacity(n * n);
        for b in 0..n {
            for a in 0..n {
                out.push(nx[a] * ny[b]);
            }
        }
        out
    }

    /// Shape function gradients with respect to reference coordinates
    pub fn shape_gradients(&self, xi: &[f64; 2]) -> Vec<Vector2<f64>> {
        let nx = self.values_1d(xi[0]);
        let ny = self.values_1d(xi[1]);
        let dx = self.derivatives_1d(xi[0]);
        let dy = self.derivatives_1d(xi[1]);
        let n = self.nodes_per_direction();
        let mut out = Vec::with_capacity(n * n);
        for b in 0..n {
            for a in 0..n {
                out.push(Vector2::new(dx[a] * ny[b], nx[a] * dy[b]));
            }
        }
        out
    }

    /// Reference coordinates of local node i
    pub fn node_position(&self, i: usize) -> [f64; 2] {
        let n = self.nodes_per_direction();
        let p = self.degree as f64;
        [(i % n) as f64 / p, (i / n) as f64 / p]
    }
}
