/// Gauss-Legendre quadrature rules
///
/// Points live on the unit interval [0, 1]; the 2-D rule for quadrilateral
/// cells is the tensor product of the 1-D rule with itself.
#[derive(Debug, Clone)]
pub struct GaussLegendre {
    /// Integration point coordinates on [0, 1]
    pub points: Vec<f64>,
    /// Integration weights (sum to 1)
    pub weights: Vec<f64>,
}

impl GaussLegendre {
    /// n-point rule, exact for polynomials of degree 2n - 1
    ///
    /// Roots of the Legendre polynomial P_n are found by Newton iteration
    /// from the Chebyshev initial guess, then mapped from [-1, 1] to [0, 1].
    ///
    /// # Panics
    /// Panics if n == 0
    pub fn new(n: usize) -> Self {
        assert!(n > 0, "Quadrature needs at least one point");

        let mut points = vec![0.0; n];
        let mut weights = vec![0.0; n];
        let nf = n as f64;

        for i in 0..(n + 1) / 2 {
            let mut x = (std::f64::consts::PI * (i as f64 + 0.75) / (nf + 0.5)).cos();

            for _ in 0..100 {
                let (p, d) = legendre_with_derivative(n, x);
                let dx = p / d;
                x -= dx;
                if dx.abs() < 1e-15 {
                    break;
                }
            }
            let (_, dp) = legendre_with_derivative(n, x);

            let w = 2.0 / ((1.0 - x * x) * dp * dp);
            // Map [-1, 1] -> [0, 1]; weights scale by 1/2
            points[i] = 0.5 * (1.0 - x);
            points[n - 1 - i] = 0.5 * (1.0 + x);
            weights[i] = 0.5 * w;
            weights[n - 1 - i] = 0.5 * w;
        }

        Self { points, weights }
    }

    /// Get the number of integration points
    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    /// Integrate f over [a, b]
    pub fn integrate<F: Fn(f64) -> f64>(&self, a: f64, b: f64, f: F) -> f64 {
        let h = b - a;
        self.points
            .iter()
            .zip(self.weights.iter())
            .map(|(&x, &w)| w * f(a + h * x))
            .sum::<f64>()
            * h
    }

    /// Composite rule: split [a, b] into `segments` pieces of equal width
    pub fn integrate_composite<F: Fn(f64) -> f64>(&self, a: f64, b: f64, segments: usize, f: F) -> f64 {
        let segments = segments.max(1);
        let h = (b - a) / segments as f64;
        (0..segments)
            .map(|s| {
                let lo = a + s as f64 * h;
                self.integrate(lo, lo + h, &f)
            })
            .sum()
    }
}

/// Evaluate P_n(x) and P_n'(x) by the three-term recurrence
fn legendre_with_derivative(n: usize, x: f64) -> (f64, f64) {
    let mut p0 = 1.0;
    let mut p1 = x;
    if n == 0 {
        return (1.0, 0.0);
    }
    for k in 2..=n {
        let kf = k as f64;
        let p2 = ((2.0 * kf - 1.0) * x * p1 - (kf - 1.0) * p0) / kf;
        p0 = p1;
        p1 = p2;
    }
    let d = n as f64 * (x * p1 - p0) / (x * x - 1.0);
    (p1, d)
}

/// Tensor-product rule on the unit square
#[derive(Debug, Clone)]
pub struct QuadRule {
    /// Reference coordinates (ξ, η) of each point
    pub points: Vec<[f64; 2]>,
    /// Weights (sum to 1, the reference cell area)
    pub weights: Vec<f64>,
}

impl QuadRule {
    pub fn tensor(rule: &GaussLegendre) -> Self {
        let n = rule.num_points();
        let mut points = Vec::with_capacity(n * n);
        let mut weights = Vec::with_capacity(n * n);
        // ξ runs fastest, matching the lexicographic node ordering of the basis
        for qy in 0..n {
            for qx in 0..n {
                points.push([rule.points[qx], rule.points[qy]]);
                weights.push(rule.weights[qx] * rule.weights[qy]);
            }
        }
        Self { points, weights }
    }

    pub fn num_points(&self) -> usize {
        self.points.len()
    }
}
