//! Two-layer post-seismic reference solution
//!
//! A vertical strike-slip fault at x = 0 breaks the surface and slips down
//! to depth D through an elastic layer of thickness H = D overlying a
//! Maxwell half-space. The surface-layer response follows the image
//! solution of Nur & Mavko (1974) with relaxation time τ = 2η/μ:
//!
//! ```text
//! v(x, y, t) = s/(π τ) Σ_n w_n(t) K_n(x, y)
//! w_n(t)     = e^{-t/τ} (t/τ)^{n-1} / (n-1)!
//! ```
//!
//! Depth y is positive downwards. `simple_*` are the closed forms for
//! uniform slip; `integral_*` integrate a general slip profile with
//! composite Gauss-Legendre quadrature.

use std::f64::consts::PI;
use std::sync::Arc;

use nalgebra::Point2;

use crate::analytic::slip::{ConstantSlipFnc, CosSlipFnc, SlipFnc};
use crate::bc::BoundaryCond;
use crate::config::{SimulationConfig, SlipProfile};
use crate::fem::GaussLegendre;
use crate::ic::SpatialFunction;
use crate::mechanics::MaxwellMaterial;

/// |x| below which a point counts as lying on the fault plane (m)
const FAULT_PLANE_TOL: f64 = 1e-9;

pub struct TwoLayerAnalytic {
    fault_slip: f64,
    fault_depth: f64,
    material: MaxwellMaterial,
    slip_fnc: Arc<dyn SlipFnc>,
    images: usize,
    quadrature: GaussLegendre,
    segments: usize,
}

impl TwoLayerAnalytic {
    /// # Arguments
    /// * `fault_slip` - Maximum coseismic slip s (m)
    /// * `fault_depth` - Locking depth D = elastic thickness H (m)
    /// * `shear_modulus` - μ (Pa)
    /// * `viscosity` - Half-space viscosity η (Pa·s)
    /// * `slip_fnc` - Normalized slip profile
    pub fn new(
        fault_slip: f64,
        fault_depth: f64,
        shear_modulus: f64,
        viscosity: f64,
        slip_fnc: Arc<dyn SlipFnc>,
    ) -> Self {
        assert!(fault_depth > 0.0, "Fault depth must be positive");
        Self {
            fault_slip,
            fault_depth,
            material: MaxwellMaterial::new(shear_modulus, viscosity),
            slip_fnc,
            images: 50,
            quadrature: GaussLegendre::new(8),
            segments: 64,
        }
    }

    pub fn from_config(config: &SimulationConfig) -> Self {
        let depth = config.fault.depth;
        let slip_fnc: Arc<dyn SlipFnc> = match config.fault.profile {
            SlipProfile::Constant => Arc::new(ConstantSlipFnc::new(depth)),
            SlipProfile::Cos => Arc::new(CosSlipFnc::new(depth)),
        };
        Self::new(
            config.fault.slip,
            depth,
            config.material.shear_modulus,
            config.material.viscosity,
            slip_fnc,
        )
        .with_images(config.fault.image_terms)
    }

    /// Number of terms of the image sum
    pub fn with_images(mut self, images: usize) -> Self {
        self.images = images.max(1);
        self
    }

    /// Composite quadrature used by the `integral_*` forms
    pub fn with_quadrature(mut self, points: usize, segments: usize) -> Self {
        self.quadrature = GaussLegendre::new(points);
        self.segments = segments.max(1);
        self
    }

    /// τ = 2η/μ
    pub fn relaxation_time(&self) -> f64 {
        self.material.two_layer_relaxation_time()
    }

    /// Poisson weights w_n(t), n = 1..=images
    fn image_weights(&self, t: f64) -> Vec<f64> {
        let r = t / self.relaxation_time();
        let mut w = Vec::with_capacity(self.images);
        let mut current = (-r).exp();
        for n in 1..=self.images {
            w.push(current);
            current *= r / n as f64;
        }
        w
    }

    /// Surface-layer velocity for uniform slip (m/s)
    pub fn simple_velocity(&self, x: f64, y: f64, t: f64) -> f64 {
        if x.abs() < FAULT_PLANE_TOL {
            return 0.0;
        }
        let d = self.fault_depth;
        let h = self.fault_depth;
        let at = |num: f64| (num / x).atan();

        let sum: f64 = self
            .image_weights(t)
            .iter()
            .enumerate()
            .map(|(i, w)| {
                let c = 2.0 * (i + 1) as f64 * h;
                w * 0.5 * (at(c + d - y) - at(c - d - y) + at(c + d + y) - at(c - d + y))
            })
            .sum();
        self.fault_slip / (PI * self.relaxation_time()) * sum
    }

    /// Coseismic stress [Szx, Szy] for uniform slip (Pa)
    ///
    /// At the fault tip (0, D) the 1/r term has no value; it is replaced by
    /// its mean over a circle around the tip, which is zero.
    pub fn simple_stress(&self, x: f64, y: f64) -> [f64; 2] {
        let d = self.fault_depth;
        let f = self.material.shear_modulus * self.fault_slip / (2.0 * PI);
        let r_minus = x * x + (d - y) * (d - y);
        let r_plus = x * x + (d + y) * (d + y);
        let (tip_x, tip_y) = if r_minus > FAULT_PLANE_TOL * FAULT_PLANE_TOL {
            ((d - y) / r_minus, -x / r_minus)
        } else {
            (0.0, 0.0)
        };
        [-f * (tip_x + (d + y) / r_plus), f * (tip_y + x / r_plus)]
    }

    fn slip(&self, z: f64) -> f64 {
        self.fault_slip * self.slip_fnc.call(z)
    }

    fn integrate_fault<F: Fn(f64) -> f64>(&self, f: F) -> f64 {
        self.quadrature
            .integrate_composite(0.0, self.fault_depth, self.segments, |z| self.slip(z) * f(z))
    }

    /// Velocity for a general slip profile (m/s)
    pub fn integral_velocity(&self, x: f64, y: f64, t: f64) -> f64 {
        if x.abs() < FAULT_PLANE_TOL {
            return 0.0;
        }
        let h = self.fault_depth;
        let kernel = |c: f64| x / (x * x + (c - y) * (c - y)) + x / (x * x + (c + y) * (c + y));

        let sum: f64 = self
            .image_weights(t)
            .iter()
            .enumerate()
            .map(|(i, w)| {
                let c = 2.0 * (i + 1) as f64 * h;
                w * self.integrate_fault(|z| 0.5 * (kernel(c + z) + kernel(c - z)))
            })
            .sum();
        sum / (PI * self.relaxation_time())
    }

    /// Coseismic Szx for a general slip profile (Pa)
    pub fn integral_szx(&self, x: f64, y: f64) -> f64 {
        let dx_kernel = |c: f64| (c * c - x * x) / (x * x + c * c).powi(2);
        self.material.shear_modulus / (2.0 * PI) * self.integrate_fault(|z| dx_kernel(y - z) + dx_kernel(y + z))
    }

    /// Coseismic Szy for a general slip profile (Pa)
    pub fn integral_szy(&self, x: f64, y: f64) -> f64 {
        let dy_kernel = |c: f64| -2.0 * x * c / (x * x + c * c).powi(2);
        self.material.shear_modulus / (2.0 * PI) * self.integrate_fault(|z| dy_kernel(y - z) + dy_kernel(y + z))
    }

    /// Closed form when the slip is uniform, quadrature otherwise
    pub fn velocity(&self, x: f64, y: f64, t: f64) -> f64 {
        if self.slip_fnc.is_uniform() {
            self.simple_velocity(x, y, t)
        } else {
            self.integral_velocity(x, y, t)
        }
    }

    pub fn stress(&self, x: f64, y: f64) -> [f64; 2] {
        if self.slip_fnc.is_uniform() {
            self.simple_stress(x, y)
        } else {
            [self.integral_szx(x, y), self.integral_szy(x, y)]
        }
    }
}

/// Initial Szx from the coseismic solution
pub struct InitSzx(pub Arc<TwoLayerAnalytic>);

impl SpatialFunction for InitSzx {
    fn value(&self, p: &Point2<f64>) -> f64 {
        self.0.stress(p.x, p.y)[0]
    }
}

/// Initial Szy from the coseismic solution
pub struct InitSzy(pub Arc<TwoLayerAnalytic>);

impl SpatialFunction for InitSzy {
    fn value(&self, p: &Point2<f64>) -> f64 {
        self.0.stress(p.x, p.y)[1]
    }
}

/// Reference velocity at a fixed time
pub struct ExactVelocity {
    tla: Arc<TwoLayerAnalytic>,
    t: f64,
}

impl ExactVelocity {
    pub fn new(tla: Arc<TwoLayerAnalytic>, t: f64) -> Self {
        Self { tla, t }
    }

    pub fn set_t(&mut self, t: f64) {
        self.t = t;
    }
}

impl SpatialFunction for ExactVelocity {
    fn value(&self, p: &Point2<f64>) -> f64 {
        self.tla.velocity(p.x, p.y, self.t)
    }
}

/// Reference velocity as time-dependent boundary data
#[derive(Clone)]
pub struct SimpleVelocity {
    tla: Arc<TwoLayerAnalytic>,
    t: f64,
}

impl SimpleVelocity {
    pub fn new(tla: Arc<TwoLayerAnalytic>) -> Self {
        Self { tla, t: 0.0 }
    }
}

impl BoundaryCond for SimpleVelocity {
    fn set_t(&mut self, t: f64) {
        self.t = t;
    }

    fn time(&self) -> f64 {
        self.t
    }

    fn value_at(&self, p: &Point2<f64>, t: f64) -> f64 {
        self.tla.velocity(p.x, p.y, t)
    }

    fn box_clone(&self) -> Box<dyn BoundaryCond> {
        Box::new(self.clone())
    }
}
