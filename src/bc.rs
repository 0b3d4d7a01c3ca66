//! Boundary Condition Module
//!
//! Time-parameterized Dirichlet data for the velocity solve. Schemes may wrap
//! a condition (see `Scheme::handle_bc`); the wrapped object is owned by the
//! caller.

use std::fmt;
use std::sync::Arc;

use nalgebra::Point2;

/// Time-dependent scalar boundary data
pub trait BoundaryCond: Send + Sync {
    /// Set the evaluation time
    fn set_t(&mut self, t: f64);

    /// Current evaluation time
    fn time(&self) -> f64;

    /// Value at an arbitrary time
    fn value_at(&self, p: &Point2<f64>, t: f64) -> f64;

    /// Value at the current evaluation time
    fn value(&self, p: &Point2<f64>) -> f64 {
        self.value_at(p, self.time())
    }

    fn box_clone(&self) -> Box<dyn BoundaryCond>;
}

impl Clone for Box<dyn BoundaryCond> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

impl fmt::Debug for dyn BoundaryCond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BoundaryCond(t = {})", self.time())
    }
}

/// Homogeneous condition
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroBc {
    t: f64,
}

impl ZeroBc {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BoundaryCond for ZeroBc {
    fn set_t(&mut self, t: f64) {
        self.t = t;
    }

    fn time(&self) -> f64 {
        self.t
    }

    fn value_at(&self, _p: &Point2<f64>, _t: f64) -> f64 {
        0.0
    }

    fn box_clone(&self) -> Box<dyn BoundaryCond> {
        Box::new(*self)
    }
}

/// Uniform value, independent of time
#[derive(Debug, Clone, Copy)]
pub struct ConstantBc {
    value: f64,
    t: f64,
}

impl ConstantBc {
    pub fn new(value: f64) -> Self {
        Self { value, t: 0.0 }
    }
}

impl BoundaryCond for ConstantBc {
    fn set_t(&mut self, t: f64) {
        self.t = t;
    }

    fn time(&self) -> f64 {
        self.t
    }

    fn value_at(&self, _p: &Point2<f64>, _t: f64) -> f64 {
        self.value
    }

    fn box_clone(&self) -> Box<dyn BoundaryCond> {
        Box::new(*self)
    }
}

/// Condition backed by a closure of (point, time)
#[derive(Clone)]
pub struct FnBc {
    f: Arc<dyn Fn(&Point2<f64>, f64) -> f64 + Send + Sync>,
    t: f64,
}

impl FnBc {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Point2<f64>, f64) -> f64 + Send + Sync + 'static,
    {
        Self { f: Arc::new(f), t: 0.0 }
    }
}

impl BoundaryCond for FnBc {
    fn set_t(&mut self, t: f64) {
        self.t = t;
    }

    fn time(&self) -> f64 {
        self.t
    }

    fn value_at(&self, p: &Point2<f64>, t: f64) -> f64 {
        (self.f)(p, t)
    }

    fn box_clone(&self) -> Box<dyn BoundaryCond> {
        Box::new(self.clone())
    }
}
