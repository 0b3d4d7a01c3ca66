//! Initial Conditions Module
//!
//! Spatial functions used to initialize the velocity and stress fields by
//! nodal interpolation, and to evaluate reference solutions.

use nalgebra::Point2;

/// Scalar function of position
pub trait SpatialFunction: Send + Sync {
    fn value(&self, p: &Point2<f64>) -> f64;
}

/// f(p) = 0
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroFunction;

impl SpatialFunction for ZeroFunction {
    fn value(&self, _p: &Point2<f64>) -> f64 {
        0.0
    }
}

/// f(p) = c
#[derive(Debug, Clone, Copy)]
pub struct ConstantFunction(pub f64);

impl SpatialFunction for ConstantFunction {
    fn value(&self, _p: &Point2<f64>) -> f64 {
        self.0
    }
}

/// Adapter for closures, e.g. `FnFunction(|p| p.x * p.y)`
pub struct FnFunction<F>(pub F);

impl<F> SpatialFunction for FnFunction<F>
where
    F: Fn(&Point2<f64>) -> f64 + Send + Sync,
{
    fn value(&self, p: &Point2<f64>) -> f64 {
        (self.0)(p)
    }
}

/// Initial velocity and stress fields
pub struct InitialState<'a> {
    pub vel: &'a dyn SpatialFunction,
    pub szx: &'a dyn SpatialFunction,
    pub szy: &'a dyn SpatialFunction,
}

impl<'a> InitialState<'a> {
    pub fn new(vel: &'a dyn SpatialFunction, szx: &'a dyn SpatialFunction, szy: &'a dyn SpatialFunction) -> Self {
        Self { vel, szx, szy }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_variants() {
        let p = Point2::new(2.0, 3.0);
        assert_eq!(ZeroFunction.value(&p), 0.0);
        assert_eq!(ConstantFunction(1.5).value(&p), 1.5);
        assert_eq!(FnFunction(|p: &Point2<f64>| p.x * p.y).value(&p), 6.0);
    }
}
