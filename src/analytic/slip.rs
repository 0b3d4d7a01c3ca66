use std::f64::consts::PI;

/// Normalized slip distribution s(z)/s_max along a fault of depth D
pub trait SlipFnc: Send + Sync {
    /// Profile value at depth z ∈ [0, D]
    fn call(&self, z: f64) -> f64;

    /// Fault depth D
    fn depth(&self) -> f64;

    /// True if the profile is 1 everywhere (closed-form solutions apply)
    fn is_uniform(&self) -> bool {
        false
    }
}

/// Uniform slip down to the locking depth
#[derive(Debug, Clone, Copy)]
pub struct ConstantSlipFnc {
    depth: f64,
}

impl ConstantSlipFnc {
    pub fn new(depth: f64) -> Self {
        assert!(depth > 0.0, "Fault depth must be positive");
        Self { depth }
    }
}

impl SlipFnc for ConstantSlipFnc {
    fn call(&self, z: f64) -> f64 {
        if (0.0..=self.depth).contains(&z) {
            1.0
        } else {
            0.0
        }
    }

    fn depth(&self) -> f64 {
        self.depth
    }

    fn is_uniform(&self) -> bool {
        true
    }
}

/// Slip tapering from full at the surface to zero at depth D
///
/// s(z) = cos(π z / 2D)
#[derive(Debug, Clone, Copy)]
pub struct CosSlipFnc {
    depth: f64,
}

impl CosSlipFnc {
    pub fn new(depth: f64) -> Self {
        assert!(depth > 0.0, "Fault depth must be positive");
        Self { depth }
    }
}

impl SlipFnc for CosSlipFnc {
    fn call(&self, z: f64) -> f64 {
        if (0.0..=self.depth).contains(&z) {
            (PI * z / (2.0 * self.depth)).cos()
        } else {
            0.0
        }
    }

    fn depth(&self) -> f64 {
        self.depth
    }
}
