use crate::TwError;

/// Absolute and relative slack used when snapping float results to whole numbers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tolerances {
    pub abs: f64,
    pub rel: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-9,
            rel: 1e-12,
        }
    }
}

pub fn nearly_equal(a: f64, b: f64, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    diff <= tol.abs || diff <= tol.rel * a.abs().max(b.abs())
}

/// Smallest integer not below `x`, where `x` within tolerance of an integer counts as
/// that integer. `3600.0 / 0.1` yields 36000, not 36001.
pub fn ceil_within(x: f64, tol: Tolerances) -> f64 {
    let rounded = x.round();
    if nearly_equal(x, rounded, tol) {
        rounded
    } else {
        x.ceil()
    }
}

pub fn ensure_finite(v: f64, what: &'static str) -> Result<f64, TwError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(TwError::NonFinite { what, value: v })
    }
}

/// Reject non-finite or non-positive values (step sizes, time constants, gains).
pub fn ensure_positive(v: f64, what: &'static str) -> Result<f64, TwError> {
    let v = ensure_finite(v, what)?;
    if v > 0.0 {
        Ok(v)
    } else {
        Err(TwError::InvalidArg { what })
    }
}

/// Clamp a normalized signal (valve/damper position, control output) to [0, 1].
pub fn clamp_unit(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}
