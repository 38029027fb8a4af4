use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Relative and absolute tolerance used by `odeint`-style integrators when no
/// tolerance is requested explicitly.
pub const DEFAULT_TOLERANCE: f64 = 1.49012e-8;

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum ToleranceErrors {
    #[error("relative tolerance must be finite and non-negative, got {0}")]
    InvalidRelative(f64),
    #[error("absolute tolerance must be finite and non-negative, got {0}")]
    InvalidAbsolute(f64),
    #[error("relative and absolute tolerance cannot both be zero")]
    BothZero,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tolerances {
    pub rel_tol: f64,
    pub abs_tol: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            rel_tol: DEFAULT_TOLERANCE,
            abs_tol: DEFAULT_TOLERANCE,
        }
    }
}

impl Tolerances {
    pub fn new(rel_tol: f64, abs_tol: f64) -> Result<Self, ToleranceErrors> {
        let tolerances = Self { rel_tol, abs_tol };
        tolerances.validate()?;
        Ok(tolerances)
    }

    pub fn validate(&self) -> Result<(), ToleranceErrors> {
        if !self.rel_tol.is_finite() || self.rel_tol < 0.0 {
            return Err(ToleranceErrors::InvalidRelative(self.rel_tol));
        }
        if !self.abs_tol.is_finite() || self.abs_tol < 0.0 {
            return Err(ToleranceErrors::InvalidAbsolute(self.abs_tol));
        }
        if self.rel_tol == 0.0 && self.abs_tol == 0.0 {
            return Err(ToleranceErrors::BothZero);
        }
        Ok(())
    }

    pub fn check_error(&self, x0: f64, xf: f64) -> bool {
        check_error(x0, xf, self.rel_tol, self.abs_tol)
    }

    /// Scaled component error, see [`compute_error`].
    pub fn compute_error(&self, x: f64, x_prev: f64, x_tilde: f64) -> f64 {
        compute_error(x, x_prev, x_tilde, self.rel_tol, self.abs_tol)
    }

    /// Root-mean-square of the scaled component errors.
    ///
    /// All three slices must have the same length. An empty state has zero error.
    pub fn rms_error(&self, x: &[f64], x_prev: &[f64], x_tilde: &[f64]) -> f64 {
        if x.is_empty() {
            return 0.0;
        }
        let sum_squared_errors: f64 = x
            .iter()
            .zip(x_prev)
            .zip(x_tilde)
            .map(|((&x, &x_prev), &x_tilde)| self.compute_error(x, x_prev, x_tilde).powi(2))
            .sum();
        (sum_squared_errors / x.len() as f64).sqrt()
    }
}

/// Returns true when `xf` is within either tolerance of `x0`.
pub fn check_error(x0: f64, xf: f64, rel_tol: f64, abs_tol: f64) -> bool {
    let abs_diff = (xf - x0).abs();
    let rel_diff = if x0.abs() > 1e-10 {
        abs_diff / x0.abs()
    } else {
        0.0
    };
    abs_diff <= abs_tol || rel_diff <= rel_tol
}

/// Difference between a solution component `x` and its embedded estimate
/// `x_tilde`, scaled by `abs_tol + rel_tol * max(|x|, |x_prev|)`.
///
/// A value below one means the component is within tolerance.
pub fn compute_error(x: f64, x_prev: f64, x_tilde: f64, rel_tol: f64, abs_tol: f64) -> f64 {
    let scale = abs_tol + rel_tol * x.abs().max(x_prev.abs());
    (x - x_tilde).abs() / scale
}
