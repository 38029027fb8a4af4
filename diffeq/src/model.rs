use nalgebra::DVector;
use std::error::Error;

/// Trait for defining a dynamical system model that can be numerically integrated.
///
/// Types implementing this trait must define how to compute the derivative (or RHS function)
/// of the ODE at a given time and state.
pub trait OdeModel {
    /// Compute the derivative at time `t` and state `state`, storing the result in `derivative`.
    ///
    /// `derivative` has the same length as `state` when called by the solvers.
    fn f(
        &mut self,
        t: f64,
        state: &DVector<f64>,
        derivative: &mut DVector<f64>,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;
}
