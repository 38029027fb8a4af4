//! Explicit Runge-Kutta integration of first-order ODE systems.
//!
//! A model implements [`OdeModel`]; a [`Solver`] pairs a method with a step
//! size strategy and integrates the model from an initial state, reporting the
//! state exactly at each requested sample time.
//!
//! ```ignore
//! let trajectory = Solver::default().integrate(&mut model, &[10.0, 50.0, 50.0], &times)?;
//! let x_at_t1 = trajectory.y[(1, 0)];
//! ```

use std::error::Error;

use thiserror::Error;
use tolerance::ToleranceErrors;

pub mod model;
pub mod result;
pub mod rk;
pub mod solvers;
pub mod stepping;
pub mod tableau;

pub use model::OdeModel;
pub use result::{Stats, Trajectory};
pub use solvers::{RungeKuttaMethods, Solver};
pub use stepping::{AdaptiveStepControl, FixedStepControl, StepMethods};

#[derive(Debug, Error)]
pub enum IntegrationErrors {
    #[error("model evaluation failed at t = {t}: {source}")]
    Model {
        t: f64,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    #[error("state became non-finite at t = {0}")]
    NonFinite(f64),
    #[error("initial state component {0} is not finite")]
    NonFiniteInitialState(usize),
    #[error("step size {dt:e} is too small at t = {t}")]
    StepSizeUnderflow { t: f64, dt: f64 },
    #[error("maximum number of steps ({0}) exceeded")]
    MaxStepsExceeded(usize),
    #[error("sample times must be finite and non-decreasing, got {value} at index {index}")]
    NonMonotonicTimes { index: usize, value: f64 },
    #[error("{0} cannot be used with adaptive step methods")]
    NotAdaptive(&'static str),
    #[error("fixed step size must be finite and positive, got {0}")]
    InvalidStep(f64),
    #[error("{0}")]
    Tolerance(#[from] ToleranceErrors),
}
