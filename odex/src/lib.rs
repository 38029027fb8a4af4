//! ODE definitions bound to plot-ready solutions.
//!
//! An [`Ode`] wraps one of the built-in systems ([`OdeKind`]) together with an
//! error flag. An [`OdeSolver`] binds it to an initial state and a set of
//! sample times and keeps the resulting [`Solution`] until one of those inputs
//! changes, recomputing it on the next read.
//!
//! ```
//! use odex::{LorenzEquation, OdeSolver, SolverErrors, TimeSpan};
//!
//! # fn main() -> Result<(), SolverErrors> {
//! let mut solver = OdeSolver::new(LorenzEquation::default())
//!     .with_initial_state(vec![10.0, 50.0, 50.0])?
//!     .with_times(TimeSpan::linspace(0.0, 1.0, 100))?;
//! let x = solver.solution().map(|s| s.y[(1, 0)]);
//! assert!(x.is_some());
//!
//! solver.set_parameter("r", 20.0)?; // stale, recomputed on the next read
//! assert!(solver.is_stale());
//! assert_eq!(solver.solution().map(|s| s.len()), Some(101));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod observer;
pub mod ode;
pub mod solution;
pub mod solver;
pub mod time_span;

pub use config::{ConfigErrors, ProblemConfig};
pub use observer::{SharedObserver, SolutionEvent, SolutionObserver};
pub use ode::{
    EpidemicOde, GenericOde, LinearOde, LorenzEquation, Ode, OdeErrors, OdeKind, OdeSystem,
    Parameter,
};
pub use odex_diffeq::{
    AdaptiveStepControl, FixedStepControl, RungeKuttaMethods, Solver, Stats, StepMethods,
};
pub use solution::Solution;
pub use solver::{OdeSolver, SolverErrors};
pub use time_span::{TimeSpan, TimeSpanErrors};
