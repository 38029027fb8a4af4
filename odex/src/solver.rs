use std::{error::Error, fmt};

use nalgebra::DVector;
use odex_diffeq::{IntegrationErrors, OdeModel, Solver};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    observer::{SolutionEvent, SolutionObserver},
    ode::{Ode, OdeErrors, OdeKind},
    solution::Solution,
    time_span::{TimeSpan, TimeSpanErrors},
};

#[derive(Debug, Error)]
pub enum SolverErrors {
    #[error("initial state has {got} components but the ode has {expected} variables")]
    InitialStateLength { expected: usize, got: usize },
    #[error("{0}")]
    Integration(#[from] IntegrationErrors),
    #[error("{0}")]
    Ode(#[from] OdeErrors),
    #[error("{0}")]
    TimeSpan(#[from] TimeSpanErrors),
}

/// Adapts an [`Ode`] to the integrator's model interface.
struct OdeFunction<'a>(&'a Ode);

impl OdeModel for OdeFunction<'_> {
    fn f(
        &mut self,
        t: f64,
        state: &DVector<f64>,
        derivative: &mut DVector<f64>,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let value = self.0.try_evaluate(state.as_slice(), t)?;
        derivative.copy_from(&value);
        Ok(())
    }
}

struct Cached {
    inputs: u64,
    revision: u64,
    result: Result<Solution, SolverErrors>,
}

/// Binds an ODE to an initial state and sample times and keeps the solution.
///
/// Setters only mark the cached solution stale; [`OdeSolver::solution`]
/// recomputes it on the next read. Observers are told about every
/// invalidation, every new solution and every failure.
pub struct OdeSolver {
    ode: Ode,
    initial_state: Vec<f64>,
    time_span: TimeSpan,
    times: Vec<f64>,
    integrator: Solver,
    // bumped whenever anything other than the ode itself changes
    inputs: u64,
    cache: Option<Cached>,
    last_good: Option<Solution>,
    observers: Vec<Box<dyn SolutionObserver>>,
}

impl fmt::Debug for OdeSolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OdeSolver")
            .field("ode", &self.ode)
            .field("initial_state", &self.initial_state)
            .field("time_span", &self.time_span)
            .field("integrator", &self.integrator)
            .field("stale", &self.is_stale())
            .field("observers", &self.observers.len())
            .finish()
    }
}

fn midpoints(ode: &Ode) -> Vec<f64> {
    ode.default_domain()
        .iter()
        .map(|(low, high)| (low + high) / 2.0)
        .collect()
}

impl OdeSolver {
    /// A solver with the initial state at the middle of the ODE's default
    /// domain and the default time span.
    pub fn new(ode: impl Into<Ode>) -> Self {
        let ode = ode.into();
        let time_span = TimeSpan::default();
        let times = time_span.times().unwrap_or_default();
        Self {
            initial_state: midpoints(&ode),
            ode,
            time_span,
            times,
            integrator: Solver::default(),
            inputs: 0,
            cache: None,
            last_good: None,
            observers: Vec::new(),
        }
    }

    pub fn with_initial_state(mut self, initial_state: Vec<f64>) -> Result<Self, SolverErrors> {
        self.set_initial_state(initial_state)?;
        Ok(self)
    }

    pub fn with_times(mut self, time_span: TimeSpan) -> Result<Self, SolverErrors> {
        self.set_times(time_span)?;
        Ok(self)
    }

    pub fn with_integrator(mut self, integrator: Solver) -> Result<Self, SolverErrors> {
        self.set_integrator(integrator)?;
        Ok(self)
    }

    pub fn ode(&self) -> &Ode {
        &self.ode
    }

    pub fn initial_state(&self) -> &[f64] {
        &self.initial_state
    }

    pub fn time_span(&self) -> &TimeSpan {
        &self.time_span
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn integrator(&self) -> &Solver {
        &self.integrator
    }

    pub fn add_observer(&mut self, observer: impl SolutionObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    fn notify(observers: &mut [Box<dyn SolutionObserver>], event: SolutionEvent<'_>) {
        for observer in observers.iter_mut() {
            observer.observe(&event);
        }
    }

    fn invalidate(&mut self) {
        self.inputs += 1;
        Self::notify(&mut self.observers, SolutionEvent::Invalidated);
    }

    /// Whether the next call to [`OdeSolver::solution`] recomputes.
    pub fn is_stale(&self) -> bool {
        match &self.cache {
            Some(cached) => cached.inputs != self.inputs || cached.revision != self.ode.revision(),
            None => true,
        }
    }

    pub fn set_initial_state(&mut self, initial_state: Vec<f64>) -> Result<(), SolverErrors> {
        let expected = self.ode.num_vars();
        if initial_state.len() != expected {
            return Err(SolverErrors::InitialStateLength {
                expected,
                got: initial_state.len(),
            });
        }
        if initial_state != self.initial_state {
            self.initial_state = initial_state;
            self.invalidate();
        }
        Ok(())
    }

    /// Moves the initial state to the middle of the ODE's default domain.
    pub fn reset_initial_state(&mut self) {
        let initial_state = midpoints(&self.ode);
        info!(
            "resetting initial state of {} to {:?}",
            self.ode.name(),
            initial_state
        );
        self.initial_state = initial_state;
        self.invalidate();
    }

    pub fn set_times(&mut self, time_span: TimeSpan) -> Result<(), SolverErrors> {
        let times = time_span.times()?;
        self.time_span = time_span;
        if times != self.times {
            self.times = times;
            self.invalidate();
        }
        Ok(())
    }

    /// Samples `count + 1` evenly spaced times on `[start, stop]`.
    pub fn set_time_range(
        &mut self,
        start: f64,
        stop: f64,
        count: usize,
    ) -> Result<(), SolverErrors> {
        self.set_times(TimeSpan::linspace(start, stop, count))
    }

    pub fn set_integrator(&mut self, integrator: Solver) -> Result<(), SolverErrors> {
        integrator.validate()?;
        if integrator != self.integrator {
            self.integrator = integrator;
            self.invalidate();
        }
        Ok(())
    }

    pub fn set_parameter(&mut self, name: &str, value: f64) -> Result<(), SolverErrors> {
        self.ode.set_parameter(name, value)?;
        Self::notify(&mut self.observers, SolutionEvent::Invalidated);
        Ok(())
    }

    /// Mutates the ODE in place. If the number of variables changes, the
    /// initial state is reset.
    pub fn update_ode<R>(&mut self, f: impl FnOnce(&mut OdeKind) -> R) -> R {
        let num_vars = self.ode.num_vars();
        let result = self.ode.update(f);
        if self.ode.num_vars() != num_vars {
            self.reset_initial_state();
        } else {
            Self::notify(&mut self.observers, SolutionEvent::Invalidated);
        }
        result
    }

    /// Replaces the ODE. If the number of variables differs, the initial state
    /// is reset.
    pub fn set_ode(&mut self, ode: impl Into<Ode>) {
        let num_vars = self.ode.num_vars();
        self.ode = ode.into();
        if self.ode.num_vars() != num_vars {
            self.reset_initial_state();
        } else {
            self.invalidate();
        }
    }

    /// Evaluates the derivative at the initial state, recording failure in
    /// the ODE's error flag.
    pub fn evaluate_initial_state(&mut self, t: f64) -> Option<DVector<f64>> {
        self.ode.evaluate(&self.initial_state, t)
    }

    /// Integrates the ODE from the initial state at the sample times.
    ///
    /// This neither reads nor writes the cache.
    pub fn solve(&self) -> Result<Solution, SolverErrors> {
        let expected = self.ode.num_vars();
        if self.initial_state.len() != expected {
            return Err(SolverErrors::InitialStateLength {
                expected,
                got: self.initial_state.len(),
            });
        }
        let trajectory = self.integrator.integrate(
            &mut OdeFunction(&self.ode),
            &self.initial_state,
            &self.times,
        )?;
        Ok(Solution {
            t: trajectory.t,
            y: trajectory.y,
            variables: self.ode.variables().to_vec(),
            stats: trajectory.stats,
        })
    }

    fn refresh(&mut self) {
        if !self.is_stale() {
            return;
        }
        debug!(
            "solving {} over {} samples",
            self.ode.name(),
            self.times.len()
        );
        let result = self.solve();
        match &result {
            Ok(solution) => {
                self.ode.set_error(false);
                self.last_good = Some(solution.clone());
                Self::notify(&mut self.observers, SolutionEvent::Updated(solution));
            }
            Err(e) => {
                warn!("solving {} failed: {e}", self.ode.name());
                self.ode.set_error(true);
                Self::notify(&mut self.observers, SolutionEvent::Failed(e));
            }
        }
        self.cache = Some(Cached {
            inputs: self.inputs,
            revision: self.ode.revision(),
            result,
        });
    }

    /// The solution for the current inputs, recomputed if any of them changed.
    ///
    /// Returns `None` if the computation failed; the error is available from
    /// [`OdeSolver::last_error`] and the ODE's error flag is set.
    pub fn solution(&mut self) -> Option<&Solution> {
        self.refresh();
        self.cache.as_ref()?.result.as_ref().ok()
    }

    /// The error of the most recent computation, if it failed.
    pub fn last_error(&self) -> Option<&SolverErrors> {
        self.cache.as_ref()?.result.as_ref().err()
    }

    /// The most recent successful solution. It may belong to older inputs;
    /// its own `t` says which times it covers.
    pub fn last_good_solution(&self) -> Option<&Solution> {
        self.last_good.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ode::{GenericOde, LorenzEquation};
    use approx::assert_abs_diff_eq;
    use odex_diffeq::RungeKuttaMethods;
    use std::{cell::RefCell, rc::Rc};

    fn decay() -> OdeSolver {
        OdeSolver::new(GenericOde::default())
            .with_initial_state(vec![1.0])
            .unwrap()
            .with_times(TimeSpan::linspace(0.0, 1.0, 10))
            .unwrap()
    }

    #[test]
    fn new_uses_domain_midpoints_and_default_times() {
        let solver = OdeSolver::new(LorenzEquation::default());
        assert_eq!(solver.initial_state(), &[5.0, 5.0, 5.0]);
        assert_eq!(solver.times().len(), 1001);
        assert!(solver.is_stale());
    }

    #[test]
    fn solution_is_cached_until_an_input_changes() {
        let mut solver = decay();
        let evaluations = solver.solution().unwrap().stats.evaluations;
        assert!(evaluations > 0);
        assert!(!solver.is_stale());
        solver.solution().unwrap();
        assert!(!solver.is_stale());

        solver.set_initial_state(vec![1.0]).unwrap();
        assert!(!solver.is_stale());
        solver.set_initial_state(vec![2.0]).unwrap();
        assert!(solver.is_stale());
        let solution = solver.solution().unwrap();
        assert_abs_diff_eq!(solution.y[(10, 0)], 2.0 * (-1.0f64).exp(), epsilon = 1e-7);
    }

    #[test]
    fn solution_shape_matches_inputs() {
        let mut solver = decay();
        let times = solver.times().to_vec();
        let solution = solver.solution().unwrap();
        assert_eq!(solution.y.nrows(), 11);
        assert_eq!(solution.y.ncols(), 1);
        assert_eq!(solution.t, times);
    }

    #[test]
    fn wrong_initial_state_length_is_rejected() {
        let mut solver = decay();
        assert!(matches!(
            solver.set_initial_state(vec![1.0, 2.0]),
            Err(SolverErrors::InitialStateLength {
                expected: 1,
                got: 2
            })
        ));
        assert_eq!(solver.initial_state(), &[1.0]);
    }

    #[test]
    fn invalid_times_are_rejected_and_kept() {
        let mut solver = decay();
        assert!(solver.set_times(TimeSpan::Samples(vec![1.0, 0.0])).is_err());
        assert_eq!(solver.times().len(), 11);
        assert_eq!(solver.time_span(), &TimeSpan::linspace(0.0, 1.0, 10));
    }

    #[test]
    fn failure_sets_the_flag_and_keeps_the_last_good_solution() {
        let mut solver = decay();
        solver.solution().unwrap();
        assert!(!solver.ode().error());

        solver.update_ode(|kind| {
            if let Some(generic) = kind.as_generic_mut() {
                generic.set_equation(0, "-y").unwrap();
            }
        });
        assert!(solver.solution().is_none());
        assert!(solver.ode().error());
        assert!(matches!(
            solver.last_error(),
            Some(SolverErrors::Integration(IntegrationErrors::Model { .. }))
        ));
        assert_eq!(solver.last_good_solution().unwrap().len(), 11);

        solver.update_ode(|kind| {
            if let Some(generic) = kind.as_generic_mut() {
                generic.set_equation(0, "-2 * x0").unwrap();
            }
        });
        assert!(solver.solution().is_some());
        assert!(!solver.ode().error());
        assert!(solver.last_error().is_none());
    }

    #[test]
    fn resizing_the_ode_resets_the_initial_state() {
        let mut solver = decay();
        solver.update_ode(|kind| {
            if let Some(generic) = kind.as_generic_mut() {
                generic.set_num_vars(3).unwrap();
            }
        });
        assert_eq!(solver.initial_state(), &[5.0, 5.0, 5.0]);
        assert_eq!(solver.solution().unwrap().y.ncols(), 3);

        solver.set_ode(LorenzEquation::default());
        assert_eq!(solver.initial_state(), &[5.0, 5.0, 5.0]);
        assert!(solver.is_stale());
    }

    #[test]
    fn stalled_fixed_step_sets_the_error_flag() {
        let mut solver = OdeSolver::new(GenericOde::default())
            .with_initial_state(vec![1.0])
            .unwrap()
            .with_times(TimeSpan::Samples(vec![1e6, 1e6 + 1.0]))
            .unwrap()
            .with_integrator(Solver::fixed(RungeKuttaMethods::Rk4, 1e-12).unwrap())
            .unwrap();
        assert!(solver.solution().is_none());
        assert!(solver.ode().error());
        assert!(matches!(
            solver.last_error(),
            Some(SolverErrors::Integration(
                IntegrationErrors::StepSizeUnderflow { .. }
            ))
        ));
    }

    #[test]
    fn parameter_changes_invalidate() {
        let mut solver = OdeSolver::new(LorenzEquation::default())
            .with_times(TimeSpan::linspace(0.0, 0.1, 10))
            .unwrap();
        let before = solver.solution().unwrap().clone();
        solver.set_parameter("r", 20.0).unwrap();
        assert!(solver.is_stale());
        let after = solver.solution().unwrap();
        assert_ne!(before.y, after.y);
        assert!(solver.set_parameter("nope", 1.0).is_err());
        assert!(!solver.is_stale());
    }

    #[test]
    fn integrator_changes_invalidate() {
        let mut solver = decay();
        solver.solution().unwrap();
        let rk4 = Solver::fixed(RungeKuttaMethods::Rk4, 0.01).unwrap();
        solver.set_integrator(rk4).unwrap();
        assert!(solver.is_stale());
        let solution = solver.solution().unwrap();
        assert_abs_diff_eq!(solution.y[(10, 0)], (-1.0f64).exp(), epsilon = 1e-8);
    }

    fn recorder(log: Rc<RefCell<Vec<String>>>) -> impl FnMut(&SolutionEvent<'_>) {
        move |event| {
            let label = match event {
                SolutionEvent::Invalidated => "invalidated".to_string(),
                SolutionEvent::Updated(solution) => format!("updated {}", solution.len()),
                SolutionEvent::Failed(_) => "failed".to_string(),
            };
            log.borrow_mut().push(label);
        }
    }

    #[test]
    fn observers_see_invalidations_updates_and_failures() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let mut solver = decay();
        solver.add_observer(recorder(events.clone()));

        solver.solution();
        solver.solution();
        solver.set_time_range(0.0, 1.0, 4).unwrap();
        solver.solution();
        solver.update_ode(|kind| {
            if let Some(generic) = kind.as_generic_mut() {
                generic.set_equation(0, "oops(").unwrap();
            }
        });
        solver.solution();

        assert_eq!(
            *events.borrow(),
            vec![
                "updated 11",
                "invalidated",
                "updated 5",
                "invalidated",
                "failed"
            ]
        );
    }

    #[test]
    fn evaluate_initial_state_flags_errors() {
        let mut solver = decay();
        let derivative = solver.evaluate_initial_state(0.0).unwrap();
        assert_abs_diff_eq!(derivative[0], -1.0);
        solver.update_ode(|kind| {
            if let Some(generic) = kind.as_generic_mut() {
                generic.set_equation(0, "undefined").unwrap();
            }
        });
        assert!(solver.evaluate_initial_state(0.0).is_none());
        assert!(solver.ode().error());
    }
}
