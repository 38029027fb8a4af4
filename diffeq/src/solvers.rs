use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use tolerance::Tolerances;
use tracing::debug;

use crate::{
    IntegrationErrors, OdeModel,
    result::{Stats, Trajectory},
    rk::RungeKutta,
    stepping::{AdaptiveStepControl, FixedStepControl, StepMethods, StepSizeController},
    tableau::ButcherTableau,
};

/// Enum representing the available Runge-Kutta methods.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RungeKuttaMethods {
    /// Dormand-Prince 4(5) method.
    #[default]
    DoPri45,
    /// Classical Runge-Kutta 4th-order method.
    Rk4,
}

impl RungeKuttaMethods {
    pub fn supports_adaptive(&self) -> bool {
        match self {
            RungeKuttaMethods::DoPri45 => true,
            RungeKuttaMethods::Rk4 => false,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            RungeKuttaMethods::DoPri45 => "DoPri45",
            RungeKuttaMethods::Rk4 => "RK4",
        }
    }
}

/// An integration method together with its step size control.
///
/// The default is adaptive Dormand-Prince 4(5) with `odeint`'s default
/// tolerances.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Solver {
    pub method: RungeKuttaMethods,
    pub step: StepMethods,
}

impl Solver {
    pub fn new(method: RungeKuttaMethods, step: StepMethods) -> Result<Self, IntegrationErrors> {
        let solver = Self { method, step };
        solver.validate()?;
        Ok(solver)
    }

    pub fn adaptive(control: AdaptiveStepControl) -> Self {
        Self {
            method: RungeKuttaMethods::DoPri45,
            step: StepMethods::Adaptive(control),
        }
    }

    pub fn fixed(method: RungeKuttaMethods, dt: f64) -> Result<Self, IntegrationErrors> {
        Self::new(method, StepMethods::Fixed(FixedStepControl::new(dt)))
    }

    /// Checks that the method and step control can be combined.
    pub fn validate(&self) -> Result<(), IntegrationErrors> {
        match &self.step {
            StepMethods::Adaptive(control) => {
                if !self.method.supports_adaptive() {
                    return Err(IntegrationErrors::NotAdaptive(self.method.label()));
                }
                control.tolerances.validate()?;
                if control.max_steps == 0 {
                    return Err(IntegrationErrors::MaxStepsExceeded(0));
                }
            }
            StepMethods::Fixed(control) => {
                if !control.dt.is_finite() || control.dt <= 0.0 {
                    return Err(IntegrationErrors::InvalidStep(control.dt));
                }
                if control.max_steps == 0 {
                    return Err(IntegrationErrors::MaxStepsExceeded(0));
                }
            }
        }
        Ok(())
    }

    /// Integrates `model` from `x0` at `times[0]`, reporting the state at every
    /// entry of `times`.
    ///
    /// The first row of the result is `x0` itself. `times` must be finite and
    /// non-decreasing; an empty `times` yields an empty trajectory.
    pub fn integrate<Model: OdeModel>(
        &self,
        model: &mut Model,
        x0: &[f64],
        times: &[f64],
    ) -> Result<Trajectory, IntegrationErrors> {
        self.validate()?;
        validate_times(times)?;
        if let Some(i) = x0.iter().position(|x| !x.is_finite()) {
            return Err(IntegrationErrors::NonFiniteInitialState(i));
        }

        let trajectory = match (&self.method, &self.step) {
            (RungeKuttaMethods::DoPri45, StepMethods::Adaptive(control)) => integrate_adaptive(
                RungeKutta::new(ButcherTableau::<7>::DORMANDPRINCE45, x0.len()),
                model,
                x0,
                times,
                *control,
            ),
            (RungeKuttaMethods::DoPri45, StepMethods::Fixed(control)) => integrate_fixed(
                RungeKutta::new(ButcherTableau::<7>::DORMANDPRINCE45, x0.len()),
                model,
                x0,
                times,
                *control,
            ),
            (RungeKuttaMethods::Rk4, StepMethods::Fixed(control)) => integrate_fixed(
                RungeKutta::new(ButcherTableau::<4>::RK4, x0.len()),
                model,
                x0,
                times,
                *control,
            ),
            (RungeKuttaMethods::Rk4, StepMethods::Adaptive(_)) => {
                unreachable!("rejected by validate")
            }
        }?;

        debug!(
            method = self.method.label(),
            samples = trajectory.len(),
            accepted = trajectory.stats.accepted,
            rejected = trajectory.stats.rejected,
            evaluations = trajectory.stats.evaluations,
            "integration finished"
        );
        Ok(trajectory)
    }
}

fn validate_times(times: &[f64]) -> Result<(), IntegrationErrors> {
    for (index, &value) in times.iter().enumerate() {
        if !value.is_finite() {
            return Err(IntegrationErrors::NonMonotonicTimes { index, value });
        }
        if index > 0 && value < times[index - 1] {
            return Err(IntegrationErrors::NonMonotonicTimes { index, value });
        }
    }
    Ok(())
}

/// Rounding slack used when deciding whether the next step lands on a sample.
fn landing_slack(t_end: f64) -> f64 {
    64.0 * f64::EPSILON * t_end.abs().max(1.0)
}

fn integrate_fixed<const STAGES: usize, Model: OdeModel>(
    mut rk: RungeKutta<STAGES>,
    model: &mut Model,
    x0: &[f64],
    times: &[f64],
    control: FixedStepControl,
) -> Result<Trajectory, IntegrationErrors> {
    let n = x0.len();
    let mut rows = Vec::with_capacity(times.len() * n);
    let mut stats = Stats::default();

    let Some(&t0) = times.first() else {
        return Ok(Trajectory::from_rows(Vec::new(), n, rows, stats));
    };

    let mut x = DVector::from_column_slice(x0);
    let mut t = t0;
    rows.extend_from_slice(x0);
    let mut steps = 0usize;

    for &t_end in &times[1..] {
        while t < t_end {
            if steps >= control.max_steps {
                return Err(IntegrationErrors::MaxStepsExceeded(control.max_steps));
            }
            steps += 1;

            let remaining = t_end - t;
            let lands = control.dt >= remaining - landing_slack(t_end);
            let dt = if lands { remaining } else { control.dt };
            // dt below the spacing of floats at t
            if !lands && t + dt <= t {
                return Err(IntegrationErrors::StepSizeUnderflow { t, dt });
            }

            rk.step(model, t, &x, dt)?;
            t = if lands { t_end } else { t + dt };
            if rk.y.iter().any(|v| !v.is_finite()) {
                return Err(IntegrationErrors::NonFinite(t));
            }
            x.copy_from(&rk.y);
            stats.accepted += 1;
        }
        rows.extend(x.iter());
    }

    stats.evaluations = rk.evaluations();
    Ok(Trajectory::from_rows(times.to_vec(), n, rows, stats))
}

fn integrate_adaptive<const STAGES: usize, Model: OdeModel>(
    mut rk: RungeKutta<STAGES>,
    model: &mut Model,
    x0: &[f64],
    times: &[f64],
    control: AdaptiveStepControl,
) -> Result<Trajectory, IntegrationErrors> {
    let n = x0.len();
    let mut rows = Vec::with_capacity(times.len() * n);
    let mut stats = Stats::default();

    let (Some(&t0), Some(&tf)) = (times.first(), times.last()) else {
        return Ok(Trajectory::from_rows(Vec::new(), n, rows, stats));
    };

    let mut x = DVector::from_column_slice(x0);
    let mut t = t0;
    rows.extend_from_slice(x0);

    let mut controller = StepSizeController::new(control, rk.order());
    let mut dt = if tf > t0 {
        match control.initial_dt {
            Some(dt) => dt,
            None => {
                stats.evaluations += 2;
                initial_step(model, t0, &x, tf - t0, &control, rk.order())?
            }
        }
    } else {
        0.0
    };
    let mut attempts = 0usize;

    for &t_end in &times[1..] {
        while t < t_end {
            if attempts >= control.max_steps {
                return Err(IntegrationErrors::MaxStepsExceeded(control.max_steps));
            }
            attempts += 1;

            let remaining = t_end - t;
            let lands = dt >= remaining - landing_slack(t_end);
            let h = if lands { remaining } else { dt };

            rk.step(model, t, &x, h)?;
            let error =
                control
                    .tolerances
                    .rms_error(rk.y.as_slice(), x.as_slice(), rk.y_star.as_slice());

            if error <= 1.0 {
                t = if lands { t_end } else { t + h };
                if rk.y.iter().any(|v| !v.is_finite()) {
                    return Err(IntegrationErrors::NonFinite(t));
                }
                x.copy_from(&rk.y);
                stats.accepted += 1;

                let proposal = controller.accept(h, error);
                // a step shortened to land on a sample should not shrink the next one
                dt = if lands && h < dt { dt.max(proposal) } else { proposal };
            } else {
                stats.rejected += 1;
                dt = controller.reject(h, error);
                let floor = landing_slack(t);
                if dt < floor || (control.min_dt.is_some_and(|min| h <= min)) {
                    if !error.is_finite() {
                        return Err(IntegrationErrors::NonFinite(t));
                    }
                    return Err(IntegrationErrors::StepSizeUnderflow { t, dt });
                }
            }
        }
        rows.extend(x.iter());
    }

    stats.evaluations += rk.evaluations();
    Ok(Trajectory::from_rows(times.to_vec(), n, rows, stats))
}

/// Estimates a first step size from the local behaviour of the model.
fn initial_step<Model: OdeModel>(
    model: &mut Model,
    t0: f64,
    x0: &DVector<f64>,
    span: f64,
    control: &AdaptiveStepControl,
    order: usize,
) -> Result<f64, IntegrationErrors> {
    let tol: Tolerances = control.tolerances;
    let max_dt = control.max_dt.unwrap_or(span).min(span);
    let scaled_norm = |v: &DVector<f64>| -> f64 {
        if v.is_empty() {
            return 0.0;
        }
        let sum: f64 = v
            .iter()
            .zip(x0.iter())
            .map(|(v, x)| (v / (tol.abs_tol + tol.rel_tol * x.abs())).powi(2))
            .sum();
        (sum / v.len() as f64).sqrt()
    };

    let mut f0 = DVector::zeros(x0.len());
    model
        .f(t0, x0, &mut f0)
        .map_err(|source| IntegrationErrors::Model { t: t0, source })?;

    let d0 = scaled_norm(x0);
    let d1 = scaled_norm(&f0);
    let h0 = if d0 < 1e-10 || d1 < 1e-10 {
        1e-6
    } else {
        0.01 * d0 / d1
    }
    .min(max_dt);

    let mut x1 = x0.clone();
    x1.axpy(h0, &f0, 1.0);
    let mut f1 = DVector::zeros(x0.len());
    model
        .f(t0 + h0, &x1, &mut f1)
        .map_err(|source| IntegrationErrors::Model { t: t0 + h0, source })?;

    let d2 = scaled_norm(&(&f1 - &f0)) / h0;
    let der12 = d1.max(d2);
    let h1 = if der12 <= 1e-15 || !der12.is_finite() {
        (h0 * 1e-3).max(1e-6)
    } else {
        (0.01 / der12).powf(1.0 / order as f64)
    };

    Ok(control.clamp((100.0 * h0).min(h1).min(max_dt)))
}
