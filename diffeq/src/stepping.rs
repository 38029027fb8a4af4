use serde::{Deserialize, Serialize};
use tolerance::Tolerances;

/// Specifies the type of step size control strategy used by the ODE solver.
///
/// - `Fixed`: Uses a constant step size throughout integration.
/// - `Adaptive`: Dynamically adjusts step size based on local error estimates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum StepMethods {
    Fixed(FixedStepControl),
    Adaptive(AdaptiveStepControl),
}

impl Default for StepMethods {
    fn default() -> Self {
        Self::Adaptive(AdaptiveStepControl::default())
    }
}

impl From<FixedStepControl> for StepMethods {
    fn from(value: FixedStepControl) -> Self {
        Self::Fixed(value)
    }
}

impl From<AdaptiveStepControl> for StepMethods {
    fn from(value: AdaptiveStepControl) -> Self {
        Self::Adaptive(value)
    }
}

/// Fixed-step control configuration.
///
/// Steps are shortened where needed so that every requested sample time is
/// hit exactly.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FixedStepControl {
    /// Constant step size.
    pub dt: f64,
    /// Maximum number of steps for a whole integration.
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
}

fn default_max_steps() -> usize {
    1_000_000
}

impl FixedStepControl {
    /// Constructs a new fixed-step controller with a given step size.
    pub fn new(dt: f64) -> Self {
        Self {
            dt,
            max_steps: default_max_steps(),
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }
}

/// Adaptive step size configuration.
///
/// Step proposals use a PI controller on the normalized RMS error: the
/// integral part is `err^(1/order - 0.75 beta)` and the proportional part is
/// the previous accepted error raised to `beta`. Setting `beta` to zero gives
/// the basic controller.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveStepControl {
    /// Relative and absolute tolerance used for error estimation.
    pub tolerances: Tolerances,
    /// Optional minimum allowed step size.
    pub min_dt: Option<f64>,
    /// Optional maximum allowed step size.
    pub max_dt: Option<f64>,
    /// Optional first step size. Estimated from the model when `None`.
    pub initial_dt: Option<f64>,
    pub safety: f64,
    pub min_growth: f64,
    pub max_growth: f64,
    pub beta: f64,
    /// Maximum number of attempted steps for a whole integration.
    pub max_steps: usize,
}

impl Default for AdaptiveStepControl {
    fn default() -> Self {
        Self {
            tolerances: Tolerances::default(),
            min_dt: None,
            max_dt: None,
            initial_dt: None,
            safety: 0.9,
            min_growth: 0.2,
            max_growth: 10.0,
            beta: 0.04,
            max_steps: default_max_steps(),
        }
    }
}

impl AdaptiveStepControl {
    pub fn with_abs_tol(mut self, abs_tol: f64) -> Self {
        self.tolerances.abs_tol = abs_tol;
        self
    }

    pub fn with_rel_tol(mut self, rel_tol: f64) -> Self {
        self.tolerances.rel_tol = rel_tol;
        self
    }

    pub fn with_min_dt(mut self, min_dt: f64) -> Self {
        self.min_dt = Some(min_dt);
        self
    }

    pub fn with_max_dt(mut self, max_dt: f64) -> Self {
        self.max_dt = Some(max_dt);
        self
    }

    pub fn with_initial_dt(mut self, initial_dt: f64) -> Self {
        self.initial_dt = Some(initial_dt);
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Disables the proportional part of the controller.
    pub fn basic(mut self) -> Self {
        self.beta = 0.0;
        self
    }

    /// Clamps a step proposal to `[min_dt, max_dt]`.
    pub fn clamp(&self, dt: f64) -> f64 {
        let mut dt = dt;
        if let Some(max_dt) = self.max_dt {
            dt = dt.min(max_dt);
        }
        if let Some(min_dt) = self.min_dt {
            dt = dt.max(min_dt);
        }
        dt
    }
}

/// Runtime state of the adaptive step size controller for one integration.
pub struct StepSizeController {
    control: AdaptiveStepControl,
    order: usize,
    err_prev: f64,
}

impl StepSizeController {
    pub fn new(control: AdaptiveStepControl, order: usize) -> Self {
        Self {
            control,
            order,
            err_prev: 1e-4,
        }
    }

    fn integral_exponent(&self) -> f64 {
        1.0 / self.order as f64 - 0.75 * self.control.beta
    }

    /// Next step size after a step of size `dt` was accepted with error `error <= 1`.
    pub fn accept(&mut self, dt: f64, error: f64) -> f64 {
        let integral = error.powf(self.integral_exponent());
        let factor = (self.control.safety * self.err_prev.powf(self.control.beta) / integral)
            .clamp(self.control.min_growth, self.control.max_growth);
        self.err_prev = error.max(1e-4);
        self.control.clamp(dt * factor)
    }

    /// Retry step size after a step of size `dt` was rejected with error `error > 1`.
    ///
    /// A non-finite error shrinks the step by the minimum growth factor.
    pub fn reject(&mut self, dt: f64, error: f64) -> f64 {
        let factor = if error.is_finite() {
            (self.control.safety / error.powf(self.integral_exponent()))
                .clamp(self.control.min_growth, 1.0)
        } else {
            self.control.min_growth
        };
        self.control.clamp(dt * factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_errors_grow_the_step_up_to_the_limit() {
        let mut controller = StepSizeController::new(AdaptiveStepControl::default(), 5);
        let dt = controller.accept(0.1, 0.0);
        assert_eq!(dt, 1.0);
    }

    #[test]
    fn rejection_always_shrinks_the_step() {
        let mut controller = StepSizeController::new(AdaptiveStepControl::default(), 5);
        assert!(controller.reject(0.1, 2.0) < 0.1);
        assert_eq!(controller.reject(0.1, 1e12), 0.1 * 0.2);
        assert_eq!(controller.reject(0.1, f64::NAN), 0.1 * 0.2);
    }

    #[test]
    fn proposals_respect_step_limits() {
        let control = AdaptiveStepControl::default()
            .with_max_dt(0.05)
            .with_min_dt(0.01);
        let mut controller = StepSizeController::new(control, 5);
        assert_eq!(controller.accept(0.1, 1e-6), 0.05);
        assert_eq!(controller.reject(0.011, 1e6), 0.01);
    }

    #[test]
    fn basic_controller_matches_textbook_formula() {
        let control = AdaptiveStepControl::default().basic();
        let mut controller = StepSizeController::new(control, 5);
        let error: f64 = 0.5;
        let expected = 0.1 * 0.9 * error.powf(-0.2);
        let dt = controller.accept(0.1, error);
        assert!((dt - expected).abs() < 1e-12);
    }
}
