use expression::ExpressionErrors;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

pub mod epidemic;
pub mod generic;
pub mod linear;
pub mod lorenz;

pub use epidemic::EpidemicOde;
pub use generic::GenericOde;
pub use linear::LinearOde;
pub use lorenz::LorenzEquation;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum OdeErrors {
    #[error("state has {got} components but the ode has {expected} variables")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("variable name '{0}' is already in use")]
    DuplicateVariable(String),
    #[error("equation for '{variable}' is invalid: {source}")]
    Equation {
        variable: String,
        #[source]
        source: ExpressionErrors,
    },
    #[error("{equations} equations given for {variables} variables")]
    EquationCount { variables: usize, equations: usize },
    #[error("evaluating the equation for '{variable}' failed: {source}")]
    Evaluation {
        variable: String,
        #[source]
        source: ExpressionErrors,
    },
    #[error("index {index} out of bounds for {len} variables")]
    IndexOutOfBounds { index: usize, len: usize },
    #[error("'{0}' is not a valid variable name")]
    InvalidVariableName(String),
    #[error("equation for '{variable}' evaluated to {value}")]
    NonFiniteDerivative { variable: String, value: f64 },
    #[error("parameter '{name}' must be finite, got {value}")]
    NonFiniteParameter { name: String, value: f64 },
    #[error("matrix is {rows}x{cols} but must be square with one row per variable ({variables})")]
    MatrixShape {
        rows: usize,
        cols: usize,
        variables: usize,
    },
    #[error("unknown parameter '{0}'")]
    UnknownParameter(String),
    #[error("an ode needs at least one variable")]
    NoVariables,
}

/// A named scalar parameter of an ODE, with an optional UI range hint.
#[derive(Clone, Debug, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub value: f64,
    pub range: Option<(f64, f64)>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            range: None,
        }
    }

    pub fn with_range(mut self, low: f64, high: f64) -> Self {
        self.range = Some((low, high));
        self
    }
}

/// A system of the form dX/dt = f(X, t).
pub trait OdeSystem {
    fn name(&self) -> &str;

    /// Ordered, unique variable names. Index `i` of a state is `variables()[i]`.
    fn variables(&self) -> &[String];

    /// Evaluates f at `state` and `t`. The result has one entry per variable.
    fn evaluate(&self, state: &[f64], t: f64) -> Result<DVector<f64>, OdeErrors>;

    fn parameters(&self) -> Vec<Parameter>;

    fn set_parameter(&mut self, name: &str, value: f64) -> Result<(), OdeErrors>;

    /// Plausible range of each variable, used to seed initial states.
    fn default_domain(&self) -> Vec<(f64, f64)> {
        vec![(0.0, 10.0); self.variables().len()]
    }
}

pub(crate) fn check_dimension(expected: usize, state: &[f64]) -> Result<(), OdeErrors> {
    if state.len() != expected {
        return Err(OdeErrors::DimensionMismatch {
            expected,
            got: state.len(),
        });
    }
    Ok(())
}

pub(crate) fn check_parameter(name: &str, value: f64) -> Result<(), OdeErrors> {
    if !value.is_finite() {
        return Err(OdeErrors::NonFiniteParameter {
            name: name.to_string(),
            value,
        });
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum OdeKind {
    Lorenz(LorenzEquation),
    Epidemic(EpidemicOde),
    Linear(LinearOde),
    Generic(GenericOde),
}

impl OdeKind {
    /// One instance of every built-in ODE.
    pub fn presets() -> Vec<OdeKind> {
        vec![
            OdeKind::Lorenz(LorenzEquation::default()),
            OdeKind::Epidemic(EpidemicOde::default()),
            OdeKind::Linear(LinearOde::default()),
            OdeKind::Generic(GenericOde::default()),
            OdeKind::Generic(GenericOde::one_d()),
            OdeKind::Generic(GenericOde::two_d()),
            OdeKind::Generic(GenericOde::three_d()),
        ]
    }

    pub fn as_generic_mut(&mut self) -> Option<&mut GenericOde> {
        match self {
            OdeKind::Generic(ode) => Some(ode),
            _ => None,
        }
    }
}

impl OdeSystem for OdeKind {
    fn name(&self) -> &str {
        match self {
            OdeKind::Lorenz(ode) => ode.name(),
            OdeKind::Epidemic(ode) => ode.name(),
            OdeKind::Linear(ode) => ode.name(),
            OdeKind::Generic(ode) => ode.name(),
        }
    }

    fn variables(&self) -> &[String] {
        match self {
            OdeKind::Lorenz(ode) => ode.variables(),
            OdeKind::Epidemic(ode) => ode.variables(),
            OdeKind::Linear(ode) => ode.variables(),
            OdeKind::Generic(ode) => ode.variables(),
        }
    }

    fn evaluate(&self, state: &[f64], t: f64) -> Result<DVector<f64>, OdeErrors> {
        match self {
            OdeKind::Lorenz(ode) => ode.evaluate(state, t),
            OdeKind::Epidemic(ode) => ode.evaluate(state, t),
            OdeKind::Linear(ode) => ode.evaluate(state, t),
            OdeKind::Generic(ode) => ode.evaluate(state, t),
        }
    }

    fn parameters(&self) -> Vec<Parameter> {
        match self {
            OdeKind::Lorenz(ode) => ode.parameters(),
            OdeKind::Epidemic(ode) => ode.parameters(),
            OdeKind::Linear(ode) => ode.parameters(),
            OdeKind::Generic(ode) => ode.parameters(),
        }
    }

    fn set_parameter(&mut self, name: &str, value: f64) -> Result<(), OdeErrors> {
        match self {
            OdeKind::Lorenz(ode) => ode.set_parameter(name, value),
            OdeKind::Epidemic(ode) => ode.set_parameter(name, value),
            OdeKind::Linear(ode) => ode.set_parameter(name, value),
            OdeKind::Generic(ode) => ode.set_parameter(name, value),
        }
    }

    fn default_domain(&self) -> Vec<(f64, f64)> {
        match self {
            OdeKind::Lorenz(ode) => ode.default_domain(),
            OdeKind::Epidemic(ode) => ode.default_domain(),
            OdeKind::Linear(ode) => ode.default_domain(),
            OdeKind::Generic(ode) => ode.default_domain(),
        }
    }
}

/// An ODE together with its error flag and a revision counter.
///
/// The revision increases on every mutation, which is how a solver knows its
/// cached solution is stale. The error flag records whether the most recent
/// evaluation or solve failed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "OdeKind", into = "OdeKind")]
pub struct Ode {
    kind: OdeKind,
    error: bool,
    revision: u64,
}

impl From<OdeKind> for Ode {
    fn from(kind: OdeKind) -> Self {
        Self::new(kind)
    }
}

impl From<Ode> for OdeKind {
    fn from(ode: Ode) -> Self {
        ode.kind
    }
}

impl Ode {
    pub fn new(kind: impl Into<OdeKind>) -> Self {
        Self {
            kind: kind.into(),
            error: false,
            revision: 0,
        }
    }

    pub fn kind(&self) -> &OdeKind {
        &self.kind
    }

    pub fn error(&self) -> bool {
        self.error
    }

    pub(crate) fn set_error(&mut self, error: bool) {
        self.error = error;
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn name(&self) -> &str {
        self.kind.name()
    }

    pub fn variables(&self) -> &[String] {
        self.kind.variables()
    }

    pub fn num_vars(&self) -> usize {
        self.kind.variables().len()
    }

    pub fn parameters(&self) -> Vec<Parameter> {
        self.kind.parameters()
    }

    pub fn default_domain(&self) -> Vec<(f64, f64)> {
        self.kind.default_domain()
    }

    /// Evaluates the derivative without touching the error flag.
    pub fn try_evaluate(&self, state: &[f64], t: f64) -> Result<DVector<f64>, OdeErrors> {
        self.kind.evaluate(state, t)
    }

    /// Evaluates the derivative, recording failure in the error flag instead of
    /// returning it.
    pub fn evaluate(&mut self, state: &[f64], t: f64) -> Option<DVector<f64>> {
        match self.kind.evaluate(state, t) {
            Ok(derivative) => {
                self.error = false;
                Some(derivative)
            }
            Err(e) => {
                warn!("{} evaluation failed at t = {t}: {e}", self.kind.name());
                self.error = true;
                None
            }
        }
    }

    pub fn set_parameter(&mut self, name: &str, value: f64) -> Result<(), OdeErrors> {
        self.kind.set_parameter(name, value)?;
        self.revision += 1;
        Ok(())
    }

    /// Applies an arbitrary mutation to the underlying ODE. Always counts as a
    /// change.
    pub fn update<R>(&mut self, f: impl FnOnce(&mut OdeKind) -> R) -> R {
        let result = f(&mut self.kind);
        self.revision += 1;
        result
    }
}

macro_rules! impl_into_kind {
    ($($ode:ident => $variant:ident),*) => {
        $(
            impl From<$ode> for OdeKind {
                fn from(ode: $ode) -> Self {
                    OdeKind::$variant(ode)
                }
            }

            impl From<$ode> for Ode {
                fn from(ode: $ode) -> Self {
                    Ode::new(OdeKind::$variant(ode))
                }
            }
        )*
    };
}

impl_into_kind!(
    LorenzEquation => Lorenz,
    EpidemicOde => Epidemic,
    LinearOde => Linear,
    GenericOde => Generic
);

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn evaluate_is_deterministic() {
        let mut ode = Ode::new(LorenzEquation::default());
        let a = ode.evaluate(&[1.0, 2.0, 3.0], 0.5).unwrap();
        let b = ode.evaluate(&[1.0, 2.0, 3.0], 0.5).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn every_model_converts_into_an_ode() {
        let odes: Vec<Ode> = vec![
            LorenzEquation::default().into(),
            EpidemicOde::default().into(),
            LinearOde::default().into(),
            GenericOde::three_d().into(),
        ];
        let counts: Vec<usize> = odes.iter().map(Ode::num_vars).collect();
        assert_eq!(counts, vec![3, 1, 2, 3]);
        assert!(odes.iter().all(|ode| !ode.error() && ode.revision() == 0));
        assert!(matches!(odes[3].kind(), OdeKind::Generic(_)));
    }

    #[test]
    fn failed_evaluation_sets_and_success_clears_the_flag() {
        let mut generic = GenericOde::two_d();
        generic.set_equation(0, "-y + q").unwrap();
        let mut ode = Ode::new(generic);

        assert!(ode.evaluate(&[1.0, 1.0], 0.0).is_none());
        assert!(ode.error());

        ode.update(|kind| {
            if let Some(generic) = kind.as_generic_mut() {
                generic.set_equation(0, "-y").unwrap();
            }
        });
        let derivative = ode.evaluate(&[1.0, 2.0], 0.0).unwrap();
        assert!(!ode.error());
        assert_abs_diff_eq!(derivative[0], -2.0);
        assert_abs_diff_eq!(derivative[1], 1.0);
    }

    #[test]
    fn wrong_state_length_is_flagged() {
        let mut ode = Ode::new(LorenzEquation::default());
        assert_eq!(
            ode.try_evaluate(&[1.0, 2.0], 0.0).unwrap_err(),
            OdeErrors::DimensionMismatch {
                expected: 3,
                got: 2
            }
        );
        assert!(ode.evaluate(&[1.0], 0.0).is_none());
        assert!(ode.error());
    }

    #[test]
    fn mutations_bump_the_revision() {
        let mut ode = Ode::new(LorenzEquation::default());
        assert_eq!(ode.revision(), 0);
        ode.set_parameter("r", 30.0).unwrap();
        assert_eq!(ode.revision(), 1);
        assert!(ode.set_parameter("q", 1.0).is_err());
        assert_eq!(ode.revision(), 1);
        ode.update(|_| ());
        assert_eq!(ode.revision(), 2);
    }

    #[test]
    fn presets_cover_every_kind() {
        let presets = OdeKind::presets();
        assert!(presets.iter().any(|p| matches!(p, OdeKind::Lorenz(_))));
        assert!(presets.iter().any(|p| matches!(p, OdeKind::Epidemic(_))));
        assert!(presets.iter().any(|p| matches!(p, OdeKind::Linear(_))));
        assert_eq!(
            presets
                .iter()
                .filter(|p| matches!(p, OdeKind::Generic(_)))
                .count(),
            4
        );
        for preset in &presets {
            let n = preset.variables().len();
            assert_eq!(preset.default_domain().len(), n);
            let derivative = preset.evaluate(&vec![1.0; n], 0.0).unwrap();
            assert_eq!(derivative.len(), n);
        }
    }

    #[test]
    fn ode_serializes_as_its_kind() {
        let ode = Ode::new(LorenzEquation::default());
        let text = ron::to_string(&ode).unwrap();
        let kind: OdeKind = ron::from_str(&text).unwrap();
        assert_eq!(&kind, ode.kind());
        let back: Ode = ron::from_str(&text).unwrap();
        assert!(!back.error());
        assert_eq!(back.revision(), 0);
    }
}
