use expression::{Expression, ExpressionErrors, Scope};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use super::{OdeErrors, OdeSystem, Parameter, check_dimension};

/// One right-hand side as typed, plus the result of compiling it.
///
/// Malformed text is kept so it can be shown and corrected; the compile error
/// surfaces when the ODE is evaluated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Equation {
    source: String,
    compiled: Result<Expression, ExpressionErrors>,
}

impl Equation {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let compiled = Expression::parse(&source);
        Self { source, compiled }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expression(&self) -> Result<&Expression, &ExpressionErrors> {
        self.compiled.as_ref()
    }
}

impl From<String> for Equation {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for Equation {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<Equation> for String {
    fn from(value: Equation) -> Self {
        value.source
    }
}

/// Binds state components by variable name, then `t`.
struct StateScope<'a> {
    variables: &'a [String],
    state: &'a [f64],
    t: f64,
}

impl Scope for StateScope<'_> {
    fn value(&self, name: &str) -> Option<f64> {
        match self.variables.iter().position(|v| v == name) {
            Some(i) => Some(self.state[i]),
            None if name == "t" => Some(self.t),
            None => None,
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A user defined system with one textual equation per variable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GenericOdeDef", into = "GenericOdeDef")]
pub struct GenericOde {
    name: String,
    variables: Vec<String>,
    equations: Vec<Equation>,
}

#[derive(Serialize, Deserialize)]
struct GenericOdeDef {
    #[serde(default = "default_name")]
    name: String,
    variables: Vec<String>,
    equations: Vec<Equation>,
}

fn default_name() -> String {
    "Generic ODE".into()
}

impl TryFrom<GenericOdeDef> for GenericOde {
    type Error = OdeErrors;
    fn try_from(def: GenericOdeDef) -> Result<Self, Self::Error> {
        Self::new(def.name, def.variables, def.equations)
    }
}

impl From<GenericOde> for GenericOdeDef {
    fn from(ode: GenericOde) -> Self {
        Self {
            name: ode.name,
            variables: ode.variables,
            equations: ode.equations,
        }
    }
}

impl Default for GenericOde {
    /// `x0' = -x0`
    fn default() -> Self {
        let mut ode = Self {
            name: default_name(),
            variables: Vec::new(),
            equations: Vec::new(),
        };
        ode.grow(1);
        ode
    }
}

impl GenericOde {
    pub fn new<E: Into<Equation>>(
        name: impl Into<String>,
        variables: Vec<String>,
        equations: Vec<E>,
    ) -> Result<Self, OdeErrors> {
        if variables.is_empty() {
            return Err(OdeErrors::NoVariables);
        }
        if variables.len() != equations.len() {
            return Err(OdeErrors::EquationCount {
                variables: variables.len(),
                equations: equations.len(),
            });
        }
        for (i, variable) in variables.iter().enumerate() {
            check_name(variable)?;
            if variables[..i].contains(variable) {
                return Err(OdeErrors::DuplicateVariable(variable.clone()));
            }
        }
        Ok(Self {
            name: name.into(),
            variables,
            equations: equations.into_iter().map(Into::into).collect(),
        })
    }

    fn preset(name: &str, variables: &[&str], equations: &[&str]) -> Self {
        Self {
            name: name.into(),
            variables: variables.iter().map(|v| v.to_string()).collect(),
            equations: equations.iter().map(|e| Equation::new(*e)).collect(),
        }
    }

    pub fn one_d() -> Self {
        Self::preset("1D ODE", &["x"], &["1-x"])
    }

    pub fn two_d() -> Self {
        Self::preset("2D ODE", &["x", "y"], &["-y", "x"])
    }

    pub fn three_d() -> Self {
        Self::preset("3D ODE", &["x", "y", "z"], &["-y", "x", "y-x"])
    }

    pub fn equations(&self) -> &[Equation] {
        &self.equations
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Resizes the system. Growing appends fresh variables `x{i}` with
    /// equations `-x{i}`; shrinking drops trailing variables and equations.
    pub fn set_num_vars(&mut self, n: usize) -> Result<(), OdeErrors> {
        if n == 0 {
            return Err(OdeErrors::NoVariables);
        }
        if n < self.variables.len() {
            self.variables.truncate(n);
            self.equations.truncate(n);
        } else {
            self.grow(n);
        }
        Ok(())
    }

    fn grow(&mut self, n: usize) {
        let mut k = self.variables.len();
        while self.variables.len() < n {
            let name = format!("x{k}");
            k += 1;
            if self.variables.contains(&name) {
                continue;
            }
            self.equations.push(Equation::new(format!("-{name}")));
            self.variables.push(name);
        }
    }

    /// Replaces the equation for variable `index`. Text that does not parse is
    /// stored anyway and reported by `evaluate`.
    pub fn set_equation(
        &mut self,
        index: usize,
        text: impl Into<String>,
    ) -> Result<(), OdeErrors> {
        let len = self.equations.len();
        let equation = self
            .equations
            .get_mut(index)
            .ok_or(OdeErrors::IndexOutOfBounds { index, len })?;
        *equation = Equation::new(text);
        Ok(())
    }

    pub fn set_variable_name(
        &mut self,
        index: usize,
        name: impl Into<String>,
    ) -> Result<(), OdeErrors> {
        let name = name.into();
        let len = self.variables.len();
        if index >= len {
            return Err(OdeErrors::IndexOutOfBounds { index, len });
        }
        check_name(&name)?;
        if self
            .variables
            .iter()
            .enumerate()
            .any(|(i, v)| i != index && *v == name)
        {
            return Err(OdeErrors::DuplicateVariable(name));
        }
        self.variables[index] = name;
        Ok(())
    }
}

fn check_name(name: &str) -> Result<(), OdeErrors> {
    // `t` is bound to time in every equation
    if !is_identifier(name) || name == "t" {
        return Err(OdeErrors::InvalidVariableName(name.to_string()));
    }
    Ok(())
}

impl OdeSystem for GenericOde {
    fn name(&self) -> &str {
        &self.name
    }

    fn variables(&self) -> &[String] {
        &self.variables
    }

    fn evaluate(&self, state: &[f64], t: f64) -> Result<DVector<f64>, OdeErrors> {
        check_dimension(self.variables.len(), state)?;
        let scope = StateScope {
            variables: &self.variables,
            state,
            t,
        };
        let mut derivative = DVector::zeros(self.variables.len());
        let pairs = self.variables.iter().zip(&self.equations);
        for (i, (variable, equation)) in pairs.enumerate() {
            let expression = equation
                .expression()
                .map_err(|source| OdeErrors::Equation {
                    variable: variable.clone(),
                    source: source.clone(),
                })?;
            let value = expression
                .eval(&scope)
                .map_err(|source| OdeErrors::Evaluation {
                    variable: variable.clone(),
                    source,
                })?;
            if !value.is_finite() {
                return Err(OdeErrors::NonFiniteDerivative {
                    variable: variable.clone(),
                    value,
                });
            }
            derivative[i] = value;
        }
        Ok(derivative)
    }

    fn parameters(&self) -> Vec<Parameter> {
        Vec::new()
    }

    fn set_parameter(&mut self, name: &str, _value: f64) -> Result<(), OdeErrors> {
        Err(OdeErrors::UnknownParameter(name.to_string()))
    }
}
