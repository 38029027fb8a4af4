use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use super::{OdeErrors, OdeSystem, Parameter, check_dimension, check_parameter};

fn lorenz_variables() -> Vec<String> {
    vec!["x".into(), "y".into(), "z".into()]
}

/// The Lorenz system
///
/// ```text
/// dx/dt = s (y - x)
/// dy/dt = r x - y - x z
/// dz/dt = x y - b z
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LorenzEquation {
    pub s: f64,
    pub r: f64,
    pub b: f64,
    #[serde(skip, default = "lorenz_variables")]
    variables: Vec<String>,
}

impl Default for LorenzEquation {
    fn default() -> Self {
        Self::new(10.0, 28.0, 8.0 / 3.0)
    }
}

impl LorenzEquation {
    pub fn new(s: f64, r: f64, b: f64) -> Self {
        Self {
            s,
            r,
            b,
            variables: lorenz_variables(),
        }
    }
}

impl OdeSystem for LorenzEquation {
    fn name(&self) -> &str {
        "Lorenz Equation"
    }

    fn variables(&self) -> &[String] {
        &self.variables
    }

    fn evaluate(&self, state: &[f64], _t: f64) -> Result<DVector<f64>, OdeErrors> {
        check_dimension(3, state)?;
        let (x, y, z) = (state[0], state[1], state[2]);
        Ok(DVector::from_vec(vec![
            self.s * (y - x),
            self.r * x - y - x * z,
            x * y - self.b * z,
        ]))
    }

    fn parameters(&self) -> Vec<Parameter> {
        vec![
            Parameter::new("s", self.s).with_range(0.0, 20.0),
            Parameter::new("r", self.r).with_range(20.0, 36.0),
            Parameter::new("b", self.b).with_range(0.0, 5.0),
        ]
    }

    fn set_parameter(&mut self, name: &str, value: f64) -> Result<(), OdeErrors> {
        check_parameter(name, value)?;
        match name {
            "s" => self.s = value,
            "r" => self.r = value,
            "b" => self.b = value,
            _ => return Err(OdeErrors::UnknownParameter(name.to_string())),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn derivative_at_reference_state() {
        let ode = LorenzEquation::default();
        let dx = ode.evaluate(&[10.0, 50.0, 50.0], 0.0).unwrap();
        assert_abs_diff_eq!(dx[0], 400.0, epsilon = 1e-12);
        assert_abs_diff_eq!(dx[1], -270.0, epsilon = 1e-12);
        assert_abs_diff_eq!(dx[2], 1100.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn parameters_have_range_hints() {
        let ode = LorenzEquation::default();
        let params = ode.parameters();
        assert_eq!(params.len(), 3);
        assert_eq!(params[1].name, "r");
        assert_eq!(params[1].value, 28.0);
        assert_eq!(params[1].range, Some((20.0, 36.0)));
    }

    #[test]
    fn set_parameter_changes_the_derivative() {
        let mut ode = LorenzEquation::default();
        ode.set_parameter("s", 1.0).unwrap();
        let dx = ode.evaluate(&[1.0, 3.0, 0.0], 0.0).unwrap();
        assert_abs_diff_eq!(dx[0], 2.0);
        assert!(matches!(
            ode.set_parameter("b", f64::NAN),
            Err(OdeErrors::NonFiniteParameter { .. })
        ));
        assert!(matches!(
            ode.set_parameter("sigma", 1.0),
            Err(OdeErrors::UnknownParameter(_))
        ));
    }

    #[test]
    fn missing_fields_take_defaults() {
        let ode: LorenzEquation = ron::from_str("(r: 30.0)").unwrap();
        assert_eq!(ode.r, 30.0);
        assert_eq!(ode.s, 10.0);
        assert_eq!(ode.variables(), ["x", "y", "z"]);
    }
}
