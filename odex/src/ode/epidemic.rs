use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use super::{OdeErrors, OdeSystem, Parameter, check_dimension, check_parameter};

fn epidemic_variables() -> Vec<String> {
    vec!["Epidemic Spread".into()]
}

/// Logistic spread of an epidemic through a population of size `l`:
/// dy/dt = k y (L - y).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EpidemicOde {
    #[serde(rename = "L")]
    pub l: f64,
    pub k: f64,
    #[serde(skip, default = "epidemic_variables")]
    variables: Vec<String>,
}

impl Default for EpidemicOde {
    fn default() -> Self {
        Self::new(2.5e5, 3e-5)
    }
}

impl EpidemicOde {
    pub fn new(l: f64, k: f64) -> Self {
        Self {
            l,
            k,
            variables: epidemic_variables(),
        }
    }
}

impl OdeSystem for EpidemicOde {
    fn name(&self) -> &str {
        "Epidemic ODE"
    }

    fn variables(&self) -> &[String] {
        &self.variables
    }

    fn evaluate(&self, state: &[f64], _t: f64) -> Result<DVector<f64>, OdeErrors> {
        check_dimension(1, state)?;
        let y = state[0];
        Ok(DVector::from_element(1, self.k * y * (self.l - y)))
    }

    fn parameters(&self) -> Vec<Parameter> {
        vec![Parameter::new("L", self.l), Parameter::new("k", self.k)]
    }

    fn set_parameter(&mut self, name: &str, value: f64) -> Result<(), OdeErrors> {
        check_parameter(name, value)?;
        match name {
            "L" => self.l = value,
            "k" => self.k = value,
            _ => return Err(OdeErrors::UnknownParameter(name.to_string())),
        }
        Ok(())
    }
}
