use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use super::{OdeErrors, OdeSystem, Parameter, check_dimension, check_parameter};

/// A linear time-invariant system dX/dt = A X.
///
/// Every matrix entry is exposed as a parameter named `a_i_j`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LinearOdeDef", into = "LinearOdeDef")]
pub struct LinearOde {
    variables: Vec<String>,
    a: DMatrix<f64>,
}

#[derive(Serialize, Deserialize)]
struct LinearOdeDef {
    variables: Vec<String>,
    /// Row major.
    matrix: Vec<Vec<f64>>,
}

impl TryFrom<LinearOdeDef> for LinearOde {
    type Error = OdeErrors;
    fn try_from(def: LinearOdeDef) -> Result<Self, Self::Error> {
        let n = def.variables.len();
        if def.matrix.len() != n || def.matrix.iter().any(|row| row.len() != n) {
            return Err(OdeErrors::MatrixShape {
                rows: def.matrix.len(),
                cols: def.matrix.first().map_or(0, |row| row.len()),
                variables: n,
            });
        }
        let flat: Vec<f64> = def.matrix.into_iter().flatten().collect();
        LinearOde::new(def.variables, DMatrix::from_row_slice(n, n, &flat))
    }
}

impl From<LinearOde> for LinearOdeDef {
    fn from(ode: LinearOde) -> Self {
        let matrix = ode
            .a
            .row_iter()
            .map(|row| row.iter().copied().collect())
            .collect();
        Self {
            variables: ode.variables,
            matrix,
        }
    }
}

impl Default for LinearOde {
    /// Harmonic oscillator, x'' = -x written as a first order system.
    fn default() -> Self {
        Self {
            variables: vec!["x".into(), "v".into()],
            a: DMatrix::from_row_slice(2, 2, &[0.0, 1.0, -1.0, 0.0]),
        }
    }
}

impl LinearOde {
    pub fn new(variables: Vec<String>, a: DMatrix<f64>) -> Result<Self, OdeErrors> {
        let n = variables.len();
        if n == 0 {
            return Err(OdeErrors::NoVariables);
        }
        if a.nrows() != n || a.ncols() != n {
            return Err(OdeErrors::MatrixShape {
                rows: a.nrows(),
                cols: a.ncols(),
                variables: n,
            });
        }
        for (i, name) in variables.iter().enumerate() {
            if variables[..i].contains(name) {
                return Err(OdeErrors::DuplicateVariable(name.clone()));
            }
        }
        Ok(Self { variables, a })
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.a
    }

    fn parameter_index(&self, name: &str) -> Option<(usize, usize)> {
        let mut parts = name.strip_prefix("a_")?.split('_');
        let i = parts.next()?.parse().ok()?;
        let j = parts.next()?.parse().ok()?;
        if parts.next().is_some() || i >= self.a.nrows() || j >= self.a.ncols() {
            return None;
        }
        Some((i, j))
    }
}

impl OdeSystem for LinearOde {
    fn name(&self) -> &str {
        "Linear ODE"
    }

    fn variables(&self) -> &[String] {
        &self.variables
    }

    fn evaluate(&self, state: &[f64], _t: f64) -> Result<DVector<f64>, OdeErrors> {
        check_dimension(self.variables.len(), state)?;
        Ok(&self.a * DVector::from_column_slice(state))
    }

    fn parameters(&self) -> Vec<Parameter> {
        let mut parameters = Vec::with_capacity(self.a.len());
        for i in 0..self.a.nrows() {
            for j in 0..self.a.ncols() {
                parameters.push(Parameter::new(format!("a_{i}_{j}"), self.a[(i, j)]));
            }
        }
        parameters
    }

    fn set_parameter(&mut self, name: &str, value: f64) -> Result<(), OdeErrors> {
        let (i, j) = self
            .parameter_index(name)
            .ok_or_else(|| OdeErrors::UnknownParameter(name.to_string()))?;
        check_parameter(name, value)?;
        self.a[(i, j)] = value;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn matrix_vector_product() {
        let ode = LinearOde::new(
            vec!["a".into(), "b".into()],
            DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]),
        )
        .unwrap();
        let dx = ode.evaluate(&[1.0, 1.0], 0.0).unwrap();
        assert_abs_diff_eq!(dx[0], 3.0);
        assert_abs_diff_eq!(dx[1], 7.0);
    }

    #[test]
    fn entries_are_parameters() {
        let mut ode = LinearOde::default();
        assert_eq!(ode.parameters().len(), 4);
        ode.set_parameter("a_1_0", -4.0).unwrap();
        assert_eq!(ode.matrix()[(1, 0)], -4.0);
        for bad in ["a_2_0", "a_0", "a_0_0_0", "b_0_0", "a_x_0"] {
            assert!(ode.set_parameter(bad, 1.0).is_err(), "{bad}");
        }
    }

    #[test]
    fn shape_is_validated() {
        assert!(matches!(
            LinearOde::new(vec!["x".into()], DMatrix::zeros(2, 2)),
            Err(OdeErrors::MatrixShape { .. })
        ));
        assert!(matches!(
            LinearOde::new(vec!["x".into(), "x".into()], DMatrix::zeros(2, 2)),
            Err(OdeErrors::DuplicateVariable(_))
        ));
        assert!(ron::from_str::<LinearOde>("(variables: [\"x\"], matrix: [[1.0, 2.0]])").is_err());
    }

    #[test]
    fn round_trips_through_ron() {
        let ode = LinearOde::default();
        let text = ron::to_string(&ode).unwrap();
        let back: LinearOde = ron::from_str(&text).unwrap();
        assert_eq!(back, ode);
    }
}
