use std::{
    fs,
    io,
    path::{Path, PathBuf},
};

use odex_diffeq::Solver;
use ron::ser::{PrettyConfig, to_string_pretty};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    ode::{Ode, OdeKind},
    solver::{OdeSolver, SolverErrors},
    time_span::TimeSpan,
};

#[derive(Debug, Error)]
pub enum ConfigErrors {
    #[error("could not read or write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid problem file: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("could not serialize problem: {0}")]
    Serialize(#[from] ron::Error),
    #[error("{0}")]
    Solver(#[from] SolverErrors),
}

/// Everything needed to set up an [`OdeSolver`], as stored in a RON file.
///
/// ```ron
/// (
///     ode: Lorenz((s: 10.0, r: 28.0, b: 2.6666666666666665)),
///     initial_state: Some([10.0, 50.0, 50.0]),
///     times: Linspace(start: 0.0, stop: 10.0, count: 1000),
/// )
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProblemConfig {
    pub ode: OdeKind,
    /// Defaults to the middle of the ODE's default domain.
    #[serde(default)]
    pub initial_state: Option<Vec<f64>>,
    #[serde(default)]
    pub times: TimeSpan,
    #[serde(default)]
    pub solver: Solver,
}

impl ProblemConfig {
    pub fn new(ode: impl Into<OdeKind>) -> Self {
        Self {
            ode: ode.into(),
            initial_state: None,
            times: TimeSpan::default(),
            solver: Solver::default(),
        }
    }

    pub fn from_ron_str(s: &str) -> Result<Self, ConfigErrors> {
        Ok(ron::from_str(s)?)
    }

    pub fn to_ron_string(&self) -> Result<String, ConfigErrors> {
        Ok(to_string_pretty(self, PrettyConfig::new())?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigErrors> {
        let text = fs::read_to_string(path).map_err(|source| ConfigErrors::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron_str(&text)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigErrors> {
        let text = self.to_ron_string()?;
        fs::write(path, text).map_err(|source| ConfigErrors::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Captures the current inputs of a solver.
    pub fn from_solver(solver: &OdeSolver) -> Self {
        Self {
            ode: solver.ode().kind().clone(),
            initial_state: Some(solver.initial_state().to_vec()),
            times: solver.time_span().clone(),
            solver: *solver.integrator(),
        }
    }

    pub fn into_solver(self) -> Result<OdeSolver, ConfigErrors> {
        let mut solver = OdeSolver::new(Ode::new(self.ode))
            .with_times(self.times)?
            .with_integrator(self.solver)?;
        if let Some(initial_state) = self.initial_state {
            solver.set_initial_state(initial_state)?;
        }
        Ok(solver)
    }
}
