use nalgebra::DMatrix;

/// Counters collected during one integration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    /// Number of accepted steps.
    pub accepted: usize,
    /// Number of rejected steps.
    pub rejected: usize,
    /// Number of model evaluations.
    pub evaluations: usize,
}

/// States reported at the requested sample times.
///
/// Row `i` of `y` is the state at `t[i]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Trajectory {
    pub t: Vec<f64>,
    pub y: DMatrix<f64>,
    pub stats: Stats,
}

impl Trajectory {
    pub(crate) fn from_rows(t: Vec<f64>, n: usize, rows: Vec<f64>, stats: Stats) -> Self {
        let y = DMatrix::from_row_slice(t.len(), n, &rows);
        Self { t, y, stats }
    }

    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }
}
