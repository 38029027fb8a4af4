use std::io;

use nalgebra::{DMatrix, DVectorView};
use odex_diffeq::Stats;

/// An ODE solution sampled at the requested times.
///
/// Row `i` of `y` is the state at `t[i]`; column `j` is the trajectory of
/// `variables[j]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Solution {
    pub t: Vec<f64>,
    pub y: DMatrix<f64>,
    pub variables: Vec<String>,
    pub stats: Stats,
}

impl Solution {
    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    /// `["time", variables...]`, the names a plot can select from.
    pub fn names(&self) -> Vec<String> {
        std::iter::once("time".to_string())
            .chain(self.variables.iter().cloned())
            .collect()
    }

    pub fn variable_index(&self, name: &str) -> Option<usize> {
        self.variables.iter().position(|v| v == name)
    }

    pub fn column(&self, index: usize) -> Option<DVectorView<'_, f64>> {
        (index < self.y.ncols()).then(|| self.y.column(index))
    }

    /// Samples of a named series. `"t"` and `"time"` select the sample times.
    pub fn series(&self, name: &str) -> Option<Vec<f64>> {
        if name == "t" || name == "time" {
            return Some(self.t.clone());
        }
        let index = self.variable_index(name)?;
        Some(self.y.column(index).iter().copied().collect())
    }

    pub fn row(&self, index: usize) -> Option<Vec<f64>> {
        (index < self.y.nrows()).then(|| self.y.row(index).iter().copied().collect())
    }

    pub fn final_state(&self) -> Option<Vec<f64>> {
        self.row(self.len().checked_sub(1)?)
    }

    /// Writes a `time,<variables...>` header followed by one record per sample.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(self.names())?;
        for (i, t) in self.t.iter().enumerate() {
            let mut record = Vec::with_capacity(self.y.ncols() + 1);
            record.push(t.to_string());
            record.extend(self.y.row(i).iter().map(|v| v.to_string()));
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solution() -> Solution {
        Solution {
            t: vec![0.0, 0.5, 1.0],
            y: DMatrix::from_row_slice(3, 2, &[1.0, 10.0, 2.0, 20.0, 3.0, 30.0]),
            variables: vec!["x".into(), "y".into()],
            stats: Stats::default(),
        }
    }

    #[test]
    fn series_by_name() {
        let solution = solution();
        assert_eq!(solution.names(), vec!["time", "x", "y"]);
        assert_eq!(solution.series("t").unwrap(), vec![0.0, 0.5, 1.0]);
        assert_eq!(solution.series("time").unwrap(), vec![0.0, 0.5, 1.0]);
        assert_eq!(solution.series("y").unwrap(), vec![10.0, 20.0, 30.0]);
        assert!(solution.series("z").is_none());
        assert_eq!(solution.column(0).unwrap()[2], 3.0);
        assert!(solution.column(2).is_none());
    }

    #[test]
    fn rows() {
        let solution = solution();
        assert_eq!(solution.row(1).unwrap(), vec![2.0, 20.0]);
        assert_eq!(solution.final_state().unwrap(), vec![3.0, 30.0]);
        assert!(solution.row(3).is_none());
    }

    #[test]
    fn csv_output() {
        let mut buffer = Vec::new();
        solution().write_csv(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["time,x,y", "0,1,10", "0.5,2,20", "1,3,30"]);
    }
}
