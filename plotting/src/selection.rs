use odex::Solution;
use serde::{Deserialize, Serialize};

use crate::PlotErrors;

fn series(solution: &Solution, name: &str) -> Result<Vec<f64>, PlotErrors> {
    solution
        .series(name)
        .ok_or_else(|| PlotErrors::UnknownSeries {
            name: name.to_string(),
            available: solution.names(),
        })
}

/// One series against another. Selected names come from
/// `["time", variables...]`; `"t"` also selects time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Plot2d {
    pub index: String,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Series2d {
    pub x_label: String,
    pub y_label: String,
    pub points: Vec<(f64, f64)>,
}

impl Plot2d {
    pub fn new(index: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            value: value.into(),
        }
    }

    /// Time against the last variable.
    pub fn defaults(names: &[String]) -> Self {
        let first = names.first().cloned().unwrap_or_else(|| "time".into());
        let last = names.last().cloned().unwrap_or_else(|| first.clone());
        Self::new(first, last)
    }

    pub fn for_solution(solution: &Solution) -> Self {
        Self::defaults(&solution.names())
    }

    pub fn bind(&self, solution: &Solution) -> Result<Series2d, PlotErrors> {
        let x = series(solution, &self.index)?;
        let y = series(solution, &self.value)?;
        if x.is_empty() {
            return Err(PlotErrors::Empty);
        }
        Ok(Series2d {
            x_label: self.index.clone(),
            y_label: self.value.clone(),
            points: x.into_iter().zip(y).collect(),
        })
    }
}

/// A trajectory through three series, colored by a fourth.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Plot3d {
    pub x: String,
    pub y: String,
    pub z: String,
    pub s: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Series3d {
    pub labels: [String; 4],
    pub points: Vec<(f64, f64, f64)>,
    pub scalars: Vec<f64>,
}

impl Plot3d {
    pub fn new(
        x: impl Into<String>,
        y: impl Into<String>,
        z: impl Into<String>,
        s: impl Into<String>,
    ) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
            z: z.into(),
            s: s.into(),
        }
    }

    /// The first three variables (wrapping around for smaller systems),
    /// colored by time.
    pub fn defaults(names: &[String]) -> Self {
        if names.is_empty() {
            return Self::new("time", "time", "time", "time");
        }
        let n = names.len();
        Self::new(
            names[1 % n].clone(),
            names[2 % n].clone(),
            names[3 % n].clone(),
            names[0].clone(),
        )
    }

    pub fn for_solution(solution: &Solution) -> Self {
        Self::defaults(&solution.names())
    }

    pub fn bind(&self, solution: &Solution) -> Result<Series3d, PlotErrors> {
        let x = series(solution, &self.x)?;
        let y = series(solution, &self.y)?;
        let z = series(solution, &self.z)?;
        let scalars = series(solution, &self.s)?;
        if x.is_empty() {
            return Err(PlotErrors::Empty);
        }
        let points = x
            .into_iter()
            .zip(y)
            .zip(z)
            .map(|((x, y), z)| (x, y, z))
            .collect();
        Ok(Series3d {
            labels: [
                self.x.clone(),
                self.y.clone(),
                self.z.clone(),
                self.s.clone(),
            ],
            points,
            scalars,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Plot {
    TwoD(Plot2d),
    ThreeD(Plot3d),
}

impl From<Plot2d> for Plot {
    fn from(plot: Plot2d) -> Self {
        Plot::TwoD(plot)
    }
}

impl From<Plot3d> for Plot {
    fn from(plot: Plot3d) -> Self {
        Plot::ThreeD(plot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use odex::{GenericOde, OdeSolver, TimeSpan};

    fn solve(ode: GenericOde) -> Solution {
        let mut solver = OdeSolver::new(ode)
            .with_times(TimeSpan::linspace(0.0, 1.0, 4))
            .unwrap();
        solver.solution().unwrap().clone()
    }

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn default_2d_selection() {
        let plot = Plot2d::defaults(&names(&["time", "x", "y", "z"]));
        assert_eq!(plot, Plot2d::new("time", "z"));
        let plot = Plot2d::defaults(&names(&["time", "Epidemic Spread"]));
        assert_eq!(plot, Plot2d::new("time", "Epidemic Spread"));
    }

    #[test]
    fn default_3d_selection_wraps_around() {
        let plot = Plot3d::defaults(&names(&["time", "x", "y", "z"]));
        assert_eq!(plot, Plot3d::new("x", "y", "z", "time"));
        let plot = Plot3d::defaults(&names(&["time", "x", "y"]));
        assert_eq!(plot, Plot3d::new("x", "y", "time", "time"));
        let plot = Plot3d::defaults(&names(&["time", "x"]));
        assert_eq!(plot, Plot3d::new("x", "time", "x", "time"));
    }

    #[test]
    fn bind_2d_pairs_samples() {
        let solution = solve(GenericOde::three_d());
        let series = Plot2d::new("t", "x").bind(&solution).unwrap();
        assert_eq!(series.points.len(), 5);
        assert_eq!(series.points[0], (0.0, 5.0));
        assert_eq!(series.x_label, "t");
    }

    #[test]
    fn bind_3d_uses_time_as_scalar() {
        let solution = solve(GenericOde::three_d());
        let series = Plot3d::for_solution(&solution).bind(&solution).unwrap();
        assert_eq!(series.points.len(), 5);
        assert_eq!(series.scalars, solution.t);
        assert_eq!(series.labels[3], "time");
    }

    #[test]
    fn unknown_names_are_errors() {
        let solution = solve(GenericOde::one_d());
        let err = Plot2d::new("time", "y").bind(&solution).unwrap_err();
        assert_eq!(
            err,
            PlotErrors::UnknownSeries {
                name: "y".into(),
                available: names(&["time", "x"]),
            }
        );
    }
}
