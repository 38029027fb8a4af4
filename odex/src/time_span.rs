use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum TimeSpanErrors {
    #[error("at least one sample time is required")]
    Empty,
    #[error("sample time {value} at index {index} is not finite")]
    NonFinite { index: usize, value: f64 },
    #[error("sample time {value} at index {index} is smaller than the one before it")]
    Decreasing { index: usize, value: f64 },
}

/// The times at which a solution is reported.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TimeSpan {
    /// Explicit sample times.
    Samples(Vec<f64>),
    /// `count` equal intervals on `[start, stop]`, so `count + 1` samples.
    Linspace { start: f64, stop: f64, count: usize },
}

impl Default for TimeSpan {
    fn default() -> Self {
        Self::Linspace {
            start: 0.0,
            stop: 10.0,
            count: 1000,
        }
    }
}

impl TimeSpan {
    pub fn linspace(start: f64, stop: f64, count: usize) -> Self {
        Self::Linspace { start, stop, count }
    }

    /// Materializes and validates the sample times.
    pub fn times(&self) -> Result<Vec<f64>, TimeSpanErrors> {
        let times = match self {
            TimeSpan::Samples(times) => times.clone(),
            TimeSpan::Linspace { start, stop, count } => linspace(*start, *stop, count + 1),
        };
        validate(&times)?;
        Ok(times)
    }
}

/// `points` evenly spaced values from `start` to `stop` inclusive.
pub fn linspace(start: f64, stop: f64, points: usize) -> Vec<f64> {
    match points {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (points - 1) as f64;
            let mut values: Vec<f64> = (0..points).map(|i| start + i as f64 * step).collect();
            values[points - 1] = stop;
            values
        }
    }
}

pub fn validate(times: &[f64]) -> Result<(), TimeSpanErrors> {
    if times.is_empty() {
        return Err(TimeSpanErrors::Empty);
    }
    for (index, &value) in times.iter().enumerate() {
        if !value.is_finite() {
            return Err(TimeSpanErrors::NonFinite { index, value });
        }
        if index > 0 && value < times[index - 1] {
            return Err(TimeSpanErrors::Decreasing { index, value });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn default_is_a_thousand_intervals_over_ten_seconds() {
        let times = TimeSpan::default().times().unwrap();
        assert_eq!(times.len(), 1001);
        assert_eq!(times[0], 0.0);
        assert_abs_diff_eq!(times[1], 0.01);
        assert_eq!(times[1000], 10.0);
    }

    #[test]
    fn linspace_endpoints_are_exact() {
        let values = linspace(0.1, 0.7, 7);
        assert_eq!(values[0], 0.1);
        assert_eq!(values[6], 0.7);
        assert!(linspace(0.0, 1.0, 0).is_empty());
        assert_eq!(linspace(3.0, 5.0, 1), vec![3.0]);
        assert_eq!(TimeSpan::linspace(2.0, 2.0, 0).times().unwrap(), vec![2.0]);
    }

    #[test]
    fn samples_are_validated() {
        assert_eq!(
            TimeSpan::Samples(vec![]).times(),
            Err(TimeSpanErrors::Empty)
        );
        assert_eq!(
            TimeSpan::Samples(vec![0.0, 2.0, 1.0]).times(),
            Err(TimeSpanErrors::Decreasing {
                index: 2,
                value: 1.0
            })
        );
        assert!(matches!(
            TimeSpan::Samples(vec![0.0, f64::INFINITY]).times(),
            Err(TimeSpanErrors::NonFinite { index: 1, .. })
        ));
        assert_eq!(
            TimeSpan::Samples(vec![0.0, 1.0, 1.0]).times().unwrap(),
            vec![0.0, 1.0, 1.0]
        );
    }

    #[test]
    fn reversed_range_is_rejected() {
        assert!(matches!(
            TimeSpan::linspace(10.0, 0.0, 10).times(),
            Err(TimeSpanErrors::Decreasing { index: 1, .. })
        ));
    }
}
