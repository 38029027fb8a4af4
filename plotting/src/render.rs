use std::{ops::Range, path::Path};

use plotters::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{PlotErrors, Series2d, Series3d};

/// Image settings shared by 2d and 3d plots.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlotStyle {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            title: String::new(),
            width: 1200,
            height: 800,
        }
    }
}

impl PlotStyle {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

fn drawing<E: std::fmt::Display>(e: E) -> PlotErrors {
    PlotErrors::Drawing(e.to_string())
}

/// Finite extent of `values` with a 5% margin on either side.
pub(crate) fn axis_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (min, max) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), v| {
            (min.min(v), max.max(v))
        });
    if min > max {
        return 0.0..1.0;
    }
    let margin = if max > min { (max - min) * 0.05 } else { 1.0 };
    (min - margin)..(max + margin)
}

/// Maps a scalar in `[low, high]` to a hue from blue to red.
pub(crate) fn scalar_color(value: f64, low: f64, high: f64) -> HSLColor {
    let fraction = if high > low {
        ((value - low) / (high - low)).clamp(0.0, 1.0)
    } else {
        0.0
    };
    HSLColor((1.0 - fraction) * 240.0 / 360.0, 0.9, 0.45)
}

pub fn render_2d(series: &Series2d, style: &PlotStyle, path: &Path) -> Result<(), PlotErrors> {
    if series.points.is_empty() {
        return Err(PlotErrors::Empty);
    }
    let root = BitMapBackend::new(path, (style.width, style.height)).into_drawing_area();
    root.fill(&WHITE).map_err(drawing)?;

    let x_range = axis_range(series.points.iter().map(|p| p.0));
    let y_range = axis_range(series.points.iter().map(|p| p.1));

    let mut chart = ChartBuilder::on(&root)
        .caption(&style.title, ("sans-serif", 30))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)
        .map_err(drawing)?;

    chart
        .configure_mesh()
        .x_desc(&series.x_label)
        .y_desc(&series.y_label)
        .draw()
        .map_err(drawing)?;

    chart
        .draw_series(LineSeries::new(
            series.points.iter().copied(),
            BLUE.stroke_width(2),
        ))
        .map_err(drawing)?;

    root.present().map_err(drawing)?;
    Ok(())
}

pub fn render_3d(series: &Series3d, style: &PlotStyle, path: &Path) -> Result<(), PlotErrors> {
    if series.points.is_empty() {
        return Err(PlotErrors::Empty);
    }
    let root = BitMapBackend::new(path, (style.width, style.height)).into_drawing_area();
    root.fill(&WHITE).map_err(drawing)?;

    let x_range = axis_range(series.points.iter().map(|p| p.0));
    let y_range = axis_range(series.points.iter().map(|p| p.1));
    let z_range = axis_range(series.points.iter().map(|p| p.2));
    let s_range = axis_range(series.scalars.iter().copied());

    let mut chart = ChartBuilder::on(&root)
        .caption(&style.title, ("sans-serif", 30))
        .margin(20)
        .build_cartesian_3d(x_range, y_range, z_range)
        .map_err(drawing)?;

    chart
        .configure_axes()
        .draw()
        .map_err(drawing)?;

    // one segment per sample so the color can follow the scalar
    chart
        .draw_series(
            series
                .points
                .windows(2)
                .zip(&series.scalars)
                .map(|(segment, &s)| {
                    let color = scalar_color(s, s_range.start, s_range.end);
                    PathElement::new(vec![segment[0], segment[1]], color.stroke_width(2))
                }),
        )
        .map_err(drawing)?;

    root.present().map_err(drawing)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn ranges_have_a_margin() {
        let range = axis_range([0.0, 10.0, 5.0].into_iter());
        assert_abs_diff_eq!(range.start, -0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(range.end, 10.5, epsilon = 1e-12);
    }

    #[test]
    fn degenerate_ranges_are_widened() {
        let range = axis_range([3.0, 3.0].into_iter());
        assert_eq!(range, 2.0..4.0);
        let range = axis_range([f64::NAN].into_iter());
        assert_eq!(range, 0.0..1.0);
        let range = axis_range([1.0, f64::INFINITY, 2.0].into_iter());
        assert_abs_diff_eq!(range.end, 2.05, epsilon = 1e-12);
    }

    #[test]
    fn colors_run_from_blue_to_red() {
        assert_abs_diff_eq!(scalar_color(0.0, 0.0, 1.0).0, 240.0 / 360.0);
        assert_abs_diff_eq!(scalar_color(1.0, 0.0, 1.0).0, 0.0);
        assert_abs_diff_eq!(scalar_color(5.0, 0.0, 1.0).0, 0.0);
        assert_abs_diff_eq!(scalar_color(0.5, 1.0, 1.0).0, 240.0 / 360.0);
    }

    #[test]
    fn empty_series_is_not_drawn() {
        let series = Series2d {
            x_label: "time".into(),
            y_label: "x".into(),
            points: Vec::new(),
        };
        let path = std::env::temp_dir().join("odex_plotting_empty.png");
        assert_eq!(
            render_2d(&series, &PlotStyle::default(), &path),
            Err(PlotErrors::Empty)
        );
        assert!(!path.exists());
    }
}
