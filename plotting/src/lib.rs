//! Selecting series out of an ODE [`Solution`](odex::Solution) and drawing them.
//!
//! A [`Plot2d`] or [`Plot3d`] names the series it wants; [`bind`](Plot2d::bind)
//! pulls them out of a solution and the `render` functions write a PNG.
//! [`PlotObserver`] redraws whenever the solver produces a new solution.

use thiserror::Error;

mod observer;
mod render;
mod selection;

pub use observer::PlotObserver;
pub use render::{PlotStyle, render_2d, render_3d};
pub use selection::{Plot, Plot2d, Plot3d, Series2d, Series3d};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlotErrors {
    #[error("unknown series '{name}', expected one of {available:?}")]
    UnknownSeries {
        name: String,
        available: Vec<String>,
    },
    #[error("nothing to plot")]
    Empty,
    #[error("drawing failed: {0}")]
    Drawing(String),
}
