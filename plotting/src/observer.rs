use std::path::PathBuf;

use odex::{Solution, SolutionEvent, SolutionObserver};
use tracing::{debug, warn};

use crate::{Plot, PlotErrors, PlotStyle, render_2d, render_3d};

/// Redraws a plot to a PNG file every time a new solution arrives.
#[derive(Debug)]
pub struct PlotObserver {
    pub plot: Plot,
    pub style: PlotStyle,
    pub path: PathBuf,
    renders: usize,
    last_error: Option<PlotErrors>,
}

impl PlotObserver {
    pub fn new(plot: impl Into<Plot>, style: PlotStyle, path: impl Into<PathBuf>) -> Self {
        Self {
            plot: plot.into(),
            style,
            path: path.into(),
            renders: 0,
            last_error: None,
        }
    }

    /// Number of successful redraws.
    pub fn renders(&self) -> usize {
        self.renders
    }

    pub fn last_error(&self) -> Option<&PlotErrors> {
        self.last_error.as_ref()
    }

    pub fn redraw(&mut self, solution: &Solution) -> Result<(), PlotErrors> {
        match &self.plot {
            Plot::TwoD(plot) => render_2d(&plot.bind(solution)?, &self.style, &self.path),
            Plot::ThreeD(plot) => render_3d(&plot.bind(solution)?, &self.style, &self.path),
        }
    }
}

impl SolutionObserver for PlotObserver {
    fn observe(&mut self, event: &SolutionEvent<'_>) {
        let SolutionEvent::Updated(solution) = event else {
            return;
        };
        match self.redraw(solution) {
            Ok(()) => {
                self.renders += 1;
                self.last_error = None;
                debug!("redrew {}", self.path.display());
            }
            Err(e) => {
                warn!("could not redraw {}: {e}", self.path.display());
                self.last_error = Some(e);
            }
        }
    }
}
