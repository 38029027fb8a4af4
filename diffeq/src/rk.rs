use std::array;

use nalgebra::DVector;

use crate::{IntegrationErrors, OdeModel, tableau::ButcherTableau};

/// Explicit Runge-Kutta stepper with preallocated stage buffers.
pub struct RungeKutta<const STAGES: usize> {
    tableau: ButcherTableau<STAGES>,
    k: [DVector<f64>; STAGES],
    stage: DVector<f64>,
    /// Solution after the last call to `step`.
    pub y: DVector<f64>,
    /// Embedded estimate after the last call to `step`, only meaningful when
    /// the tableau carries `b2`.
    pub y_star: DVector<f64>,
    evaluations: usize,
}

impl<const STAGES: usize> RungeKutta<STAGES> {
    /// Creates a stepper for states of length `n`.
    pub fn new(tableau: ButcherTableau<STAGES>, n: usize) -> Self {
        Self {
            tableau,
            k: array::from_fn(|_| DVector::zeros(n)),
            stage: DVector::zeros(n),
            y: DVector::zeros(n),
            y_star: DVector::zeros(n),
            evaluations: 0,
        }
    }

    pub fn order(&self) -> usize {
        self.tableau.order
    }

    pub fn is_embedded(&self) -> bool {
        self.tableau.b2.is_some()
    }

    /// Total number of model evaluations made by this stepper.
    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    /// Takes one step of size `h` from `(t, x)`, leaving the result in `y`
    /// (and the embedded estimate in `y_star`).
    pub fn step<Model: OdeModel>(
        &mut self,
        model: &mut Model,
        t: f64,
        x: &DVector<f64>,
        h: f64,
    ) -> Result<(), IntegrationErrors> {
        // k0
        model
            .f(t, x, &mut self.k[0])
            .map_err(|source| IntegrationErrors::Model { t, source })?;
        self.evaluations += 1;

        // k1 - ks
        for s in 1..STAGES {
            // in place calculation of intermediate points
            self.stage.copy_from(x);
            for i in 0..s {
                let a = self.tableau.a[s][i];
                if a != 0.0 {
                    self.stage.axpy(h * a, &self.k[i], 1.0);
                }
            }
            let ts = t + self.tableau.c[s] * h;
            model
                .f(ts, &self.stage, &mut self.k[s])
                .map_err(|source| IntegrationErrors::Model { t: ts, source })?;
            self.evaluations += 1;
        }

        self.y.copy_from(x);
        for s in 0..STAGES {
            let b = self.tableau.b[s];
            if b != 0.0 {
                self.y.axpy(h * b, &self.k[s], 1.0);
            }
        }

        if let Some(b2) = self.tableau.b2 {
            self.y_star.copy_from(x);
            for s in 0..STAGES {
                if b2[s] != 0.0 {
                    self.y_star.axpy(h * b2[s], &self.k[s], 1.0);
                }
            }
        }
        Ok(())
    }
}
