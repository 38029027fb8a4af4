use std::{cell::RefCell, rc::Rc};

use crate::{SolverErrors, solution::Solution};

/// Notifications emitted by an [`OdeSolver`](crate::OdeSolver).
#[derive(Debug)]
pub enum SolutionEvent<'a> {
    /// An input changed; the cached solution is stale.
    Invalidated,
    /// A new solution was computed.
    Updated(&'a Solution),
    /// Recomputation failed.
    Failed(&'a SolverErrors),
}

pub trait SolutionObserver {
    fn observe(&mut self, event: &SolutionEvent<'_>);
}

impl<F> SolutionObserver for F
where
    F: FnMut(&SolutionEvent<'_>),
{
    fn observe(&mut self, event: &SolutionEvent<'_>) {
        self(event)
    }
}

/// Lets the caller keep a handle on an observer after handing it to a solver.
pub struct SharedObserver<T>(Rc<RefCell<T>>);

impl<T> SharedObserver<T> {
    pub fn new(observer: T) -> (Self, Rc<RefCell<T>>) {
        let shared = Rc::new(RefCell::new(observer));
        (Self(shared.clone()), shared)
    }
}

impl<T: SolutionObserver> SolutionObserver for SharedObserver<T> {
    fn observe(&mut self, event: &SolutionEvent<'_>) {
        self.0.borrow_mut().observe(event);
    }
}
