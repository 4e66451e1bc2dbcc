//! Criteria that end a run.
//!
//! Criteria are checked after every generation's evaluation and combined
//! with logical OR: the first one satisfied stops the run.

use crate::gp::fitness::Objective;
use std::fmt;
use std::time::Duration;

/// Snapshot of a run handed to termination criteria.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunState {
    /// Run index within the batch.
    pub run: usize,
    /// Generations bred so far (0 right after initialisation).
    pub generation: usize,
    /// Best fitness seen in the run.
    pub best_fitness: Option<f64>,
    /// Wall-clock time since the run started.
    pub elapsed: Duration,
    /// Optimisation direction.
    pub objective: Objective,
}

/// A condition that ends a run.
pub trait Termination: fmt::Debug {
    /// Whether the run should stop now.
    fn is_satisfied(&self, state: &RunState) -> bool;
}

/// Stop once this many generations have been bred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxGenerations(pub usize);

impl Termination for MaxGenerations {
    fn is_satisfied(&self, state: &RunState) -> bool {
        state.generation >= self.0
    }
}

/// Stop once the best fitness reaches the target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetFitness(pub f64);

impl Termination for TargetFitness {
    fn is_satisfied(&self, state: &RunState) -> bool {
        state
            .best_fitness
            .is_some_and(|best| state.objective.reaches(best, self.0))
    }
}

/// Stop once the run has used its wall-clock budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeLimit(pub Duration);

impl Termination for TimeLimit {
    fn is_satisfied(&self, state: &RunState) -> bool {
        state.elapsed >= self.0
    }
}
