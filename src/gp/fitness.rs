//! Fitness evaluation for genetic programming.
//!
//! Fitness is a single `f64` whose direction is set by [`Objective`]. The
//! user supplies a [`FitnessFunction`]; since it is `Sync`, a population
//! can be scored on the rayon pool without touching any engine state.

use crate::individual::Individual;
use crate::node::EvalError;
use crate::population::Population;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Direction of optimisation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Objective {
    /// Lower fitness is better (e.g. error counts).
    #[default]
    Minimise,
    /// Higher fitness is better (e.g. scores).
    Maximise,
}

impl Objective {
    /// Whether `a` is strictly better than `b`.
    #[must_use]
    pub fn better(self, a: f64, b: f64) -> bool {
        self.rank(Some(a), Some(b)) == Ordering::Less
    }

    /// Order two fitness values from best to worst.
    ///
    /// Missing and NaN fitness rank after every real value, so an
    /// unevaluated or broken individual is never preferred.
    #[must_use]
    pub fn rank(self, a: Option<f64>, b: Option<f64>) -> Ordering {
        let a = a.filter(|f| !f.is_nan());
        let b = b.filter(|f| !f.is_nan());
        match (a, b) {
            (Some(a), Some(b)) => match self {
                Self::Minimise => a.total_cmp(&b),
                Self::Maximise => b.total_cmp(&a),
            },
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }

    /// Whether fitness `a` ranks strictly before `b`.
    #[must_use]
    pub fn ranks_before(self, a: Option<f64>, b: Option<f64>) -> bool {
        self.rank(a, b) == Ordering::Less
    }

    /// Whether `fitness` reaches `target`.
    #[must_use]
    pub fn reaches(self, fitness: f64, target: f64) -> bool {
        match self {
            Self::Minimise => fitness <= target,
            Self::Maximise => fitness >= target,
        }
    }
}

/// Error raised by a fitness function.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvaluationError {
    /// The program failed to evaluate.
    #[error("program evaluation failed: {0}")]
    Eval(#[from] EvalError),
    /// The fitness function reported its own failure.
    #[error("fitness evaluation failed: {0}")]
    Failed(String),
}

/// Scores an individual.
///
/// Implemented for every `Fn(&Individual) -> Result<f64, EvaluationError>`
/// that is `Sync`.
pub trait FitnessFunction: Sync {
    /// Compute the fitness of `individual`.
    ///
    /// # Errors
    ///
    /// Returns an error if the individual cannot be scored. The engine
    /// aborts the current run when this happens.
    fn evaluate(&self, individual: &Individual) -> Result<f64, EvaluationError>;
}

impl<F> FitnessFunction for F
where
    F: Fn(&Individual) -> Result<f64, EvaluationError> + Sync,
{
    fn evaluate(&self, individual: &Individual) -> Result<f64, EvaluationError> {
        self(individual)
    }
}

/// Assign fitness to every individual that has none.
///
/// Individuals that already carry a fitness (elites, reproduced parents)
/// are skipped. Returns the number of individuals evaluated.
///
/// # Errors
///
/// Returns the first error reported by `fitness`. With `parallel` set the
/// choice of "first" depends on scheduling.
pub fn evaluate_population<F>(
    population: &mut Population,
    fitness: &F,
    parallel: bool,
) -> Result<usize, EvaluationError>
where
    F: FitnessFunction + ?Sized,
{
    let pending = population.iter().filter(|i| !i.is_evaluated()).count();
    let score = |individual: &mut Individual| -> Result<(), EvaluationError> {
        let value = fitness.evaluate(individual)?;
        individual.set_fitness(value);
        Ok(())
    };

    if parallel {
        population
            .as_mut_slice()
            .par_iter_mut()
            .filter(|i| !i.is_evaluated())
            .try_for_each(score)?;
    } else {
        population
            .iter_mut()
            .filter(|i| !i.is_evaluated())
            .try_for_each(score)?;
    }

    Ok(pending)
}
