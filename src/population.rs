//! Ordered collections of individuals.

// Population uses intentional casts for ratio statistics
#![allow(clippy::cast_precision_loss)]

use crate::gp::Objective;
use crate::individual::Individual;
use std::ops::Index;

/// An ordered sequence of individuals.
///
/// Order is significant: ties in [`Population::best`] and
/// [`Population::worst`] go to the individual encountered first, which
/// keeps selection reproducible for a fixed seed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Population {
    individuals: Vec<Individual>,
}

impl Population {
    /// Create an empty population.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty population with room for `capacity` individuals.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            individuals: Vec::with_capacity(capacity),
        }
    }

    /// Number of individuals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    /// Whether the population is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    /// Append an individual.
    pub fn push(&mut self, individual: Individual) {
        self.individuals.push(individual);
    }

    /// Individual at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Individual> {
        self.individuals.get(index)
    }

    /// Iterate in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Individual> {
        self.individuals.iter()
    }

    /// Iterate mutably in order.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Individual> {
        self.individuals.iter_mut()
    }

    /// The individuals as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[Individual] {
        &self.individuals
    }

    /// Mutable slice of the individuals.
    pub fn as_mut_slice(&mut self) -> &mut [Individual] {
        &mut self.individuals
    }

    /// Whether a structurally identical program is already present.
    #[must_use]
    pub fn contains(&self, individual: &Individual) -> bool {
        self.individuals
            .iter()
            .any(|i| i.program() == individual.program())
    }

    /// The fittest individual; ties go to the first encountered.
    #[must_use]
    pub fn best(&self, objective: Objective) -> Option<&Individual> {
        self.individuals.iter().reduce(|best, candidate| {
            if objective.ranks_before(candidate.fitness(), best.fitness()) {
                candidate
            } else {
                best
            }
        })
    }

    /// The least fit individual; ties go to the first encountered.
    #[must_use]
    pub fn worst(&self, objective: Objective) -> Option<&Individual> {
        self.individuals.iter().reduce(|worst, candidate| {
            if objective.ranks_before(worst.fitness(), candidate.fitness()) {
                candidate
            } else {
                worst
            }
        })
    }

    /// Indices of the population sorted from fittest to least fit.
    ///
    /// The sort is stable, so equally fit individuals keep their order.
    #[must_use]
    pub fn ranked_indices(&self, objective: Objective) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..self.individuals.len()).collect();
        indices.sort_by(|&a, &b| {
            objective.rank(self.individuals[a].fitness(), self.individuals[b].fitness())
        });
        indices
    }

    /// Fitness of every evaluated individual, in population order.
    #[must_use]
    pub fn fitness_values(&self) -> Vec<f64> {
        self.individuals
            .iter()
            .filter_map(Individual::fitness)
            .collect()
    }

    /// Fraction of structurally distinct programs, in `(0, 1]`.
    ///
    /// Returns 0 for an empty population.
    #[must_use]
    pub fn diversity(&self) -> f64 {
        if self.individuals.is_empty() {
            return 0.0;
        }
        // Same structural equality as `contains`.
        let distinct = self
            .individuals
            .iter()
            .enumerate()
            .filter(|&(index, individual)| {
                !self.individuals[..index]
                    .iter()
                    .any(|earlier| earlier.program() == individual.program())
            })
            .count();
        distinct as f64 / self.individuals.len() as f64
    }

    /// Shorten to at most `len` individuals.
    pub fn truncate(&mut self, len: usize) {
        self.individuals.truncate(len);
    }
}

impl Index<usize> for Population {
    type Output = Individual;

    fn index(&self, index: usize) -> &Self::Output {
        &self.individuals[index]
    }
}

impl From<Vec<Individual>> for Population {
    fn from(individuals: Vec<Individual>) -> Self {
        Self { individuals }
    }
}

impl FromIterator<Individual> for Population {
    fn from_iter<T: IntoIterator<Item = Individual>>(iter: T) -> Self {
        Self {
            individuals: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Population {
    type Item = Individual;
    type IntoIter = std::vec::IntoIter<Individual>;

    fn into_iter(self) -> Self::IntoIter {
        self.individuals.into_iter()
    }
}

impl<'a> IntoIterator for &'a Population {
    type Item = &'a Individual;
    type IntoIter = std::slice::Iter<'a, Individual>;

    fn into_iter(self) -> Self::IntoIter {
        self.individuals.iter()
    }
}
