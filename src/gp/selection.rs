//! Selection operators for genetic programming.
//!
//! Selection determines which individuals reproduce based on fitness. A
//! [`Selector`] is prepared once per generation (fitness-proportionate
//! selection needs cumulative weights, over-selection needs a ranking) and
//! then queried for as many parents as the breeder needs.

// Selection uses intentional casts for ratio arithmetic
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]

use crate::error::ConfigError;
use crate::gp::fitness::Objective;
use crate::individual::Individual;
use crate::population::Population;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Parent selection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMethod {
    /// Fittest of `size` individuals drawn uniformly with replacement.
    Tournament {
        /// Number of competitors.
        size: usize,
    },
    /// Uniform draw; no selection pressure.
    Random,
    /// Roulette wheel over (adjusted) fitness.
    FitnessProportionate {
        /// Optional bias towards the top of the ranking.
        over_selection: Option<OverSelection>,
    },
}

impl Default for SelectionMethod {
    fn default() -> Self {
        Self::Tournament { size: 5 }
    }
}

impl SelectionMethod {
    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::Tournament { size: 0 } => Err(ConfigError::EmptyTournament),
            Self::FitnessProportionate {
                over_selection: Some(over),
            } => over.validate(),
            Self::Tournament { .. } | Self::Random | Self::FitnessProportionate { .. } => Ok(()),
        }
    }
}

/// Split of the ranked population for over-selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverSelection {
    /// Share of the ranking that forms the fitter group, in `(0, 1)`.
    pub fraction: f64,
    /// Probability of drawing from the fitter group.
    pub probability: f64,
}

impl Default for OverSelection {
    fn default() -> Self {
        Self {
            fraction: 0.32,
            probability: 0.8,
        }
    }
}

impl OverSelection {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fraction > 0.0 && self.fraction < 1.0) {
            return Err(ConfigError::OverSelection(self.fraction));
        }
        check_probability("over-selection", self.probability)
    }
}

/// A breeding pool built once per generation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// How pool members are drawn from the population.
    pub method: SelectionMethod,
    /// Number of pool members.
    pub size: usize,
}

/// Configuration for selection operations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// How parents are drawn.
    pub method: SelectionMethod,
    /// Number of elite individuals preserved unchanged.
    pub elite_count: usize,
    /// Optional breeding pool; parents are then drawn from the pool.
    pub pool: Option<PoolConfig>,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            method: SelectionMethod::default(),
            elite_count: 2,
            pool: None,
        }
    }
}

impl SelectionConfig {
    /// Check the configuration against the population size.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty tournament or pool, an invalid
    /// over-selection split, or more elites than population slots.
    pub fn validate(&self, population_size: usize) -> Result<(), ConfigError> {
        self.method.validate()?;
        if let Some(pool) = &self.pool {
            if pool.size == 0 {
                return Err(ConfigError::EmptyPool);
            }
            pool.method.validate()?;
        }
        if self.elite_count > population_size {
            return Err(ConfigError::TooManyElites {
                elites: self.elite_count,
                population: population_size,
            });
        }
        Ok(())
    }
}

/// Reject probabilities outside `[0, 1]` (including NaN).
pub(crate) fn check_probability(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Probability { name, value })
    }
}

/// Select the top `count` individuals, fittest first.
///
/// Equally fit individuals keep their population order.
#[must_use]
pub fn select_elite(population: &Population, count: usize, objective: Objective) -> Vec<Individual> {
    population
        .ranked_indices(objective)
        .into_iter()
        .take(count)
        .map(|i| population[i].clone())
        .collect()
}

/// Roulette wheel over a subset of the population.
#[derive(Debug, Clone)]
struct Roulette {
    members: Vec<usize>,
    cumulative: Vec<f64>,
}

impl Roulette {
    fn new(population: &Population, members: Vec<usize>, objective: Objective) -> Self {
        let fitness: Vec<Option<f64>> = members
            .iter()
            .map(|&i| population[i].fitness().filter(|f| f.is_finite()))
            .collect();
        let floor = fitness.iter().flatten().copied().fold(0.0_f64, f64::min);

        let mut total = 0.0;
        let cumulative = fitness
            .iter()
            .map(|f| {
                let weight = f.map_or(0.0, |f| {
                    let shifted = f - floor;
                    match objective {
                        Objective::Maximise => shifted,
                        Objective::Minimise => 1.0 / (1.0 + shifted),
                    }
                });
                total += weight;
                total
            })
            .collect();

        Self { members, cumulative }
    }

    fn spin<R: Rng>(&self, rng: &mut R) -> usize {
        let total = self.cumulative.last().copied().unwrap_or(0.0);
        if !(total > 0.0 && total.is_finite()) {
            return self.members[rng.gen_range(0..self.members.len())];
        }
        let target = rng.r#gen::<f64>() * total;
        let slot = self.cumulative.partition_point(|&c| c <= target);
        self.members[slot.min(self.members.len() - 1)]
    }
}

/// Prepared per-generation strategy.
#[derive(Debug, Clone)]
enum Strategy {
    Tournament(usize),
    Random,
    Proportionate(Roulette),
    OverSelected {
        fitter: Roulette,
        rest: Option<Roulette>,
        probability: f64,
    },
}

/// Parent selection over one population.
#[derive(Debug, Clone)]
pub struct Selector<'p> {
    population: &'p Population,
    objective: Objective,
    strategy: Strategy,
}

impl<'p> Selector<'p> {
    /// Prepare `method` over `population`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyPopulation`] if there is nothing to
    /// select from.
    pub fn new(
        population: &'p Population,
        method: &SelectionMethod,
        objective: Objective,
    ) -> Result<Self, ConfigError> {
        if population.is_empty() {
            return Err(ConfigError::EmptyPopulation);
        }

        let strategy = match *method {
            SelectionMethod::Tournament { size } => Strategy::Tournament(size.max(1)),
            SelectionMethod::Random => Strategy::Random,
            SelectionMethod::FitnessProportionate { over_selection: None } => {
                let all = (0..population.len()).collect();
                Strategy::Proportionate(Roulette::new(population, all, objective))
            }
            SelectionMethod::FitnessProportionate {
                over_selection: Some(over),
            } => {
                let mut ranked = population.ranked_indices(objective);
                let cut = ((ranked.len() as f64 * over.fraction).ceil() as usize).clamp(1, ranked.len());
                let rest = ranked.split_off(cut);
                Strategy::OverSelected {
                    fitter: Roulette::new(population, ranked, objective),
                    rest: (!rest.is_empty()).then(|| Roulette::new(population, rest, objective)),
                    probability: over.probability,
                }
            }
        };

        Ok(Self {
            population,
            objective,
            strategy,
        })
    }

    /// Draw one parent.
    pub fn select<R: Rng>(&self, rng: &mut R) -> &'p Individual {
        let index = match &self.strategy {
            Strategy::Tournament(size) => self.tournament(*size, rng),
            Strategy::Random => rng.gen_range(0..self.population.len()),
            Strategy::Proportionate(wheel) => wheel.spin(rng),
            Strategy::OverSelected {
                fitter,
                rest,
                probability,
            } => match rest {
                Some(rest) if !rng.gen_bool(*probability) => rest.spin(rng),
                _ => fitter.spin(rng),
            },
        };
        &self.population[index]
    }

    /// Draw `size` parents into a new population.
    pub fn select_pool<R: Rng>(&self, size: usize, rng: &mut R) -> Population {
        (0..size).map(|_| self.select(rng).clone()).collect()
    }

    /// Tournament selection: draw `k` with replacement and keep the best.
    /// The first drawn wins ties.
    fn tournament<R: Rng>(&self, k: usize, rng: &mut R) -> usize {
        let pop_size = self.population.len();
        let mut best_idx = rng.gen_range(0..pop_size);
        let mut best_fitness = self.population[best_idx].fitness();

        for _ in 1..k {
            let idx = rng.gen_range(0..pop_size);
            let fitness = self.population[idx].fitness();
            if self.objective.ranks_before(fitness, best_fitness) {
                best_idx = idx;
                best_fitness = fitness;
            }
        }

        best_idx
    }
}
