//! Generational breeding.
//!
//! One call to [`Breeder::breed`] turns an evaluated population into the
//! next generation of the same size:
//!
//! ```text
//! elites ──▶ next[0..elite_count]
//! pool?  ──▶ selector
//! while next is short:
//!     pick crossover | mutation | reproduction
//!     apply, review with listeners, check depth
//!     rejected or too deep? retry (bounded), then reproduce a parent
//! ```

use crate::error::ConfigError;
use crate::events::{Event, EventBus, Operator, Outcome};
use crate::gp::crossover::crossover;
use crate::gp::evolution::EvolutionConfig;
use crate::gp::init::TreeGenerator;
use crate::gp::mutation::mutate;
use crate::gp::selection::{Selector, select_elite};
use crate::individual::Individual;
use crate::population::Population;
use crate::syntax::Syntax;
use rand::Rng;

/// Builds successive generations from a fixed configuration.
#[derive(Debug, Clone, Copy)]
pub struct Breeder<'a> {
    config: &'a EvolutionConfig,
    syntax: &'a Syntax,
    generator: &'a TreeGenerator,
}

/// Where a breeding slot sits within the batch, for event payloads.
#[derive(Debug, Clone, Copy)]
struct Slot {
    run: usize,
    generation: usize,
}

impl<'a> Breeder<'a> {
    /// Create a breeder. `generator` must cover the configured
    /// `max_subtree_depth`.
    #[must_use]
    pub fn new(config: &'a EvolutionConfig, syntax: &'a Syntax, generator: &'a TreeGenerator) -> Self {
        Self {
            config,
            syntax,
            generator,
        }
    }

    /// Breed generation `generation` of run `run` from `population`.
    ///
    /// The result always holds `population_size` individuals. Elites and
    /// reproduced parents keep their fitness; all other offspring are
    /// unevaluated.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyPopulation`] if there is nothing to
    /// select from.
    pub fn breed<R: Rng>(
        &self,
        population: &Population,
        bus: &EventBus,
        run: usize,
        generation: usize,
        rng: &mut R,
    ) -> Result<Population, ConfigError> {
        let size = self.config.population_size;
        let objective = self.config.objective;
        let selection = &self.config.selection;
        let slot = Slot { run, generation };

        let mut next = Population::with_capacity(size);

        let elites = select_elite(population, selection.elite_count.min(size), objective);
        bus.publish(&Event::Elitism {
            run,
            generation,
            elites: &elites,
        });
        for elite in elites {
            next.push(elite);
        }

        let pool = match &selection.pool {
            Some(pool) => Some(Selector::new(population, &pool.method, objective)?.select_pool(pool.size, rng)),
            None => None,
        };
        let selector = Selector::new(pool.as_ref().unwrap_or(population), &selection.method, objective)?;

        while next.len() < size {
            for child in self.fill_slot(&selector, bus, slot, rng) {
                if next.len() == size {
                    break;
                }
                next.push(child);
            }
        }

        Ok(next)
    }

    /// Produce offspring for one slot, retrying on veto or excess depth.
    fn fill_slot<R: Rng>(&self, selector: &Selector<'_>, bus: &EventBus, slot: Slot, rng: &mut R) -> Vec<Individual> {
        let crossover_probability = self.config.crossover.probability;
        let mutation_probability = self.config.mutation.probability;

        for attempt in 1..=self.config.max_breed_attempts {
            let roll = rng.r#gen::<f64>();
            let (operator, parents, children) = if roll < crossover_probability {
                let parents = vec![selector.select(rng).clone(), selector.select(rng).clone()];
                let children = Vec::from(crossover(&parents[0], &parents[1], &self.config.crossover, rng));
                (Operator::Crossover, parents, children)
            } else if roll < crossover_probability + mutation_probability {
                let parent = selector.select(rng).clone();
                let child = mutate(&parent, self.syntax, self.generator, &self.config.mutation, rng);
                (Operator::Mutation, vec![parent], vec![child])
            } else {
                let parent = selector.select(rng).clone();
                let child = parent.clone();
                (Operator::Reproduction, vec![parent], vec![child])
            };

            match bus.review(operator, slot.run, slot.generation, &parents, children) {
                Outcome::Rejected => {
                    log::trace!("{operator:?} offspring rejected by listener (attempt {attempt})");
                }
                Outcome::Accepted(children) => {
                    if children.iter().all(|c| c.depth() <= self.config.max_depth) {
                        return children;
                    }
                    log::trace!("{operator:?} offspring exceed depth {} (attempt {attempt})", self.config.max_depth);
                }
            }
        }

        log::warn!(
            "breeding slot fell back to reproduction after {} attempts",
            self.config.max_breed_attempts
        );
        vec![selector.select(rng).clone()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventKind, Listener, Verdict};
    use crate::gp::fitness::Objective;
    use crate::node::{DataType, Function, Primitive};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn syntax() -> Syntax {
        Syntax::new(
            vec![
                Function::And.into(),
                Function::Or.into(),
                Function::Not.into(),
                Primitive::variable("D0", DataType::Boolean),
                Primitive::variable("D1", DataType::Boolean),
            ],
            DataType::Boolean,
        )
        .unwrap()
    }

    fn scored_population(generator: &TreeGenerator, size: usize, rng: &mut StdRng) -> Population {
        (0..size)
            .map(|i| {
                let mut individual = Individual::new(generator.grow(DataType::Boolean, 3, rng).unwrap());
                individual.set_fitness(f64::from(u32::try_from(i).unwrap()));
                individual
            })
            .collect()
    }

    struct RejectAll;

    impl Listener for RejectAll {
        fn notify(&mut self, _event: &Event<'_>) {}

        fn review(&mut self, _event: &Event<'_>) -> Verdict {
            Verdict::Reject
        }
    }

    #[test]
    fn test_breed_keeps_size_and_elites() {
        let syntax = syntax();
        let generator = TreeGenerator::new(&syntax, 4);
        let config = EvolutionConfig {
            population_size: 20,
            ..EvolutionConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(4);
        let population = scored_population(&generator, 20, &mut rng);

        let breeder = Breeder::new(&config, &syntax, &generator);
        let next = breeder.breed(&population, &EventBus::new(), 0, 1, &mut rng).unwrap();

        assert_eq!(next.len(), 20);
        // Minimising: individuals 0 and 1 are the elites.
        assert_eq!(next[0], population[0]);
        assert_eq!(next[1], population[1]);
        assert!(next.iter().all(|i| i.depth() <= config.max_depth));
    }

    #[test]
    fn test_rejecting_listener_falls_back_to_reproduction() {
        let syntax = syntax();
        let generator = TreeGenerator::new(&syntax, 4);
        let config = EvolutionConfig {
            population_size: 10,
            max_breed_attempts: 3,
            ..EvolutionConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(8);
        let population = scored_population(&generator, 10, &mut rng);

        let mut bus = EventBus::new();
        let veto = Rc::new(RefCell::new(RejectAll));
        for kind in [EventKind::Crossover, EventKind::Mutation, EventKind::Reproduction] {
            bus.subscribe(kind, veto.clone()).unwrap();
        }

        let breeder = Breeder::new(&config, &syntax, &generator);
        let next = breeder.breed(&population, &bus, 0, 1, &mut rng).unwrap();

        assert_eq!(next.len(), 10);
        // Every slot is a reproduced parent and keeps its fitness.
        assert!(next.iter().all(|i| population.contains(i) && i.fitness().is_some()));
    }

    #[test]
    fn test_oversized_offspring_are_discarded() {
        let syntax = syntax();
        let generator = TreeGenerator::new(&syntax, 4);
        let config = EvolutionConfig {
            population_size: 30,
            max_depth: 4,
            objective: Objective::Maximise,
            ..EvolutionConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(15);
        let population: Population = (0..30)
            .map(|_| {
                let mut individual = Individual::new(generator.full(DataType::Boolean, 4, &mut rng).unwrap());
                individual.set_fitness(1.0);
                individual
            })
            .collect();

        let breeder = Breeder::new(&config, &syntax, &generator);
        for generation in 1..=5 {
            let next = breeder.breed(&population, &EventBus::new(), 0, generation, &mut rng).unwrap();
            assert!(next.iter().all(|i| i.depth() <= 4));
        }
    }

    #[test]
    fn test_pool_restricts_parents() {
        let syntax = syntax();
        let generator = TreeGenerator::new(&syntax, 4);
        let mut config = EvolutionConfig {
            population_size: 12,
            ..EvolutionConfig::default()
        };
        config.selection.elite_count = 0;
        config.selection.pool = Some(crate::gp::selection::PoolConfig {
            method: crate::gp::selection::SelectionMethod::Tournament { size: 12 },
            size: 3,
        });
        config.crossover.probability = 0.0;
        config.mutation.probability = 0.0;

        let mut rng = StdRng::seed_from_u64(30);
        let population = scored_population(&generator, 12, &mut rng);
        let breeder = Breeder::new(&config, &syntax, &generator);
        let next = breeder.breed(&population, &EventBus::new(), 0, 1, &mut rng).unwrap();

        // Pure reproduction from a pool of three strongly selected members.
        let distinct: std::collections::HashSet<String> = next.iter().map(ToString::to_string).collect();
        assert!(distinct.len() <= 3);
        assert!(next.iter().all(|i| i.fitness().is_some_and(|f| f < 6.0)));
    }
}
