//! Run statistics gathered from engine events.
//!
//! [`StatsCollector`] is an ordinary [`Listener`]: subscribe it to
//! [`StatsCollector::KINDS`] and it records one [`GenerationRecord`] per
//! evaluated generation and one [`RunRecord`] per finished run.

#![allow(clippy::cast_precision_loss)]

use crate::error::ConfigError;
use crate::events::{Event, EventBus, EventKind, Listener, SharedListener};
use crate::gp::Objective;
use crate::individual::Individual;
use crate::population::Population;
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;

/// Summary of a set of fitness values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FitnessSummary {
    /// Best value under the objective.
    pub best: f64,
    /// Worst value under the objective.
    pub worst: f64,
    /// Arithmetic mean.
    pub mean: f64,
    /// Population standard deviation.
    pub std_dev: f64,
    /// Number of finite values summarised.
    pub count: usize,
}

impl FitnessSummary {
    /// Summarise `values`, ignoring non-finite entries.
    ///
    /// Every field is 0 when no finite value remains.
    #[must_use]
    pub fn from_fitness(values: &[f64], objective: Objective) -> Self {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            return Self {
                best: 0.0,
                worst: 0.0,
                mean: 0.0,
                std_dev: 0.0,
                count: 0,
            };
        }

        let n = finite.len() as f64;
        let mean = finite.iter().sum::<f64>() / n;
        let variance = finite.iter().map(|f| (f - mean).powi(2)).sum::<f64>() / n;
        let low = finite.iter().copied().fold(f64::INFINITY, f64::min);
        let high = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let (best, worst) = match objective {
            Objective::Minimise => (low, high),
            Objective::Maximise => (high, low),
        };

        Self {
            best,
            worst,
            mean,
            std_dev: variance.sqrt(),
            count: finite.len(),
        }
    }
}

/// Snapshot of one evaluated generation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenerationRecord {
    /// Run index.
    pub run: usize,
    /// Generation index (0 is the initial population).
    pub generation: usize,
    /// Fitness of the generation.
    pub fitness: FitnessSummary,
    /// Mean program depth.
    pub mean_depth: f64,
    /// Mean program size in nodes.
    pub mean_size: f64,
    /// Fraction of distinct programs.
    pub diversity: f64,
}

impl GenerationRecord {
    /// Measure `population`.
    #[must_use]
    pub fn from_population(run: usize, generation: usize, population: &Population, objective: Objective) -> Self {
        let (mean_depth, mean_size) = if population.is_empty() {
            (0.0, 0.0)
        } else {
            let n = population.len() as f64;
            let depth: usize = population.iter().map(Individual::depth).sum();
            let size: usize = population.iter().map(Individual::size).sum();
            (depth as f64 / n, size as f64 / n)
        };

        Self {
            run,
            generation,
            fitness: FitnessSummary::from_fitness(&population.fitness_values(), objective),
            mean_depth,
            mean_size,
            diversity: population.diversity(),
        }
    }
}

/// Summary of one finished run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRecord {
    /// Run index.
    pub run: usize,
    /// Generations bred.
    pub generations: usize,
    /// Fitness of the run's best individual; `None` if the run failed.
    pub best_fitness: Option<f64>,
    /// The best program, rendered.
    pub best_program: Option<String>,
}

/// Listener that accumulates [`GenerationRecord`]s and [`RunRecord`]s.
#[derive(Debug, Clone, Default)]
pub struct StatsCollector {
    objective: Objective,
    generations: Vec<GenerationRecord>,
    runs: Vec<RunRecord>,
}

impl StatsCollector {
    /// Event kinds the collector consumes.
    pub const KINDS: [EventKind; 2] = [EventKind::GenerationEnd, EventKind::RunEnd];

    /// Create an empty collector.
    #[must_use]
    pub fn new(objective: Objective) -> Self {
        Self {
            objective,
            generations: Vec::new(),
            runs: Vec::new(),
        }
    }

    /// Create a collector and subscribe it to `bus`.
    ///
    /// # Errors
    ///
    /// Propagates subscription failures.
    pub fn attach(bus: &mut EventBus, objective: Objective) -> Result<Rc<RefCell<Self>>, ConfigError> {
        let collector = Rc::new(RefCell::new(Self::new(objective)));
        let shared: SharedListener = collector.clone();
        bus.subscribe_all(&Self::KINDS, &shared)?;
        Ok(collector)
    }

    /// Per-generation records, in the order they were observed.
    #[must_use]
    pub fn generations(&self) -> &[GenerationRecord] {
        &self.generations
    }

    /// Records of finished runs.
    #[must_use]
    pub fn runs(&self) -> &[RunRecord] {
        &self.runs
    }

    /// Generation records belonging to `run`.
    pub fn run_history(&self, run: usize) -> impl Iterator<Item = &GenerationRecord> + '_ {
        self.generations.iter().filter(move |r| r.run == run)
    }
}

impl Listener for StatsCollector {
    fn notify(&mut self, event: &Event<'_>) {
        match *event {
            Event::GenerationEnd {
                run,
                generation,
                population,
            } => {
                let record = GenerationRecord::from_population(run, generation, population, self.objective);
                self.generations.push(record);
            }
            Event::RunEnd { run, generations, best } => self.runs.push(RunRecord {
                run,
                generations,
                best_fitness: best.and_then(Individual::fitness),
                best_program: best.map(ToString::to_string),
            }),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;

    fn scored(program: Node, fitness: f64) -> Individual {
        let mut individual = Individual::new(program);
        individual.set_fitness(fitness);
        individual
    }

    #[test]
    fn test_fitness_summary() {
        let summary = FitnessSummary::from_fitness(&[1.0, 2.0, 3.0, 4.0, 5.0], Objective::Minimise);
        assert!((summary.mean - 3.0).abs() < 0.001);
        assert!((summary.best - 1.0).abs() < 0.001);
        assert!((summary.worst - 5.0).abs() < 0.001);
        assert!((summary.std_dev - 2.0_f64.sqrt()).abs() < 0.001);

        let summary = FitnessSummary::from_fitness(&[1.0, 5.0, f64::NAN], Objective::Maximise);
        assert_eq!(summary.count, 2);
        assert!((summary.best - 5.0).abs() < 0.001);
        assert!((summary.worst - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_empty_summary_is_zero() {
        let summary = FitnessSummary::from_fitness(&[], Objective::Minimise);
        assert_eq!(summary.count, 0);
        assert!(summary.mean.abs() < f64::EPSILON);
    }

    #[test]
    fn test_generation_record() {
        let population: Population = vec![
            scored(Node::literal(1.0), 2.0),
            scored(Node::literal(1.0), 4.0),
            scored(
                Node::function(crate::node::Function::Add, vec![Node::literal(1.0), Node::literal(2.0)]).unwrap(),
                6.0,
            ),
        ]
        .into();

        let record = GenerationRecord::from_population(0, 3, &population, Objective::Minimise);
        assert_eq!(record.generation, 3);
        assert!((record.mean_size - 5.0 / 3.0).abs() < 1e-9);
        assert!((record.mean_depth - 1.0 / 3.0).abs() < 1e-9);
        assert!((record.diversity - 2.0 / 3.0).abs() < 1e-9);
        assert!((record.fitness.best - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_collector_records_events() {
        let mut bus = EventBus::new();
        let collector = StatsCollector::attach(&mut bus, Objective::Minimise).unwrap();
        let population: Population = vec![scored(Node::literal(true), 1.0)].into();

        bus.publish(&Event::GenerationEnd {
            run: 0,
            generation: 0,
            population: &population,
        });
        bus.publish(&Event::RunEnd {
            run: 0,
            generations: 0,
            best: Some(&population[0]),
        });
        bus.publish(&Event::RunEnd {
            run: 1,
            generations: 4,
            best: None,
        });

        let collector = collector.borrow();
        assert_eq!(collector.generations().len(), 1);
        assert_eq!(collector.run_history(0).count(), 1);
        assert_eq!(collector.runs().len(), 2);
        assert_eq!(collector.runs()[0].best_fitness, Some(1.0));
        assert_eq!(collector.runs()[0].best_program.as_deref(), Some("true"));
        assert_eq!(collector.runs()[1].best_fitness, None);
    }

    #[test]
    fn test_attach_twice_to_same_bus_is_independent() {
        let mut bus = EventBus::new();
        StatsCollector::attach(&mut bus, Objective::Minimise).unwrap();
        StatsCollector::attach(&mut bus, Objective::Minimise).unwrap();
        assert_eq!(bus.listener_count(EventKind::GenerationEnd), 2);
    }
}
