//! Main evolution loop for genetic programming.
//!
//! An [`Evolver`] owns everything a run needs (configuration, syntax,
//! fitness function, random source, event bus and termination criteria)
//! and drives each run through the same state machine:
//!
//! ```text
//! Initialise ─▶ Evaluate ─▶ CheckTermination ──stop──▶ Finalise
//!                  ▲               │
//!                  └──── Breed ◀───┘ continue
//! ```
//!
//! Selection and breeding draw from a single random stream in a fixed
//! order, so a seed reproduces a batch exactly. Only fitness evaluation
//! may run in parallel, and it consumes no randomness.

use crate::error::ConfigError;
use crate::events::{Event, EventBus};
use crate::gp::breeder::Breeder;
use crate::gp::crossover::CrossoverConfig;
use crate::gp::fitness::{EvaluationError, FitnessFunction, Objective, evaluate_population};
use crate::gp::init::{InitialisationConfig, Shape, TreeGenerator, initialise};
use crate::gp::mutation::MutationConfig;
use crate::gp::selection::SelectionConfig;
use crate::gp::termination::{MaxGenerations, RunState, TargetFitness, Termination, TimeLimit};
use crate::individual::Individual;
use crate::population::Population;
use crate::syntax::Syntax;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

/// Configuration for the evolution process.
#[allow(missing_copy_implementations)] // Configs are cloned explicitly when a run takes ownership
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    /// Population size, constant across generations.
    pub population_size: usize,
    /// Maximum number of generations bred per run.
    pub generations: usize,
    /// Number of independent runs in a batch.
    pub runs: usize,
    /// RNG seed for reproducibility.
    pub seed: u64,
    /// Whether lower or higher fitness is better.
    pub objective: Objective,
    /// Stop a run once its best fitness reaches this value.
    pub target_fitness: Option<f64>,
    /// Stop a run after this many seconds of wall-clock time.
    pub time_limit_secs: Option<f64>,
    /// Absolute depth limit for bred programs.
    pub max_depth: usize,
    /// Attempts per breeding slot before falling back to reproduction.
    pub max_breed_attempts: usize,
    /// Whether to evaluate fitness on the rayon thread pool.
    pub parallel_evaluation: bool,
    /// Initial population construction.
    pub initialisation: InitialisationConfig,
    /// Parent selection and elitism.
    pub selection: SelectionConfig,
    /// Crossover operator.
    pub crossover: CrossoverConfig,
    /// Mutation operator.
    pub mutation: MutationConfig,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            population_size: 100,
            generations: 50,
            runs: 1,
            seed: 42,
            objective: Objective::Minimise,
            target_fitness: None,
            time_limit_secs: None,
            max_depth: 17,
            max_breed_attempts: 10,
            parallel_evaluation: true,
            initialisation: InitialisationConfig::default(),
            selection: SelectionConfig::default(),
            crossover: CrossoverConfig::default(),
            mutation: MutationConfig::default(),
        }
    }
}

impl EvolutionConfig {
    /// Check every parameter before any run starts.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population_size == 0 {
            return Err(ConfigError::EmptyPopulation);
        }
        if self.runs == 0 {
            return Err(ConfigError::NoRuns);
        }
        self.crossover.validate()?;
        self.mutation.validate(self.max_depth)?;
        let operators = self.crossover.probability + self.mutation.probability;
        if operators > 1.0 + 1e-9 {
            return Err(ConfigError::ProbabilitySum(operators));
        }
        self.selection.validate(self.population_size)?;
        self.initialisation.validate(self.max_depth)?;
        if self.max_breed_attempts == 0 {
            return Err(ConfigError::NoAttempts("breeding"));
        }
        if let Some(secs) = self.time_limit_secs.filter(|s| !(*s > 0.0 && s.is_finite())) {
            return Err(ConfigError::TimeLimit(secs));
        }
        Ok(())
    }
}

/// Error that ends a single run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RunError {
    /// The fitness function failed; only this run is lost.
    #[error("run {run} failed in generation {generation}: {source}")]
    Evaluation {
        /// Run index.
        run: usize,
        /// Generation being evaluated.
        generation: usize,
        /// The evaluator's error.
        source: EvaluationError,
    },
    /// The configuration cannot be run at all.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Outcome of one completed run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunResult {
    /// Run index.
    pub run: usize,
    /// Best individual seen during the run.
    pub best: Individual,
    /// Number of generations bred.
    pub generations: usize,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
    /// The criterion that ended the run.
    pub stopped_by: String,
}

/// Outcome of [`Evolver::run_batch`].
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult {
    /// Completed runs, in order.
    pub runs: Vec<RunResult>,
    /// Runs aborted by evaluation errors.
    pub failures: Vec<RunError>,
    objective: Objective,
}

impl BatchResult {
    /// The completed run with the best individual; earlier runs win ties.
    #[must_use]
    pub fn best(&self) -> Option<&RunResult> {
        self.runs.iter().reduce(|best, candidate| {
            if self
                .objective
                .ranks_before(candidate.best.fitness(), best.best.fitness())
            {
                candidate
            } else {
                best
            }
        })
    }
}

/// Drives evolutionary runs.
pub struct Evolver<F, R = StdRng> {
    config: EvolutionConfig,
    syntax: Syntax,
    generator: TreeGenerator,
    fitness: F,
    rng: R,
    bus: EventBus,
    terminations: Vec<Box<dyn Termination>>,
}

impl<F: FitnessFunction> Evolver<F, StdRng> {
    /// Create an evolver seeded from `config.seed`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the syntax
    /// cannot build programs of its return type.
    pub fn new(config: EvolutionConfig, syntax: Syntax, fitness: F) -> Result<Self, ConfigError> {
        let rng = StdRng::seed_from_u64(config.seed);
        Self::with_rng(config, syntax, fitness, rng)
    }
}

impl<F: FitnessFunction, R: Rng> Evolver<F, R> {
    /// Create an evolver drawing from `rng`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the syntax
    /// cannot build programs of its return type.
    pub fn with_rng(config: EvolutionConfig, syntax: Syntax, fitness: F, rng: R) -> Result<Self, ConfigError> {
        config.validate()?;

        let depth = config
            .initialisation
            .max_initial_depth
            .max(config.mutation.max_subtree_depth);
        let generator = TreeGenerator::new(&syntax, depth);
        let initial_depth = config.initialisation.max_initial_depth;
        if !generator.can_build(syntax.return_type(), initial_depth, Shape::Grow) {
            return Err(ConfigError::UnreachableType {
                data_type: syntax.return_type(),
                depth: initial_depth,
            });
        }

        let mut terminations: Vec<Box<dyn Termination>> = vec![Box::new(MaxGenerations(config.generations))];
        if let Some(target) = config.target_fitness {
            terminations.push(Box::new(TargetFitness(target)));
        }
        if let Some(secs) = config.time_limit_secs {
            let limit = Duration::try_from_secs_f64(secs).map_err(|_| ConfigError::TimeLimit(secs))?;
            terminations.push(Box::new(TimeLimit(limit)));
        }

        Ok(Self {
            config,
            syntax,
            generator,
            fitness,
            rng,
            bus: EventBus::new(),
            terminations,
        })
    }

    /// The validated configuration.
    #[must_use]
    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    /// The syntax programs are built from.
    #[must_use]
    pub fn syntax(&self) -> &Syntax {
        &self.syntax
    }

    /// The event bus.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.bus
    }

    /// Mutable access to the event bus, for subscribing listeners.
    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    /// Add a termination criterion on top of the configured ones.
    pub fn add_termination(&mut self, criterion: impl Termination + 'static) {
        self.terminations.push(Box::new(criterion));
    }

    /// Execute one run.
    ///
    /// Fires `RunStart` and `RunEnd` around the run; `RunEnd` carries no
    /// best individual when the run fails.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Evaluation`] if the fitness function fails and
    /// [`RunError::Config`] if initialisation cannot proceed.
    pub fn run(&mut self, run: usize) -> Result<RunResult, RunError> {
        log::info!("run {run}: starting");
        self.bus.publish(&Event::RunStart { run });

        let outcome = self.evolve(run);
        match &outcome {
            Ok(result) => {
                self.bus.publish(&Event::RunEnd {
                    run,
                    generations: result.generations,
                    best: Some(&result.best),
                });
                log::info!(
                    "run {run}: finished after {} generations in {:.2?}, best {:?} = {}",
                    result.generations,
                    result.elapsed,
                    result.best.fitness(),
                    result.best
                );
            }
            Err(err) => {
                let generations = match err {
                    RunError::Evaluation { generation, .. } => *generation,
                    RunError::Config(_) => 0,
                };
                self.bus.publish(&Event::RunEnd {
                    run,
                    generations,
                    best: None,
                });
                log::warn!("run {run}: aborted: {err}");
            }
        }
        outcome
    }

    /// Execute `config.runs` independent runs sharing one random stream.
    ///
    /// Runs that fail during evaluation are recorded in
    /// [`BatchResult::failures`] and the batch continues.
    ///
    /// # Errors
    ///
    /// Returns the configuration error that stopped the batch.
    pub fn run_batch(&mut self) -> Result<BatchResult, ConfigError> {
        let mut batch = BatchResult {
            runs: Vec::with_capacity(self.config.runs),
            failures: Vec::new(),
            objective: self.config.objective,
        };

        for run in 0..self.config.runs {
            match self.run(run) {
                Ok(result) => batch.runs.push(result),
                Err(RunError::Config(err)) => return Err(err),
                Err(err) => batch.failures.push(err),
            }
        }

        match batch.best() {
            Some(best) => log::info!(
                "batch of {} runs finished: best fitness {:?} from run {}",
                self.config.runs,
                best.best.fitness(),
                best.run
            ),
            None => log::warn!("batch of {} runs produced no result", self.config.runs),
        }
        Ok(batch)
    }

    fn evolve(&mut self, run: usize) -> Result<RunResult, RunError> {
        let start = Instant::now();
        let objective = self.config.objective;

        let mut population = initialise(
            &self.generator,
            &self.config.initialisation,
            self.syntax.return_type(),
            self.config.population_size,
            &mut self.rng,
        )?;
        self.bus.publish(&Event::Initialisation {
            run,
            population: &population,
        });
        self.evaluate(&mut population, run, 0)?;

        let mut best: Option<Individual> = None;
        let mut generation = 0;
        let stopped_by = loop {
            let improved = population.best(objective).filter(|candidate| {
                best.as_ref()
                    .is_none_or(|b| objective.ranks_before(candidate.fitness(), b.fitness()))
            });
            if let Some(candidate) = improved {
                best = Some(candidate.clone());
            }

            self.bus.publish(&Event::GenerationEnd {
                run,
                generation,
                population: &population,
            });
            if log::log_enabled!(log::Level::Debug) {
                log::debug!(
                    "run {run} generation {generation}: best {:?}, diversity {:.3}",
                    best.as_ref().and_then(Individual::fitness),
                    population.diversity()
                );
            }

            let state = RunState {
                run,
                generation,
                best_fitness: best.as_ref().and_then(Individual::fitness),
                elapsed: start.elapsed(),
                objective,
            };
            if let Some(criterion) = self.terminations.iter().find(|t| t.is_satisfied(&state)) {
                break format!("{criterion:?}");
            }

            generation += 1;
            self.bus.publish(&Event::GenerationStart {
                run,
                generation,
                population: &population,
            });
            population = Breeder::new(&self.config, &self.syntax, &self.generator).breed(
                &population,
                &self.bus,
                run,
                generation,
                &mut self.rng,
            )?;
            self.evaluate(&mut population, run, generation)?;
        };

        let best = best.ok_or(ConfigError::EmptyPopulation)?;
        Ok(RunResult {
            run,
            best,
            generations: generation,
            elapsed: start.elapsed(),
            stopped_by,
        })
    }

    fn evaluate(&self, population: &mut Population, run: usize, generation: usize) -> Result<(), RunError> {
        let start = Instant::now();
        let evaluated = evaluate_population(population, &self.fitness, self.config.parallel_evaluation)
            .map_err(|source| RunError::Evaluation {
                run,
                generation,
                source,
            })?;
        self.bus.publish(&Event::Evaluation {
            run,
            generation,
            evaluated,
            elapsed: start.elapsed(),
        });
        Ok(())
    }
}

impl<F, R> fmt::Debug for Evolver<F, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Evolver")
            .field("config", &self.config)
            .field("syntax", &self.syntax)
            .field("bus", &self.bus)
            .field("terminations", &self.terminations)
            .finish_non_exhaustive()
    }
}
