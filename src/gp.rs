//! Genetic programming engine.
//!
//! This module provides a complete evolutionary framework over typed
//! expression trees: typed initialisation, selection, crossover, mutation,
//! generational breeding and the run driver.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │     Evolver (runs and batches)      │
//! ├─────────────────────────────────────┤
//! │  Breeder: elitism, veto, depth cap  │
//! ├─────────────────────────────────────┤
//! │  Selection │ Crossover │ Mutation   │
//! ├─────────────────────────────────────┤
//! │  Initialiser │ Fitness evaluation   │
//! └─────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use sprig::gp::{EvaluationError, EvolutionConfig, Evolver};
//! use sprig::node::{Bindings, DataType, Function, Primitive, Value};
//! use sprig::{Individual, Syntax};
//!
//! let syntax = Syntax::new(
//!     vec![
//!         Function::Or.into(),
//!         Function::Not.into(),
//!         Primitive::variable("A", DataType::Boolean),
//!         Primitive::variable("B", DataType::Boolean),
//!     ],
//!     DataType::Boolean,
//! )?;
//!
//! // Count mismatches against A AND B.
//! let fitness = |individual: &Individual| -> Result<f64, EvaluationError> {
//!     let mut errors = 0.0;
//!     for (a, b) in [(false, false), (false, true), (true, false), (true, true)] {
//!         let mut ctx = Bindings::new().with("A", a).with("B", b);
//!         if individual.evaluate(&mut ctx)? != Value::Boolean(a && b) {
//!             errors += 1.0;
//!         }
//!     }
//!     Ok(errors)
//! };
//!
//! let config = EvolutionConfig {
//!     population_size: 50,
//!     generations: 10,
//!     target_fitness: Some(0.0),
//!     ..EvolutionConfig::default()
//! };
//! let mut evolver = Evolver::new(config, syntax, fitness)?;
//! let batch = evolver.run_batch()?;
//! assert!(batch.best().is_some());
//! # Ok::<(), sprig::ConfigError>(())
//! ```

mod breeder;
mod crossover;
mod evolution;
mod fitness;
mod init;
mod mutation;
mod selection;
mod termination;

pub use breeder::Breeder;
pub use crossover::{CrossoverConfig, CrossoverMethod, PointSelection, crossover};
pub use evolution::{BatchResult, EvolutionConfig, Evolver, RunError, RunResult};
pub use fitness::{EvaluationError, FitnessFunction, Objective, evaluate_population};
pub use init::{InitMethod, InitialisationConfig, Shape, TreeGenerator, initialise};
pub use mutation::{MutationConfig, MutationMethod, mutate};
pub use selection::{OverSelection, PoolConfig, SelectionConfig, SelectionMethod, Selector, select_elite};
pub use termination::{MaxGenerations, RunState, TargetFitness, Termination, TimeLimit};
