//! Configuration errors for the evolutionary engine.
//!
//! Everything here is detected before (or at the very start of) a run and
//! is fatal: nothing is silently defaulted. Recoverable conditions such as
//! ill-typed or oversized offspring never surface as errors.

use crate::events::EventKind;
use crate::node::DataType;

/// A violated precondition of the engine's configuration.
#[allow(missing_copy_implementations)] // Error values are passed by value through `Result`, never copied
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// The syntax has no primitives at all.
    #[error("syntax contains no primitives")]
    EmptySyntax,
    /// The syntax has functions but no terminals.
    #[error("syntax contains no terminals")]
    NoTerminals,
    /// The required program type cannot be built at the requested depth.
    #[error("no {data_type} program of depth {depth} can be built from the syntax")]
    UnreachableType {
        /// The required root type.
        data_type: DataType,
        /// The requested depth.
        depth: usize,
    },
    /// Population size is zero.
    #[error("population size must be positive")]
    EmptyPopulation,
    /// Number of runs is zero.
    #[error("at least one run is required")]
    NoRuns,
    /// A probability lies outside `[0, 1]`.
    #[error("{name} probability {value} is outside [0, 1]")]
    Probability {
        /// Which probability.
        name: &'static str,
        /// The offending value.
        value: f64,
    },
    /// Crossover and mutation probabilities exceed 1 together.
    #[error("crossover and mutation probabilities sum to {0}, above 1")]
    ProbabilitySum(f64),
    /// More elites than population slots.
    #[error("elite count {elites} exceeds population size {population}")]
    TooManyElites {
        /// Configured elite count.
        elites: usize,
        /// Configured population size.
        population: usize,
    },
    /// Tournament of size zero.
    #[error("tournament size must be positive")]
    EmptyTournament,
    /// Breeding pool of size zero.
    #[error("selection pool must not be empty")]
    EmptyPool,
    /// Over-selection fraction outside `(0, 1)`.
    #[error("over-selection fraction {0} is outside (0, 1)")]
    OverSelection(f64),
    /// Inconsistent depth limits.
    #[error("initial depth range {min}..={max} does not fit maximum depth {limit}")]
    DepthBounds {
        /// Smallest initial depth.
        min: usize,
        /// Largest initial depth.
        max: usize,
        /// Absolute depth limit.
        limit: usize,
    },
    /// A wall-clock limit that is negative, zero or not finite.
    #[error("time limit of {0} seconds is not a positive duration")]
    TimeLimit(f64),
    /// An attempts budget of zero.
    #[error("{0} must allow at least one attempt")]
    NoAttempts(&'static str),
    /// The same listener was subscribed twice to one event kind.
    #[error("listener already subscribed to {0:?} events")]
    DuplicateListener(EventKind),
    /// The initialiser ran out of attempts to find a distinct program.
    #[error(
        "initialisation stalled after {attempts} attempts with {produced} of {requested} distinct programs"
    )]
    InitialisationStalled {
        /// Attempts spent on the slot that could not be filled.
        attempts: usize,
        /// Distinct programs produced so far.
        produced: usize,
        /// Requested population size.
        requested: usize,
    },
}
