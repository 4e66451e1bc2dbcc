// Allow unwrap and unreadable literals in tests (test code is not production)
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::unreadable_literal))]
//! Sprig: a strongly-typed, tree-based genetic programming engine.
//!
//! This crate evolves populations of typed expression trees against
//! user-supplied fitness functions:
//! - Typed initialisation (Full, Grow, Ramped half-and-half)
//! - Tournament, random and fitness-proportionate selection
//! - Subtree and one-point crossover, point and subtree mutation
//! - A synchronous event bus for statistics, progress and offspring vetoes
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │     gp: Evolver, Breeder, operators │
//! ├─────────────────────────────────────┤
//! │  events │ stats │ Population        │
//! ├─────────────────────────────────────┤
//! │  Individual │ Syntax                │
//! ├─────────────────────────────────────┤
//! │  node: typed expression trees       │
//! └─────────────────────────────────────┘
//! ```

pub mod error;
pub mod events;
pub mod gp;
pub mod individual;
pub mod node;
pub mod population;
pub mod stats;
pub mod syntax;

pub use error::ConfigError;
pub use events::{Event, EventBus, EventKind, Listener, Outcome, Verdict};
pub use individual::Individual;
pub use node::{DataType, Node, Value};
pub use population::Population;
pub use syntax::Syntax;
