//! Strongly-typed population initialisation.
//!
//! A [`TreeGenerator`] enumerates every *production* the syntax offers: a
//! function together with one combination of input types and the output
//! type it resolves to. From those it precomputes, per depth, which data
//! types a tree of exactly that depth (full) or at most that depth (grow)
//! can have. Generation then only ever picks primitives that are known to
//! complete, so no tree is built and thrown away for being ill typed.
//!
//! ```text
//! depth 0: terminal types                       {Boolean}
//! depth 1: outputs of productions over depth 0  {Boolean}   AND(B, B) -> B
//! depth 2: ...
//! ```

use crate::error::ConfigError;
use crate::individual::Individual;
use crate::node::{DataType, Function, Node, Primitive};
use crate::population::Population;
use crate::syntax::Syntax;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// How initial trees are shaped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitMethod {
    /// Every leaf sits at exactly `max_initial_depth`.
    Full,
    /// Any shape with depth at most `max_initial_depth`.
    Grow,
    /// Depths ramped over `min_initial_depth..=max_initial_depth`, half
    /// full and half grow.
    #[default]
    RampedHalfAndHalf,
}

/// Configuration for building the initial population.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialisationConfig {
    /// Tree construction method.
    pub method: InitMethod,
    /// Smallest depth used by ramped half-and-half.
    pub min_initial_depth: usize,
    /// Largest initial depth.
    pub max_initial_depth: usize,
    /// Whether structurally identical programs may appear twice.
    pub allow_duplicates: bool,
    /// Draws allowed per population slot before giving up.
    pub max_attempts: usize,
}

impl Default for InitialisationConfig {
    fn default() -> Self {
        Self {
            method: InitMethod::RampedHalfAndHalf,
            min_initial_depth: 2,
            max_initial_depth: 6,
            allow_duplicates: false,
            max_attempts: 1000,
        }
    }
}

impl InitialisationConfig {
    /// Check the depth range against the absolute depth limit.
    ///
    /// # Errors
    ///
    /// Returns an error if the range is inverted or exceeds `max_depth`,
    /// or if no attempts are allowed.
    pub fn validate(&self, max_depth: usize) -> Result<(), ConfigError> {
        if self.min_initial_depth > self.max_initial_depth || self.max_initial_depth > max_depth {
            return Err(ConfigError::DepthBounds {
                min: self.min_initial_depth,
                max: self.max_initial_depth,
                limit: max_depth,
            });
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::NoAttempts("initialisation"));
        }
        Ok(())
    }

    /// The (shape, depth) of every slot of a population of `size`.
    fn plan(&self, size: usize) -> Vec<(Shape, usize)> {
        match self.method {
            InitMethod::Full => vec![(Shape::Full, self.max_initial_depth); size],
            InitMethod::Grow => vec![(Shape::Grow, self.max_initial_depth); size],
            InitMethod::RampedHalfAndHalf => {
                let depths = self.max_initial_depth - self.min_initial_depth + 1;
                (0..size)
                    .map(|i| {
                        let depth = self.min_initial_depth + i * depths / size;
                        let shape = if i % 2 == 0 { Shape::Full } else { Shape::Grow };
                        (shape, depth)
                    })
                    .collect()
            }
        }
    }
}

/// The two basic tree shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Shape {
    /// Exactly the requested depth on every branch.
    Full,
    /// At most the requested depth.
    Grow,
}

/// A function applied to one combination of input types.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Production {
    function: Function,
    inputs: Vec<DataType>,
    output: DataType,
}

/// Typed random tree builder with per-depth reachability tables.
#[derive(Debug, Clone)]
pub struct TreeGenerator {
    terminals: Vec<Primitive>,
    /// Grouped by function, in syntax order.
    productions: Vec<Production>,
    /// `full[d]`: types of trees with every leaf at depth `d`.
    full: Vec<BTreeSet<DataType>>,
    /// `grow[d]`: types of trees of depth at most `d`.
    grow: Vec<BTreeSet<DataType>>,
}

impl TreeGenerator {
    /// Precompute productions and reachability up to `max_depth`.
    #[must_use]
    pub fn new(syntax: &Syntax, max_depth: usize) -> Self {
        let terminals: Vec<Primitive> = syntax.terminals().cloned().collect();

        let mut functions: Vec<Function> = Vec::new();
        for f in syntax.functions() {
            if !functions.contains(&f) {
                functions.push(f);
            }
        }
        let productions: Vec<Production> = functions
            .into_iter()
            .flat_map(|function| {
                input_combinations(function.arity())
                    .into_iter()
                    .filter_map(move |inputs| {
                        function.resolve_type(&inputs).map(|output| Production {
                            function,
                            inputs,
                            output,
                        })
                    })
            })
            .collect();

        let leaves: BTreeSet<DataType> = terminals.iter().filter_map(Primitive::terminal_type).collect();
        let mut full = vec![leaves.clone()];
        let mut grow = vec![leaves];
        for depth in 1..=max_depth {
            let below_full = &full[depth - 1];
            let next_full: BTreeSet<DataType> = productions
                .iter()
                .filter(|p| p.inputs.iter().all(|t| below_full.contains(t)))
                .map(|p| p.output)
                .collect();

            let below_grow = &grow[depth - 1];
            let mut next_grow = below_grow.clone();
            next_grow.extend(
                productions
                    .iter()
                    .filter(|p| p.inputs.iter().all(|t| below_grow.contains(t)))
                    .map(|p| p.output),
            );

            full.push(next_full);
            grow.push(next_grow);
        }

        Self {
            terminals,
            productions,
            full,
            grow,
        }
    }

    /// Largest depth covered by the reachability tables.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.full.len() - 1
    }

    /// Whether a tree of `shape` and `depth` can have type `required`.
    #[must_use]
    pub fn can_build(&self, required: DataType, depth: usize, shape: Shape) -> bool {
        let table = match shape {
            Shape::Full => &self.full,
            Shape::Grow => &self.grow,
        };
        table.get(depth).is_some_and(|types| types.contains(&required))
    }

    /// Build a tree of `shape` and `depth` returning `required`.
    pub fn generate<R: Rng>(
        &self,
        shape: Shape,
        required: DataType,
        depth: usize,
        rng: &mut R,
    ) -> Option<Node> {
        match shape {
            Shape::Full => self.full(required, depth, rng),
            Shape::Grow => self.grow(required, depth, rng),
        }
    }

    /// A tree of exactly `depth` on every branch, or `None` if `required`
    /// is unreachable at that depth.
    pub fn full<R: Rng>(&self, required: DataType, depth: usize, rng: &mut R) -> Option<Node> {
        if depth == 0 {
            let leaves: Vec<&Primitive> = self.terminals_of(required).collect();
            return leaves.choose(rng).and_then(|p| p.to_terminal());
        }

        let below = self.full.get(depth - 1)?;
        let valid = self.productions_for(required, below);
        let production = choose_production(&valid, rng)?;
        let children = production
            .inputs
            .iter()
            .map(|&t| self.full(t, depth - 1, rng))
            .collect::<Option<Vec<_>>>()?;
        Node::function(production.function, children).ok()
    }

    /// A tree of depth at most `max_depth`, or `None` if `required` is
    /// unreachable within that depth.
    ///
    /// Each node is drawn uniformly from the primitives that can still
    /// complete: terminals of the required type, plus (while depth
    /// remains) functions with a production for it.
    pub fn grow<R: Rng>(&self, required: DataType, max_depth: usize, rng: &mut R) -> Option<Node> {
        let leaves: Vec<&Primitive> = self.terminals_of(required).collect();
        let valid = match max_depth.checked_sub(1).and_then(|d| self.grow.get(d)) {
            Some(below) => self.productions_for(required, below),
            None => Vec::new(),
        };
        let functions = distinct_functions(&valid);

        let total = leaves.len() + functions.len();
        if total == 0 {
            return None;
        }
        let pick = rng.gen_range(0..total);
        if pick < leaves.len() {
            return leaves[pick].to_terminal();
        }

        let function = functions[pick - leaves.len()];
        let options: Vec<&Production> = valid.into_iter().filter(|p| p.function == function).collect();
        let production = options.choose(rng)?;
        let children = production
            .inputs
            .iter()
            .map(|&t| self.grow(t, max_depth - 1, rng))
            .collect::<Option<Vec<_>>>()?;
        Node::function(production.function, children).ok()
    }

    fn terminals_of(&self, required: DataType) -> impl Iterator<Item = &Primitive> + '_ {
        self.terminals
            .iter()
            .filter(move |p| p.terminal_type() == Some(required))
    }

    fn productions_for(&self, required: DataType, inputs: &BTreeSet<DataType>) -> Vec<&Production> {
        self.productions
            .iter()
            .filter(|p| p.output == required && p.inputs.iter().all(|t| inputs.contains(t)))
            .collect()
    }
}

/// Every sequence of `arity` data types.
fn input_combinations(arity: usize) -> Vec<Vec<DataType>> {
    let mut combos = vec![Vec::new()];
    for _ in 0..arity {
        combos = combos
            .into_iter()
            .flat_map(|prefix: Vec<DataType>| {
                DataType::ALL.iter().map(move |&t| {
                    let mut next = prefix.clone();
                    next.push(t);
                    next
                })
            })
            .collect();
    }
    combos
}

/// Functions of `productions` in order, without repeats.
fn distinct_functions(productions: &[&Production]) -> Vec<Function> {
    let mut functions: Vec<Function> = productions.iter().map(|p| p.function).collect();
    functions.dedup();
    functions
}

/// Pick a function uniformly, then one of its productions uniformly.
///
/// Picking the function first keeps functions with many type
/// combinations (arithmetic) from crowding out the rest.
fn choose_production<'a, R: Rng>(valid: &[&'a Production], rng: &mut R) -> Option<&'a Production> {
    let function = *distinct_functions(valid).choose(rng)?;
    let options: Vec<&Production> = valid.iter().copied().filter(|p| p.function == function).collect();
    options.choose(rng).copied()
}

/// Build the initial population.
///
/// # Errors
///
/// Returns [`ConfigError::UnreachableType`] if `generator` cannot produce a
/// `return_type` tree at some planned depth, and
/// [`ConfigError::InitialisationStalled`] if a slot cannot be filled with a
/// new distinct program within `config.max_attempts` draws.
pub fn initialise<R: Rng>(
    generator: &TreeGenerator,
    config: &InitialisationConfig,
    return_type: DataType,
    size: usize,
    rng: &mut R,
) -> Result<Population, ConfigError> {
    let plan = config.plan(size);

    let distinct: BTreeSet<(Shape, usize)> = plan.iter().copied().collect();
    for (shape, depth) in distinct {
        if !generator.can_build(return_type, depth, shape) {
            return Err(ConfigError::UnreachableType {
                data_type: return_type,
                depth,
            });
        }
    }

    let mut population = Population::with_capacity(size);
    for (shape, depth) in plan {
        let mut attempts = 0;
        loop {
            if attempts == config.max_attempts {
                return Err(ConfigError::InitialisationStalled {
                    attempts,
                    produced: population.len(),
                    requested: size,
                });
            }
            attempts += 1;

            let Some(program) = generator.generate(shape, return_type, depth, rng) else {
                continue;
            };
            let candidate = Individual::new(program);
            if config.allow_duplicates || !population.contains(&candidate) {
                population.push(candidate);
                break;
            }
        }
    }

    log::debug!(
        "initialised {} programs ({:?}, depths {}..={})",
        population.len(),
        config.method,
        config.min_initial_depth,
        config.max_initial_depth
    );
    Ok(population)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn boolean_syntax() -> Syntax {
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

    fn mixed_syntax() -> Syntax {
        Syntax::new(
            vec![
                Function::If.into(),
                Function::Gt.into(),
                Function::Add.into(),
                Primitive::variable("X", DataType::Integer),
                crate::node::Value::Double(0.5).into(),
            ],
            DataType::Double,
        )
        .unwrap()
    }

    #[test]
    fn test_full_trees_have_exact_depth() {
        let generator = TreeGenerator::new(&boolean_syntax(), 6);
        let mut rng = StdRng::seed_from_u64(7);
        for depth in 0..=6 {
            let tree = generator.full(DataType::Boolean, depth, &mut rng).unwrap();
            assert_eq!(tree.depth(), depth);
            assert_eq!(tree.data_type(), Some(DataType::Boolean));
        }
    }

    #[test]
    fn test_grow_trees_respect_max_depth() {
        let generator = TreeGenerator::new(&mixed_syntax(), 5);
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let tree = generator.grow(DataType::Double, 5, &mut rng).unwrap();
            assert!(tree.depth() <= 5);
            assert_eq!(tree.data_type(), Some(DataType::Double));
        }
    }

    #[test]
    fn test_reachability_tables() {
        let generator = TreeGenerator::new(&mixed_syntax(), 3);
        // A Boolean needs GT over numeric leaves.
        assert!(!generator.can_build(DataType::Boolean, 0, Shape::Grow));
        assert!(generator.can_build(DataType::Boolean, 1, Shape::Full));
        assert!(generator.can_build(DataType::Integer, 0, Shape::Full));
        assert!(!generator.can_build(DataType::Void, 3, Shape::Grow));
        assert!(!generator.can_build(DataType::Double, 4, Shape::Grow));
    }

    #[test]
    fn test_ramped_half_and_half_population() {
        let generator = TreeGenerator::new(&boolean_syntax(), 6);
        let config = InitialisationConfig::default();
        let mut rng = StdRng::seed_from_u64(3);
        let population = initialise(&generator, &config, DataType::Boolean, 100, &mut rng).unwrap();

        assert_eq!(population.len(), 100);
        assert!((population.diversity() - 1.0).abs() < f64::EPSILON);
        for (i, individual) in population.iter().enumerate() {
            let depth = individual.depth();
            assert!(depth <= config.max_initial_depth);
            if i % 2 == 0 {
                assert!(depth >= config.min_initial_depth);
            }
        }
        let deepest = population.iter().map(Individual::depth).max().unwrap();
        assert_eq!(deepest, config.max_initial_depth);
    }

    #[test]
    fn test_unreachable_type_is_eager() {
        let generator = TreeGenerator::new(&boolean_syntax(), 6);
        let config = InitialisationConfig::default();
        let mut rng = StdRng::seed_from_u64(0);
        let err = initialise(&generator, &config, DataType::Double, 10, &mut rng).unwrap_err();
        assert!(matches!(err, ConfigError::UnreachableType { data_type: DataType::Double, .. }));
    }

    #[test]
    fn test_stall_detected() {
        let syntax = Syntax::new(
            vec![Function::Not.into(), Primitive::variable("D0", DataType::Boolean)],
            DataType::Boolean,
        )
        .unwrap();
        let generator = TreeGenerator::new(&syntax, 2);
        let config = InitialisationConfig {
            min_initial_depth: 2,
            max_initial_depth: 2,
            max_attempts: 50,
            ..InitialisationConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(5);
        let err = initialise(&generator, &config, DataType::Boolean, 50, &mut rng).unwrap_err();
        match err {
            ConfigError::InitialisationStalled { attempts, produced, requested } => {
                assert_eq!(attempts, 50);
                assert!(produced <= 3);
                assert_eq!(requested, 50);
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_duplicates_allowed_never_stalls() {
        let syntax = Syntax::new(vec![Primitive::variable("D0", DataType::Boolean)], DataType::Boolean)
            .unwrap();
        let generator = TreeGenerator::new(&syntax, 0);
        let config = InitialisationConfig {
            method: InitMethod::Grow,
            min_initial_depth: 0,
            max_initial_depth: 0,
            allow_duplicates: true,
            max_attempts: 1,
        };
        let mut rng = StdRng::seed_from_u64(5);
        let population = initialise(&generator, &config, DataType::Boolean, 20, &mut rng).unwrap();
        assert_eq!(population.len(), 20);
    }

    #[test]
    fn test_depth_bounds_validated() {
        let config = InitialisationConfig {
            max_initial_depth: 20,
            ..InitialisationConfig::default()
        };
        assert!(matches!(config.validate(17), Err(ConfigError::DepthBounds { .. })));
    }
}
