//! Crossover operators for genetic programming.
//!
//! Crossover exchanges subtrees between two parents. Exchange points are
//! always of the same data type, and each child's root type is checked
//! again afterwards, so crossover never produces an ill-typed program.
//! When no valid exchange is found within the attempt budget, the parents
//! are returned unchanged.

use crate::error::ConfigError;
use crate::gp::selection::check_probability;
use crate::individual::Individual;
use crate::node::{DataType, Node};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Which crossover operator to apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossoverMethod {
    /// Swap a random subtree of each parent, with points drawn by
    /// [`PointSelection`].
    #[default]
    Subtree,
    /// Swap at one point inside the region where both parents have the
    /// same shape.
    OnePoint,
}

/// How subtree crossover draws its exchange points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointSelection {
    /// Every well-typed node is equally likely.
    Uniform,
    /// Pick a function node with this probability (when the tree has one),
    /// otherwise a terminal.
    FunctionBias(f64),
}

impl Default for PointSelection {
    fn default() -> Self {
        Self::FunctionBias(0.9)
    }
}

/// Configuration for crossover operations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossoverConfig {
    /// Operator.
    pub method: CrossoverMethod,
    /// Probability that a breeding slot uses crossover.
    pub probability: f64,
    /// Exchange point distribution for subtree crossover.
    pub point_selection: PointSelection,
    /// Attempts to find a valid exchange before giving up.
    pub max_attempts: usize,
}

impl Default for CrossoverConfig {
    fn default() -> Self {
        Self {
            method: CrossoverMethod::Subtree,
            probability: 0.9,
            point_selection: PointSelection::default(),
            max_attempts: 10,
        }
    }
}

impl CrossoverConfig {
    /// Check probabilities and the attempt budget.
    ///
    /// # Errors
    ///
    /// Returns an error if a probability is outside `[0, 1]` or no attempts
    /// are allowed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_probability("crossover", self.probability)?;
        if let PointSelection::FunctionBias(bias) = self.point_selection {
            check_probability("function bias", bias)?;
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::NoAttempts("crossover"));
        }
        Ok(())
    }
}

/// Perform crossover between two parents.
///
/// Returns two children. If no type-compatible exchange is found within
/// `config.max_attempts`, the children are copies of the parents and keep
/// their fitness.
#[must_use]
pub fn crossover<R: Rng>(
    parent1: &Individual,
    parent2: &Individual,
    config: &CrossoverConfig,
    rng: &mut R,
) -> [Individual; 2] {
    let (a, b) = (parent1.program(), parent2.program());
    for _ in 0..config.max_attempts {
        let children = match config.method {
            CrossoverMethod::Subtree => subtree_crossover(a, b, config.point_selection, rng),
            CrossoverMethod::OnePoint => one_point_crossover(a, b, rng),
        };
        if let Some((c1, c2)) = children {
            return [Individual::new(c1), Individual::new(c2)];
        }
    }
    log::trace!("crossover found no exchange point after {} attempts", config.max_attempts);
    [parent1.clone(), parent2.clone()]
}

/// Subtree crossover: exchange a random subtree of each parent.
fn subtree_crossover<R: Rng>(a: &Node, b: &Node, selection: PointSelection, rng: &mut R) -> Option<(Node, Node)> {
    let types_a = a.node_types();
    let types_b = b.node_types();

    let point_a = pick_point(a, &types_a, None, selection, rng)?;
    let required = types_a[point_a]?;
    let point_b = pick_point(b, &types_b, Some(required), selection, rng)?;

    swap_subtrees(a, b, point_a, point_b)
}

/// Choose an exchange point according to `selection`. Only well-typed
/// nodes (of type `required`, if given) are eligible.
fn pick_point<R: Rng>(
    tree: &Node,
    types: &[Option<DataType>],
    required: Option<DataType>,
    selection: PointSelection,
    rng: &mut R,
) -> Option<usize> {
    let mut functions = Vec::new();
    let mut terminals = Vec::new();
    for (index, (node, data_type)) in tree.preorder().zip(types).enumerate() {
        let Some(data_type) = data_type else {
            continue;
        };
        if required.is_some_and(|r| r != *data_type) {
            continue;
        }
        if node.is_function() {
            functions.push(index);
        } else {
            terminals.push(index);
        }
    }

    match selection {
        PointSelection::Uniform => {
            let total = functions.len() + terminals.len();
            if total == 0 {
                return None;
            }
            let pick = rng.gen_range(0..total);
            functions
                .get(pick)
                .or_else(|| terminals.get(pick - functions.len()))
                .copied()
        }
        PointSelection::FunctionBias(bias) => {
            let use_functions = !functions.is_empty() && (terminals.is_empty() || rng.gen_bool(bias));
            let pool = if use_functions { &functions } else { &terminals };
            pool.choose(rng).copied()
        }
    }
}

/// One-point crossover: exchange at a point both parents share.
fn one_point_crossover<R: Rng>(a: &Node, b: &Node, rng: &mut R) -> Option<(Node, Node)> {
    let types_a = a.node_types();
    let types_b = b.node_types();

    let mut region = Vec::new();
    common_region(a, b, 0, 0, &mut region);
    let candidates: Vec<(usize, usize)> = region
        .into_iter()
        .filter(|&(ia, ib)| (ia, ib) != (0, 0) && types_a[ia].is_some() && types_a[ia] == types_b[ib])
        .collect();

    let &(point_a, point_b) = candidates.choose(rng)?;
    swap_subtrees(a, b, point_a, point_b)
}

/// Collect preorder index pairs of the region where `a` and `b` have the
/// same shape. A pair is included when all its ancestors have equal arity.
fn common_region(a: &Node, b: &Node, ia: usize, ib: usize, out: &mut Vec<(usize, usize)>) {
    out.push((ia, ib));
    if a.arity() != b.arity() {
        return;
    }
    let (mut ca, mut cb) = (ia + 1, ib + 1);
    for (x, y) in a.children().iter().zip(b.children()) {
        common_region(x, y, ca, cb, out);
        ca += x.size();
        cb += y.size();
    }
}

/// Exchange the subtrees at `point_a` and `point_b`, then check that both
/// roots keep their original type.
fn swap_subtrees(a: &Node, b: &Node, point_a: usize, point_b: usize) -> Option<(Node, Node)> {
    let sub_a = a.nth(point_a)?.clone();
    let sub_b = b.nth(point_b)?.clone();

    let mut child_a = a.clone();
    let mut child_b = b.clone();
    child_a.replace_nth(point_a, sub_b)?;
    child_b.replace_nth(point_b, sub_a)?;

    let valid = child_a.data_type().is_some()
        && child_a.data_type() == a.data_type()
        && child_b.data_type() == b.data_type();
    valid.then_some((child_a, child_b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Function, Value};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn var(name: &str) -> Node {
        Node::variable(name, DataType::Boolean)
    }

    fn call(function: Function, children: Vec<Node>) -> Node {
        Node::function(function, children).unwrap()
    }

    /// `IF(GT(X, 1), ADD(X, 2), 3)`: an integer tree with a boolean inside.
    fn mixed_tree() -> Node {
        let x = || Node::variable("X", DataType::Integer);
        call(
            Function::If,
            vec![
                call(Function::Gt, vec![x(), Node::literal(1)]),
                call(Function::Add, vec![x(), Node::literal(2)]),
                Node::literal(3),
            ],
        )
    }

    #[test]
    fn test_subtree_crossover_preserves_types() {
        let mut rng = StdRng::seed_from_u64(42);
        let config = CrossoverConfig::default();
        let p1 = Individual::new(mixed_tree());
        let p2 = Individual::new(call(
            Function::Max,
            vec![Node::variable("X", DataType::Integer), Node::literal(Value::Integer(7))],
        ));

        for _ in 0..200 {
            let [c1, c2] = crossover(&p1, &p2, &config, &mut rng);
            assert_eq!(c1.program().data_type(), Some(DataType::Integer));
            assert_eq!(c2.program().data_type(), Some(DataType::Integer));
            assert_eq!(c1.size() + c2.size(), p1.size() + p2.size());
        }
    }

    #[test]
    fn test_no_compatible_point_returns_parents() {
        let mut rng = StdRng::seed_from_u64(1);
        let config = CrossoverConfig {
            max_attempts: 3,
            ..CrossoverConfig::default()
        };
        let mut p1 = Individual::new(var("A"));
        p1.set_fitness(4.0);
        let p2 = Individual::new(Node::literal(5));

        let [c1, c2] = crossover(&p1, &p2, &config, &mut rng);
        assert_eq!(c1, p1);
        assert_eq!(c2, p2);
        assert_eq!(c1.fitness(), Some(4.0));
    }

    #[test]
    fn test_function_bias_picks_functions() {
        let mut rng = StdRng::seed_from_u64(8);
        let tree = call(Function::And, vec![var("A"), call(Function::Not, vec![var("B")])]);
        let types = tree.node_types();
        for _ in 0..50 {
            let point = pick_point(&tree, &types, None, PointSelection::FunctionBias(1.0), &mut rng).unwrap();
            assert!(tree.nth(point).unwrap().is_function());
        }
        for _ in 0..50 {
            let point = pick_point(&tree, &types, None, PointSelection::FunctionBias(0.0), &mut rng).unwrap();
            assert!(!tree.nth(point).unwrap().is_function());
        }
    }

    #[test]
    fn test_uniform_points_are_evenly_spread() {
        let mut rng = StdRng::seed_from_u64(21);
        // One function and four terminals: a bias would favour index 0.
        let tree = call(
            Function::And,
            vec![var("A"), call(Function::Or, vec![var("B"), var("C")])],
        );
        let types = tree.node_types();
        let mut counts = [0_usize; 5];
        for _ in 0..5000 {
            counts[pick_point(&tree, &types, None, PointSelection::Uniform, &mut rng).unwrap()] += 1;
        }
        for count in counts {
            assert!((800..1200).contains(&count), "{counts:?}");
        }
    }

    #[test]
    fn test_uniform_points_respect_the_required_type() {
        let mut rng = StdRng::seed_from_u64(5);
        let tree = mixed_tree();
        let types = tree.node_types();
        for _ in 0..100 {
            let point = pick_point(&tree, &types, Some(DataType::Boolean), PointSelection::Uniform, &mut rng).unwrap();
            assert_eq!(types[point], Some(DataType::Boolean));
        }
    }

    #[test]
    fn test_uniform_subtree_crossover_preserves_types() {
        let mut rng = StdRng::seed_from_u64(13);
        let config = CrossoverConfig {
            point_selection: PointSelection::Uniform,
            ..CrossoverConfig::default()
        };
        let p1 = Individual::new(mixed_tree());
        let p2 = Individual::new(mixed_tree());
        for _ in 0..100 {
            for child in crossover(&p1, &p2, &config, &mut rng) {
                assert_eq!(child.program().data_type(), Some(DataType::Integer));
            }
        }
    }

    #[test]
    fn test_function_bias_is_validated() {
        let config = CrossoverConfig {
            point_selection: PointSelection::FunctionBias(1.5),
            ..CrossoverConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Probability { .. })));
        let config = CrossoverConfig {
            point_selection: PointSelection::Uniform,
            ..CrossoverConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_common_region() {
        let a = call(Function::And, vec![var("A"), call(Function::Not, vec![var("B")])]);
        let b = call(Function::Or, vec![call(Function::Not, vec![var("C")]), var("D")]);
        let mut region = Vec::new();
        common_region(&a, &b, 0, 0, &mut region);
        // Roots and both child positions; NOT vs terminal stops descent.
        assert_eq!(region, [(0, 0), (1, 1), (2, 3)]);
    }

    #[test]
    fn test_one_point_crossover_swaps_inside_region() {
        let mut rng = StdRng::seed_from_u64(3);
        let config = CrossoverConfig {
            method: CrossoverMethod::OnePoint,
            ..CrossoverConfig::default()
        };
        let p1 = Individual::new(call(Function::And, vec![var("A"), var("B")]));
        let p2 = Individual::new(call(Function::Or, vec![var("C"), var("D")]));

        let [c1, c2] = crossover(&p1, &p2, &config, &mut rng);
        let rendered = (c1.to_string(), c2.to_string());
        assert!(
            rendered == ("AND(C, B)".into(), "OR(A, D)".into())
                || rendered == ("AND(A, D)".into(), "OR(C, B)".into()),
            "{rendered:?}"
        );
    }
}
