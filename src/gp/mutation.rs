//! Mutation operators for genetic programming.
//!
//! Point mutation swaps single nodes for other primitives of the same
//! arity and type, leaving the tree's shape intact. Subtree mutation
//! replaces a whole branch with a freshly grown one of the same type.

use crate::error::ConfigError;
use crate::gp::init::TreeGenerator;
use crate::gp::selection::check_probability;
use crate::individual::Individual;
use crate::node::{DataType, Node, Primitive};
use crate::syntax::Syntax;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Which mutation operator to apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationMethod {
    /// Per-node primitive replacement.
    #[default]
    Point,
    /// Replace one random subtree with a grown tree.
    Subtree,
}

/// Configuration for mutation operations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationConfig {
    /// Operator.
    pub method: MutationMethod,
    /// Probability that a breeding slot uses mutation.
    pub probability: f64,
    /// Probability of mutating each node (point mutation).
    pub point_probability: f64,
    /// Maximum depth for randomly generated subtrees.
    pub max_subtree_depth: usize,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            method: MutationMethod::Point,
            probability: 0.1,
            point_probability: 0.05,
            max_subtree_depth: 4,
        }
    }
}

impl MutationConfig {
    /// Check probabilities and the subtree depth against `max_depth`.
    ///
    /// # Errors
    ///
    /// Returns an error if a probability is outside `[0, 1]` or grown
    /// subtrees could exceed the absolute depth limit on their own.
    pub fn validate(&self, max_depth: usize) -> Result<(), ConfigError> {
        check_probability("mutation", self.probability)?;
        check_probability("point mutation", self.point_probability)?;
        if self.max_subtree_depth > max_depth {
            return Err(ConfigError::DepthBounds {
                min: 0,
                max: self.max_subtree_depth,
                limit: max_depth,
            });
        }
        Ok(())
    }
}

/// Mutate a copy of `parent`.
///
/// The child never shares structure with the parent and starts without a
/// fitness.
#[must_use]
pub fn mutate<R: Rng>(
    parent: &Individual,
    syntax: &Syntax,
    generator: &TreeGenerator,
    config: &MutationConfig,
    rng: &mut R,
) -> Individual {
    let mut program = parent.program().clone();
    match config.method {
        MutationMethod::Point => point_mutation(&mut program, syntax, config.point_probability, rng),
        MutationMethod::Subtree => subtree_mutation(&mut program, generator, config.max_subtree_depth, rng),
    }
    Individual::new(program)
}

/// Visit every node with probability `probability` and try to swap it for
/// a different primitive of the same arity and type.
fn point_mutation<R: Rng>(program: &mut Node, syntax: &Syntax, probability: f64, rng: &mut R) {
    // Replacements keep each node's type, so these stay valid throughout.
    let types = program.node_types();
    for (index, original) in types.into_iter().enumerate() {
        if !rng.gen_bool(probability) {
            continue;
        }
        let Some(original) = original else {
            continue;
        };
        if let Some(node) = program.nth_mut(index) {
            mutate_point(node, original, syntax.primitives(), rng);
        }
    }
}

/// Replace `node` in place, scanning the primitive set once from a random
/// offset. Leaves the node alone if nothing fits.
fn mutate_point<R: Rng>(node: &mut Node, original: DataType, primitives: &[Primitive], rng: &mut R) {
    let child_types: Option<Vec<DataType>> = node.children().iter().map(Node::data_type).collect();
    let offset = rng.gen_range(0..primitives.len());

    for candidate in primitives[offset..].iter().chain(&primitives[..offset]) {
        if candidate.arity() != node.arity() || node.same_primitive(candidate) {
            continue;
        }
        if let Node::Function(function_node) = node {
            let Primitive::Function(f) = candidate else {
                continue;
            };
            let fits = child_types
                .as_deref()
                .and_then(|types| f.resolve_type(types))
                == Some(original);
            if fits && function_node.set_function(*f) {
                return;
            }
        } else if let Some(leaf) = candidate
            .to_terminal()
            .filter(|leaf| leaf.data_type() == Some(original))
        {
            *node = leaf;
            return;
        }
    }
}

/// Replace a uniformly chosen node with a grown tree of the same type.
fn subtree_mutation<R: Rng>(program: &mut Node, generator: &TreeGenerator, max_depth: usize, rng: &mut R) {
    let types = program.node_types();
    let index = rng.gen_range(0..types.len());
    let Some(required) = types[index] else {
        return;
    };
    if let Some(replacement) = generator.grow(required, max_depth, rng) {
        program.replace_nth(index, replacement);
    }
}
