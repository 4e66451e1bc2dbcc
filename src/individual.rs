//! A candidate solution: one program plus its cached fitness.

use crate::node::{Context, EvalError, Node, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A program and the fitness last assigned to it.
///
/// Any mutable access to the program clears the cached fitness, so a
/// stale score can never outlive the tree it was computed for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Individual {
    program: Node,
    fitness: Option<f64>,
}

impl Individual {
    /// Wrap an unevaluated program.
    #[must_use]
    pub fn new(program: Node) -> Self {
        Self {
            program,
            fitness: None,
        }
    }

    /// The program tree.
    #[must_use]
    pub fn program(&self) -> &Node {
        &self.program
    }

    /// Mutable access to the program. Clears the fitness.
    pub fn program_mut(&mut self) -> &mut Node {
        self.fitness = None;
        &mut self.program
    }

    /// Replace the program. Clears the fitness.
    pub fn set_program(&mut self, program: Node) {
        self.fitness = None;
        self.program = program;
    }

    /// Unwrap into the program tree.
    #[must_use]
    pub fn into_program(self) -> Node {
        self.program
    }

    /// Cached fitness, `None` until evaluated.
    #[must_use]
    pub fn fitness(&self) -> Option<f64> {
        self.fitness
    }

    /// Store a freshly computed fitness.
    pub fn set_fitness(&mut self, fitness: f64) {
        self.fitness = Some(fitness);
    }

    /// Whether a fitness has been assigned.
    #[must_use]
    pub fn is_evaluated(&self) -> bool {
        self.fitness.is_some()
    }

    /// Number of nodes in the program.
    #[must_use]
    pub fn size(&self) -> usize {
        self.program.size()
    }

    /// Depth of the program.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.program.depth()
    }

    /// Evaluate the program against `ctx`.
    ///
    /// # Errors
    ///
    /// Propagates evaluation errors from the program.
    pub fn evaluate<C: Context + ?Sized>(&self, ctx: &mut C) -> Result<Value, EvalError> {
        self.program.evaluate(ctx)
    }
}

impl From<Node> for Individual {
    fn from(program: Node) -> Self {
        Self::new(program)
    }
}

impl fmt::Display for Individual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.program, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Bindings, DataType, Function};

    fn xor_tree() -> Node {
        let a = Node::variable("A", DataType::Boolean);
        let b = Node::variable("B", DataType::Boolean);
        Node::function(Function::Xor, vec![a, b]).unwrap()
    }

    #[test]
    fn test_mutable_access_clears_fitness() {
        let mut individual = Individual::new(xor_tree());
        individual.set_fitness(2.0);
        assert_eq!(individual.fitness(), Some(2.0));

        individual.program_mut().replace_nth(1, Node::literal(true));
        assert_eq!(individual.fitness(), None);
    }

    #[test]
    fn test_clone_copies_fitness_and_isolates_tree() {
        let mut original = Individual::new(xor_tree());
        original.set_fitness(1.0);

        let mut copy = original.clone();
        assert_eq!(copy.fitness(), Some(1.0));

        copy.program_mut().replace_nth(2, Node::literal(false));
        let mut ctx = Bindings::new().with("A", true).with("B", true);
        assert_eq!(original.evaluate(&mut ctx).unwrap(), Value::Boolean(false));
        assert_eq!(copy.evaluate(&mut ctx).unwrap(), Value::Boolean(true));
        assert_eq!(original.fitness(), Some(1.0));
    }
}
