//! Typed expression trees.
//!
//! A tree is built from three kinds of node: function applications,
//! literal constants and named variables. Trees own their children
//! exclusively, so [`Clone`] is always a deep copy and operators can
//! rewrite subtrees in place without affecting any other individual.
//!
//! Variables carry only a name and a declared type. Their values come
//! from the [`Context`] passed to [`Node::evaluate`], which keeps a tree a
//! pure description of a program.
//!
//! # Example
//!
//! ```
//! use sprig::node::{Bindings, DataType, Function, Node, Value};
//!
//! let d0 = Node::variable("D0", DataType::Boolean);
//! let d1 = Node::variable("D1", DataType::Boolean);
//! let tree = Node::function(Function::And, vec![d0, d1]).unwrap();
//!
//! let mut ctx = Bindings::new().with("D0", true).with("D1", false);
//! assert_eq!(tree.evaluate(&mut ctx).unwrap(), Value::Boolean(false));
//! assert_eq!(tree.to_string(), "AND(D0, D1)");
//! ```

mod context;
mod function;
mod value;

pub use context::{Bindings, Context};
pub use function::Function;
pub use value::{DataType, Value};

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Error raised while evaluating a tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvalError {
    /// A variable had no binding in the context.
    #[error("variable `{0}` is not bound")]
    Unbound(String),
    /// An operand had a type the function cannot accept.
    #[error("{function} received a {found} operand")]
    TypeMismatch {
        /// Identifier of the function.
        function: &'static str,
        /// Type of the offending operand.
        found: DataType,
    },
}

/// A function node was given the wrong number of children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{function} takes {expected} children, got {found}")]
pub struct ArityError {
    /// The function being constructed.
    pub function: Function,
    /// Its declared arity.
    pub expected: usize,
    /// Number of children supplied.
    pub found: usize,
}

/// A node in an expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    /// Function applied to its children.
    Function(FunctionNode),
    /// Independent constant.
    Literal(Value),
    /// Named variable resolved through the evaluation context.
    Variable(Variable),
}

/// A function together with exactly `arity` children.
///
/// Children are only exposed as slices, so the child count can never
/// drift from the function's declared arity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FunctionNodeRepr", into = "FunctionNodeRepr")]
pub struct FunctionNode {
    function: Function,
    children: Vec<Node>,
}

/// Unchecked serialized form of [`FunctionNode`].
#[derive(Serialize, Deserialize)]
struct FunctionNodeRepr {
    function: Function,
    children: Vec<Node>,
}

impl TryFrom<FunctionNodeRepr> for FunctionNode {
    type Error = ArityError;

    fn try_from(repr: FunctionNodeRepr) -> Result<Self, Self::Error> {
        Self::new(repr.function, repr.children)
    }
}

impl From<FunctionNode> for FunctionNodeRepr {
    fn from(node: FunctionNode) -> Self {
        Self {
            function: node.function,
            children: node.children,
        }
    }
}

impl FunctionNode {
    /// Apply `function` to `children`.
    ///
    /// # Errors
    ///
    /// Returns an error if the number of children differs from the arity.
    pub fn new(function: Function, children: Vec<Node>) -> Result<Self, ArityError> {
        if children.len() == function.arity() {
            Ok(Self { function, children })
        } else {
            Err(ArityError {
                function,
                expected: function.arity(),
                found: children.len(),
            })
        }
    }

    /// The applied function.
    #[must_use]
    pub fn function(&self) -> Function {
        self.function
    }

    /// The children, in argument order.
    #[must_use]
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Mutable access to the children.
    pub fn children_mut(&mut self) -> &mut [Node] {
        &mut self.children
    }

    /// Swap in another function of the same arity, keeping the children.
    ///
    /// Returns `false` and leaves the node unchanged if the arities differ.
    pub fn set_function(&mut self, function: Function) -> bool {
        if function.arity() == self.function.arity() {
            self.function = function;
            true
        } else {
            false
        }
    }
}

/// A named, typed variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Variable {
    /// Name looked up in the evaluation context.
    pub name: String,
    /// Declared type of the values it is bound to.
    pub data_type: DataType,
}

impl Variable {
    /// Create a new variable.
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// A primitive usable as a tree node: a function or a terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Primitive {
    /// Function primitive.
    Function(Function),
    /// Literal terminal.
    Literal(Value),
    /// Variable terminal.
    Variable(Variable),
}

impl Primitive {
    /// Shorthand for a variable terminal.
    #[must_use]
    pub fn variable(name: impl Into<String>, data_type: DataType) -> Self {
        Self::Variable(Variable::new(name, data_type))
    }

    /// Number of children a node of this primitive takes.
    #[must_use]
    pub fn arity(&self) -> usize {
        match self {
            Self::Function(f) => f.arity(),
            Self::Literal(_) | Self::Variable(_) => 0,
        }
    }

    /// Whether this primitive is a terminal.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Function(_))
    }

    /// Data type of a terminal, `None` for functions.
    #[must_use]
    pub fn terminal_type(&self) -> Option<DataType> {
        match self {
            Self::Function(_) => None,
            Self::Literal(v) => Some(v.data_type()),
            Self::Variable(v) => Some(v.data_type),
        }
    }

    /// Symbolic name of the primitive.
    #[must_use]
    pub fn identifier(&self) -> Cow<'_, str> {
        match self {
            Self::Function(f) => Cow::Borrowed(f.identifier()),
            Self::Literal(v) => Cow::Owned(v.to_string()),
            Self::Variable(v) => Cow::Borrowed(&v.name),
        }
    }

    /// A fresh leaf node, `None` for functions.
    #[must_use]
    pub fn to_terminal(&self) -> Option<Node> {
        match self {
            Self::Function(_) => None,
            Self::Literal(v) => Some(Node::Literal(*v)),
            Self::Variable(v) => Some(Node::Variable(v.clone())),
        }
    }
}

impl From<Function> for Primitive {
    fn from(f: Function) -> Self {
        Self::Function(f)
    }
}

impl From<Variable> for Primitive {
    fn from(v: Variable) -> Self {
        Self::Variable(v)
    }
}

impl From<Value> for Primitive {
    fn from(v: Value) -> Self {
        Self::Literal(v)
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identifier())
    }
}

impl Node {
    /// Function node.
    ///
    /// # Errors
    ///
    /// Returns an error if the number of children differs from the arity.
    pub fn function(function: Function, children: Vec<Node>) -> Result<Self, ArityError> {
        FunctionNode::new(function, children).map(Self::Function)
    }

    /// Literal node.
    #[must_use]
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    /// Variable node.
    #[must_use]
    pub fn variable(name: impl Into<String>, data_type: DataType) -> Self {
        Self::Variable(Variable::new(name, data_type))
    }

    /// Symbolic name of this node.
    #[must_use]
    pub fn identifier(&self) -> Cow<'_, str> {
        match self {
            Self::Function(f) => Cow::Borrowed(f.function.identifier()),
            Self::Literal(v) => Cow::Owned(v.to_string()),
            Self::Variable(v) => Cow::Borrowed(&v.name),
        }
    }

    /// Number of children.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.children().len()
    }

    /// Whether this node is a function application.
    #[must_use]
    pub fn is_function(&self) -> bool {
        matches!(self, Self::Function(_))
    }

    /// Children of this node (empty for terminals).
    #[must_use]
    pub fn children(&self) -> &[Node] {
        match self {
            Self::Function(f) => &f.children,
            Self::Literal(_) | Self::Variable(_) => &[],
        }
    }

    /// Whether this node is an instance of `primitive`.
    ///
    /// Only the primitive itself is compared, never the children.
    #[must_use]
    pub fn same_primitive(&self, primitive: &Primitive) -> bool {
        match (self, primitive) {
            (Self::Function(node), Primitive::Function(f)) => node.function == *f,
            (Self::Literal(a), Primitive::Literal(b)) => a == b,
            (Self::Variable(a), Primitive::Variable(b)) => a.name == b.name,
            _ => false,
        }
    }

    /// Resolved type of the whole subtree, or `None` if any node in it
    /// is ill typed.
    #[must_use]
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Self::Literal(v) => Some(v.data_type()),
            Self::Variable(v) => Some(v.data_type),
            Self::Function(f) => {
                let inputs = f
                    .children
                    .iter()
                    .map(Node::data_type)
                    .collect::<Option<Vec<_>>>()?;
                f.function.resolve_type(&inputs)
            }
        }
    }

    /// Resolved type of every node, in preorder.
    ///
    /// Computed in a single pass; `None` marks ill-typed nodes and their
    /// ancestors.
    #[must_use]
    pub fn node_types(&self) -> Vec<Option<DataType>> {
        let mut out = Vec::with_capacity(self.size());
        self.collect_types(&mut out);
        out
    }

    fn collect_types(&self, out: &mut Vec<Option<DataType>>) -> Option<DataType> {
        let slot = out.len();
        out.push(None);
        let resolved = match self {
            Self::Literal(v) => Some(v.data_type()),
            Self::Variable(v) => Some(v.data_type),
            Self::Function(f) => {
                let inputs: Vec<Option<DataType>> =
                    f.children.iter().map(|c| c.collect_types(out)).collect();
                inputs
                    .into_iter()
                    .collect::<Option<Vec<_>>>()
                    .and_then(|types| f.function.resolve_type(&types))
            }
        };
        out[slot] = resolved;
        resolved
    }

    /// Evaluate the tree against `ctx`.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is unbound or a value has the wrong
    /// type for the function consuming it.
    pub fn evaluate<C: Context + ?Sized>(&self, ctx: &mut C) -> Result<Value, EvalError> {
        match self {
            Self::Literal(v) => Ok(*v),
            Self::Variable(v) => ctx
                .lookup(&v.name)
                .ok_or_else(|| EvalError::Unbound(v.name.clone())),
            Self::Function(f) => f.function.evaluate(&f.children, ctx),
        }
    }

    /// Number of nodes in the tree.
    #[must_use]
    pub fn size(&self) -> usize {
        1 + self.children().iter().map(Node::size).sum::<usize>()
    }

    /// Depth of the tree. A single terminal has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.children()
            .iter()
            .map(|c| 1 + c.depth())
            .max()
            .unwrap_or(0)
    }

    /// Iterate over all nodes in preorder.
    #[must_use]
    pub fn preorder(&self) -> Preorder<'_> {
        Preorder { stack: vec![self] }
    }

    /// The node at preorder `index` (the root is 0).
    #[must_use]
    pub fn nth(&self, index: usize) -> Option<&Node> {
        self.preorder().nth(index)
    }

    /// Mutable access to the node at preorder `index`.
    pub fn nth_mut(&mut self, index: usize) -> Option<&mut Node> {
        if index == 0 {
            return Some(self);
        }
        let mut remaining = index - 1;
        match self {
            Self::Function(f) => {
                for child in &mut f.children {
                    let size = child.size();
                    if remaining < size {
                        return child.nth_mut(remaining);
                    }
                    remaining -= size;
                }
                None
            }
            Self::Literal(_) | Self::Variable(_) => None,
        }
    }

    /// Replace the subtree at preorder `index`, returning the old one.
    pub fn replace_nth(&mut self, index: usize, replacement: Node) -> Option<Node> {
        self.nth_mut(index)
            .map(|slot| std::mem::replace(slot, replacement))
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(v) => write!(f, "{v}"),
            Self::Variable(v) => f.write_str(&v.name),
            Self::Function(node) => {
                write!(f, "{}(", node.function)?;
                for (i, child) in node.children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{child}")?;
                }
                f.write_str(")")
            }
        }
    }
}

/// Preorder iterator over a tree, created by [`Node::preorder`].
#[derive(Debug, Clone)]
pub struct Preorder<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Preorder<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children().iter().rev());
        Some(node)
    }
}
