//! Variable bindings supplied to tree evaluation.

use crate::node::value::Value;
use std::collections::HashMap;

/// Environment that resolves variables while a tree is evaluated.
///
/// Lookups take `&mut self` so that action-typed variables can perform
/// their side effect at the moment they are evaluated (e.g. moving an
/// agent). Returning `None` reports the variable as unbound.
pub trait Context {
    /// Resolve the variable `name`.
    fn lookup(&mut self, name: &str) -> Option<Value>;
}

/// Plain name-to-value bindings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    values: HashMap<String, Value>,
}

impl Bindings {
    /// Create empty bindings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `value`, replacing any earlier binding.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    /// Builder-style variant of [`Bindings::set`].
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Current value of `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Value> {
        self.values.get(name).copied()
    }
}

impl Context for Bindings {
    fn lookup(&mut self, name: &str) -> Option<Value> {
        self.get(name)
    }
}
