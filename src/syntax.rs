//! The syntax: every primitive available to build and modify programs.

use crate::error::ConfigError;
use crate::node::{DataType, Function, Primitive};

/// Primitive set plus the type every complete program must return.
#[derive(Debug, Clone, PartialEq)]
pub struct Syntax {
    primitives: Vec<Primitive>,
    return_type: DataType,
}

impl Syntax {
    /// Create a syntax.
    ///
    /// # Errors
    ///
    /// Returns an error if `primitives` is empty or contains no terminals.
    pub fn new(primitives: Vec<Primitive>, return_type: DataType) -> Result<Self, ConfigError> {
        if primitives.is_empty() {
            return Err(ConfigError::EmptySyntax);
        }
        if !primitives.iter().any(Primitive::is_terminal) {
            return Err(ConfigError::NoTerminals);
        }
        Ok(Self {
            primitives,
            return_type,
        })
    }

    /// All primitives, in the order they were supplied.
    #[must_use]
    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    /// Type of a complete program.
    #[must_use]
    pub fn return_type(&self) -> DataType {
        self.return_type
    }

    /// The function primitives.
    pub fn functions(&self) -> impl Iterator<Item = Function> + '_ {
        self.primitives.iter().filter_map(|p| match p {
            Primitive::Function(f) => Some(*f),
            Primitive::Literal(_) | Primitive::Variable(_) => None,
        })
    }

    /// The terminal primitives.
    pub fn terminals(&self) -> impl Iterator<Item = &Primitive> + '_ {
        self.primitives.iter().filter(|p| p.is_terminal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Value;

    #[test]
    fn test_empty_syntax_rejected() {
        assert_eq!(
            Syntax::new(Vec::new(), DataType::Boolean),
            Err(ConfigError::EmptySyntax)
        );
    }

    #[test]
    fn test_syntax_without_terminals_rejected() {
        let primitives = vec![Primitive::Function(Function::And)];
        assert_eq!(
            Syntax::new(primitives, DataType::Boolean),
            Err(ConfigError::NoTerminals)
        );
    }

    #[test]
    fn test_partitions_functions_and_terminals() {
        let syntax = Syntax::new(
            vec![
                Function::Add.into(),
                Primitive::variable("X", DataType::Double),
                Function::Mul.into(),
                Value::Double(1.0).into(),
            ],
            DataType::Double,
        )
        .unwrap();
        assert_eq!(syntax.functions().collect::<Vec<_>>(), [Function::Add, Function::Mul]);
        assert_eq!(syntax.terminals().count(), 2);
    }
}
