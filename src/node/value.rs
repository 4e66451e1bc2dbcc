//! Data types and runtime values carried by expression trees.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Static type of a node's result.
///
/// The numeric types are ordered by width so that arithmetic can widen
/// to the larger of its operands: `Integer < Long < Double`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DataType {
    /// Truth value.
    Boolean,
    /// 32-bit signed integer.
    Integer,
    /// 64-bit signed integer.
    Long,
    /// 64-bit float.
    Double,
    /// No value; the node is evaluated for its side effects.
    Void,
}

impl DataType {
    /// All data types, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Boolean,
        Self::Integer,
        Self::Long,
        Self::Double,
        Self::Void,
    ];

    /// Whether this is one of the numeric types.
    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Long | Self::Double)
    }

    /// The wider of two numeric types, or `None` if either is not numeric.
    #[must_use]
    pub fn widen(self, other: Self) -> Option<Self> {
        if self.is_numeric() && other.is_numeric() {
            Some(self.max(other))
        } else {
            None
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Long => "long",
            Self::Double => "double",
            Self::Void => "void",
        };
        f.write_str(name)
    }
}

/// A runtime value produced by evaluating a node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Truth value.
    Boolean(bool),
    /// 32-bit signed integer.
    Integer(i32),
    /// 64-bit signed integer.
    Long(i64),
    /// 64-bit float.
    Double(f64),
    /// Result of an action.
    Void,
}

impl Value {
    /// The data type of this value.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Boolean(_) => DataType::Boolean,
            Self::Integer(_) => DataType::Integer,
            Self::Long(_) => DataType::Long,
            Self::Double(_) => DataType::Double,
            Self::Void => DataType::Void,
        }
    }

    /// The boolean inside, if this is a boolean.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Numeric value widened to `i64`. Doubles are not converted.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(i64::from(*v)),
            Self::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric value widened to `f64`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(v) => Some(f64::from(*v)),
            Self::Long(v) => Some(*v as f64),
            Self::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// The zero of a numeric type.
    #[must_use]
    pub fn zero(data_type: DataType) -> Option<Self> {
        match data_type {
            DataType::Integer => Some(Self::Integer(0)),
            DataType::Long => Some(Self::Long(0)),
            DataType::Double => Some(Self::Double(0.0)),
            DataType::Boolean | DataType::Void => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}L"),
            Self::Double(v) => write!(f, "{v:?}"),
            Self::Void => f.write_str("void"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Integer(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}
