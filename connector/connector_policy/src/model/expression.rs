//! Constraint operand expressions.

use connector_core::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An expression producing one operand of an atomic constraint.
///
/// Only literals exist today. Reference expressions resolving against the
/// request context would be added as new variants, and the exhaustive
/// matches on this enum mark every place that must learn about them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "@type")]
pub enum Expression {
    /// A literal value.
    #[serde(rename = "LiteralExpression")]
    Literal(LiteralExpression),
}

/// An expression holding an immutable literal value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiteralExpression {
    /// The literal value.
    pub value: Value,
}

impl Expression {
    /// Create a literal expression.
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(LiteralExpression {
            value: value.into(),
        })
    }

    /// Evaluate this expression to its value.
    pub fn evaluate(&self) -> &Value {
        match self {
            Self::Literal(literal) => &literal.value,
        }
    }

    /// The key this expression names when used as a left operand.
    ///
    /// Left operands are conventionally string literals naming a fact.
    /// Returns `None` for anything else.
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Self::Literal(literal) => literal.value.as_str(),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(literal) => write!(f, "{}", literal.value),
        }
    }
}

impl From<Value> for Expression {
    fn from(value: Value) -> Self {
        Self::literal(value)
    }
}

impl From<&str> for Expression {
    fn from(value: &str) -> Self {
        Self::literal(value)
    }
}
