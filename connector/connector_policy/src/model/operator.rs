//! Constraint operators.

use connector_core::Value;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// The comparison operator of an atomic constraint.
///
/// This is the closed ODRL operator vocabulary. Constraint functions decide
/// what an operator means for their operand; [`Operator::apply`] gives the
/// reference meaning for plain values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operator {
    /// Equal to.
    #[default]
    Eq,

    /// Not equal to.
    Neq,

    /// Greater than.
    Gt,

    /// Greater than or equal to.
    Geq,

    /// Less than.
    Lt,

    /// Less than or equal to.
    Leq,

    /// The fact is one of the right operand's members.
    In,

    /// The fact contains the right operand.
    HasPart,

    /// The fact is an instance of the right operand.
    IsA,

    /// The fact contains every member of the right operand.
    IsAllOf,

    /// The fact shares at least one member with the right operand.
    IsAnyOf,

    /// The fact shares no member with the right operand.
    IsNoneOf,
}

impl Operator {
    /// All operators, in declaration order.
    pub const ALL: [Operator; 12] = [
        Operator::Eq,
        Operator::Neq,
        Operator::Gt,
        Operator::Geq,
        Operator::Lt,
        Operator::Leq,
        Operator::In,
        Operator::HasPart,
        Operator::IsA,
        Operator::IsAllOf,
        Operator::IsAnyOf,
        Operator::IsNoneOf,
    ];

    /// The serialized name of this operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "EQ",
            Self::Neq => "NEQ",
            Self::Gt => "GT",
            Self::Geq => "GEQ",
            Self::Lt => "LT",
            Self::Leq => "LEQ",
            Self::In => "IN",
            Self::HasPart => "HAS_PART",
            Self::IsA => "IS_A",
            Self::IsAllOf => "IS_ALL_OF",
            Self::IsAnyOf => "IS_ANY_OF",
            Self::IsNoneOf => "IS_NONE_OF",
        }
    }

    /// Compare a request fact (left) with a constraint operand (right).
    ///
    /// Ordering operators are false for incomparable values. Set operators
    /// treat a scalar as a one-element set. `IS_A` has no type hierarchy to
    /// consult and falls back to equality.
    pub fn apply(&self, fact: &Value, operand: &Value) -> bool {
        match self {
            Self::Eq | Self::IsA => fact.loosely_equals(operand),
            Self::Neq => !fact.loosely_equals(operand),
            Self::Gt => fact.compare(operand) == Some(Ordering::Greater),
            Self::Geq => matches!(
                fact.compare(operand),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Self::Lt => fact.compare(operand) == Some(Ordering::Less),
            Self::Leq => matches!(fact.compare(operand), Some(Ordering::Less | Ordering::Equal)),
            Self::In => contains(operand.members(), fact),
            Self::HasPart => match (fact, operand) {
                (Value::String(whole), Value::String(part)) => whole.contains(part.as_str()),
                (Value::Array(items), part) => contains(items, part),
                _ => false,
            },
            Self::IsAllOf => operand
                .members()
                .iter()
                .all(|member| contains(fact.members(), member)),
            Self::IsAnyOf => operand
                .members()
                .iter()
                .any(|member| contains(fact.members(), member)),
            Self::IsNoneOf => !operand
                .members()
                .iter()
                .any(|member| contains(fact.members(), member)),
        }
    }
}

fn contains(haystack: &[Value], needle: &Value) -> bool {
    haystack.iter().any(|item| item.loosely_equals(needle))
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
