//! Policy constraint model.
//!
//! A constraint is a boolean predicate tree. Leaves are atomic constraints
//! comparing a named fact against an operand; internal nodes combine their
//! children with AND, OR or exactly-one (XONE) semantics.

use connector_core::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::{Expression, Operator};

/// A policy constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "@type")]
pub enum Constraint {
    /// A leaf comparison.
    #[serde(rename = "AtomicConstraint")]
    Atomic(AtomicConstraint),

    /// Satisfied when every child is satisfied.
    #[serde(rename = "AndConstraint")]
    And(AndConstraint),

    /// Satisfied when at least one child is satisfied.
    #[serde(rename = "OrConstraint")]
    Or(OrConstraint),

    /// Satisfied when exactly one child is satisfied.
    #[serde(rename = "XoneConstraint")]
    Xone(XoneConstraint),
}

/// A leaf constraint: `left operator right`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtomicConstraint {
    /// Conventionally a string literal naming the fact being constrained.
    pub left_expression: Expression,

    /// The comparison operator, `EQ` when omitted.
    #[serde(default)]
    pub operator: Operator,

    /// The operand the fact is compared against.
    pub right_expression: Expression,
}

impl AtomicConstraint {
    /// Create an atomic constraint.
    pub fn new(
        left_expression: impl Into<Expression>,
        operator: Operator,
        right_expression: impl Into<Expression>,
    ) -> Self {
        Self {
            left_expression: left_expression.into(),
            operator,
            right_expression: right_expression.into(),
        }
    }

    /// The fact key named by the left operand, if it is a string literal.
    pub fn left_operand(&self) -> Option<&str> {
        self.left_expression.as_key()
    }
}

/// The combinator of a multiplicity constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Multiplicity {
    /// All children must hold; vacuously true when empty.
    And,

    /// At least one child must hold; false when empty.
    Or,

    /// Exactly one child must hold; false when empty.
    Xone,
}

impl Multiplicity {
    /// Combine child outcomes produced lazily by `evaluate`.
    ///
    /// AND and OR stop at the first deciding child. XONE always evaluates
    /// every child, since a second satisfied child changes the outcome.
    pub fn combine<F>(&self, children: &[Constraint], mut evaluate: F) -> bool
    where
        F: FnMut(&Constraint) -> bool,
    {
        match self {
            Self::And => children.iter().all(&mut evaluate),
            Self::Or => children.iter().any(&mut evaluate),
            Self::Xone => children.iter().filter(|child| evaluate(*child)).count() == 1,
        }
    }

    /// Build a constraint node of this kind over `constraints`.
    pub fn create(&self, constraints: Vec<Constraint>) -> Constraint {
        match self {
            Self::And => Constraint::And(AndConstraint::create(constraints)),
            Self::Or => Constraint::Or(OrConstraint::create(constraints)),
            Self::Xone => Constraint::Xone(XoneConstraint::create(constraints)),
        }
    }

    /// The serialized type name of this combinator.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::And => "AndConstraint",
            Self::Or => "OrConstraint",
            Self::Xone => "XoneConstraint",
        }
    }
}

/// Common behaviour of the constraint nodes holding children.
pub trait MultiplicityConstraint: Sized {
    /// The combinator this node applies.
    const KIND: Multiplicity;

    /// Create a node of the same kind over `constraints`.
    fn create(constraints: Vec<Constraint>) -> Self;

    /// The child constraints, in order.
    fn constraints(&self) -> &[Constraint];

    /// Wrap this node as a [`Constraint`].
    fn into_constraint(self) -> Constraint;
}

macro_rules! multiplicity_constraint {
    ($(#[$doc:meta])* $name:ident, $kind:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
        pub struct $name {
            /// The child constraints.
            #[serde(default)]
            pub constraints: Vec<Constraint>,
        }

        impl MultiplicityConstraint for $name {
            const KIND: Multiplicity = Multiplicity::$kind;

            fn create(constraints: Vec<Constraint>) -> Self {
                Self { constraints }
            }

            fn constraints(&self) -> &[Constraint] {
                &self.constraints
            }

            fn into_constraint(self) -> Constraint {
                Constraint::$kind(self)
            }
        }
    };
}

multiplicity_constraint!(
    /// Conjunction of child constraints.
    AndConstraint,
    And
);
multiplicity_constraint!(
    /// Disjunction of child constraints.
    OrConstraint,
    Or
);
multiplicity_constraint!(
    /// Exclusive choice: exactly one child constraint holds.
    XoneConstraint,
    Xone
);

impl Constraint {
    /// Create an atomic constraint over two literal operands.
    pub fn atomic(left: impl Into<Value>, operator: Operator, right: impl Into<Value>) -> Self {
        Self::Atomic(AtomicConstraint::new(
            Expression::literal(left),
            operator,
            Expression::literal(right),
        ))
    }

    /// Create an AND node.
    pub fn and(constraints: Vec<Constraint>) -> Self {
        Self::And(AndConstraint::create(constraints))
    }

    /// Create an OR node.
    pub fn or(constraints: Vec<Constraint>) -> Self {
        Self::Or(OrConstraint::create(constraints))
    }

    /// Create an XONE node.
    pub fn xone(constraints: Vec<Constraint>) -> Self {
        Self::Xone(XoneConstraint::create(constraints))
    }

    /// The combinator and children of an internal node, or `None` for a leaf.
    pub fn multiplicity(&self) -> Option<(Multiplicity, &[Constraint])> {
        match self {
            Self::Atomic(_) => None,
            Self::And(node) => Some((AndConstraint::KIND, node.constraints())),
            Self::Or(node) => Some((OrConstraint::KIND, node.constraints())),
            Self::Xone(node) => Some((XoneConstraint::KIND, node.constraints())),
        }
    }

    /// Collect the fact keys referenced by every atomic leaf, in tree order.
    pub fn left_operands(&self) -> Vec<&str> {
        let mut operands = Vec::new();
        self.collect_left_operands(&mut operands);
        operands
    }

    fn collect_left_operands<'a>(&'a self, operands: &mut Vec<&'a str>) {
        match self {
            Self::Atomic(atomic) => {
                if let Some(key) = atomic.left_operand() {
                    operands.push(key);
                }
            }
            Self::And(AndConstraint { constraints })
            | Self::Or(OrConstraint { constraints })
            | Self::Xone(XoneConstraint { constraints }) => {
                for child in constraints {
                    child.collect_left_operands(operands);
                }
            }
        }
    }

    /// Rewrite the tree keeping only the atomic leaves accepted by `keep`.
    ///
    /// Internal nodes are rebuilt with the same combinator. A node whose
    /// children were all pruned is itself pruned; a node that was empty to
    /// begin with is kept. Returns `None` when nothing remains.
    pub fn retain_atomic<F>(&self, keep: &F) -> Option<Constraint>
    where
        F: Fn(&AtomicConstraint) -> bool,
    {
        match self {
            Self::Atomic(atomic) => keep(atomic).then(|| self.clone()),
            Self::And(node) => self.retain_children(AndConstraint::KIND, &node.constraints, keep),
            Self::Or(node) => self.retain_children(OrConstraint::KIND, &node.constraints, keep),
            Self::Xone(node) => self.retain_children(XoneConstraint::KIND, &node.constraints, keep),
        }
    }

    fn retain_children<F>(
        &self,
        kind: Multiplicity,
        children: &[Constraint],
        keep: &F,
    ) -> Option<Constraint>
    where
        F: Fn(&AtomicConstraint) -> bool,
    {
        if children.is_empty() {
            return Some(self.clone());
        }
        let kept: Vec<Constraint> = children
            .iter()
            .filter_map(|child| child.retain_atomic(keep))
            .collect();
        if kept.is_empty() {
            None
        } else {
            Some(kind.create(kept))
        }
    }

    /// Check the structural well-formedness of the tree.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::Atomic(atomic) => match atomic.left_operand() {
                Some(key) if !key.trim().is_empty() => Ok(()),
                Some(_) => Err("atomic constraint has an empty left operand".to_string()),
                None => Err(format!(
                    "atomic constraint left operand '{}' is not a string literal",
                    atomic.left_expression
                )),
            },
            Self::And(AndConstraint { constraints })
            | Self::Or(OrConstraint { constraints })
            | Self::Xone(XoneConstraint { constraints }) => {
                constraints.iter().try_for_each(Constraint::validate)
            }
        }
    }
}

impl From<AtomicConstraint> for Constraint {
    fn from(atomic: AtomicConstraint) -> Self {
        Self::Atomic(atomic)
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (name, children) = match self {
            Self::Atomic(atomic) => {
                return write!(
                    f,
                    "{} {} {}",
                    atomic.left_expression, atomic.operator, atomic.right_expression
                )
            }
            Self::And(node) => ("AND", &node.constraints),
            Self::Or(node) => ("OR", &node.constraints),
            Self::Xone(node) => ("XONE", &node.constraints),
        };
        write!(f, "{}(", name)?;
        for (i, child) in children.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", child)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region_eu() -> Constraint {
        Constraint::atomic("region", Operator::Eq, "EU")
    }

    fn purpose_research() -> Constraint {
        Constraint::atomic("purpose", Operator::Eq, "research")
    }

    #[test]
    fn test_combine_semantics() {
        let children = vec![region_eu(), purpose_research()];

        assert!(Multiplicity::And.combine(&children, |_| true));
        assert!(!Multiplicity::And.combine(&children, |c| c == &region_eu()));
        assert!(Multiplicity::Or.combine(&children, |c| c == &region_eu()));
        assert!(!Multiplicity::Or.combine(&children, |_| false));
        assert!(Multiplicity::Xone.combine(&children, |c| c == &region_eu()));
        assert!(!Multiplicity::Xone.combine(&children, |_| true));
        assert!(!Multiplicity::Xone.combine(&children, |_| false));
    }

    #[test]
    fn test_empty_children() {
        assert!(Multiplicity::And.combine(&[], |_| false));
        assert!(!Multiplicity::Or.combine(&[], |_| true));
        assert!(!Multiplicity::Xone.combine(&[], |_| true));
    }

    #[test]
    fn test_xone_evaluates_every_child() {
        let children = vec![region_eu(), purpose_research(), region_eu()];
        let mut visited = 0;
        let satisfied = Multiplicity::Xone.combine(&children, |_| {
            visited += 1;
            true
        });
        assert!(!satisfied);
        assert_eq!(visited, 3);
    }

    #[test]
    fn test_create_preserves_kind() {
        for kind in [Multiplicity::And, Multiplicity::Or, Multiplicity::Xone] {
            let node = kind.create(vec![region_eu()]);
            let (rebuilt_kind, children) = node.multiplicity().unwrap();
            assert_eq!(rebuilt_kind, kind);
            assert_eq!(children, &[region_eu()]);
        }
        assert_eq!(
            XoneConstraint::create(vec![]).into_constraint(),
            Constraint::xone(vec![])
        );
    }

    #[test]
    fn test_operator_defaults_to_eq_when_omitted() {
        let json = serde_json::json!({
            "@type": "AtomicConstraint",
            "leftExpression": {"@type": "LiteralExpression", "value": "region"},
            "rightExpression": {"@type": "LiteralExpression", "value": "EU"}
        });
        let constraint: Constraint = serde_json::from_value(json).unwrap();
        assert_eq!(constraint, region_eu());
    }

    #[test]
    fn test_nested_serialization_round_trip() {
        let tree = Constraint::and(vec![
            Constraint::or(vec![region_eu(), Constraint::atomic("region", Operator::Eq, "EEA")]),
            Constraint::xone(vec![
                purpose_research(),
                Constraint::atomic("level", Operator::Geq, 3),
            ]),
        ]);

        let json = serde_json::to_string(&tree).unwrap();
        assert!(json.contains("\"@type\":\"XoneConstraint\""));
        let back: Constraint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tree);
    }

    #[test]
    fn test_left_operands() {
        let tree = Constraint::and(vec![
            region_eu(),
            Constraint::or(vec![purpose_research(), region_eu()]),
        ]);
        assert_eq!(tree.left_operands(), vec!["region", "purpose", "region"]);
    }

    #[test]
    fn test_retain_atomic() {
        let tree = Constraint::and(vec![
            region_eu(),
            Constraint::or(vec![purpose_research()]),
            Constraint::xone(vec![]),
        ]);

        let pruned = tree
            .retain_atomic(&|atomic: &AtomicConstraint| atomic.left_operand() == Some("region"))
            .unwrap();
        assert_eq!(
            pruned,
            Constraint::and(vec![region_eu(), Constraint::xone(vec![])])
        );

        assert!(region_eu()
            .retain_atomic(&|_: &AtomicConstraint| false)
            .is_none());
    }

    #[test]
    fn test_validate() {
        assert!(region_eu().validate().is_ok());
        assert!(Constraint::and(vec![Constraint::atomic(5, Operator::Eq, "x")])
            .validate()
            .is_err());
        assert!(Constraint::atomic(" ", Operator::Eq, "x").validate().is_err());
    }

    #[test]
    fn test_display() {
        let tree = Constraint::or(vec![region_eu(), Constraint::atomic("level", Operator::Gt, 2)]);
        assert_eq!(tree.to_string(), "OR(region EQ EU, level GT 2)");
    }

    #[test]
    fn test_tree_operations_descend_every_combinator() {
        let invalid = Constraint::atomic("", Operator::Eq, "x");
        for kind in [Multiplicity::And, Multiplicity::Or, Multiplicity::Xone] {
            let tree = Constraint::and(vec![kind.create(vec![region_eu(), purpose_research()])]);
            assert_eq!(tree.left_operands(), vec!["region", "purpose"]);
            assert!(tree.validate().is_ok());

            let pruned = tree
                .retain_atomic(&|atomic: &AtomicConstraint| atomic.left_operand() == Some("region"))
                .unwrap();
            assert_eq!(pruned, Constraint::and(vec![kind.create(vec![region_eu()])]));

            let broken = Constraint::and(vec![kind.create(vec![region_eu(), invalid.clone()])]);
            assert!(broken.validate().is_err());
            assert!(broken.to_string().starts_with("AND("));
            let name = kind.as_str().trim_end_matches("Constraint").to_uppercase();
            assert!(broken.to_string().contains(&format!("{}(", name)));
        }
    }
}
