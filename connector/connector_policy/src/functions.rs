//! Built-in evaluation functions.

use connector_core::Value;
use std::collections::BTreeSet;
use tracing::trace;

use crate::model::{Operator, PolicyContext, RuleRef};
use crate::registry::DynamicAtomicConstraintFunction;

/// Compares the request fact named by the left operand against the right
/// operand with [`Operator::apply`].
///
/// A missing fact leaves the constraint unsatisfied and reports a problem.
#[derive(Debug, Clone, Default)]
pub struct FactComparison {
    /// `None` handles every operand.
    operands: Option<BTreeSet<String>>,
}

impl FactComparison {
    /// Handle only the given left operands.
    pub fn new<I, S>(operands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            operands: Some(operands.into_iter().map(Into::into).collect()),
        }
    }

    /// Handle every left operand.
    pub fn any() -> Self {
        Self { operands: None }
    }
}

impl DynamicAtomicConstraintFunction for FactComparison {
    fn can_handle(&self, left_operand: &str) -> bool {
        match &self.operands {
            Some(operands) => operands.contains(left_operand),
            None => true,
        }
    }

    fn evaluate(
        &self,
        left_operand: &str,
        operator: Operator,
        right: &Value,
        _rule: RuleRef<'_>,
        context: &mut PolicyContext,
    ) -> bool {
        let satisfied = context
            .fact(left_operand)
            .map(|fact| operator.apply(fact, right));
        trace!(left_operand, %operator, ?satisfied, "Compared fact");

        match satisfied {
            Some(satisfied) => satisfied,
            None => {
                context.report_problem(format!("request has no fact '{}'", left_operand));
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Permission, Rule};

    #[test]
    fn test_can_handle() {
        let comparison = FactComparison::new(["region", "purpose"]);
        assert!(comparison.can_handle("region"));
        assert!(!comparison.can_handle("spatial"));
        assert!(FactComparison::any().can_handle("spatial"));
    }

    #[test]
    fn test_compares_fact() {
        let comparison = FactComparison::any();
        let permission = Permission::new("use");
        let mut context = PolicyContext::new().with_fact("level", 4);

        assert!(comparison.evaluate(
            "level",
            Operator::Geq,
            &Value::from(3),
            permission.as_rule_ref(),
            &mut context
        ));
        assert!(!comparison.evaluate(
            "level",
            Operator::Lt,
            &Value::from(3),
            permission.as_rule_ref(),
            &mut context
        ));
        assert!(context.problems().is_empty());
    }

    #[test]
    fn test_missing_fact_reports_problem() {
        let comparison = FactComparison::any();
        let permission = Permission::new("use");
        let mut context = PolicyContext::new();

        assert!(!comparison.evaluate(
            "region",
            Operator::Eq,
            &Value::from("EU"),
            permission.as_rule_ref(),
            &mut context
        ));
        assert_eq!(context.problems(), &["request has no fact 'region'".to_string()]);
    }
}
