use crate::rules::{
    Condition, ConditionGroup, ConditionOperator, ConditionTerm, DocumentId, EvaluationContext,
    LoanType, LogicalOperator, OutputRule,
};

pub(super) fn ids(values: &[&str]) -> Vec<DocumentId> {
    values.iter().map(|value| DocumentId::from(*value)).collect()
}

pub(super) fn leaf(field: &str, operator: ConditionOperator, values: &[&str]) -> Condition {
    Condition::new(field, operator, values.iter().copied())
}

pub(super) fn term(condition: Condition, join: LogicalOperator) -> ConditionTerm {
    ConditionTerm::leaf(condition, join)
}

pub(super) fn rule(name: &str, condition: Option<ConditionGroup>, documents: &[&str]) -> OutputRule {
    OutputRule {
        name: name.to_string(),
        condition,
        then_generate: ids(documents),
    }
}

/// Truthy/falsy leaves keyed off a fixed context field.
pub(super) fn flag(value: bool) -> Condition {
    leaf(
        "Flag",
        ConditionOperator::Equals,
        &[if value { "yes" } else { "no" }],
    )
}

pub(super) fn flag_context() -> EvaluationContext {
    EvaluationContext::new().with("Flag", "yes")
}

pub(super) fn conventional_purchase() -> LoanType {
    LoanType {
        name: "Conventional Purchase".to_string(),
        default_documents: ids(&["note", "deed-of-trust", "closing-disclosure"]),
        rules: vec![
            rule(
                "California addendum",
                Some(ConditionGroup::new(vec![term(
                    leaf("PropertyState", ConditionOperator::In, &["CA, NV"]),
                    LogicalOperator::And,
                )])),
                &["ca-addendum", "note"],
            ),
            rule("Always privacy notice", None, &["privacy-notice"]),
            rule(
                "Condo rider",
                Some(ConditionGroup::new(vec![term(
                    leaf("PropertyType", ConditionOperator::Equals, &["Condominium"]),
                    LogicalOperator::And,
                )])),
                &["condo-rider", "ca-addendum"],
            ),
        ],
    }
}
