use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::context::EvaluationContext;
use super::model::{
    Condition, ConditionGroup, ConditionNode, ConditionOperator, DocumentId, LoanType,
    LogicalOperator, OutputRule,
};

/// One line of the evaluation trace, tied to the rule being evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
    pub message: String,
}

/// Ordered, de-duplicated document ids chosen for a loan.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DocumentSelection {
    pub document_ids: Vec<DocumentId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trace: Vec<TraceEntry>,
}

impl DocumentSelection {
    fn push(&mut self, seen: &mut HashSet<DocumentId>, id: &DocumentId) -> bool {
        if seen.insert(id.clone()) {
            self.document_ids.push(id.clone());
            true
        } else {
            false
        }
    }
}

/// Stateless interpreter for loan type output rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleEvaluator {
    trace: bool,
}

impl RuleEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a human-readable trace alongside the selection.
    pub fn with_trace(mut self, enabled: bool) -> Self {
        self.trace = enabled;
        self
    }

    /// Defaults first, then each matching rule's documents in declaration order.
    pub fn evaluate(&self, loan_type: &LoanType, context: &EvaluationContext) -> DocumentSelection {
        let mut selection = DocumentSelection::default();
        let mut seen = HashSet::new();
        let mut tracer = Tracer::new(self.trace);

        for id in &loan_type.default_documents {
            if selection.push(&mut seen, id) {
                tracer.note(None, || format!("default document {id}"));
            }
        }

        for rule in &loan_type.rules {
            let matched = self.rule_matches(rule, context, &mut tracer);
            tracer.note(Some(rule.name.as_str()), || {
                format!("rule {}", if matched { "matched" } else { "did not match" })
            });
            if !matched {
                continue;
            }
            for id in &rule.then_generate {
                if selection.push(&mut seen, id) {
                    tracer.note(Some(rule.name.as_str()), || format!("activated {id}"));
                } else {
                    tracer.note(Some(rule.name.as_str()), || format!("{id} already selected"));
                }
            }
        }

        debug!(
            loan_type = %loan_type.name,
            documents = selection.document_ids.len(),
            "document selection evaluated"
        );

        selection.trace = tracer.into_entries();
        selection
    }

    fn rule_matches(
        &self,
        rule: &OutputRule,
        context: &EvaluationContext,
        tracer: &mut Tracer,
    ) -> bool {
        match &rule.condition {
            None => true,
            Some(group) => eval_group(group, context, &rule.name, tracer),
        }
    }
}

/// Left-to-right fold where each term's join combines it with the next term.
fn eval_group(
    group: &ConditionGroup,
    context: &EvaluationContext,
    rule: &str,
    tracer: &mut Tracer,
) -> bool {
    let Some(first) = group.terms.first() else {
        return true;
    };

    let mut acc = eval_node(&first.node, context, rule, tracer);
    for pair in group.terms.windows(2) {
        let next = eval_node(&pair[1].node, context, rule, tracer);
        acc = match pair[0].join_to_next {
            LogicalOperator::Or => acc || next,
            LogicalOperator::And | LogicalOperator::Unknown => acc && next,
        };
    }
    acc
}

fn eval_node(
    node: &ConditionNode,
    context: &EvaluationContext,
    rule: &str,
    tracer: &mut Tracer,
) -> bool {
    match node {
        ConditionNode::Leaf(condition) => eval_leaf(condition, context, rule, tracer),
        ConditionNode::Group(group) => eval_group(group, context, rule, tracer),
    }
}

fn eval_leaf(
    condition: &Condition,
    context: &EvaluationContext,
    rule: &str,
    tracer: &mut Tracer,
) -> bool {
    let Some(actual) = context.get(&condition.field) else {
        tracer.note(Some(rule), || {
            format!("field '{}' missing from context", condition.field)
        });
        return false;
    };

    let actual = actual.trim().to_lowercase();
    let expected: Vec<String> = condition
        .expanded_values()
        .into_iter()
        .map(|value| value.to_lowercase())
        .collect();
    let first = expected.first().map(String::as_str).unwrap_or("");

    let result = match condition.operator {
        ConditionOperator::Equals | ConditionOperator::Unknown => actual == first,
        ConditionOperator::NotEquals => actual != first,
        ConditionOperator::In => expected.iter().any(|value| *value == actual),
        ConditionOperator::NotIn => !expected.iter().any(|value| *value == actual),
        ConditionOperator::Contains => expected.iter().any(|value| actual.contains(value.as_str())),
        ConditionOperator::StartsWith => {
            expected.iter().any(|value| actual.starts_with(value.as_str()))
        }
        ConditionOperator::EndsWith => expected.iter().any(|value| actual.ends_with(value.as_str())),
    };

    tracer.note(Some(rule), || {
        format!(
            "{} {:?} [{}] against '{}' => {}",
            condition.field,
            condition.operator,
            expected.join(", "),
            actual,
            result
        )
    });
    result
}

struct Tracer {
    entries: Option<Vec<TraceEntry>>,
}

impl Tracer {
    fn new(enabled: bool) -> Self {
        Self {
            entries: enabled.then(Vec::new),
        }
    }

    fn note(&mut self, rule: Option<&str>, message: impl FnOnce() -> String) {
        if let Some(entries) = self.entries.as_mut() {
            entries.push(TraceEntry {
                rule: rule.map(str::to_string),
                message: message(),
            });
        }
    }

    fn into_entries(self) -> Vec<TraceEntry> {
        self.entries.unwrap_or_default()
    }
}
