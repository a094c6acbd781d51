use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a document template in the template store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub String);

impl DocumentId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Comparison applied between a context value and a condition's value set.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConditionOperator {
    #[default]
    #[serde(alias = "equals", alias = "=", alias = "==")]
    Equals,
    #[serde(alias = "notEquals", alias = "!=", alias = "<>")]
    NotEquals,
    #[serde(alias = "in")]
    In,
    #[serde(alias = "notIn")]
    NotIn,
    #[serde(alias = "contains")]
    Contains,
    #[serde(alias = "startsWith")]
    StartsWith,
    #[serde(alias = "endsWith")]
    EndsWith,
    /// Authored operator this engine does not recognise; compared as
    /// equality against the first value.
    #[serde(other)]
    Unknown,
}

/// Join applied between a term and the term after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LogicalOperator {
    #[default]
    #[serde(alias = "and", alias = "AND", alias = "&&")]
    And,
    #[serde(alias = "or", alias = "OR", alias = "||")]
    Or,
    #[serde(other)]
    Unknown,
}

/// Atomic predicate: one context field, one operator, one value set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    #[serde(default)]
    pub operator: ConditionOperator,
    #[serde(default)]
    pub values: Vec<String>,
}

impl Condition {
    pub fn new(
        field: impl Into<String>,
        operator: ConditionOperator,
        values: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            field: field.into(),
            operator,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Values with comma-separated entries split out, trimmed, blanks dropped.
    pub fn expanded_values(&self) -> Vec<String> {
        self.values
            .iter()
            .flat_map(|value| value.split(','))
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Node of a condition tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionNode {
    Leaf(Condition),
    Group(ConditionGroup),
}

/// One entry of a group: the node and the join to the following term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionTerm {
    pub node: ConditionNode,
    #[serde(default)]
    pub join_to_next: LogicalOperator,
}

impl ConditionTerm {
    pub fn leaf(condition: Condition, join_to_next: LogicalOperator) -> Self {
        Self {
            node: ConditionNode::Leaf(condition),
            join_to_next,
        }
    }

    pub fn group(group: ConditionGroup, join_to_next: LogicalOperator) -> Self {
        Self {
            node: ConditionNode::Group(group),
            join_to_next,
        }
    }
}

/// Ordered terms folded left to right. An empty group is true.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConditionGroup {
    #[serde(default)]
    pub terms: Vec<ConditionTerm>,
}

impl ConditionGroup {
    pub fn new(terms: Vec<ConditionTerm>) -> Self {
        Self { terms }
    }
}

/// Named rule activating documents when its condition holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRule {
    pub name: String,
    #[serde(default, rename = "if")]
    pub condition: Option<ConditionGroup>,
    #[serde(default)]
    pub then_generate: Vec<DocumentId>,
}

/// Loan product definition driving document selection.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LoanType {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub default_documents: Vec<DocumentId>,
    #[serde(default)]
    pub rules: Vec<OutputRule>,
}
