//! Document selection rules.
//!
//! A [`LoanType`] carries a default document list plus ordered [`OutputRule`]s
//! whose condition trees are interpreted against an [`EvaluationContext`].
//! Evaluation never fails: malformed or incomplete rule data resolves to
//! `false` and is visible in the optional trace.

pub mod context;
pub mod evaluator;
pub mod model;

#[cfg(test)]
mod tests;

pub use context::EvaluationContext;
pub use evaluator::{DocumentSelection, RuleEvaluator, TraceEntry};
pub use model::{
    Condition, ConditionGroup, ConditionNode, ConditionOperator, ConditionTerm, DocumentId,
    LoanType, LogicalOperator, OutputRule,
};
