//! Template merge engine: directive expansion and placeholder substitution
//! over a block/leaf document tree.

pub mod directive;
pub mod document;
pub mod expression;
pub mod placeholder;
pub mod processor;
pub mod scope;
pub mod value;

#[cfg(test)]
mod tests;

pub use document::{Block, Container, Formatting, Leaf, TemplateDocument};
pub use expression::{evaluate_condition, ExpressionError};
pub use processor::{
    process_template, ContainerReport, ProcessReport, TemplateProcessor, DEFAULT_MAX_EXTRA_PASSES,
    DEFAULT_ROOT_NAME,
};
pub use scope::{Resolution, Scope};
pub use value::{EnumValue, Value};
