//! Boolean conditions for `IF` directives.
//!
//! Authored text is normalised (typographic quotes, bare `=`, `<>`), every
//! reference to a scope name is qualified with `@`, and the result is parsed
//! and evaluated against the current [`Scope`]. Failures evaluate to `false`.

mod parser;

use std::cmp::Ordering;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::warn;

use super::scope::{Resolution, Scope};
use super::value::Value;
pub use parser::{CompareOp, Expr};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ExpressionError {
    #[error("cannot parse condition '{expression}': {message}")]
    Parse { expression: String, message: String },
    #[error("'{0}' is not bound in this scope")]
    Unbound(String),
    #[error("condition produced {0} instead of a boolean")]
    NotBoolean(&'static str),
    #[error("cannot order {0} against {1}")]
    Incomparable(&'static str, &'static str),
}

/// Evaluate a condition, logging and returning `false` on any failure.
pub fn evaluate_condition(raw: &str, scope: &Scope<'_>) -> bool {
    match evaluate(raw, scope) {
        Ok(result) => result,
        Err(err) => {
            warn!(condition = %raw, error = %err, "condition evaluation failed; treated as false");
            false
        }
    }
}

pub fn evaluate(raw: &str, scope: &Scope<'_>) -> Result<bool, ExpressionError> {
    let normalized = normalize(raw);
    let qualified = qualify(&normalized, &scope.names());
    let expr = parser::parse(&qualified).map_err(|message| ExpressionError::Parse {
        expression: raw.to_string(),
        message,
    })?;

    match eval(&expr, scope)? {
        Value::Bool(result) => Ok(result),
        other => Err(ExpressionError::NotBoolean(kind(&other))),
    }
}

/// Rewrite relaxed authoring syntax into the strict grammar.
pub fn normalize(raw: &str) -> String {
    let chars: Vec<char> = raw
        .chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' | '\u{2033}' => '"',
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' | '\u{2032}' => '\'',
            other => other,
        })
        .collect();

    let mut out = String::with_capacity(raw.len() + 4);
    let mut quote: Option<char> = None;
    let mut index = 0;
    while index < chars.len() {
        let c = chars[index];
        let prev = index.checked_sub(1).map(|i| chars[i]);
        let next = chars.get(index + 1).copied();
        index += 1;

        if let Some(open) = quote {
            out.push(c);
            if c == open {
                quote = None;
            }
            continue;
        }

        match c {
            '"' | '\'' => {
                quote = Some(c);
                out.push(c);
            }
            '<' if next == Some('>') => {
                out.push_str("!=");
                index += 1;
            }
            '=' if next != Some('=') && !matches!(prev, Some('=' | '!' | '<' | '>')) => {
                out.push_str("==");
            }
            other => out.push(other),
        }
    }
    out
}

/// Prefix `@` to every bare reference whose head is one of `names`.
pub fn qualify(normalized: &str, names: &[&str]) -> String {
    let chars: Vec<char> = normalized.chars().collect();
    let mut out = String::with_capacity(normalized.len() + 8);
    let mut quote: Option<char> = None;
    let mut index = 0;

    while index < chars.len() {
        let c = chars[index];

        if let Some(open) = quote {
            out.push(c);
            if c == open {
                quote = None;
            }
            index += 1;
            continue;
        }

        if c == '"' || c == '\'' {
            quote = Some(c);
            out.push(c);
            index += 1;
            continue;
        }

        let starts_word = (c.is_ascii_alphabetic() || c == '_')
            && !matches!(
                index.checked_sub(1).map(|i| chars[i]),
                Some(p) if p.is_ascii_alphanumeric() || p == '_' || p == '.' || p == '@'
            );
        if !starts_word {
            out.push(c);
            index += 1;
            continue;
        }

        let start = index;
        while index < chars.len() && (chars[index].is_ascii_alphanumeric() || chars[index] == '_')
        {
            index += 1;
        }
        let word: String = chars[start..index].iter().collect();
        if names.contains(&word.as_str()) {
            out.push('@');
        }
        out.push_str(&word);
    }
    out
}

fn eval(expr: &Expr, scope: &Scope<'_>) -> Result<Value, ExpressionError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Path(path) => match scope.resolve(path) {
            Resolution::Found(value) => Ok(value),
            Resolution::Missing => Ok(Value::Null),
            Resolution::Unqualified => Err(ExpressionError::Unbound(path.clone())),
        },
        Expr::Not(inner) => Ok(Value::Bool(!truth(eval(inner, scope)?)?)),
        Expr::And(left, right) => {
            if !truth(eval(left, scope)?)? {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(truth(eval(right, scope)?)?))
        }
        Expr::Or(left, right) => {
            if truth(eval(left, scope)?)? {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(truth(eval(right, scope)?)?))
        }
        Expr::Compare(left, op, right) => {
            let left = eval(left, scope)?;
            let right = eval(right, scope)?;
            compare(&left, *op, &right).map(Value::Bool)
        }
    }
}

fn truth(value: Value) -> Result<bool, ExpressionError> {
    match value {
        Value::Bool(flag) => Ok(flag),
        other => Err(ExpressionError::NotBoolean(kind(&other))),
    }
}

fn compare(left: &Value, op: CompareOp, right: &Value) -> Result<bool, ExpressionError> {
    match op {
        CompareOp::Eq => Ok(equals(left, right)),
        CompareOp::Ne => Ok(!equals(left, right)),
        CompareOp::Lt | CompareOp::Le | CompareOp::Gt | CompareOp::Ge => {
            let ordering = order(left, right)
                .ok_or_else(|| ExpressionError::Incomparable(kind(left), kind(right)))?;
            Ok(match op {
                CompareOp::Lt => ordering == Ordering::Less,
                CompareOp::Le => ordering != Ordering::Greater,
                CompareOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            })
        }
    }
}

fn parse_number(text: &str) -> Option<Decimal> {
    Decimal::from_str(text.trim()).ok()
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").ok()
}

fn equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Number(a), Value::Number(b)) => a == b,
        (Value::Number(a), Value::Text(b)) | (Value::Text(b), Value::Number(a)) => {
            parse_number(b).is_some_and(|b| *a == b)
        }
        (Value::Date(a), Value::Date(b)) => a == b,
        (Value::Date(a), Value::Text(b)) | (Value::Text(b), Value::Date(a)) => {
            parse_date(b).is_some_and(|b| *a == b)
        }
        (Value::Enum(a), Value::Text(b)) | (Value::Text(b), Value::Enum(a)) => {
            a.name.as_deref() == Some(b.as_str()) || a.description.as_deref() == Some(b.as_str())
        }
        (Value::Enum(a), Value::Number(b)) | (Value::Number(b), Value::Enum(a)) => {
            a.value.map(Decimal::from) == Some(*b)
        }
        (Value::Enum(a), Value::Enum(b)) => a.name == b.name,
        (a, b) => a == b,
    }
}

fn order(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Some(a.cmp(b)),
        (Value::Number(a), Value::Text(b)) => parse_number(b).map(|b| a.cmp(&b)),
        (Value::Text(a), Value::Number(b)) => parse_number(a).map(|a| a.cmp(b)),
        (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
        (Value::Date(a), Value::Text(b)) => parse_date(b).map(|b| a.cmp(&b)),
        (Value::Text(a), Value::Date(b)) => parse_date(a).map(|a| a.cmp(b)),
        (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
        (Value::Enum(a), Value::Number(b)) => a.value.map(|a| Decimal::from(a).cmp(b)),
        (Value::Number(a), Value::Enum(b)) => b.value.map(|b| a.cmp(&Decimal::from(b))),
        _ => None,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::Text(_) => "text",
        Value::Date(_) => "date",
        Value::Enum(_) => "enum",
        Value::List(_) => "list",
        Value::Map(_) => "map",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::value::EnumValue;

    fn model() -> Value {
        Value::object([
            ("Amount", Value::from(250000)),
            ("State", Value::text("CA")),
            ("IsRefinance", Value::Bool(false)),
            (
                "Closing",
                Value::Date(NaiveDate::from_ymd_opt(2025, 3, 7).expect("valid date")),
            ),
            ("RateType", Value::Enum(EnumValue::new("Fixed", 1, "Fixed Rate"))),
            ("CoBorrower", Value::Null),
        ])
    }

    #[test]
    fn normalizes_relaxed_syntax() {
        assert_eq!(
            normalize("Loan.State = \u{201C}CA\u{201D}"),
            "Loan.State == \"CA\""
        );
        assert_eq!(normalize("a >= 1 and b <> 'x=y'"), "a >= 1 and b != 'x=y'");
        assert_eq!(normalize("a == 1"), "a == 1");
    }

    #[test]
    fn qualifies_scope_names_only() {
        assert_eq!(
            qualify("Loan.Amount > 1 and item.Name == 'Loan'", &["item", "Loan"]),
            "@Loan.Amount > 1 and @item.Name == 'Loan'"
        );
        assert_eq!(qualify("Other.Loan == 1", &["Loan"]), "Other.Loan == 1");
    }

    #[test]
    fn evaluates_typed_comparisons() {
        let model = model();
        let scope = Scope::new("Loan", &model);
        let cases = [
            ("Loan.Amount > 100000", true),
            ("Loan.Amount = 250000.00", true),
            ("Loan.State = \u{2018}CA\u{2019} AndAlso Not Loan.IsRefinance", true),
            ("Loan.Closing < '2025-04-01'", true),
            ("Loan.RateType == \"Fixed\"", true),
            ("Loan.RateType.Value == 2", false),
            ("Loan.CoBorrower == null", true),
            ("Loan.CoBorrower.Name == null", true),
            ("(Loan.State == 'NY' or Loan.State == 'CA') and Loan.Amount < 300000", true),
        ];
        for (condition, expected) in cases {
            assert_eq!(evaluate(condition, &scope), Ok(expected), "{condition}");
        }
    }

    #[test]
    fn loop_variable_is_visible() {
        let model = model();
        let root = Scope::new("Loan", &model);
        let scope = root.with_item("party", Value::object([("Role", Value::text("Guarantor"))]));
        assert!(evaluate_condition("party.Role == 'Guarantor'", &scope));
        assert!(!evaluate_condition("party.Role == 'Guarantor'", &root));
    }

    #[test]
    fn failures_are_false() {
        let model = model();
        let scope = Scope::new("Loan", &model);
        assert!(!evaluate_condition("Loan.Amount >", &scope));
        assert!(!evaluate_condition("Loan.State", &scope));
        assert!(!evaluate_condition("Loan.State > 5", &scope));
        assert!(!evaluate_condition("Deal.Amount > 5", &scope));
        assert!(matches!(
            evaluate("Loan.State", &scope),
            Err(ExpressionError::NotBoolean("text"))
        ));
    }
}
