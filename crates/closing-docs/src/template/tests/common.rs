use chrono::NaiveDate;

use crate::template::{Block, Container, EnumValue, Value};

pub(super) fn blocks(lines: &[&str]) -> Vec<Block> {
    lines.iter().map(|line| Block::text(*line)).collect()
}

pub(super) fn body(lines: &[&str]) -> Container {
    Container::new("body", blocks(lines))
}

pub(super) fn party(name: &str, role: &str, signs: bool) -> Value {
    Value::object([
        ("Name", Value::text(name)),
        ("Role", Value::text(role)),
        ("Signs", Value::Bool(signs)),
    ])
}

/// Loan with three parties, a fee map and an optional enum left unset.
pub(super) fn loan() -> Value {
    Value::object([
        ("Number", Value::text("LN-1042")),
        ("Amount", Value::from(325000)),
        ("State", Value::text("CA")),
        (
            "Closing",
            Value::Date(NaiveDate::from_ymd_opt(2025, 3, 7).expect("valid date")),
        ),
        (
            "Product",
            Value::Enum(EnumValue::new("Fixed30", 30, "30-Year Fixed")),
        ),
        ("Occupancy", Value::Enum(EnumValue::unset())),
        (
            "Parties",
            Value::List(vec![
                party("Ada Lovelace", "Borrower", true),
                party("Charles Babbage", "Co-Borrower", true),
                party("Mary Somerville", "Guarantor", false),
            ]),
        ),
        (
            "Fees",
            Value::map([
                ("Recording", Value::from(120)),
                ("Appraisal", Value::from(550)),
            ]),
        ),
    ])
}

pub(super) fn lines(container: &Container) -> Vec<String> {
    container.plain_lines()
}
