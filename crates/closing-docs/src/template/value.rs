use std::borrow::Cow;
use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::NaiveDate;
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Enumeration-like value exposing `Name`, `Value` and `Description` members.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EnumValue {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
}

impl EnumValue {
    pub fn new(name: impl Into<String>, value: i64, description: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            value: Some(value),
            description: Some(description.into()),
        }
    }

    /// An optional enum with no selection; its members resolve to null.
    pub fn unset() -> Self {
        Self::default()
    }

    fn member(&self, segment: &str) -> Option<Value> {
        let member = if segment.eq_ignore_ascii_case("description") {
            self.description.clone().map(Value::Text)
        } else if segment.eq_ignore_ascii_case("name") {
            self.name.clone().map(Value::Text)
        } else if segment.eq_ignore_ascii_case("value") {
            self.value.map(|value| Value::Number(Decimal::from(value)))
        } else {
            return None;
        };
        Some(member.unwrap_or(Value::Null))
    }

    fn render(&self) -> String {
        self.description
            .clone()
            .or_else(|| self.name.clone())
            .or_else(|| self.value.map(|value| value.to_string()))
            .unwrap_or_default()
    }
}

/// Data model merged into templates.
///
/// `Map` is a key-value collection and `Object` a record with named members;
/// both look keys up case-insensitively, maps first.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(Decimal),
    Text(String),
    Date(NaiveDate),
    Enum(EnumValue),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Object(IndexMap<String, Value>),
}

impl Value {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn object<K, I>(members: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self::Object(
            members
                .into_iter()
                .map(|(key, value)| (key.into(), value))
                .collect(),
        )
    }

    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value))
                .collect(),
        )
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Resolve one path segment. `None` means the member does not exist.
    ///
    /// Checked in order: enum virtual members, map keys, object members. Lists
    /// expose a virtual `Count`. Stored members are borrowed; only virtual
    /// members are built.
    pub fn member(&self, segment: &str) -> Option<Cow<'_, Value>> {
        match self {
            Value::Enum(value) => value.member(segment).map(Cow::Owned),
            Value::Map(entries) => entries
                .get(segment)
                .or_else(|| {
                    entries
                        .iter()
                        .find(|(key, _)| key.eq_ignore_ascii_case(segment))
                        .map(|(_, value)| value)
                })
                .map(Cow::Borrowed),
            Value::Object(members) => members
                .get(segment)
                .or_else(|| {
                    members
                        .iter()
                        .find(|(key, _)| key.eq_ignore_ascii_case(segment))
                        .map(|(_, value)| value)
                })
                .map(Cow::Borrowed),
            Value::List(items) if segment.eq_ignore_ascii_case("count") => {
                Some(Cow::Owned(Value::Number(Decimal::from(items.len()))))
            }
            _ => None,
        }
    }

    /// Text substituted for a placeholder.
    pub fn render(&self) -> String {
        match self {
            Value::Null | Value::List(_) | Value::Map(_) | Value::Object(_) => String::new(),
            Value::Bool(flag) => flag.to_string(),
            Value::Number(number) => number.to_string(),
            Value::Text(text) => text.clone(),
            Value::Date(date) => date.format("%B %-d, %Y").to_string(),
            Value::Enum(value) => value.render(),
        }
    }

    /// Convert JSON input. Single-key objects tagged `$enum`, `$map` or `$date`
    /// become the matching variant.
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(flag) => Value::Bool(flag),
            serde_json::Value::Number(number) => Decimal::from_str(&number.to_string())
                .or_else(|_| Decimal::from_scientific(&number.to_string()))
                .map(Value::Number)
                .unwrap_or(Value::Null),
            serde_json::Value::String(text) => Value::Text(text),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(members) => {
                if members.len() == 1 {
                    if let Some(tagged) = tagged_value(&members) {
                        return tagged;
                    }
                }
                Value::Object(
                    members
                        .into_iter()
                        .map(|(key, value)| (key, Value::from_json(value)))
                        .collect(),
                )
            }
        }
    }
}

fn tagged_value(members: &serde_json::Map<String, serde_json::Value>) -> Option<Value> {
    if let Some(tagged) = members.get("$enum") {
        return serde_json::from_value::<EnumValue>(tagged.clone())
            .ok()
            .map(Value::Enum);
    }
    if let Some(serde_json::Value::Object(entries)) = members.get("$map") {
        return Some(Value::Map(
            entries
                .iter()
                .map(|(key, value)| (key.clone(), Value::from_json(value.clone())))
                .collect(),
        ));
    }
    if let Some(serde_json::Value::String(raw)) = members.get("$date") {
        return NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .ok()
            .map(Value::Date);
    }
    None
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Value::Number(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(Decimal::from(value))
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(Decimal::from(value))
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Value::Date(value)
    }
}

impl From<EnumValue> for Value {
    fn from(value: EnumValue) -> Self {
        Value::Enum(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(value)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        serde_json::Value::deserialize(deserializer).map(Value::from_json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn object_members_resolve_case_insensitively() {
        let value = Value::object([("BorrowerName", Value::text("Ada"))]);
        assert_eq!(value.member("borrowername").as_deref(), Some(&Value::text("Ada")));
        assert!(matches!(value.member("borrowername"), Some(Cow::Borrowed(_))));
        assert_eq!(value.member("Missing"), None);
    }

    #[test]
    fn unset_enum_members_are_null_not_missing() {
        let status = Value::Enum(EnumValue::unset());
        assert_eq!(status.member("Description").as_deref(), Some(&Value::Null));
        assert_eq!(status.member("Other"), None);
        assert_eq!(status.render(), "");
    }

    #[test]
    fn enum_renders_description_first() {
        let status = Value::Enum(EnumValue::new("Fixed", 1, "Fixed Rate"));
        assert_eq!(status.render(), "Fixed Rate");
        assert_eq!(status.member("value").map(|v| v.render()), Some("1".into()));
    }

    #[test]
    fn json_conversion_understands_tags() {
        let value = Value::from_json(json!({
            "Amount": 250000.5,
            "Closing": { "$date": "2025-03-07" },
            "Rate": { "$enum": { "name": "Arm", "value": 2 } },
            "Fees": { "$map": { "Recording": 120 } },
            "Borrowers": [{ "Name": "Ada" }],
        }));

        assert_eq!(
            value.member("amount").map(|v| v.render()),
            Some("250000.5".to_string())
        );
        assert_eq!(
            value.member("closing").map(|v| v.render()),
            Some("March 7, 2025".to_string())
        );
        assert_eq!(
            value.member("rate").map(|v| v.render()),
            Some("Arm".to_string())
        );
        assert!(matches!(value.member("fees").as_deref(), Some(Value::Map(_))));
        assert_eq!(
            value
                .member("Borrowers")
                .and_then(|v| v.member("count").map(|count| count.render())),
            Some("1".to_string())
        );
    }
}
