use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Read-only scalar lookup used while evaluating output rules.
///
/// Keys match exactly first, then trimmed and case-insensitively, so authored
/// field names like `" propertyState "` still resolve `PropertyState`. When
/// several keys match only loosely, the first inserted wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvaluationContext {
    values: IndexMap<String, String>,
}

impl EvaluationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        if let Some(value) = self.values.get(key) {
            return Some(value.as_str());
        }

        let wanted = key.trim();
        self.values
            .iter()
            .find(|(candidate, _)| candidate.trim().eq_ignore_ascii_case(wanted))
            .map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Flatten a JSON object of scalars; nested objects and arrays are skipped.
    pub fn from_json(value: &serde_json::Value) -> Self {
        let mut context = Self::new();
        if let serde_json::Value::Object(map) = value {
            for (key, value) in map {
                let scalar = match value {
                    serde_json::Value::String(text) => text.clone(),
                    serde_json::Value::Number(number) => number.to_string(),
                    serde_json::Value::Bool(flag) => flag.to_string(),
                    serde_json::Value::Null => String::new(),
                    serde_json::Value::Array(_) | serde_json::Value::Object(_) => continue,
                };
                context.insert(key.clone(), scalar);
            }
        }
        context
    }
}

impl<K, V> FromIterator<(K, V)> for EvaluationContext
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut context = Self::new();
        for (key, value) in iter {
            context.insert(key, value);
        }
        context
    }
}
