use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{OpenDataError, Result};

/// One export-ready measurement result: a flat set of named scalar fields.
///
/// Missing fields and explicit `null`s are indistinguishable to readers; both
/// come back as `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    /// Builds a record from a JSON object, rejecting nested arrays and objects.
    pub fn from_json(value: Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(OpenDataError::invalid_record(
                "record",
                "expected a JSON object",
            ));
        };
        Self::from_map(map)
    }

    pub fn from_map(map: Map<String, Value>) -> Result<Self> {
        let mut fields = BTreeMap::new();
        for (name, value) in map {
            if value.is_array() || value.is_object() {
                return Err(OpenDataError::invalid_record(
                    "record",
                    format!("field '{}' is not a scalar", name),
                ));
            }
            fields.insert(name, value);
        }
        Ok(Self { fields })
    }

    /// Builds a record from name/value pairs with the same scalar check as
    /// [`Record::from_map`].
    pub fn from_pairs<I, K>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self::from_map(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).filter(|v| !v.is_null())
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Integer view of a field; numeric strings are accepted because some
    /// sources deliver every column as text.
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns a copy with `extra` fields layered on top.
    pub fn with_fields(&self, extra: impl IntoIterator<Item = (String, Value)>) -> Record {
        let mut fields = self.fields.clone();
        fields.extend(extra);
        Record { fields }
    }

    pub fn to_json(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

/// Text form of a field value: strings as-is, `null` as empty, everything
/// else in its JSON spelling.
pub fn scalar_text(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s.as_str()),
        Value::Null => Cow::Borrowed(""),
        Value::Bool(true) => Cow::Borrowed("true"),
        Value::Bool(false) => Cow::Borrowed("false"),
        other => Cow::Owned(other.to_string()),
    }
}

/// Plausibility bound on RSRP for a band and channel range.
///
/// Exposed as data for external quality flagging; nothing in this crate
/// applies it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRule {
    pub band: Option<i32>,
    pub channel_from: Option<i32>,
    pub channel_to: Option<i32>,
    pub rsrp_limit: Option<i32>,
}
