use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::ioc::Ioc;

/// A value a scanner writes into its result-field mapping. Kept distinct
/// from [`Value`] so the event formatter is the thing that performs
/// the "bytes -> UTF-8 text, replacing invalid sequences" conversion,
/// rather than every scanner doing it itself.
#[derive(Clone, Debug)]
pub enum FieldValue {
    Bytes(Vec<u8>),
    Json(Value),
}

impl From<Value> for FieldValue {
    fn from(v: Value) -> Self {
        FieldValue::Json(v)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Json(Value::String(s.to_string()))
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Json(Value::String(s))
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(b: Vec<u8>) -> Self {
        FieldValue::Bytes(b)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Json(Value::Bool(b))
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Json(Value::from(n))
    }
}

impl From<usize> for FieldValue {
    fn from(n: usize) -> Self {
        FieldValue::Json(Value::from(n))
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Json(serde_json::Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null))
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(items: Vec<String>) -> Self {
        FieldValue::Json(Value::Array(items.into_iter().map(Value::String).collect()))
    }
}

impl FieldValue {
    /// Converts to a plain JSON value, performing the byte -> UTF-8 text
    /// replacement for [`FieldValue::Bytes`].
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Bytes(b) => Value::String(String::from_utf8_lossy(b).into_owned()),
            FieldValue::Json(v) => v.clone(),
        }
    }
}

/// Outcome of one scanner invocation, keyed under the scanner's `key`
/// in the composed event.
///
/// `fields` preserves scanner insertion order; serialized order is always
/// `elapsed`, `flags`, then scanner-provided fields in insertion order.
#[derive(Clone, Debug, Default)]
pub struct ScanResult {
    pub elapsed: f64,
    pub flags: Vec<String>,
    pub iocs: Vec<Ioc>,
    pub exception: Option<String>,
    pub fields: IndexMap<String, FieldValue>,
}

impl ScanResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the (unpruned) JSON object for this result, in fixed key order.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("elapsed".to_string(), serde_json::json!(self.elapsed));
        map.insert(
            "flags".to_string(),
            Value::Array(self.flags.iter().cloned().map(Value::String).collect()),
        );
        if !self.iocs.is_empty() {
            map.insert(
                "iocs".to_string(),
                serde_json::to_value(&self.iocs).unwrap_or(Value::Array(vec![])),
            );
        }
        if let Some(exc) = &self.exception {
            map.insert("exception".to_string(), Value::String(exc.clone()));
        }
        for (key, value) in &self.fields {
            map.insert(key.clone(), value.to_json());
        }
        Value::Object(map)
    }
}
