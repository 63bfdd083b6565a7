//! Event formatter: normalize arbitrary scanner output into an
//! on-the-wire event — bytes to text, prune empties, serialize.

use serde_json::{Map, Value};

use crate::error::Result;
use crate::model::FileEvent;

fn is_prunable(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

/// Recursively prunes keys/elements whose value is an empty string, empty
/// list, empty mapping, or null. Bottom-up: children are pruned first, so a
/// mapping that becomes empty only after its own children were pruned is
/// itself dropped one level up.
fn prune(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::new();
            for (key, v) in map {
                let pruned = prune(v);
                if !is_prunable(&pruned) {
                    out.insert(key, pruned);
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => {
            let out: Vec<Value> = items
                .into_iter()
                .map(prune)
                .filter(|v| !is_prunable(v))
                .collect();
            Value::Array(out)
        }
        other => other,
    }
}

/// Builds the unpruned JSON value for a full event: `{file: {...}, scan:
/// {<key>: {...}, ...}}`, preserving scan-key insertion order.
fn to_value(event: &FileEvent) -> Result<Value> {
    let file_value = serde_json::to_value(&event.file)?;
    let mut scan_map = Map::new();
    for (key, result) in &event.scan {
        scan_map.insert(key.clone(), result.to_value());
    }
    let mut root = Map::new();
    root.insert("file".to_string(), file_value);
    root.insert("scan".to_string(), Value::Object(scan_map));
    Ok(Value::Object(root))
}

/// Formats a [`FileEvent`] into the single-line JSON text pushed to the
/// event stream: bytes replaced with UTF-8 text, empties pruned, serialized.
pub fn format_event(event: &FileEvent) -> Result<String> {
    let value = prune(to_value(event)?);
    Ok(serde_json::to_string(&value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::scan_result::FieldValue;
    use crate::model::{tree_dict, FileDict, FileId, ScanResult};
    use indexmap::IndexMap;

    fn base_event() -> FileEvent {
        FileEvent {
            file: FileDict {
                depth: 0,
                name: None,
                flavors: Default::default(),
                scanners: vec!["strings".into()],
                size: 4,
                source: String::new(),
                tree: tree_dict(FileId::new(), None, 0, "root"),
            },
            scan: IndexMap::new(),
        }
    }

    #[test]
    fn empty_name_and_source_are_pruned() {
        let event = base_event();
        let out = format_event(&event).unwrap();
        assert!(!out.contains("\"name\""));
        assert!(!out.contains("\"source\""));
    }

    #[test]
    fn bytes_are_replaced_with_lossy_utf8() {
        let mut event = base_event();
        let mut result = ScanResult::new();
        result
            .fields
            .insert("raw".to_string(), FieldValue::Bytes(vec![0x68, 0x69, 0xff]));
        event.scan.insert("strings".to_string(), result);
        let out = format_event(&event).unwrap();
        assert!(out.contains("hi\u{FFFD}"));
    }

    #[test]
    fn empty_scanner_result_collections_are_pruned_from_wire() {
        let mut event = base_event();
        let result = ScanResult::new();
        event.scan.insert("strings".to_string(), result);
        let out = format_event(&event).unwrap();
        // flags: [] and iocs: [] are empty lists -> pruned entirely.
        assert!(!out.contains("\"flags\""));
        assert!(!out.contains("\"iocs\""));
        // elapsed (a number, never empty) survives.
        assert!(out.contains("\"elapsed\""));
    }

    #[test]
    fn field_insertion_order_is_preserved() {
        let mut event = base_event();
        let mut result = ScanResult::new();
        result.fields.insert("b".to_string(), FieldValue::from("2"));
        result.fields.insert("a".to_string(), FieldValue::from("1"));
        event.scan.insert("strings".to_string(), result);
        let out = format_event(&event).unwrap();
        assert!(out.find("\"b\"").unwrap() < out.find("\"a\"").unwrap());
    }
}
