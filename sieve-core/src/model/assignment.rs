use serde_json::Value;
use std::collections::BTreeMap;

/// A scanner selected to run against a particular file, produced by the
/// assignment engine and consumed by the dispatcher.
#[derive(Clone, Debug, PartialEq)]
pub struct ScannerAssignment {
    pub name: String,
    pub priority: i32,
    pub options: BTreeMap<String, Value>,
}

impl ScannerAssignment {
    pub fn new(name: impl Into<String>, priority: i32) -> Self {
        Self {
            name: name.into(),
            priority,
            options: BTreeMap::new(),
        }
    }

    /// Builder helper for populating `options` inline.
    pub fn tap_options(mut self, f: impl FnOnce(&mut BTreeMap<String, Value>)) -> Self {
        f(&mut self.options);
        self
    }
}
