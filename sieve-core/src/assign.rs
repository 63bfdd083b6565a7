//! Assignment engine: matches a file's flavor set, name, and source
//! against a configured mapping table, producing an ordered list of
//! [`ScannerAssignment`].

use std::collections::BTreeMap;

use indexmap::IndexMap;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::model::ScannerAssignment;

/// One side (positive or negative) of a mapping rule.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RuleCondition {
    #[serde(default)]
    pub flavors: Vec<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

impl RuleCondition {
    fn is_empty(&self) -> bool {
        self.flavors.is_empty() && self.filename.is_none() && self.source.is_none()
    }

    fn matches(&self, flavor_set: &[String], name: Option<&str>, source: &str) -> bool {
        if self.flavors.iter().any(|f| f == "*" || flavor_set.iter().any(|t| t == f)) {
            return true;
        }
        if let Some(pattern) = &self.filename {
            if let (Ok(re), Some(name)) = (Regex::new(pattern), name) {
                if re.is_match(name) {
                    return true;
                }
            }
        }
        if let Some(pattern) = &self.source {
            if let Ok(re) = Regex::new(pattern) {
                if re.is_match(source) {
                    return true;
                }
            }
        }
        false
    }
}

/// One rule in a scanner's mapping-table entry.
#[derive(Clone, Debug, Deserialize)]
pub struct MappingRule {
    #[serde(default)]
    pub positive: RuleCondition,
    #[serde(default)]
    pub negative: RuleCondition,
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default)]
    pub options: BTreeMap<String, Value>,
}

fn default_priority() -> i32 {
    5
}

/// `scanners: { <ScannerName>: [ rule, rule, ... ] }`. Backed by an
/// [`IndexMap`] rather than a sorted map so equal-priority assignments
/// preserve the mapping table's own declaration order instead of
/// collapsing to alphabetical order by scanner name.
pub type MappingTable = IndexMap<String, Vec<MappingRule>>;

/// Evaluates `mapping_table` against one file's flavor set/name/source,
/// producing assignments in descending-priority order with configuration
/// order preserved on ties.
pub fn assign(
    flavor_set: &[String],
    name: Option<&str>,
    source: &str,
    mapping_table: &MappingTable,
) -> Vec<ScannerAssignment> {
    let mut assignments = Vec::new();

    for (scanner_name, rules) in mapping_table {
        for rule in rules {
            if !rule.negative.is_empty() && rule.negative.matches(flavor_set, name, source) {
                break;
            }
            if rule.positive.matches(flavor_set, name, source) {
                assignments.push(ScannerAssignment {
                    name: scanner_name.clone(),
                    priority: rule.priority,
                    options: rule.options.clone(),
                });
                break;
            }
        }
    }

    assignments.sort_by_key(|a| std::cmp::Reverse(a.priority));
    assignments
}
