//! Rule-based tasting: `taste_rules(bytes) -> [tag]`, a hand-rolled
//! byte-pattern rule engine. No YARA-family crate exists anywhere in the
//! dependency graph, so rules are a minimal tag/pattern pair compiled with
//! `regex::bytes`, one rule per file.

use std::path::Path;

use regex::bytes::Regex;
use serde::Deserialize;
use walkdir::WalkDir;

use crate::error::{Result, SieveError};
use crate::util::lstrip_ascii_whitespace;

#[derive(Deserialize)]
struct RuleFile {
    tag: String,
    pattern: String,
}

struct CompiledRule {
    tag: String,
    pattern: Regex,
}

/// A worker's immutable, pre-compiled rule set: built once at startup and
/// shared read-only afterward.
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    /// Recursively enumerates `*.toml` rule files under `root`, compiling
    /// each into a tag/regex pair. Any parse or compile failure is returned
    /// as [`SieveError::RuleCompile`] — fatal to worker startup.
    pub fn compile_dir(root: &Path) -> Result<Self> {
        let mut rules = Vec::new();
        let entries = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "toml"));
        for entry in entries {
            let path = entry.path();
            let text = std::fs::read_to_string(path)?;
            let parsed: RuleFile = toml::from_str(&text).map_err(|e| {
                SieveError::RuleCompile(format!("{}: {e}", path.display()))
            })?;
            let pattern = Regex::new(&parsed.pattern).map_err(|e| {
                SieveError::RuleCompile(format!("{}: {e}", path.display()))
            })?;
            rules.push(CompiledRule {
                tag: parsed.tag,
                pattern,
            });
        }
        Ok(Self { rules })
    }

    /// Builds an empty rule set (no tasting directory configured).
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Tastes `data` against every compiled rule, left-stripping ASCII
    /// whitespace first.
    pub fn taste(&self, data: &[u8]) -> Vec<String> {
        let stripped = lstrip_ascii_whitespace(data);
        self.rules
            .iter()
            .filter(|rule| rule.pattern.is_match(stripped))
            .map(|rule| rule.tag.clone())
            .collect()
    }
}
