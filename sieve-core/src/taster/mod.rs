//! Taster: classifies raw bytes into flavor tags, by content type and
//! by rule match. Both taste functions are pure on input bytes.

mod content_type;
mod rules;

use std::path::Path;

pub use content_type::ContentTyper;
pub use rules::RuleSet;

use crate::error::Result;

/// A worker's combined tasting capability: one libmagic cookie plus one
/// compiled rule set, both built once at startup and shared read-only
/// across every dispatched file.
pub struct Taster {
    content_typer: ContentTyper,
    rule_set: RuleSet,
}

impl Taster {
    /// Opens the content-type backend (`tasting.content_type_db`) and
    /// compiles the rule set rooted at `rules_dir`, if given. A missing
    /// `rules_dir` yields an empty rule set rather than an error —
    /// rule-based tasting is optional.
    pub fn open(content_type_db: Option<&Path>, rules_dir: Option<&Path>) -> Result<Self> {
        let content_typer = ContentTyper::open(content_type_db)?;
        let rule_set = match rules_dir {
            Some(dir) => RuleSet::compile_dir(dir)?,
            None => RuleSet::empty(),
        };
        Ok(Self {
            content_typer,
            rule_set,
        })
    }

    /// `taste_content_type(bytes) -> [tag]`: exactly one mime-string tag.
    pub fn taste_content_type(&self, data: &[u8]) -> Result<Vec<String>> {
        self.content_typer.taste(data)
    }

    /// `taste_rules(bytes) -> [tag]`: zero or more rule-matched tags.
    pub fn taste_rules(&self, data: &[u8]) -> Vec<String> {
        self.rule_set.taste(data)
    }
}
