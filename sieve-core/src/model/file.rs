use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies a [`File`] uniquely within a worker process.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct FileId(pub Uuid);

impl FileId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FileId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One node in a request's decomposition tree.
///
/// Constructed fresh for the root request and for every child a scanner
/// extracts; local to the request that produced it, with no identity
/// carried across requests.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct File {
    pub id: FileId,
    /// Opaque handle naming this file's bytes in the blob store. At the
    /// root it equals the request id; for extracted children it defaults
    /// to `id`.
    pub pointer: String,
    pub depth: u32,
    pub parent: Option<FileId>,
    pub name: Option<String>,
    /// Name of the scanner that produced this file; empty at root.
    pub source: String,
    /// Per-source-of-flavor tag sets (`external`, `content-type`, `rule`, …).
    pub flavors: BTreeMap<String, Vec<String>>,
}

impl File {
    /// Constructs the root file for a request: `pointer` is the request id,
    /// `depth` is 0, `parent`/`source` are empty.
    pub fn root(pointer: impl Into<String>) -> Self {
        Self {
            id: FileId::new(),
            pointer: pointer.into(),
            depth: 0,
            parent: None,
            name: None,
            source: String::new(),
            flavors: BTreeMap::new(),
        }
    }

    /// Constructs a child file produced by `source`. `pointer` defaults to
    /// the new file's own identity when not supplied by the caller.
    pub fn child(source: impl Into<String>) -> Self {
        let id = FileId::new();
        Self {
            pointer: id.to_string(),
            id,
            depth: 0,
            parent: None,
            name: None,
            source: source.into(),
            flavors: BTreeMap::new(),
        }
    }

    pub fn with_pointer(mut self, pointer: impl Into<String>) -> Self {
        self.pointer = pointer.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Merges a per-source flavor set into this file's flavors. New values
    /// overwrite under duplicate source keys.
    pub fn add_flavors(&mut self, source: impl Into<String>, tags: Vec<String>) {
        self.flavors.insert(source.into(), tags);
    }

    /// Flattens `flavors` into the single routing set consumed by the
    /// assignment engine: `external ∪ content-type ∪ rule`.
    pub fn flavor_set(&self) -> Vec<String> {
        let mut out = Vec::new();
        for key in ["external", "content-type", "rule"] {
            if let Some(tags) = self.flavors.get(key) {
                out.extend(tags.iter().cloned());
            }
        }
        out
    }

    /// `depth == 0` at root, never otherwise.
    pub fn is_root(&self) -> bool {
        self.depth == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_has_empty_parent_and_source() {
        let f = File::root("req-1");
        assert!(f.parent.is_none());
        assert_eq!(f.source, "");
        assert_eq!(f.depth, 0);
        assert_eq!(f.pointer, "req-1");
    }

    #[test]
    fn child_pointer_defaults_to_identity() {
        let f = File::child("Base64");
        assert_eq!(f.pointer, f.id.to_string());
        assert_eq!(f.source, "Base64");
    }

    #[test]
    fn add_flavors_overwrites_duplicate_source() {
        let mut f = File::root("p");
        f.add_flavors("rule", vec!["a".into()]);
        f.add_flavors("rule", vec!["b".into(), "c".into()]);
        assert_eq!(f.flavors["rule"], vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn flavor_set_flattens_in_fixed_order() {
        let mut f = File::root("p");
        f.add_flavors("rule", vec!["r1".into()]);
        f.add_flavors("external", vec!["e1".into()]);
        f.add_flavors("content-type", vec!["text/plain".into()]);
        assert_eq!(
            f.flavor_set(),
            vec!["e1".to_string(), "text/plain".to_string(), "r1".to_string()]
        );
    }
}
