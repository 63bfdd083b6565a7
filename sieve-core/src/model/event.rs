use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::file::FileId;
use super::scan_result::ScanResult;

/// Tree-position metadata embedded in every [`FileEvent`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TreeDict {
    pub node: String,
    pub parent: String,
    pub root: String,
}

/// The `file` half of a [`FileEvent`] record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileDict {
    pub depth: u32,
    pub name: Option<String>,
    pub flavors: BTreeMap<String, Vec<String>>,
    /// Assigned scanner names, in invocation order; must equal, in order,
    /// the keys present in the sibling `scan` map.
    pub scanners: Vec<String>,
    pub size: usize,
    pub source: String,
    pub tree: TreeDict,
}

/// One record in a request's event stream.
#[derive(Clone, Debug)]
pub struct FileEvent {
    pub file: FileDict,
    /// Keyed by scanner `key`, in assignment (priority) order.
    pub scan: IndexMap<String, ScanResult>,
}

impl FileEvent {
    pub fn tree_node_id(&self) -> &str {
        &self.file.tree.node
    }

    pub fn tree_parent_id(&self) -> &str {
        &self.file.tree.parent
    }
}

/// Computes the `tree` dict for a file within a request: at depth 0,
/// `node == root`; at depth 1, `parent == root`; otherwise both
/// are the file's own identity / its parent's identity.
pub fn tree_dict(file_id: FileId, parent: Option<FileId>, depth: u32, root_id: &str) -> TreeDict {
    let node = if depth == 0 {
        root_id.to_string()
    } else {
        file_id.to_string()
    };
    let parent = if depth == 1 {
        root_id.to_string()
    } else {
        parent.map(|p| p.to_string()).unwrap_or_default()
    };
    TreeDict {
        node,
        parent,
        root: root_id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_zero_node_is_root() {
        let t = tree_dict(FileId::new(), None, 0, "root-ptr");
        assert_eq!(t.node, "root-ptr");
        assert_eq!(t.root, "root-ptr");
    }

    #[test]
    fn depth_one_parent_is_root() {
        let fid = FileId::new();
        let t = tree_dict(fid, Some(FileId::new()), 1, "root-ptr");
        assert_eq!(t.parent, "root-ptr");
        assert_eq!(t.node, fid.to_string());
    }

    #[test]
    fn depth_two_uses_own_and_parent_identity() {
        let fid = FileId::new();
        let pid = FileId::new();
        let t = tree_dict(fid, Some(pid), 2, "root-ptr");
        assert_eq!(t.node, fid.to_string());
        assert_eq!(t.parent, pid.to_string());
    }
}
