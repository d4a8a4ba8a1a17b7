//! Hierarchy Builder
//!
//! Derives a directory-like tree from the flat record set's file paths.
//! The tree is rebuilt from scratch on every read and never mutated in place.
//! Records without a path are placed at the root, named by their title.

use crate::store::Record;
use crate::types::RecordID;
use serde::Serialize;
use std::collections::BTreeMap;

/// Directory node representation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryNode {
    pub name: String,
    /// Slash-joined path from the root
    pub path: String,
    pub children: Vec<HierarchyNode>,
}

/// Leaf node referencing a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeafNode {
    pub name: String,
    pub record_id: RecordID,
}

/// Hierarchy node type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum HierarchyNode {
    Directory(DirectoryNode),
    Leaf(LeafNode),
}

impl HierarchyNode {
    pub fn name(&self) -> &str {
        match self {
            HierarchyNode::Directory(d) => &d.name,
            HierarchyNode::Leaf(l) => &l.name,
        }
    }

    /// Record id for leaves, None for directories
    pub fn record_id(&self) -> Option<&str> {
        match self {
            HierarchyNode::Directory(_) => None,
            HierarchyNode::Leaf(l) => Some(&l.record_id),
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, HierarchyNode::Directory(_))
    }

    /// Number of leaves at or below this node
    pub fn leaf_count(&self) -> usize {
        match self {
            HierarchyNode::Directory(d) => d.children.iter().map(|c| c.leaf_count()).sum(),
            HierarchyNode::Leaf(_) => 1,
        }
    }

    /// Depth-first search for the leaf referencing `record_id`
    pub fn find_leaf(&self, record_id: &str) -> Option<&LeafNode> {
        match self {
            HierarchyNode::Leaf(l) if l.record_id == record_id => Some(l),
            HierarchyNode::Leaf(_) => None,
            HierarchyNode::Directory(d) => d.children.iter().find_map(|c| c.find_leaf(record_id)),
        }
    }
}

#[derive(Default)]
struct DirBuilder {
    dirs: BTreeMap<String, DirBuilder>,
    leaves: Vec<LeafNode>,
}

impl DirBuilder {
    fn into_nodes(self, prefix: &str) -> Vec<HierarchyNode> {
        let mut nodes: Vec<HierarchyNode> = self
            .dirs
            .into_iter()
            .map(|(name, builder)| {
                let path = if prefix.is_empty() {
                    name.clone()
                } else {
                    format!("{}/{}", prefix, name)
                };
                let children = builder.into_nodes(&path);
                HierarchyNode::Directory(DirectoryNode {
                    name,
                    path,
                    children,
                })
            })
            .chain(self.leaves.into_iter().map(HierarchyNode::Leaf))
            .collect();
        nodes.sort_by(|a, b| {
            b.is_directory()
                .cmp(&a.is_directory())
                .then_with(|| a.name().to_lowercase().cmp(&b.name().to_lowercase()))
                .then_with(|| a.name().cmp(b.name()))
                .then_with(|| a.record_id().cmp(&b.record_id()))
        });
        nodes
    }
}

fn split_path(path: &str) -> Vec<&str> {
    path.split(['/', '\\'])
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != ".")
        .collect()
}

/// Build the hierarchy for a record set. Pure function of its input.
pub fn build<'a, I>(records: I) -> Vec<HierarchyNode>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut root = DirBuilder::default();
    for record in records {
        let segments = record.path.as_deref().map(split_path).unwrap_or_default();
        let Some((leaf_name, dirs)) = segments.split_last() else {
            root.leaves.push(LeafNode {
                name: record.title.clone(),
                record_id: record.id.clone(),
            });
            continue;
        };
        let mut current = &mut root;
        for dir in dirs {
            current = current.dirs.entry((*dir).to_string()).or_default();
        }
        current.leaves.push(LeafNode {
            name: (*leaf_name).to_string(),
            record_id: record.id.clone(),
        });
    }
    root.into_nodes("")
}
