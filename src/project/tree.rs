//! Project tree node model.
//!
//! The tree only cares about files. Directories and declared groups are both
//! kept as `Group` items; a `File` is always a leaf. Items live in an arena
//! owned by [`ProjectTree`] and refer to each other through [`NodeId`], so a
//! parent link is a plain index rather than an owning pointer.

use std::ops::Index;
use std::path::PathBuf;

use indexmap::IndexMap;

use crate::error::{ProjectError, Result};

/// Stable identity of an item within one [`ProjectTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the item in its tree's arena.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Leaf payload: one physical file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// The `/`-separated path as declared in the settings, relative to the
    /// project root.
    pub declared_path: String,
    /// Resolved host path.
    pub absolute_path: PathBuf,
}

/// Interior payload: children keyed by title, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct GroupEntry {
    children: IndexMap<String, NodeId>,
}

impl GroupEntry {
    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn child_by_index(&self, index: usize) -> Option<NodeId> {
        self.children.get_index(index).map(|(_, id)| *id)
    }

    pub fn child_by_title(&self, title: &str) -> Option<NodeId> {
        self.children.get(title).copied()
    }

    /// Children in display order.
    pub fn children(&self) -> impl DoubleEndedIterator<Item = NodeId> + ExactSizeIterator + '_ {
        self.children.values().copied()
    }
}

/// Variant part of a tree item.
#[derive(Debug, Clone)]
pub enum ItemKind {
    File(FileEntry),
    Group(GroupEntry),
}

/// A node of the project tree.
#[derive(Debug, Clone)]
pub struct TreeItem {
    title: String,
    depth: usize,
    parent: Option<NodeId>,
    kind: ItemKind,
}

impl TreeItem {
    /// Name displayed in the project browser.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Nesting level below the root (the root is 0).
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Back-reference to the owning group; `None` only for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn kind(&self) -> &ItemKind {
        &self.kind
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, ItemKind::Group(_))
    }

    pub fn as_file(&self) -> Option<&FileEntry> {
        match &self.kind {
            ItemKind::File(file) => Some(file),
            ItemKind::Group(_) => None,
        }
    }

    pub fn as_group(&self) -> Option<&GroupEntry> {
        match &self.kind {
            ItemKind::Group(group) => Some(group),
            ItemKind::File(_) => None,
        }
    }
}

/// Arena holding every item of one project, rooted at a single group.
#[derive(Debug, Clone)]
pub struct ProjectTree {
    items: Vec<TreeItem>,
}

impl ProjectTree {
    /// Create a tree containing only an empty root group.
    pub fn new(root_title: impl Into<String>) -> Self {
        Self {
            items: vec![TreeItem {
                title: root_title.into(),
                depth: 0,
                parent: None,
                kind: ItemKind::Group(GroupEntry::default()),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Total number of items, root included.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Always false: a tree has at least its root.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&TreeItem> {
        self.items.get(id.0)
    }

    /// Append a file to `parent`.
    pub fn add_file(
        &mut self,
        parent: NodeId,
        title: impl Into<String>,
        file: FileEntry,
    ) -> Result<NodeId> {
        self.insert(parent, title.into(), ItemKind::File(file))
    }

    /// Append an empty group to `parent`.
    pub fn add_group(&mut self, parent: NodeId, title: impl Into<String>) -> Result<NodeId> {
        self.insert(parent, title.into(), ItemKind::Group(GroupEntry::default()))
    }

    /// Titles are unique among siblings; a rejected insert leaves the tree
    /// untouched.
    fn insert(&mut self, parent: NodeId, title: String, kind: ItemKind) -> Result<NodeId> {
        let parent_item = &self[parent];
        let depth = match &parent_item.kind {
            ItemKind::Group(group) => {
                if group.children.contains_key(&title) {
                    return Err(ProjectError::DuplicateName {
                        title,
                        group: parent_item.title.clone(),
                    });
                }
                parent_item.depth + 1
            }
            ItemKind::File(_) => return Err(ProjectError::NotAGroup(parent_item.title.clone())),
        };

        let id = NodeId(self.items.len());
        self.items.push(TreeItem {
            title: title.clone(),
            depth,
            parent: Some(parent),
            kind,
        });
        if let ItemKind::Group(group) = &mut self.items[parent.0].kind {
            group.children.insert(title, id);
        }
        Ok(id)
    }

    /// Direct children of `id` in display order (empty for files).
    pub fn children(&self, id: NodeId) -> impl DoubleEndedIterator<Item = NodeId> + '_ {
        self[id]
            .as_group()
            .into_iter()
            .flat_map(|group| group.children())
    }

    pub fn child_by_index(&self, group: NodeId, index: usize) -> Option<NodeId> {
        self[group].as_group()?.child_by_index(index)
    }

    pub fn child_by_title(&self, group: NodeId, title: &str) -> Option<NodeId> {
        self[group].as_group()?.child_by_title(title)
    }

    /// Walk `start` and everything below it, depth-first pre-order.
    pub fn iter_recursive(&self, start: NodeId) -> PreOrder<'_> {
        PreOrder {
            tree: self,
            stack: vec![start],
        }
    }

    /// Titles from just below the root down to `id`.
    pub fn title_path(&self, id: NodeId) -> Vec<&str> {
        let mut path = Vec::new();
        let mut current = id;
        while let Some(parent) = self[current].parent {
            path.push(self[current].title.as_str());
            current = parent;
        }
        path.reverse();
        path
    }

    /// Inverse of [`title_path`](Self::title_path).
    pub fn find_by_title_path<I>(&self, path: I) -> Option<NodeId>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        path.into_iter()
            .try_fold(self.root(), |id, title| self.child_by_title(id, title.as_ref()))
    }
}

impl Index<NodeId> for ProjectTree {
    type Output = TreeItem;

    fn index(&self, id: NodeId) -> &TreeItem {
        &self.items[id.0]
    }
}

/// Pre-order traversal driven by an explicit stack.
pub struct PreOrder<'a> {
    tree: &'a ProjectTree,
    stack: Vec<NodeId>,
}

impl Iterator for PreOrder<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack.extend(self.tree.children(id).rev());
        Some(id)
    }
}
