//! Browser-facing view of a project tree.
//!
//! The core tree carries no presentation state. A browser keeps its own
//! per-node state in a [`MetaTable`] and asks [`visible_items`] for the rows
//! to draw.

use std::collections::HashMap;

use regex::Regex;

use super::tree::{NodeId, ProjectTree, TreeItem};
use crate::error::{ProjectError, Result};
use crate::settings::pattern::translate_shell_pattern;

/// Side-table attaching owner-defined state to tree nodes.
///
/// Nodes without an entry read as `S::default()`.
#[derive(Debug, Clone)]
pub struct MetaTable<S> {
    entries: HashMap<NodeId, S>,
}

impl<S> Default for MetaTable<S> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<S: Default> MetaTable<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: NodeId) -> Option<&S> {
        self.entries.get(&id)
    }

    /// State of `id`, created with the default if missing.
    pub fn entry(&mut self, id: NodeId) -> &mut S {
        self.entries.entry(id).or_default()
    }

    pub fn remove(&mut self, id: NodeId) -> Option<S> {
        self.entries.remove(&id)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Per-group state kept by the browser.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupView {
    pub open: bool,
}

impl MetaTable<GroupView> {
    pub fn is_open(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|view| view.open)
    }

    pub fn set_open(&mut self, id: NodeId, open: bool) {
        self.entry(id).open = open;
    }

    /// Set `open` on `id` and every group below it.
    pub fn set_open_recursive(&mut self, tree: &ProjectTree, id: NodeId, open: bool) {
        for node in tree.iter_recursive(id) {
            if tree[node].is_group() {
                self.set_open(node, open);
            }
        }
    }

    /// Flip `id` (recursively when asked) and return its new state.
    pub fn toggle(&mut self, tree: &ProjectTree, id: NodeId, recursive: bool) -> bool {
        let open = !self.is_open(id);
        if recursive {
            self.set_open_recursive(tree, id, open);
        } else {
            self.set_open(id, open);
        }
        open
    }

    /// Title paths of every open group, for carrying state across a re-parse.
    pub fn open_title_paths(&self, tree: &ProjectTree) -> Vec<Vec<String>> {
        tree.iter_recursive(tree.root())
            .filter(|&id| tree[id].is_group() && self.is_open(id))
            .map(|id| {
                tree.title_path(id)
                    .into_iter()
                    .map(str::to_string)
                    .collect()
            })
            .collect()
    }

    /// Rebuild open state for `tree` from title paths. Paths that no longer
    /// exist are ignored.
    pub fn from_title_paths(tree: &ProjectTree, paths: &[Vec<String>]) -> Self {
        let mut table = Self::new();
        for path in paths {
            if let Some(id) = tree.find_by_title_path(path) {
                if tree[id].is_group() {
                    table.set_open(id, true);
                }
            }
        }
        table
    }
}

/// One row of the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleItem {
    pub id: NodeId,
    pub depth: usize,
    pub is_group: bool,
    pub is_open: bool,
    /// Last row among the visible children of its parent.
    pub is_last_sibling: bool,
}

/// Visible rows below and including `tree.root()`, in pre-order.
///
/// The root is always shown. Children of closed groups are skipped. Files
/// are kept only when `keep_file` accepts them; groups are never filtered.
pub fn visible_items<O, F>(tree: &ProjectTree, is_open: O, keep_file: F) -> Vec<VisibleItem>
where
    O: Fn(NodeId) -> bool,
    F: Fn(&TreeItem) -> bool,
{
    let mut rows = Vec::new();
    push_visible(tree, tree.root(), true, &is_open, &keep_file, &mut rows);
    rows
}

fn push_visible<O, F>(
    tree: &ProjectTree,
    id: NodeId,
    is_last: bool,
    is_open: &O,
    keep_file: &F,
    rows: &mut Vec<VisibleItem>,
) where
    O: Fn(NodeId) -> bool,
    F: Fn(&TreeItem) -> bool,
{
    let item = &tree[id];
    let open = item.is_group() && is_open(id);
    rows.push(VisibleItem {
        id,
        depth: item.depth(),
        is_group: item.is_group(),
        is_open: open,
        is_last_sibling: is_last,
    });
    if !open {
        return;
    }

    let children: Vec<NodeId> = tree
        .children(id)
        .filter(|&child| tree[child].is_group() || keep_file(&tree[child]))
        .collect();
    for (i, &child) in children.iter().enumerate() {
        push_visible(tree, child, i + 1 == children.len(), is_open, keep_file, rows);
    }
}

/// File filter made of shell globs; a file passes when any glob matches its
/// title or its declared path.
#[derive(Debug, Clone)]
pub struct ShellFilter {
    patterns: Vec<String>,
    regex: Regex,
}

impl ShellFilter {
    /// `None` when no pattern is given, meaning "let everything through".
    pub fn new<I>(patterns: I) -> Result<Option<Self>>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let patterns: Vec<String> = patterns
            .into_iter()
            .map(|pattern| pattern.as_ref().trim().to_string())
            .filter(|pattern| !pattern.is_empty())
            .collect();
        if patterns.is_empty() {
            return Ok(None);
        }

        let alternation = patterns
            .iter()
            .map(|pattern| format!("(?:{})", translate_shell_pattern(pattern)))
            .collect::<Vec<_>>()
            .join("|");
        let source = format!("^(?:{alternation})$");
        let regex = Regex::new(&source).map_err(|source| ProjectError::Pattern {
            pattern: patterns.join(" "),
            source,
        })?;
        Ok(Some(Self { patterns, regex }))
    }

    /// Whitespace-separated globs, as typed by a user.
    pub fn parse(input: &str) -> Result<Option<Self>> {
        Self::new(input.split_whitespace())
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn lets_through(&self, item: &TreeItem) -> bool {
        match item.as_file() {
            Some(file) => {
                self.regex.is_match(item.title()) || self.regex.is_match(&file.declared_path)
            }
            None => true,
        }
    }
}

impl std::fmt::Display for ShellFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.patterns.join(" "))
    }
}

/// Plain-text row: `| ` per depth level, then `|~title/` for an open group,
/// `|+title/` for a closed one and `|-title` for a file.
pub fn format_list_row(tree: &ProjectTree, row: &VisibleItem) -> String {
    let title = tree[row.id].title();
    let prefix = "| ".repeat(row.depth);
    match (row.is_group, row.is_open) {
        (true, true) => format!("{prefix}|~{title}/"),
        (true, false) => format!("{prefix}|+{title}/"),
        (false, _) => format!("{prefix}|-{title}"),
    }
}

pub fn render_list(tree: &ProjectTree, rows: &[VisibleItem]) -> Vec<String> {
    rows.iter().map(|row| format_list_row(tree, row)).collect()
}
