//! In-memory project tree, its flattened index and the browser-facing view.

pub mod index;
pub mod tree;
pub mod view;

pub use index::FileIndex;
pub use tree::{FileEntry, GroupEntry, ItemKind, NodeId, ProjectTree, TreeItem};
pub use view::{visible_items, GroupView, MetaTable, ShellFilter, VisibleItem};
