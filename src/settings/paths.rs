//! Virtual paths as written in settings files.
//!
//! Settings always separate segments with `/`, whatever the host uses. These
//! helpers normalise such paths and map them onto the host filesystem.

use std::path::{Path, PathBuf};

/// Segment separator used in settings files.
pub const VIRTUAL_SEP: char = '/';

/// Meaningful segments of a virtual path: empty and `.` segments are dropped.
pub fn segments(virtual_path: &str) -> impl Iterator<Item = &str> {
    virtual_path
        .split(VIRTUAL_SEP)
        .filter(|segment| !segment.is_empty() && *segment != ".")
}

/// Collapse repeated separators, drop `.` segments and any trailing
/// separator. A leading separator is kept.
pub fn normalize_virtual_path(virtual_path: &str) -> String {
    let body = segments(virtual_path).collect::<Vec<_>>().join("/");
    if virtual_path.starts_with(VIRTUAL_SEP) {
        format!("/{body}")
    } else {
        body
    }
}

/// Join two virtual paths and normalise the result.
pub fn join_virtual_path(base: &str, child: &str) -> String {
    if base.is_empty() {
        return normalize_virtual_path(child);
    }
    normalize_virtual_path(&format!("{base}{VIRTUAL_SEP}{child}"))
}

/// Host path of a declared path, relative to `root`.
pub fn resolve_declared_path(root: &Path, declared: &str) -> PathBuf {
    segments(declared).fold(root.to_path_buf(), |path, segment| path.join(segment))
}

/// Last meaningful segment, or `None` for paths like `.` or `/`.
pub fn base_name(declared: &str) -> Option<&str> {
    segments(declared).last()
}
