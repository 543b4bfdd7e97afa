//! Construction of a project tree from `<files>` settings documents.

pub mod parser;
pub mod paths;
pub mod pattern;

pub use parser::{load_project, FilesParser, SettingsParser};
pub use pattern::{resolve_exclude, ExcludePattern, PatternCompiler, PatternParser};
