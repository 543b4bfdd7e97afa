//! Project trees built from declarative `*.files.xml` settings.
//!
//! A settings document lists files, mirrored directories, glob searches and
//! virtual groups. [`settings`] turns one or more such documents into a
//! [`project::ProjectTree`]; [`project`] flattens it for display.

pub mod error;
pub mod project;
pub mod settings;

pub use error::{ProjectError, Result};
pub use project::{FileIndex, NodeId, ProjectTree};
pub use settings::{load_project, FilesParser, SettingsParser};
