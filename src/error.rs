use std::path::PathBuf;

use thiserror::Error;

/// Result type for project parsing and tree operations.
pub type Result<T> = std::result::Result<T, ProjectError>;

/// Result type for the browser binary.
pub type AppResult<T> = std::result::Result<T, AppError>;

/// Failures while building a project tree from settings documents.
///
/// Any of these aborts the whole parse; no partial tree is ever returned.
#[derive(Debug, Error)]
pub enum ProjectError {
    /// Two children of the same group share a title.
    #[error("Duplicate title {title:?} in group {group:?}")]
    DuplicateName { title: String, group: String },

    /// A settings element is malformed or appears where it is not allowed.
    #[error("Invalid <{tag}>: {reason}")]
    Structure { tag: String, reason: String },

    /// A `<pyregex>` token failed to compile.
    #[error("Invalid exclude pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A `<filesearch>` glob failed to compile.
    #[error("Invalid search pattern {pattern:?}: {source}")]
    SearchPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    /// A declared path does not resolve to what its element requires.
    #[error("Cannot resolve {}: {reason}", path.display())]
    PathResolution { path: PathBuf, reason: String },

    /// A settings document is not well-formed XML.
    #[error("Malformed settings file {}: {source}", path.display())]
    Xml {
        path: PathBuf,
        #[source]
        source: roxmltree::Error,
    },

    /// I/O failure while reading a settings file or listing a directory.
    #[error("I/O error for {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A project directory holds no `*.files.xml` documents.
    #[error("No settings files found in {}", .0.display())]
    NoSettings(PathBuf),

    /// Children can only be attached to groups.
    #[error("Cannot add children to file {0:?}")]
    NotAGroup(String),
}

impl ProjectError {
    pub(crate) fn structure(tag: &str, reason: impl Into<String>) -> Self {
        Self::Structure {
            tag: tag.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Application error types for the browser binary.
#[derive(Debug, Error)]
pub enum AppError {
    /// I/O errors from the terminal or log file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Terminal initialization or rendering errors.
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// Invalid path provided by the user.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// The project could not be loaded.
    #[error(transparent)]
    Project(#[from] ProjectError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let app_err: AppError = io_err.into();
        assert!(matches!(app_err, AppError::Io(_)));
        assert!(app_err.to_string().contains("file not found"));
    }

    #[test]
    fn terminal_error_display() {
        let err = AppError::Terminal("failed to enter raw mode".into());
        assert_eq!(err.to_string(), "Terminal error: failed to enter raw mode");
    }

    #[test]
    fn duplicate_name_mentions_title() {
        let err = ProjectError::DuplicateName {
            title: "A".into(),
            group: "G".into(),
        };
        assert_eq!(err.to_string(), "Duplicate title \"A\" in group \"G\"");
    }

    #[test]
    fn structure_error_names_tag() {
        let err = ProjectError::structure("file", "must be a direct child of a group");
        assert_eq!(
            err.to_string(),
            "Invalid <file>: must be a direct child of a group"
        );
    }

    #[test]
    fn project_error_is_transparent_in_app_error() {
        let err: AppError = ProjectError::NotAGroup("a.txt".into()).into();
        assert_eq!(err.to_string(), "Cannot add children to file \"a.txt\"");
    }
}
