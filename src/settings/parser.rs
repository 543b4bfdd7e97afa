use std::fs;
use std::path::{Path, PathBuf};

use globset::GlobBuilder;
use ignore::WalkBuilder;
use roxmltree::{Document, Node};
use tracing::{debug, info, warn};

use super::paths::{
    base_name, join_virtual_path, normalize_virtual_path, resolve_declared_path, segments,
};
use super::pattern::{resolve_exclude, ExcludePattern};
use crate::error::{ProjectError, Result};
use crate::project::tree::{FileEntry, NodeId, ProjectTree};

pub const FILES_TAG: &str = "files";
pub const GROUP_TAG: &str = "group";
pub const FILE_TAG: &str = "file";
pub const DIR_TAG: &str = "dir";
pub const FILESEARCH_TAG: &str = "filesearch";
pub use super::pattern::EXCLUDE_TAG;

/// Suffix of the settings fragments inside a project directory.
pub const SETTINGS_SUFFIX: &str = ".files.xml";
/// Suffix of a project directory name.
pub const PROJECT_DIR_SUFFIX: &str = ".vcode";

/// Elements that may only appear directly inside `<files>` or `<group>`.
const CONTAINER_CHILDREN: [&str; 4] = [GROUP_TAG, FILE_TAG, DIR_TAG, FILESEARCH_TAG];

/// One settings document held in memory until parsing.
struct SettingsSource {
    path: PathBuf,
    text: String,
}

/// Builds a project tree from one or more `<files>` documents.
///
/// Declared paths are resolved against `root_dir`. Fragments are merged
/// into one root group in file-name order.
pub struct FilesParser {
    root_dir: PathBuf,
    project_name: Option<String>,
    sources: Vec<SettingsSource>,
}

impl FilesParser {
    pub fn new(root_dir: impl Into<PathBuf>, project_name: Option<String>) -> Self {
        Self {
            root_dir: root_dir.into(),
            project_name,
            sources: Vec::new(),
        }
    }

    /// Parse a single settings document whose directory is the project root.
    pub fn from_file(path: &Path) -> Result<ProjectTree> {
        let path = fs::canonicalize(path).map_err(|e| ProjectError::io(path, e))?;
        let root_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("/"));
        let mut parser = Self::new(root_dir, None);
        parser.add_file(&path)?;
        parser.parse()
    }

    pub fn add_file(&mut self, path: &Path) -> Result<()> {
        let text = fs::read_to_string(path).map_err(|e| ProjectError::io(path, e))?;
        self.add_document(path, text);
        Ok(())
    }

    pub fn add_files<I, P>(&mut self, paths: I) -> Result<()>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        paths
            .into_iter()
            .try_for_each(|path| self.add_file(path.as_ref()))
    }

    /// Add an in-memory document; `name` is used for ordering and errors.
    pub fn add_document(&mut self, name: impl Into<PathBuf>, text: impl Into<String>) {
        self.sources.push(SettingsSource {
            path: name.into(),
            text: text.into(),
        });
    }

    /// Build the tree. Any error discards everything built so far.
    pub fn parse(&self) -> Result<ProjectTree> {
        let mut sources: Vec<&SettingsSource> = self.sources.iter().collect();
        sources.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));

        let documents = sources
            .iter()
            .map(|source| {
                let doc = Document::parse(&source.text).map_err(|e| ProjectError::Xml {
                    path: source.path.clone(),
                    source: e,
                })?;
                let root_tag = doc.root_element().tag_name().name();
                if root_tag != FILES_TAG {
                    return Err(ProjectError::structure(
                        root_tag,
                        format!(
                            "settings root must be <{FILES_TAG}> in {}",
                            source.path.display()
                        ),
                    ));
                }
                Ok(doc)
            })
            .collect::<Result<Vec<_>>>()?;

        let title = self.project_title(&documents);
        let mut builder = TreeBuilder {
            root_dir: &self.root_dir,
            tree: ProjectTree::new(title),
        };
        for doc in &documents {
            let files = doc.root_element();
            let exclude = resolve_exclude(files, None)?;
            let root = builder.tree.root();
            builder.parse_container(root, files, exclude.as_ref())?;
        }

        info!(
            root = %self.root_dir.display(),
            fragments = documents.len(),
            items = builder.tree.len(),
            "project tree built"
        );
        Ok(builder.tree)
    }

    fn project_title(&self, documents: &[Document<'_>]) -> String {
        self.project_name
            .clone()
            .or_else(|| {
                documents
                    .iter()
                    .find_map(|doc| doc.root_element().attribute("name"))
                    .map(str::to_string)
            })
            .or_else(|| {
                self.root_dir
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| "Project".to_string())
    }
}

struct TreeBuilder<'p> {
    root_dir: &'p Path,
    tree: ProjectTree,
}

impl TreeBuilder<'_> {
    fn parse_container(
        &mut self,
        group: NodeId,
        node: Node<'_, '_>,
        exclude: Option<&ExcludePattern>,
    ) -> Result<()> {
        for child in node.children().filter(Node::is_element) {
            match child.tag_name().name() {
                GROUP_TAG => self.parse_group_node(group, child, exclude)?,
                FILE_TAG => self.parse_file_node(group, child)?,
                DIR_TAG => self.parse_dir_node(group, child, exclude)?,
                FILESEARCH_TAG => self.parse_filesearch_node(group, child, exclude)?,
                EXCLUDE_TAG => {}
                other => {
                    return Err(ProjectError::structure(
                        other,
                        format!("unknown element inside <{}>", node.tag_name().name()),
                    ))
                }
            }
        }
        Ok(())
    }

    fn parse_group_node(
        &mut self,
        parent: NodeId,
        node: Node<'_, '_>,
        exclude: Option<&ExcludePattern>,
    ) -> Result<()> {
        let title = required_attribute(node, "title")?;
        let exclude = resolve_exclude(node, exclude)?;
        debug!(title, "group");
        let group = self.tree.add_group(parent, title)?;
        self.parse_container(group, node, exclude.as_ref())
    }

    fn parse_file_node(&mut self, parent: NodeId, node: Node<'_, '_>) -> Result<()> {
        check_leaf_children(node, &[])?;
        let declared = required_attribute(node, "path")?;
        let title = node.attribute("title").unwrap_or(declared);
        let absolute_path = resolve_declared_path(self.root_dir, declared);
        if !absolute_path.is_file() {
            return Err(ProjectError::PathResolution {
                path: absolute_path,
                reason: format!("<{FILE_TAG} path={declared:?}> is not an existing file"),
            });
        }

        debug!(title, path = declared, "file");
        self.tree.add_file(
            parent,
            title,
            FileEntry {
                declared_path: normalize_virtual_path(declared),
                absolute_path,
            },
        )?;
        Ok(())
    }

    fn parse_dir_node(
        &mut self,
        parent: NodeId,
        node: Node<'_, '_>,
        exclude: Option<&ExcludePattern>,
    ) -> Result<()> {
        check_leaf_children(node, &[EXCLUDE_TAG])?;
        let declared = required_attribute(node, "path")?;
        let exclude = resolve_exclude(node, exclude)?;
        let absolute_path = resolve_declared_path(self.root_dir, declared);
        if !absolute_path.is_dir() {
            return Err(ProjectError::PathResolution {
                path: absolute_path,
                reason: format!("<{DIR_TAG} path={declared:?}> is not an existing directory"),
            });
        }

        let title = node
            .attribute("title")
            .or_else(|| base_name(declared))
            .unwrap_or(declared);
        let group = self.tree.add_group(parent, title)?;
        self.scan_dir(
            group,
            absolute_path,
            normalize_virtual_path(declared),
            exclude.as_ref(),
        )
    }

    /// Mirror a physical directory below `group`.
    ///
    /// Entries are visited in file-name order rather than raw `read_dir`
    /// order, which differs between filesystems; the same directory always
    /// yields the same tree.
    ///
    /// Entries are checked against `exclude` by their declared relative path
    /// before anything else, so an excluded directory is never entered.
    /// Directory symlinks are followed unless they point back at an ancestor.
    fn scan_dir(
        &mut self,
        group: NodeId,
        dir: PathBuf,
        declared: String,
        exclude: Option<&ExcludePattern>,
    ) -> Result<()> {
        let ancestors = fs::canonicalize(&dir).into_iter().collect::<Vec<_>>();
        let mut stack = vec![DirFrame {
            group,
            dir,
            declared,
            ancestors,
        }];

        while let Some(frame) = stack.pop() {
            debug!(dir = %frame.dir.display(), "scanning");
            let mut entries = fs::read_dir(&frame.dir)
                .and_then(|dir| dir.collect::<std::io::Result<Vec<_>>>())
                .map_err(|e| ProjectError::io(&frame.dir, e))?;
            entries.sort_by_key(|entry| entry.file_name());

            for entry in entries {
                let name = entry.file_name().to_string_lossy().into_owned();
                let declared = join_virtual_path(&frame.declared, &name);
                if exclude.is_some_and(|pattern| pattern.is_match(&declared)) {
                    debug!(path = %declared, "excluded");
                    continue;
                }

                let path = entry.path();
                if path.is_dir() {
                    let canonical = fs::canonicalize(&path).ok();
                    if let Some(canonical) = &canonical {
                        if frame.ancestors.contains(canonical) {
                            warn!(path = %path.display(), "skipping directory cycle");
                            continue;
                        }
                    }
                    let child = self.tree.add_group(frame.group, name)?;
                    let mut ancestors = frame.ancestors.clone();
                    ancestors.extend(canonical);
                    stack.push(DirFrame {
                        group: child,
                        dir: path,
                        declared,
                        ancestors,
                    });
                } else {
                    self.tree.add_file(
                        frame.group,
                        name,
                        FileEntry {
                            declared_path: declared,
                            absolute_path: path,
                        },
                    )?;
                }
            }
        }
        Ok(())
    }

    /// Add every regular file under the project root matching the glob.
    fn parse_filesearch_node(
        &mut self,
        parent: NodeId,
        node: Node<'_, '_>,
        exclude: Option<&ExcludePattern>,
    ) -> Result<()> {
        check_leaf_children(node, &[EXCLUDE_TAG])?;
        let raw_pattern = required_attribute(node, "pattern")?;
        let exclude = resolve_exclude(node, exclude)?;
        let pattern = normalize_virtual_path(raw_pattern.trim_start_matches('/'));

        let matcher = GlobBuilder::new(&pattern)
            .literal_separator(true)
            .build()
            .map_err(|source| ProjectError::SearchPattern {
                pattern: raw_pattern.to_string(),
                source,
            })?
            .compile_matcher();

        let (base, depth) = literal_prefix(&pattern);
        let search_root = resolve_declared_path(self.root_dir, &base);
        let mut matches: Vec<(String, PathBuf)> = Vec::new();
        if search_root.is_dir() {
            let walker = WalkBuilder::new(&search_root)
                .standard_filters(false)
                .hidden(!segments(&pattern).any(|segment| segment.starts_with('.')))
                .max_depth(depth)
                .build();
            for result in walker {
                let entry = match result {
                    Ok(entry) => entry,
                    Err(err) => {
                        warn!(error = %err, "filesearch walk error");
                        continue;
                    }
                };
                if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                    continue;
                }
                let Some(declared) = virtual_relative(self.root_dir, entry.path()) else {
                    continue;
                };
                if matcher.is_match(&declared)
                    && hidden_components_allowed(&pattern, &declared)
                    && !exclude
                        .as_ref()
                        .is_some_and(|pattern| pattern.is_match(&declared))
                {
                    matches.push((declared, entry.into_path()));
                }
            }
        }
        matches.sort();

        debug!(pattern = raw_pattern, count = matches.len(), "filesearch");
        for (declared, absolute_path) in matches {
            let title = base_name(&declared).unwrap_or(declared.as_str()).to_string();
            self.tree.add_file(
                parent,
                title,
                FileEntry {
                    declared_path: declared,
                    absolute_path,
                },
            )?;
        }
        Ok(())
    }
}

struct DirFrame {
    group: NodeId,
    dir: PathBuf,
    declared: String,
    ancestors: Vec<PathBuf>,
}

fn required_attribute<'a>(node: Node<'a, '_>, name: &str) -> Result<&'a str> {
    node.attribute(name).ok_or_else(|| {
        ProjectError::structure(
            node.tag_name().name(),
            format!("missing required attribute {name:?}"),
        )
    })
}

/// `<file>`, `<dir>` and `<filesearch>` are leaves of the settings document;
/// only the tags in `allowed` may appear inside them.
fn check_leaf_children(node: Node<'_, '_>, allowed: &[&str]) -> Result<()> {
    let parent = node.tag_name().name();
    for child in node.children().filter(Node::is_element) {
        let tag = child.tag_name().name();
        if allowed.contains(&tag) {
            continue;
        }
        let reason = if CONTAINER_CHILDREN.contains(&tag) {
            format!("must be a direct child of <{GROUP_TAG}> or <{FILES_TAG}>, found inside <{parent}>")
        } else {
            format!("not allowed inside <{parent}>")
        };
        return Err(ProjectError::structure(tag, reason));
    }
    Ok(())
}

/// Split a glob into the literal directory it starts from and the walk depth
/// needed to reach its last segment (`None` when `**` makes it unbounded).
fn literal_prefix(pattern: &str) -> (String, Option<usize>) {
    let parts: Vec<&str> = segments(pattern).collect();
    let literal = parts
        .iter()
        .take_while(|part| !part.contains(['*', '?', '[', '{']))
        .count()
        .min(parts.len().saturating_sub(1));
    let depth = (!pattern.contains("**")).then(|| parts.len() - literal);
    (parts[..literal].join("/"), depth)
}

/// Wildcards never match a leading `.`: a hidden path component is only
/// accepted where the pattern segment it lines up with starts with `.`.
/// Components swallowed by `**` must not be hidden.
fn hidden_components_allowed(pattern: &str, declared: &str) -> bool {
    let pattern: Vec<&str> = segments(pattern).collect();
    let path: Vec<&str> = segments(declared).collect();
    let (head, tail) = match (
        pattern.iter().position(|segment| *segment == "**"),
        pattern.iter().rposition(|segment| *segment == "**"),
    ) {
        (Some(first), Some(last)) => (&pattern[..first], &pattern[last + 1..]),
        _ => (&pattern[..], &pattern[..0]),
    };

    path.iter().enumerate().all(|(i, component)| {
        if !component.starts_with('.') {
            return true;
        }
        let from_end = path.len() - i;
        let segment = if i < head.len() {
            Some(head[i])
        } else if from_end <= tail.len() {
            Some(tail[tail.len() - from_end])
        } else {
            None
        };
        segment.is_some_and(|segment| segment.starts_with('.'))
    })
}

fn virtual_relative(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    Some(
        relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"),
    )
}

/// A `<name>.vcode` project directory holding `*.files.xml` fragments.
///
/// The project root is the directory that contains the project directory.
#[derive(Debug, Clone)]
pub struct SettingsParser {
    project_dir: PathBuf,
    root_dir: PathBuf,
    project_name: String,
    settings_files: Vec<PathBuf>,
}

impl SettingsParser {
    pub fn open(project_dir: &Path) -> Result<Self> {
        let project_dir =
            fs::canonicalize(project_dir).map_err(|e| ProjectError::io(project_dir, e))?;
        let root_dir = project_dir
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| project_dir.clone());
        let dir_name = project_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let project_name = dir_name
            .strip_suffix(PROJECT_DIR_SUFFIX)
            .unwrap_or(&dir_name)
            .to_string();

        let mut settings_files = Vec::new();
        for entry in fs::read_dir(&project_dir).map_err(|e| ProjectError::io(&project_dir, e))? {
            let entry = entry.map_err(|e| ProjectError::io(&project_dir, e))?;
            let path = entry.path();
            let is_settings = entry
                .file_name()
                .to_string_lossy()
                .ends_with(SETTINGS_SUFFIX);
            if is_settings && path.is_file() {
                settings_files.push(path);
            }
        }
        if settings_files.is_empty() {
            return Err(ProjectError::NoSettings(project_dir));
        }
        settings_files.sort();

        Ok(Self {
            project_dir,
            root_dir,
            project_name,
            settings_files,
        })
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    pub fn settings_files(&self) -> &[PathBuf] {
        &self.settings_files
    }

    pub fn parse(&self) -> Result<ProjectTree> {
        let mut parser = FilesParser::new(&self.root_dir, Some(self.project_name.clone()));
        parser.add_files(&self.settings_files)?;
        parser.parse()
    }
}

/// Load a project from either a project directory or a single settings file.
pub fn load_project(path: &Path) -> Result<ProjectTree> {
    if path.is_dir() {
        SettingsParser::open(path)?.parse()
    } else {
        FilesParser::from_file(path)
    }
}
