use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{info, warn};
use vcode_project::error::AppResult;
use vcode_project::project::{
    visible_items, GroupView, MetaTable, NodeId, ProjectTree, ShellFilter, VisibleItem,
};
use vcode_project::settings::load_project;

use crate::config::AppConfig;
use crate::theme::{resolve_theme, ThemeColors};

/// Application mode.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    #[default]
    Normal,
    /// Editing the file filter in the status line.
    Filter,
    Help,
}

/// Text input with a byte-offset cursor kept on a char boundary.
#[derive(Debug, Default)]
pub struct InputState {
    pub input: String,
    pub cursor_position: usize,
}

impl InputState {
    fn with_text(text: String) -> Self {
        Self {
            cursor_position: text.len(),
            input: text,
        }
    }

    pub fn insert_char(&mut self, c: char) {
        self.input.insert(self.cursor_position, c);
        self.cursor_position += c.len_utf8();
    }

    /// Delete the character before the cursor (backspace).
    pub fn delete_char(&mut self) {
        if let Some(prev) = self.input[..self.cursor_position].chars().next_back() {
            self.cursor_position -= prev.len_utf8();
            self.input.remove(self.cursor_position);
        }
    }

    pub fn move_left(&mut self) {
        if let Some(prev) = self.input[..self.cursor_position].chars().next_back() {
            self.cursor_position -= prev.len_utf8();
        }
    }

    pub fn move_right(&mut self) {
        if let Some(next) = self.input[self.cursor_position..].chars().next() {
            self.cursor_position += next.len_utf8();
        }
    }

    pub fn home(&mut self) {
        self.cursor_position = 0;
    }

    pub fn end(&mut self) {
        self.cursor_position = self.input.len();
    }
}

/// A transient message shown in the status bar.
#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub text: String,
    pub is_error: bool,
    pub created: Instant,
}

/// Main application state.
pub struct App {
    /// Project directory or settings file the tree was parsed from.
    pub source: PathBuf,
    pub tree: ProjectTree,
    pub open_state: MetaTable<GroupView>,
    pub filter: Option<ShellFilter>,
    pub rows: Vec<VisibleItem>,
    pub selected_index: usize,
    pub scroll_offset: usize,
    pub mode: AppMode,
    pub filter_input: InputState,
    pub help_scroll: usize,
    pub status_message: Option<StatusMessage>,
    pub theme: ThemeColors,
    pub use_icons: bool,
    pub should_quit: bool,
    /// Absolute path of the file picked by the user, printed on exit.
    pub chosen: Option<PathBuf>,
}

impl App {
    /// Create the browser over an already parsed tree.
    pub fn new(source: &Path, tree: ProjectTree, config: &AppConfig) -> AppResult<Self> {
        let filter = ShellFilter::new(config.filter())?;
        let mut open_state = MetaTable::new();
        if config.expand_all() {
            open_state.set_open_recursive(&tree, tree.root(), true);
        } else {
            open_state.set_open(tree.root(), true);
        }

        let mut app = Self {
            source: source.to_path_buf(),
            tree,
            open_state,
            filter,
            rows: Vec::new(),
            selected_index: 0,
            scroll_offset: 0,
            mode: AppMode::Normal,
            filter_input: InputState::default(),
            help_scroll: 0,
            status_message: None,
            theme: resolve_theme(&config.theme),
            use_icons: config.use_icons(),
            should_quit: false,
            chosen: None,
        };
        app.refresh_rows();
        Ok(app)
    }

    /// Recompute the visible rows and clamp the selection.
    pub fn refresh_rows(&mut self) {
        let open_state = &self.open_state;
        let filter = self.filter.as_ref();
        self.rows = visible_items(
            &self.tree,
            |id| open_state.is_open(id),
            |item| filter.map_or(true, |f| f.lets_through(item)),
        );
        if self.selected_index >= self.rows.len() {
            self.selected_index = self.rows.len().saturating_sub(1);
        }
    }

    pub fn selected_row(&self) -> Option<&VisibleItem> {
        self.rows.get(self.selected_index)
    }

    fn select_id(&mut self, id: NodeId) {
        if let Some(index) = self.rows.iter().position(|row| row.id == id) {
            self.selected_index = index;
        }
    }

    pub fn set_status_message(&mut self, msg: impl Into<String>) {
        self.status_message = Some(StatusMessage {
            text: msg.into(),
            is_error: false,
            created: Instant::now(),
        });
    }

    pub fn set_error_message(&mut self, msg: impl Into<String>) {
        self.status_message = Some(StatusMessage {
            text: msg.into(),
            is_error: true,
            created: Instant::now(),
        });
    }

    /// Clear the status message once it has been shown for more than 3 seconds.
    /// Errors stay until replaced.
    pub fn clear_expired_status(&mut self) {
        if let Some(msg) = &self.status_message {
            if !msg.is_error && msg.created.elapsed().as_secs() > 3 {
                self.status_message = None;
            }
        }
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    // ── Navigation ──────────────────────────────────────────────────────────

    pub fn select_next(&mut self) {
        if self.selected_index + 1 < self.rows.len() {
            self.selected_index += 1;
        }
    }

    pub fn select_previous(&mut self) {
        self.selected_index = self.selected_index.saturating_sub(1);
    }

    pub fn select_first(&mut self) {
        self.selected_index = 0;
    }

    pub fn select_last(&mut self) {
        self.selected_index = self.rows.len().saturating_sub(1);
    }

    /// Keep the selected row inside a viewport of `visible_height` rows.
    pub fn update_scroll(&mut self, visible_height: usize) {
        if visible_height == 0 {
            return;
        }
        if self.selected_index < self.scroll_offset {
            self.scroll_offset = self.selected_index;
        } else if self.selected_index >= self.scroll_offset + visible_height {
            self.scroll_offset = self.selected_index - visible_height + 1;
        }
    }

    /// Toggle the selected group, or pick the selected file and quit.
    pub fn activate_selected(&mut self, recursive: bool) {
        let Some(row) = self.selected_row().copied() else {
            return;
        };
        if row.is_group {
            self.open_state.toggle(&self.tree, row.id, recursive);
            self.refresh_rows();
            self.select_id(row.id);
        } else if let Some(file) = self.tree[row.id].as_file() {
            info!(path = %file.absolute_path.display(), "file picked");
            self.chosen = Some(file.absolute_path.clone());
            self.quit();
        }
    }

    /// Close the selected group, or jump to the parent of a file or closed group.
    pub fn collapse_selected(&mut self) {
        let Some(row) = self.selected_row().copied() else {
            return;
        };
        if row.is_group && row.is_open {
            self.open_state.set_open(row.id, false);
            self.refresh_rows();
            self.select_id(row.id);
        } else if let Some(parent) = self.tree[row.id].parent() {
            self.select_id(parent);
        }
    }

    // ── Filter ──────────────────────────────────────────────────────────────

    /// Enter filter mode with the current filter as initial text.
    pub fn start_filter(&mut self) {
        let current = self
            .filter
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        self.filter_input = InputState::with_text(current);
        self.mode = AppMode::Filter;
    }

    pub fn cancel_filter_input(&mut self) {
        self.filter_input = InputState::default();
        self.mode = AppMode::Normal;
    }

    /// Parse the typed globs and apply them. Invalid input keeps the
    /// previous filter and stays in filter mode.
    pub fn apply_filter_input(&mut self) {
        match ShellFilter::parse(&self.filter_input.input) {
            Ok(filter) => {
                self.filter = filter;
                self.mode = AppMode::Normal;
                self.refresh_rows();
                match &self.filter {
                    Some(f) => self.set_status_message(format!("Filter: {f}")),
                    None => self.set_status_message("Filter cleared"),
                }
            }
            Err(e) => self.set_error_message(e.to_string()),
        }
    }

    pub fn clear_filter(&mut self) {
        if self.filter.take().is_some() {
            self.refresh_rows();
            self.set_status_message("Filter cleared");
        }
    }

    // ── Help ────────────────────────────────────────────────────────────────

    pub fn toggle_help(&mut self) {
        self.mode = if self.mode == AppMode::Help {
            AppMode::Normal
        } else {
            self.help_scroll = 0;
            AppMode::Help
        };
    }

    // ── Reload ──────────────────────────────────────────────────────────────

    /// Re-parse the settings from scratch.
    ///
    /// Open groups and the selection are carried over by title path. On
    /// failure the current tree stays and the error is shown.
    pub fn reload(&mut self) {
        match load_project(&self.source) {
            Ok(tree) => self.replace_tree(tree),
            Err(e) => {
                warn!(error = %e, "reload failed");
                self.set_error_message(format!("Reload failed: {e}"));
            }
        }
    }

    fn replace_tree(&mut self, tree: ProjectTree) {
        let open_paths = self.open_state.open_title_paths(&self.tree);
        let selected: Option<Vec<String>> = self.selected_row().map(|row| {
            self.tree
                .title_path(row.id)
                .into_iter()
                .map(str::to_string)
                .collect()
        });

        self.open_state = MetaTable::from_title_paths(&tree, &open_paths);
        self.open_state.set_open(tree.root(), true);
        self.tree = tree;
        self.refresh_rows();
        if let Some(id) = selected.and_then(|path| self.tree.find_by_title_path(&path)) {
            self.select_id(id);
        }
        self.set_status_message(format!("Reloaded: {} items", self.tree.len()));
    }
}
