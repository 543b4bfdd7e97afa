use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Widget},
};

use vcode_project::project::{ProjectTree, VisibleItem};

use crate::theme::ThemeColors;

/// Tree widget that renders the visible project rows with box-drawing guides.
pub struct TreeWidget<'a> {
    tree: &'a ProjectTree,
    rows: &'a [VisibleItem],
    selected: usize,
    scroll_offset: usize,
    theme: &'a ThemeColors,
    use_icons: bool,
    block: Option<Block<'a>>,
}

impl<'a> TreeWidget<'a> {
    pub fn new(tree: &'a ProjectTree, rows: &'a [VisibleItem], theme: &'a ThemeColors) -> Self {
        Self {
            tree,
            rows,
            selected: 0,
            scroll_offset: 0,
            theme,
            use_icons: false,
            block: None,
        }
    }

    pub fn selected(mut self, selected: usize) -> Self {
        self.selected = selected;
        self
    }

    pub fn scroll_offset(mut self, scroll_offset: usize) -> Self {
        self.scroll_offset = scroll_offset;
        self
    }

    pub fn use_icons(mut self, use_icons: bool) -> Self {
        self.use_icons = use_icons;
        self
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }

    /// Indentation guides for `rows[index]`.
    ///
    /// Each ancestor level draws a continuation line unless that ancestor was
    /// the last of its siblings.
    fn build_prefix(rows: &[VisibleItem], index: usize) -> String {
        let row = &rows[index];
        if row.depth == 0 {
            return String::new();
        }

        let mut prefix = String::new();
        for depth in 1..row.depth {
            let ancestor_is_last = rows[..index]
                .iter()
                .rev()
                .take_while(|candidate| candidate.depth >= depth)
                .find(|candidate| candidate.depth == depth)
                .is_some_and(|ancestor| ancestor.is_last_sibling);
            prefix.push_str(if ancestor_is_last { "   " } else { "│  " });
        }
        prefix.push_str(if row.is_last_sibling { "└──" } else { "├──" });
        prefix
    }

    fn item_indicator(&self, row: &VisibleItem) -> &'static str {
        match (self.use_icons, row.is_group, row.is_open) {
            (true, true, true) => "\u{f115} ",
            (true, true, false) => "\u{f114} ",
            (true, false, _) => "\u{f15b} ",
            (false, true, true) => "[-] ",
            (false, true, false) => "[+] ",
            (false, false, _) => "",
        }
    }
}

impl<'a> Widget for TreeWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner_area = match &self.block {
            Some(block) => {
                let inner = block.inner(area);
                block.clone().render(area, buf);
                inner
            }
            None => area,
        };

        let visible_height = inner_area.height as usize;
        if self.rows.is_empty() || visible_height == 0 {
            return;
        }

        let visible = self
            .rows
            .iter()
            .enumerate()
            .skip(self.scroll_offset)
            .take(visible_height);

        for (line_no, (index, row)) in visible.enumerate() {
            let y = inner_area.y + line_no as u16;
            let prefix = Self::build_prefix(self.rows, index);
            let indicator = self.item_indicator(row);
            let title = self.tree[row.id].title();

            let style = if index == self.selected {
                Style::default()
                    .bg(self.theme.tree_selected_bg)
                    .fg(self.theme.tree_selected_fg)
                    .add_modifier(Modifier::BOLD)
            } else if row.is_group {
                Style::default()
                    .fg(self.theme.tree_group_fg)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(self.theme.tree_file_fg)
            };

            let line = Line::from(vec![
                Span::styled(prefix, Style::default().fg(self.theme.tree_guide_fg)),
                Span::styled(format!("{indicator}{title}"), style),
            ]);
            buf.set_line(inner_area.x, y, &line, inner_area.width);
        }
    }
}
