use ratatui::{
    layout::{Constraint, Layout},
    style::Style,
    widgets::{Block, Borders},
    Frame,
};

use crate::app::{App, AppMode};
use crate::components::help::HelpOverlay;
use crate::components::status_bar::StatusBarWidget;
use crate::components::tree::TreeWidget;

/// Render the browser: tree panel, status bar and the help overlay on top.
pub fn render(app: &mut App, frame: &mut Frame) {
    let [tree_area, status_area] =
        Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(frame.area());

    // Keep the selected row visible inside the bordered panel.
    app.update_scroll(tree_area.height.saturating_sub(2) as usize);

    let title = format!(" {} ", app.tree[app.tree.root()].title());
    let border_fg = if app.mode == AppMode::Normal {
        app.theme.border_focused_fg
    } else {
        app.theme.border_fg
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_fg));
    let tree_widget = TreeWidget::new(&app.tree, &app.rows, &app.theme)
        .selected(app.selected_index)
        .scroll_offset(app.scroll_offset)
        .use_icons(app.use_icons)
        .block(block);
    frame.render_widget(tree_widget, tree_area);

    let selected_path = app
        .selected_row()
        .map(|row| match app.tree[row.id].as_file() {
            Some(file) => file.declared_path.clone(),
            None => app.tree.title_path(row.id).join("/"),
        })
        .unwrap_or_default();
    let info = match &app.filter {
        Some(filter) => format!("{} rows | filter: {filter}", app.rows.len()),
        None => format!("{} rows", app.rows.len()),
    };

    let mut status_bar = StatusBarWidget::new(&selected_path, &info, &app.theme);
    if app.mode == AppMode::Filter {
        status_bar = status_bar.filter_prompt(&app.filter_input.input);
    } else if let Some(msg) = &app.status_message {
        status_bar = status_bar.status_message(&msg.text, msg.is_error);
    }
    frame.render_widget(status_bar, status_area);

    if app.mode == AppMode::Filter {
        let prefix = "Filter: ".len() + app.filter_input.input[..app.filter_input.cursor_position]
            .chars()
            .count();
        frame.set_cursor_position((status_area.x + prefix as u16, status_area.y));
    }

    if app.mode == AppMode::Help {
        frame.render_widget(HelpOverlay::new(&app.theme, app.help_scroll), frame.area());
    }
}
