use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, AppMode};
use crate::components::help::HelpOverlay;

/// Handle a key event according to the current mode.
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.quit();
        return;
    }

    match app.mode {
        AppMode::Normal => handle_normal_mode(app, key),
        AppMode::Filter => handle_filter_mode(app, key),
        AppMode::Help => handle_help_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Char('j') | KeyCode::Down => app.select_next(),
        KeyCode::Char('k') | KeyCode::Up => app.select_previous(),
        KeyCode::Char('g') | KeyCode::Home => app.select_first(),
        KeyCode::Char('G') | KeyCode::End => app.select_last(),
        KeyCode::Enter if key.modifiers.contains(KeyModifiers::SHIFT) => {
            app.activate_selected(true)
        }
        KeyCode::Enter | KeyCode::Char('l') | KeyCode::Right => app.activate_selected(false),
        KeyCode::Char('O') => app.activate_selected(true),
        KeyCode::Char('h') | KeyCode::Left | KeyCode::Backspace => app.collapse_selected(),
        KeyCode::Char('/') => app.start_filter(),
        KeyCode::Esc => app.clear_filter(),
        KeyCode::Char('r') | KeyCode::F(5) => app.reload(),
        KeyCode::Char('?') => app.toggle_help(),
        _ => {}
    }
}

fn handle_filter_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => app.apply_filter_input(),
        KeyCode::Esc => app.cancel_filter_input(),
        KeyCode::Backspace => app.filter_input.delete_char(),
        KeyCode::Left => app.filter_input.move_left(),
        KeyCode::Right => app.filter_input.move_right(),
        KeyCode::Home => app.filter_input.home(),
        KeyCode::End => app.filter_input.end(),
        KeyCode::Char(c) => app.filter_input.insert_char(c),
        _ => {}
    }
}

fn handle_help_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('?') | KeyCode::Esc | KeyCode::Char('q') => app.toggle_help(),
        KeyCode::Char('j') | KeyCode::Down => {
            let max = HelpOverlay::total_lines().saturating_sub(1);
            app.help_scroll = (app.help_scroll + 1).min(max);
        }
        KeyCode::Char('k') | KeyCode::Up => app.help_scroll = app.help_scroll.saturating_sub(1),
        _ => {}
    }
}
