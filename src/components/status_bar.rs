use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};

use crate::theme::ThemeColors;

const KEY_HINTS: &str = " /:filter  r:reload  ?:help  q:quit ";

/// Status bar showing the selected item, a summary, key hints, a transient
/// message, or the filter prompt.
pub struct StatusBarWidget<'a> {
    path_str: &'a str,
    info: &'a str,
    theme: &'a ThemeColors,
    status_message: Option<&'a str>,
    is_error: bool,
    filter_prompt: Option<&'a str>,
}

impl<'a> StatusBarWidget<'a> {
    pub fn new(path_str: &'a str, info: &'a str, theme: &'a ThemeColors) -> Self {
        Self {
            path_str,
            info,
            theme,
            status_message: None,
            is_error: false,
            filter_prompt: None,
        }
    }

    pub fn status_message(mut self, msg: &'a str, is_error: bool) -> Self {
        self.status_message = Some(msg);
        self.is_error = is_error;
        self
    }

    /// Show the filter being typed instead of the normal bar.
    pub fn filter_prompt(mut self, input: &'a str) -> Self {
        self.filter_prompt = Some(input);
        self
    }
}

/// Keep the last `budget` characters, marking the cut with `...`.
fn truncate_left(text: &str, budget: usize) -> String {
    let len = text.chars().count();
    if len <= budget {
        return text.to_string();
    }
    if budget <= 3 {
        return text.chars().take(budget).collect();
    }
    let tail: String = text.chars().skip(len - (budget - 3)).collect();
    format!("...{tail}")
}

fn pad_to_width(text: &str, width: usize) -> String {
    let truncated: String = text.chars().take(width).collect();
    format!("{truncated:<width$}")
}

impl<'a> Widget for StatusBarWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }

        let width = area.width as usize;
        let bar_style = Style::default().bg(self.theme.status_bg).fg(self.theme.status_fg);

        if let Some(input) = self.filter_prompt {
            let prompt = Span::styled(
                "Filter: ",
                bar_style.fg(self.theme.accent_fg).add_modifier(Modifier::BOLD),
            );
            let text = pad_to_width(input, width.saturating_sub(prompt.width()));
            let line = Line::from(vec![prompt, Span::styled(text, bar_style)]);
            buf.set_line(area.x, area.y, &line, area.width);
            return;
        }

        if let Some(msg) = self.status_message {
            let style = if self.is_error {
                Style::default()
                    .bg(self.theme.error_fg)
                    .fg(self.theme.status_bg)
            } else {
                bar_style.fg(self.theme.success_fg)
            };
            let line = Line::from(Span::styled(pad_to_width(msg, width), style));
            buf.set_line(area.x, area.y, &line, area.width);
            return;
        }

        // Normal bar: [path] [info] [key hints]
        let hints_len = KEY_HINTS.chars().count();
        let remaining = width.saturating_sub(hints_len);
        let info_len = self.info.chars().count().min(remaining);
        let path_budget = remaining.saturating_sub(info_len).saturating_sub(1);

        let path_display = truncate_left(self.path_str, path_budget);
        let info_display: String = self.info.chars().take(info_len).collect();
        let gap = remaining
            .saturating_sub(path_display.chars().count())
            .saturating_sub(info_display.chars().count());

        let mut spans = vec![
            Span::styled(path_display, bar_style),
            Span::styled(" ".repeat(gap), bar_style),
            Span::styled(info_display, bar_style.fg(self.theme.info_fg)),
        ];
        if width >= hints_len {
            spans.push(Span::styled(
                KEY_HINTS,
                bar_style.fg(self.theme.dim_fg).add_modifier(Modifier::DIM),
            ));
        }

        let line = Line::from(spans);
        buf.set_line(area.x, area.y, &line, area.width);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme;
    use ratatui::style::Color;

    fn render_to_string(widget: StatusBarWidget<'_>, width: u16) -> (Buffer, String) {
        let area = Rect::new(0, 0, width, 1);
        let mut buf = Buffer::empty(area);
        widget.render(area, &mut buf);
        let content = (0..width)
            .map(|x| buf.cell((x, 0)).unwrap().symbol().to_string())
            .collect();
        (buf, content)
    }

    #[test]
    fn test_status_message_success() {
        let tc = theme::dark_theme();
        let widget = StatusBarWidget::new("src/main.c", "12 items", &tc)
            .status_message("Reloaded: 12 items", false);
        let (buf, content) = render_to_string(widget, 80);
        assert!(content.contains("Reloaded: 12 items"));
        assert_eq!(buf.cell((0, 0)).unwrap().fg, Color::Rgb(166, 227, 161));
    }

    #[test]
    fn test_status_message_error() {
        let tc = theme::dark_theme();
        let widget = StatusBarWidget::new("src/main.c", "", &tc)
            .status_message("Reload failed: Invalid <bogus>", true);
        let (buf, content) = render_to_string(widget, 80);
        assert!(content.contains("Reload failed"));
        assert_eq!(buf.cell((0, 0)).unwrap().bg, Color::Rgb(243, 139, 168));
    }

    #[test]
    fn test_normal_bar_rendering() {
        let tc = theme::dark_theme();
        let widget = StatusBarWidget::new("src/lib/util.c", "7 items", &tc);
        let (_, content) = render_to_string(widget, 100);
        assert!(content.contains("src/lib/util.c"));
        assert!(content.contains("7 items"));
        assert!(content.contains("r:reload"));
    }

    #[test]
    fn test_long_path_is_truncated_from_the_left() {
        let tc = theme::dark_theme();
        let long = "a/".repeat(60) + "file.c";
        let widget = StatusBarWidget::new(&long, "1 item", &tc);
        let (_, content) = render_to_string(widget, 80);
        assert!(content.starts_with("..."));
        assert!(content.contains("file.c"));
    }

    #[test]
    fn test_filter_prompt() {
        let tc = theme::dark_theme();
        let widget = StatusBarWidget::new("x", "y", &tc).filter_prompt("*.rs");
        let (_, content) = render_to_string(widget, 40);
        assert!(content.starts_with("Filter: *.rs"));
        assert!(!content.contains("q:quit"));
    }

    #[test]
    fn test_zero_area_does_not_panic() {
        let tc = theme::dark_theme();
        let widget = StatusBarWidget::new("/path", "info", &tc);
        let area = Rect::new(0, 0, 0, 0);
        let mut buf = Buffer::empty(area);
        widget.render(area, &mut buf);
    }

    #[test]
    fn test_truncate_left() {
        assert_eq!(truncate_left("abcdef", 10), "abcdef");
        assert_eq!(truncate_left("abcdefghij", 6), "...hij");
        assert_eq!(truncate_left("abcdef", 2), "ab");
    }
}
