//! # Rendering
//!
//! Draws the three-pane interface from [`App`] state: script list on the
//! left, two output panes, a status bar, and an optional help overlay.
//! Only state is read here (plus the wrapped-line caches); all mutation
//! happens in the controller.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
    Frame,
};

use super::ansi;
use super::app::App;
use super::layout::{ActivePane, MIN_TERMINAL_HEIGHT, MIN_TERMINAL_WIDTH, STATUS_BAR_HEIGHT};
use super::theme::Theme;

pub fn render(frame: &mut Frame, app: &mut App, theme: &Theme) {
    let area = frame.area();
    app.terminal_size = (area.width, area.height);

    if area.width < MIN_TERMINAL_WIDTH || area.height < MIN_TERMINAL_HEIGHT {
        render_too_small(frame, area, theme);
        return;
    }

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(STATUS_BAR_HEIGHT)])
        .split(area);

    let widths = app.layout.widths(area.width);
    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(widths.script_list),
            Constraint::Length(widths.output1),
            Constraint::Min(0),
        ])
        .split(vertical[0]);

    render_script_list(frame, app, theme, body[0]);
    render_output_pane(frame, app, theme, body[1], 0);
    render_output_pane(frame, app, theme, body[2], 1);
    render_status_bar(frame, app, theme, vertical[1]);

    if app.show_help {
        render_help(frame, theme, area);
    }
}

fn render_too_small(frame: &mut Frame, area: Rect, theme: &Theme) {
    let message = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(
            format!(
                "Terminal too small (minimum {MIN_TERMINAL_WIDTH}x{MIN_TERMINAL_HEIGHT} required)"
            ),
            Style::default().fg(theme.error),
        )),
    ]);
    frame.render_widget(message, area);
}

fn border_style(app: &App, pane: ActivePane, theme: &Theme) -> Style {
    if app.layout.active == pane {
        Style::default().fg(theme.border_active)
    } else {
        Style::default().fg(theme.fg_dim)
    }
}

fn render_script_list(frame: &mut Frame, app: &App, theme: &Theme, area: Rect) {
    let visible = app.visible_lines();
    let start = app.list_scroll.min(app.scripts.len());
    let end = (start + visible).min(app.scripts.len());

    let items: Vec<ListItem> = app.scripts[start..end]
        .iter()
        .enumerate()
        .map(|(offset, entry)| {
            let index = start + offset;
            if App::is_separator(entry) {
                let text = truncate(entry, area.width.saturating_sub(2).into());
                ListItem::new(text).style(Style::default().fg(theme.accent))
            } else {
                let name = base_name(entry);
                let text = truncate(
                    &format!("[{}] {}", index + 1, name),
                    area.width.saturating_sub(2).into(),
                );
                let style = if Some(index) == app.selected {
                    Style::default()
                        .fg(theme.selected_fg)
                        .bg(theme.selected_bg)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(theme.fg)
                };
                ListItem::new(text).style(style)
            }
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(Span::styled(" Scripts ", Style::default().fg(theme.accent)))
            .border_style(border_style(app, ActivePane::ScriptList, theme)),
    );
    frame.render_widget(list, area);
}

fn render_output_pane(frame: &mut Frame, app: &App, theme: &Theme, area: Rect, pane: usize) {
    let width = usize::from(area.width.saturating_sub(2));
    let visible = app.visible_lines();

    let scroll = app.panes[pane].scroll;
    let mut lines: Vec<Line> = Vec::with_capacity(visible);
    let mut skipped = 0usize;

    // Wrap lazily, skipping everything above the scroll offset and
    // stopping once the viewport is full.
    'outer: for raw in app.panes[pane].lines() {
        for wrapped in ansi::wrap_line(raw, width) {
            if skipped < scroll {
                skipped += 1;
                continue;
            }
            lines.push(ansi::styled_line(&wrapped));
            if lines.len() >= visible {
                break 'outer;
            }
        }
    }

    let active_pane = ActivePane::for_output(pane);
    let title = format!(" Output {} ", pane + 1);
    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(Span::styled(title, Style::default().fg(theme.accent)))
            .border_style(border_style(app, active_pane, theme)),
    );
    frame.render_widget(paragraph, area);
}

fn render_status_bar(frame: &mut Frame, app: &App, theme: &Theme, area: Rect) {
    let width = usize::from(area.width);
    let style = Style::default().fg(theme.status_fg).bg(theme.status_bg);

    // Compose the three sections into one padded row.
    let mut row: Vec<char> = vec![' '; width];
    place(&mut row, 1, &app.status.left);
    if !app.status.center.is_empty() {
        let center_start = width.saturating_sub(app.status.center.chars().count()) / 2;
        place(&mut row, center_start, &app.status.center);
    }
    if !app.status.right.is_empty() {
        let right_start = width
            .saturating_sub(app.status.right.chars().count())
            .saturating_sub(1);
        place(&mut row, right_start, &app.status.right);
    }

    let text: String = row.into_iter().collect();
    frame.render_widget(Paragraph::new(text).style(style), area);
}

fn place(row: &mut [char], start: usize, text: &str) {
    for (offset, c) in text.chars().enumerate() {
        if let Some(cell) = row.get_mut(start + offset) {
            *cell = c;
        }
    }
}

fn render_help(frame: &mut Frame, theme: &Theme, area: Rect) {
    let help_width = 60.min(area.width.saturating_sub(4));
    let help_height = 22.min(area.height.saturating_sub(4));
    let popup = Rect {
        x: (area.width - help_width) / 2,
        y: (area.height - help_height) / 2,
        width: help_width,
        height: help_height,
    };

    let text = vec![
        Line::from("Navigation:"),
        Line::from("  Up/k, Down/j   Move in script list"),
        Line::from("  Home/g, End/G  Jump to first / last script"),
        Line::from("  Tab            Cycle between output panes"),
        Line::from(""),
        Line::from("Execution:"),
        Line::from("  Enter          Run selection in the active pane"),
        Line::from("  Space          Run selection in the next idle pane"),
        Line::from("  Double-click   Run script in the active pane"),
        Line::from("  Ctrl+C / t     Terminate active pane's process"),
        Line::from("  r / F5         Refresh script list"),
        Line::from(""),
        Line::from("View:"),
        Line::from("  PageUp/Down    Scroll active output pane"),
        Line::from("  Mouse wheel    Scroll pane under cursor"),
        Line::from("  Ctrl+L         Clear active output pane"),
        Line::from(""),
        Line::from("Resize / application:"),
        Line::from("  Ctrl+Arrows      Resize active pane"),
        Line::from("  [ ] , .          Resize script list / output split"),
        Line::from("  Ctrl+R           Rebuild the interface"),
        Line::from("  F1/?  Ctrl+Q/Esc Toggle help / quit"),
    ];

    frame.render_widget(Clear, popup);
    let paragraph = Paragraph::new(text).style(Style::default().fg(theme.fg)).block(
        Block::default()
            .borders(Borders::ALL)
            .title(Span::styled(
                " Help - Keyboard Shortcuts ",
                Style::default().fg(theme.accent),
            ))
            .border_style(Style::default().fg(theme.accent)),
    );
    frame.render_widget(paragraph, popup);
}

fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("/a/b/script.sh"), "script.sh");
        assert_eq!(base_name("script.sh"), "script.sh");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a-much-longer-name", 10), "a-much-...");
    }
}
