//! REPL transcript and input line

use super::{border_style, clamp_scroll};
use crate::interpreter::console::MockTerminal;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Padding, Paragraph},
    Frame,
};

/// Render the transcript with the pending input below it. `read_only` is set
/// while a past snapshot is on screen and statements cannot be entered.
pub fn render_terminal_pane(
    frame: &mut Frame,
    area: Rect,
    terminal: &MockTerminal,
    input: &str,
    read_only: bool,
    is_focused: bool,
    scroll_offset: &mut usize,
) {
    let block = Block::default()
        .title(" Terminal ")
        .borders(Borders::ALL)
        .border_style(border_style(is_focused))
        .padding(Padding::new(1, 0, 0, 0));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(inner);

    let lines = terminal.lines();
    let visible_height = rows[0].height.max(1) as usize;
    clamp_scroll(scroll_offset, lines.len(), visible_height);

    let items: Vec<ListItem> = lines
        .iter()
        .skip(*scroll_offset)
        .take(visible_height)
        .map(|line| {
            let color = if line.starts_with("> ") {
                DEFAULT_THEME.comment
            } else if line.starts_with("error: ") {
                DEFAULT_THEME.error
            } else {
                DEFAULT_THEME.fg
            };
            ListItem::new(line.as_str()).style(Style::default().fg(color))
        })
        .collect();
    frame.render_widget(List::new(items), rows[0]);

    let prompt = if read_only {
        Line::from(Span::styled(
            "(viewing history, Esc returns to the present)",
            Style::default().fg(DEFAULT_THEME.comment),
        ))
    } else {
        Line::from(vec![
            Span::styled(
                "> ",
                Style::default()
                    .fg(DEFAULT_THEME.success)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(input.to_string(), Style::default().fg(DEFAULT_THEME.fg)),
            Span::styled(
                "_",
                Style::default()
                    .fg(DEFAULT_THEME.fg)
                    .add_modifier(Modifier::SLOW_BLINK),
            ),
        ])
    };
    frame.render_widget(Paragraph::new(prompt), rows[1]);
}
