//! Status bar rendering with history position, settings and keybindings

use crate::memory::codec::Endianness;
use crate::symbols::AllocationPolicy;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

/// Data needed to render the status bar
pub struct StatusRenderData<'a> {
    pub message: &'a str,
    pub is_error: bool,
    /// Snapshot on screen and the number of snapshots
    pub position: usize,
    pub total: usize,
    /// Name of the snapshot on screen when browsing history
    pub viewing: Option<&'a str>,
    pub word_size: usize,
    pub endianness: Endianness,
    pub allocation: AllocationPolicy,
    /// Snapshots dropped to stay under the history budget
    pub dropped: usize,
    pub history_bytes: usize,
    pub history_limit: usize,
}

/// `12.5K/64M`, plus the count of dropped snapshots once there are any
fn history_usage(bytes: usize, limit: usize, dropped: usize) -> String {
    let usage = format!("{}/{}", human_size(bytes), human_size(limit));
    if dropped == 0 {
        usage
    } else {
        format!("{} ({} dropped)", usage, dropped)
    }
}

fn human_size(bytes: usize) -> String {
    const UNITS: [&str; 3] = ["K", "M", "G"];
    if bytes < 1024 {
        return format!("{}B", bytes);
    }
    let mut size = bytes as f64 / 1024.0;
    let mut unit = 0;
    while size >= 1024.0 && unit + 1 < UNITS.len() {
        size /= 1024.0;
        unit += 1;
    }
    if size.fract() == 0.0 {
        format!("{}{}", size, UNITS[unit])
    } else {
        format!("{:.1}{}", size, UNITS[unit])
    }
}

/// Render the status bar at the bottom
pub fn render_status_bar(frame: &mut Frame, area: Rect, data: StatusRenderData) {
    let layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let bar = Style::default().bg(DEFAULT_THEME.status_bg);
    let badge = |color: Color| {
        Style::default()
            .bg(color)
            .fg(Color::Black)
            .add_modifier(Modifier::BOLD)
    };

    let position_color = if data.is_error {
        DEFAULT_THEME.error
    } else if data.viewing.is_some() {
        DEFAULT_THEME.secondary
    } else {
        DEFAULT_THEME.primary
    };

    let mut left_spans = vec![
        Span::styled(
            format!(" State {}/{} ", data.position + 1, data.total),
            badge(position_color),
        ),
        Span::styled(
            format!(" {} ", history_usage(data.history_bytes, data.history_limit, data.dropped)),
            bar.fg(DEFAULT_THEME.comment),
        ),
        Span::styled(" | ", bar.fg(DEFAULT_THEME.comment)),
    ];
    if let Some(name) = data.viewing {
        left_spans.push(Span::styled(
            format!("[{}] ", name),
            bar.fg(DEFAULT_THEME.secondary),
        ));
    }
    left_spans.push(Span::styled(
        data.message.to_string(),
        bar.fg(if data.is_error {
            DEFAULT_THEME.error
        } else {
            DEFAULT_THEME.fg
        }),
    ));

    frame.render_widget(
        Paragraph::new(Line::from(left_spans))
            .style(bar)
            .alignment(Alignment::Left),
        layout[0],
    );

    let key_style = Style::default().bg(DEFAULT_THEME.comment).fg(Color::Black);
    let desc_style = bar.fg(DEFAULT_THEME.fg);
    let sep_style = bar.fg(DEFAULT_THEME.comment);

    let right_spans = vec![
        Span::styled(format!(" {}-bit ", data.word_size * 8), badge(DEFAULT_THEME.type_name)),
        Span::styled(format!(" {} ", data.endianness), badge(DEFAULT_THEME.success)),
        Span::styled(format!(" {} ", data.allocation), badge(DEFAULT_THEME.alias)),
        Span::styled(" ", desc_style),
        Span::styled(" F1 ", key_style),
        Span::styled(" builtins ", desc_style),
        Span::styled("│", sep_style),
        Span::styled(" ←/→ ", key_style),
        Span::styled(" history ", desc_style),
        Span::styled("│", sep_style),
        Span::styled(" ^Z ", key_style),
        Span::styled(" revert ", desc_style),
        Span::styled("│", sep_style),
        Span::styled(" F2 ", key_style),
        Span::styled(" endian ", desc_style),
        Span::styled("│", sep_style),
        Span::styled(" F3 ", key_style),
        Span::styled(" alloc ", desc_style),
        Span::styled("│", sep_style),
        Span::styled(" F4 ", key_style),
        Span::styled(" word ", desc_style),
        Span::styled("│", sep_style),
        Span::styled(" ^C ", key_style),
        Span::styled(" quit ", desc_style),
    ];

    frame.render_widget(
        Paragraph::new(Line::from(right_spans))
            .style(bar)
            .alignment(Alignment::Right),
        layout[1],
    );
}
