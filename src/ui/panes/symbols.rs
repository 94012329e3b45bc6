//! Symbol list rendering
//!
//! One row per registered variable in declaration order:
//! `name  type  @0xADDR  = value`, with heap blocks and references set apart
//! by color.

use super::{border_style, clamp_scroll, MachineView};
use crate::symbols::{Variable, VariableKind};
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

/// Render the symbol list
pub fn render_symbols_pane(
    frame: &mut Frame,
    area: Rect,
    view: MachineView,
    is_focused: bool,
    scroll_offset: &mut usize,
) {
    let block = Block::default()
        .title(format!(" Symbols ({}) ", view.symbols.len()))
        .borders(Borders::ALL)
        .border_style(border_style(is_focused));

    if view.symbols.is_empty() {
        let paragraph = Paragraph::new("(no variables)")
            .block(block)
            .style(Style::default().fg(DEFAULT_THEME.comment));
        frame.render_widget(paragraph, area);
        return;
    }

    let rows: Vec<Line> = view.symbols.iter().map(|v| symbol_row(view, v)).collect();
    let visible_height = area.height.saturating_sub(2).max(1) as usize;
    clamp_scroll(scroll_offset, rows.len(), visible_height);

    let items: Vec<ListItem> = rows
        .into_iter()
        .skip(*scroll_offset)
        .take(visible_height)
        .map(ListItem::new)
        .collect();
    frame.render_widget(List::new(items).block(block), area);
}

fn symbol_row<'a>(view: MachineView, variable: &Variable) -> Line<'a> {
    let name_color = if variable.is_heap() {
        DEFAULT_THEME.secondary
    } else if variable.is_reference() {
        DEFAULT_THEME.alias
    } else {
        DEFAULT_THEME.primary
    };

    let mut spans = vec![
        Span::styled(variable.id.to_string(), Style::default().fg(name_color)),
        Span::raw(" "),
        Span::styled(
            view.types.name(variable.ty).to_string(),
            Style::default().fg(DEFAULT_THEME.type_name),
        ),
        Span::styled(
            format!(" @0x{:04x}", variable.address),
            Style::default().fg(DEFAULT_THEME.comment),
        ),
        Span::raw(" = "),
        Span::styled(
            view.inspector().render_value(variable),
            Style::default().fg(DEFAULT_THEME.fg),
        ),
    ];

    if let VariableKind::Reference { target } = &variable.kind {
        spans.push(Span::styled(
            format!("  -> {}", target),
            Style::default().fg(DEFAULT_THEME.alias),
        ));
    }
    Line::from(spans)
}
