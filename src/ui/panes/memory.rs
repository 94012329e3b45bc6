//! Memory grid rendering
//!
//! Sixteen bytes per row, address on the left and printable characters on
//! the right. Bytes owned by a variable take its color; stack and heap
//! variables alternate between two shades so neighbours stay apart. Free
//! bytes are dimmed.

use super::{border_style, clamp_scroll, MachineView};
use crate::symbols::{SymbolTable, Variable};
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
    Frame,
};

const BYTES_PER_ROW: usize = 16;

/// Render the memory grid
pub fn render_memory_pane(
    frame: &mut Frame,
    area: Rect,
    view: MachineView,
    is_focused: bool,
    scroll_offset: &mut usize,
) {
    let bytes = view.memory.bytes();
    let block = Block::default()
        .title(format!(
            " Memory ({} bytes, {}) ",
            bytes.len(),
            view.memory.endianness()
        ))
        .borders(Borders::ALL)
        .border_style(border_style(is_focused));

    let owners = byte_owners(view.symbols, bytes.len());
    let total_rows = bytes.len().div_ceil(BYTES_PER_ROW);
    let visible_height = area.height.saturating_sub(2).max(1) as usize;
    clamp_scroll(scroll_offset, total_rows, visible_height);

    let items: Vec<ListItem> = bytes
        .chunks(BYTES_PER_ROW)
        .enumerate()
        .skip(*scroll_offset)
        .take(visible_height)
        .map(|(row, chunk)| {
            let base = row * BYTES_PER_ROW;
            ListItem::new(grid_row(base, chunk, &owners[base..base + chunk.len()]))
        })
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}

fn grid_row<'a>(base: usize, chunk: &[u8], owners: &[Option<Owner>]) -> Line<'a> {
    let mut spans = Vec::with_capacity(chunk.len() * 2 + 3);
    spans.push(Span::styled(
        format!("0x{:04x} ", base),
        Style::default().fg(DEFAULT_THEME.comment),
    ));

    for (offset, (byte, owner)) in chunk.iter().zip(owners).enumerate() {
        if offset == BYTES_PER_ROW / 2 {
            spans.push(Span::raw(" "));
        }
        spans.push(Span::styled(format!(" {:02x}", byte), byte_style(*owner)));
    }

    let ascii: String = chunk
        .iter()
        .map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            }
        })
        .collect();
    spans.push(Span::styled(
        format!("  {}", ascii),
        Style::default().fg(DEFAULT_THEME.comment),
    ));
    Line::from(spans)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Owner {
    Stack { shade: bool },
    Heap { shade: bool },
}

fn byte_style(owner: Option<Owner>) -> Style {
    match owner {
        None => Style::default().fg(DEFAULT_THEME.free_byte),
        Some(Owner::Stack { shade }) => {
            let style = Style::default().fg(DEFAULT_THEME.primary);
            if shade {
                style.add_modifier(Modifier::BOLD)
            } else {
                style.fg(DEFAULT_THEME.type_name)
            }
        }
        Some(Owner::Heap { shade }) => {
            let style = Style::default().fg(DEFAULT_THEME.secondary);
            if shade {
                style.add_modifier(Modifier::BOLD)
            } else {
                style.fg(DEFAULT_THEME.success)
            }
        }
    }
}

/// Which variable owns each byte. References alias their target and own
/// nothing themselves.
fn byte_owners(symbols: &SymbolTable, len: usize) -> Vec<Option<Owner>> {
    let mut owners = vec![None; len];
    let mut stack_shade = false;
    let mut heap_shade = false;

    let mut owning: Vec<&Variable> = symbols
        .iter()
        .filter(|v| !v.is_reference() && !v.is_temporary())
        .collect();
    owning.sort_by_key(|v| v.address);

    for variable in owning {
        let owner = if variable.is_heap() {
            heap_shade = !heap_shade;
            Owner::Heap { shade: heap_shade }
        } else {
            stack_shade = !stack_shade;
            Owner::Stack { shade: stack_shade }
        };
        let end = variable.end().min(len);
        for slot in owners.iter_mut().take(end).skip(variable.address) {
            *slot = Some(owner);
        }
    }
    owners
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MachineConfig;
    use crate::interpreter::engine::Machine;

    #[test]
    fn test_byte_owners() {
        let mut m = Machine::new(MachineConfig::default()).unwrap();
        m.execute("int x = 1").unwrap();
        m.execute("int& r = x").unwrap();
        m.execute("int* p = new int").unwrap();

        let owners = byte_owners(m.symbols(), m.memory().len());
        let x = m.lookup("x").unwrap().clone();
        let heap = m.variables().find(|v| v.is_heap()).unwrap().clone();

        assert!(matches!(owners[x.address], Some(Owner::Stack { .. })));
        assert_eq!(owners[x.address], owners[x.end() - 1]);
        assert!(matches!(owners[heap.address], Some(Owner::Heap { .. })));
        assert_eq!(owners[0], None);
        // streams, x and p are the stack owners; the reference adds none
        let stack_runs = owners
            .windows(2)
            .filter(|w| w[0] != w[1] && matches!(w[1], Some(Owner::Stack { .. })))
            .count();
        assert_eq!(stack_runs, 5);
    }
}
