//! TUI pane rendering modules
//!
//! # Pane Modules
//!
//! - [`memory`]: hex grid of the whole store, owned bytes highlighted
//! - [`symbols`]: one row per registered variable with its current value
//! - [`terminal`]: REPL transcript and the input line
//! - [`status`]: history position, machine settings and keybindings
//!
//! Every pane renders from a [`MachineView`], which is either the live
//! machine or a snapshot from its history, so browsing the past reuses the
//! same code paths.

pub mod memory;
pub mod status;
pub mod symbols;
pub mod terminal;

pub use memory::render_memory_pane;
pub use status::{render_status_bar, StatusRenderData};
pub use symbols::render_symbols_pane;
pub use terminal::render_terminal_pane;

use crate::interpreter::inspect::Inspector;
use crate::memory::Memory;
use crate::symbols::SymbolTable;
use crate::types::TypeSystem;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::style::{Modifier, Style};

/// The state a frame is drawn from
#[derive(Clone, Copy)]
pub struct MachineView<'a> {
    pub memory: &'a Memory,
    pub symbols: &'a SymbolTable,
    pub types: &'a TypeSystem,
}

impl<'a> MachineView<'a> {
    pub fn inspector(&self) -> Inspector<'a> {
        Inspector::new(self.memory, self.types)
    }
}

fn border_style(is_focused: bool) -> Style {
    if is_focused {
        Style::default()
            .fg(DEFAULT_THEME.border_focused)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DEFAULT_THEME.border_normal)
    }
}

/// Clamp a scroll offset so the last page stays full
fn clamp_scroll(scroll_offset: &mut usize, total_items: usize, visible_height: usize) {
    if total_items > visible_height {
        *scroll_offset = (*scroll_offset).min(total_items - visible_height);
    } else {
        *scroll_offset = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_scroll() {
        let mut offset = usize::MAX;
        clamp_scroll(&mut offset, 30, 10);
        assert_eq!(offset, 20);

        let mut offset = 5;
        clamp_scroll(&mut offset, 3, 10);
        assert_eq!(offset, 0);
    }
}
