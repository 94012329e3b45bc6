//! Main TUI application state and logic

use crate::interpreter::console::MockTerminal;
use crate::interpreter::engine::Machine;
use crate::memory::codec::Endianness;
use crate::memory::Memory;
use crate::parser::lexer::clean_statement;
use crate::ui::panes::{self, MachineView, StatusRenderData};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    Frame, Terminal,
};
use std::io;
use std::time::Duration;

/// Which pane is currently focused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusedPane {
    Terminal,
    Memory,
    Symbols,
}

impl FocusedPane {
    /// Move focus to the next pane (terminal -> memory -> symbols)
    pub fn next(self) -> Self {
        match self {
            FocusedPane::Terminal => FocusedPane::Memory,
            FocusedPane::Memory => FocusedPane::Symbols,
            FocusedPane::Symbols => FocusedPane::Terminal,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            FocusedPane::Terminal => FocusedPane::Symbols,
            FocusedPane::Memory => FocusedPane::Terminal,
            FocusedPane::Symbols => FocusedPane::Memory,
        }
    }
}

/// The main application state
pub struct App {
    pub machine: Machine,

    /// Echoed statements, results and everything `print` wrote
    pub transcript: MockTerminal,

    /// Statement being typed
    pub input: String,

    pub focused_pane: FocusedPane,

    /// Per-pane scroll offsets
    pub terminal_scroll: usize,
    pub memory_scroll: usize,
    pub symbols_scroll: usize,

    /// History entry on screen; `None` shows the live machine
    pub view: Option<usize>,

    pub should_quit: bool,

    pub status_message: String,
    pub status_is_error: bool,
}

impl App {
    /// Wrap a machine, routing its console into the on-screen transcript
    pub fn new(mut machine: Machine) -> Self {
        let transcript = MockTerminal::new();
        machine.set_console(transcript.console());
        App {
            machine,
            transcript,
            input: String::new(),
            focused_pane: FocusedPane::Terminal,
            terminal_scroll: 0,
            memory_scroll: 0,
            symbols_scroll: 0,
            view: None,
            should_quit: false,
            status_message: String::from("Ready!"),
            status_is_error: false,
        }
    }

    /// Feed a program through the REPL line by line, stopping at the first
    /// statement that fails
    pub fn run_script(&mut self, source: &str) {
        for line in source.lines() {
            if clean_statement(line).is_empty() {
                continue;
            }
            self.input = line.to_string();
            self.submit();
            if self.status_is_error {
                break;
            }
        }
    }

    /// Run the TUI application
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if self.should_quit {
                break;
            }

            if event::poll(Duration::from_millis(250))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key_event(key);
                    }
                }
            }
        }

        Ok(())
    }

    /// Render the UI
    fn render(&mut self, frame: &mut Frame) {
        let main_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(frame.area());

        // Left column: Memory (top) | Terminal (bottom); right column: Symbols
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(main_chunks[0]);
        let left_rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(columns[0]);

        let App {
            machine,
            transcript,
            input,
            focused_pane,
            terminal_scroll,
            memory_scroll,
            symbols_scroll,
            view,
            status_message,
            status_is_error,
            ..
        } = self;

        let live = MachineView {
            memory: &machine.memory,
            symbols: &machine.symbols,
            types: &machine.types,
        };
        let snapshot = view.and_then(|index| machine.history().get(index));
        let image: Option<Memory> = snapshot.and_then(|s| s.memory_image().ok());
        let shown = match (snapshot, &image) {
            (Some(snapshot), Some(memory)) => MachineView {
                memory,
                symbols: &snapshot.symbols,
                types: &machine.types,
            },
            _ => live,
        };

        panes::render_memory_pane(
            frame,
            left_rows[0],
            shown,
            *focused_pane == FocusedPane::Memory,
            memory_scroll,
        );

        panes::render_terminal_pane(
            frame,
            left_rows[1],
            transcript,
            input,
            view.is_some(),
            *focused_pane == FocusedPane::Terminal,
            terminal_scroll,
        );

        panes::render_symbols_pane(
            frame,
            columns[1],
            shown,
            *focused_pane == FocusedPane::Symbols,
            symbols_scroll,
        );

        let history = machine.history();
        panes::render_status_bar(
            frame,
            main_chunks[1],
            StatusRenderData {
                message: status_message,
                is_error: *status_is_error,
                position: view.unwrap_or(history.len().saturating_sub(1)),
                total: history.len(),
                viewing: snapshot.map(|s| s.name.as_str()),
                word_size: machine.word_size(),
                endianness: shown.memory.endianness(),
                allocation: machine.allocation_policy(),
                dropped: history.evicted(),
                history_bytes: history.memory_usage(),
                history_limit: history.memory_limit(),
            },
        );
    }

    /// Handle keyboard events
    fn handle_key_event(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('c') => self.should_quit = true,
                KeyCode::Char('z') => self.revert(),
                KeyCode::Char('l') => {
                    self.transcript.clear();
                    self.terminal_scroll = 0;
                }
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Esc => {
                if self.view.is_some() {
                    self.view = None;
                    self.set_status("Back to the present");
                } else {
                    self.should_quit = true;
                }
            }
            KeyCode::Char(c) => {
                self.view = None;
                self.input.push(c);
            }
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Enter => self.submit(),
            KeyCode::Left => self.browse_back(),
            KeyCode::Right => self.browse_forward(),
            KeyCode::F(1) => self.list_functions(),
            KeyCode::F(2) => self.toggle_endianness(),
            KeyCode::F(3) => self.toggle_allocation(),
            KeyCode::F(4) => self.cycle_word_size(),
            KeyCode::Tab => self.focused_pane = self.focused_pane.next(),
            KeyCode::BackTab => self.focused_pane = self.focused_pane.prev(),
            KeyCode::Up => {
                let scroll = self.focused_scroll();
                *scroll = scroll.saturating_sub(1);
            }
            KeyCode::Down => {
                let scroll = self.focused_scroll();
                *scroll = scroll.saturating_add(1);
            }
            KeyCode::PageUp => {
                let scroll = self.focused_scroll();
                *scroll = scroll.saturating_sub(10);
            }
            KeyCode::PageDown => {
                let scroll = self.focused_scroll();
                *scroll = scroll.saturating_add(10);
            }
            _ => {}
        }
    }

    fn focused_scroll(&mut self) -> &mut usize {
        match self.focused_pane {
            FocusedPane::Terminal => &mut self.terminal_scroll,
            FocusedPane::Memory => &mut self.memory_scroll,
            FocusedPane::Symbols => &mut self.symbols_scroll,
        }
    }

    fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.status_is_error = false;
    }

    fn set_error(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.status_is_error = true;
    }

    /// Execute the typed statement and echo it with its result
    fn submit(&mut self) {
        let statement = std::mem::take(&mut self.input);
        if statement.trim().is_empty() {
            return;
        }
        self.view = None;
        self.transcript.print(&format!("> {}\n", statement));

        match self.machine.execute(&statement) {
            Ok(Some(result)) => {
                let line = self.machine.describe(&result);
                self.transcript.print(&format!("{}\n", line));
                self.set_status("Executed");
            }
            Ok(None) => self.set_status("Executed"),
            Err(err) => {
                self.transcript.print(&format!("error: {}\n", err));
                if err.is_parse_error() {
                    self.set_error(format!("Not parsed: {}", err));
                } else {
                    self.set_error(format!("Rolled back: {}", err));
                }
            }
        }
        self.terminal_scroll = usize::MAX;
    }

    /// Print every builtin signature to the transcript
    fn list_functions(&mut self) {
        let types = self.machine.types();
        let signatures: Vec<String> = self
            .machine
            .functions()
            .iter()
            .map(|function| function.signature(types))
            .collect();
        for signature in &signatures {
            self.transcript.print(&format!("  {}\n", signature));
        }
        self.terminal_scroll = usize::MAX;
        self.set_status(format!("{} builtins", signatures.len()));
    }

    fn browse_back(&mut self) {
        let latest = self.machine.history().len().saturating_sub(1);
        let position = self.view.unwrap_or(latest);
        if position == 0 {
            self.set_status("Oldest state");
            return;
        }
        self.view = Some(position - 1);
        self.set_status("Viewing history");
    }

    fn browse_forward(&mut self) {
        let latest = self.machine.history().len().saturating_sub(1);
        match self.view {
            Some(position) if position + 1 < latest => {
                self.view = Some(position + 1);
                self.set_status("Viewing history");
            }
            Some(_) => {
                self.view = None;
                self.set_status("Back to the present");
            }
            None => self.set_status("Already at the present"),
        }
    }

    /// Revert to the state on screen, or undo the last statement when
    /// nothing is selected
    fn revert(&mut self) {
        let target = match self.view {
            Some(index) => Some(index),
            None => self.machine.history().len().checked_sub(2),
        };
        let Some(index) = target else {
            self.set_error("Nothing to revert");
            return;
        };

        let name = self
            .machine
            .history()
            .get(index)
            .map(|s| s.name.clone())
            .unwrap_or_default();
        match self.machine.revert_to(index) {
            Ok(()) => {
                self.view = None;
                self.transcript.print(&format!("reverted to [{}]\n", name));
                self.terminal_scroll = usize::MAX;
                self.set_status(format!("Reverted to [{}]", name));
            }
            Err(err) => self.set_error(err.to_string()),
        }
    }

    fn toggle_endianness(&mut self) {
        self.view = None;
        let next = self.machine.endianness().toggled();
        match self.machine.set_endianness(next) {
            Ok(()) => self.set_status(format!("Switched to {}", next)),
            Err(err) => self.set_error(err.to_string()),
        }
    }

    fn toggle_allocation(&mut self) {
        let next = self.machine.allocation_policy().toggled();
        self.machine.set_allocation_policy(next);
        self.set_status(format!("Allocation policy: {}", next));
    }

    /// 2 -> 4 -> 8 -> 2 byte words. Resets the machine.
    fn cycle_word_size(&mut self) {
        self.view = None;
        let next = match self.machine.word_size() {
            2 => 4,
            4 => 8,
            _ => 2,
        };
        match self.machine.set_word_size(next) {
            Ok(()) => {
                self.transcript
                    .print(&format!("word size is now {} bytes, machine reset\n", next));
                self.terminal_scroll = usize::MAX;
                self.set_status(format!("{}-bit words", next * 8));
            }
            Err(err) => self.set_error(err.to_string()),
        }
    }
}
