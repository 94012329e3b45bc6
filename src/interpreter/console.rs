//! Host I/O callbacks
//!
//! Builtins never touch stdin/stdout directly. They go through a [`Console`]
//! supplied by the host, so the same machine runs under the terminal UI, a
//! line-oriented batch runner, or a test harness.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::io::{self, BufRead, Write};
use std::rc::Rc;

/// Read one line, given a prompt. `None` means input is closed.
pub type ReadLine = Box<dyn FnMut(&str) -> Option<String>>;
pub type WriteText = Box<dyn FnMut(&str)>;

pub struct Console {
    read_line: ReadLine,
    write: WriteText,
}

impl Console {
    pub fn new(read_line: ReadLine, write: WriteText) -> Self {
        Console { read_line, write }
    }

    /// Discards output and has no input
    pub fn silent() -> Self {
        Console::new(Box::new(|_| None), Box::new(|_| {}))
    }

    /// Process stdin and stdout
    pub fn stdio() -> Self {
        Console::new(
            Box::new(|prompt| {
                print!("{}", prompt);
                io::stdout().flush().ok()?;
                let mut line = String::new();
                match io::stdin().lock().read_line(&mut line) {
                    Ok(0) | Err(_) => None,
                    Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
                }
            }),
            Box::new(|text| {
                print!("{}", text);
                let _ = io::stdout().flush();
            }),
        )
    }

    pub fn read_line(&mut self, prompt: &str) -> Option<String> {
        (self.read_line)(prompt)
    }

    pub fn write(&mut self, text: &str) {
        (self.write)(text)
    }
}

impl Default for Console {
    fn default() -> Self {
        Console::silent()
    }
}

impl fmt::Debug for Console {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Console")
    }
}

/// Scripted input and captured output, shared between a [`Console`] and
/// whoever reads the transcript (tests, the terminal UI)
#[derive(Debug, Clone, Default)]
pub struct MockTerminal {
    inner: Rc<RefCell<Transcript>>,
}

#[derive(Debug, Default)]
struct Transcript {
    output: String,
    inputs: VecDeque<String>,
}

impl MockTerminal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a line for the next `input` call
    pub fn push_input(&self, line: impl Into<String>) {
        self.inner.borrow_mut().inputs.push_back(line.into());
    }

    /// Everything written so far
    pub fn output(&self) -> String {
        self.inner.borrow().output.clone()
    }

    /// Output split into lines, without a trailing empty line
    pub fn lines(&self) -> Vec<String> {
        self.inner
            .borrow()
            .output
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Record text that did not come from the machine, e.g. an echoed command
    pub fn print(&self, text: &str) {
        self.inner.borrow_mut().output.push_str(text);
    }

    pub fn clear(&self) {
        self.inner.borrow_mut().output.clear();
    }

    /// A console writing into this transcript. Prompts are echoed along
    /// with the line that answered them.
    pub fn console(&self) -> Console {
        let reader = Rc::clone(&self.inner);
        let writer = Rc::clone(&self.inner);
        Console::new(
            Box::new(move |prompt| {
                let mut transcript = reader.borrow_mut();
                let line = transcript.inputs.pop_front()?;
                transcript.output.push_str(prompt);
                transcript.output.push_str(&line);
                transcript.output.push('\n');
                Some(line)
            }),
            Box::new(move |text| writer.borrow_mut().output.push_str(text)),
        )
    }
}
