//! # Introduction
//!
//! memlab is a byte-addressable teaching machine. It executes one C-like
//! statement at a time against a small flat memory and shows exactly where
//! every variable, pointer, reference and heap block lands in that memory.
//!
//! ## Execution pipeline
//!
//! ```text
//! Statement → Lexer → Parser → Opcodes → Machine → Snapshot → TUI
//! ```
//!
//! 1. [`parser`]: tokenises one statement and compiles it to a flat
//!    [`parser::opcode::Opcode`] list.
//! 2. [`interpreter`]: runs the opcodes on an operand stack. A statement
//!    either commits completely or is rolled back.
//! 3. [`memory`]: the raw byte store and the integer/float codecs for both
//!    byte orders.
//! 4. [`symbols`]: which variable owns which bytes, and where new ones go.
//! 5. [`types`]: interned primitive, pointer, reference and array types whose
//!    sizes follow the configured word size.
//! 6. [`snapshot`]: committed states kept for time-travel replay.
//! 7. [`ui`]: ratatui-based TUI; not part of the stable library API.
//!
//! ## Example
//!
//! ```
//! use memlab::config::MachineConfig;
//! use memlab::interpreter::engine::Machine;
//!
//! let mut machine = Machine::new(MachineConfig::default()).unwrap();
//! machine.execute("int a[2] = {7, 9}").unwrap();
//! let p = machine.execute("int* p = &a").unwrap().unwrap();
//! let second = machine.execute("p[1]").unwrap().unwrap();
//! assert!(machine.describe(&second).ends_with("= 9"));
//! assert_eq!(p.size, 4);
//! ```

pub mod config;
pub mod interpreter;
pub mod memory;
pub mod parser;
pub mod snapshot;
pub mod symbols;
pub mod types;
pub mod ui;
