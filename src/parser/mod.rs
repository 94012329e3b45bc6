//! Statement parser
//!
//! This module turns one line of source text into a flat opcode list:
//! - [`lexer`]: on-demand tokenization with save/restore
//! - [`parser`]: the recursive descent driver and [`parser::ParseError`]
//! - [`opcode`]: the [`opcode::Opcode`] set the engine executes
//! - [`identifier`]: validated variable names
//!
//! # Supported language
//!
//! One statement per line, no control flow:
//! - Declarations: `int x`, `double* p = &d`, `int& r = x`, `char s[] = "hi"`,
//!   `int a[3] = {1, 2, 3}`
//! - Assignment through names, dereference chains and indexing
//! - `new T`, `new T[n]`, `delete p`, and calls such as `malloc(8)` or `int(x)`
//! - Left-to-right arithmetic with `+ - * / %` on a single precedence level
//!
//! Parsing has no side effects on the machine; a statement that fails to parse
//! changes nothing.

mod declarations;
mod expressions;
pub mod identifier;
pub mod lexer;
pub mod opcode;
#[allow(clippy::module_inception)]
pub mod parser;

pub use parser::{parse_statement, ParseError, Parser};
