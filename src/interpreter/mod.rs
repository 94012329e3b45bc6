//! Statement execution engine
//!
//! This module provides the machine that runs parsed statements:
//! - [`engine`]: the [`engine::Machine`] façade and its transactional `execute`
//! - [`operand`]: operand stack descriptors
//! - [`ops`]: one execute method per opcode family
//! - [`builtins`]: the static builtin function table
//! - [`console`]: host I/O callbacks
//! - [`inspect`]: value rendering for live memory and snapshots
//! - [`errors`]: [`errors::MachineError`]
//!
//! # Execution Model
//!
//! Each statement is parsed into a flat opcode list and run in a single pass
//! over a shared operand stack. A snapshot taken before the first opcode is
//! restored if any opcode fails, so a statement either commits completely or
//! leaves no trace. Committed statements are appended to the history for
//! time-travel replay.

pub mod builtins;
pub mod console;
pub mod constants;
pub mod engine;
pub mod errors;
pub mod inspect;
pub mod operand;
pub mod ops;
