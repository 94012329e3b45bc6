//! Error types for the machine
//!
//! This module defines [`MachineError`], which represents every failure the
//! machine can report to a host. Parse-phase failures are wrapped
//! [`ParseError`]s and never touch machine state; every other variant is raised
//! while opcodes run and causes the statement to be rolled back before it
//! reaches the caller.

use crate::memory::value::Address;
use crate::parser::parser::ParseError;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, MachineError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MachineError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("invalid identifier '{0}'")]
    InvalidIdentifier(String),

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("variable '{0}' is already declared")]
    DuplicateVariable(String),

    /// Any access touching bytes outside memory, or an address that resolves
    /// to no variable
    #[error("invalid memory address 0x{address:x} (length {length})")]
    InvalidAddress { address: Address, length: usize },

    #[error("memory exhausted: no free slot for {requested} bytes")]
    MemoryExhausted { requested: usize },

    #[error("invalid memory size {0}: must be larger than 16 and a multiple of 16")]
    InvalidMemorySize(usize),

    #[error("invalid word size {0}: must be 2, 4 or 8")]
    InvalidWordSize(usize),

    /// `free`/`delete` on an address that is not the start of a heap block
    #[error("address 0x{0:x} is not a heap block")]
    NotHeapAddress(Address),

    #[error("function '{function}' expects {expected} argument{}, got {found}", plural(.expected))]
    ParameterCount {
        function: String,
        expected: usize,
        found: usize,
    },

    #[error("argument {position} of '{function}' expects {expected}, found {found}")]
    ParameterType {
        function: String,
        position: usize,
        expected: String,
        found: String,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("runtime error: {0}")]
    Runtime(String),
}

fn plural(count: &usize) -> &'static str {
    if *count == 1 {
        ""
    } else {
        "s"
    }
}

impl MachineError {
    /// Whether the error was raised before any opcode ran
    pub fn is_parse_error(&self) -> bool {
        matches!(self, MachineError::Parse(_))
    }

    pub(crate) fn mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        MachineError::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub(crate) fn runtime(message: impl Into<String>) -> Self {
        MachineError::Runtime(message.into())
    }
}

/// A failed statement inside a multi-line program
#[derive(Debug, Clone, PartialEq, Error)]
#[error("line {line}: {source}")]
pub struct ProgramError {
    /// 1-based line number
    pub line: usize,
    #[source]
    pub source: MachineError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_count_pluralizes() {
        let one = MachineError::ParameterCount {
            function: "free".to_string(),
            expected: 1,
            found: 2,
        };
        assert_eq!(one.to_string(), "function 'free' expects 1 argument, got 2");

        let two = MachineError::ParameterCount {
            function: "pow".to_string(),
            expected: 2,
            found: 0,
        };
        assert_eq!(two.to_string(), "function 'pow' expects 2 arguments, got 0");
    }

    #[test]
    fn test_parse_errors_are_flagged() {
        let err: MachineError = ParseError::UninitializedReference {
            name: "r".to_string(),
        }
        .into();
        assert!(err.is_parse_error());
        assert!(!MachineError::DivisionByZero.is_parse_error());
    }

    #[test]
    fn test_program_error_names_the_line() {
        let err = ProgramError {
            line: 3,
            source: MachineError::UnknownVariable("y".to_string()),
        };
        assert_eq!(err.to_string(), "line 3: unknown variable 'y'");
    }
}
