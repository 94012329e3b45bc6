//! Opcodes emitted by the parser
//!
//! A statement compiles to a flat `Vec<Opcode>`. Every opcode has a fixed
//! effect on the operand stack, listed here as `pops -> pushes`. Since there
//! are no jumps, running a statement is one linear pass over the list.

use crate::memory::value::Literal;
use crate::parser::identifier::Identifier;
use crate::types::TypeId;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(BinaryOp::Add),
            '-' => Some(BinaryOp::Sub),
            '*' => Some(BinaryOp::Mul),
            '/' => Some(BinaryOp::Div),
            '%' => Some(BinaryOp::Mod),
            _ => None,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            BinaryOp::Add => '+',
            BinaryOp::Sub => '-',
            BinaryOp::Mul => '*',
            BinaryOp::Div => '/',
            BinaryOp::Mod => '%',
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Opcode {
    /// `-> literal`, typed by its natural type
    Push(Literal),
    /// `-> literal` with an explicit type (`null` is an `any*`)
    PushTyped(Literal, TypeId),
    /// `-> variable`
    PushId(Identifier),
    /// `lvalue -> pointer`
    AddressOf,
    /// `pointer -> lvalue`, repeated `levels` times
    Dereference { levels: usize },
    /// `base, index -> lvalue`
    Index,
    /// `left, right -> value`
    Binary(BinaryOp),
    /// `lvalue, value -> lvalue`
    Assign,
    /// `[init] -> variable`. Scalars and references pop their initial value;
    /// arrays pop nothing and are zero-filled when `initialized`.
    Create {
        ty: TypeId,
        id: Identifier,
        initialized: bool,
    },
    /// `arg1 .. argN -> [result]`
    Call { name: String, argc: usize },
    /// `value ->`
    Discard,
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opcode::Push(literal) | Opcode::PushTyped(literal, _) => write!(f, "push {:?}", literal),
            Opcode::PushId(id) => write!(f, "push {}", id),
            Opcode::AddressOf => write!(f, "addr"),
            Opcode::Dereference { levels } => write!(f, "deref {}", levels),
            Opcode::Index => write!(f, "index"),
            Opcode::Binary(op) => write!(f, "binary {}", op.symbol()),
            Opcode::Assign => write!(f, "assign"),
            Opcode::Create { id, .. } => write!(f, "create {}", id),
            Opcode::Call { name, argc } => write!(f, "call {}/{}", name, argc),
            Opcode::Discard => write!(f, "discard"),
        }
    }
}
