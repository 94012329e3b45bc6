//! Literal values
//!
//! A [`Literal`] is a value detached from memory: what the lexer produces for
//! source literals, what arithmetic produces for temporaries, and what the
//! memory manager decodes when a variable is read. It is typed by context; the
//! type decides how many bytes it occupies and how they are laid out.

use crate::types::{TypeId, TypeSystem};
use std::fmt;

/// Byte offset into the machine's flat memory
pub type Address = usize;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Integers, and the numeric value of pointers
    Integer(i128),
    Char(u8),
    Float(f64),
    Text(String),
    Type(TypeId),
}

impl Literal {
    /// Numeric value as an integer (floats truncate toward zero)
    pub fn as_integer(&self) -> Option<i128> {
        match self {
            Literal::Integer(n) => Some(*n),
            Literal::Char(c) => Some(*c as i8 as i128),
            Literal::Float(f) => Some(f.trunc() as i128),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Literal::Integer(n) => Some(*n as f64),
            Literal::Char(c) => Some(*c as i8 as f64),
            Literal::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<Address> {
        self.as_integer().and_then(|n| Address::try_from(n).ok())
    }

    /// Render for display, resolving type handles through `types`
    pub fn display<'a>(&'a self, types: &'a TypeSystem) -> LiteralDisplay<'a> {
        LiteralDisplay {
            literal: self,
            types,
        }
    }
}

pub struct LiteralDisplay<'a> {
    literal: &'a Literal,
    types: &'a TypeSystem,
}

impl fmt::Display for LiteralDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.literal {
            Literal::Integer(n) => write!(f, "{}", n),
            Literal::Char(c) => {
                if c.is_ascii_graphic() || *c == b' ' {
                    write!(f, "'{}'", *c as char)
                } else {
                    write!(f, "'\\x{:02x}'", c)
                }
            }
            Literal::Float(x) => write!(f, "{:?}", x),
            Literal::Text(s) => write!(f, "{:?}", s),
            Literal::Type(id) => write!(f, "{}", self.types.name(*id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_views() {
        assert_eq!(Literal::Char(b'A').as_integer(), Some(65));
        assert_eq!(Literal::Char(0xff).as_integer(), Some(-1));
        assert_eq!(Literal::Float(-2.75).as_integer(), Some(-2));
        assert_eq!(Literal::Integer(3).as_float(), Some(3.0));
        assert_eq!(Literal::Text("x".into()).as_integer(), None);
        assert_eq!(Literal::Integer(-1).as_address(), None);
        assert_eq!(Literal::Integer(16).as_address(), Some(16));
    }

    #[test]
    fn test_display() {
        let types = TypeSystem::new(4).unwrap();
        assert_eq!(Literal::Char(b'a').display(&types).to_string(), "'a'");
        assert_eq!(Literal::Char(0).display(&types).to_string(), "'\\x00'");
        assert_eq!(Literal::Float(1.0).display(&types).to_string(), "1.0");
        assert_eq!(
            Literal::Text("hi".into()).display(&types).to_string(),
            "\"hi\""
        );
        let int = types.lookup("int").unwrap();
        assert_eq!(Literal::Type(int).display(&types).to_string(), "int");
    }
}
