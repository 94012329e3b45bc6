use crate::memory::value::{Address, Literal};
use crate::parser::identifier::Identifier;
use crate::types::{TypeId, TypeKind, TypeSystem};

/// What a variable is, beyond its type
#[derive(Debug, Clone, PartialEq)]
pub enum VariableKind {
    Plain,
    Pointer,
    /// An alias registered at its target's address. Owns no bytes.
    Reference { target: Identifier },
    /// A contiguous block of `count` elements. Elements are never registered
    /// on their own.
    Array { element: TypeId, count: usize },
    /// A computed value with no backing address
    Temporary(Literal),
}

impl VariableKind {
    /// Kind of a freshly allocated variable of type `ty`. References are
    /// built explicitly since they need their target.
    pub fn of(ty: TypeId, types: &TypeSystem) -> Self {
        match types.kind(ty) {
            TypeKind::Pointer { .. } => VariableKind::Pointer,
            TypeKind::Array { element, count } => VariableKind::Array { element, count },
            _ => VariableKind::Plain,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub id: Identifier,
    pub ty: TypeId,
    pub address: Address,
    pub size: usize,
    pub kind: VariableKind,
}

impl Variable {
    pub fn new(id: Identifier, ty: TypeId, address: Address, types: &TypeSystem) -> Self {
        Variable {
            id,
            ty,
            address,
            size: types.size(ty),
            kind: VariableKind::of(ty, types),
        }
    }

    pub fn is_heap(&self) -> bool {
        self.id.is_heap()
    }

    pub fn is_reference(&self) -> bool {
        matches!(self.kind, VariableKind::Reference { .. })
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind, VariableKind::Array { .. })
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self.kind, VariableKind::Temporary(_))
    }

    /// One past the last byte
    pub fn end(&self) -> Address {
        self.address + self.size
    }

    /// Whether `[address, address + length)` lies inside this variable
    pub fn spans(&self, address: Address, length: usize) -> bool {
        address >= self.address && address + length <= self.end()
    }
}
