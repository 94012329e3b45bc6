//! Operand stack descriptors
//!
//! The operand stack never holds raw bytes. Each entry is either a computed
//! value or a way to find backed storage:
//! - [`Operand::Value`]: a temporary with its type
//! - [`Operand::Variable`]: a registered variable, by name
//! - [`Operand::Place`]: unnamed storage inside a variable (an array element,
//!   or the target of a pointer that lands mid-block)
//!
//! Reading a backed operand always goes to memory, so two operands naming the
//! same bytes can never disagree.

use crate::interpreter::engine::Machine;
use crate::interpreter::errors::{MachineError, Result};
use crate::memory::value::{Address, Literal};
use crate::parser::identifier::Identifier;
use crate::symbols::VariableKind;
use crate::types::{Primitive, TypeId};

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Value { literal: Literal, ty: TypeId },
    Variable(Identifier),
    Place {
        address: Address,
        ty: TypeId,
        /// The variable whose bytes hold this place
        owner: Identifier,
    },
}

impl Operand {
    pub fn is_lvalue(&self) -> bool {
        !matches!(self, Operand::Value { .. })
    }
}

impl Machine {
    pub(crate) fn pop(&mut self) -> Result<Operand> {
        self.stack
            .pop()
            .ok_or_else(|| MachineError::runtime("missing operand"))
    }

    pub(crate) fn push_value(&mut self, literal: Literal, ty: TypeId) {
        self.stack.push(Operand::Value { literal, ty });
    }

    /// Type a literal gets when it appears in source
    pub(crate) fn natural_type(&mut self, literal: &Literal) -> Result<TypeId> {
        Ok(match literal {
            Literal::Integer(n) => self.types.integer_literal_type(*n),
            Literal::Char(_) => self.types.primitive(Primitive::Char),
            Literal::Float(_) => self.types.primitive(Primitive::Double),
            Literal::Text(_) => {
                let chr = self.types.primitive(Primitive::Char);
                self.types.pointer_to(chr)?
            }
            Literal::Type(_) => self.types.type_value(),
        })
    }

    /// Declared type of an operand, references and arrays included
    pub(crate) fn operand_type(&self, operand: &Operand) -> Result<TypeId> {
        match operand {
            Operand::Value { ty, .. } | Operand::Place { ty, .. } => Ok(*ty),
            Operand::Variable(id) => Ok(self.variable(id)?.ty),
        }
    }

    /// Address and (reference-free) type of backed storage, `None` for
    /// temporaries
    pub(crate) fn lvalue(&self, operand: &Operand) -> Result<Option<(Address, TypeId)>> {
        match operand {
            Operand::Value { .. } => Ok(None),
            Operand::Place { address, ty, .. } => {
                Ok(Some((*address, self.types.strip_reference(*ty))))
            }
            Operand::Variable(id) => {
                let variable = self.variable(id)?;
                Ok(Some((
                    variable.address,
                    self.types.strip_reference(variable.ty),
                )))
            }
        }
    }

    /// The variable that owns the bytes behind an lvalue. References answer
    /// with their target.
    pub(crate) fn owner_of(&self, operand: &Operand) -> Result<Option<Identifier>> {
        match operand {
            Operand::Value { .. } => Ok(None),
            Operand::Place { owner, .. } => Ok(Some(owner.clone())),
            Operand::Variable(id) => match &self.variable(id)?.kind {
                VariableKind::Reference { target } => Ok(Some(target.clone())),
                _ => Ok(Some(id.clone())),
            },
        }
    }

    /// Current value of an operand. Arrays decay to a pointer to their first
    /// element and references read as their target.
    pub(crate) fn read_operand(&mut self, operand: &Operand) -> Result<(Literal, TypeId)> {
        let Some((address, ty)) = self.lvalue(operand)? else {
            if let Operand::Value { literal, ty } = operand {
                return Ok((literal.clone(), *ty));
            }
            return Err(MachineError::runtime("operand has no value"));
        };

        if self.types.is_array(ty) {
            let decayed = self.types.decay(ty);
            return Ok((Literal::Integer(address as i128), decayed));
        }
        let literal = self.memory.load(address, ty, &self.types)?;
        Ok((literal, ty))
    }

    /// Read an integral operand, e.g. a size or an index
    pub(crate) fn read_integer(&mut self, operand: &Operand) -> Result<i128> {
        let (literal, ty) = self.read_operand(operand)?;
        if self.types.is_float(ty) || !(self.types.is_arithmetic(ty) || self.types.is_pointer(ty)) {
            return Err(MachineError::mismatch(
                "an integer",
                self.types.name(ty).to_string(),
            ));
        }
        literal
            .as_integer()
            .ok_or_else(|| MachineError::mismatch("an integer", format!("{:?}", literal)))
    }

    /// Read a floating point view of an arithmetic operand
    pub(crate) fn read_float(&mut self, operand: &Operand) -> Result<f64> {
        let (literal, ty) = self.read_operand(operand)?;
        match literal.as_float() {
            Some(x) if self.types.is_arithmetic(ty) => Ok(x),
            _ => Err(MachineError::mismatch(
                "a number",
                self.types.name(ty).to_string(),
            )),
        }
    }

    /// Text behind a string literal, a `char*` or a `char` array
    pub(crate) fn read_text(&mut self, operand: &Operand) -> Result<String> {
        if let Operand::Value {
            literal: Literal::Text(text),
            ..
        } = operand
        {
            return Ok(text.clone());
        }

        let ty = self.operand_type(operand)?;
        if let Some((address, ty)) = self.lvalue(operand)? {
            if self.types.is_char_array(ty) {
                if let Literal::Text(text) = self.memory.read_literal(address, ty, &self.types)? {
                    return Ok(text);
                }
            }
        }
        if !self.types.is_char_pointer(ty) {
            return Err(MachineError::mismatch(
                "char*",
                self.types.name(ty).to_string(),
            ));
        }
        let (pointer, _) = self.read_operand(operand)?;
        let address = pointer
            .as_address()
            .ok_or(MachineError::InvalidAddress { address: 0, length: 1 })?;
        self.memory.load_text(address)
    }

    /// Locate storage of type `ty` at `address`: a registered variable of that
    /// exact type, otherwise a place inside whichever variable covers it
    pub(crate) fn resolve_address(&self, address: Address, ty: TypeId) -> Result<Operand> {
        let length = self.types.size(ty);
        if address == 0 {
            return Err(MachineError::InvalidAddress { address, length });
        }
        if let Some(variable) = self.symbols.find_typed(address, ty, &self.types) {
            return Ok(Operand::Variable(variable.id.clone()));
        }
        match self.symbols.spanning(address, length.max(1)) {
            Some(owner) => Ok(Operand::Place {
                address,
                ty,
                owner: owner.id.clone(),
            }),
            None => Err(MachineError::InvalidAddress { address, length }),
        }
    }
}
