//! Read-only value rendering over a memory image
//!
//! Used for the live machine and for history snapshots alike, so a front end
//! renders past states exactly as it renders the present.

use crate::interpreter::errors::Result;
use crate::memory::value::Literal;
use crate::memory::Memory;
use crate::symbols::{Variable, VariableKind};
use crate::types::{TypeId, TypeSystem};

#[derive(Debug, Clone, Copy)]
pub struct Inspector<'a> {
    memory: &'a Memory,
    types: &'a TypeSystem,
}

impl<'a> Inspector<'a> {
    pub fn new(memory: &'a Memory, types: &'a TypeSystem) -> Self {
        Inspector { memory, types }
    }

    /// Current value of a variable. `char*` and `char` arrays read as text and
    /// other arrays as the address of their first element.
    pub fn value_of(&self, variable: &Variable) -> Result<Literal> {
        if let VariableKind::Temporary(literal) = &variable.kind {
            return Ok(literal.clone());
        }
        let ty = self.types.strip_reference(variable.ty);
        if self.types.is_array(ty) && !self.types.is_char_array(ty) {
            return Ok(Literal::Integer(variable.address as i128));
        }
        self.memory.read_literal(variable.address, ty, self.types)
    }

    /// Element values of an array, or the single value of a scalar
    pub fn elements(&self, variable: &Variable) -> Result<Vec<Literal>> {
        let ty = self.types.strip_reference(variable.ty);
        match self.types.array_shape(ty) {
            Some((element, count)) => {
                let size = self.types.size(element);
                (0..count)
                    .map(|i| {
                        self.memory
                            .load(variable.address + i * size, element, self.types)
                    })
                    .collect()
            }
            None => Ok(vec![self.value_of(variable)?]),
        }
    }

    /// Render a value the way it reads in source: pointers in hex, text
    /// quoted, type values by name
    pub fn format_value(&self, literal: &Literal, ty: TypeId) -> String {
        match literal {
            Literal::Integer(n) if self.types.is_pointer(ty) => format!("0x{:x}", n),
            other => other.display(self.types).to_string(),
        }
    }

    /// The rendered value alone; `?` when it cannot be decoded
    pub fn render_value(&self, variable: &Variable) -> String {
        let ty = self.types.strip_reference(variable.ty);
        if let Some((element, _)) = self.types.array_shape(ty) {
            if !self.types.is_char_array(ty) {
                return match self.elements(variable) {
                    Ok(items) => {
                        let items: Vec<String> = items
                            .iter()
                            .map(|item| self.format_value(item, element))
                            .collect();
                        format!("{{{}}}", items.join(", "))
                    }
                    Err(_) => "?".to_string(),
                };
            }
        }
        match self.value_of(variable) {
            Ok(literal) => self.format_value(&literal, ty),
            Err(_) => "?".to_string(),
        }
    }

    /// `name: type @ 0xADDR = value`, without the address for temporaries
    pub fn describe(&self, variable: &Variable) -> String {
        let type_name = self.types.name(variable.ty);
        let value = self.render_value(variable);
        if variable.is_temporary() {
            format!("{}: {} = {}", variable.id, type_name, value)
        } else {
            format!(
                "{}: {} @ 0x{:04x} = {}",
                variable.id, type_name, variable.address, value
            )
        }
    }
}
