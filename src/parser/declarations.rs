//! Declaration parsing
//!
//! ```text
//! declaration := type ['&'] identifier ['[' [count] ']'] ['=' initializer]
//! type        := type-name '*'*
//! initializer := expression | '{' expression (',' expression)* '}' | string
//! ```

use super::parser::{ParseError, Parser};
use crate::memory::value::Literal;
use crate::parser::identifier::Identifier;
use crate::parser::lexer::Token;
use crate::parser::opcode::Opcode;
use crate::types::{Primitive, TypeId};

impl Parser<'_> {
    /// Whether a type name starts at the cursor and is not being called as a
    /// cast. At the start of a statement this means a declaration.
    pub(super) fn at_declaration(&mut self) -> bool {
        let cursor = self.lexer.save();
        let declaration = match self.lexer.next_token() {
            Token::Identifier(name) => self.is_type_name(&name) && !self.lexer.accept('('),
            _ => false,
        };
        self.lexer.restore(cursor);
        declaration
    }

    /// `type-name '*'*`
    pub(super) fn parse_type(&mut self) -> Result<TypeId, ParseError> {
        let mut ty = match self.lexer.next_token() {
            Token::Identifier(name) if self.is_type_name(&name) => match self.types.lookup(&name) {
                Some(ty) => ty,
                None => return Err(self.error(format!("unknown type '{}'", name))),
            },
            other => return Err(self.error(format!("expected a type, found {}", other))),
        };

        while self.lexer.accept('*') {
            ty = self.types.pointer_to(ty).map_err(|e| self.type_error(e))?;
        }
        Ok(ty)
    }

    pub(super) fn parse_declaration(&mut self) -> Result<(), ParseError> {
        let base = self.parse_type()?;
        let is_reference = self.lexer.accept('&');
        let id = self.parse_identifier()?;

        if self.lexer.accept('[') {
            if is_reference {
                return Err(self.error("arrays of references are not allowed"));
            }
            return self.parse_array_declaration(base, id);
        }

        if is_reference {
            if !self.lexer.accept('=') {
                return Err(if self.lexer.is_at_end() {
                    ParseError::UninitializedReference {
                        name: id.to_string(),
                    }
                } else {
                    self.error(format!("expected '=' after declaration of '{}'", id))
                });
            }
            self.parse_expression()?;
            let ty = self.types.reference_to(base).map_err(|e| self.type_error(e))?;
            self.emit(Opcode::Create {
                ty,
                id,
                initialized: true,
            });
            return Ok(());
        }

        let initialized = self.lexer.accept('=');
        if initialized {
            self.parse_expression()?;
        } else if !self.lexer.is_at_end() {
            return Err(self.error(format!("expected '=' after declaration of '{}'", id)));
        }
        self.emit(Opcode::Create {
            ty: base,
            id,
            initialized,
        });
        Ok(())
    }

    /// Everything after `T id[`
    fn parse_array_declaration(&mut self, element: TypeId, id: Identifier) -> Result<(), ParseError> {
        let count = match self.lexer.next_token() {
            Token::Special(']') => None,
            Token::Integer(n) | Token::Hex(n) => {
                self.expect(']', "unmatched '[' in array declaration")?;
                match usize::try_from(n) {
                    Ok(n) if n > 0 => Some(n),
                    _ => return Err(self.error("array length must be a positive integer")),
                }
            }
            other => {
                return Err(self.error(format!("expected an array length, found {}", other)))
            }
        };

        if !self.lexer.accept('=') {
            let Some(count) = count else {
                return Err(self.error(format!("array '{}' needs a length or an initializer", id)));
            };
            if !self.lexer.is_at_end() {
                return Err(self.error(format!("expected '=' after declaration of '{}'", id)));
            }
            let ty = self.types.array_of(element, count).map_err(|e| self.type_error(e))?;
            self.emit(Opcode::Create {
                ty,
                id,
                initialized: false,
            });
            return Ok(());
        }

        if let Token::Str(text) = self.lexer.peek_token() {
            if self.types.as_primitive(element) != Some(Primitive::Char) {
                return Err(self.error("only char arrays can be initialized from a string"));
            }
            self.lexer.next_token();
            let count = count.unwrap_or(text.chars().count() + 1);
            let ty = self.types.array_of(element, count).map_err(|e| self.type_error(e))?;
            self.emit(Opcode::Create {
                ty,
                id: id.clone(),
                initialized: true,
            });
            self.emit(Opcode::PushId(id));
            self.emit(Opcode::Push(Literal::Text(text)));
            self.emit(Opcode::Assign);
            self.emit(Opcode::Discard);
            return Ok(());
        }

        self.expect('{', "expected '{' to start an array initializer")?;
        let mut elements = Vec::new();
        loop {
            let start = self.ops.len();
            self.parse_expression()?;
            elements.push(self.ops.split_off(start));
            if self.lexer.accept(',') {
                continue;
            }
            self.expect('}', "unmatched '{' in array initializer")?;
            break;
        }

        let count = count.unwrap_or(elements.len());
        if elements.len() > count {
            return Err(self.error(format!(
                "too many initializers for '{}': {} for {} elements",
                id,
                elements.len(),
                count
            )));
        }

        let ty = self.types.array_of(element, count).map_err(|e| self.type_error(e))?;
        self.emit(Opcode::Create {
            ty,
            id: id.clone(),
            initialized: true,
        });
        for (index, element_ops) in elements.into_iter().enumerate() {
            self.emit(Opcode::PushId(id.clone()));
            self.emit(Opcode::Push(Literal::Integer(index as i128)));
            self.emit(Opcode::Index);
            self.ops.extend(element_ops);
            self.emit(Opcode::Assign);
            self.emit(Opcode::Discard);
        }
        Ok(())
    }
}
