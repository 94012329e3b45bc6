//! Expression parsing
//!
//! All binary operators share one precedence level and associate to the left,
//! so `1 + 2 * 3` is `(1 + 2) * 3`.
//!
//! ```text
//! expression := term (('+' | '-' | '*' | '/' | '%') term)*
//! term       := '-' term | '+' term | '*'+ term | '&' term
//!             | 'new' type ['[' expression ']'] | 'delete' ['[' ']'] term
//!             | postfix
//! postfix    := primary ('[' expression ']')*
//! primary    := literal | 'null' | '(' expression ')' | name ['(' arguments ')']
//! ```

use super::parser::{ParseError, Parser};
use crate::memory::value::Literal;
use crate::parser::identifier::Identifier;
use crate::parser::lexer::Token;
use crate::parser::opcode::{BinaryOp, Opcode};
use crate::types::Primitive;

impl Parser<'_> {
    pub(super) fn parse_expression(&mut self) -> Result<(), ParseError> {
        self.parse_term()?;

        loop {
            let cursor = self.lexer.save();
            let op = match self.lexer.next_token() {
                Token::Special(c) => BinaryOp::from_char(c),
                _ => None,
            };
            let Some(op) = op else {
                self.lexer.restore(cursor);
                return Ok(());
            };
            self.parse_term()?;
            self.emit(Opcode::Binary(op));
        }
    }

    pub(super) fn parse_term(&mut self) -> Result<(), ParseError> {
        match self.lexer.peek_token() {
            Token::Special('-') => {
                self.lexer.next_token();
                self.emit(Opcode::Push(Literal::Integer(0)));
                self.parse_term()?;
                self.emit(Opcode::Binary(BinaryOp::Sub));
                Ok(())
            }
            Token::Special('+') => {
                self.lexer.next_token();
                self.parse_term()
            }
            Token::Special('*') => {
                let mut levels = 0;
                while self.lexer.accept('*') {
                    levels += 1;
                }
                self.parse_term()?;
                self.emit(Opcode::Dereference { levels });
                Ok(())
            }
            Token::Special('&') => {
                self.lexer.next_token();
                self.parse_term()?;
                self.emit(Opcode::AddressOf);
                Ok(())
            }
            Token::Identifier(word) if word == "new" => {
                self.lexer.next_token();
                self.parse_new()
            }
            Token::Identifier(word) if word == "delete" => {
                self.lexer.next_token();
                self.parse_delete()
            }
            _ => self.parse_postfix(),
        }
    }

    /// After `new`
    fn parse_new(&mut self) -> Result<(), ParseError> {
        if !self.at_declaration() {
            return Err(self.error("expected a type after 'new'"));
        }
        let ty = self.parse_type()?;
        self.emit(Opcode::Push(Literal::Type(ty)));

        if self.lexer.accept('[') {
            self.parse_expression()?;
            self.expect(']', "unmatched '[' after 'new'")?;
            self.emit(Opcode::Call {
                name: "new[]".to_string(),
                argc: 2,
            });
        } else {
            self.emit(Opcode::Call {
                name: "new".to_string(),
                argc: 1,
            });
        }
        Ok(())
    }

    /// After `delete`
    fn parse_delete(&mut self) -> Result<(), ParseError> {
        if self.lexer.accept('[') {
            self.expect(']', "expected ']' after 'delete['")?;
        }
        if self.lexer.is_at_end() {
            return Err(self.error("expected an expression after 'delete'"));
        }
        self.parse_term()?;
        self.emit(Opcode::Call {
            name: "delete".to_string(),
            argc: 1,
        });
        Ok(())
    }

    fn parse_postfix(&mut self) -> Result<(), ParseError> {
        self.parse_primary()?;
        while self.lexer.accept('[') {
            self.parse_expression()?;
            self.expect(']', "unmatched '['")?;
            self.emit(Opcode::Index);
        }
        Ok(())
    }

    fn parse_primary(&mut self) -> Result<(), ParseError> {
        match self.lexer.next_token() {
            Token::Integer(n) | Token::Hex(n) => self.emit(Opcode::Push(Literal::Integer(n))),
            Token::Real(x) => self.emit(Opcode::Push(Literal::Float(x))),
            Token::Char(c) => self.emit(Opcode::Push(Literal::Char(c))),
            Token::Str(s) => self.emit(Opcode::Push(Literal::Text(s))),
            Token::Special('(') => {
                self.parse_expression()?;
                self.expect(')', "unmatched '('")?;
            }
            Token::Identifier(name) if name == "null" || name == "NULL" => {
                let any = self.types.primitive(Primitive::Any);
                let any_ptr = self.types.pointer_to(any).map_err(|e| self.type_error(e))?;
                self.emit(Opcode::PushTyped(Literal::Integer(0), any_ptr));
            }
            Token::Identifier(name) => {
                if self.lexer.accept('(') {
                    return self.parse_call(name);
                }
                if self.is_type_name(&name) {
                    return Err(self.error(format!("type '{}' used as a value", name)));
                }
                let id = Identifier::new(&name).map_err(|_| ParseError::InvalidIdentifier {
                    name: name.clone(),
                })?;
                self.emit(Opcode::PushId(id));
            }
            other => return Err(self.error(format!("expected a value, found {}", other))),
        }
        Ok(())
    }

    /// After `name(`
    fn parse_call(&mut self, name: String) -> Result<(), ParseError> {
        if !self.is_type_name(&name) && self.symbols.get_str(&name).is_some() {
            return Err(self.error(format!("'{}' is a variable, not a function", name)));
        }

        let mut argc = 0;
        if !self.lexer.accept(')') {
            loop {
                self.parse_argument()?;
                argc += 1;
                if self.lexer.accept(',') {
                    continue;
                }
                self.expect(')', &format!("unmatched '(' in call to '{}'", name))?;
                break;
            }
        }

        self.emit(Opcode::Call { name, argc });
        Ok(())
    }

    /// Arguments may be bare types, as in `sizeof(int*)`
    fn parse_argument(&mut self) -> Result<(), ParseError> {
        if self.at_declaration() {
            let ty = self.parse_type()?;
            self.emit(Opcode::Push(Literal::Type(ty)));
            Ok(())
        } else {
            self.parse_expression()
        }
    }
}
