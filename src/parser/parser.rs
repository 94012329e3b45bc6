use crate::interpreter::errors::MachineError;
use crate::parser::identifier::Identifier;
use crate::parser::lexer::{Lexer, Token};
use crate::parser::opcode::Opcode;
use crate::symbols::SymbolTable;
use crate::types::TypeSystem;
use thiserror::Error;

/// Errors found before any opcode runs
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("syntax error at column {column}: {message}")]
    Syntax { message: String, column: usize },

    #[error("reference '{name}' must be initialized where it is declared")]
    UninitializedReference { name: String },

    #[error("invalid identifier '{name}'")]
    InvalidIdentifier { name: String },
}

/// Words that can never name a variable
pub(crate) const RESERVED_WORDS: [&str; 4] = ["new", "delete", "null", "NULL"];

/// Recursive descent parser for one statement
///
/// The parser evaluates nothing. It consults the type catalog to tell type
/// names from identifiers (interning any derived types it meets) and the
/// symbol table to reject calls through variable names.
pub struct Parser<'a> {
    pub(super) lexer: Lexer,
    pub(super) types: &'a mut TypeSystem,
    pub(super) symbols: &'a SymbolTable,
    pub(super) ops: Vec<Opcode>,
}

impl<'a> Parser<'a> {
    pub fn new(statement: &str, types: &'a mut TypeSystem, symbols: &'a SymbolTable) -> Self {
        Parser {
            lexer: Lexer::new(statement),
            types,
            symbols,
            ops: Vec::new(),
        }
    }

    /// Parse the whole statement. An empty statement yields no opcodes.
    pub fn parse(mut self) -> Result<Vec<Opcode>, ParseError> {
        if self.lexer.is_at_end() {
            return Ok(self.ops);
        }

        if self.at_declaration() {
            self.parse_declaration()?;
        } else {
            self.parse_assignment_or_expression()?;
        }

        if !self.lexer.is_at_end() {
            let token = self.lexer.peek_token();
            return Err(self.error(format!("unexpected {}", token)));
        }
        Ok(self.ops)
    }

    /// `lvalue = expression`, or a plain expression when no `=` follows the
    /// leading term
    fn parse_assignment_or_expression(&mut self) -> Result<(), ParseError> {
        let cursor = self.lexer.save();
        let start = self.ops.len();

        if self.parse_term().is_ok() && self.lexer.accept('=') {
            self.parse_expression()?;
            self.emit(Opcode::Assign);
            return Ok(());
        }

        self.lexer.restore(cursor);
        self.ops.truncate(start);
        self.parse_expression()
    }

    pub(super) fn emit(&mut self, op: Opcode) {
        self.ops.push(op);
    }

    pub(super) fn error(&mut self, message: impl Into<String>) -> ParseError {
        ParseError::Syntax {
            message: message.into(),
            column: self.lexer.column(),
        }
    }

    /// Turn a type-building failure into a syntax error at the cursor
    pub(super) fn type_error(&mut self, err: MachineError) -> ParseError {
        self.error(err.to_string())
    }

    pub(super) fn expect(&mut self, c: char, message: &str) -> Result<(), ParseError> {
        if self.lexer.accept(c) {
            Ok(())
        } else {
            Err(self.error(message))
        }
    }

    pub(super) fn is_type_name(&self, name: &str) -> bool {
        self.types.is_type_name(name)
    }

    /// Read a name for a new variable
    pub(super) fn parse_identifier(&mut self) -> Result<Identifier, ParseError> {
        match self.lexer.next_token() {
            Token::Identifier(name) => {
                if self.is_type_name(&name) || RESERVED_WORDS.contains(&name.as_str()) {
                    return Err(ParseError::InvalidIdentifier { name });
                }
                Identifier::new(&name).map_err(|_| ParseError::InvalidIdentifier { name })
            }
            other => Err(self.error(format!("expected an identifier, found {}", other))),
        }
    }
}

/// Parse one statement against the current catalog and symbols
pub fn parse_statement(
    statement: &str,
    types: &mut TypeSystem,
    symbols: &SymbolTable,
) -> Result<Vec<Opcode>, ParseError> {
    Parser::new(statement, types, symbols).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::value::Literal;
    use crate::parser::opcode::BinaryOp;
    use crate::symbols::AllocationPolicy;
    use crate::types::Primitive;

    fn setup() -> (TypeSystem, SymbolTable) {
        (
            TypeSystem::new(4).unwrap(),
            SymbolTable::new(256, 4, AllocationPolicy::Aligned, 1),
        )
    }

    fn parse(text: &str) -> Result<Vec<Opcode>, ParseError> {
        let (mut types, symbols) = setup();
        parse_statement(text, &mut types, &symbols)
    }

    fn id(name: &str) -> Identifier {
        Identifier::new(name).unwrap()
    }

    #[test]
    fn test_empty_statement() {
        assert_eq!(parse("  ;  // nothing").unwrap(), vec![]);
    }

    #[test]
    fn test_plain_declaration() {
        let (mut types, symbols) = setup();
        let ops = parse_statement("int x;", &mut types, &symbols).unwrap();
        assert_eq!(
            ops,
            vec![Opcode::Create {
                ty: types.primitive(Primitive::Int),
                id: id("x"),
                initialized: false
            }]
        );
    }

    #[test]
    fn test_initialized_pointer_declaration() {
        let (mut types, symbols) = setup();
        let ops = parse_statement("int* p = &x", &mut types, &symbols).unwrap();
        let int_ptr = types.pointer_to(types.primitive(Primitive::Int)).unwrap();
        assert_eq!(
            ops,
            vec![
                Opcode::PushId(id("x")),
                Opcode::AddressOf,
                Opcode::Create {
                    ty: int_ptr,
                    id: id("p"),
                    initialized: true
                },
            ]
        );
    }

    #[test]
    fn test_left_to_right_arithmetic() {
        let ops = parse("1 + 2 * 3").unwrap();
        assert_eq!(
            ops,
            vec![
                Opcode::Push(Literal::Integer(1)),
                Opcode::Push(Literal::Integer(2)),
                Opcode::Binary(BinaryOp::Add),
                Opcode::Push(Literal::Integer(3)),
                Opcode::Binary(BinaryOp::Mul),
            ]
        );
    }

    #[test]
    fn test_dereference_assignment() {
        let ops = parse("**pp = 7").unwrap();
        assert_eq!(
            ops,
            vec![
                Opcode::PushId(id("pp")),
                Opcode::Dereference { levels: 2 },
                Opcode::Push(Literal::Integer(7)),
                Opcode::Assign,
            ]
        );
    }

    #[test]
    fn test_dereference_without_assignment() {
        let ops = parse("*p + 1").unwrap();
        assert_eq!(ops[1], Opcode::Dereference { levels: 1 });
        assert_eq!(ops.last(), Some(&Opcode::Binary(BinaryOp::Add)));
    }

    #[test]
    fn test_allocation_forms() {
        let (mut types, symbols) = setup();
        let int = types.primitive(Primitive::Int);

        let ops = parse_statement("new int[5]", &mut types, &symbols).unwrap();
        assert_eq!(
            ops,
            vec![
                Opcode::Push(Literal::Type(int)),
                Opcode::Push(Literal::Integer(5)),
                Opcode::Call {
                    name: "new[]".into(),
                    argc: 2
                },
            ]
        );

        let ops = parse_statement("delete p", &mut types, &symbols).unwrap();
        assert_eq!(
            ops,
            vec![
                Opcode::PushId(id("p")),
                Opcode::Call {
                    name: "delete".into(),
                    argc: 1
                },
            ]
        );
    }

    #[test]
    fn test_calls_and_type_arguments() {
        let (mut types, symbols) = setup();
        let ops = parse_statement("sizeof(double*)", &mut types, &symbols).unwrap();
        let dbl_ptr = types.pointer_to(types.primitive(Primitive::Double)).unwrap();
        assert_eq!(ops[0], Opcode::Push(Literal::Type(dbl_ptr)));

        let ops = parse_statement("int(3.7)", &mut types, &symbols).unwrap();
        assert_eq!(
            ops,
            vec![
                Opcode::Push(Literal::Float(3.7)),
                Opcode::Call {
                    name: "int".into(),
                    argc: 1
                },
            ]
        );
    }

    #[test]
    fn test_array_initializer_list() {
        let ops = parse("int a[] = {4, 5}").unwrap();
        assert!(matches!(
            ops[0],
            Opcode::Create {
                initialized: true,
                ..
            }
        ));
        let assigns = ops.iter().filter(|op| **op == Opcode::Assign).count();
        assert_eq!(assigns, 2);
        assert_eq!(ops.last(), Some(&Opcode::Discard));
    }

    #[test]
    fn test_uninitialized_reference() {
        assert_eq!(
            parse("int& r;"),
            Err(ParseError::UninitializedReference {
                name: "r".to_string()
            })
        );
    }

    #[test]
    fn test_syntax_errors() {
        for text in [
            "(1 + 2",
            "a[1",
            "int x 5",
            "new",
            "new 5",
            "delete",
            "1 +",
            "x @ y",
            "int a[2] = 5",
        ] {
            assert!(
                matches!(parse(text), Err(ParseError::Syntax { .. })),
                "{} should not parse",
                text
            );
        }
    }

    #[test]
    fn test_invalid_identifiers() {
        assert!(matches!(
            parse("int double = 1"),
            Err(ParseError::InvalidIdentifier { .. })
        ));
        let long = format!("int {} = 1", "a".repeat(40));
        assert!(matches!(
            parse(&long),
            Err(ParseError::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn test_variables_are_not_callable() {
        let (mut types, mut symbols) = setup();
        let int = types.primitive(Primitive::Int);
        let address = symbols.allocate(4).unwrap();
        symbols
            .insert(crate::symbols::Variable::new(id("x"), int, address, &types))
            .unwrap();
        assert!(parse_statement("x(1)", &mut types, &symbols).is_err());
        assert!(parse_statement("x + 1", &mut types, &symbols).is_ok());
    }

    #[test]
    fn test_null_is_a_typed_literal() {
        let (mut types, symbols) = setup();
        let ops = parse_statement("null", &mut types, &symbols).unwrap();
        let any_ptr = types.pointer_to(types.primitive(Primitive::Any)).unwrap();
        assert_eq!(ops, vec![Opcode::PushTyped(Literal::Integer(0), any_ptr)]);
    }
}
