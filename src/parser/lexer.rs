//! Lexer (tokenizer) for one statement
//!
//! The lexer never materializes a token stream. It holds a cursor into the
//! statement text and scans the next token on demand, so the parser can
//! [`save`](Lexer::save) a position, look ahead, and [`restore`](Lexer::restore)
//! it without committing to anything.
//!
//! Statement text is cleaned first by [`clean_statement`]: a `//` comment and
//! any trailing `;` are stripped.

use std::fmt;

/// Characters returned as [`Token::Special`]
pub const SPECIALS: &str = ";.,=(){}[]+-*/%&";

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Identifier(String),
    Integer(i128),
    Hex(i128),
    Real(f64),
    Char(u8),
    Str(String),
    Special(char),
    /// A character that starts no token, or a malformed literal
    Invalid(char),
    End,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Identifier(s) => write!(f, "identifier '{}'", s),
            Token::Integer(n) => write!(f, "integer {}", n),
            Token::Hex(n) => write!(f, "integer 0x{:x}", n),
            Token::Real(x) => write!(f, "number {}", x),
            Token::Char(c) => {
                if c.is_ascii_graphic() || *c == b' ' {
                    write!(f, "char literal '{}'", *c as char)
                } else {
                    write!(f, "char literal '\\x{:02x}'", c)
                }
            }
            Token::Str(s) => write!(f, "string literal {:?}", s),
            Token::Special(c) => write!(f, "'{}'", c),
            Token::Invalid(c) => write!(f, "unexpected character '{}'", c),
            Token::End => write!(f, "end of statement"),
        }
    }
}

/// A saved lexer position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor(usize);

/// Strip an inline `//` comment, surrounding whitespace and trailing `;`s.
/// Comment markers inside string and char literals are left alone.
pub fn clean_statement(text: &str) -> &str {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut end = text.len();
    let mut previous_slash = false;

    for (i, ch) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            '/' if previous_slash => {
                end = i - 1;
                break;
            }
            _ => {}
        }
        previous_slash = ch == '/';
    }

    text[..end].trim().trim_end_matches(';').trim_end()
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
}

impl Lexer {
    pub fn new(statement: &str) -> Self {
        Self {
            input: clean_statement(statement).chars().collect(),
            position: 0,
        }
    }

    pub fn save(&self) -> Cursor {
        Cursor(self.position)
    }

    pub fn restore(&mut self, cursor: Cursor) {
        self.position = cursor.0;
    }

    /// 1-based column of the next token
    pub fn column(&mut self) -> usize {
        self.skip_whitespace();
        self.position + 1
    }

    pub fn is_at_end(&mut self) -> bool {
        self.skip_whitespace();
        self.position >= self.input.len()
    }

    /// Scan the next token without consuming it
    pub fn peek_token(&mut self) -> Token {
        let cursor = self.save();
        let token = self.next_token();
        self.restore(cursor);
        token
    }

    /// Consume the special character `c` if it comes next
    pub fn accept(&mut self, c: char) -> bool {
        let cursor = self.save();
        if self.next_token() == Token::Special(c) {
            true
        } else {
            self.restore(cursor);
            false
        }
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();
        let Some(ch) = self.advance() else {
            return Token::End;
        };

        match ch {
            '"' => self.string_literal(),
            '\'' => self.char_literal(),
            '0'..='9' => self.number_literal(ch),
            'a'..='z' | 'A'..='Z' | '_' => self.identifier(ch),
            c if SPECIALS.contains(c) => Token::Special(c),
            c => Token::Invalid(c),
        }
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_ahead(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.position += 1;
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.position += 1;
        }
    }

    fn escape(&mut self) -> Option<u8> {
        let escaped = self.advance()?;
        let byte = match escaped {
            'n' => b'\n',
            't' => b'\t',
            'r' => b'\r',
            '\\' => b'\\',
            '\'' => b'\'',
            '"' => b'"',
            '0' => 0,
            'x' => {
                let hex: String = [self.advance()?, self.advance()?].iter().collect();
                u8::from_str_radix(&hex, 16).ok()?
            }
            _ => return None,
        };
        Some(byte)
    }

    fn string_literal(&mut self) -> Token {
        let mut text = String::new();
        while let Some(ch) = self.advance() {
            match ch {
                '"' => return Token::Str(text),
                '\\' => match self.escape() {
                    Some(byte) => text.push(byte as char),
                    None => return Token::Invalid('\\'),
                },
                c if c.is_ascii() => text.push(c),
                c => return Token::Invalid(c),
            }
        }
        Token::Invalid('"')
    }

    fn char_literal(&mut self) -> Token {
        let value = match self.advance() {
            Some('\\') => self.escape(),
            Some(c) if c.is_ascii() && c != '\'' => Some(c as u8),
            _ => None,
        };
        match (value, self.advance()) {
            (Some(byte), Some('\'')) => Token::Char(byte),
            _ => Token::Invalid('\''),
        }
    }

    fn take_while(&mut self, accept: impl Fn(char) -> bool) -> String {
        let mut text = String::new();
        while let Some(ch) = self.peek().filter(|&c| accept(c)) {
            text.push(ch);
            self.position += 1;
        }
        text
    }

    fn number_literal(&mut self, first_digit: char) -> Token {
        if first_digit == '0' && matches!(self.peek(), Some('x') | Some('X')) {
            self.position += 1;
            let digits = self.take_while(|c| c.is_ascii_hexdigit());
            return match i128::from_str_radix(&digits, 16) {
                Ok(value) => Token::Hex(value),
                Err(_) => Token::Invalid('x'),
            };
        }

        let mut text = String::from(first_digit);
        text.push_str(&self.take_while(|c| c.is_ascii_digit()));

        let mut real = false;
        if self.peek() == Some('.') && self.peek_ahead(1).is_some_and(|c| c.is_ascii_digit()) {
            real = true;
            self.position += 1;
            text.push('.');
            text.push_str(&self.take_while(|c| c.is_ascii_digit()));
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            let sign = matches!(self.peek_ahead(1), Some('+') | Some('-'));
            let digit_at = if sign { 2 } else { 1 };
            if self.peek_ahead(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                real = true;
                for _ in 0..digit_at {
                    text.push(self.input[self.position]);
                    self.position += 1;
                }
                text.push_str(&self.take_while(|c| c.is_ascii_digit()));
            }
        }

        if real {
            text.parse().map(Token::Real).unwrap_or(Token::Invalid(first_digit))
        } else {
            text.parse().map(Token::Integer).unwrap_or(Token::Invalid(first_digit))
        }
    }

    fn identifier(&mut self, first_char: char) -> Token {
        let mut name = String::from(first_char);
        name.push_str(&self.take_while(|c| c.is_ascii_alphanumeric() || c == '_'));
        Token::Identifier(name)
    }
}
