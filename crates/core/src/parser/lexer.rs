//! Token scanner for PDF object syntax.
//!
//! The string, name and number readers are shared with the content-stream
//! lexer so both decode escapes the same way.

use super::cursor::{ByteCursor, is_regular, is_whitespace};
use crate::error::{PdfError, Result};
use bytes::Bytes;

/// Scanner failure; the caller decides which error kind it becomes.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LexError {
    pub pos: usize,
    pub msg: &'static str,
}

impl LexError {
    pub(crate) fn into_malformed(self) -> PdfError {
        PdfError::malformed(self.pos, self.msg)
    }

    pub(crate) fn into_syntax(self) -> PdfError {
        PdfError::syntax(format!("{} at offset {}", self.msg, self.pos))
    }
}

/// Numeric token value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Number {
    Int(i64),
    Real(f64),
}

impl Number {
    pub(crate) fn as_f64(self) -> f64 {
        match self {
            Number::Int(n) => n as f64,
            Number::Real(r) => r,
        }
    }
}

/// Object-level tokens.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Int(i64),
    Real(f64),
    Bool(bool),
    Null,
    Name(String),
    String(Vec<u8>),
    ArrayStart,
    ArrayEnd,
    DictStart,
    DictEnd,
    /// Any other regular-character run: `R`, `obj`, `stream`, `trailer`, ...
    Keyword(Vec<u8>),
}

impl Token {
    pub fn is_keyword(&self, kw: &[u8]) -> bool {
        matches!(self, Token::Keyword(k) if k == kw)
    }
}

/// Reads a literal string; the cursor sits on the opening `(`.
///
/// Escapes are decoded, nested balanced parentheses are kept, and a bare CR
/// or CRLF becomes a single LF.
pub(crate) fn read_literal_string(cur: &mut ByteCursor) -> std::result::Result<Vec<u8>, LexError> {
    let start = cur.pos();
    cur.next_byte();
    let mut out = Vec::new();
    let mut depth = 1usize;
    loop {
        let Some(b) = cur.next_byte() else {
            return Err(LexError {
                pos: start,
                msg: "unterminated literal string",
            });
        };
        match b {
            b'(' => {
                depth += 1;
                out.push(b);
            }
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(out);
                }
                out.push(b);
            }
            b'\r' => {
                cur.eat(b"\n");
                out.push(b'\n');
            }
            b'\\' => {
                let Some(esc) = cur.next_byte() else {
                    return Err(LexError {
                        pos: start,
                        msg: "unterminated literal string",
                    });
                };
                match esc {
                    b'n' => out.push(b'\n'),
                    b'r' => out.push(b'\r'),
                    b't' => out.push(b'\t'),
                    b'b' => out.push(0x08),
                    b'f' => out.push(0x0c),
                    b'(' | b')' | b'\\' => out.push(esc),
                    b'\r' => {
                        cur.eat(b"\n");
                    }
                    b'\n' => {}
                    b'0'..=b'7' => {
                        let mut value = u32::from(esc - b'0');
                        for _ in 0..2 {
                            match cur.peek() {
                                Some(d @ b'0'..=b'7') => {
                                    cur.next_byte();
                                    value = value * 8 + u32::from(d - b'0');
                                }
                                _ => break,
                            }
                        }
                        out.push((value & 0xff) as u8);
                    }
                    // Unknown escapes drop the backslash.
                    other => out.push(other),
                }
            }
            other => out.push(other),
        }
    }
}

pub(crate) fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Reads a hex string; the cursor sits on the opening `<`. An odd final
/// nibble is padded with zero.
pub(crate) fn read_hex_string(cur: &mut ByteCursor) -> std::result::Result<Vec<u8>, LexError> {
    let start = cur.pos();
    cur.next_byte();
    let mut out = Vec::new();
    let mut high: Option<u8> = None;
    loop {
        match cur.next_byte() {
            Some(b'>') => break,
            Some(c) if is_whitespace(c) => {}
            Some(c) => {
                let Some(nibble) = hex_value(c) else {
                    return Err(LexError {
                        pos: cur.pos() - 1,
                        msg: "invalid character in hex string",
                    });
                };
                match high.take() {
                    Some(h) => out.push((h << 4) | nibble),
                    None => high = Some(nibble),
                }
            }
            None => {
                return Err(LexError {
                    pos: start,
                    msg: "unterminated hex string",
                });
            }
        }
    }
    if let Some(h) = high {
        out.push(h << 4);
    }
    Ok(out)
}

/// Reads a name; the cursor sits on the `/`. `#xx` escapes are decoded and
/// the bytes are mapped one-to-one onto chars.
pub(crate) fn read_name(cur: &mut ByteCursor) -> String {
    cur.next_byte();
    let mut bytes = Vec::new();
    while let Some(b) = cur.peek() {
        if !is_regular(b) {
            break;
        }
        cur.next_byte();
        if b == b'#'
            && let (Some(h), Some(l)) = (
                cur.peek().and_then(hex_value),
                cur.peek_at(1).and_then(hex_value),
            )
        {
            cur.advance(2);
            bytes.push((h << 4) | l);
            continue;
        }
        bytes.push(b);
    }
    name_from_bytes(&bytes)
}

pub(crate) fn name_from_bytes(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// True if the cursor sits at the start of a number.
pub(crate) fn at_number(cur: &ByteCursor) -> bool {
    match cur.peek() {
        Some(b'0'..=b'9') => true,
        Some(b'+' | b'-') => matches!(cur.peek_at(1), Some(b'0'..=b'9' | b'.')),
        Some(b'.') => matches!(cur.peek_at(1), Some(b'0'..=b'9')),
        _ => false,
    }
}

/// Reads a number without exponent notation. Integers that overflow `i64`
/// become reals.
pub(crate) fn read_number(cur: &mut ByteCursor) -> std::result::Result<Number, LexError> {
    let start = cur.pos();
    let mut text = String::new();
    if let Some(sign @ (b'+' | b'-')) = cur.peek() {
        cur.next_byte();
        if sign == b'-' {
            text.push('-');
        }
    }
    // Some writers emit doubled signs such as "--5".
    while matches!(cur.peek(), Some(b'-' | b'+')) {
        cur.next_byte();
    }
    let mut has_dot = false;
    while let Some(b) = cur.peek() {
        match b {
            b'0'..=b'9' => text.push(char::from(b)),
            b'.' if !has_dot => {
                has_dot = true;
                text.push('.');
            }
            _ => break,
        }
        cur.next_byte();
    }
    let err = LexError {
        pos: start,
        msg: "invalid number",
    };
    if !text.bytes().any(|b| b.is_ascii_digit()) {
        return Err(err);
    }
    if has_dot {
        let text = if text.ends_with('.') {
            &text[..text.len() - 1]
        } else {
            &text
        };
        return text.parse::<f64>().map(Number::Real).map_err(|_| err);
    }
    match text.parse::<i64>() {
        Ok(n) => Ok(Number::Int(n)),
        Err(_) => text.parse::<f64>().map(Number::Real).map_err(|_| err),
    }
}

/// Object-syntax tokenizer.
#[derive(Debug, Clone)]
pub struct Lexer {
    cur: ByteCursor,
}

impl Lexer {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            cur: ByteCursor::new(data),
        }
    }

    pub fn from_cursor(cur: ByteCursor) -> Self {
        Self { cur }
    }

    pub fn cursor(&self) -> &ByteCursor {
        &self.cur
    }

    pub fn cursor_mut(&mut self) -> &mut ByteCursor {
        &mut self.cur
    }

    pub fn pos(&self) -> usize {
        self.cur.pos()
    }

    pub fn set_pos(&mut self, pos: usize) {
        self.cur.set_pos(pos);
    }

    /// Next token with its starting offset, `None` at end of input.
    pub fn next_token(&mut self) -> Option<Result<(usize, Token)>> {
        self.cur.skip_whitespace_and_comments();
        let pos = self.cur.pos();
        let b = self.cur.peek()?;
        let token = match b {
            b'/' => Ok(Token::Name(read_name(&mut self.cur))),
            b'(' => read_literal_string(&mut self.cur)
                .map(Token::String)
                .map_err(LexError::into_malformed),
            b'<' if self.cur.peek_at(1) == Some(b'<') => {
                self.cur.advance(2);
                Ok(Token::DictStart)
            }
            b'<' => read_hex_string(&mut self.cur)
                .map(Token::String)
                .map_err(LexError::into_malformed),
            b'>' if self.cur.peek_at(1) == Some(b'>') => {
                self.cur.advance(2);
                Ok(Token::DictEnd)
            }
            b'[' => {
                self.cur.next_byte();
                Ok(Token::ArrayStart)
            }
            b']' => {
                self.cur.next_byte();
                Ok(Token::ArrayEnd)
            }
            _ if at_number(&self.cur) => read_number(&mut self.cur)
                .map(|n| match n {
                    Number::Int(i) => Token::Int(i),
                    Number::Real(r) => Token::Real(r),
                })
                .map_err(LexError::into_malformed),
            _ => {
                let word = self.cur.take_regular();
                if word.is_empty() {
                    self.cur.next_byte();
                    Err(PdfError::malformed(pos, format!("unexpected byte {b:#04x}")))
                } else {
                    Ok(match word {
                        b"true" => Token::Bool(true),
                        b"false" => Token::Bool(false),
                        b"null" => Token::Null,
                        other => Token::Keyword(other.to_vec()),
                    })
                }
            }
        };
        Some(token.map(|t| (pos, t)))
    }
}
