//! Content stream lexer.
//!
//! Turns page and form content into operands and operators. Strings, names
//! and numbers decode exactly as in object syntax. Inline image payloads are
//! returned as a single [`Token::InlineImageData`] between `ID` and `EI`.

use crate::error::{PdfError, Result};
use crate::parser::cursor::{ByteCursor, is_whitespace};
use crate::parser::lexer::{
    LexError, at_number, read_hex_string, read_literal_string, read_name, read_number,
};
use bytes::Bytes;

/// Arrays nested deeper than this are rejected.
const MAX_ARRAY_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Operator(String),
    Number(f64),
    Name(String),
    /// Literal or hex string, decoded
    LiteralString(Vec<u8>),
    Array(Vec<Token>),
    DictOpen,
    DictClose,
    Boolean(bool),
    /// Raw bytes between `ID` and `EI`
    InlineImageData(Vec<u8>),
}

impl Token {
    pub fn is_operator(&self, name: &str) -> bool {
        matches!(self, Token::Operator(op) if op == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InlineState {
    None,
    /// `ID` was returned; the payload comes next
    Data,
    /// Payload was returned; the `EI` it ended at comes next
    End,
}

#[derive(Debug, Clone)]
pub struct ContentLexer {
    cur: ByteCursor,
    inline: InlineState,
}

impl ContentLexer {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            cur: ByteCursor::new(data),
            inline: InlineState::None,
        }
    }

    pub fn pos(&self) -> usize {
        self.cur.pos()
    }

    /// Next token, `None` at end of content.
    pub fn next_token(&mut self) -> Option<Result<Token>> {
        match self.inline {
            InlineState::Data => {
                self.inline = InlineState::End;
                return Some(self.read_inline_data().map(Token::InlineImageData));
            }
            InlineState::End => {
                self.inline = InlineState::None;
                return Some(Ok(Token::Operator("EI".to_string())));
            }
            InlineState::None => {}
        }
        let token = self.read_token(0)?;
        if matches!(&token, Ok(t) if t.is_operator("ID")) {
            self.inline = InlineState::Data;
        }
        Some(token)
    }

    fn read_token(&mut self, depth: usize) -> Option<Result<Token>> {
        loop {
            self.cur.skip_whitespace_and_comments();
            let pos = self.cur.pos();
            let b = self.cur.peek()?;
            let token = match b {
                b'/' => Ok(Token::Name(read_name(&mut self.cur))),
                b'(' => read_literal_string(&mut self.cur)
                    .map(Token::LiteralString)
                    .map_err(LexError::into_syntax),
                b'<' if self.cur.peek_at(1) == Some(b'<') => {
                    self.cur.advance(2);
                    Ok(Token::DictOpen)
                }
                b'<' => read_hex_string(&mut self.cur)
                    .map(Token::LiteralString)
                    .map_err(LexError::into_syntax),
                b'>' if self.cur.peek_at(1) == Some(b'>') => {
                    self.cur.advance(2);
                    Ok(Token::DictClose)
                }
                b'[' => {
                    self.cur.next_byte();
                    self.read_array(pos, depth + 1)
                }
                b'{' | b'}' => {
                    self.cur.next_byte();
                    continue;
                }
                _ if at_number(&self.cur) => read_number(&mut self.cur)
                    .map(|n| Token::Number(n.as_f64()))
                    .map_err(LexError::into_syntax),
                _ => {
                    let word = self.cur.take_regular();
                    if word.is_empty() {
                        self.cur.next_byte();
                        Err(PdfError::syntax(format!(
                            "unexpected byte {b:#04x} at offset {pos}"
                        )))
                    } else {
                        Ok(match word {
                            b"true" => Token::Boolean(true),
                            b"false" => Token::Boolean(false),
                            op => Token::Operator(String::from_utf8_lossy(op).into_owned()),
                        })
                    }
                }
            };
            return Some(token);
        }
    }

    /// Reads array elements; the `[` has been consumed.
    fn read_array(&mut self, start: usize, depth: usize) -> Result<Token> {
        if depth > MAX_ARRAY_DEPTH {
            return Err(PdfError::syntax(format!(
                "arrays nested too deeply at offset {start}"
            )));
        }
        let mut items = Vec::new();
        loop {
            self.cur.skip_whitespace_and_comments();
            match self.cur.peek() {
                None => {
                    return Err(PdfError::syntax(format!(
                        "unterminated array at offset {start}"
                    )));
                }
                Some(b']') => {
                    self.cur.next_byte();
                    return Ok(Token::Array(items));
                }
                Some(_) => match self.read_token(depth) {
                    Some(tok) => items.push(tok?),
                    None => {
                        return Err(PdfError::syntax(format!(
                            "unterminated array at offset {start}"
                        )));
                    }
                },
            }
        }
    }

    /// Reads an inline image payload: one whitespace byte after `ID` is
    /// skipped, and the data runs to the first `EI` preceded by whitespace.
    fn read_inline_data(&mut self) -> Result<Vec<u8>> {
        if self.cur.peek().is_some_and(is_whitespace) {
            self.cur.next_byte();
        }
        let start = self.cur.pos();
        let data = self.cur.data().clone();
        let mut search = start;
        loop {
            self.cur.set_pos(search);
            let Some(at) = self.cur.find_forward(b"EI") else {
                self.cur.set_pos(data.len());
                return Err(PdfError::syntax(format!(
                    "inline image at offset {start} has no EI"
                )));
            };
            if at == start || is_whitespace(data[at - 1]) {
                self.cur.set_pos(at + 2);
                let end = if at == start { at } else { at - 1 };
                return Ok(data[start..end].to_vec());
            }
            search = at + 1;
        }
    }
}

impl Iterator for ContentLexer {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(data: &'static [u8]) -> Vec<Token> {
        ContentLexer::new(data).map(|t| t.unwrap()).collect()
    }

    fn op(name: &str) -> Token {
        Token::Operator(name.to_string())
    }

    #[test]
    fn test_operands_and_operators() {
        assert_eq!(
            lex(b"1 0 0 RG /F1 12 Tf (Hi) Tj % note\n[(a) -20 (b)] TJ"),
            vec![
                Token::Number(1.0),
                Token::Number(0.0),
                Token::Number(0.0),
                op("RG"),
                Token::Name("F1".into()),
                Token::Number(12.0),
                op("Tf"),
                Token::LiteralString(b"Hi".to_vec()),
                op("Tj"),
                Token::Array(vec![
                    Token::LiteralString(b"a".to_vec()),
                    Token::Number(-20.0),
                    Token::LiteralString(b"b".to_vec()),
                ]),
                op("TJ"),
            ]
        );
    }

    #[test]
    fn test_dict_and_booleans() {
        assert_eq!(
            lex(b"/Span <</ActualText <FEFF0041> /On true>> BDC"),
            vec![
                Token::Name("Span".into()),
                Token::DictOpen,
                Token::Name("ActualText".into()),
                Token::LiteralString(vec![0xfe, 0xff, 0x00, 0x41]),
                Token::Name("On".into()),
                Token::Boolean(true),
                Token::DictClose,
                op("BDC"),
            ]
        );
    }

    #[test]
    fn test_inline_image_payload() {
        let toks = lex(b"BI /W 2 /H 1 /BPC 8 /CS /G ID \x01EI\xffX EI Q");
        assert_eq!(toks[9], op("ID"));
        assert_eq!(toks[10], Token::InlineImageData(b"\x01EI\xffX".to_vec()));
        assert_eq!(toks[11], op("EI"));
        assert_eq!(toks[12], op("Q"));
    }

    #[test]
    fn test_unterminated_array() {
        let mut lexer = ContentLexer::new(&b"[1 2"[..]);
        assert!(matches!(
            lexer.next_token(),
            Some(Err(PdfError::ContentSyntaxError(_)))
        ));
    }

    #[test]
    fn test_braces_ignored() {
        assert_eq!(lex(b"{ q }"), vec![op("q")]);
    }
}
