//! PDF object parser - turns object syntax into [`PDFObject`] values.
//!
//! Recursive descent over [`Lexer`] tokens. The `objid genno R` production
//! is recognised with a two-token lookahead buffer; references are returned
//! as-is and never resolved here.

use super::cursor::ByteCursor;
use super::lexer::{Lexer, Token};
use crate::error::{PdfError, Result};
use crate::model::objects::{PDFDict, PDFObjRef, PDFObject, PDFStream};
use bytes::Bytes;
use smallvec::SmallVec;

/// Arrays and dictionaries nested deeper than this are rejected.
const MAX_NESTING: usize = 256;

/// Object found at an `N G obj` header.
#[derive(Debug, Clone, PartialEq)]
pub struct IndirectObject {
    pub objref: PDFObjRef,
    pub object: PDFObject,
}

pub struct PDFParser {
    lexer: Lexer,
    /// Tokens read ahead, front first
    lookahead: SmallVec<[(usize, Token); 2]>,
    depth: usize,
}

impl PDFParser {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            lexer: Lexer::new(data),
            lookahead: SmallVec::new(),
            depth: 0,
        }
    }

    /// Position of the next unread token.
    pub fn pos(&self) -> usize {
        self.lookahead
            .first()
            .map_or_else(|| self.lexer.pos(), |(pos, _)| *pos)
    }

    pub fn set_pos(&mut self, pos: usize) {
        self.lookahead.clear();
        self.lexer.set_pos(pos);
    }

    pub fn data(&self) -> &Bytes {
        self.lexer.cursor().data()
    }

    fn fill(&mut self, n: usize) -> Result<()> {
        while self.lookahead.len() < n {
            match self.lexer.next_token() {
                Some(tok) => self.lookahead.push(tok?),
                None => break,
            }
        }
        Ok(())
    }

    pub fn next_token(&mut self) -> Result<Option<(usize, Token)>> {
        self.fill(1)?;
        if self.lookahead.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.lookahead.remove(0)))
    }

    /// Peeks `i` tokens ahead (0 is the next token).
    pub fn peek(&mut self, i: usize) -> Result<Option<&Token>> {
        self.fill(i + 1)?;
        Ok(self.lookahead.get(i).map(|(_, t)| t))
    }

    /// Parses the value at `offset`.
    pub fn parse_object_at(&mut self, offset: usize) -> Result<PDFObject> {
        self.set_pos(offset);
        self.parse_object()
    }

    /// Parses the next complete value.
    pub fn parse_object(&mut self) -> Result<PDFObject> {
        let pos = self.pos();
        let (pos, token) = self
            .next_token()?
            .ok_or_else(|| PdfError::malformed(pos, "unexpected end of data"))?;
        self.token_to_object(pos, token)
    }

    fn token_to_object(&mut self, pos: usize, token: Token) -> Result<PDFObject> {
        match token {
            Token::Int(n) => {
                if let Some(r) = self.try_reference(n)? {
                    return Ok(PDFObject::Ref(r));
                }
                Ok(PDFObject::Int(n))
            }
            Token::Real(r) => Ok(PDFObject::Real(r)),
            Token::Bool(b) => Ok(PDFObject::Bool(b)),
            Token::Null => Ok(PDFObject::Null),
            Token::Name(n) => Ok(PDFObject::Name(n)),
            Token::String(s) => Ok(PDFObject::String(s)),
            Token::ArrayStart => self.nested(pos, Self::parse_array),
            Token::DictStart => self.nested(pos, |p| p.parse_dict().map(PDFObject::Dict)),
            Token::ArrayEnd | Token::DictEnd => Err(PdfError::malformed(pos, "unbalanced delimiter")),
            Token::Keyword(kw) => Err(PdfError::malformed(
                pos,
                format!("unexpected keyword `{}`", String::from_utf8_lossy(&kw)),
            )),
        }
    }

    fn nested(
        &mut self,
        pos: usize,
        f: impl FnOnce(&mut Self) -> Result<PDFObject>,
    ) -> Result<PDFObject> {
        if self.depth >= MAX_NESTING {
            return Err(PdfError::malformed(pos, "objects nested too deeply"));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// `n` has been read; consumes `genno R` if they follow.
    fn try_reference(&mut self, n: i64) -> Result<Option<PDFObjRef>> {
        let genno = match self.peek(0)? {
            Some(Token::Int(g)) => *g,
            _ => return Ok(None),
        };
        if !matches!(self.peek(1)?, Some(t) if t.is_keyword(b"R")) {
            return Ok(None);
        }
        let (Ok(objid), Ok(genno)) = (u32::try_from(n), u32::try_from(genno)) else {
            return Ok(None);
        };
        self.lookahead.drain(..2);
        Ok(Some(PDFObjRef::new(objid, genno)))
    }

    fn parse_array(&mut self) -> Result<PDFObject> {
        let mut items = Vec::new();
        loop {
            let pos = self.pos();
            match self.next_token()? {
                Some((_, Token::ArrayEnd)) => return Ok(PDFObject::Array(items)),
                Some((pos, tok)) => items.push(self.token_to_object(pos, tok)?),
                None => return Err(PdfError::malformed(pos, "unterminated array")),
            }
        }
    }

    fn parse_dict(&mut self) -> Result<PDFDict> {
        let mut dict = PDFDict::new();
        loop {
            let pos = self.pos();
            let key = match self.next_token()? {
                Some((_, Token::DictEnd)) => return Ok(dict),
                Some((_, Token::Name(key))) => key,
                Some((pos, _)) => return Err(PdfError::malformed(pos, "expected name as dict key")),
                None => return Err(PdfError::malformed(pos, "unterminated dictionary")),
            };
            // `<< /Key >>` reads as a null value.
            if matches!(self.peek(0)?, Some(Token::DictEnd)) {
                dict.insert(key, PDFObject::Null);
                continue;
            }
            let value = self.parse_object()?;
            dict.insert(key, value);
        }
    }

    /// Parses `N G obj <object> [stream ... endstream] endobj` at `offset`.
    ///
    /// `resolve_length` is consulted when a stream's `/Length` is an indirect
    /// reference; it may see a partially built cross-reference table and return
    /// `None`, in which case the body is delimited by scanning for `endstream`.
    pub fn parse_indirect_at(
        &mut self,
        offset: usize,
        resolve_length: &mut dyn FnMut(PDFObjRef) -> Option<i64>,
    ) -> Result<IndirectObject> {
        self.set_pos(offset);
        let objref = self.read_object_header(offset)?;
        let object = self.parse_object()?;
        let object = match object {
            PDFObject::Dict(dict) if matches!(self.peek(0)?, Some(t) if t.is_keyword(b"stream")) => {
                self.lookahead.clear();
                let mut stream = self.read_stream_body(dict, resolve_length)?;
                stream.set_objid(objref.objid, objref.genno);
                PDFObject::Stream(Box::new(stream))
            }
            other => other,
        };
        if matches!(self.peek(0)?, Some(t) if t.is_keyword(b"endobj")) {
            self.next_token()?;
        }
        Ok(IndirectObject { objref, object })
    }

    fn read_object_header(&mut self, offset: usize) -> Result<PDFObjRef> {
        let bad = || PdfError::malformed(offset, "expected `N G obj` header");
        let objid = match self.next_token()? {
            Some((_, Token::Int(n))) => u32::try_from(n).map_err(|_| bad())?,
            _ => return Err(bad()),
        };
        let genno = match self.next_token()? {
            Some((_, Token::Int(n))) => u32::try_from(n).map_err(|_| bad())?,
            _ => return Err(bad()),
        };
        match self.next_token()? {
            Some((_, tok)) if tok.is_keyword(b"obj") => Ok(PDFObjRef::new(objid, genno)),
            _ => Err(bad()),
        }
    }

    /// Reads stream data; the lexer sits right after the `stream` keyword.
    fn read_stream_body(
        &mut self,
        dict: PDFDict,
        resolve_length: &mut dyn FnMut(PDFObjRef) -> Option<i64>,
    ) -> Result<PDFStream> {
        let declared = match dict.get("Length") {
            Some(PDFObject::Ref(r)) => resolve_length(*r),
            Some(obj) => obj.as_int().ok(),
            None => None,
        };
        let cur = self.lexer.cursor_mut();
        // Some writers put spaces before the EOL that follows `stream`.
        while cur.peek() == Some(b' ') {
            cur.next_byte();
        }
        cur.eat_eol();
        let start = cur.pos();

        let declared_end = declared
            .and_then(|n| usize::try_from(n).ok())
            .map(|n| start + n)
            .filter(|&end| endstream_follows(cur, end));
        let end = match declared_end {
            Some(end) => end,
            None => scan_for_endstream(cur, start)?,
        };
        let data = cur.slice(start, end);
        let resume = cur.data().len();
        cur.set_pos(end);
        match cur.find_forward(b"endstream") {
            Some(at) => cur.set_pos(at + b"endstream".len()),
            None => cur.set_pos(resume),
        }
        Ok(PDFStream::new(dict, data))
    }
}

fn endstream_follows(cur: &ByteCursor, end: usize) -> bool {
    if end > cur.len() {
        return false;
    }
    let mut probe = ByteCursor::at(cur.data().clone(), end);
    probe.skip_whitespace();
    probe.starts_with(b"endstream")
}

/// End of the stream body found by searching for `endstream`, excluding the
/// end-of-line marker in front of it.
fn scan_for_endstream(cur: &ByteCursor, start: usize) -> Result<usize> {
    let at = cur
        .find_forward(b"endstream")
        .ok_or_else(|| PdfError::malformed(start, "stream without endstream"))?;
    let data = cur.data();
    let mut end = at;
    if end >= start + 2 && &data[end - 2..end] == b"\r\n" {
        end -= 2;
    } else if end > start && matches!(data[end - 1], b'\n' | b'\r') {
        end -= 1;
    }
    Ok(end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(data: &'static [u8]) -> PDFObject {
        PDFParser::new(data).parse_object().unwrap()
    }

    fn no_length(_: PDFObjRef) -> Option<i64> {
        None
    }

    #[test]
    fn test_reference_lookahead() {
        assert_eq!(
            parse(b"[1 2 R 3 4 5 R 6]"),
            PDFObject::Array(vec![
                PDFObject::Ref(PDFObjRef::new(1, 2)),
                PDFObject::Int(3),
                PDFObject::Ref(PDFObjRef::new(4, 5)),
                PDFObject::Int(6),
            ])
        );
    }

    #[test]
    fn test_nested_dict() {
        let obj = parse(b"<< /Type /Page /Kids [ 3 0 R ] /Res << /F1 7 0 R >> /Empty >>");
        let dict = obj.as_dict().unwrap();
        assert_eq!(dict.get("Type"), Some(&PDFObject::name("Page")));
        assert_eq!(
            dict.get("Res").unwrap().as_dict().unwrap().get("F1"),
            Some(&PDFObject::Ref(PDFObjRef::new(7, 0)))
        );
        assert_eq!(dict.get("Empty"), Some(&PDFObject::Null));
        let keys: Vec<_> = dict.keys().cloned().collect();
        assert_eq!(keys, ["Type", "Kids", "Res", "Empty"]);
    }

    #[test]
    fn test_grammar_violations() {
        let mut p = PDFParser::new(&b"<< 1 2 >>"[..]);
        assert!(matches!(
            p.parse_object(),
            Err(PdfError::MalformedObject { .. })
        ));
        let mut p = PDFParser::new(&b"[1 2"[..]);
        assert!(matches!(
            p.parse_object(),
            Err(PdfError::MalformedObject { .. })
        ));
        let mut p = PDFParser::new(&b"endobj"[..]);
        assert!(p.parse_object().is_err());
    }

    #[test]
    fn test_stream_with_direct_length() {
        let data = &b"4 0 obj\n<< /Length 5 >>\nstream\r\nhello\r\nendstream\nendobj\n"[..];
        let ind = PDFParser::new(data)
            .parse_indirect_at(0, &mut no_length)
            .unwrap();
        assert_eq!(ind.objref, PDFObjRef::new(4, 0));
        let stream = ind.object.as_stream().unwrap();
        assert_eq!(stream.get_rawdata(), b"hello");
        assert_eq!(stream.objid, Some(4));
    }

    #[test]
    fn test_stream_length_through_resolver_and_fallback() {
        let data = &b"5 0 obj << /Length 9 0 R >> stream\nabc def\nendstream endobj"[..];
        let mut resolver = |r: PDFObjRef| (r.objid == 9).then_some(7);
        let ind = PDFParser::new(data)
            .parse_indirect_at(0, &mut resolver)
            .unwrap();
        assert_eq!(ind.object.as_stream().unwrap().get_rawdata(), b"abc def");

        // Unresolvable and wrong lengths both fall back to scanning.
        let ind = PDFParser::new(data)
            .parse_indirect_at(0, &mut no_length)
            .unwrap();
        assert_eq!(ind.object.as_stream().unwrap().get_rawdata(), b"abc def");
        let data = &b"5 0 obj << /Length 3 >> stream\nabc def\nendstream endobj"[..];
        let ind = PDFParser::new(data)
            .parse_indirect_at(0, &mut no_length)
            .unwrap();
        assert_eq!(ind.object.as_stream().unwrap().get_rawdata(), b"abc def");
    }

    #[test]
    fn test_bad_header() {
        let mut p = PDFParser::new(&b"5 0 R"[..]);
        assert!(matches!(
            p.parse_indirect_at(0, &mut no_length),
            Err(PdfError::MalformedObject { pos: 0, .. })
        ));
    }
}
