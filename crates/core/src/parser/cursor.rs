//! Seekable cursor over an immutable byte buffer.
//!
//! Shared by the object parser, the xref readers and the content lexer.

use bytes::Bytes;

/// PDF whitespace: NUL, HT, LF, FF, CR, SP.
#[inline]
pub fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | b'\x00' | b'\x0c')
}

#[inline]
pub fn is_delimiter(b: u8) -> bool {
    matches!(
        b,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

/// Regular characters form names, numbers and keywords.
#[inline]
pub fn is_regular(b: u8) -> bool {
    !is_whitespace(b) && !is_delimiter(b)
}

/// Saved cursor position for [`ByteCursor::rewind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark(usize);

#[derive(Debug, Clone)]
pub struct ByteCursor {
    data: Bytes,
    pos: usize,
}

impl ByteCursor {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            pos: 0,
        }
    }

    pub fn at(data: impl Into<Bytes>, pos: usize) -> Self {
        let mut cursor = Self::new(data);
        cursor.set_pos(pos);
        cursor
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Moves to an absolute position, clamped to the end of the buffer.
    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos.min(self.data.len());
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn remaining(&self) -> &[u8] {
        &self.data[self.pos..]
    }

    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    #[inline]
    pub fn peek_at(&self, offset: usize) -> Option<u8> {
        self.data.get(self.pos + offset).copied()
    }

    #[inline]
    pub fn next_byte(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    pub fn advance(&mut self, n: usize) {
        self.set_pos(self.pos + n);
    }

    /// Steps backward, stopping at the start of the buffer.
    pub fn back(&mut self, n: usize) {
        self.pos = self.pos.saturating_sub(n);
    }

    pub fn mark(&self) -> Mark {
        Mark(self.pos)
    }

    pub fn rewind(&mut self, mark: Mark) {
        self.pos = mark.0;
    }

    pub fn starts_with(&self, needle: &[u8]) -> bool {
        self.remaining().starts_with(needle)
    }

    /// Consumes `needle` if the cursor is positioned on it.
    pub fn eat(&mut self, needle: &[u8]) -> bool {
        if self.starts_with(needle) {
            self.pos += needle.len();
            true
        } else {
            false
        }
    }

    /// Skips whitespace only.
    pub fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek() {
            if !is_whitespace(b) {
                break;
            }
            self.pos += 1;
        }
    }

    /// Skips whitespace and `%` comments.
    pub fn skip_whitespace_and_comments(&mut self) {
        loop {
            self.skip_whitespace();
            if self.peek() != Some(b'%') {
                return;
            }
            while let Some(b) = self.next_byte() {
                if b == b'\n' || b == b'\r' {
                    break;
                }
            }
        }
    }

    /// Consumes a run of regular characters.
    pub fn take_regular(&mut self) -> &[u8] {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if !is_regular(b) {
                break;
            }
            self.pos += 1;
        }
        &self.data[start..self.pos]
    }

    /// Consumes one end-of-line marker (CRLF, LF or CR) if present.
    pub fn eat_eol(&mut self) -> bool {
        self.eat(b"\r\n") || self.eat(b"\n") || self.eat(b"\r")
    }

    /// Position of the next occurrence of `needle` at or after the cursor.
    pub fn find_forward(&self, needle: &[u8]) -> Option<usize> {
        find(self.remaining(), needle).map(|i| self.pos + i)
    }

    /// Position of the last occurrence of `needle` that starts before the
    /// cursor, matching backward from the end.
    pub fn rfind(&self, needle: &[u8]) -> Option<usize> {
        if needle.is_empty() || needle.len() > self.pos {
            return None;
        }
        (0..=self.pos - needle.len())
            .rev()
            .find(|&i| &self.data[i..i + needle.len()] == needle)
    }

    /// Reads up to the next end-of-line and consumes the line ending.
    pub fn read_line(&mut self) -> &[u8] {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b == b'\n' || b == b'\r' {
                break;
            }
            self.pos += 1;
        }
        let end = self.pos;
        self.eat_eol();
        &self.data[start..end]
    }

    /// Zero-copy slice of the underlying buffer.
    pub fn slice(&self, start: usize, end: usize) -> Bytes {
        let end = end.min(self.data.len());
        self.data.slice(start.min(end)..end)
    }
}

/// First occurrence of `needle` in `haystack`.
pub fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
