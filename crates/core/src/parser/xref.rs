//! Cross-reference section grammars: classic `xref` tables and packed
//! `/Type /XRef` streams.
//!
//! These readers only decode sections; chaining them into a table is the
//! document's job.

use super::cursor::ByteCursor;
use super::lexer::Token;
use super::object::PDFParser;
use crate::error::{PdfError, Result};
use crate::model::objects::{PDFDict, PDFObject};
use byteorder::{BigEndian, ByteOrder};
use bytes::Bytes;
use tracing::warn;

/// One row of a cross-reference section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XRefRecord {
    Free { generation: u32 },
    InUse { offset: usize, generation: u32 },
    Compressed { stream: u32, index: u32 },
}

/// A decoded section: its rows in file order plus the trailer dictionary.
#[derive(Debug, Clone, PartialEq)]
pub struct XRefSection {
    pub records: Vec<(u32, XRefRecord)>,
    pub trailer: PDFDict,
}

fn broken(offset: usize, msg: &str) -> PdfError {
    PdfError::xref(format!("{msg} (section at {offset})"))
}

fn read_uint(cur: &mut ByteCursor, offset: usize, what: &str) -> Result<u64> {
    cur.skip_whitespace();
    let digits = cur.take_regular();
    std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or_else(|| broken(offset, &format!("bad {what} in xref table")))
}

/// Parses a classic `xref` table at `offset`, including its trailer.
pub fn parse_xref_table(data: &Bytes, offset: usize) -> Result<XRefSection> {
    let mut cur = ByteCursor::at(data.clone(), offset);
    cur.skip_whitespace();
    if !cur.eat(b"xref") {
        return Err(broken(offset, "expected `xref` keyword"));
    }
    let mut records = Vec::new();
    loop {
        cur.skip_whitespace_and_comments();
        if cur.eat(b"trailer") {
            break;
        }
        if cur.at_end() {
            return Err(broken(offset, "xref table without trailer"));
        }
        let start = read_uint(&mut cur, offset, "subsection start")?;
        let count = read_uint(&mut cur, offset, "subsection count")?;
        let mut base = start;
        for i in 0..count {
            let entry_offset = read_uint(&mut cur, offset, "entry offset")?;
            let generation = read_uint(&mut cur, offset, "entry generation")?;
            cur.skip_whitespace();
            let marker = cur.next_byte();
            // Some writers number the first subsection from 1 while still
            // listing the free head of object 0.
            if i == 0
                && base == 1
                && marker == Some(b'f')
                && entry_offset == 0
                && generation == 65535
            {
                warn!(offset, "xref subsection starts at 1 with free head; renumbering from 0");
                base = 0;
            }
            let objid = u32::try_from(base + i).map_err(|_| broken(offset, "object number overflow"))?;
            let generation = generation as u32;
            let record = match marker {
                Some(b'n') => XRefRecord::InUse {
                    offset: entry_offset as usize,
                    generation,
                },
                Some(b'f') => XRefRecord::Free { generation },
                _ => return Err(broken(offset, "xref entry marker must be `n` or `f`")),
            };
            records.push((objid, record));
        }
    }
    let mut parser = PDFParser::new(data.clone());
    let trailer = match parser.parse_object_at(cur.pos()) {
        Ok(PDFObject::Dict(d)) => d,
        Ok(_) | Err(_) => return Err(broken(offset, "unreadable trailer dictionary")),
    };
    Ok(XRefSection { records, trailer })
}

/// True if the bytes at `offset` start a classic table rather than an
/// indirect xref stream object.
pub fn is_xref_table(data: &Bytes, offset: usize) -> bool {
    let mut cur = ByteCursor::at(data.clone(), offset);
    cur.skip_whitespace();
    cur.starts_with(b"xref")
}

/// Widest `/W` field accepted; every value fits in 64 bits.
const MAX_FIELD_WIDTH: f64 = 8.0;

fn field(row: &[u8], width: usize) -> u64 {
    match width {
        0 => 0,
        _ => BigEndian::read_uint(row, width),
    }
}

/// Decodes the rows of an xref stream whose data has already been run
/// through its filters. The stream dictionary doubles as the trailer.
pub fn parse_xref_stream(dict: &PDFDict, decoded: &[u8]) -> Result<XRefSection> {
    let widths: Vec<usize> = dict
        .get("W")
        .ok_or_else(|| PdfError::xref("xref stream without /W"))?
        .as_numbers()?
        .into_iter()
        .map(|w| {
            if (0.0..=MAX_FIELD_WIDTH).contains(&w) && w.fract() == 0.0 {
                Ok(w as usize)
            } else {
                Err(PdfError::xref(format!("xref stream /W has a field width of {w}")))
            }
        })
        .collect::<Result<_>>()?;
    let &[w0, w1, w2] = widths.as_slice() else {
        return Err(PdfError::xref("xref stream /W must have three entries"));
    };
    let row_len = w0 + w1 + w2;
    if row_len == 0 {
        return Err(PdfError::xref("xref stream /W describes empty rows"));
    }
    let size = dict.get("Size").and_then(|s| s.as_int().ok()).unwrap_or(0);
    let index: Vec<i64> = match dict.get("Index") {
        Some(obj) => obj
            .as_array()?
            .iter()
            .map(PDFObject::as_int)
            .collect::<Result<_>>()?,
        None => vec![0, size],
    };

    let mut rows = decoded.chunks_exact(row_len);
    let mut records = Vec::new();
    for pair in index.chunks(2) {
        let &[start, count] = pair else {
            return Err(PdfError::xref("xref stream /Index has odd length"));
        };
        for i in 0..count.max(0) {
            let Some(row) = rows.next() else {
                warn!(start, count, "xref stream data shorter than /Index declares");
                return Ok(XRefSection {
                    records,
                    trailer: dict.clone(),
                });
            };
            let kind = if w0 == 0 { 1 } else { field(row, w0) };
            let f1 = field(&row[w0..], w1);
            let f2 = field(&row[w0 + w1..], w2);
            let objid = start
                .checked_add(i)
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| PdfError::xref("object number overflow"))?;
            let record = match kind {
                0 => XRefRecord::Free {
                    generation: f2 as u32,
                },
                1 => XRefRecord::InUse {
                    offset: f1 as usize,
                    generation: f2 as u32,
                },
                2 => XRefRecord::Compressed {
                    stream: f1 as u32,
                    index: f2 as u32,
                },
                // Unknown types are references to the null object.
                _ => continue,
            };
            records.push((objid, record));
        }
    }
    Ok(XRefSection {
        records,
        trailer: dict.clone(),
    })
}

/// Reads the offset after the last `startxref` keyword. The file must end
/// with an `%%EOF` marker after it.
pub fn find_startxref(data: &Bytes) -> Result<usize> {
    let mut cur = ByteCursor::at(data.clone(), data.len());
    let at = cur
        .rfind(b"startxref")
        .ok_or_else(|| PdfError::xref("startxref not found"))?;
    cur.set_pos(at + b"startxref".len());
    if cur.find_forward(b"%%EOF").is_none() {
        return Err(PdfError::xref("missing %%EOF after startxref"));
    }
    let mut parser = PDFParser::new(data.clone());
    parser.set_pos(cur.pos());
    match parser.next_token()? {
        Some((_, Token::Int(n))) if n >= 0 && (n as usize) < data.len() => Ok(n as usize),
        _ => Err(PdfError::xref("startxref offset is not a valid file position")),
    }
}
