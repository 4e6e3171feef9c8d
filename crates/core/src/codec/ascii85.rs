//! ASCII85 and ASCIIHex stream codecs.

use crate::error::{PdfError, Result};
use crate::parser::cursor::is_whitespace;
use crate::parser::lexer::hex_value;

const A85: &str = "ASCII85Decode";
const AHX: &str = "ASCIIHexDecode";

/// Decode ASCII85 data (PDF variant).
///
/// Handles an optional `<~` prefix, the `~>` terminator (or none), `z` for a
/// zero group, whitespace anywhere and a short final group.
pub fn ascii85decode(data: &[u8]) -> Result<Vec<u8>> {
    let data = data.strip_prefix(b"<~").unwrap_or(data);
    let mut out = Vec::with_capacity(data.len() / 5 * 4 + 4);
    let mut group = [0u8; 5];
    let mut len = 0;

    for (i, &byte) in data.iter().enumerate() {
        match byte {
            b'~' => break,
            b'z' if len == 0 => out.extend_from_slice(&[0; 4]),
            b'z' => {
                return Err(PdfError::decode(A85, format!("`z` inside a group at {i}")));
            }
            b'!'..=b'u' => {
                group[len] = byte - b'!';
                len += 1;
                if len == 5 {
                    out.extend_from_slice(&group_value(&group)?.to_be_bytes());
                    len = 0;
                }
            }
            b if is_whitespace(b) => {}
            other => {
                return Err(PdfError::decode(
                    A85,
                    format!("invalid byte {other:#04x} at {i}"),
                ));
            }
        }
    }

    // A lone trailing digit carries no byte.
    if len > 1 {
        group[len..].fill(b'u' - b'!');
        let bytes = group_value(&group)?.to_be_bytes();
        out.extend_from_slice(&bytes[..len - 1]);
    }
    Ok(out)
}

fn group_value(digits: &[u8; 5]) -> Result<u32> {
    let value = digits
        .iter()
        .fold(0u64, |acc, &d| acc * 85 + u64::from(d));
    u32::try_from(value).map_err(|_| PdfError::decode(A85, "group value exceeds 2^32 - 1"))
}

/// Encode data as ASCII85, `z` for zero groups, terminated by `~>`.
pub fn ascii85encode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() / 4 * 5 + 7);
    for chunk in data.chunks(4) {
        if chunk == [0, 0, 0, 0] {
            out.push(b'z');
            continue;
        }
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        let mut value = u32::from_be_bytes(word);
        let mut digits = [0u8; 5];
        for d in digits.iter_mut().rev() {
            *d = (value % 85) as u8 + b'!';
            value /= 85;
        }
        out.extend_from_slice(&digits[..chunk.len() + 1]);
    }
    out.extend_from_slice(b"~>");
    out
}

/// Decode ASCIIHex data.
///
/// Whitespace is skipped, `>` ends the data and an odd final digit is
/// padded with zero. Any other byte is an error.
pub fn asciihexdecode(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len() / 2);
    let mut high: Option<u8> = None;
    for (i, &byte) in data.iter().enumerate() {
        if byte == b'>' {
            break;
        }
        if is_whitespace(byte) {
            continue;
        }
        let Some(nibble) = hex_value(byte) else {
            return Err(PdfError::decode(
                AHX,
                format!("invalid byte {byte:#04x} at {i}"),
            ));
        };
        match high.take() {
            Some(h) => out.push((h << 4) | nibble),
            None => high = Some(nibble),
        }
    }
    if let Some(h) = high {
        out.push(h << 4);
    }
    Ok(out)
}

/// Encode data as uppercase hex digits terminated by `>`.
pub fn asciihexencode(data: &[u8]) -> Vec<u8> {
    const DIGITS: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = Vec::with_capacity(data.len() * 2 + 1);
    for &b in data {
        out.push(DIGITS[usize::from(b >> 4)]);
        out.push(DIGITS[usize::from(b & 0x0f)]);
    }
    out.push(b'>');
    out
}
