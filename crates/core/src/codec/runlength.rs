//! RunLength stream decoder.

use crate::error::Result;

/// Decode RunLength data.
///
/// - Length byte 0-127: copy the next `length + 1` bytes
/// - Length byte 128: end of data
/// - Length byte 129-255: repeat the next byte `257 - length` times
///
/// A run cut short by the end of input ends decoding without error.
pub fn rldecode(data: &[u8]) -> Result<Vec<u8>> {
    let mut result = Vec::with_capacity(data.len() * 2);
    let mut rest = data;

    while let Some((&length, tail)) = rest.split_first() {
        rest = tail;
        match length {
            128 => break,
            0..=127 => {
                let count = usize::from(length) + 1;
                let Some((run, tail)) = rest.split_at_checked(count) else {
                    break;
                };
                result.extend_from_slice(run);
                rest = tail;
            }
            129..=255 => {
                let Some((&byte, tail)) = rest.split_first() else {
                    break;
                };
                result.extend(std::iter::repeat_n(byte, 257 - usize::from(length)));
                rest = tail;
            }
        }
    }

    Ok(result)
}

/// Encode data with RunLength, terminated by the EOD byte.
pub fn rlencode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + data.len() / 128 + 2);
    let mut i = 0;
    while i < data.len() {
        let byte = data[i];
        let run = data[i..].iter().take(128).take_while(|&&b| b == byte).count();
        if run >= 2 {
            out.push((257 - run) as u8);
            out.push(byte);
            i += run;
            continue;
        }
        // Literal run up to the next repeat or 128 bytes.
        let start = i;
        while i < data.len() && i - start < 128 {
            if i + 1 < data.len() && data[i] == data[i + 1] {
                break;
            }
            i += 1;
        }
        out.push((i - start - 1) as u8);
        out.extend_from_slice(&data[start..i]);
    }
    out.push(128);
    out
}
