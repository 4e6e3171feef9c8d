//! LZW stream decoder using the weezl crate.

use crate::error::{PdfError, Result};
use tracing::warn;
use weezl::{BitOrder, decode::Decoder};

/// Decode LZW data with the PDF default `EarlyChange 1`.
pub fn lzwdecode(data: &[u8]) -> Result<Vec<u8>> {
    lzwdecode_with_earlychange(data, 1)
}

/// Decode LZW data (MSB first, 8-bit alphabet).
///
/// With `EarlyChange 1` the code width grows one code early, which is the
/// behaviour weezl calls the TIFF size switch.
pub fn lzwdecode_with_earlychange(data: &[u8], early_change: i64) -> Result<Vec<u8>> {
    let mut decoder = if early_change != 0 {
        Decoder::with_tiff_size_switch(BitOrder::Msb, 8)
    } else {
        Decoder::new(BitOrder::Msb, 8)
    };
    let mut output = Vec::new();
    let status = decoder.into_vec(&mut output).decode(data).status;
    if let Err(err) = status {
        // Streams cut short or carrying junk after their last good code still
        // yield what decoded before the fault.
        if output.is_empty() {
            return Err(PdfError::decode("LZWDecode", err.to_string()));
        }
        warn!(%err, decoded = output.len(), "corrupt LZW data, keeping decoded prefix");
    }
    Ok(output)
}
