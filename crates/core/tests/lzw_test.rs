//! LZWDecode against known encoder output.

use folio_core::PdfError;
use folio_core::codec::{lzwdecode, lzwdecode_with_earlychange};

#[test]
fn test_lzwdecode_reference_stream() {
    let input = b"\x80\x0b\x60\x50\x22\x0c\x0c\x85\x01";
    assert_eq!(lzwdecode(input).unwrap(), b"-----A---B");
}

#[test]
fn test_lzwdecode_repeated_phrases() {
    let input = hex::decode("801509e422293ca44e2795205048342e0b0784c040").unwrap();
    assert_eq!(lzwdecode(&input).unwrap(), b"TOBEORNOTTOBEORTOBEORNOT");
}

#[test]
fn test_early_change_irrelevant_for_short_tables() {
    let input = b"\x80\x0b\x60\x50\x22\x0c\x0c\x85\x01";
    assert_eq!(
        lzwdecode_with_earlychange(input, 0).unwrap(),
        lzwdecode_with_earlychange(input, 1).unwrap()
    );
}

#[test]
fn test_truncated_stream_keeps_prefix() {
    // The EOD code is cut off.
    let input = b"\x80\x0b\x60\x50\x22\x0c\x0c";
    let out = lzwdecode(input).unwrap();
    assert!(b"-----A---B".starts_with(&out));
    assert!(!out.is_empty());
}

#[test]
fn test_garbage_is_an_error() {
    assert!(matches!(
        lzwdecode(b"\xff\xff\xff\xff"),
        Err(PdfError::FilterDecodeFailure { .. })
    ));
}
