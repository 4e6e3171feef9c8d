//! ASCII85Decode and ASCIIHexDecode vectors plus encoder properties.

use folio_core::PdfError;
use folio_core::codec::{ascii85decode, ascii85encode, asciihexdecode, asciihexencode};
use proptest::prelude::*;

#[test]
fn test_ascii85decode_wikipedia() {
    assert_eq!(
        ascii85decode(b"9jqo^BlbD-BleB1DJ+*+F(f,q").unwrap(),
        b"Man is distinguished"
    );
}

#[test]
fn test_ascii85decode_terminators() {
    for input in [
        &b"E,9)oF*2M7/c~>"[..],
        b"E,9)oF*2M7/c",
        b"E,9)oF*2M7/c~",
        b"<~E,9)oF*2M7/c~",
        b"<~E,9)oF*2M7/c~\n>",
    ] {
        assert_eq!(ascii85decode(input).unwrap(), b"pleasure.", "{input:?}");
    }
}

#[test]
fn test_ascii85decode_zero_group() {
    assert_eq!(
        ascii85decode(b"zE,9)oF*2M7/c~>").unwrap(),
        b"\0\0\0\0pleasure."
    );
}

#[test]
fn test_ascii85decode_leading_angle_is_data() {
    for input in [
        &b"<^BVT:K:=9<E)pd;BS_1:/aSV;ag~>"[..],
        b"<~<^BVT:K:=9<E)pd;BS_1:/aSV;ag~>",
        b"<^BVT:K:=9<E)pd;BS_1:/aSV;ag~",
    ] {
        assert_eq!(ascii85decode(input).unwrap(), b"VARIOUS UTTER NONSENSE");
    }
}

#[test]
fn test_ascii85decode_whitespace_inside_groups() {
    assert_eq!(ascii85decode(b"E,9)o\r\nF*2M7 /c~>").unwrap(), b"pleasure.");
}

#[test]
fn test_ascii85decode_rejects_bad_bytes() {
    assert!(matches!(
        ascii85decode(b"E,9{~>"),
        Err(PdfError::FilterDecodeFailure { .. })
    ));
    assert!(matches!(
        ascii85decode(b"E,z9)~>"),
        Err(PdfError::FilterDecodeFailure { .. })
    ));
}

#[test]
fn test_ascii85encode_known() {
    assert_eq!(ascii85encode(b"pleasure."), b"E,9)oF*2M7/c~>");
    assert_eq!(ascii85encode(b"\0\0\0\0"), b"z~>");
}

#[test]
fn test_asciihexdecode_whitespace() {
    assert_eq!(asciihexdecode(b"61 62 2e6364   65").unwrap(), b"ab.cde");
}

#[test]
fn test_asciihexdecode_odd_digit_padded() {
    assert_eq!(asciihexdecode(b"61 62 2e6364   657>").unwrap(), b"ab.cdep");
    assert_eq!(asciihexdecode(b"7>").unwrap(), b"p");
}

#[test]
fn test_asciihexdecode_stops_at_eod() {
    assert_eq!(asciihexdecode(b"4142>zz").unwrap(), b"AB");
}

proptest! {
    #[test]
    fn ascii85_decodes_what_it_encodes(data in proptest::collection::vec(any::<u8>(), 0..200)) {
        prop_assert_eq!(ascii85decode(&ascii85encode(&data)).unwrap(), data);
    }

    #[test]
    fn asciihex_decodes_what_it_encodes(data in proptest::collection::vec(any::<u8>(), 0..200)) {
        prop_assert_eq!(asciihexdecode(&asciihexencode(&data)).unwrap(), data);
    }
}
