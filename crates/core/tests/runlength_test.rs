//! RunLengthDecode.

use folio_core::codec::{FilterPipeline, rldecode, rlencode};
use folio_core::{PDFDict, PDFObject};

#[test]
fn test_rldecode_literal_and_repeat() {
    // Copy 3, repeat 'x' 4 times, copy 1, end.
    let data = b"\x02abc\xfdx\x00z\x80";
    assert_eq!(rldecode(data).unwrap(), b"abcxxxxz");
}

#[test]
fn test_rldecode_stops_at_eod() {
    assert_eq!(rldecode(b"\x00a\x80\x00b").unwrap(), b"a");
}

#[test]
fn test_rldecode_without_eod() {
    assert_eq!(rldecode(b"\xfe-").unwrap(), b"---");
}

#[test]
fn test_rldecode_short_literal_run_is_dropped() {
    assert_eq!(rldecode(b"\x00a\x05bc").unwrap(), b"a");
}

#[test]
fn test_rlencode_long_runs_split() {
    let data = vec![7u8; 300];
    let encoded = rlencode(&data);
    // 128 + 128 + 44 repeats, then EOD.
    assert_eq!(encoded, vec![129, 7, 129, 7, 213, 7, 128]);
    assert_eq!(rldecode(&encoded).unwrap(), data);
}

#[test]
fn test_rlencode_literal_runs() {
    let data: Vec<u8> = (0..=255).collect();
    let encoded = rlencode(&data);
    assert_eq!(encoded[0], 127);
    assert_eq!(encoded[129], 127);
    assert_eq!(rldecode(&encoded).unwrap(), data);
}

#[test]
fn test_runlength_in_pipeline() {
    let mut dict = PDFDict::new();
    dict.insert("Filter".into(), PDFObject::Name("RunLengthDecode".into()));
    let pipeline = FilterPipeline::from_dict(&dict).unwrap();
    assert_eq!(pipeline.decode(b"\xfdq\x80").unwrap(), b"qqqq");
}

#[test]
fn test_inline_abbreviation_in_pipeline() {
    let mut dict = PDFDict::new();
    dict.insert(
        "F".into(),
        PDFObject::Array(vec![
            PDFObject::Name("AHx".into()),
            PDFObject::Name("RL".into()),
        ]),
    );
    let pipeline = FilterPipeline::from_dict(&dict).unwrap();
    assert_eq!(pipeline.decode(b"FD 71 80>").unwrap(), b"qqqq");
}
