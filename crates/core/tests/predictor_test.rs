//! PNG and TIFF predictors, directly and behind Flate.

use flate2::Compression;
use flate2::write::ZlibEncoder;
use folio_core::codec::{FilterPipeline, PredictorParams, png_predict, unpredict};
use folio_core::{PDFDict, PDFObject};
use std::io::Write;

fn params(predictor: i64, colors: usize, bpc: usize, columns: usize) -> PredictorParams {
    PredictorParams {
        predictor,
        colors,
        bits_per_component: bpc,
        columns,
    }
}

fn zlib(data: &[u8]) -> Vec<u8> {
    let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

#[test]
fn test_png_up_rgb() {
    let p = params(12, 3, 8, 2);
    // Row 1: tag 0, raw. Row 2: tag 2, deltas from row 1.
    let encoded = vec![0, 10, 20, 30, 40, 50, 60, 2, 1, 1, 1, 255, 0, 5];
    assert_eq!(
        unpredict(encoded, &p).unwrap(),
        vec![10, 20, 30, 40, 50, 60, 11, 21, 31, 39, 50, 65]
    );
}

#[test]
fn test_png_up_one_bit() {
    // 10 one-bit columns pack into 2 bytes per row.
    let p = params(10, 1, 1, 10);
    let encoded = vec![0, 0b1010_1010, 0b1100_0000, 2, 0b0000_1111, 0b0100_0000];
    assert_eq!(
        unpredict(encoded, &p).unwrap(),
        vec![0b1010_1010, 0b1100_0000, 0b1011_1001, 0b0000_0000]
    );
}

#[test]
fn test_png_average_uses_left_and_above() {
    let p = params(13, 1, 8, 3);
    let rows = [100u8, 50, 200, 90, 60, 10];
    let encoded = png_predict(&rows, &p, 3).unwrap();
    assert_eq!(encoded.len(), 8);
    assert_eq!(encoded[0], 3);
    assert_eq!(unpredict(encoded, &p).unwrap(), rows);
}

#[test]
fn test_each_png_tag_round_trips_multi_component() {
    let p = params(15, 4, 8, 3);
    let image: Vec<u8> = (0u8..48).map(|b| b.wrapping_mul(37)).collect();
    for tag in 0..=4 {
        let encoded = png_predict(&image, &p, tag).unwrap();
        assert_eq!(unpredict(encoded, &p).unwrap(), image, "tag {tag}");
    }
}

#[test]
fn test_no_predictor_passes_through() {
    let data = vec![1, 2, 3];
    assert_eq!(unpredict(data.clone(), &PredictorParams::default()).unwrap(), data);
}

#[test]
fn test_unknown_predictor_is_an_error() {
    assert!(unpredict(vec![1, 2], &params(7, 1, 8, 2)).is_err());
}

#[test]
fn test_params_from_decode_parms() {
    let mut dict = PDFDict::new();
    dict.insert("Predictor".into(), PDFObject::Int(12));
    dict.insert("Columns".into(), PDFObject::Int(5));
    dict.insert("Colors".into(), PDFObject::Int(0));
    let p = PredictorParams::from_dict(&dict);
    assert_eq!(p, params(12, 1, 8, 5));
    assert_eq!(p.row_bytes().unwrap(), 5);
}

#[test]
fn test_flate_with_png_predictor() {
    let p = params(12, 1, 8, 4);
    let image = [1u8, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12];
    let stored = zlib(&png_predict(&image, &p, 2).unwrap());

    let mut parms = PDFDict::new();
    parms.insert("Predictor".into(), PDFObject::Int(12));
    parms.insert("Columns".into(), PDFObject::Int(4));
    let pipeline = FilterPipeline::from_objects(
        Some(&PDFObject::Name("FlateDecode".into())),
        Some(&PDFObject::Dict(parms)),
    )
    .unwrap();
    assert_eq!(pipeline.decode(&stored).unwrap(), image);
}

#[test]
fn test_tiff_predictor_behind_flate() {
    let stored = zlib(&[10, 20, 30, 1, 2, 3]);
    let mut parms = PDFDict::new();
    parms.insert("Predictor".into(), PDFObject::Int(2));
    parms.insert("Colors".into(), PDFObject::Int(3));
    parms.insert("Columns".into(), PDFObject::Int(2));
    let pipeline = FilterPipeline::from_objects(
        Some(&PDFObject::Array(vec![PDFObject::Name("FlateDecode".into())])),
        Some(&PDFObject::Array(vec![PDFObject::Dict(parms)])),
    )
    .unwrap();
    assert_eq!(pipeline.decode(&stored).unwrap(), vec![10, 20, 30, 11, 22, 33]);
}
