//! Ordered filter chains from a stream's `/Filter` and `/DecodeParms`.

use super::ascii85::{ascii85decode, asciihexdecode};
use super::ccitt::{CcittCodec, CcittParams};
use super::lzw::lzwdecode_with_earlychange;
use super::predictor::{PredictorParams, unpredict};
use super::runlength::rldecode;
use crate::error::{PdfError, Result};
use crate::model::objects::{PDFDict, PDFObject};
use std::io::Read;
use std::sync::Arc;
use tracing::warn;

/// Stream filters known to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Filter {
    Flate,
    Lzw,
    Ascii85,
    AsciiHex,
    RunLength,
    CcittFax,
    Dct,
    Jpx,
    Jbig2,
    Crypt,
}

impl Filter {
    /// Looks up a filter by full name or inline-image abbreviation.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "FlateDecode" | "Fl" => Self::Flate,
            "LZWDecode" | "LZW" => Self::Lzw,
            "ASCII85Decode" | "A85" => Self::Ascii85,
            "ASCIIHexDecode" | "AHx" => Self::AsciiHex,
            "RunLengthDecode" | "RL" => Self::RunLength,
            "CCITTFaxDecode" | "CCF" => Self::CcittFax,
            "DCTDecode" | "DCT" => Self::Dct,
            "JPXDecode" => Self::Jpx,
            "JBIG2Decode" => Self::Jbig2,
            "Crypt" => Self::Crypt,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Flate => "FlateDecode",
            Self::Lzw => "LZWDecode",
            Self::Ascii85 => "ASCII85Decode",
            Self::AsciiHex => "ASCIIHexDecode",
            Self::RunLength => "RunLengthDecode",
            Self::CcittFax => "CCITTFaxDecode",
            Self::Dct => "DCTDecode",
            Self::Jpx => "JPXDecode",
            Self::Jbig2 => "JBIG2Decode",
            Self::Crypt => "Crypt",
        }
    }

    /// Image codecs end the pipeline and are left to the image factory.
    pub fn is_image_codec(self) -> bool {
        matches!(self, Self::Dct | Self::Jpx | Self::Jbig2)
    }
}

/// One filter together with its decode parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterStep {
    pub filter: Filter,
    pub parms: Option<PDFDict>,
}

/// Result of [`FilterPipeline::decode_image`].
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub data: Vec<u8>,
    /// Image codec still to be applied, with its parameters
    pub image_filter: Option<FilterStep>,
}

#[derive(Clone, Default)]
pub struct FilterPipeline {
    steps: Vec<FilterStep>,
    ccitt: Option<Arc<dyn CcittCodec>>,
}

impl std::fmt::Debug for FilterPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterPipeline")
            .field("steps", &self.steps)
            .field("ccitt", &self.ccitt.is_some())
            .finish()
    }
}

impl FilterPipeline {
    pub fn new(steps: Vec<FilterStep>) -> Self {
        Self { steps, ccitt: None }
    }

    /// Builds the chain from `/Filter` and `/DecodeParms` values whose
    /// references have already been resolved.
    ///
    /// `filter` is a name or array of names; `parms` is a dictionary, an array
    /// parallel to the filters (nulls allowed) or absent.
    pub fn from_objects(filter: Option<&PDFObject>, parms: Option<&PDFObject>) -> Result<Self> {
        let names: Vec<&str> = match filter {
            None | Some(PDFObject::Null) => Vec::new(),
            Some(PDFObject::Name(name)) => vec![name.as_str()],
            Some(PDFObject::Array(items)) => items
                .iter()
                .map(PDFObject::as_name)
                .collect::<Result<_>>()?,
            Some(other) => {
                return Err(PdfError::UnsupportedFilter(format!(
                    "/Filter must be a name or array, got {}",
                    other.type_name()
                )));
            }
        };
        let parms_at = |i: usize| -> Option<PDFDict> {
            match parms {
                Some(PDFObject::Dict(d)) if i == 0 => Some(d.clone()),
                Some(PDFObject::Array(items)) => items.get(i).and_then(|p| p.as_dict().ok()).cloned(),
                _ => None,
            }
        };
        let steps = names
            .into_iter()
            .enumerate()
            .map(|(i, name)| {
                Filter::from_name(name)
                    .map(|filter| FilterStep {
                        filter,
                        parms: parms_at(i),
                    })
                    .ok_or_else(|| PdfError::UnsupportedFilter(name.to_string()))
            })
            .collect::<Result<_>>()?;
        Ok(Self::new(steps))
    }

    /// Builds the chain from a (stream or inline image) dictionary, reading
    /// `/Filter` or `/F` and `/DecodeParms` or `/DP`.
    pub fn from_dict(dict: &PDFDict) -> Result<Self> {
        Self::from_objects(
            dict.get("Filter").or_else(|| dict.get("F")),
            dict.get("DecodeParms").or_else(|| dict.get("DP")),
        )
    }

    pub fn with_ccitt_codec(mut self, codec: Option<Arc<dyn CcittCodec>>) -> Self {
        self.ccitt = codec;
        self
    }

    pub fn steps(&self) -> &[FilterStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Runs every filter. Image codecs are reported as unsupported.
    pub fn decode(&self, data: &[u8]) -> Result<Vec<u8>> {
        let decoded = self.decode_image(data)?;
        match decoded.image_filter {
            Some(step) => Err(PdfError::UnsupportedFilter(step.filter.name().to_string())),
            None => Ok(decoded.data),
        }
    }

    /// Runs filters up to the first image codec and hands back the
    /// intermediate bytes together with that codec.
    pub fn decode_image(&self, data: &[u8]) -> Result<DecodedImage> {
        let mut data = data.to_vec();
        for (i, step) in self.steps.iter().enumerate() {
            if step.filter.is_image_codec() {
                if i + 1 < self.steps.len() {
                    warn!(
                        filter = step.filter.name(),
                        "filters after an image codec are ignored"
                    );
                }
                return Ok(DecodedImage {
                    data,
                    image_filter: Some(step.clone()),
                });
            }
            data = self.apply(step, data)?;
        }
        Ok(DecodedImage {
            data,
            image_filter: None,
        })
    }

    fn apply(&self, step: &FilterStep, data: Vec<u8>) -> Result<Vec<u8>> {
        let predictor = || {
            step.parms
                .as_ref()
                .map(PredictorParams::from_dict)
                .unwrap_or_default()
        };
        match step.filter {
            Filter::Flate => unpredict(flatedecode(&data)?, &predictor()),
            Filter::Lzw => {
                let early_change = step
                    .parms
                    .as_ref()
                    .and_then(|p| p.get("EarlyChange"))
                    .and_then(|v| v.as_int().ok())
                    .unwrap_or(1);
                unpredict(lzwdecode_with_earlychange(&data, early_change)?, &predictor())
            }
            Filter::Ascii85 => ascii85decode(&data),
            Filter::AsciiHex => asciihexdecode(&data),
            Filter::RunLength => rldecode(&data),
            Filter::CcittFax => {
                let codec = self
                    .ccitt
                    .as_ref()
                    .ok_or_else(|| PdfError::UnsupportedFilter("CCITTFaxDecode".to_string()))?;
                codec.decode(&data, &CcittParams::from_dict(step.parms.as_ref()))
            }
            // Decryption happens before the pipeline runs.
            Filter::Crypt => Ok(data),
            Filter::Dct | Filter::Jpx | Filter::Jbig2 => {
                Err(PdfError::UnsupportedFilter(step.filter.name().to_string()))
            }
        }
    }
}

/// Decode zlib data.
///
/// Corrupt streams keep the prefix that decoded; only a stream yielding
/// nothing is an error.
pub fn flatedecode(data: &[u8]) -> Result<Vec<u8>> {
    if data.is_empty() {
        return Ok(Vec::new());
    }
    let mut decoder = flate2::read::ZlibDecoder::new(data);
    let mut out = Vec::with_capacity(data.len() * 2);
    match decoder.read_to_end(&mut out) {
        Ok(_) => Ok(out),
        Err(err) => {
            let salvaged = flatedecode_prefix(data);
            if salvaged.is_empty() {
                return Err(PdfError::decode("FlateDecode", err.to_string()));
            }
            warn!(%err, decoded = salvaged.len(), "corrupt flate data, keeping decoded prefix");
            Ok(salvaged)
        }
    }
}

/// Feeds the input one byte at a time so output up to the fault survives.
fn flatedecode_prefix(data: &[u8]) -> Vec<u8> {
    use flate2::{Decompress, FlushDecompress, Status};
    let mut decoder = Decompress::new(true);
    let mut out = Vec::with_capacity(data.len() * 2);
    let mut buf = [0u8; 4096];
    let mut i = 0usize;
    while i < data.len() {
        let before_out = decoder.total_out();
        let before_in = decoder.total_in();
        let res = decoder.decompress(&data[i..i + 1], &mut buf, FlushDecompress::None);
        let produced = (decoder.total_out() - before_out) as usize;
        out.extend_from_slice(&buf[..produced]);
        let consumed = (decoder.total_in() - before_in) as usize;
        i += consumed.max(1);
        match res {
            Ok(Status::StreamEnd) | Err(_) => break,
            Ok(_) => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::ZlibEncoder;
    use std::io::Write;

    fn deflate(data: &[u8]) -> Vec<u8> {
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    fn names(list: &[&str]) -> PDFObject {
        PDFObject::Array(list.iter().map(|n| PDFObject::name(*n)).collect())
    }

    #[test]
    fn test_chain_in_order() {
        let hex: String = deflate(b"hello world")
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect();
        let filter = names(&["AHx", "Fl"]);
        let pipeline = FilterPipeline::from_objects(Some(&filter), None).unwrap();
        assert_eq!(pipeline.decode(hex.as_bytes()).unwrap(), b"hello world");
    }

    #[test]
    fn test_unknown_filter() {
        let filter = PDFObject::name("BogusDecode");
        assert!(matches!(
            FilterPipeline::from_objects(Some(&filter), None),
            Err(PdfError::UnsupportedFilter(_))
        ));
    }

    #[test]
    fn test_image_codec_stops_pipeline() {
        let filter = names(&["ASCIIHexDecode", "DCTDecode"]);
        let pipeline = FilterPipeline::from_objects(Some(&filter), None).unwrap();
        let image = pipeline.decode_image(b"ffd8>").unwrap();
        assert_eq!(image.data, vec![0xff, 0xd8]);
        assert_eq!(image.image_filter.map(|s| s.filter), Some(Filter::Dct));
        assert!(matches!(
            pipeline.decode(b"ffd8>"),
            Err(PdfError::UnsupportedFilter(_))
        ));
    }

    #[test]
    fn test_ccitt_without_codec() {
        let filter = PDFObject::name("CCITTFaxDecode");
        let pipeline = FilterPipeline::from_objects(Some(&filter), None).unwrap();
        assert!(matches!(
            pipeline.decode(b"\x00"),
            Err(PdfError::UnsupportedFilter(_))
        ));
    }

    #[test]
    fn test_flate_truncated_keeps_prefix() {
        let data: Vec<u8> = (0..2000u32).flat_map(|i| i.to_le_bytes()).collect();
        let compressed = deflate(&data);
        let cut = &compressed[..compressed.len() - 6];
        let out = flatedecode(cut).unwrap();
        assert!(!out.is_empty());
        assert_eq!(&data[..out.len()], &out[..]);
    }

    #[test]
    fn test_flate_garbage_fails() {
        assert!(matches!(
            flatedecode(b"not zlib at all"),
            Err(PdfError::FilterDecodeFailure { .. })
        ));
    }

    #[test]
    fn test_decode_parms_array_aligns_with_filters() {
        let filter = names(&["ASCIIHexDecode", "FlateDecode"]);
        let mut png = PDFDict::new();
        png.insert("Predictor".into(), PDFObject::Int(12));
        png.insert("Columns".into(), PDFObject::Int(2));
        let parms = PDFObject::Array(vec![PDFObject::Null, PDFObject::Dict(png)]);
        let pipeline = FilterPipeline::from_objects(Some(&filter), Some(&parms)).unwrap();
        assert!(pipeline.steps()[0].parms.is_none());
        assert!(pipeline.steps()[1].parms.is_some());
        let predicted = [2u8, 1, 2, 2, 1, 1];
        let hex: String = deflate(&predicted).iter().map(|b| format!("{b:02x}")).collect();
        assert_eq!(pipeline.decode(hex.as_bytes()).unwrap(), vec![1, 2, 2, 3]);
    }
}
