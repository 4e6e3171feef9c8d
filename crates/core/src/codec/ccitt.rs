//! CCITT fax parameters and the decoder hook.
//!
//! Group 3/4 decoding is supplied by the embedding application through
//! [`CcittCodec`]; the pipeline only gathers the parameters.

use crate::error::Result;
use crate::model::objects::PDFDict;

/// `/DecodeParms` of a `CCITTFaxDecode` filter, with PDF defaults applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CcittParams {
    /// < 0 pure 2-D (Group 4), 0 pure 1-D (Group 3), > 0 mixed
    pub k: i64,
    pub columns: usize,
    /// 0 when the height is unknown
    pub rows: usize,
    pub encoded_byte_align: bool,
    pub black_is_1: bool,
    pub damaged_rows_before_error: usize,
    pub end_of_line: bool,
    pub end_of_block: bool,
}

impl Default for CcittParams {
    fn default() -> Self {
        Self {
            k: 0,
            columns: 1728,
            rows: 0,
            encoded_byte_align: false,
            black_is_1: false,
            damaged_rows_before_error: 0,
            end_of_line: false,
            end_of_block: true,
        }
    }
}

impl CcittParams {
    pub fn from_dict(parms: Option<&PDFDict>) -> Self {
        let defaults = Self::default();
        let Some(parms) = parms else {
            return defaults;
        };
        let int = |key: &str, default: i64| {
            parms
                .get(key)
                .and_then(|v| v.as_int().ok())
                .unwrap_or(default)
        };
        let flag = |key: &str, default: bool| {
            parms
                .get(key)
                .and_then(|v| v.as_bool().ok())
                .unwrap_or(default)
        };
        Self {
            k: int("K", defaults.k),
            columns: int("Columns", defaults.columns as i64).max(1) as usize,
            rows: int("Rows", 0).max(0) as usize,
            encoded_byte_align: flag("EncodedByteAlign", defaults.encoded_byte_align),
            black_is_1: flag("BlackIs1", defaults.black_is_1),
            damaged_rows_before_error: int("DamagedRowsBeforeError", 0).max(0) as usize,
            end_of_line: flag("EndOfLine", defaults.end_of_line),
            end_of_block: flag("EndOfBlock", defaults.end_of_block),
        }
    }
}

/// External Group 3/4 fax decoder.
pub trait CcittCodec: Send + Sync {
    /// Decode fax data into packed 1-bit rows.
    fn decode(&self, data: &[u8], params: &CcittParams) -> Result<Vec<u8>>;
}
