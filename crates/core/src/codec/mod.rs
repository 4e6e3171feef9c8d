//! Stream filters.
//!
//! - `pipeline`: `/Filter` chains, Flate, and image-codec hand-off
//! - `lzw`: LZW decompression
//! - `ascii85`: ASCII85 and ASCIIHex encoding
//! - `runlength`: Run-length coding
//! - `predictor`: TIFF and PNG predictors
//! - `ccitt`: CCITT fax parameters and decoder hook

pub mod ascii85;
pub mod ccitt;
pub mod lzw;
pub mod pipeline;
pub mod predictor;
pub mod runlength;

pub use ascii85::{ascii85decode, ascii85encode, asciihexdecode, asciihexencode};
pub use ccitt::{CcittCodec, CcittParams};
pub use lzw::{lzwdecode, lzwdecode_with_earlychange};
pub use pipeline::{DecodedImage, Filter, FilterPipeline, FilterStep, flatedecode};
pub use predictor::{PredictorParams, png_predict, unpredict};
pub use runlength::{rldecode, rlencode};
