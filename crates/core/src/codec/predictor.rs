//! TIFF and PNG predictors applied after Flate and LZW.

use crate::error::{PdfError, Result};
use crate::model::objects::PDFDict;

const FILTER: &str = "Predictor";

/// Predictor parameters from a `/DecodeParms` dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictorParams {
    /// 1 none, 2 TIFF, 10-15 PNG
    pub predictor: i64,
    pub colors: usize,
    pub bits_per_component: usize,
    pub columns: usize,
}

impl Default for PredictorParams {
    fn default() -> Self {
        Self {
            predictor: 1,
            colors: 1,
            bits_per_component: 8,
            columns: 1,
        }
    }
}

impl PredictorParams {
    pub fn from_dict(parms: &PDFDict) -> Self {
        let int = |key: &str, default: i64| {
            parms
                .get(key)
                .and_then(|v| v.as_int().ok())
                .unwrap_or(default)
        };
        Self {
            predictor: int("Predictor", 1),
            colors: int("Colors", 1).max(1) as usize,
            bits_per_component: int("BitsPerComponent", 8).max(1) as usize,
            columns: int("Columns", 1).max(1) as usize,
        }
    }

    /// Bytes in one row of samples, excluding the PNG tag byte. Fails when
    /// the parameters describe a row too large to address.
    pub fn row_bytes(&self) -> Result<usize> {
        self.colors
            .checked_mul(self.bits_per_component)
            .and_then(|bits| bits.checked_mul(self.columns))
            .map(|bits| bits.div_ceil(8))
            .ok_or_else(|| {
                PdfError::decode(
                    FILTER,
                    format!(
                        "row of {} columns x {} colours x {} bits overflows",
                        self.columns, self.colors, self.bits_per_component
                    ),
                )
            })
    }

    /// Bytes per complete pixel, at least one.
    pub fn bytes_per_pixel(&self) -> usize {
        (self.colors.saturating_mul(self.bits_per_component) / 8).max(1)
    }
}

/// Undo the prediction selected by `params`.
pub fn unpredict(data: Vec<u8>, params: &PredictorParams) -> Result<Vec<u8>> {
    match params.predictor {
        1 => Ok(data),
        2 => tiff_unpredict(data, params),
        10..=15 => png_unpredict(&data, params),
        other => Err(PdfError::decode(FILTER, format!("unknown predictor {other}"))),
    }
}

fn paeth(left: u8, above: u8, upper_left: u8) -> u8 {
    let p = i16::from(left) + i16::from(above) - i16::from(upper_left);
    let pa = (p - i16::from(left)).abs();
    let pb = (p - i16::from(above)).abs();
    let pc = (p - i16::from(upper_left)).abs();
    if pa <= pb && pa <= pc {
        left
    } else if pb <= pc {
        above
    } else {
        upper_left
    }
}

/// Reverse PNG row filters. Each row carries its own tag byte; a short last
/// row is reconstructed as far as its bytes go.
fn png_unpredict(data: &[u8], params: &PredictorParams) -> Result<Vec<u8>> {
    let row_bytes = params.row_bytes()?;
    let bpp = params.bytes_per_pixel();
    let mut result = Vec::with_capacity(data.len());
    // No row can hold more bytes than the input has.
    let buffer = row_bytes.min(data.len());
    let mut prev_row = vec![0u8; buffer];
    let mut row = vec![0u8; buffer];

    for (index, chunk) in data.chunks(row_bytes + 1).enumerate() {
        let Some((&tag, encoded)) = chunk.split_first() else {
            break;
        };
        let n = encoded.len();
        match tag {
            0 => row[..n].copy_from_slice(encoded),
            1 => {
                for i in 0..n {
                    let left = if i >= bpp { row[i - bpp] } else { 0 };
                    row[i] = encoded[i].wrapping_add(left);
                }
            }
            2 => {
                for i in 0..n {
                    row[i] = encoded[i].wrapping_add(prev_row[i]);
                }
            }
            3 => {
                for i in 0..n {
                    let left = if i >= bpp { u16::from(row[i - bpp]) } else { 0 };
                    let above = u16::from(prev_row[i]);
                    row[i] = encoded[i].wrapping_add(((left + above) / 2) as u8);
                }
            }
            4 => {
                for i in 0..n {
                    let (left, upper_left) = if i >= bpp {
                        (row[i - bpp], prev_row[i - bpp])
                    } else {
                        (0, 0)
                    };
                    row[i] = encoded[i].wrapping_add(paeth(left, prev_row[i], upper_left));
                }
            }
            other => {
                return Err(PdfError::decode(
                    FILTER,
                    format!("PNG row {index} has filter tag {other}"),
                ));
            }
        }
        result.extend_from_slice(&row[..n]);
        std::mem::swap(&mut prev_row, &mut row);
    }
    Ok(result)
}

/// Apply one PNG row filter to every row, prefixing each with `tag`.
///
/// The inverse of the PNG predictor, used by writers and round-trip tests.
pub fn png_predict(data: &[u8], params: &PredictorParams, tag: u8) -> Result<Vec<u8>> {
    if tag > 4 {
        return Err(PdfError::InvalidArgument(format!("PNG filter tag {tag}")));
    }
    let row_bytes = params.row_bytes()?;
    let bpp = params.bytes_per_pixel();
    let mut out = Vec::with_capacity(data.len() + data.len() / row_bytes + 1);
    let mut prev_row: &[u8] = &[];
    for row in data.chunks(row_bytes) {
        out.push(tag);
        for i in 0..row.len() {
            let left = if i >= bpp { row[i - bpp] } else { 0 };
            let above = prev_row.get(i).copied().unwrap_or(0);
            let upper_left = if i >= bpp {
                prev_row.get(i - bpp).copied().unwrap_or(0)
            } else {
                0
            };
            let predicted = match tag {
                0 => 0,
                1 => left,
                2 => above,
                3 => ((u16::from(left) + u16::from(above)) / 2) as u8,
                _ => paeth(left, above, upper_left),
            };
            out.push(row[i].wrapping_sub(predicted));
        }
        prev_row = row;
    }
    Ok(out)
}

/// Reverse TIFF predictor 2: every sample is stored as the difference from
/// the same component of the pixel to its left.
fn tiff_unpredict(mut data: Vec<u8>, params: &PredictorParams) -> Result<Vec<u8>> {
    let row_bytes = params.row_bytes()?;
    let colors = params.colors;
    match params.bits_per_component {
        8 => {
            for row in data.chunks_mut(row_bytes) {
                for i in colors..row.len() {
                    row[i] = row[i].wrapping_add(row[i - colors]);
                }
            }
        }
        16 => {
            let stride = colors * 2;
            for row in data.chunks_mut(row_bytes) {
                let mut i = stride;
                while i + 1 < row.len() {
                    let prev = u16::from_be_bytes([row[i - stride], row[i - stride + 1]]);
                    let cur = u16::from_be_bytes([row[i], row[i + 1]]);
                    let [hi, lo] = cur.wrapping_add(prev).to_be_bytes();
                    row[i] = hi;
                    row[i + 1] = lo;
                    i += 2;
                }
            }
        }
        bpc @ (1 | 2 | 4) => {
            let samples_per_row = colors.saturating_mul(params.columns);
            let mask = (1u8 << bpc) - 1;
            for row in data.chunks_mut(row_bytes) {
                let available = (row.len() * 8 / bpc).min(samples_per_row);
                let mut samples: Vec<u8> = (0..available)
                    .map(|s| {
                        let bit = s * bpc;
                        (row[bit / 8] >> (8 - bpc - bit % 8)) & mask
                    })
                    .collect();
                for s in colors..samples.len() {
                    samples[s] = samples[s].wrapping_add(samples[s - colors]) & mask;
                }
                for (s, value) in samples.into_iter().enumerate() {
                    let bit = s * bpc;
                    let shift = 8 - bpc - bit % 8;
                    row[bit / 8] = (row[bit / 8] & !(mask << shift)) | (value << shift);
                }
            }
        }
        other => {
            return Err(PdfError::decode(
                FILTER,
                format!("TIFF predictor with {other} bits per component"),
            ));
        }
    }
    Ok(data)
}
