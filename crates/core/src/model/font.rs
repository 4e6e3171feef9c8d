//! Fonts as seen by the interpreter: factory handles plus glyph widths.

use super::Handle;
use super::objects::PDFDict;
use rustc_hash::FxHashMap;
use std::fmt;

/// Glyph advance widths of one font, in thousandths of text space units.
#[derive(Debug, Clone, PartialEq)]
pub struct WidthTable {
    widths: FxHashMap<u32, f64>,
    pub default_width: f64,
    /// Bytes per character code in shown strings (1 for simple fonts, 2 for
    /// composite fonts)
    pub code_length: usize,
}

impl Default for WidthTable {
    fn default() -> Self {
        Self {
            widths: FxHashMap::default(),
            default_width: 0.0,
            code_length: 1,
        }
    }
}

impl WidthTable {
    pub fn new(code_length: usize, default_width: f64) -> Self {
        Self {
            widths: FxHashMap::default(),
            default_width,
            code_length: code_length.clamp(1, 4),
        }
    }

    pub fn set(&mut self, code: u32, width: f64) {
        self.widths.insert(code, width);
    }

    pub fn width(&self, code: u32) -> f64 {
        self.widths.get(&code).copied().unwrap_or(self.default_width)
    }

    pub fn len(&self) -> usize {
        self.widths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widths.is_empty()
    }

    /// Splits a shown string into character codes. A trailing partial code is
    /// dropped.
    pub fn decode(&self, bytes: &[u8]) -> Vec<u32> {
        bytes
            .chunks_exact(self.code_length)
            .map(|chunk| chunk.iter().fold(0u32, |acc, b| (acc << 8) | u32::from(*b)))
            .collect()
    }
}

/// A font selected by `Tf`, cached per font dictionary.
#[derive(Clone)]
pub struct LoadedFont {
    pub objid: Option<u32>,
    pub base_font: String,
    pub subtype: String,
    pub dict: PDFDict,
    pub font: Option<Handle>,
    pub mapper: Option<Handle>,
    pub widths: WidthTable,
}

impl LoadedFont {
    /// Single-byte code 32 receives word spacing.
    pub fn is_word_space(&self, code: u32) -> bool {
        self.widths.code_length == 1 && code == 32
    }
}

impl fmt::Debug for LoadedFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedFont")
            .field("objid", &self.objid)
            .field("base_font", &self.base_font)
            .field("subtype", &self.subtype)
            .field("widths", &self.widths.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_codes() {
        let simple = WidthTable::default();
        assert_eq!(simple.decode(b"AB"), vec![65, 66]);
        let composite = WidthTable::new(2, 1000.0);
        assert_eq!(composite.decode(&[0x01, 0x02, 0x00, 0x41, 0x07]), vec![0x0102, 0x41]);
        assert_eq!(composite.width(9), 1000.0);
    }
}
