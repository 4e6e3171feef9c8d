//! PDF colour space and colour values.
//!
//! Conversion to any output colour model belongs to the colour factory; the
//! interpreter only needs component counts and initial values.

use super::Handle;
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Represents a PDF colour space as far as the interpreter cares.
#[derive(Clone)]
pub struct PDFColorSpace {
    /// Family name (e.g., "DeviceRGB", "ICCBased", "Pattern")
    pub name: String,
    /// Number of numeric colour components `sc`/`scn` expect
    pub ncomponents: usize,
    /// Underlying space of an uncoloured pattern space
    pub base: Option<Box<PDFColorSpace>>,
    /// Factory-side representation
    pub handle: Option<Handle>,
}

impl PDFColorSpace {
    pub fn new(name: &str, ncomponents: usize) -> Self {
        Self {
            name: name.to_string(),
            ncomponents,
            base: None,
            handle: None,
        }
    }

    /// Looks up one of the parameterless colour space families.
    pub fn predefined(name: &str) -> Option<Self> {
        PREDEFINED_COLORSPACE.get(name).cloned()
    }

    pub fn device_gray() -> Self {
        Self::new("DeviceGray", 1)
    }

    pub fn device_rgb() -> Self {
        Self::new("DeviceRGB", 3)
    }

    pub fn device_cmyk() -> Self {
        Self::new("DeviceCMYK", 4)
    }

    pub fn is_pattern(&self) -> bool {
        self.name == "Pattern"
    }

    /// Colour selected by `cs`/`CS` before any `sc` is seen.
    pub fn initial_color(&self) -> Color {
        match self.name.as_str() {
            "Pattern" => Color::Components(Vec::new()),
            "DeviceCMYK" => Color::Components(vec![0.0, 0.0, 0.0, 1.0]),
            _ => Color::Components(vec![0.0; self.ncomponents]),
        }
    }
}

impl PartialEq for PDFColorSpace {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.ncomponents == other.ncomponents && self.base == other.base
    }
}

impl fmt::Debug for PDFColorSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PDFColorSpace")
            .field("name", &self.name)
            .field("ncomponents", &self.ncomponents)
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

/// Colour operands as the content stream supplied them.
#[derive(Debug, Clone, PartialEq)]
pub enum Color {
    /// Numeric components in the active colour space
    Components(Vec<f64>),
    /// Coloured tiling pattern or shading pattern, by resource name
    PatternColored(String),
    /// Uncoloured tiling pattern: components in the base space plus the name
    PatternUncolored(Vec<f64>, String),
}

impl Default for Color {
    fn default() -> Self {
        Color::Components(vec![0.0])
    }
}

impl Color {
    pub fn components(&self) -> &[f64] {
        match self {
            Color::Components(c) | Color::PatternUncolored(c, _) => c,
            Color::PatternColored(_) => &[],
        }
    }

    pub fn pattern_name(&self) -> Option<&str> {
        match self {
            Color::PatternColored(name) | Color::PatternUncolored(_, name) => Some(name),
            Color::Components(_) => None,
        }
    }
}

/// Parameterless colour space families and their component counts.
pub static PREDEFINED_COLORSPACE: LazyLock<HashMap<&'static str, PDFColorSpace>> =
    LazyLock::new(|| {
        [
            ("DeviceGray", 1),
            ("CalGray", 1),
            ("DeviceRGB", 3),
            ("CalRGB", 3),
            ("Lab", 3),
            ("DeviceCMYK", 4),
            ("Pattern", 0),
        ]
        .into_iter()
        .map(|(name, n)| (name, PDFColorSpace::new(name, n)))
        .collect()
    });

/// Colour space abbreviations allowed in inline images and `cs` operands.
pub fn expand_colorspace_abbrev(name: &str) -> &str {
    match name {
        "G" => "DeviceGray",
        "RGB" => "DeviceRGB",
        "CMYK" => "DeviceCMYK",
        "I" => "Indexed",
        other => other,
    }
}
