//! Colour operators.
//!
//! Handles: G, g, RG, rg, K, k, CS, cs, SC, SCN, sc, scn
//!
//! - G/g, RG/rg, K/k: Select DeviceGray, DeviceRGB or DeviceCMYK with a colour
//! - CS/cs: Select a colour space and reset to its initial colour
//! - SC/SCN/sc/scn: Set components in the current space, or a pattern
//!
//! Upper-case operators act on stroking, lower-case on non-stroking colour.
//! Every change asks the colour factory for a new paint handle.

use crate::error::{PdfError, Result};
use crate::interp::device::MarkupHandler;
use crate::interp::interpreter::{PageInterpreter, number_operand};
use crate::interp::resources::ResourceKey;
use crate::model::{Color, Handle, PDFColorSpace, PDFObject, color::expand_colorspace_abbrev};

/// Colour spaces nested deeper than this (through pattern bases) are
/// rejected.
const MAX_COLORSPACE_NESTING: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PaintTarget {
    Fill,
    Stroke,
}

#[allow(non_snake_case)]
impl<'a, H: MarkupHandler + ?Sized> PageInterpreter<'a, H> {
    /// PDF operator: `g`
    pub fn do_g(&mut self, gray: f64) -> Result<()> {
        self.set_color(
            PaintTarget::Fill,
            PDFColorSpace::device_gray(),
            Color::Components(vec![gray]),
        )
    }

    /// PDF operator: `G`
    pub fn do_G(&mut self, gray: f64) -> Result<()> {
        self.set_color(
            PaintTarget::Stroke,
            PDFColorSpace::device_gray(),
            Color::Components(vec![gray]),
        )
    }

    /// PDF operator: `rg`
    pub fn do_rg(&mut self, r: f64, g: f64, b: f64) -> Result<()> {
        self.set_color(
            PaintTarget::Fill,
            PDFColorSpace::device_rgb(),
            Color::Components(vec![r, g, b]),
        )
    }

    /// PDF operator: `RG`
    pub fn do_RG(&mut self, r: f64, g: f64, b: f64) -> Result<()> {
        self.set_color(
            PaintTarget::Stroke,
            PDFColorSpace::device_rgb(),
            Color::Components(vec![r, g, b]),
        )
    }

    /// PDF operator: `k`
    pub fn do_k(&mut self, c: f64, m: f64, y: f64, k: f64) -> Result<()> {
        self.set_color(
            PaintTarget::Fill,
            PDFColorSpace::device_cmyk(),
            Color::Components(vec![c, m, y, k]),
        )
    }

    /// PDF operator: `K`
    pub fn do_K(&mut self, c: f64, m: f64, y: f64, k: f64) -> Result<()> {
        self.set_color(
            PaintTarget::Stroke,
            PDFColorSpace::device_cmyk(),
            Color::Components(vec![c, m, y, k]),
        )
    }

    /// PDF operator: `cs`
    pub fn do_cs(&mut self, name: &str) -> Result<()> {
        let space = self.colorspace_operand(name)?;
        let initial = space.initial_color();
        self.set_color(PaintTarget::Fill, space, initial)
    }

    /// PDF operator: `CS`
    pub fn do_CS(&mut self, name: &str) -> Result<()> {
        let space = self.colorspace_operand(name)?;
        let initial = space.initial_color();
        self.set_color(PaintTarget::Stroke, space, initial)
    }

    /// PDF operators: `sc`, `scn`
    pub fn do_scn(&mut self, args: &[PDFObject]) -> Result<()> {
        self.set_components(PaintTarget::Fill, args)
    }

    /// PDF operators: `SC`, `SCN`
    pub fn do_SCN(&mut self, args: &[PDFObject]) -> Result<()> {
        self.set_components(PaintTarget::Stroke, args)
    }

    fn set_components(&mut self, target: PaintTarget, args: &[PDFObject]) -> Result<()> {
        let state = self.gstack.current();
        let space = match target {
            PaintTarget::Fill => state.fill_space.clone(),
            PaintTarget::Stroke => state.stroke_space.clone(),
        };
        let op = match target {
            PaintTarget::Fill => "scn",
            PaintTarget::Stroke => "SCN",
        };
        let color = if space.is_pattern() {
            let Some((last, rest)) = args.split_last() else {
                return Err(PdfError::syntax(format!("`{op}` in a Pattern space needs a name")));
            };
            let name = last
                .as_name()
                .map_err(|_| PdfError::syntax(format!("`{op}` in a Pattern space needs a name")))?
                .to_string();
            let components = (0..rest.len())
                .map(|i| number_operand(op, rest, i))
                .collect::<Result<Vec<_>>>()?;
            let expected = space.base.as_ref().map_or(0, |base| base.ncomponents);
            if components.len() != expected {
                return Err(PdfError::ColorComponentMismatch {
                    space: space.name.clone(),
                    expected,
                    got: components.len(),
                });
            }
            if space.base.is_some() {
                Color::PatternUncolored(components, name)
            } else {
                Color::PatternColored(name)
            }
        } else {
            let components = (0..args.len())
                .map(|i| number_operand(op, args, i))
                .collect::<Result<Vec<_>>>()?;
            if components.len() != space.ncomponents {
                return Err(PdfError::ColorComponentMismatch {
                    space: space.name.clone(),
                    expected: space.ncomponents,
                    got: components.len(),
                });
            }
            Color::Components(components)
        };
        self.set_color(target, space, color)
    }

    /// Stores a colour with its paint handle. Composites are rebuilt when
    /// the space changes.
    pub(crate) fn set_color(
        &mut self,
        target: PaintTarget,
        space: PDFColorSpace,
        color: Color,
    ) -> Result<()> {
        let paint = self.make_paint(&space, &color)?;
        let state = self.gstack.current_mut();
        let space_changed = match target {
            PaintTarget::Fill => {
                let changed = state.fill_space != space;
                state.fill_space = space;
                state.fill_color = color;
                state.fill_paint = paint;
                changed
            }
            PaintTarget::Stroke => {
                let changed = state.stroke_space != space;
                state.stroke_space = space;
                state.stroke_color = color;
                state.stroke_paint = paint;
                changed
            }
        };
        if space_changed {
            self.refresh_composites();
        }
        Ok(())
    }

    fn make_paint(&self, space: &PDFColorSpace, color: &Color) -> Result<Option<Handle>> {
        match color {
            // A Pattern space has no colour until a pattern is named.
            Color::Components(_) if space.is_pattern() => Ok(None),
            Color::Components(components) => {
                Ok(Some(self.factories.color.create_color(space, components)))
            }
            Color::PatternColored(name) => self.pattern_paint(space, name, &[]),
            Color::PatternUncolored(components, name) => {
                self.pattern_paint(space, name, components)
            }
        }
    }

    /// Colour space named by a `cs`/`CS` operand or an inline image `/CS`:
    /// a family name, a `/ColorSpace` resource, or an abbreviation.
    pub(crate) fn colorspace_operand(&self, name: &str) -> Result<PDFColorSpace> {
        if let Some(space) = PDFColorSpace::predefined(name) {
            return Ok(space);
        }
        if let Some(obj) = self.find_resource("ColorSpace", name)? {
            return self.load_colorspace(&obj);
        }
        PDFColorSpace::predefined(expand_colorspace_abbrev(name))
            .ok_or_else(|| PdfError::syntax(format!("unknown colour space /{name}")))
    }

    /// Loads a colour space object, cached per resource.
    pub(crate) fn load_colorspace(&self, obj: &PDFObject) -> Result<PDFColorSpace> {
        self.resources
            .colorspace(ResourceKey::of(obj), || self.build_colorspace(obj, 0))
    }

    fn build_colorspace(&self, obj: &PDFObject, nesting: usize) -> Result<PDFColorSpace> {
        if nesting > MAX_COLORSPACE_NESTING {
            return Err(PdfError::syntax("colour space nested too deeply"));
        }
        let resolved = self.doc.resolve(obj)?;
        match &resolved {
            PDFObject::Name(name) => PDFColorSpace::predefined(expand_colorspace_abbrev(name))
                .ok_or_else(|| PdfError::syntax(format!("unknown colour space /{name}"))),
            PDFObject::Array(items) => {
                let Some((family, params)) = items.split_first() else {
                    return Err(PdfError::syntax("empty colour space array"));
                };
                let family = self.doc.resolve(family)?;
                let family = expand_colorspace_abbrev(
                    family
                        .as_name()
                        .map_err(|_| PdfError::syntax("colour space family must be a name"))?,
                );
                if family == "Pattern" {
                    let base = params
                        .first()
                        .map(|base| self.build_colorspace(base, nesting + 1))
                        .transpose()?;
                    return Ok(PDFColorSpace {
                        base: base.map(Box::new),
                        ..PDFColorSpace::new("Pattern", 0)
                    });
                }
                if params.is_empty()
                    && let Some(space) = PDFColorSpace::predefined(family)
                {
                    return Ok(space);
                }
                let params = params
                    .iter()
                    .map(|p| self.doc.resolve(p))
                    .collect::<Result<Vec<_>>>()?;
                self.factories
                    .color
                    .create_colorspace(family, &params, self.doc)
            }
            other => Err(PdfError::TypeError {
                expected: "colour space",
                got: other.type_name(),
            }),
        }
    }
}
