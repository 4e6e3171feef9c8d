//! Text operators.
//!
//! Handles: BT, ET, Tc, Tw, Tz, TL, Tf, Tr, Ts, Td, TD, Tm, T*, Tj, TJ, ', "
//!
//! Text object:
//! - BT/ET: Begin/end text object (no nesting)
//!
//! Text state (valid anywhere, stored in the graphics state):
//! - Tc, Tw, Tz, TL, Tf, Tr, Ts
//!
//! Text positioning (inside BT/ET only):
//! - Td/TD: Move to next line (TD also sets leading)
//! - Tm: Set text matrix directly
//! - T*: Move to next line using current leading
//!
//! Text showing (inside BT/ET only):
//! - Tj, TJ, ', "

use crate::error::{PdfError, Result};
use crate::interp::device::{GLYPH_FLIP, GlyphRun, MarkupHandler};
use crate::interp::interpreter::{PageInterpreter, TextObject};
use crate::model::PDFObject;
use crate::utils::{Matrix, mult_matrix, translation};

#[allow(non_snake_case)]
impl<'a, H: MarkupHandler + ?Sized> PageInterpreter<'a, H> {
    /// Begins a text object; Tm and Tlm start as identity.
    ///
    /// PDF operator: `BT`
    pub fn do_BT(&mut self) -> Result<()> {
        if self.text.is_some() {
            return Err(PdfError::syntax("`BT` inside a text object"));
        }
        self.text = Some(TextObject::new());
        Ok(())
    }

    /// PDF operator: `ET`
    pub fn do_ET(&mut self) -> Result<()> {
        if self.text.take().is_none() {
            return Err(PdfError::syntax("`ET` without matching `BT`"));
        }
        Ok(())
    }

    /// PDF operator: `Tc`
    pub fn do_Tc(&mut self, spacing: f64) -> Result<()> {
        self.gstack.current_mut().char_spacing = spacing;
        Ok(())
    }

    /// PDF operator: `Tw`
    pub fn do_Tw(&mut self, spacing: f64) -> Result<()> {
        self.gstack.current_mut().word_spacing = spacing;
        Ok(())
    }

    /// Horizontal scaling in percent.
    ///
    /// PDF operator: `Tz`
    pub fn do_Tz(&mut self, scale: f64) -> Result<()> {
        self.gstack.current_mut().horizontal_scale = scale;
        Ok(())
    }

    /// PDF operator: `TL`
    pub fn do_TL(&mut self, leading: f64) -> Result<()> {
        self.gstack.current_mut().leading = leading;
        Ok(())
    }

    /// Selects a font resource and size.
    ///
    /// PDF operator: `Tf`
    pub fn do_Tf(&mut self, name: &str, size: f64) -> Result<()> {
        let obj = self.lookup_resource("Font", name)?;
        let font = self.load_font(&obj)?;
        let state = self.gstack.current_mut();
        state.font = Some(font);
        state.font_size = size;
        Ok(())
    }

    /// PDF operator: `Tr`
    pub fn do_Tr(&mut self, mode: f64) -> Result<()> {
        self.gstack.current_mut().render_mode = mode as i64;
        Ok(())
    }

    /// PDF operator: `Ts`
    pub fn do_Ts(&mut self, rise: f64) -> Result<()> {
        self.gstack.current_mut().rise = rise;
        Ok(())
    }

    /// Moves to the start of the next line, offset from the start of the
    /// current one.
    ///
    /// PDF operator: `Td`
    pub fn do_Td(&mut self, tx: f64, ty: f64) -> Result<()> {
        let text = self.text_object("Td")?;
        text.tlm = mult_matrix(translation(tx, ty), text.tlm);
        text.tm = text.tlm;
        Ok(())
    }

    /// Like `Td`, and sets the leading to `-ty`.
    ///
    /// PDF operator: `TD`
    pub fn do_TD(&mut self, tx: f64, ty: f64) -> Result<()> {
        self.text_object("TD")?;
        self.gstack.current_mut().leading = -ty;
        self.do_Td(tx, ty)
    }

    /// PDF operator: `Tm`
    pub fn do_Tm(&mut self, matrix: Matrix) -> Result<()> {
        let text = self.text_object("Tm")?;
        text.tm = matrix;
        text.tlm = matrix;
        Ok(())
    }

    /// PDF operator: `T*`
    pub fn do_T_star(&mut self) -> Result<()> {
        let leading = self.gstack.current().leading;
        self.text_object("T*")?;
        self.do_Td(0.0, -leading)
    }

    /// PDF operator: `Tj`
    pub fn do_Tj(&mut self, string: &PDFObject) -> Result<()> {
        self.show_text("Tj", std::slice::from_ref(string))
    }

    /// Shows strings with positioning adjustments in between. Numbers move
    /// the next glyph left by thousandths of the font size.
    ///
    /// PDF operator: `TJ`
    pub fn do_TJ(&mut self, array: &PDFObject) -> Result<()> {
        let items = array
            .as_array()
            .map_err(|_| PdfError::syntax("`TJ` needs an array operand"))?;
        self.show_text("TJ", items)
    }

    /// PDF operator: `'`
    pub fn do_quote(&mut self, string: &PDFObject) -> Result<()> {
        self.text_object("'")?;
        self.do_T_star()?;
        self.show_text("'", std::slice::from_ref(string))
    }

    /// PDF operator: `"`
    pub fn do_doublequote(&mut self, word_spacing: f64, char_spacing: f64, string: &PDFObject) -> Result<()> {
        self.text_object("\"")?;
        let state = self.gstack.current_mut();
        state.word_spacing = word_spacing;
        state.char_spacing = char_spacing;
        self.do_quote(string)
    }

    fn text_object(&mut self, op: &str) -> Result<&mut TextObject> {
        self.text
            .as_mut()
            .ok_or_else(|| PdfError::syntax(format!("`{op}` outside a text object")))
    }

    /// Lays out one showing operation as a glyph run and advances Tm past
    /// it.
    fn show_text(&mut self, op: &str, items: &[PDFObject]) -> Result<()> {
        let text = *self.text_object(op)?;
        let state = self.gstack.current();
        let font = state
            .font
            .clone()
            .ok_or_else(|| PdfError::syntax(format!("`{op}` before any `Tf`")))?;
        let size = state.font_size;
        let scale = state.horizontal_scale / 100.0;

        let mut codes = Vec::new();
        let mut offsets = Vec::new();
        let mut x = 0.0;
        let mut after_space = false;
        for item in items {
            match item {
                PDFObject::String(bytes) => {
                    for code in font.widths.decode(bytes) {
                        let is_space = font.is_word_space(code);
                        // Word spacing is added once per run of spaces.
                        let word = if is_space && !after_space {
                            state.word_spacing
                        } else {
                            0.0
                        };
                        after_space = is_space;
                        codes.push(code);
                        offsets.push(x);
                        let width = font.widths.width(code) / 1000.0 * size;
                        x += (width + state.char_spacing + word) * scale;
                    }
                }
                PDFObject::Int(_) | PDFObject::Real(_) => {
                    let adjust = item.as_num()?;
                    x -= adjust / 1000.0 * size * scale;
                }
                other => {
                    return Err(PdfError::syntax(format!(
                        "`{op}` cannot show a {}",
                        other.type_name()
                    )));
                }
            }
        }

        if !codes.is_empty() {
            let glyph_space = mult_matrix(GLYPH_FLIP, (size * scale, 0.0, 0.0, size, 0.0, state.rise));
            let run = GlyphRun {
                font,
                font_size: size,
                codes,
                offsets,
                text_matrix: text.tm,
                matrix: mult_matrix(mult_matrix(glyph_space, text.tm), state.ctm),
                glyph_space,
                ctm: state.ctm,
                advance: x,
            };
            self.handler.show_text(&run, state);
        }
        if let Some(text) = self.text.as_mut() {
            text.tm = mult_matrix(translation(x, 0.0), text.tm);
        }
        Ok(())
    }
}
