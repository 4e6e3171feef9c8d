//! Graphics state operators.
//!
//! Handles: q, Q, cm, w, J, j, M, d, ri, i, gs, BX, EX
//!
//! - q/Q: Push/pop graphics state, reporting clip changes on pop
//! - cm: Concatenate transformation matrix
//! - w, J, j, M, d: Line style; each change rebuilds the stroke handle
//! - ri, i: Rendering intent and flatness
//! - gs: Set parameters from an ExtGState dictionary
//! - BX/EX: Compatibility sections

use crate::error::{PdfError, Result};
use crate::interp::device::MarkupHandler;
use crate::interp::interpreter::{CompatMode, PageInterpreter};
use crate::model::{ClipRegion, PDFObject};
use crate::utils::{Matrix, mult_matrix};

#[allow(non_snake_case)]
impl<'a, H: MarkupHandler + ?Sized> PageInterpreter<'a, H> {
    /// Saves a copy of the current graphics state.
    ///
    /// PDF operator: `q`
    pub fn do_q(&mut self) -> Result<()> {
        self.gstack.save();
        Ok(())
    }

    /// Restores the last saved graphics state. A stream may only restore
    /// states it saved itself.
    ///
    /// PDF operator: `Q`
    pub fn do_Q(&mut self) -> Result<()> {
        if self.gstack.depth() <= self.stack_floor {
            return Err(PdfError::syntax("`Q` without matching `q`"));
        }
        self.restore_state()
    }

    /// Concatenates a matrix to the current transformation matrix.
    ///
    /// PDF operator: `cm`
    pub fn do_cm(&mut self, matrix: Matrix) -> Result<()> {
        let state = self.gstack.current_mut();
        state.ctm = mult_matrix(matrix, state.ctm);
        Ok(())
    }

    /// PDF operator: `w`
    pub fn do_w(&mut self, width: f64) -> Result<()> {
        self.gstack.current_mut().line_width = width;
        self.refresh_stroke();
        Ok(())
    }

    /// PDF operator: `J`
    pub fn do_J(&mut self, cap: f64) -> Result<()> {
        self.gstack.current_mut().line_cap = cap as i64;
        self.refresh_stroke();
        Ok(())
    }

    /// PDF operator: `j`
    pub fn do_j(&mut self, join: f64) -> Result<()> {
        self.gstack.current_mut().line_join = join as i64;
        self.refresh_stroke();
        Ok(())
    }

    /// PDF operator: `M`
    pub fn do_M(&mut self, limit: f64) -> Result<()> {
        self.gstack.current_mut().miter_limit = limit;
        self.refresh_stroke();
        Ok(())
    }

    /// Sets the dash pattern from an array operand and a phase.
    ///
    /// PDF operator: `d`
    pub fn do_d(&mut self, array: &PDFObject, phase: f64) -> Result<()> {
        let dashes = array
            .as_numbers()
            .map_err(|_| PdfError::syntax("`d` needs an array of numbers"))?;
        self.gstack.current_mut().dash = (dashes, phase);
        self.refresh_stroke();
        Ok(())
    }

    /// PDF operator: `ri`
    pub fn do_ri(&mut self, intent: &str) -> Result<()> {
        self.gstack.current_mut().rendering_intent = intent.to_string();
        Ok(())
    }

    /// PDF operator: `i`
    pub fn do_i(&mut self, flatness: f64) -> Result<()> {
        self.gstack.current_mut().flatness = flatness;
        Ok(())
    }

    /// Applies the entries of a named ExtGState resource. Unknown keys are
    /// ignored.
    ///
    /// PDF operator: `gs`
    pub fn do_gs(&mut self, name: &str) -> Result<()> {
        let obj = self.lookup_resource("ExtGState", name)?;
        let params = self.doc.resolve_dict(&obj)?;
        let mut line_style = false;
        let mut composite = false;
        for (key, value) in &params {
            let value = self.doc.resolve(value)?;
            let bad = |e: PdfError| PdfError::syntax(format!("ExtGState /{name} /{key}: {e}"));
            if key == "Font" {
                let (font, size) = match value.as_array().map_err(bad)?.as_slice() {
                    [font, size] => (
                        self.load_font(font)?,
                        self.doc.resolve(size)?.as_num().map_err(bad)?,
                    ),
                    _ => return Err(bad(PdfError::syntax("/Font needs [font size]"))),
                };
                let state = self.gstack.current_mut();
                state.font = Some(font);
                state.font_size = size;
                continue;
            }
            let state = self.gstack.current_mut();
            match key.as_str() {
                "LW" => {
                    state.line_width = value.as_num().map_err(bad)?;
                    line_style = true;
                }
                "LC" => {
                    state.line_cap = value.as_int().map_err(bad)?;
                    line_style = true;
                }
                "LJ" => {
                    state.line_join = value.as_int().map_err(bad)?;
                    line_style = true;
                }
                "ML" => {
                    state.miter_limit = value.as_num().map_err(bad)?;
                    line_style = true;
                }
                "D" => {
                    let (dashes, phase) = match value.as_array().map_err(bad)?.as_slice() {
                        [dashes, phase] => (
                            dashes.as_numbers().map_err(bad)?,
                            phase.as_num().map_err(bad)?,
                        ),
                        _ => return Err(bad(PdfError::syntax("/D needs [array phase]"))),
                    };
                    state.dash = (dashes, phase);
                    line_style = true;
                }
                "RI" => state.rendering_intent = value.as_name().map_err(bad)?.to_string(),
                "FL" => state.flatness = value.as_num().map_err(bad)?,
                "BM" => {
                    // An array lists fallbacks; the first entry is preferred.
                    let mode = match &value {
                        PDFObject::Array(modes) => modes.first().cloned().unwrap_or_default(),
                        other => other.clone(),
                    };
                    state.blend_mode = mode.as_name().map_err(bad)?.to_string();
                    composite = true;
                }
                "AIS" => {
                    state.alpha_is_shape = value.as_bool().map_err(bad)?;
                    composite = true;
                }
                "CA" => {
                    state.stroke_alpha = value.as_num().map_err(bad)?;
                    composite = true;
                }
                "ca" => {
                    state.fill_alpha = value.as_num().map_err(bad)?;
                    composite = true;
                }
                "SMask" => {
                    state.soft_mask = match value {
                        PDFObject::Name(n) if n == "None" => None,
                        other => Some(other),
                    };
                }
                "TK" => state.knockout = value.as_bool().map_err(bad)?,
                _ => {}
            }
        }
        if line_style {
            self.refresh_stroke();
        }
        if composite {
            self.refresh_composites();
        }
        Ok(())
    }

    /// Opens a compatibility section.
    ///
    /// PDF operator: `BX`
    pub fn do_BX(&mut self) -> Result<()> {
        self.compat_depth += 1;
        self.compat = CompatMode::Lenient;
        Ok(())
    }

    /// PDF operator: `EX`
    pub fn do_EX(&mut self) -> Result<()> {
        if self.compat_depth <= self.compat_floor {
            return Err(PdfError::syntax("`EX` without matching `BX`"));
        }
        self.compat_depth -= 1;
        if self.compat_depth == 0 {
            self.compat = CompatMode::Strict;
        }
        Ok(())
    }

    /// Pops one state and tells the handler if the clip changed.
    pub(crate) fn restore_state(&mut self) -> Result<()> {
        let discarded = self.gstack.restore()?;
        let current = self.gstack.current();
        if discarded.clip != current.clip {
            self.handler.clip_changed(current.clip.as_ref());
        }
        Ok(())
    }

    /// Replaces the clip of the current state and notifies the handler.
    pub(crate) fn set_clip(&mut self, clip: Option<ClipRegion>) {
        self.gstack.current_mut().clip = clip;
        self.handler.clip_changed(self.gstack.current().clip.as_ref());
    }

    pub(crate) fn refresh_stroke(&mut self) {
        let stroke = self.factories.path.create_stroke(self.gstack.current());
        self.gstack.current_mut().stroke = Some(stroke);
    }

    pub(crate) fn refresh_composites(&mut self) {
        let state = self.gstack.current();
        let color = &self.factories.color;
        let fill = color.create_composite(
            &state.fill_space,
            &state.blend_mode,
            state.alpha_is_shape,
            state.fill_alpha,
        );
        let stroke = color.create_composite(
            &state.stroke_space,
            &state.blend_mode,
            state.alpha_is_shape,
            state.stroke_alpha,
        );
        let state = self.gstack.current_mut();
        state.fill_composite = Some(fill);
        state.stroke_composite = Some(stroke);
    }
}
