//! Renderer-facing side of the interpreter.
//!
//! A [`MarkupHandler`] receives everything a page draws. Paths arrive in
//! user space together with the graphics state that carries the CTM and the
//! paint handles; clip regions arrive already in device space.

use crate::model::{ClipRegion, GraphicsState, Handle, LoadedFont, PDFDict, Path, WindingRule};
use crate::utils::{Matrix, mult_matrix, translation};
use std::sync::Arc;

/// Maps y-up glyph space onto glyph images whose rows run downward.
pub const GLYPH_FLIP: Matrix = (1.0, 0.0, 0.0, -1.0, 0.0, 0.0);

/// One text showing operation (`Tj`, `TJ`, `'` or `"`).
#[derive(Debug, Clone)]
pub struct GlyphRun {
    pub font: Arc<LoadedFont>,
    pub font_size: f64,
    /// Character codes, split by the font's code length
    pub codes: Vec<u32>,
    /// Horizontal text-space offset of each glyph from the run origin
    pub offsets: Vec<f64>,
    /// Text matrix at the start of the run
    pub text_matrix: Matrix,
    /// Rendering matrix of the first glyph:
    /// `flip × [Tfs·Th 0 0 Tfs 0 Trise] × Tm × CTM`
    pub matrix: Matrix,
    /// Rendering matrix without the text matrix, `flip × [Tfs·Th 0 0 Tfs 0 Trise]`
    pub(crate) glyph_space: Matrix,
    pub(crate) ctm: Matrix,
    /// Text space advance of the whole run
    pub advance: f64,
}

impl GlyphRun {
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Rendering matrix of glyph `index`.
    pub fn glyph_matrix(&self, index: usize) -> Option<Matrix> {
        let offset = *self.offsets.get(index)?;
        let tm = mult_matrix(translation(offset, 0.0), self.text_matrix);
        Some(mult_matrix(mult_matrix(self.glyph_space, tm), self.ctm))
    }
}

/// Receives the draw calls of a page.
///
/// Only the painting methods are required. The page bracket, clip
/// notifications and marked-content hooks default to doing nothing.
pub trait MarkupHandler {
    /// Called before anything is drawn, with the page size in device units.
    fn begin_page(&mut self, _width: f64, _height: f64) {}

    /// Called once the page is finished, also after a failed page.
    fn end_page(&mut self) {}

    /// Strokes `path` (user space) with the state's stroke paint and stroke.
    fn stroke_path(&mut self, path: &Path, state: &GraphicsState);

    /// Fills `path` (user space) with the state's fill paint.
    fn fill_path(&mut self, path: &Path, rule: WindingRule, state: &GraphicsState);

    /// The device-space clip changed; `None` means unclipped.
    fn clip_changed(&mut self, _clip: Option<&ClipRegion>) {}

    /// Draws an image handle. `transform` maps image pixel space
    /// (y down, `w × h`) onto the device.
    fn draw_image(&mut self, image: &Handle, transform: Matrix, state: &GraphicsState);

    fn show_text(&mut self, run: &GlyphRun, state: &GraphicsState);

    /// Context handed to the font factory when a font is loaded.
    fn font_metrics_context(&self) -> Option<Handle> {
        None
    }

    /// `BMC` / `BDC`
    fn begin_marked_content(&mut self, _tag: &str, _props: Option<&PDFDict>) {}

    /// `EMC`
    fn end_marked_content(&mut self) {}

    /// `MP` / `DP`
    fn marked_content_point(&mut self, _tag: &str, _props: Option<&PDFDict>) {}
}

impl<H: MarkupHandler + ?Sized> MarkupHandler for &mut H {
    fn begin_page(&mut self, width: f64, height: f64) {
        (**self).begin_page(width, height);
    }

    fn end_page(&mut self) {
        (**self).end_page();
    }

    fn stroke_path(&mut self, path: &Path, state: &GraphicsState) {
        (**self).stroke_path(path, state);
    }

    fn fill_path(&mut self, path: &Path, rule: WindingRule, state: &GraphicsState) {
        (**self).fill_path(path, rule, state);
    }

    fn clip_changed(&mut self, clip: Option<&ClipRegion>) {
        (**self).clip_changed(clip);
    }

    fn draw_image(&mut self, image: &Handle, transform: Matrix, state: &GraphicsState) {
        (**self).draw_image(image, transform, state);
    }

    fn show_text(&mut self, run: &GlyphRun, state: &GraphicsState) {
        (**self).show_text(run, state);
    }

    fn font_metrics_context(&self) -> Option<Handle> {
        (**self).font_metrics_context()
    }

    fn begin_marked_content(&mut self, tag: &str, props: Option<&PDFDict>) {
        (**self).begin_marked_content(tag, props);
    }

    fn end_marked_content(&mut self) {
        (**self).end_marked_content();
    }

    fn marked_content_point(&mut self, tag: &str, props: Option<&PDFDict>) {
        (**self).marked_content_point(tag, props);
    }
}
