//! Graphics state and the `q`/`Q` save stack.

use super::Handle;
use super::color::{Color, PDFColorSpace};
use super::font::LoadedFont;
use super::objects::PDFObject;
use super::path::ClipRegion;
use crate::error::{PdfError, Result};
use crate::utils::{MATRIX_IDENTITY, Matrix};
use std::sync::Arc;

/// Snapshot of everything `q` saves and `Q` restores.
///
/// Cloned wholesale on save. Handles are reference counted, so a clone is
/// cheap.
#[derive(Debug, Clone)]
pub struct GraphicsState {
    /// Current transformation matrix, user space to device space
    pub ctm: Matrix,

    pub fill_space: PDFColorSpace,
    pub fill_color: Color,
    pub fill_paint: Option<Handle>,
    pub stroke_space: PDFColorSpace,
    pub stroke_color: Color,
    pub stroke_paint: Option<Handle>,

    pub fill_alpha: f64,
    pub stroke_alpha: f64,
    pub blend_mode: String,
    pub alpha_is_shape: bool,
    pub soft_mask: Option<PDFObject>,
    pub fill_composite: Option<Handle>,
    pub stroke_composite: Option<Handle>,

    pub line_width: f64,
    pub line_cap: i64,
    pub line_join: i64,
    pub miter_limit: f64,
    /// Dash pattern: (array, phase)
    pub dash: (Vec<f64>, f64),
    /// Stroke object derived from the line style
    pub stroke: Option<Handle>,
    pub rendering_intent: String,
    pub flatness: f64,

    /// Clip in device space, `None` means unclipped
    pub clip: Option<ClipRegion>,

    pub font: Option<Arc<LoadedFont>>,
    pub font_size: f64,
    pub char_spacing: f64,
    pub word_spacing: f64,
    /// Horizontal scaling percentage (100 = normal)
    pub horizontal_scale: f64,
    pub leading: f64,
    pub rise: f64,
    /// Text rendering mode (0-7)
    pub render_mode: i64,
    pub knockout: bool,
}

impl GraphicsState {
    pub fn new(ctm: Matrix) -> Self {
        Self {
            ctm,
            fill_space: PDFColorSpace::device_gray(),
            fill_color: Color::default(),
            fill_paint: None,
            stroke_space: PDFColorSpace::device_gray(),
            stroke_color: Color::default(),
            stroke_paint: None,
            fill_alpha: 1.0,
            stroke_alpha: 1.0,
            blend_mode: "Normal".to_string(),
            alpha_is_shape: false,
            soft_mask: None,
            fill_composite: None,
            stroke_composite: None,
            line_width: 1.0,
            line_cap: 0,
            line_join: 0,
            miter_limit: 10.0,
            dash: (Vec::new(), 0.0),
            stroke: None,
            rendering_intent: "RelativeColorimetric".to_string(),
            flatness: 1.0,
            clip: None,
            font: None,
            font_size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 100.0,
            leading: 0.0,
            rise: 0.0,
            render_mode: 0,
            knockout: true,
        }
    }
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self::new(MATRIX_IDENTITY)
    }
}

/// The current state plus the states saved by `q`. Never empty.
#[derive(Debug, Clone)]
pub struct GraphicsStack {
    states: Vec<GraphicsState>,
}

impl GraphicsStack {
    pub fn new(initial: GraphicsState) -> Self {
        Self {
            states: vec![initial],
        }
    }

    pub fn current(&self) -> &GraphicsState {
        &self.states[self.states.len() - 1]
    }

    pub fn current_mut(&mut self) -> &mut GraphicsState {
        let top = self.states.len() - 1;
        &mut self.states[top]
    }

    /// Number of states including the current one.
    pub fn depth(&self) -> usize {
        self.states.len()
    }

    pub fn save(&mut self) {
        let copy = self.current().clone();
        self.states.push(copy);
    }

    /// Discards the current state and returns it; the saved one becomes
    /// current. Fails when nothing was saved.
    pub fn restore(&mut self) -> Result<GraphicsState> {
        if self.states.len() < 2 {
            return Err(PdfError::syntax("`Q` without matching `q`"));
        }
        self.states
            .pop()
            .ok_or_else(|| PdfError::syntax("graphics state stack empty"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_restore_copies() {
        let mut stack = GraphicsStack::new(GraphicsState::default());
        stack.save();
        stack.current_mut().line_width = 5.0;
        assert_eq!(stack.depth(), 2);
        let discarded = stack.restore().unwrap();
        assert_eq!(discarded.line_width, 5.0);
        assert_eq!(stack.current().line_width, 1.0);
    }

    #[test]
    fn test_extra_restore_is_error() {
        let mut stack = GraphicsStack::new(GraphicsState::default());
        assert!(matches!(
            stack.restore(),
            Err(PdfError::ContentSyntaxError(_))
        ));
        assert_eq!(stack.depth(), 1);
    }
}
