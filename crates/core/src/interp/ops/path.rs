//! Path construction and painting operators.
//!
//! Handles: m, l, c, v, y, h, re, S, s, f, F, f*, B, B*, b, b*, n, W, W*
//!
//! Path construction:
//! - m: Begin new subpath
//! - l: Line segment
//! - c, v, y: Cubic Bezier curves (v and y reuse an endpoint as control point)
//! - h: Close subpath
//! - re: Rectangle
//!
//! Path painting:
//! - S/s: Stroke (s closes first)
//! - f/F/f*: Fill (nonzero / even-odd)
//! - B/B*/b/b*: Fill then stroke (b variants close first)
//! - n: End path without painting
//!
//! Clipping:
//! - W/W*: Intersect the clip with the path once it has been painted

use crate::error::{PdfError, Result};
use crate::interp::device::MarkupHandler;
use crate::interp::interpreter::{PageInterpreter, PendingClip};
use crate::model::{Path, WindingRule};
use crate::utils::Point;

#[allow(non_snake_case)]
impl<'a, H: MarkupHandler + ?Sized> PageInterpreter<'a, H> {
    /// PDF operator: `m`
    pub fn do_m(&mut self, x: f64, y: f64) -> Result<()> {
        self.path.move_to((x, y));
        Ok(())
    }

    /// PDF operator: `l`
    pub fn do_l(&mut self, x: f64, y: f64) -> Result<()> {
        self.path.line_to((x, y))
    }

    /// PDF operator: `c`
    pub fn do_c(&mut self, c1: Point, c2: Point, end: Point) -> Result<()> {
        self.path.curve_to(c1, c2, end)
    }

    /// Curve whose first control point is the current point.
    ///
    /// PDF operator: `v`
    pub fn do_v(&mut self, c2: Point, end: Point) -> Result<()> {
        let current = self
            .path
            .current_point()
            .ok_or_else(|| PdfError::syntax("`v` without a current point"))?;
        self.path.curve_to(current, c2, end)
    }

    /// Curve whose second control point is the end point.
    ///
    /// PDF operator: `y`
    pub fn do_y(&mut self, c1: Point, end: Point) -> Result<()> {
        if self.path.current_point().is_none() {
            return Err(PdfError::syntax("`y` without a current point"));
        }
        self.path.curve_to(c1, end, end)
    }

    /// PDF operator: `h`
    pub fn do_h(&mut self) -> Result<()> {
        self.path.close();
        Ok(())
    }

    /// PDF operator: `re`
    pub fn do_re(&mut self, x: f64, y: f64, w: f64, h: f64) -> Result<()> {
        self.path.rect(x, y, w, h);
        Ok(())
    }

    /// PDF operator: `S`
    pub fn do_S(&mut self) -> Result<()> {
        self.paint_path(None, true, false)
    }

    /// PDF operator: `s`
    pub fn do_s(&mut self) -> Result<()> {
        self.paint_path(None, true, true)
    }

    /// PDF operators: `f`, `F`
    pub fn do_f(&mut self) -> Result<()> {
        self.paint_path(Some(WindingRule::NonZero), false, false)
    }

    /// PDF operator: `f*`
    pub fn do_f_star(&mut self) -> Result<()> {
        self.paint_path(Some(WindingRule::EvenOdd), false, false)
    }

    /// PDF operator: `B`
    pub fn do_B(&mut self) -> Result<()> {
        self.paint_path(Some(WindingRule::NonZero), true, false)
    }

    /// PDF operator: `B*`
    pub fn do_B_star(&mut self) -> Result<()> {
        self.paint_path(Some(WindingRule::EvenOdd), true, false)
    }

    /// PDF operator: `b`
    pub fn do_b(&mut self) -> Result<()> {
        self.paint_path(Some(WindingRule::NonZero), true, true)
    }

    /// PDF operator: `b*`
    pub fn do_b_star(&mut self) -> Result<()> {
        self.paint_path(Some(WindingRule::EvenOdd), true, true)
    }

    /// Ends the path without painting it; used to apply a clip.
    ///
    /// PDF operator: `n`
    pub fn do_n(&mut self) -> Result<()> {
        self.paint_path(None, false, false)
    }

    /// PDF operator: `W`
    pub fn do_W(&mut self) -> Result<()> {
        self.pending_clip = Some(PendingClip(WindingRule::NonZero));
        Ok(())
    }

    /// PDF operator: `W*`
    pub fn do_W_star(&mut self) -> Result<()> {
        self.pending_clip = Some(PendingClip(WindingRule::EvenOdd));
        Ok(())
    }

    /// Empties the path under construction and returns it.
    pub(crate) fn take_path(&mut self) -> Path {
        std::mem::replace(&mut self.path, self.factories.path.create_empty_path())
    }

    /// Paints the current path (fill before stroke), clears it, then applies
    /// any clip requested since the last painting operator.
    fn paint_path(&mut self, fill: Option<WindingRule>, stroke: bool, close: bool) -> Result<()> {
        if close {
            self.path.close();
        }
        let mut path = self.take_path();
        if !path.is_empty() {
            let state = self.gstack.current();
            if let Some(rule) = fill {
                path.winding = rule;
                self.handler.fill_path(&path, rule, state);
            }
            if stroke {
                self.handler.stroke_path(&path, state);
            }
        }
        self.apply_pending_clip(&path);
        Ok(())
    }

    fn apply_pending_clip(&mut self, path: &Path) {
        let Some(PendingClip(rule)) = self.pending_clip.take() else {
            return;
        };
        let state = self.gstack.current();
        let mut device = path.transform(state.ctm);
        device.winding = rule;
        let clip = self
            .factories
            .path
            .intersect_clip(state.clip.as_ref(), device);
        self.set_clip(Some(clip));
    }
}
