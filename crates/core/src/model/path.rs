//! Path accumulator and clip regions.
//!
//! The current path is owned by the interpreter, not by the graphics state:
//! `q`/`Q` never save or restore it and every painting operator empties it.

use crate::error::{PdfError, Result};
use crate::utils::{Matrix, Point, Rect, apply_matrix_pt, get_bound, intersect_rect};

/// Path segment types for PDF path construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSegment {
    MoveTo(Point),
    LineTo(Point),
    /// Cubic Bezier: two control points and the end point
    CurveTo(Point, Point, Point),
    ClosePath,
}

/// Fill rule used for filling and clipping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindingRule {
    #[default]
    NonZero,
    EvenOdd,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Path {
    segments: Vec<PathSegment>,
    current: Option<Point>,
    subpath_start: Option<Point>,
    pub winding: WindingRule,
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Current point, undefined (None) on an empty path.
    pub fn current_point(&self) -> Option<Point> {
        self.current
    }

    pub fn move_to(&mut self, p: Point) {
        // A moveto directly after a moveto replaces it.
        if let Some(PathSegment::MoveTo(_)) = self.segments.last() {
            self.segments.pop();
        }
        self.segments.push(PathSegment::MoveTo(p));
        self.current = Some(p);
        self.subpath_start = Some(p);
    }

    pub fn line_to(&mut self, p: Point) -> Result<()> {
        self.require_current("l")?;
        self.segments.push(PathSegment::LineTo(p));
        self.current = Some(p);
        Ok(())
    }

    pub fn curve_to(&mut self, c1: Point, c2: Point, p: Point) -> Result<()> {
        self.require_current("c")?;
        self.segments.push(PathSegment::CurveTo(c1, c2, p));
        self.current = Some(p);
        Ok(())
    }

    /// Closes the current subpath. A no-op on an empty path.
    pub fn close(&mut self) {
        if self.current.is_none() {
            return;
        }
        self.segments.push(PathSegment::ClosePath);
        self.current = self.subpath_start;
    }

    /// Appends a closed rectangle subpath, as `re` does.
    pub fn rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.segments.push(PathSegment::MoveTo((x, y)));
        self.segments.push(PathSegment::LineTo((x + w, y)));
        self.segments.push(PathSegment::LineTo((x + w, y + h)));
        self.segments.push(PathSegment::LineTo((x, y + h)));
        self.segments.push(PathSegment::ClosePath);
        self.current = Some((x, y));
        self.subpath_start = Some((x, y));
    }

    /// Builds a closed rectangle path from corner coordinates.
    pub fn from_rect(r: Rect) -> Self {
        let mut path = Self::new();
        path.rect(r.0, r.1, r.2 - r.0, r.3 - r.1);
        path
    }

    fn require_current(&self, op: &str) -> Result<()> {
        if self.current.is_none() {
            return Err(PdfError::syntax(format!("`{op}` without a current point")));
        }
        Ok(())
    }

    /// Takes the accumulated path, leaving this one empty.
    pub fn take(&mut self) -> Path {
        std::mem::take(self)
    }

    pub fn transform(&self, m: Matrix) -> Path {
        let map = |p: Point| apply_matrix_pt(m, p);
        Path {
            segments: self
                .segments
                .iter()
                .map(|seg| match *seg {
                    PathSegment::MoveTo(p) => PathSegment::MoveTo(map(p)),
                    PathSegment::LineTo(p) => PathSegment::LineTo(map(p)),
                    PathSegment::CurveTo(a, b, p) => PathSegment::CurveTo(map(a), map(b), map(p)),
                    PathSegment::ClosePath => PathSegment::ClosePath,
                })
                .collect(),
            current: self.current.map(map),
            subpath_start: self.subpath_start.map(map),
            winding: self.winding,
        }
    }

    /// Control-point bounding box, `None` for an empty path.
    pub fn bounds(&self) -> Option<Rect> {
        let mut points = Vec::with_capacity(self.segments.len() * 3);
        for seg in &self.segments {
            match *seg {
                PathSegment::MoveTo(p) | PathSegment::LineTo(p) => points.push(p),
                PathSegment::CurveTo(a, b, p) => points.extend([a, b, p]),
                PathSegment::ClosePath => {}
            }
        }
        (!points.is_empty()).then(|| get_bound(points))
    }

    /// Returns the rectangle if this path is one axis-aligned rectangle.
    pub fn as_rect(&self) -> Option<Rect> {
        let pts: Vec<Point> = match self.segments.as_slice() {
            [
                PathSegment::MoveTo(a),
                PathSegment::LineTo(b),
                PathSegment::LineTo(c),
                PathSegment::LineTo(d),
                rest @ ..,
            ] if rest.is_empty()
                || matches!(rest, [PathSegment::ClosePath])
                || matches!(rest, [PathSegment::LineTo(e)] if e == a)
                || matches!(rest, [PathSegment::LineTo(e), PathSegment::ClosePath] if e == a) =>
            {
                vec![*a, *b, *c, *d]
            }
            _ => return None,
        };
        let horizontal_first = pts[0].1 == pts[1].1
            && pts[1].0 == pts[2].0
            && pts[2].1 == pts[3].1
            && pts[3].0 == pts[0].0;
        let vertical_first = pts[0].0 == pts[1].0
            && pts[1].1 == pts[2].1
            && pts[2].0 == pts[3].0
            && pts[3].1 == pts[0].1;
        (horizontal_first || vertical_first).then(|| get_bound(pts))
    }
}

/// Clip region in device space: the intersection of all listed paths.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClipRegion {
    pub paths: Vec<Path>,
}

impl ClipRegion {
    pub fn new(path: Path) -> Self {
        Self { paths: vec![path] }
    }

    /// Intersects with another device-space path. Two rectangles collapse into
    /// one; anything else is kept as an extra member of the intersection.
    pub fn intersect(&self, path: Path) -> ClipRegion {
        if let [only] = self.paths.as_slice()
            && let (Some(a), Some(b)) = (only.as_rect(), path.as_rect())
        {
            let r = intersect_rect(a, b).unwrap_or((a.0, a.1, a.0, a.1));
            return ClipRegion::new(Path::from_rect(r));
        }
        let mut paths = self.paths.clone();
        paths.push(path);
        ClipRegion { paths }
    }

    /// Bounding box of the region, `None` if it is empty.
    pub fn bounds(&self) -> Option<Rect> {
        self.paths
            .iter()
            .map(|p| p.bounds())
            .try_fold(None::<Rect>, |acc, b| {
                let b = b?;
                Some(Some(match acc {
                    None => b,
                    Some(a) => intersect_rect(a, b)?,
                }))
            })
            .flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_without_moveto_fails() {
        let mut path = Path::new();
        assert!(matches!(
            path.line_to((1.0, 1.0)),
            Err(PdfError::ContentSyntaxError(_))
        ));
        path.move_to((0.0, 0.0));
        assert!(path.line_to((1.0, 1.0)).is_ok());
        assert_eq!(path.current_point(), Some((1.0, 1.0)));
    }

    #[test]
    fn test_rect_detection() {
        let path = Path::from_rect((0.0, 0.0, 100.0, 50.0));
        assert_eq!(path.as_rect(), Some((0.0, 0.0, 100.0, 50.0)));
        let flipped = path.transform((1.0, 0.0, 0.0, -1.0, 0.0, 200.0));
        assert_eq!(flipped.as_rect(), Some((0.0, 150.0, 100.0, 200.0)));

        let mut tri = Path::new();
        tri.move_to((0.0, 0.0));
        tri.line_to((10.0, 0.0)).unwrap();
        tri.line_to((5.0, 5.0)).unwrap();
        tri.close();
        assert_eq!(tri.as_rect(), None);
    }

    #[test]
    fn test_clip_intersection() {
        let clip = ClipRegion::new(Path::from_rect((0.0, 0.0, 100.0, 100.0)));
        let narrowed = clip.intersect(Path::from_rect((50.0, 50.0, 200.0, 200.0)));
        assert_eq!(narrowed.paths.len(), 1);
        assert_eq!(narrowed.bounds(), Some((50.0, 50.0, 100.0, 100.0)));

        let mut tri = Path::new();
        tri.move_to((0.0, 0.0));
        tri.line_to((60.0, 0.0)).unwrap();
        tri.line_to((0.0, 60.0)).unwrap();
        tri.close();
        let mixed = narrowed.intersect(tri);
        assert_eq!(mixed.paths.len(), 2);
        assert_eq!(mixed.bounds(), Some((50.0, 50.0, 60.0, 60.0)));
    }
}
