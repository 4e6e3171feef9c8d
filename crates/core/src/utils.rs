//! Geometry helpers shared by the interpreter and the renderer interfaces.
//!
//! Matrices use the PDF row-vector convention: `(a, b, c, d, e, f)` maps
//! `(x, y)` to `(ax + cy + e, bx + dy + f)`.

/// A 2D point (x, y).
pub type Point = (f64, f64);

/// A rectangle `(x0, y0, x1, y1)`.
pub type Rect = (f64, f64, f64, f64);

/// A 6-element affine transformation matrix (a, b, c, d, e, f).
pub type Matrix = (f64, f64, f64, f64, f64, f64);

/// Identity transformation matrix.
pub const MATRIX_IDENTITY: Matrix = (1.0, 0.0, 0.0, 1.0, 0.0, 0.0);

/// Small epsilon for floating-point comparisons.
pub const EPSILON: f64 = 1e-9;

#[inline]
pub fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() < epsilon
}

/// Concatenates two matrices so that the result applies `m1` first and `m0`
/// second.
pub fn mult_matrix(m1: Matrix, m0: Matrix) -> Matrix {
    let (a1, b1, c1, d1, e1, f1) = m1;
    let (a0, b0, c0, d0, e0, f0) = m0;
    (
        a0 * a1 + c0 * b1,
        b0 * a1 + d0 * b1,
        a0 * c1 + c0 * d1,
        b0 * c1 + d0 * d1,
        a0 * e1 + c0 * f1 + e0,
        b0 * e1 + d0 * f1 + f0,
    )
}

/// Translation matrix.
pub fn translation(tx: f64, ty: f64) -> Matrix {
    (1.0, 0.0, 0.0, 1.0, tx, ty)
}

/// Inverse of an affine matrix, `None` when it is singular.
pub fn invert_matrix(m: Matrix) -> Option<Matrix> {
    let (a, b, c, d, e, f) = m;
    let det = a * d - b * c;
    if det.abs() < EPSILON {
        return None;
    }
    let ia = d / det;
    let ib = -b / det;
    let ic = -c / det;
    let id = a / det;
    Some((ia, ib, ic, id, -(e * ia + f * ic), -(e * ib + f * id)))
}

/// Applies a matrix to a point.
pub fn apply_matrix_pt(m: Matrix, v: Point) -> Point {
    let (a, b, c, d, e, f) = m;
    let (x, y) = v;
    (a * x + c * y + e, b * x + d * y + f)
}

/// Applies a matrix to a rectangle.
///
/// The result is the axis-aligned box that tightly fits the transformed
/// corners.
pub fn apply_matrix_rect(m: Matrix, rect: Rect) -> Rect {
    let (x0, y0, x1, y1) = rect;
    get_bound([
        apply_matrix_pt(m, (x0, y0)),
        apply_matrix_pt(m, (x1, y0)),
        apply_matrix_pt(m, (x1, y1)),
        apply_matrix_pt(m, (x0, y1)),
    ])
}

/// Bounding box of a set of points. Empty input yields an inverted box.
pub fn get_bound<I: IntoIterator<Item = Point>>(pts: I) -> Rect {
    let mut x0 = f64::MAX;
    let mut y0 = f64::MAX;
    let mut x1 = f64::MIN;
    let mut y1 = f64::MIN;
    for (x, y) in pts {
        x0 = x0.min(x);
        y0 = y0.min(y);
        x1 = x1.max(x);
        y1 = y1.max(y);
    }
    (x0, y0, x1, y1)
}

/// Normalizes a rectangle so that `x0 <= x1` and `y0 <= y1`.
pub fn normalize_rect(r: Rect) -> Rect {
    let (x0, y0, x1, y1) = r;
    (x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
}

/// Intersection of two normalized rectangles, `None` if they do not overlap.
pub fn intersect_rect(a: Rect, b: Rect) -> Option<Rect> {
    let x0 = a.0.max(b.0);
    let y0 = a.1.max(b.1);
    let x1 = a.2.min(b.2);
    let y1 = a.3.min(b.3);
    (x0 <= x1 && y0 <= y1).then_some((x0, y0, x1, y1))
}

pub fn matrix2str(m: Matrix) -> String {
    let (a, b, c, d, e, f) = m;
    format!("[{a:.2},{b:.2},{c:.2},{d:.2}, ({e:.2},{f:.2})]")
}
