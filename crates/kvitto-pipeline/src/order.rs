//! Corner ordering: canonicalize four arbitrary points into
//! (top-left, top-right, bottom-right, bottom-left).
//!
//! The ranking is closed-form. In screen coordinates (y grows
//! downward) the top-left corner minimizes the sum `x + y` and the
//! bottom-right maximizes it; the top-right minimizes the difference
//! `y - x` and the bottom-left maximizes it. O(4), no failure mode.

use crate::types::{Point, Quad};

/// Order a quad's corners as (top-left, top-right, bottom-right,
/// bottom-left).
///
/// For each corner, compute `s = x + y` and `d = y - x`. Top-left is
/// the minimum `s`, bottom-right the maximum `s`, top-right the
/// minimum `d`, bottom-left the maximum `d`. Any four distinct points
/// produce a deterministic ordering, even when degenerate.
#[must_use = "returns the ordered quad"]
pub fn order_corners(quad: &Quad) -> Quad {
    let pts = quad.corners();

    let index_of = |key: fn(Point) -> f64, max: bool| -> usize {
        let mut best = 0usize;
        for (i, &p) in pts.iter().enumerate() {
            let better = if max {
                key(p) > key(pts[best])
            } else {
                key(p) < key(pts[best])
            };
            if better {
                best = i;
            }
        }
        best
    };

    let sum = |p: Point| p.x + p.y;
    let diff = |p: Point| p.y - p.x;

    Quad::new([
        pts[index_of(sum, false)],  // top-left: min x + y
        pts[index_of(diff, false)], // top-right: min y - x
        pts[index_of(sum, true)],   // bottom-right: max x + y
        pts[index_of(diff, true)],  // bottom-left: max y - x
    ])
}
