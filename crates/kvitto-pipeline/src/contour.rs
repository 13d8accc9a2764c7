//! Contour geometry: extraction, area, perimeter, and polygon
//! approximation.
//!
//! Extraction wraps [`imageproc::contours::find_contours`] (Suzuki-Abe
//! border following) and keeps only external borders, matching the
//! "outermost boundary only" retrieval the detector needs. Polygon
//! approximation is Ramer-Douglas-Peucker on the closed curve.

use image::GrayImage;

use crate::types::Point;

/// Extract external contours from a binary image.
///
/// Input: white pixels (255) are foreground, black (0) background.
/// Returns one point sequence per outermost connected region; holes
/// and nested borders are skipped. Contours with fewer than 4 points
/// cannot enclose a quadrilateral and are dropped.
#[must_use = "returns the extracted contours"]
pub fn external_contours(binary: &GrayImage) -> Vec<Vec<Point>> {
    let contours: Vec<imageproc::contours::Contour<u32>> =
        imageproc::contours::find_contours(binary);

    contours
        .into_iter()
        .filter(|c| {
            c.border_type == imageproc::contours::BorderType::Outer && c.parent.is_none()
        })
        .filter(|c| c.points.len() >= 4)
        .map(|c| {
            c.points
                .into_iter()
                .map(|p| Point::new(f64::from(p.x), f64::from(p.y)))
                .collect()
        })
        .collect()
}

/// Enclosed area of a closed polygon in square pixels (shoelace
/// formula). Vertex order does not matter; the result is always
/// non-negative.
#[must_use]
pub fn polygon_area(points: &[Point]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice_area = 0.0;
    for (i, p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        twice_area += p.x.mul_add(q.y, -(q.x * p.y));
    }
    twice_area.abs() / 2.0
}

/// Perimeter of a closed polygon.
#[must_use]
pub fn perimeter(points: &[Point]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    points
        .iter()
        .enumerate()
        .map(|(i, p)| p.distance(points[(i + 1) % points.len()]))
        .sum()
}

/// Bounding-box aspect ratio: longest side of the axis-aligned
/// bounding box divided by the shortest.
///
/// Degenerate boxes (zero width or height) return infinity, which
/// fails any finite acceptance bound.
#[must_use]
pub fn bounding_aspect_ratio(points: &[Point]) -> f64 {
    let mut min_x = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for p in points {
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
        min_y = min_y.min(p.y);
        max_y = max_y.max(p.y);
    }
    let w = max_x - min_x;
    let h = max_y - min_y;
    if w <= 0.0 || h <= 0.0 {
        return f64::INFINITY;
    }
    w.max(h) / w.min(h)
}

/// Approximate a closed contour with a simpler polygon.
///
/// Ramer-Douglas-Peucker with an absolute tolerance in pixels.
/// The traversal is anchored at the point farthest from the contour
/// centroid so the open/close seam falls on a true extreme vertex;
/// starting mid-edge would otherwise pin a collinear point into the
/// result and turn rectangles into pentagons.
#[must_use = "returns the approximated polygon"]
pub fn approx_polygon(points: &[Point], tolerance: f64) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let n = points.len();
    #[allow(clippy::cast_precision_loss)]
    let centroid = Point::new(
        points.iter().map(|p| p.x).sum::<f64>() / n as f64,
        points.iter().map(|p| p.y).sum::<f64>() / n as f64,
    );
    let anchor = points
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| {
            a.distance_squared(centroid)
                .total_cmp(&b.distance_squared(centroid))
        })
        .map_or(0, |(i, _)| i);

    // Rotate so the traversal starts at the anchor, then close the
    // curve by appending the anchor again.
    let mut closed: Vec<Point> = Vec::with_capacity(n + 1);
    closed.extend_from_slice(&points[anchor..]);
    closed.extend_from_slice(&points[..anchor]);
    closed.push(points[anchor]);

    let mut kept = vec![false; closed.len()];
    kept[0] = true;
    kept[closed.len() - 1] = true;
    rdp_recurse(&closed, 0, closed.len() - 1, tolerance, &mut kept);

    // Drop the duplicated closing point.
    closed
        .iter()
        .zip(&kept)
        .take(closed.len() - 1)
        .filter(|&(_, k)| *k)
        .map(|(&p, _)| p)
        .collect()
}

/// Recursive step of the Ramer-Douglas-Peucker algorithm.
///
/// Finds the point between `start` and `end` that is farthest from the
/// line segment between them. If that distance exceeds `tolerance`, the
/// point is kept and both sub-segments are processed recursively.
fn rdp_recurse(points: &[Point], start: usize, end: usize, tolerance: f64, kept: &mut [bool]) {
    if end <= start + 1 {
        return;
    }

    let mut max_dist = 0.0;
    let mut max_idx = start;

    for i in (start + 1)..end {
        let d = perpendicular_distance(points[i], points[start], points[end]);
        if d > max_dist {
            max_dist = d;
            max_idx = i;
        }
    }

    if max_dist > tolerance {
        kept[max_idx] = true;
        rdp_recurse(points, start, max_idx, tolerance, kept);
        rdp_recurse(points, max_idx, end, tolerance, kept);
    }
}

/// Perpendicular distance from point `p` to the line defined by `a` and `b`.
///
/// Uses the formula: |cross(b-a, p-a)| / |b-a|.
/// When `a` and `b` coincide, returns the distance from `p` to `a`.
fn perpendicular_distance(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let length_sq = dx.mul_add(dx, dy * dy);

    if length_sq == 0.0 {
        return p.distance(a);
    }

    let cross = dx.mul_add(a.y - p.y, -(dy * (a.x - p.x)));
    cross.abs() / length_sq.sqrt()
}
