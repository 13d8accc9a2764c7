//! Perspective warping: flatten an ordered quadrilateral into an
//! axis-aligned image.
//!
//! The 3x3 projective transform mapping the source quad onto the
//! destination rectangle is found by solving the standard 8-unknown
//! linear system (LU decomposition via `nalgebra`). The warp itself
//! inverse-maps every destination pixel through the transform and
//! samples the source bilinearly with edge replication, which is
//! pixel-accurate along straight edges — the case that matters for
//! machine-read text.

use image::{Rgb, RgbImage};
use nalgebra::{DMatrix, DVector, Matrix3, RowDVector, Vector3};

use crate::types::{Point, Quad};

/// Destination size for a warp: the larger of the two opposite edge
/// lengths in each direction.
///
/// Width candidates are the top and bottom edge lengths of the
/// ordered quad, height candidates the left and right edges.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn target_dimensions(quad: &Quad) -> (u32, u32) {
    let [tl, tr, br, bl] = *quad.corners();

    let width_top = tl.distance(tr);
    let width_bottom = bl.distance(br);
    let width = width_top.max(width_bottom).round() as u32;

    let height_left = tl.distance(bl);
    let height_right = tr.distance(br);
    let height = height_left.max(height_right).round() as u32;

    (width, height)
}

/// Flatten the quadrilateral region of `image` into a new
/// axis-aligned image.
///
/// `quad` must already be in (top-left, top-right, bottom-right,
/// bottom-left) order. Returns `None` when the destination collapses
/// to zero pixels or the projective system is singular (collinear
/// corners); the caller treats that as a failed warp and falls back
/// to the unwarped image.
#[must_use = "returns the flattened image"]
pub fn warp(image: &RgbImage, quad: &Quad) -> Option<RgbImage> {
    let (width, height) = target_dimensions(quad);
    if width == 0 || height == 0 {
        return None;
    }

    let destination = [
        Point::new(0.0, 0.0),
        Point::new(f64::from(width - 1), 0.0),
        Point::new(f64::from(width - 1), f64::from(height - 1)),
        Point::new(0.0, f64::from(height - 1)),
    ];

    let forward = perspective_transform(quad.corners(), &destination)?;
    let inverse = forward.try_inverse()?;

    let mut out = RgbImage::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let dst = Vector3::new(f64::from(x), f64::from(y), 1.0);
            let src = inverse * dst;
            let pixel = if src.z.abs() > f64::EPSILON {
                sample_bilinear(image, src.x / src.z, src.y / src.z)
            } else {
                // Degenerate ray: replicate the top-left corner.
                *image.get_pixel(0, 0)
            };
            out.put_pixel(x, y, pixel);
        }
    }
    Some(out)
}

/// Solve for the 3x3 projective transform mapping `src` onto `dst`.
///
/// Each point pair contributes two rows to an 8x8 system in the eight
/// free coefficients (the ninth is fixed at 1). Returns `None` when
/// the system is singular.
fn perspective_transform(src: &[Point; 4], dst: &[Point; 4]) -> Option<Matrix3<f64>> {
    let mut a = DMatrix::<f64>::zeros(8, 8);
    let mut b = DVector::<f64>::zeros(8);

    for i in 0..4 {
        let s = src[i];
        let d = dst[i];

        a.set_row(
            i * 2,
            &RowDVector::from_row_slice(&[
                s.x,
                s.y,
                1.0,
                0.0,
                0.0,
                0.0,
                -s.x * d.x,
                -s.y * d.x,
            ]),
        );
        b[i * 2] = d.x;

        a.set_row(
            i * 2 + 1,
            &RowDVector::from_row_slice(&[
                0.0,
                0.0,
                0.0,
                s.x,
                s.y,
                1.0,
                -s.x * d.y,
                -s.y * d.y,
            ]),
        );
        b[i * 2 + 1] = d.y;
    }

    let h = a.lu().solve(&b)?;
    Some(Matrix3::new(
        h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0,
    ))
}

/// Bilinear sample with edge replication for out-of-bounds
/// coordinates.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::many_single_char_names
)]
fn sample_bilinear(image: &RgbImage, x: f64, y: f64) -> Rgb<u8> {
    let w = i64::from(image.width()) - 1;
    let h = i64::from(image.height()) - 1;

    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;

    let clamp = |v: i64, hi: i64| v.clamp(0, hi) as u32;
    let x0i = clamp(x0 as i64, w);
    let x1i = clamp(x0 as i64 + 1, w);
    let y0i = clamp(y0 as i64, h);
    let y1i = clamp(y0 as i64 + 1, h);

    let p00 = image.get_pixel(x0i, y0i).0;
    let p10 = image.get_pixel(x1i, y0i).0;
    let p01 = image.get_pixel(x0i, y1i).0;
    let p11 = image.get_pixel(x1i, y1i).0;

    let mut out = [0u8; 3];
    for c in 0..3 {
        let top = f64::from(p00[c]).mul_add(1.0 - fx, f64::from(p10[c]) * fx);
        let bottom = f64::from(p01[c]).mul_add(1.0 - fx, f64::from(p11[c]) * fx);
        let value = top.mul_add(1.0 - fy, bottom * fy);
        out[c] = value.round().clamp(0.0, 255.0) as u8;
    }
    Rgb(out)
}
