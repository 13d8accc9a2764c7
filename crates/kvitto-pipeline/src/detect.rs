//! Receipt boundary detection: threshold sweep with an edge-based
//! fallback.
//!
//! Receipts are thin, elongated, roughly rectangular objects that
//! photograph with high contrast against most backgrounds. A global
//! threshold sweep handles typical lighting quickly; when uneven
//! illumination or shadows defeat global thresholding, a Canny
//! edge map (dilated once to bridge small gaps) recovers the
//! boundary. Both strategies are short-circuiting chains of pure
//! functions: the first valid quadrilateral wins.

use image::GrayImage;

use crate::contour;
use crate::diagnostics::{DetectionMetrics, DetectionStrategy};
use crate::types::{PipelineConfig, Point, Quad};

/// Outcome of a detection attempt, with the metrics the run collected
/// along the way.
#[derive(Debug, Clone)]
pub struct Detection {
    /// The winning quadrilateral, unordered, or `None` when both
    /// strategies came up empty.
    pub quad: Option<Quad>,
    /// What the detector tried and found.
    pub metrics: DetectionMetrics,
}

/// Search for the receipt's four-corner boundary.
///
/// Strategy order (first success wins):
///
/// 1. Global threshold sweep over `config.threshold_ladder`: binarize,
///    extract external contours, filter by area ratio, approximate to
///    a polygon at `config.approx_epsilon` of perimeter, keep exact
///    4-vertex results with an acceptable aspect ratio, then take the
///    largest-area candidate of the first productive threshold.
/// 2. Edge fallback: Gaussian blur, Canny, one 3x3 dilation, external
///    contours, then per contour an epsilon ladder until a valid
///    4-vertex polygon appears.
#[must_use = "returns the detection outcome"]
pub fn detect_receipt(gray: &GrayImage, config: &PipelineConfig) -> Detection {
    let image_area = f64::from(gray.width()) * f64::from(gray.height());

    let mut thresholds_tried = 0usize;
    let mut candidates_considered = 0usize;

    for &threshold in &config.threshold_ladder {
        thresholds_tried += 1;
        if let Some(quad) = sweep_pass(gray, threshold, image_area, config, &mut candidates_considered)
        {
            return Detection {
                quad: Some(quad),
                metrics: DetectionMetrics {
                    strategy: Some(DetectionStrategy::ThresholdSweep),
                    winning_threshold: Some(threshold),
                    thresholds_tried,
                    candidates_considered,
                },
            };
        }
    }

    let quad = edge_fallback(gray, image_area, config, &mut candidates_considered);
    let strategy = quad.is_some().then_some(DetectionStrategy::EdgeFallback);
    Detection {
        quad,
        metrics: DetectionMetrics {
            strategy,
            winning_threshold: None,
            thresholds_tried,
            candidates_considered,
        },
    }
}

/// One pass of the threshold sweep: binarize at `threshold` and pick
/// the largest valid 4-vertex candidate, if any.
fn sweep_pass(
    gray: &GrayImage,
    threshold: u8,
    image_area: f64,
    config: &PipelineConfig,
    candidates_considered: &mut usize,
) -> Option<Quad> {
    let binary = binarize(gray, threshold);
    let contours = contour::external_contours(&binary);
    *candidates_considered += contours.len();

    let mut best: Option<(Quad, f64)> = None;
    for points in &contours {
        let area = contour::polygon_area(points);
        let ratio = area / image_area;
        if ratio < config.threshold_min_area_ratio || ratio > config.threshold_max_area_ratio {
            continue;
        }

        let epsilon = config.approx_epsilon * contour::perimeter(points);
        let Some(quad) = valid_quad(points, epsilon, config) else {
            continue;
        };

        // Largest area wins; ties keep the first found.
        if best.as_ref().is_none_or(|&(_, best_area)| area > best_area) {
            best = Some((quad, area));
        }
    }
    best.map(|(quad, _)| quad)
}

/// Edge-based fallback: blur, Canny, dilate, then a per-contour
/// epsilon ladder. First success across both loops wins.
fn edge_fallback(
    gray: &GrayImage,
    image_area: f64,
    config: &PipelineConfig,
    candidates_considered: &mut usize,
) -> Option<Quad> {
    let blurred = if config.blur_sigma > 0.0 {
        imageproc::filter::gaussian_blur_f32(gray, config.blur_sigma)
    } else {
        gray.clone()
    };
    let high = config.canny_high.max(1.0);
    let low = config.canny_low.max(1.0).min(high);
    let edges = imageproc::edges::canny(&blurred, low, high);
    let dilated = imageproc::morphology::dilate(&edges, imageproc::distance_transform::Norm::LInf, 1);

    let contours = contour::external_contours(&dilated);
    *candidates_considered += contours.len();

    for points in &contours {
        let area = contour::polygon_area(points);
        let ratio = area / image_area;
        if ratio < config.edge_min_area_ratio || ratio > config.edge_max_area_ratio {
            continue;
        }

        let perimeter = contour::perimeter(points);
        for &factor in &config.edge_epsilon_ladder {
            if let Some(quad) = valid_quad(points, factor * perimeter, config) {
                return Some(quad);
            }
        }
    }
    None
}

/// Approximate a contour and accept it only if it reduces to exactly
/// four vertices with a receipt-like bounding-box aspect ratio.
fn valid_quad(points: &[Point], epsilon: f64, config: &PipelineConfig) -> Option<Quad> {
    let approx = contour::approx_polygon(points, epsilon);
    let corners: [Point; 4] = approx.try_into().ok()?;

    let aspect = contour::bounding_aspect_ratio(&corners);
    if aspect < config.min_aspect_ratio || aspect > config.max_aspect_ratio {
        return None;
    }
    Some(Quad::new(corners))
}

/// Global binarization: pixels strictly above `threshold` become
/// white (255), the rest black (0).
#[must_use = "returns the binarized image"]
pub fn binarize(gray: &GrayImage, threshold: u8) -> GrayImage {
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        if gray.get_pixel(x, y).0[0] > threshold {
            image::Luma([255])
        } else {
            image::Luma([0])
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    /// A bright, receipt-shaped rectangle on a dark background.
    ///
    /// 200x300 image with a 90x270 rectangle: area ratio 0.405,
    /// aspect ratio 3.0 — valid on every filter.
    fn receipt_scene() -> GrayImage {
        GrayImage::from_fn(200, 300, |x, y| {
            if (55..145).contains(&x) && (15..285).contains(&y) {
                image::Luma([250])
            } else {
                image::Luma([30])
            }
        })
    }

    #[test]
    #[allow(clippy::cast_possible_truncation)]
    fn binarize_splits_at_threshold() {
        let gray = GrayImage::from_fn(4, 1, |x, _| image::Luma([(x * 80) as u8]));
        let binary = binarize(&gray, 150);
        assert_eq!(binary.get_pixel(0, 0).0[0], 0); // 0
        assert_eq!(binary.get_pixel(1, 0).0[0], 0); // 80
        assert_eq!(binary.get_pixel(2, 0).0[0], 255); // 160
        assert_eq!(binary.get_pixel(3, 0).0[0], 255); // 240
    }

    #[test]
    fn bright_receipt_found_by_first_threshold() {
        let detection = detect_receipt(&receipt_scene(), &PipelineConfig::default());
        let quad = detection.quad.expect("expected a quad");
        assert_eq!(
            detection.metrics.strategy,
            Some(DetectionStrategy::ThresholdSweep)
        );
        assert_eq!(detection.metrics.winning_threshold, Some(150));
        assert_eq!(detection.metrics.thresholds_tried, 1);

        // The quad should tightly enclose the bright rectangle.
        let area = quad.area();
        assert!(
            (20_000.0..=26_000.0).contains(&area),
            "unexpected quad area {area}",
        );
    }

    #[test]
    fn uniform_noise_free_image_is_not_found() {
        let gray = GrayImage::from_fn(200, 300, |_, _| image::Luma([128]));
        let detection = detect_receipt(&gray, &PipelineConfig::default());
        assert!(detection.quad.is_none());
        assert!(detection.metrics.strategy.is_none());
        assert_eq!(detection.metrics.thresholds_tried, 5);
    }

    #[test]
    fn full_frame_rectangle_rejected_by_max_area_ratio() {
        // A rectangle covering ~95% of the frame exceeds the 0.90 cap,
        // and the edge fallback's 0.80 cap too.
        let gray = GrayImage::from_fn(200, 300, |x, y| {
            if (2..198).contains(&x) && (4..296).contains(&y) {
                image::Luma([250])
            } else {
                image::Luma([30])
            }
        });
        let detection = detect_receipt(&gray, &PipelineConfig::default());
        assert!(detection.quad.is_none());
    }

    #[test]
    fn square_receipt_rejected_by_aspect_floor() {
        // A square (aspect 1.0) fails the 1.2 minimum aspect ratio.
        let gray = GrayImage::from_fn(300, 300, |x, y| {
            if (75..225).contains(&x) && (75..225).contains(&y) {
                image::Luma([250])
            } else {
                image::Luma([30])
            }
        });
        let detection = detect_receipt(&gray, &PipelineConfig::default());
        assert!(detection.quad.is_none());
    }

    #[test]
    fn dark_receipt_recovered_by_edge_fallback() {
        // A dark receipt on a bright background: at every ladder
        // threshold the binarized foreground is the full background
        // plane, which the 0.90 area cap rejects. The boundary
        // contrast is ideal for Canny.
        let gray = GrayImage::from_fn(200, 300, |x, y| {
            if (55..145).contains(&x) && (15..285).contains(&y) {
                image::Luma([20])
            } else {
                image::Luma([250])
            }
        });
        let detection = detect_receipt(&gray, &PipelineConfig::default());
        let quad = detection.quad.expect("edge fallback should find the quad");
        assert_eq!(
            detection.metrics.strategy,
            Some(DetectionStrategy::EdgeFallback)
        );
        assert_eq!(detection.metrics.winning_threshold, None);
        assert_eq!(detection.metrics.thresholds_tried, 5);

        let area = quad.area();
        assert!(
            (18_000.0..=28_000.0).contains(&area),
            "unexpected quad area {area}",
        );
    }

    #[test]
    fn sweep_prefers_largest_candidate() {
        // Two valid receipts in one frame: the sweep must pick the
        // larger one.
        let gray = GrayImage::from_fn(400, 300, |x, y| {
            let large = (20..140).contains(&x) && (20..280).contains(&y);
            let small = (220..260).contains(&x) && (100..200).contains(&y);
            if large || small {
                image::Luma([250])
            } else {
                image::Luma([30])
            }
        });
        let detection = detect_receipt(&gray, &PipelineConfig::default());
        let quad = detection.quad.expect("expected a quad");
        let area = quad.area();
        assert!(
            area > 25_000.0,
            "expected the larger rectangle, got area {area}",
        );
    }
}
