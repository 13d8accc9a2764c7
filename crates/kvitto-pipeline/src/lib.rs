//! kvitto-pipeline: Pure receipt rectification pipeline (sans-IO).
//!
//! Converts a photo of a paper receipt into a flattened, cleaned
//! image through:
//! decode -> boundary detection -> corner ordering -> perspective
//! warp -> legibility cleanup.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! byte slices and returns structured data. Artifact encoding and
//! filesystem interaction live in `kvitto-export` and the CLI.
//!
//! # Fallback policy
//!
//! Only input decoding is fatal. Every downstream miss degrades
//! gracefully to cleaning the original, unwarped photo:
//!
//! - no boundary found by either detection strategy,
//! - a boundary covering too little of the frame to trust,
//! - a warp whose output falls below the legibility floor.
//!
//! The taken path is reported in [`Rectification`] so downstream
//! stages can never mistake a fallback for a successful warp.

pub mod clean;
pub mod contour;
pub mod detect;
pub mod diagnostics;
pub mod grayscale;
pub mod order;
pub mod types;
pub mod warp;

use std::time::Instant;

pub use diagnostics::{DetectionMetrics, DetectionStrategy, RunDiagnostics, WarpMetrics};
pub use types::{
    Dimensions, FallbackReason, PipelineConfig, PipelineError, Point, Quad, Rectification,
    RectifyOutput,
};

/// Run the full rectification pipeline.
///
/// Takes raw image bytes (JPEG, PNG, BMP, TIFF) and a configuration,
/// and produces a cleaned image ready for size-targeted encoding,
/// together with the [`Rectification`] path taken and per-run
/// diagnostics.
///
/// # Pipeline steps
///
/// 1. Decode the image (fatal on failure)
/// 2. Detect the receipt boundary (threshold sweep, then edge fallback)
/// 3. Gate: discard quads covering less than the acceptance area ratio
/// 4. Order corners and warp to an axis-aligned image
/// 5. Gate: discard warps below the legibility floor
/// 6. Clean whichever image survived (warped or original)
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `image_bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn rectify(
    image_bytes: &[u8],
    config: &PipelineConfig,
) -> Result<RectifyOutput, PipelineError> {
    let run_start = Instant::now();

    // 1. Decode.
    let decode_start = Instant::now();
    let color = grayscale::decode(image_bytes)?;
    let decode_duration = decode_start.elapsed();
    let source_dimensions = Dimensions {
        width: color.width(),
        height: color.height(),
    };

    // 2. Detect.
    let detect_start = Instant::now();
    let gray = grayscale::to_gray(&color);
    let detection = detect::detect_receipt(&gray, config);
    let detect_duration = detect_start.elapsed();

    // 3-5. Gates and warp.
    let mut warp_metrics = None;
    let mut quad_area_ratio = None;
    let (working, rectification) = match detection.quad {
        None => (
            color,
            Rectification::Original {
                reason: FallbackReason::NotFound,
            },
        ),
        Some(quad) => {
            let area_ratio = quad.area() / source_dimensions.area();
            quad_area_ratio = Some(area_ratio);
            if area_ratio < config.min_accept_area_ratio {
                (
                    color,
                    Rectification::Original {
                        reason: FallbackReason::TooSmall { area_ratio },
                    },
                )
            } else {
                let ordered = order::order_corners(&quad);
                resolve_warp(color, &ordered, config, &mut warp_metrics)
            }
        }
    };

    // 6. Clean.
    let clean_start = Instant::now();
    let cleaned = clean::clean(&working, config);
    let clean_duration = clean_start.elapsed();

    Ok(RectifyOutput {
        image: cleaned,
        rectification,
        source_dimensions,
        diagnostics: RunDiagnostics {
            input_bytes: image_bytes.len(),
            source_width: source_dimensions.width,
            source_height: source_dimensions.height,
            decode_duration,
            detect_duration,
            detection: detection.metrics,
            warp: warp_metrics,
            quad_area_ratio,
            clean_duration,
            total_duration: run_start.elapsed(),
        },
    })
}

/// Warp the ordered quad, keeping the result only when it clears the
/// legibility floor. Returns the image to clean and the path taken.
fn resolve_warp(
    color: types::RgbImage,
    ordered: &Quad,
    config: &PipelineConfig,
    warp_metrics: &mut Option<WarpMetrics>,
) -> (types::RgbImage, Rectification) {
    let (width, height) = warp::target_dimensions(ordered);
    match warp::warp(&color, ordered) {
        Some(warped)
            if warped.width() >= config.min_warp_dimension
                && warped.height() >= config.min_warp_dimension =>
        {
            *warp_metrics = Some(WarpMetrics {
                width: warped.width(),
                height: warped.height(),
                accepted: true,
            });
            (
                warped,
                Rectification::Warped { quad: *ordered },
            )
        }
        _ => {
            *warp_metrics = Some(WarpMetrics {
                width,
                height,
                accepted: false,
            });
            (
                color,
                Rectification::Original {
                    reason: FallbackReason::DegenerateWarp { width, height },
                },
            )
        }
    }
}
