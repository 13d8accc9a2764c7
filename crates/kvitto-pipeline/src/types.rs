//! Shared types for the kvitto rectification pipeline.

use serde::{Deserialize, Serialize};

/// Re-export `GrayImage` so downstream crates can reference
/// intermediate raster data without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbImage` so downstream crates can reference the
/// decoded color image without depending on `image` directly.
pub use image::RgbImage;

/// A 2D point in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from left edge).
    pub x: f64,
    /// Vertical position (pixels from top edge).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }
}

/// Four corner points of a detected receipt boundary.
///
/// A freshly detected quad is in arbitrary vertex order; passing it
/// through [`crate::order::order_corners`] canonicalizes it to
/// (top-left, top-right, bottom-right, bottom-left).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quad(pub [Point; 4]);

impl Quad {
    /// Create a quad from four corner points.
    #[must_use]
    pub const fn new(corners: [Point; 4]) -> Self {
        Self(corners)
    }

    /// The corner points in their current order.
    #[must_use]
    pub const fn corners(&self) -> &[Point; 4] {
        &self.0
    }

    /// Enclosed area in square pixels (shoelace formula).
    #[must_use]
    pub fn area(&self) -> f64 {
        crate::contour::polygon_area(&self.0)
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Total pixel count as a float, for area-ratio arithmetic.
    #[must_use]
    pub fn area(self) -> f64 {
        f64::from(self.width) * f64::from(self.height)
    }
}

/// Configuration for the rectification pipeline.
///
/// All tunable constants live here so tests can substitute values
/// without touching algorithm code. Defaults match the shipped
/// detector tuning for receipt photos.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Global binarization thresholds tried in order during the
    /// threshold sweep. Ordered from most to least permissive for
    /// typical receipt lighting.
    pub threshold_ladder: Vec<u8>,

    /// Minimum contour area as a fraction of image area accepted
    /// during the threshold sweep.
    pub threshold_min_area_ratio: f64,

    /// Maximum contour area fraction accepted during the threshold
    /// sweep.
    pub threshold_max_area_ratio: f64,

    /// Polygon approximation tolerance for the threshold sweep,
    /// as a fraction of contour perimeter.
    pub approx_epsilon: f64,

    /// Gaussian blur sigma applied before Canny in the edge fallback.
    /// 1.1 corresponds to a 5x5 kernel with auto sigma.
    pub blur_sigma: f32,

    /// Canny low threshold for the edge fallback.
    pub canny_low: f32,

    /// Canny high threshold for the edge fallback.
    pub canny_high: f32,

    /// Minimum contour area fraction accepted in the edge fallback.
    pub edge_min_area_ratio: f64,

    /// Maximum contour area fraction accepted in the edge fallback.
    pub edge_max_area_ratio: f64,

    /// Approximation tolerances tried in order per contour in the
    /// edge fallback, as fractions of contour perimeter.
    pub edge_epsilon_ladder: Vec<f64>,

    /// Minimum bounding-box aspect ratio (max side / min side) for a
    /// candidate to count as receipt-shaped.
    pub min_aspect_ratio: f64,

    /// Maximum bounding-box aspect ratio for a candidate.
    pub max_aspect_ratio: f64,

    /// Area-ratio floor below which a *found* quad is still rejected
    /// and the original image is cleaned instead. Distinct from
    /// `threshold_min_area_ratio`, which filters candidates during
    /// detection; this gate runs on the winning quad.
    pub min_accept_area_ratio: f64,

    /// Legibility floor: a warped image narrower or shorter than this
    /// is discarded in favor of the unwarped original.
    pub min_warp_dimension: u32,

    /// Median filter radius used for denoising in the cleaner.
    /// Radius 1 means a 3x3 window.
    pub denoise_radius: u32,

    /// Adaptive binarization window size in pixels (odd).
    pub adaptive_window: u32,

    /// Constant subtracted from the local mean in adaptive
    /// binarization.
    pub adaptive_offset: i16,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            threshold_ladder: vec![150, 180, 200, 220, 240],
            threshold_min_area_ratio: 0.005,
            threshold_max_area_ratio: 0.90,
            approx_epsilon: 0.02,
            blur_sigma: 1.1,
            canny_low: 50.0,
            canny_high: 150.0,
            edge_min_area_ratio: 0.01,
            edge_max_area_ratio: 0.80,
            edge_epsilon_ladder: vec![0.01, 0.02, 0.03, 0.05],
            min_aspect_ratio: 1.2,
            max_aspect_ratio: 5.0,
            min_accept_area_ratio: 0.05,
            min_warp_dimension: 100,
            denoise_radius: 1,
            adaptive_window: 11,
            adaptive_offset: 2,
        }
    }
}

/// Why the pipeline fell back to cleaning the original image instead
/// of a warped one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FallbackReason {
    /// Neither detection strategy produced a valid quad.
    NotFound,
    /// A quad was found but covers too little of the image to trust.
    TooSmall {
        /// Quad area divided by total image area.
        area_ratio: f64,
    },
    /// The warped image fell below the legibility floor.
    DegenerateWarp {
        /// Warped width in pixels.
        width: u32,
        /// Warped height in pixels.
        height: u32,
    },
}

/// Which path the pipeline took for a given image.
///
/// Downstream stages receive this alongside the cleaned image, so a
/// failed detection can never be mistaken for a successful warp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Rectification {
    /// Detection and warping succeeded; the cleaned image is the
    /// flattened receipt.
    Warped {
        /// The ordered source quadrilateral that was flattened.
        quad: Quad,
    },
    /// The cleaned image is the original photo, unwarped.
    Original {
        /// Why the warp was skipped or discarded.
        reason: FallbackReason,
    },
}

impl Rectification {
    /// `true` when the pipeline produced a flattened image.
    #[must_use]
    pub const fn is_warped(&self) -> bool {
        matches!(self, Self::Warped { .. })
    }
}

/// Output of a full pipeline run.
#[derive(Debug, Clone)]
pub struct RectifyOutput {
    /// The cleaned image, warped when detection succeeded.
    pub image: RgbImage,
    /// Which path produced `image`.
    pub rectification: Rectification,
    /// Dimensions of the source photo.
    pub source_dimensions: Dimensions,
    /// Per-stage metrics for this run.
    pub diagnostics: crate::diagnostics::RunDiagnostics,
}

/// Errors that can occur during pipeline processing.
///
/// Only input decoding is fatal; every downstream miss is recovered
/// via [`Rectification::Original`].
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),
}
