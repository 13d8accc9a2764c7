//! kvitto-export: Size-targeted artifact encoders (sans-IO)
//!
//! Turns a rectified receipt image into the two delivery artifacts,
//! each held to a byte budget:
//!
//! - a JPEG raster (primary quality, one lower-quality retry),
//! - a single-page PDF embedding a budget-fitted JPEG verbatim.
//!
//! All functions operate on in-memory buffers; callers decide where
//! the bytes go.

pub mod artifacts;
pub mod jpeg;
pub mod pdf;
pub mod resize;

pub use artifacts::{Artifacts, TargetConfig, process_receipt};
pub use jpeg::{encode_jpeg, jpeg_artifact};
pub use pdf::pdf_artifact;
pub use resize::{estimated_size_kb, resize_to_budget};

/// Errors from artifact production.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The rectification pipeline failed before any encoding began.
    #[error(transparent)]
    Pipeline(#[from] kvitto_pipeline::PipelineError),

    /// JPEG compression rejected the image.
    #[error("JPEG encoding failed: {0}")]
    JpegEncode(#[from] image::ImageError),

    /// PDF document assembly failed.
    #[error("PDF assembly failed: {0}")]
    Pdf(#[from] lopdf::Error),
}
