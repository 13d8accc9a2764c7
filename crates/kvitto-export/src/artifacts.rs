//! End-to-end artifact production: rectify, downscale, encode.

use image::RgbImage;
use kvitto_pipeline::{Dimensions, PipelineConfig, Rectification, RunDiagnostics, rectify};
use serde::{Deserialize, Serialize};

use crate::ExportError;
use crate::jpeg::jpeg_artifact;
use crate::pdf::pdf_artifact;
use crate::resize::resize_to_budget;

/// Size-targeting parameters shared by the resize step and both
/// encoders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Byte budget for every output artifact, in kilobytes.
    pub budget_kb: u32,

    /// Primary JPEG artifact quality.
    pub jpeg_quality: u8,

    /// One-shot retry quality when the primary encode overshoots.
    pub jpeg_retry_quality: u8,

    /// Descending qualities tried for the PDF-embedded JPEG. The last
    /// rung is the floor, kept even when it misses the budget.
    pub pdf_quality_ladder: Vec<u8>,

    /// Smallest width the resize step may produce.
    pub min_width: u32,

    /// Smallest height the resize step may produce.
    pub min_height: u32,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            budget_kb: 200,
            jpeg_quality: 85,
            jpeg_retry_quality: 70,
            pdf_quality_ladder: vec![95, 85, 75, 65, 55, 45, 35],
            min_width: 800,
            min_height: 600,
        }
    }
}

impl TargetConfig {
    /// The budget expressed in bytes, as the encoders measure it.
    #[must_use]
    pub const fn budget_bytes(&self) -> usize {
        self.budget_kb as usize * 1024
    }
}

/// Everything produced for one receipt photo.
#[derive(Debug, Clone)]
pub struct Artifacts {
    /// The size-targeted raster artifact.
    pub jpeg: Vec<u8>,

    /// The size-targeted single-page document artifact.
    pub pdf: Vec<u8>,

    /// Whether the receipt was warped or the original was kept.
    pub rectification: Rectification,

    /// Dimensions of the image both artifacts encode, after the
    /// budget-driven resize.
    pub final_dimensions: Dimensions,

    /// Per-stage timings and detection metrics from the pipeline run.
    pub diagnostics: RunDiagnostics,
}

/// Run the full pipeline on raw image bytes and encode both
/// artifacts.
///
/// When encoding the cleaned image fails, the unmodified original is
/// encoded as both artifacts instead, so a decodable input always
/// yields usable output.
///
/// # Errors
///
/// Returns [`ExportError::Pipeline`] when the input cannot be
/// decoded, or an encoder error when even the original-image
/// passthrough fails.
pub fn process_receipt(
    image_bytes: &[u8],
    pipeline: &PipelineConfig,
    target: &TargetConfig,
) -> Result<Artifacts, ExportError> {
    let output = rectify(image_bytes, pipeline)?;
    let rectification = output.rectification;
    let diagnostics = output.diagnostics.clone();
    let resized = resize_to_budget(output.image, target);
    match encode_artifacts(resized, rectification, output.diagnostics, target) {
        Ok(artifacts) => Ok(artifacts),
        Err(_) => {
            // Best-effort passthrough: encode the original photo with
            // the same budget machinery.
            let original = kvitto_pipeline::grayscale::decode(image_bytes)?;
            let resized = resize_to_budget(original, target);
            encode_artifacts(resized, rectification, diagnostics, target)
        }
    }
}

fn encode_artifacts(
    image: RgbImage,
    rectification: Rectification,
    diagnostics: RunDiagnostics,
    target: &TargetConfig,
) -> Result<Artifacts, ExportError> {
    let jpeg = jpeg_artifact(&image, target)?;
    let pdf = pdf_artifact(&image, target)?;
    Ok(Artifacts {
        jpeg,
        pdf,
        rectification,
        final_dimensions: Dimensions {
            width: image.width(),
            height: image.height(),
        },
        diagnostics,
    })
}
