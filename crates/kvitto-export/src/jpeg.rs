//! JPEG artifact encoder.
//!
//! The raster artifact is encoded once at the primary quality; if the
//! result overshoots the byte budget it is re-encoded once at the
//! retry quality and kept regardless of size. The JPEG side never
//! walks a full quality ladder -- that is the PDF encoder's job.

use image::RgbImage;
use image::codecs::jpeg::JpegEncoder;

use crate::ExportError;
use crate::artifacts::TargetConfig;

/// Encode an RGB image as JPEG at the given quality (1-100).
///
/// # Errors
///
/// Returns [`ExportError::JpegEncode`] if the encoder rejects the
/// image.
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, ExportError> {
    let mut bytes = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut bytes, quality);
    image.write_with_encoder(encoder)?;
    Ok(bytes)
}

/// Produce the JPEG artifact: primary quality first, one retry at the
/// lower quality when over budget.
///
/// # Errors
///
/// Returns [`ExportError::JpegEncode`] if the encoder rejects the
/// image.
pub fn jpeg_artifact(image: &RgbImage, config: &TargetConfig) -> Result<Vec<u8>, ExportError> {
    let bytes = encode_jpeg(image, config.jpeg_quality)?;
    if bytes.len() <= config.budget_bytes() {
        return Ok(bytes);
    }
    encode_jpeg(image, config.jpeg_retry_quality)
}
