//! Image decoding and grayscale conversion.
//!
//! Accepts raw image bytes (JPEG, PNG, BMP, TIFF) and produces the
//! color image the warper operates on plus the single-channel
//! grayscale image the detector operates on.
//!
//! This is the first step in the pipeline: raw bytes in, images out.

use image::{GrayImage, RgbImage};

use crate::types::PipelineError;

/// Decode raw image bytes into a color image.
///
/// Supports whatever the `image` crate can decode with the enabled
/// format features (JPEG, PNG, BMP, TIFF).
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode(bytes: &[u8]) -> Result<RgbImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let img = image::load_from_memory(bytes)?;
    Ok(img.to_rgb8())
}

/// Convert a color image to grayscale.
///
/// The standard luminance formula is used for RGB-to-gray conversion:
/// `0.299*R + 0.587*G + 0.114*B`.
#[must_use = "returns the grayscale image"]
pub fn to_gray(image: &RgbImage) -> GrayImage {
    image::imageops::grayscale(image)
}
