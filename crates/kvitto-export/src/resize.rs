//! Budget-driven downscaling.
//!
//! Encoded size is predicted from raw pixel count before any encoder
//! runs, using a fixed empirical compression ratio. When the
//! prediction exceeds the byte budget the image is shrunk by the
//! square root of the overshoot, so the pixel count lands on the
//! budget. A readability floor keeps receipts from being scaled into
//! illegibility; when the floor and the budget conflict, the floor
//! wins and the encoders make up the difference with quality.

use image::RgbImage;
use image::imageops::FilterType;

use crate::artifacts::TargetConfig;

/// Assumed ratio between raw RGB bytes and the encoded output.
const COMPRESSION_RATIO: f64 = 15.0;

/// Predict the encoded size of an image, in kilobytes, from its raw
/// pixel count.
#[must_use]
pub fn estimated_size_kb(width: u32, height: u32) -> f64 {
    f64::from(width) * f64::from(height) * 3.0 / (1024.0 * COMPRESSION_RATIO)
}

/// Downscale `image` until its predicted encoded size fits the
/// budget, subject to the readability floor.
///
/// Returns the input unchanged when the prediction already fits.
#[must_use = "resizing allocates a new image that must be used"]
pub fn resize_to_budget(image: RgbImage, config: &TargetConfig) -> RgbImage {
    let (width, height) = image.dimensions();
    let estimate = estimated_size_kb(width, height);
    if estimate <= f64::from(config.budget_kb) {
        return image;
    }

    let factor = (f64::from(config.budget_kb) / estimate).sqrt();
    let mut new_width = scaled(width, factor);
    let mut new_height = scaled(height, factor);

    if new_width < config.min_width || new_height < config.min_height {
        let scale_w = f64::from(config.min_width) / f64::from(width);
        let scale_h = f64::from(config.min_height) / f64::from(height);
        let scale = scale_w.min(scale_h);
        new_width = scaled(width, scale);
        new_height = scaled(height, scale);
    }

    image::imageops::resize(&image, new_width, new_height, FilterType::Triangle)
}

fn scaled(dimension: u32, factor: f64) -> u32 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let scaled = (f64::from(dimension) * factor) as u32;
    scaled.max(1)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn estimate_scales_with_pixel_count() {
        // 1024x1000 RGB: 1024 * 1000 * 3 / (1024 * 15) = 200 KB.
        let kb = estimated_size_kb(1024, 1000);
        assert!((kb - 200.0).abs() < 1e-9);
        assert!(estimated_size_kb(2048, 1000) > kb);
    }

    #[test]
    fn small_image_passes_through_unchanged() {
        let img = RgbImage::from_pixel(400, 300, image::Rgb([200, 10, 10]));
        let out = resize_to_budget(img.clone(), &TargetConfig::default());
        assert_eq!(out.dimensions(), (400, 300));
        assert_eq!(out.as_raw(), img.as_raw());
    }

    #[test]
    fn oversized_image_is_shrunk_by_sqrt_of_overshoot() {
        // 2000x1200: estimate ~469 KB, factor sqrt(200/469) ~ 0.653.
        let img = RgbImage::new(2000, 1200);
        let out = resize_to_budget(img, &TargetConfig::default());
        assert_eq!(out.dimensions(), (1306, 783));
    }

    #[test]
    fn readability_floor_overrides_the_budget() {
        // 900x3000: the budget factor would give 554x1848, under the
        // 800-wide floor. The floor scale min(800/900, 600/3000)
        // applies instead.
        let img = RgbImage::new(900, 3000);
        let out = resize_to_budget(img, &TargetConfig::default());
        assert_eq!(out.dimensions(), (180, 600));
    }
}
