//! Legibility cleanup: denoise and binarize a rectified image.
//!
//! The cleaner converts to grayscale, suppresses sensor and
//! compression noise with a median filter (edge-preserving, unlike a
//! Gaussian), then separates text from background with mean-based
//! local adaptive binarization so uneven lighting cannot wash out
//! half the receipt. The result is re-expanded to three channels for
//! downstream encoders that expect color input.
//!
//! The adaptive threshold is computed from a summed-area table so the
//! local mean can carry the constant offset the `imageproc` helper
//! does not expose.

use image::{GrayImage, RgbImage};

use crate::grayscale;
use crate::types::PipelineConfig;

/// Clean an image for machine-read text.
///
/// Grayscale, median denoise, mean-based adaptive binarization
/// (window `config.adaptive_window`, offset `config.adaptive_offset`),
/// then conversion back to RGB. No failure mode.
#[must_use = "returns the cleaned image"]
pub fn clean(image: &RgbImage, config: &PipelineConfig) -> RgbImage {
    let gray = grayscale::to_gray(image);
    let denoised = if config.denoise_radius > 0 {
        imageproc::filter::median_filter(&gray, config.denoise_radius, config.denoise_radius)
    } else {
        gray
    };
    let binary = adaptive_threshold(&denoised, config.adaptive_window, config.adaptive_offset);
    to_rgb(&binary)
}

/// Mean-based local adaptive binarization.
///
/// A pixel becomes white when it exceeds the mean of its
/// `window x window` neighborhood minus `offset`; the neighborhood is
/// clipped at the image borders. `window` is treated as odd (even
/// values use the next radius down).
#[must_use = "returns the binarized image"]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss, clippy::cast_sign_loss)]
pub fn adaptive_threshold(gray: &GrayImage, window: u32, offset: i16) -> GrayImage {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return gray.clone();
    }
    let radius = i64::from(window / 2);

    // Summed-area table with a zero row/column of padding.
    let w = width as usize;
    let h = height as usize;
    let mut integral = vec![0u64; (w + 1) * (h + 1)];
    for y in 0..h {
        let mut row_sum = 0u64;
        for x in 0..w {
            row_sum += u64::from(gray.get_pixel(x as u32, y as u32).0[0]);
            integral[(y + 1) * (w + 1) + (x + 1)] = integral[y * (w + 1) + (x + 1)] + row_sum;
        }
    }

    GrayImage::from_fn(width, height, |x, y| {
        let x0 = (i64::from(x) - radius).max(0) as usize;
        let y0 = (i64::from(y) - radius).max(0) as usize;
        let x1 = ((i64::from(x) + radius + 1).min(i64::from(width))) as usize;
        let y1 = ((i64::from(y) + radius + 1).min(i64::from(height))) as usize;

        let sum = integral[y1 * (w + 1) + x1] + integral[y0 * (w + 1) + x0]
            - integral[y0 * (w + 1) + x1]
            - integral[y1 * (w + 1) + x0];
        let count = ((x1 - x0) * (y1 - y0)) as u64;
        let mean = (sum as f64) / (count as f64);
        let threshold = mean - f64::from(offset);

        if f64::from(gray.get_pixel(x, y).0[0]) > threshold {
            image::Luma([255])
        } else {
            image::Luma([0])
        }
    })
}

/// Expand a single-channel image to three identical channels.
#[must_use = "returns the RGB image"]
pub fn to_rgb(gray: &GrayImage) -> RgbImage {
    RgbImage::from_fn(gray.width(), gray.height(), |x, y| {
        let v = gray.get_pixel(x, y).0[0];
        image::Rgb([v, v, v])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_is_binary_and_three_channel() {
        let img = RgbImage::from_fn(30, 30, |x, y| {
            if (x + y) % 7 == 0 {
                image::Rgb([40, 40, 40])
            } else {
                image::Rgb([210, 210, 210])
            }
        });
        let cleaned = clean(&img, &PipelineConfig::default());
        assert_eq!(cleaned.dimensions(), (30, 30));
        for p in cleaned.pixels() {
            let [r, g, b] = p.0;
            assert_eq!(r, g);
            assert_eq!(g, b);
            assert!(r == 0 || r == 255, "expected binary output, got {r}");
        }
    }

    #[test]
    fn dark_text_on_bright_background_stays_dark() {
        // A dark stroke through a bright field must survive
        // binarization as black on white.
        let gray = GrayImage::from_fn(40, 40, |x, _| {
            if (18..22).contains(&x) {
                image::Luma([30])
            } else {
                image::Luma([220])
            }
        });
        let binary = adaptive_threshold(&gray, 11, 2);
        assert_eq!(binary.get_pixel(20, 20).0[0], 0, "stroke must be black");
        assert_eq!(binary.get_pixel(5, 20).0[0], 255, "field must be white");
    }

    #[test]
    fn uneven_illumination_does_not_wash_out_text() {
        // Horizontal brightness gradient (80 to 230) with dark strokes
        // every 16 columns. A global threshold would lose strokes on
        // one side; the local mean keeps them all.
        let gray = GrayImage::from_fn(128, 32, |x, _| {
            if x % 16 == 8 {
                image::Luma([(40 + x) as u8])
            } else {
                image::Luma([(80 + x) as u8])
            }
        });
        let binary = adaptive_threshold(&gray, 11, 2);
        for stroke_x in [8u32, 40, 72, 104] {
            assert_eq!(
                binary.get_pixel(stroke_x, 16).0[0],
                0,
                "stroke at x={stroke_x} must survive the gradient",
            );
        }
    }

    #[test]
    fn uniform_image_binarizes_white() {
        // On a perfectly flat field, every pixel exceeds mean - offset.
        let gray = GrayImage::from_fn(20, 20, |_, _| image::Luma([128]));
        let binary = adaptive_threshold(&gray, 11, 2);
        assert!(binary.pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn zero_offset_keeps_threshold_at_local_mean() {
        let gray = GrayImage::from_fn(4, 1, |x, _| image::Luma([if x < 2 { 0 } else { 200 }]));
        let binary = adaptive_threshold(&gray, 11, 0);
        // Bright half is above the window mean, dark half below.
        assert_eq!(binary.get_pixel(0, 0).0[0], 0);
        assert_eq!(binary.get_pixel(3, 0).0[0], 255);
    }

    #[test]
    fn to_rgb_duplicates_the_channel() {
        let gray = GrayImage::from_fn(2, 2, |x, y| image::Luma([(x * 100 + y * 50) as u8]));
        let rgb = to_rgb(&gray);
        assert_eq!(rgb.get_pixel(1, 1).0, [150, 150, 150]);
    }
}
