//! Single-page PDF artifact encoder.
//!
//! The image is JPEG-compressed down a fixed quality ladder; the
//! first encode that fits the byte budget is embedded **verbatim** as
//! a `DCTDecode` XObject, so the bytes measured against the budget
//! are exactly the bytes that land in the document. When the ladder
//! is exhausted the floor quality is embedded regardless of size.
//!
//! The page is sized so the image renders at 100 DPI: one image pixel
//! maps to 72/100 PDF points.

use image::RgbImage;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};

use crate::ExportError;
use crate::artifacts::TargetConfig;
use crate::jpeg::encode_jpeg;

/// Rendered resolution of the embedded image, in pixels per inch.
const RENDER_DPI: f64 = 100.0;

/// Produce the PDF artifact for `image` under the configured budget.
///
/// # Errors
///
/// Returns [`ExportError::JpegEncode`] if JPEG compression fails, or
/// [`ExportError::Pdf`] if document assembly fails.
pub fn pdf_artifact(image: &RgbImage, config: &TargetConfig) -> Result<Vec<u8>, ExportError> {
    for &quality in &config.pdf_quality_ladder {
        let jpeg = encode_jpeg(image, quality)?;
        if jpeg.len() <= config.budget_bytes() {
            return wrap_jpeg(&jpeg, image.width(), image.height());
        }
    }

    // Ladder exhausted: embed the floor quality and accept the size.
    let floor = config.pdf_quality_ladder.last().copied().unwrap_or(35);
    let jpeg = encode_jpeg(image, floor)?;
    wrap_jpeg(&jpeg, image.width(), image.height())
}

/// Assemble a one-page document around already-encoded JPEG bytes.
fn wrap_jpeg(jpeg: &[u8], width: u32, height: u32) -> Result<Vec<u8>, ExportError> {
    let page_width = f64::from(width) * 72.0 / RENDER_DPI;
    let page_height = f64::from(height) * 72.0 / RENDER_DPI;

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(width),
            "Height" => i64::from(height),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        jpeg.to_vec(),
    ));

    let resources_id = doc.add_object(dictionary! {
        "XObject" => dictionary! { "Im0" => image_id },
    });

    // Scale the unit image square onto the full page, then paint.
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    page_width.into(),
                    0.into(),
                    0.into(),
                    page_height.into(),
                    0.into(),
                    0.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Resources" => resources_id,
        "Contents" => content_id,
        "MediaBox" => vec![0.into(), 0.into(), page_width.into(), page_height.into()],
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).map_err(lopdf::Error::from)?;
    Ok(bytes)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::cast_possible_truncation)]
mod tests {
    use super::*;

    fn textured_image() -> RgbImage {
        RgbImage::from_fn(320, 240, |x, y| {
            let v = ((x * 7 + y * 13) % 251) as u8;
            image::Rgb([v, v.wrapping_mul(3), v.wrapping_add(40)])
        })
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[test]
    fn output_is_a_single_page_document() {
        let bytes = pdf_artifact(&textured_image(), &TargetConfig::default()).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn generous_budget_embeds_the_top_of_the_ladder() {
        let img = textured_image();
        let config = TargetConfig {
            budget_kb: 10_000,
            ..TargetConfig::default()
        };
        let bytes = pdf_artifact(&img, &config).unwrap();
        let top = encode_jpeg(&img, config.pdf_quality_ladder[0]).unwrap();
        assert!(contains(&bytes, &top), "top-rung JPEG not embedded verbatim");
    }

    #[test]
    fn ladder_stops_at_first_quality_fitting_the_budget() {
        // Noisy enough that consecutive ladder rungs differ by many
        // kilobytes, so a whole-KB budget can sit strictly between
        // the 85- and 75-quality sizes.
        let img = RgbImage::from_fn(640, 480, |x, y| {
            let n = x.wrapping_mul(2_654_435_761).wrapping_add(y.wrapping_mul(40_503));
            image::Rgb([(n >> 3) as u8, (n >> 11) as u8, (n >> 19) as u8])
        });
        let at_85 = encode_jpeg(&img, 85).unwrap();
        let at_75 = encode_jpeg(&img, 75).unwrap();

        let budget_kb = u32::try_from((at_85.len() - 1) / 1024).unwrap();
        let config = TargetConfig {
            budget_kb,
            ..TargetConfig::default()
        };
        assert!(at_75.len() <= config.budget_bytes());
        assert!(at_85.len() > config.budget_bytes());

        let bytes = pdf_artifact(&img, &config).unwrap();
        assert!(contains(&bytes, &at_75), "expected the 75-quality JPEG");
    }

    #[test]
    fn exhausted_ladder_embeds_the_floor_quality() {
        let img = textured_image();
        let config = TargetConfig {
            budget_kb: 0,
            ..TargetConfig::default()
        };
        let bytes = pdf_artifact(&img, &config).unwrap();
        let floor = encode_jpeg(&img, 35).unwrap();
        assert!(contains(&bytes, &floor), "floor JPEG not embedded verbatim");
    }

    #[test]
    fn page_is_sized_for_100_dpi() {
        let bytes = pdf_artifact(&textured_image(), &TargetConfig::default()).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        let page_id = *doc.get_pages().values().next().unwrap();
        let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
        let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
        // 320x240 pixels at 100 DPI -> 230.4 x 172.8 points.
        assert!((f64::from(media_box[2].as_float().unwrap()) - 230.4).abs() < 0.01);
        assert!((f64::from(media_box[3].as_float().unwrap()) - 172.8).abs() < 0.01);
    }
}
