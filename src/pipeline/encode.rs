//! Image encoding: `DynamicImage` → PNG bytes, base64 `ImageData`, previews.
//!
//! PNG is used everywhere: it is lossless, so rendered slide text stays
//! crisp both for the vision model and in the output deck.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::imageops::FilterType;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// PNG-encode an image.
pub fn png_bytes(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(buf)
}

/// Encode a slide visual as a base64 PNG ready for the vision API.
///
/// `detail: "high"` keeps fine print legible for tiling models.
pub fn encode_page(img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    let b64 = STANDARD.encode(png_bytes(img)?);
    debug!("Encoded image → {} bytes base64", b64.len());

    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}

/// Base64 PNG preview for progress events, at most `max_width` pixels wide.
///
/// Narrower images are encoded as they are; wider ones are downscaled with
/// their aspect ratio preserved.
pub fn preview_base64(img: &DynamicImage, max_width: u32) -> Result<String, image::ImageError> {
    let scaled;
    let img = if img.width() > max_width && max_width > 0 {
        let height = ((img.height() as u64 * max_width as u64) / img.width() as u64).max(1);
        scaled = img.resize_exact(max_width, height as u32, FilterType::Triangle);
        &scaled
    } else {
        img
    };
    Ok(STANDARD.encode(png_bytes(img)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn solid(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba([255, 0, 0, 255])))
    }

    #[test]
    fn encode_small_image() {
        let data = encode_page(&solid(10, 10)).expect("encode should succeed");
        assert_eq!(data.mime_type, "image/png");
        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        assert!(decoded.starts_with(b"\x89PNG"));
    }

    #[test]
    fn preview_is_capped_and_keeps_aspect() {
        let b64 = preview_base64(&solid(1600, 900), 800).unwrap();
        let png = STANDARD.decode(b64).unwrap();
        let img = image::load_from_memory(&png).unwrap();
        assert_eq!((img.width(), img.height()), (800, 450));
    }

    #[test]
    fn narrow_preview_is_not_upscaled() {
        let b64 = preview_base64(&solid(300, 200), 800).unwrap();
        let img = image::load_from_memory(&STANDARD.decode(b64).unwrap()).unwrap();
        assert_eq!((img.width(), img.height()), (300, 200));
    }
}
