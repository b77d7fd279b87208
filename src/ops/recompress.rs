//! PNG ↔ JPEG re-encode.
//!
//! The one wrinkle is transparency: JPEG has no alpha channel, so a PNG
//! with transparency is flattened onto a white background first — the same
//! thing a browser canvas does when it paints onto a white-filled context.
//! Geometry is always preserved; only pixel content is lossy.

use crate::error::ForgeError;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbImage};
use std::io::Cursor;
use tracing::debug;

/// Re-encode `bytes` as `target_type` (`image/png` or `image/jpeg`).
pub fn recompress(bytes: &[u8], target_type: &str, jpeg_quality: u8) -> Result<Vec<u8>, ForgeError> {
    let img = image::load_from_memory(bytes)?;
    debug!(
        width = img.width(),
        height = img.height(),
        target = target_type,
        "recompressing image"
    );

    match target_type {
        "image/jpeg" => encode_jpeg(&img, jpeg_quality),
        "image/png" => {
            let mut buf = Vec::new();
            img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
            Ok(buf)
        }
        other => Err(ForgeError::executor(
            "canvas-recompress",
            format!("unsupported target type '{other}'"),
        )),
    }
}

/// Flatten and encode as JPEG at the given quality.
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, ForgeError> {
    let flat = flatten_onto_white(img);
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut Cursor::new(&mut buf), quality).encode_image(&flat)?;
    Ok(buf)
}

/// Composite any transparency onto an opaque white background.
pub fn flatten_onto_white(img: &DynamicImage) -> RgbImage {
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut out = RgbImage::new(width, height);

    for (src, dst) in rgba.pixels().zip(out.pixels_mut()) {
        let alpha = src[3] as u32;
        for c in 0..3 {
            // Straight alpha over white: a*src + (1-a)*255, fixed point.
            dst[c] = (((src[c] as u32) * alpha + 255 * (255 - alpha)) / 255) as u8;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn png_bytes(img: RgbaImage) -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn png_jpeg_png_preserves_geometry() {
        let png = png_bytes(RgbaImage::from_pixel(33, 17, Rgba([10, 120, 200, 255])));

        let jpeg = recompress(&png, "image/jpeg", 90).unwrap();
        let back = recompress(&jpeg, "image/png", 90).unwrap();

        let final_img = image::load_from_memory(&back).unwrap();
        assert_eq!((final_img.width(), final_img.height()), (33, 17));
    }

    #[test]
    fn transparent_pixels_become_white_in_jpeg() {
        let png = png_bytes(RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 0])));
        let jpeg = recompress(&png, "image/jpeg", 90).unwrap();
        let decoded = image::load_from_memory(&jpeg).unwrap().to_rgb8();
        let p = decoded.get_pixel(4, 4);
        // JPEG is lossy; near-white is close enough.
        assert!(p[0] > 245 && p[1] > 245 && p[2] > 245, "got {p:?}");
    }

    #[test]
    fn semi_transparent_blends_toward_white() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 128])));
        let flat = flatten_onto_white(&img);
        let p = flat.get_pixel(0, 0);
        // 50% black over white lands mid-grey.
        assert!(p[0] > 120 && p[0] < 135, "got {p:?}");
    }

    #[test]
    fn unknown_target_is_rejected() {
        let png = png_bytes(RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255])));
        assert!(recompress(&png, "image/webp", 90).is_err());
    }

    #[test]
    fn garbage_input_is_a_codec_error() {
        let err = recompress(b"not an image", "image/png", 90).unwrap_err();
        assert!(matches!(err, ForgeError::ImageCodec { .. }));
    }
}
