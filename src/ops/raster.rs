//! Encode a rasterised document page as its target image format.
//!
//! The rasteriser hands back raw RGBA; this stage turns each page into PNG
//! or JPEG bytes. Pages render onto an opaque background, but the buffer
//! format still carries an alpha channel, so the JPEG path goes through the
//! same flatten as recompression.

use crate::engine::RenderedPage;
use crate::error::ForgeError;
use crate::ops::recompress;
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::io::Cursor;

/// Encode one rendered page as `target_type` (`image/png` or `image/jpeg`).
pub fn encode_page(
    page: &RenderedPage,
    target_type: &str,
    jpeg_quality: u8,
) -> Result<Vec<u8>, ForgeError> {
    let buffer = RgbaImage::from_raw(page.width, page.height, page.rgba.clone()).ok_or_else(
        || {
            ForgeError::Internal(format!(
                "pixel buffer size mismatch: {}x{} with {} bytes",
                page.width,
                page.height,
                page.rgba.len()
            ))
        },
    )?;
    let img = DynamicImage::ImageRgba8(buffer);

    match target_type {
        "image/png" => {
            let mut buf = Vec::new();
            img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
            Ok(buf)
        }
        "image/jpeg" => recompress::encode_jpeg(&img, jpeg_quality),
        other => Err(ForgeError::executor(
            "rasterize-page",
            format!("unsupported page target '{other}'"),
        )),
    }
}
