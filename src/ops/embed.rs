//! Image → single-page document.
//!
//! The input image is re-encoded as JPEG (documents compress far better
//! with DCT data than with embedded lossless pixels) and placed on one
//! page, scaled to fit inside the margins while preserving aspect ratio —
//! capped by whichever of width or height is tighter.

use crate::config::ForgeConfig;
use crate::engine::DocumentWriter;
use crate::error::ForgeError;
use crate::ops::recompress;
use tracing::debug;

/// Computed placement on the page, millimetres from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x_mm: f32,
    pub y_mm: f32,
    pub width_mm: f32,
    pub height_mm: f32,
}

/// Fit an image of the given pixel dimensions into the page's printable
/// area, anchored at the margin offset.
pub fn fit_within(img_width: u32, img_height: u32, config: &ForgeConfig) -> Placement {
    let (avail_w, avail_h) = config.printable_area_mm();
    let ratio = img_width as f32 / img_height as f32;

    let mut width_mm = avail_w;
    let mut height_mm = width_mm / ratio;
    if height_mm > avail_h {
        height_mm = avail_h;
        width_mm = height_mm * ratio;
    }

    Placement {
        x_mm: config.margin_mm,
        y_mm: config.margin_mm,
        width_mm,
        height_mm,
    }
}

/// Embed one image as a single-page document.
pub fn embed(
    writer: &dyn DocumentWriter,
    bytes: &[u8],
    config: &ForgeConfig,
) -> Result<Vec<u8>, ForgeError> {
    let img = image::load_from_memory(bytes)?;
    let placement = fit_within(img.width(), img.height(), config);
    debug!(
        img_width = img.width(),
        img_height = img.height(),
        placed_w_mm = placement.width_mm,
        placed_h_mm = placement.height_mm,
        "embedding image"
    );

    let jpeg = recompress::encode_jpeg(&img, config.jpeg_quality)?;

    let mut builder = writer.new_document(config.page_width_mm, config.page_height_mm);
    builder.add_image(
        &jpeg,
        placement.x_mm,
        placement.y_mm,
        placement.width_mm,
        placement.height_mm,
    )?;
    builder.finish()
}
