//! Configuration for conversion jobs.
//!
//! Every numeric and format knob lives in [`ForgeConfig`], built via its
//! validating builder. Keeping the policy in one struct makes it trivial to
//! share across jobs and to log the exact settings a run used.
//!
//! The GIF quality tiers are a single parameter rather than two code paths:
//! both the two-pass palette pipeline and the single-pass direct scale are
//! valid configurations of the same executor.

use crate::error::ForgeError;
use serde::{Deserialize, Serialize};

/// GIF transcode quality tier.
///
/// | Tier | Width | FPS | Filter chain |
/// |------|-------|-----|--------------|
/// | High | 480 px | 15 | two-pass palettegen → paletteuse |
/// | Low  | 320 px | 10 | single-pass direct scale |
///
/// High quality costs a second filter pass but avoids the banding the
/// default 256-colour quantiser produces on gradients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GifQuality {
    /// 480 px wide, 15 fps, palette-based dithering. (default)
    #[default]
    High,
    /// 320 px wide, 10 fps, direct scale. Smaller and faster.
    Low,
}

impl GifQuality {
    /// Target output width in pixels; height follows the aspect ratio.
    pub fn width(self) -> u32 {
        match self {
            GifQuality::High => 480,
            GifQuality::Low => 320,
        }
    }

    /// Reduced output frame rate.
    pub fn fps(self) -> u32 {
        match self {
            GifQuality::High => 15,
            GifQuality::Low => 10,
        }
    }

    /// Whether the palette-generate-then-apply two-pass chain is used.
    pub fn two_pass(self) -> bool {
        matches!(self, GifQuality::High)
    }
}

/// Conversion policy shared by all jobs on a dispatcher.
///
/// Built via [`ForgeConfig::builder()`] or [`ForgeConfig::default()`].
///
/// # Example
/// ```rust
/// use fileforge::{ForgeConfig, GifQuality};
///
/// let config = ForgeConfig::builder()
///     .gif_quality(GifQuality::Low)
///     .jpeg_quality(85)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForgeConfig {
    /// GIF transcode tier. Default: [`GifQuality::High`].
    pub gif_quality: GifQuality,

    /// JPEG encode quality, 1–100. Default: 90.
    ///
    /// 90 keeps recompressed photos visually indistinguishable from the
    /// source while roughly halving the byte size of a lossless original.
    pub jpeg_quality: u8,

    /// Render scale for PDF page rasterisation. Default: 1.5.
    ///
    /// 1× renders at the page's nominal point size, which leaves small text
    /// fuzzy on screens; 1.5× is the sharpness/memory sweet spot.
    pub raster_scale: f32,

    /// Page width for generated documents, millimetres. Default: 210 (A4).
    pub page_width_mm: f32,

    /// Page height for generated documents, millimetres. Default: 297 (A4).
    pub page_height_mm: f32,

    /// Margin on all four sides of a generated page, millimetres. Default: 10.
    pub margin_mm: f32,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            gif_quality: GifQuality::High,
            jpeg_quality: 90,
            raster_scale: 1.5,
            page_width_mm: 210.0,
            page_height_mm: 297.0,
            margin_mm: 10.0,
        }
    }
}

impl ForgeConfig {
    /// Create a new builder.
    pub fn builder() -> ForgeConfigBuilder {
        ForgeConfigBuilder {
            config: Self::default(),
        }
    }

    /// Printable area inside the margins, millimetres.
    pub fn printable_area_mm(&self) -> (f32, f32) {
        (
            self.page_width_mm - 2.0 * self.margin_mm,
            self.page_height_mm - 2.0 * self.margin_mm,
        )
    }
}

/// Builder for [`ForgeConfig`].
#[derive(Debug)]
pub struct ForgeConfigBuilder {
    config: ForgeConfig,
}

impl ForgeConfigBuilder {
    pub fn gif_quality(mut self, q: GifQuality) -> Self {
        self.config.gif_quality = q;
        self
    }

    pub fn jpeg_quality(mut self, q: u8) -> Self {
        self.config.jpeg_quality = q;
        self
    }

    pub fn raster_scale(mut self, scale: f32) -> Self {
        self.config.raster_scale = scale;
        self
    }

    pub fn page_size_mm(mut self, width: f32, height: f32) -> Self {
        self.config.page_width_mm = width;
        self.config.page_height_mm = height;
        self
    }

    pub fn margin_mm(mut self, margin: f32) -> Self {
        self.config.margin_mm = margin;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ForgeConfig, ForgeError> {
        let c = &self.config;
        if c.jpeg_quality == 0 || c.jpeg_quality > 100 {
            return Err(ForgeError::InvalidConfig(format!(
                "JPEG quality must be 1–100, got {}",
                c.jpeg_quality
            )));
        }
        if !c.raster_scale.is_finite() || c.raster_scale <= 0.0 {
            return Err(ForgeError::InvalidConfig(format!(
                "Raster scale must be positive, got {}",
                c.raster_scale
            )));
        }
        let (pw, ph) = c.printable_area_mm();
        if c.margin_mm < 0.0 || pw <= 0.0 || ph <= 0.0 {
            return Err(ForgeError::InvalidConfig(format!(
                "Margins ({} mm) leave no printable area on a {}×{} mm page",
                c.margin_mm, c.page_width_mm, c.page_height_mm
            )));
        }
        Ok(self.config)
    }
}
