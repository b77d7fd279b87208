//! [`DocumentRasterizer`] adapter over `pdfium-render`.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async
//! contexts. `tokio::task::spawn_blocking` moves each call onto the
//! blocking thread pool so rasterisation never stalls the async workers.
//!
//! Each call re-opens the document from bytes. For the single-flight,
//! one-document-at-a-time workload this crate serves, reopening is cheap
//! relative to rendering and keeps the trait stateless and `Send`.

use crate::engine::{DocumentRasterizer, RenderedPage};
use crate::error::ForgeError;
use async_trait::async_trait;
use pdfium_render::prelude::*;
use tracing::debug;

/// Rasteriser backed by a pdfium dynamic library bound via
/// [`Pdfium::default()`].
pub struct PdfiumRasterizer;

impl PdfiumRasterizer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PdfiumRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentRasterizer for PdfiumRasterizer {
    async fn page_count(&self, document: &[u8]) -> Result<usize, ForgeError> {
        let bytes = document.to_vec();
        tokio::task::spawn_blocking(move || page_count_blocking(&bytes))
            .await
            .map_err(|e| ForgeError::Internal(format!("page-count task panicked: {e}")))?
    }

    async fn render_page(
        &self,
        document: &[u8],
        page_index: usize,
        scale: f32,
    ) -> Result<RenderedPage, ForgeError> {
        let bytes = document.to_vec();
        tokio::task::spawn_blocking(move || render_page_blocking(&bytes, page_index, scale))
            .await
            .map_err(|e| ForgeError::Internal(format!("render task panicked: {e}")))?
    }
}

fn open_error(e: PdfiumError) -> ForgeError {
    ForgeError::executor("rasterize-page", format!("could not open document: {e:?}"))
}

fn page_count_blocking(bytes: &[u8]) -> Result<usize, ForgeError> {
    let pdfium = Pdfium::default();
    let document = pdfium
        .load_pdf_from_byte_vec(bytes.to_vec(), None)
        .map_err(open_error)?;
    Ok(document.pages().len() as usize)
}

fn render_page_blocking(bytes: &[u8], page_index: usize, scale: f32) -> Result<RenderedPage, ForgeError> {
    let pdfium = Pdfium::default();
    let document = pdfium
        .load_pdf_from_byte_vec(bytes.to_vec(), None)
        .map_err(open_error)?;
    let pages = document.pages();

    let page = pages
        .get(page_index as u16)
        .map_err(|e| ForgeError::PageRender {
            page: page_index + 1,
            detail: format!("{e:?}"),
        })?;

    // pdfium sizes pages in points; the scale factor multiplies the nominal
    // point size into a pixel target, preserving the page aspect ratio.
    let target_width = (page.width().value * scale).round().max(1.0) as i32;
    let render_config = PdfRenderConfig::new().set_target_width(target_width);

    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| ForgeError::PageRender {
            page: page_index + 1,
            detail: format!("{e:?}"),
        })?;

    let image = bitmap.as_image().to_rgba8();
    let (width, height) = image.dimensions();
    debug!(page = page_index + 1, width, height, "rasterised page");

    Ok(RenderedPage {
        width,
        height,
        rgba: image.into_raw(),
    })
}
