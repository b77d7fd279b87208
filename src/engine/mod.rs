//! Collaborator contracts the dispatcher consumes, plus the lazy-init
//! handle for the heavyweight transcode engine.
//!
//! The dispatcher never talks to ffmpeg, pdfium, or lopdf directly — it
//! talks to these traits. That keeps the core testable with fakes and lets
//! a host swap a backend (say, a WASM transcoder for the CLI one) without
//! touching dispatch logic. The bundled adapters live in the submodules:
//!
//! 1. [`ffmpeg`] — [`TranscodeEngine`] over the `ffmpeg` binary
//! 2. [`pdfium`] — [`DocumentRasterizer`] over `pdfium-render`
//! 3. [`writer`] — [`DocumentWriter`] over `lopdf`
//!
//! No lightweight HEIC decoder ships with the crate; the slot is optional
//! and the catalog's fallback chain routes HEIC through the engine when
//! the slot is empty or the decode fails.

pub mod ffmpeg;
pub mod pdfium;
pub mod writer;

use crate::error::ForgeError;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Recipe for a single engine transcode run.
///
/// Built by the operations in [`crate::ops`]; consumed opaquely by the
/// engine. `args` sit between the input and output in the invocation, so a
/// filter chain, frame limit, or format flag all travel the same way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSpec {
    /// Extension hint for the staged input file (engines sniff by suffix).
    pub input_ext: &'static str,
    /// Extension of the produced output file.
    pub output_ext: &'static str,
    /// Declared media type of the produced bytes.
    pub output_type: &'static str,
    /// Engine arguments between input and output.
    pub args: Vec<String>,
}

/// The heavyweight transcoding collaborator.
///
/// `initialize` must be idempotent once ready; `transcode` may assume a
/// successful `initialize` has happened (the [`EngineHandle`] enforces it).
#[async_trait]
pub trait TranscodeEngine: Send + Sync {
    async fn initialize(&self) -> Result<(), ForgeError>;

    async fn transcode(&self, input: &[u8], spec: &FilterSpec) -> Result<Vec<u8>, ForgeError>;
}

/// Stateless single-call image decoder (the lightweight HEIC path).
#[async_trait]
pub trait ImageDecoder: Send + Sync {
    /// Decode `input` and re-encode it as `target_type`.
    async fn decode(&self, input: &[u8], target_type: &str) -> Result<Vec<u8>, ForgeError>;
}

/// One rasterised document page as a raw RGBA pixel buffer.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub width: u32,
    pub height: u32,
    /// Row-major RGBA, `width * height * 4` bytes.
    pub rgba: Vec<u8>,
}

/// Renders document pages to pixel buffers.
///
/// Calls are stateless over the document bytes so the trait stays dyn-safe
/// and `Send`; backends that parse eagerly may cache internally.
#[async_trait]
pub trait DocumentRasterizer: Send + Sync {
    async fn page_count(&self, document: &[u8]) -> Result<usize, ForgeError>;

    /// Render one page (0-indexed) at the given scale factor.
    async fn render_page(
        &self,
        document: &[u8],
        page_index: usize,
        scale: f32,
    ) -> Result<RenderedPage, ForgeError>;
}

/// Produces a new paged document that images can be placed into.
pub trait DocumentWriter: Send + Sync {
    /// Start an empty document with the given page size in millimetres.
    fn new_document(&self, page_width_mm: f32, page_height_mm: f32) -> Box<dyn DocumentBuilder>;
}

/// An in-progress document. Coordinates are millimetres from the top-left
/// page corner, matching how the embed operation computes placement.
pub trait DocumentBuilder: Send {
    /// Place a JPEG-encoded image on the current page.
    fn add_image(
        &mut self,
        jpeg: &[u8],
        x_mm: f32,
        y_mm: f32,
        width_mm: f32,
        height_mm: f32,
    ) -> Result<(), ForgeError>;

    /// Serialise the finished document.
    fn finish(self: Box<Self>) -> Result<Vec<u8>, ForgeError>;
}

/// Lazy-init-once holder for the transcode engine.
///
/// Lifecycle per the single shared-resource policy: uninitialised at
/// construction; first need initialises; once ready the engine is reused for
/// the process lifetime; a failed init leaves the handle uninitialised so
/// the next need retries. Only one job runs at a time, so the mutex never
/// sees contention — it exists to make the write-once state explicit rather
/// than a bare process-wide variable.
pub struct EngineHandle {
    engine: Arc<dyn TranscodeEngine>,
    ready: tokio::sync::Mutex<bool>,
}

impl EngineHandle {
    pub fn new(engine: Arc<dyn TranscodeEngine>) -> Self {
        Self {
            engine,
            ready: tokio::sync::Mutex::new(false),
        }
    }

    /// Initialise on first need, then hand out the engine.
    pub async fn ensure_ready(&self) -> Result<Arc<dyn TranscodeEngine>, ForgeError> {
        let mut ready = self.ready.lock().await;
        if !*ready {
            info!("initialising transcode engine");
            self.engine.initialize().await?;
            *ready = true;
            info!("transcode engine ready");
        }
        Ok(Arc::clone(&self.engine))
    }

    /// Whether a successful initialisation has happened.
    pub async fn is_ready(&self) -> bool {
        *self.ready.lock().await
    }
}
