//! # fileforge
//!
//! A file-type-driven conversion dispatcher: classify an input file by its
//! declared media type and filename extension, offer the applicable
//! conversions from a fixed catalog, and execute exactly one at a time
//! through pluggable backends.
//!
//! ## Why this crate?
//!
//! Wiring "user picked a file, convert it" flows tends to collapse into
//! near-duplicate handlers: one per format pair, each re-implementing the
//! same classify → invoke → deliver loop with its own ad-hoc error and
//! status plumbing. This crate keeps that loop in one place. The catalog is
//! data, fallback chains are data, and every heavyweight collaborator sits
//! behind a trait, so the dispatch logic never changes when a format or a
//! backend does.
//!
//! ## Pipeline Overview
//!
//! ```text
//! InputFile
//!  │
//!  ├─ 1. Classify   declared MIME, extension fallback → operation set
//!  ├─ 2. Pick       caller chooses one label
//!  ├─ 3. Dispatch   single-flight guard, engine lazy-init, fallback walk
//!  ├─ 4. Execute    ffmpeg / decoder / pdfium / image / lopdf backend
//!  └─ 5. Deliver    ConversionResult(s) → ResultSink, status → observer
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fileforge::{
//!     Collaborators, ConversionDispatcher, DirectorySink, ForgeConfig, InputFile,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dispatcher = ConversionDispatcher::new(Collaborators::native(), ForgeConfig::default());
//!     let sink = DirectorySink::new("out");
//!
//!     let bytes = std::fs::read("report.pdf")?;
//!     let file = InputFile::new(bytes, "application/pdf", "report.pdf");
//!
//!     for op in dispatcher.classify(&file) {
//!         println!("available: {}", op.label);
//!     }
//!
//!     let results = dispatcher.run(&file, "PDF to PNGs", &sink).await?;
//!     println!("{} pages written", results.len());
//!     Ok(())
//! }
//! ```
//!
//! ## The catalog
//!
//! | Source | Target | Primary | Fallback |
//! |--------|--------|---------|----------|
//! | video/mp4 | image/gif | transcode engine | — |
//! | image/heic (or `.heic`) | image/png | lightweight decoder | engine still-frame |
//! | application/pdf | image/png, image/jpeg | rasteriser, per page | — |
//! | image/png | image/jpeg | recompress (white-flattened, q90) | — |
//! | image/jpeg | image/png | recompress | — |
//! | image/png, image/jpeg | application/pdf | embed on A4, 10 mm margin | — |
//!
//! ## Concurrency model
//!
//! Single-threaded cooperative per dispatcher: one job at a time, operations
//! inside a job strictly in written order, and a second `run` while one is
//! outstanding rejected, not queued. The transcode engine is the only
//! cross-job shared resource; it initialises lazily on first need and is
//! reused for the process lifetime.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod catalog;
pub mod classify;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod file;
pub mod ops;
pub mod sink;
pub mod status;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use catalog::{ConversionCatalog, ExecutorRef, OperationDescriptor, SourcePredicate};
pub use classify::classify;
pub use config::{ForgeConfig, ForgeConfigBuilder, GifQuality};
pub use dispatch::{Collaborators, ConversionDispatcher, ResultStream};
pub use engine::{
    DocumentBuilder, DocumentRasterizer, DocumentWriter, EngineHandle, FilterSpec, ImageDecoder,
    RenderedPage, TranscodeEngine,
};
pub use error::ForgeError;
pub use file::InputFile;
pub use sink::{ConversionResult, DirectorySink, MemorySink, ResultSink};
pub use status::{NoopStatusObserver, SharedStatusObserver, StatusObserver};
