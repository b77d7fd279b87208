//! Executor implementations, one file per operation family.
//!
//! Each module implements exactly one row family of the catalog and nothing
//! else. Keeping them separate makes each independently testable and keeps
//! the dispatcher a pure sequencer.
//!
//! 1. [`gif`]        — MP4 → animated GIF on the transcode engine
//! 2. [`heic`]       — HEIC → still image, lightweight decoder with an
//!    engine still-frame fallback shape
//! 3. [`raster`]     — PDF page pixel buffers → encoded page images
//! 4. [`recompress`] — PNG ↔ JPEG re-encode via the `image` crate
//! 5. [`embed`]      — image → single-page document with aspect-fit placement

pub mod embed;
pub mod gif;
pub mod heic;
pub mod raster;
pub mod recompress;
