//! HEIC → still image.
//!
//! The primary path is the injected lightweight decoder; when the slot is
//! empty or the decode fails, the catalog's fallback chain retries on the
//! transcode engine with a first-frame extraction. HEIC files are sequences
//! internally, so `-frames:v 1` pulls the primary image.

use crate::engine::{FilterSpec, ImageDecoder};
use crate::error::ForgeError;
use std::sync::Arc;

/// Run the lightweight decoder, or fail the attempt when none is wired in
/// (letting the dispatcher walk on to the engine fallback).
pub async fn decode(
    decoder: Option<&Arc<dyn ImageDecoder>>,
    bytes: &[u8],
    target_type: &str,
) -> Result<Vec<u8>, ForgeError> {
    match decoder {
        Some(d) => d.decode(bytes, target_type).await,
        None => Err(ForgeError::executor(
            "lightweight-decode",
            "no lightweight decoder configured",
        )),
    }
}

/// Engine spec for the still-frame fallback.
pub fn still_frame_spec() -> FilterSpec {
    FilterSpec {
        input_ext: "heic",
        output_ext: "png",
        output_type: "image/png",
        args: vec!["-frames:v".to_string(), "1".to_string()],
    }
}
