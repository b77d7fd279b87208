//! [`TranscodeEngine`] adapter over the `ffmpeg` command-line binary.
//!
//! ## Why a subprocess?
//!
//! Codec work belongs to ffmpeg; this crate only stages bytes in and out.
//! A subprocess keeps the engine out of the address space (a codec crash
//! cannot take the host down) and makes `initialize` a cheap capability
//! probe — if `ffmpeg -version` runs, every transcode the catalog asks for
//! is available.
//!
//! Input and output travel through a per-call [`tempfile::tempdir`]; the
//! directory and both files are removed when the guard drops, including on
//! the error paths.

use crate::engine::{FilterSpec, TranscodeEngine};
use crate::error::ForgeError;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, warn};

/// Transcode engine backed by an `ffmpeg` executable on `$PATH` (or an
/// explicit path).
pub struct FfmpegEngine {
    binary: PathBuf,
}

impl FfmpegEngine {
    /// Use the `ffmpeg` binary found on `$PATH`.
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from("ffmpeg"),
        }
    }

    /// Use an explicit binary path.
    pub fn with_binary(path: impl Into<PathBuf>) -> Self {
        Self {
            binary: path.into(),
        }
    }
}

impl Default for FfmpegEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TranscodeEngine for FfmpegEngine {
    async fn initialize(&self) -> Result<(), ForgeError> {
        let probe = Command::new(&self.binary)
            .arg("-version")
            .output()
            .await
            .map_err(|e| ForgeError::EngineInit {
                detail: format!("could not launch '{}': {e}", self.binary.display()),
            })?;

        if !probe.status.success() {
            return Err(ForgeError::EngineInit {
                detail: format!("'{} -version' exited with {}", self.binary.display(), probe.status),
            });
        }

        debug!(binary = %self.binary.display(), "ffmpeg probe succeeded");
        Ok(())
    }

    async fn transcode(&self, input: &[u8], spec: &FilterSpec) -> Result<Vec<u8>, ForgeError> {
        let dir = tempfile::tempdir()
            .map_err(|e| ForgeError::Internal(format!("transcode staging dir: {e}")))?;
        let in_path = dir.path().join(format!("input.{}", spec.input_ext));
        let out_path = dir.path().join(format!("output.{}", spec.output_ext));

        tokio::fs::write(&in_path, input)
            .await
            .map_err(|e| ForgeError::Internal(format!("stage transcode input: {e}")))?;

        let output = Command::new(&self.binary)
            .arg("-hide_banner")
            .args(["-loglevel", "error"])
            .arg("-i")
            .arg(&in_path)
            .args(&spec.args)
            .arg("-y")
            .arg(&out_path)
            .output()
            .await
            .map_err(|e| ForgeError::executor("transcode-engine", format!("launch failed: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(status = %output.status, "ffmpeg run failed");
            return Err(ForgeError::executor(
                "transcode-engine",
                stderr.trim().to_string(),
            ));
        }

        let bytes = tokio::fs::read(&out_path)
            .await
            .map_err(|e| ForgeError::executor("transcode-engine", format!("no output produced: {e}")))?;

        if bytes.is_empty() {
            return Err(ForgeError::executor(
                "transcode-engine",
                "output file is empty",
            ));
        }

        debug!(
            input_bytes = input.len(),
            output_bytes = bytes.len(),
            output_ext = spec.output_ext,
            "transcode complete"
        );

        Ok(bytes)
    }
}
