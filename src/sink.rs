//! Result delivery: the artifact type and the sink contract.
//!
//! A [`ConversionResult`] is immutable once produced; ownership transfers
//! to the sink at delivery, which is responsible for externalising it —
//! writing a file, pushing it down a channel, rendering a preview. The
//! dispatcher knows nothing beyond `deliver`.
//!
//! Two policies ship with the crate: [`DirectorySink`] writes artifacts
//! under a directory with an atomic temp-write-then-rename, and
//! [`MemorySink`] collects them in memory for tests and embedding callers.

use crate::error::ForgeError;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::info;

/// The artifact produced by a conversion.
#[derive(Debug, Clone)]
pub struct ConversionResult {
    /// Raw output bytes.
    pub bytes: Vec<u8>,
    /// Declared media type of the bytes.
    pub media_type: String,
    /// Suggested filename: timestamp-based, or page-numbered for
    /// multi-artifact jobs.
    pub filename: String,
    /// 1-based page number for multi-artifact jobs.
    pub page: Option<usize>,
}

impl ConversionResult {
    /// Single-artifact result with a timestamped filename.
    pub fn single(bytes: Vec<u8>, media_type: impl Into<String>, ext: &str) -> Self {
        let filename = format!("converted-{}.{ext}", chrono::Utc::now().timestamp_millis());
        Self {
            bytes,
            media_type: media_type.into(),
            filename,
            page: None,
        }
    }

    /// Per-page result of a multi-artifact job.
    pub fn page(bytes: Vec<u8>, media_type: impl Into<String>, ext: &str, page: usize) -> Self {
        Self {
            bytes,
            media_type: media_type.into(),
            filename: format!("page-{page}.{ext}"),
            page: Some(page),
        }
    }
}

/// Abstract destination for produced artifacts.
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn deliver(&self, result: ConversionResult) -> Result<(), ForgeError>;
}

/// Collects delivered results in memory, in delivery order.
#[derive(Default)]
pub struct MemorySink {
    results: Mutex<Vec<ConversionResult>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Results delivered so far, cloned out.
    pub fn results(&self) -> Vec<ConversionResult> {
        self.results.lock().expect("sink lock poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.results.lock().expect("sink lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ResultSink for MemorySink {
    async fn deliver(&self, result: ConversionResult) -> Result<(), ForgeError> {
        self.results.lock().expect("sink lock poisoned").push(result);
        Ok(())
    }
}

/// Writes each artifact into a directory under its suggested filename.
///
/// Uses atomic write (temp file + rename) so a crash mid-write never leaves
/// a partial artifact that looks like a success.
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl ResultSink for DirectorySink {
    async fn deliver(&self, result: ConversionResult) -> Result<(), ForgeError> {
        let sink_err = |filename: &str| {
            let filename = filename.to_string();
            move |source: std::io::Error| ForgeError::SinkWrite { filename, source }
        };

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(sink_err(&result.filename))?;

        let final_path = self.dir.join(&result.filename);
        let tmp_path = final_path.with_extension("tmp");

        tokio::fs::write(&tmp_path, &result.bytes)
            .await
            .map_err(sink_err(&result.filename))?;
        tokio::fs::rename(&tmp_path, &final_path)
            .await
            .map_err(sink_err(&result.filename))?;

        info!(
            path = %final_path.display(),
            bytes = result.bytes.len(),
            media_type = %result.media_type,
            "artifact written"
        );
        Ok(())
    }
}

/// Forwards each result into a tokio channel; backs [`run_stream`].
///
/// [`run_stream`]: crate::dispatch::ConversionDispatcher::run_stream
pub(crate) struct ChannelSink {
    pub(crate) tx: tokio::sync::mpsc::Sender<Result<ConversionResult, ForgeError>>,
}

#[async_trait]
impl ResultSink for ChannelSink {
    async fn deliver(&self, result: ConversionResult) -> Result<(), ForgeError> {
        self.tx
            .send(Ok(result))
            .await
            .map_err(|_| ForgeError::Internal("result stream receiver dropped".into()))
    }
}
