//! The conversion dispatcher: one job at a time, walked through its
//! executor chain with fallback, results delivered as they are produced.
//!
//! ## Single-flight
//!
//! At most one job may be Running per dispatcher instance. A `run` call
//! while another is outstanding is rejected immediately with
//! [`ForgeError::JobInProgress`] — never queued — before any executor is
//! invoked. The guard is a compare-exchange on an atomic flag, released on
//! every exit path by a drop guard.
//!
//! ## Fallback walk
//!
//! The descriptor's executor chain is data; the dispatcher tries each entry
//! in order, reporting the switch through the status observer, and
//! surfaces the *last* failure verbatim once the chain is exhausted. An
//! engine-init failure counts as the attempting executor's failure, so
//! jobs that never touch the engine are unaffected and the next engine job
//! retries initialisation.
//!
//! ## Multi-page jobs
//!
//! PDF rasterisation delivers one result per page, strictly ascending, each
//! page's encode awaited before the next render. A failure on page k leaves
//! the k−1 already-delivered results with the sink and aborts the rest;
//! because artifacts have already left the building, page failures are
//! terminal and never retried through a fallback.

use crate::catalog::{ConversionCatalog, ExecutorRef, OperationDescriptor};
use crate::classify;
use crate::config::ForgeConfig;
use crate::engine::ffmpeg::FfmpegEngine;
use crate::engine::pdfium::PdfiumRasterizer;
use crate::engine::writer::LopdfWriter;
use crate::engine::{
    DocumentRasterizer, DocumentWriter, EngineHandle, ImageDecoder, TranscodeEngine,
};
use crate::error::ForgeError;
use crate::file::InputFile;
use crate::ops;
use crate::sink::{ChannelSink, ConversionResult, ResultSink};
use crate::status::{NoopStatusObserver, SharedStatusObserver};
use futures::Stream;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

/// A boxed stream of conversion results; an `Err` item is terminal.
pub type ResultStream = Pin<Box<dyn Stream<Item = Result<ConversionResult, ForgeError>> + Send>>;

/// The external backends a dispatcher drives.
///
/// Every field is a trait object so tests and embedders can swap any
/// backend for a fake. The decoder slot is optional: without one, HEIC
/// jobs go straight to the engine fallback.
pub struct Collaborators {
    pub engine: Arc<dyn TranscodeEngine>,
    pub decoder: Option<Arc<dyn ImageDecoder>>,
    pub rasterizer: Arc<dyn DocumentRasterizer>,
    pub writer: Arc<dyn DocumentWriter>,
}

impl Collaborators {
    /// The bundled native backends: ffmpeg CLI, pdfium, lopdf, no
    /// lightweight decoder.
    pub fn native() -> Self {
        Self {
            engine: Arc::new(FfmpegEngine::new()),
            decoder: None,
            rasterizer: Arc::new(PdfiumRasterizer::new()),
            writer: Arc::new(LopdfWriter::new()),
        }
    }
}

/// Lifecycle of a job: created on invoke, destroyed on resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobStatus {
    Running,
    Succeeded,
    Failed,
}

/// Ephemeral per-run record: which operation, which executor attempt.
struct Job {
    label: &'static str,
    status: JobStatus,
    /// Index into the descriptor's executor chain; 0 is the primary.
    attempt: usize,
}

impl Job {
    fn start(label: &'static str) -> Self {
        let job = Self {
            label,
            status: JobStatus::Running,
            attempt: 0,
        };
        tracing::debug!(label, status = ?job.status, "job status");
        job
    }

    fn transition(&mut self, status: JobStatus) {
        self.status = status;
        tracing::debug!(
            label = self.label,
            status = ?self.status,
            attempt = self.attempt,
            "job status"
        );
    }
}

/// Orchestrates execution of one conversion operation at a time.
pub struct ConversionDispatcher {
    catalog: ConversionCatalog,
    config: ForgeConfig,
    engine: EngineHandle,
    decoder: Option<Arc<dyn ImageDecoder>>,
    rasterizer: Arc<dyn DocumentRasterizer>,
    writer: Arc<dyn DocumentWriter>,
    observer: SharedStatusObserver,
    busy: AtomicBool,
}

impl ConversionDispatcher {
    pub fn new(collaborators: Collaborators, config: ForgeConfig) -> Self {
        Self {
            catalog: ConversionCatalog::standard(),
            config,
            engine: EngineHandle::new(collaborators.engine),
            decoder: collaborators.decoder,
            rasterizer: collaborators.rasterizer,
            writer: collaborators.writer,
            observer: Arc::new(NoopStatusObserver),
            busy: AtomicBool::new(false),
        }
    }

    /// Attach a status observer; replaces the default no-op one.
    pub fn with_observer(mut self, observer: SharedStatusObserver) -> Self {
        self.observer = observer;
        self
    }

    pub fn catalog(&self) -> &ConversionCatalog {
        &self.catalog
    }

    /// Operations applicable to `file`, in catalog order. Empty means
    /// unsupported type; that is a valid result, not an error.
    pub fn classify(&self, file: &InputFile) -> Vec<&OperationDescriptor> {
        classify::classify(&self.catalog, file)
    }

    /// Proactively initialise the transcode engine, e.g. on file selection.
    ///
    /// Failure is reported through the observer but swallowed: image and
    /// document paths stay usable without the engine, and the next job that
    /// needs it retries.
    pub async fn prewarm_engine(&self) {
        self.observer.on_status("Initialising video engine…");
        match self.engine.ensure_ready().await {
            Ok(_) => self.observer.on_status("Video engine ready"),
            Err(e) => {
                warn!(error = %e, "engine prewarm failed");
                self.observer
                    .on_status("Video engine failed to load (images and documents still work)");
            }
        }
    }

    /// Execute the operation `label` on `file`, delivering every produced
    /// artifact to `sink` and returning them all on success.
    ///
    /// # Errors
    /// - [`ForgeError::UnknownOperation`] — no catalog entry for `label`
    /// - [`ForgeError::JobInProgress`] — another job is running (rejected,
    ///   not queued; no executor is invoked)
    /// - [`ForgeError::PreconditionViolation`] — `file` does not satisfy
    ///   the operation's source predicate
    /// - the last executor failure, verbatim, once the fallback chain is
    ///   exhausted
    pub async fn run(
        &self,
        file: &InputFile,
        label: &str,
        sink: &dyn ResultSink,
    ) -> Result<Vec<ConversionResult>, ForgeError> {
        let descriptor = self
            .catalog
            .get(label)
            .ok_or_else(|| ForgeError::UnknownOperation {
                label: label.to_string(),
            })?;

        let _guard = self.try_acquire()?;

        if !descriptor.source.matches(file) {
            return Err(ForgeError::PreconditionViolation {
                label: label.to_string(),
                filename: file.filename().to_string(),
                media_type: file.media_type().to_string(),
            });
        }

        let mut job = Job::start(descriptor.label);
        self.observer.on_job_start(descriptor.label);
        self.observer.on_status(&format!("Converting: {label}…"));
        info!(
            label,
            filename = file.filename(),
            bytes = file.len(),
            "job started"
        );

        let mut last_err: Option<ForgeError> = None;
        for (attempt, &executor) in descriptor.executors.iter().enumerate() {
            job.attempt = attempt;
            if attempt > 0 {
                self.observer.on_status(&format!(
                    "Trying fallback: {}…",
                    executor.name()
                ));
            }

            match self.execute(executor, file, descriptor, sink).await {
                Ok(results) => {
                    job.transition(JobStatus::Succeeded);
                    info!(label = job.label, artifacts = results.len(), "job succeeded");
                    self.observer.on_job_complete(results.len());
                    self.observer.on_status("Done");
                    return Ok(results);
                }
                Err(e) => {
                    warn!(
                        label = job.label,
                        executor = executor.name(),
                        attempt,
                        error = %e,
                        "executor attempt failed"
                    );
                    // Page failures happen after artifacts have already been
                    // delivered; retrying another executor would double-deliver.
                    let terminal = matches!(e, ForgeError::PageRender { .. });
                    last_err = Some(e);
                    if terminal {
                        break;
                    }
                }
            }
        }

        job.transition(JobStatus::Failed);
        let err =
            last_err.unwrap_or_else(|| ForgeError::Internal("empty executor chain".into()));
        self.observer.on_job_error(&err.to_string());
        self.observer.on_status(&format!("failed: {err}"));
        Err(err)
    }

    /// Streaming variant of [`run`](Self::run): artifacts arrive as stream
    /// items in delivery order, with a terminal `Err` item on failure.
    pub fn run_stream(
        self: Arc<Self>,
        file: InputFile,
        label: impl Into<String>,
    ) -> ResultStream {
        let label = label.into();
        let (tx, rx) = tokio::sync::mpsc::channel(16);

        tokio::spawn(async move {
            let sink = ChannelSink { tx: tx.clone() };
            if let Err(e) = self.run(&file, &label, &sink).await {
                let _ = tx.send(Err(e)).await;
            }
        });

        Box::pin(ReceiverStream::new(rx))
    }

    // ── Internal ─────────────────────────────────────────────────────────

    fn try_acquire(&self) -> Result<FlightGuard<'_>, ForgeError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            Ok(FlightGuard(&self.busy))
        } else {
            Err(ForgeError::JobInProgress)
        }
    }

    /// Run a single executor attempt end to end, delivering its artifacts.
    async fn execute(
        &self,
        executor: ExecutorRef,
        file: &InputFile,
        descriptor: &OperationDescriptor,
        sink: &dyn ResultSink,
    ) -> Result<Vec<ConversionResult>, ForgeError> {
        match executor {
            ExecutorRef::TranscodeGif => {
                let engine = self.engine.ensure_ready().await?;
                let spec = ops::gif::filter_spec(self.config.gif_quality);
                let bytes = engine.transcode(file.bytes(), &spec).await?;
                self.deliver_single(
                    sink,
                    ConversionResult::single(bytes, spec.output_type, spec.output_ext),
                )
                .await
            }
            ExecutorRef::DecodeImage => {
                let bytes =
                    ops::heic::decode(self.decoder.as_ref(), file.bytes(), descriptor.target_type)
                        .await?;
                self.deliver_single(
                    sink,
                    ConversionResult::single(bytes, descriptor.target_type, descriptor.target_ext),
                )
                .await
            }
            ExecutorRef::TranscodeStill => {
                let engine = self.engine.ensure_ready().await?;
                let spec = ops::heic::still_frame_spec();
                let bytes = engine.transcode(file.bytes(), &spec).await?;
                self.deliver_single(
                    sink,
                    ConversionResult::single(bytes, spec.output_type, spec.output_ext),
                )
                .await
            }
            ExecutorRef::Recompress => {
                let bytes = ops::recompress::recompress(
                    file.bytes(),
                    descriptor.target_type,
                    self.config.jpeg_quality,
                )?;
                self.deliver_single(
                    sink,
                    ConversionResult::single(bytes, descriptor.target_type, descriptor.target_ext),
                )
                .await
            }
            ExecutorRef::EmbedPage => {
                let bytes = ops::embed::embed(self.writer.as_ref(), file.bytes(), &self.config)?;
                self.deliver_single(
                    sink,
                    ConversionResult::single(bytes, descriptor.target_type, descriptor.target_ext),
                )
                .await
            }
            ExecutorRef::RasterizePages => self.rasterize_pages(file, descriptor, sink).await,
        }
    }

    async fn deliver_single(
        &self,
        sink: &dyn ResultSink,
        result: ConversionResult,
    ) -> Result<Vec<ConversionResult>, ForgeError> {
        sink.deliver(result.clone()).await?;
        self.observer.on_artifact(1, &result.filename);
        Ok(vec![result])
    }

    /// Pages 1..N ascending, one delivered result each; abort on failure.
    async fn rasterize_pages(
        &self,
        file: &InputFile,
        descriptor: &OperationDescriptor,
        sink: &dyn ResultSink,
    ) -> Result<Vec<ConversionResult>, ForgeError> {
        let total = self.rasterizer.page_count(file.bytes()).await?;
        self.observer
            .on_status(&format!("Extracting {total} pages…"));

        let mut results = Vec::with_capacity(total);
        for page_num in 1..=total {
            let page = self
                .rasterizer
                .render_page(file.bytes(), page_num - 1, self.config.raster_scale)
                .await
                .map_err(|e| page_error(page_num, e))?;

            let encoded =
                ops::raster::encode_page(&page, descriptor.target_type, self.config.jpeg_quality)
                    .map_err(|e| page_error(page_num, e))?;

            let result = ConversionResult::page(
                encoded,
                descriptor.target_type,
                descriptor.target_ext,
                page_num,
            );
            sink.deliver(result.clone()).await?;
            self.observer.on_artifact(page_num, &result.filename);
            results.push(result);
        }

        Ok(results)
    }
}

/// Attribute a per-page failure to its 1-based page number.
fn page_error(page: usize, e: ForgeError) -> ForgeError {
    match e {
        ForgeError::PageRender { .. } => e,
        other => ForgeError::PageRender {
            page,
            detail: other.to_string(),
        },
    }
}

/// Releases the single-flight slot on every exit path.
struct FlightGuard<'a>(&'a AtomicBool);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flight_guard_releases_on_drop() {
        let busy = AtomicBool::new(false);
        {
            busy.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .unwrap();
            let _guard = FlightGuard(&busy);
            assert!(busy.load(Ordering::Acquire));
        }
        assert!(!busy.load(Ordering::Acquire));
    }

    #[test]
    fn page_error_wraps_non_page_failures() {
        let e = page_error(4, ForgeError::Internal("oops".into()));
        assert!(matches!(e, ForgeError::PageRender { page: 4, .. }));
        // Already-attributed failures keep their page number.
        let e = page_error(9, ForgeError::PageRender { page: 4, detail: "x".into() });
        assert!(matches!(e, ForgeError::PageRender { page: 4, .. }));
    }
}
