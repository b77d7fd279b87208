//! Error types for the fileforge library.
//!
//! One failure kind — a classification miss — is deliberately *not* an error:
//! [`crate::classify::classify`] returns an empty set for unrecognised files
//! and the caller surfaces "unsupported type" however it likes.
//!
//! Everything else funnels into [`ForgeError`]. Executor failures are caught
//! by the dispatcher and retried through the descriptor's fallback chain
//! before becoming terminal; every other variant propagates to the caller
//! immediately as a single human-readable message. The dispatcher never
//! silently swallows a terminal failure.

use thiserror::Error;

/// All fatal errors returned by the fileforge library.
#[derive(Debug, Error)]
pub enum ForgeError {
    // ── Caller errors ─────────────────────────────────────────────────────
    /// No catalog entry carries the requested label.
    #[error("Unknown operation '{label}'\nCall classify() first and pick one of the returned labels.")]
    UnknownOperation { label: String },

    /// The file does not satisfy the chosen operation's source predicate.
    ///
    /// Programmer error — the caller invoked an operation the classifier
    /// never offered for this file. Fail fast rather than feed a backend
    /// bytes it cannot handle.
    #[error("Operation '{label}' does not apply to '{filename}' (declared type '{media_type}')")]
    PreconditionViolation {
        label: String,
        filename: String,
        media_type: String,
    },

    /// A job is already running on this dispatcher instance.
    ///
    /// Requests are rejected, not queued: the single-flight discipline
    /// guarantees at most one running job per dispatcher.
    #[error("A conversion is already in progress; retry once it completes")]
    JobInProgress,

    // ── Engine errors ─────────────────────────────────────────────────────
    /// The heavyweight transcode engine failed to initialise.
    ///
    /// Degrades capability rather than aborting everything: jobs whose
    /// executors do not need the engine remain fully usable, and the next
    /// job that needs it retries initialisation.
    #[error("Transcode engine failed to initialise: {detail}")]
    EngineInit { detail: String },

    // ── Executor errors ───────────────────────────────────────────────────
    /// A specific conversion attempt failed.
    ///
    /// Caught by the dispatcher while fallback executors remain; surfaced
    /// verbatim once the chain is exhausted.
    #[error("{executor} failed: {detail}")]
    ExecutorFailed { executor: String, detail: String },

    /// Rasterisation failed for one page of a multi-page job.
    ///
    /// Pages before this one were already delivered; the remaining pages are
    /// aborted and never retried individually.
    #[error("Rasterisation failed for page {page}: {detail}")]
    PageRender { page: usize, detail: String },

    /// Pixel decode or encode failed inside the image codec.
    #[error("Image codec error: {source}")]
    ImageCodec {
        #[from]
        source: image::ImageError,
    },

    /// The document writer could not assemble the output document.
    #[error("Document assembly failed: {detail}")]
    DocumentWrite { detail: String },

    // ── Sink errors ───────────────────────────────────────────────────────
    /// The result sink could not externalise a produced artifact.
    #[error("Failed to deliver '{filename}': {source}")]
    SinkWrite {
        filename: String,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ForgeError {
    /// Name a failed executor with its detail, for fallback-chain reporting.
    pub(crate) fn executor(name: impl Into<String>, detail: impl Into<String>) -> Self {
        ForgeError::ExecutorFailed {
            executor: name.into(),
            detail: detail.into(),
        }
    }
}
