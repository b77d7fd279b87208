//! Status-observer trait for job state transitions.
//!
//! The dispatcher has zero dependency on any rendering surface; everything
//! a UI would show — "Converting…", "falling back to heavy-duty engine",
//! "failed: …" — arrives through this trait. Forward the events to a status
//! line, a log, a channel, whatever the host uses.
//!
//! All methods have default no-op implementations so observers only
//! override what they care about. Only one job runs at a time, so calls for
//! a given dispatcher never overlap; the trait is still `Send + Sync`
//! because jobs may hop threads at await points.

use std::sync::Arc;

/// Receives every externally-visible state transition of a conversion job.
pub trait StatusObserver: Send + Sync {
    /// A job transitioned to Running.
    fn on_job_start(&self, label: &str) {
        let _ = label;
    }

    /// Free-text status, always reflecting the most specific known state.
    fn on_status(&self, text: &str) {
        let _ = text;
    }

    /// One artifact was delivered to the sink.
    ///
    /// `seq` is 1-based and equals the page number for multi-page jobs.
    fn on_artifact(&self, seq: usize, filename: &str) {
        let _ = (seq, filename);
    }

    /// The job succeeded with this many artifacts delivered.
    fn on_job_complete(&self, artifacts: usize) {
        let _ = artifacts;
    }

    /// The job failed terminally; `message` is the failure verbatim.
    fn on_job_error(&self, message: &str) {
        let _ = message;
    }
}

/// Observer that ignores every event; the default when none is configured.
pub struct NoopStatusObserver;

impl StatusObserver for NoopStatusObserver {}

/// Convenience alias matching the type the dispatcher stores.
pub type SharedStatusObserver = Arc<dyn StatusObserver>;
