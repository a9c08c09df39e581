//! Advisory observability hooks for upload progress.

use reelport_protocol::types::SessionProgress;

/// Receives advisory notifications from an active upload.
///
/// All methods default to no-ops; implementations must not assume
/// their behavior affects transfer correctness. Completion order
/// within a batch is unspecified, so `on_chunk_uploaded` indices are
/// not necessarily ascending, but reported percentages never regress.
pub trait UploadObserver: Send + Sync {
    /// A chunk was acknowledged by the server.
    fn on_chunk_uploaded(&self, _index: u32, _progress: SessionProgress) {}

    /// A chunk upload attempt failed and will be retried after backoff.
    fn on_chunk_retry(&self, _index: u32, _attempt: u32, _error: &str) {}

    /// Overall progress changed.
    fn on_progress(&self, _progress: SessionProgress) {}
}

/// Observer that ignores every notification.
pub struct NoopObserver;

impl UploadObserver for NoopObserver {}
