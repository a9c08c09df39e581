//! Chunked movie upload engine.
//!
//! Drives the full transfer lifecycle against a [`MovieApi`]
//! transport: session initiation with media-type validation,
//! bounded-concurrency chunk dispatch with per-chunk checksums and
//! retries, server-side status reconciliation, completion, and
//! post-upload processing monitoring.
//!
//! [`MovieApi`]: reelport_client::MovieApi

use std::time::Duration;

pub mod dispatcher;
pub mod media;
pub mod monitor;
pub mod observer;
pub mod retry;
pub mod session;

pub use dispatcher::ChunkDispatcher;
pub use monitor::{MonitorOutcome, StatusMonitor};
pub use observer::{NoopObserver, UploadObserver};
pub use retry::RetryPolicy;
pub use session::{MovieFile, SessionConfig, SessionState, UploadSession};

/// Default number of chunk uploads in flight at once.
pub const DEFAULT_MAX_CONCURRENT_CHUNKS: usize = 3;

/// Default retries per chunk (on top of the initial attempt).
pub const DEFAULT_CHUNK_RETRIES: u32 = 3;

/// Default delay before the first chunk retry; doubles per retry.
pub const DEFAULT_INITIAL_RETRY_DELAY: Duration = Duration::from_millis(1000);

/// Default number of processing-status polls.
pub const DEFAULT_MONITOR_ATTEMPTS: u32 = 30;

/// Default delay between processing-status polls.
pub const DEFAULT_MONITOR_INTERVAL: Duration = Duration::from_secs(10);

/// Errors produced by the upload engine.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("upload session not initiated")]
    NotInitiated,

    #[error("an upload session is already active")]
    SessionActive,

    #[error("session initiation failed: {0}")]
    SessionInitiation(#[source] reelport_client::Error),

    #[error("chunk {index} upload failed: {message}")]
    ChunkUpload { index: u32, message: String },

    #[error("status query failed: {0}")]
    StatusQuery(#[source] reelport_client::Error),

    #[error("completion failed: {0}")]
    Completion(#[source] reelport_client::Error),

    #[error("session cancellation failed: {0}")]
    Cancellation(#[source] reelport_client::Error),

    #[error("upload incomplete: {} chunks not yet acknowledged server-side", missing.len())]
    IncompleteUpload { missing: Vec<u32> },

    #[error("processing failed for movie {0}")]
    ProcessingFailed(String),

    #[error("cancelled")]
    Cancelled,

    #[error("transfer error: {0}")]
    Transfer(#[from] reelport_transfer::TransferError),
}

impl From<retry::Interrupted> for UploadError {
    fn from(_: retry::Interrupted) -> Self {
        UploadError::Cancelled
    }
}
