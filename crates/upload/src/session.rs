//! Upload session lifecycle.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use reelport_client::MovieApi;
use reelport_protocol::messages::{
    ChunkManifest, CompleteUploadResponse, InitiateUploadRequest, UploadStatusResponse,
};
use reelport_protocol::types::{SessionProgress, UploadMetadata};
use reelport_transfer::{ChunkPlan, ChunkSource, DEFAULT_CHUNK_SIZE, checksum_bytes};

use crate::dispatcher::ChunkDispatcher;
use crate::observer::UploadObserver;
use crate::retry::RetryPolicy;
use crate::{
    DEFAULT_CHUNK_RETRIES, DEFAULT_INITIAL_RETRY_DELAY, DEFAULT_MAX_CONCURRENT_CHUNKS, UploadError,
    media,
};

/// Descriptor of the file being uploaded.
#[derive(Debug, Clone)]
pub struct MovieFile {
    /// Filename, used for media-type inference when no type is declared.
    pub file_name: String,
    /// Declared media type, if the caller knows one.
    pub media_type: Option<String>,
    /// Total byte length.
    pub size: u64,
}

/// Lifecycle state of an upload session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitiated,
    Active,
    Completed,
    Cancelled,
    Failed,
}

/// Tunables for one upload session.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub chunk_size: u64,
    pub max_concurrent_chunks: usize,
    pub max_chunk_retries: u32,
    pub initial_retry_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_concurrent_chunks: DEFAULT_MAX_CONCURRENT_CHUNKS,
            max_chunk_retries: DEFAULT_CHUNK_RETRIES,
            initial_retry_delay: DEFAULT_INITIAL_RETRY_DELAY,
        }
    }
}

/// One chunked movie upload, reusable across sequential transfers.
///
/// Thread-safe: all operations take `&self`. The acknowledged-chunk
/// set and the progress percentage derived from it are updated under a
/// single write lock, so concurrently completing chunks never produce
/// regressing or double-counted progress values.
pub struct UploadSession {
    api: Arc<dyn MovieApi>,
    config: SessionConfig,
    observer: Arc<dyn UploadObserver>,
    inner: RwLock<SessionInner>,
}

struct SessionInner {
    state: SessionState,
    upload_id: Option<String>,
    plan: Option<ChunkPlan>,
    acknowledged: HashSet<u32>,
    error: String,
    cancel: CancellationToken,
}

impl UploadSession {
    /// Creates a session over the given transport.
    pub fn new(
        api: Arc<dyn MovieApi>,
        config: SessionConfig,
        observer: Arc<dyn UploadObserver>,
    ) -> Self {
        Self {
            api,
            config,
            observer,
            inner: RwLock::new(SessionInner {
                state: SessionState::Uninitiated,
                upload_id: None,
                plan: None,
                acknowledged: HashSet::new(),
                error: String::new(),
                cancel: CancellationToken::new(),
            }),
        }
    }

    /// Starts a new server-side upload session for `file`.
    ///
    /// Validates the media type before any network traffic, resets all
    /// session-scoped state, and stores the server-issued upload id.
    /// Allowed from `Uninitiated` and from any terminal state (the
    /// session is reusable); fails with [`UploadError::SessionActive`]
    /// while a transfer is in progress.
    pub async fn initiate(
        &self,
        file: &MovieFile,
        metadata: UploadMetadata,
    ) -> Result<String, UploadError> {
        if self.state() == SessionState::Active {
            return Err(UploadError::SessionActive);
        }

        let media_type = media::resolve_media_type(&file.file_name, file.media_type.as_deref())?;
        let plan = ChunkPlan::new(file.size, self.config.chunk_size)?;

        let req = InitiateUploadRequest {
            filename: file.file_name.clone(),
            mime_type: media_type,
            total_size: file.size,
            chunk_size: self.config.chunk_size,
            metadata,
        };
        let resp = self
            .api
            .initiate(req)
            .await
            .map_err(UploadError::SessionInitiation)?;

        {
            let mut inner = self.inner.write().unwrap();
            inner.state = SessionState::Active;
            inner.upload_id = Some(resp.upload_id.clone());
            inner.plan = Some(plan);
            inner.acknowledged.clear();
            inner.error.clear();
            inner.cancel = CancellationToken::new();
        }

        info!(
            upload_id = %resp.upload_id,
            total_chunks = plan.total_chunks(),
            total_bytes = file.size,
            "upload session initiated"
        );
        Ok(resp.upload_id)
    }

    /// Uploads every chunk of `source` with bounded concurrency.
    ///
    /// Each chunk is sliced fresh from the source, checksummed, and
    /// retried per the session's policy. On failure the session stays
    /// `Active` with the acknowledged set reflecting completed chunks,
    /// so the caller can reconcile via [`check_status`](Self::check_status)
    /// and decide whether to retry or cancel.
    pub async fn upload_all_chunks(&self, source: Arc<dyn ChunkSource>) -> Result<(), UploadError> {
        let (upload_id, plan, cancel) = {
            let inner = self.inner.read().unwrap();
            match (&inner.state, &inner.upload_id, &inner.plan) {
                (SessionState::Active, Some(id), Some(plan)) => {
                    (id.clone(), *plan, inner.cancel.clone())
                }
                _ => return Err(UploadError::NotInitiated),
            }
        };

        let dispatcher = ChunkDispatcher::new(
            self.config.max_concurrent_chunks,
            RetryPolicy::new(self.config.max_chunk_retries, self.config.initial_retry_delay),
        );

        let upload = |index: u32| {
            let upload_id = upload_id.clone();
            let source = Arc::clone(&source);
            async move {
                let spec = plan.chunk(index)?;

                // Re-slice and re-checksum on every attempt; the bytes
                // sent must always match the digest that travels with
                // them.
                let src = Arc::clone(&source);
                let data =
                    tokio::task::spawn_blocking(move || src.read_range(spec.offset, spec.len))
                        .await
                        .map_err(|e| UploadError::ChunkUpload {
                            index,
                            message: format!("task join error: {e}"),
                        })??;
                let checksum = checksum_bytes(&data);

                let manifest = ChunkManifest {
                    upload_id,
                    chunk_number: index,
                    chunk_size: spec.len,
                    checksum,
                };
                self.api
                    .upload_chunk(manifest, data)
                    .await
                    .map_err(|e| UploadError::ChunkUpload {
                        index,
                        message: e.to_string(),
                    })?;

                self.record_ack(index);
                Ok(())
            }
        };

        let on_retry = |index: u32, attempt: u32, err: &UploadError| {
            warn!(chunk = index, attempt, error = %err, "chunk upload attempt failed");
            self.observer.on_chunk_retry(index, attempt, &err.to_string());
        };

        dispatcher
            .dispatch(plan.total_chunks(), &cancel, upload, on_retry)
            .await
    }

    /// Fetches the server's authoritative session snapshot.
    ///
    /// Server-side acknowledgement, not the local set, decides whether
    /// a chunk is durably stored. Local state is not mutated.
    pub async fn check_status(&self) -> Result<UploadStatusResponse, UploadError> {
        let upload_id = self.require_active()?;
        self.api
            .upload_status(&upload_id)
            .await
            .map_err(UploadError::StatusQuery)
    }

    /// Finalizes the upload.
    ///
    /// Reconciles against the server first: if any chunks are missing
    /// server-side this fails locally with
    /// [`UploadError::IncompleteUpload`] without issuing the
    /// completion request.
    pub async fn complete(&self) -> Result<CompleteUploadResponse, UploadError> {
        let upload_id = self.require_active()?;

        let status = self
            .api
            .upload_status(&upload_id)
            .await
            .map_err(UploadError::StatusQuery)?;
        if !status.missing_chunks.is_empty() {
            debug!(
                upload_id = %upload_id,
                missing = status.missing_chunks.len(),
                "refusing to complete with missing chunks"
            );
            return Err(UploadError::IncompleteUpload {
                missing: status.missing_chunks,
            });
        }

        let resp = self
            .api
            .complete_upload(&upload_id)
            .await
            .map_err(UploadError::Completion)?;

        self.inner.write().unwrap().state = SessionState::Completed;
        info!(movie_id = %resp.movie_id, "upload completed");
        Ok(resp)
    }

    /// Cancels the session.
    ///
    /// From `Active`: cancels the session token (a concurrent
    /// [`upload_all_chunks`](Self::upload_all_chunks) stops at its
    /// next suspension point; in-flight requests are not preempted),
    /// deletes the session server-side, and clears the local id.
    /// A no-op from any other state.
    pub async fn cancel(&self) -> Result<(), UploadError> {
        let upload_id = {
            let inner = self.inner.read().unwrap();
            if inner.state != SessionState::Active {
                return Ok(());
            }
            inner.cancel.cancel();
            match &inner.upload_id {
                Some(id) => id.clone(),
                None => return Ok(()),
            }
        };

        self.api
            .cancel_upload(&upload_id)
            .await
            .map_err(UploadError::Cancellation)?;

        let mut inner = self.inner.write().unwrap();
        inner.state = SessionState::Cancelled;
        inner.upload_id = None;
        info!(upload_id = %upload_id, "upload session cancelled");
        Ok(())
    }

    /// Marks the session as failed with an error message.
    pub fn fail(&self, reason: &str) {
        let mut inner = self.inner.write().unwrap();
        inner.state = SessionState::Failed;
        inner.error = reason.to_string();
        warn!(error = %reason, "upload session marked failed");
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.inner.read().unwrap().state
    }

    /// Server-issued upload id, if a session is active.
    pub fn upload_id(&self) -> Option<String> {
        self.inner.read().unwrap().upload_id.clone()
    }

    /// Current client-side progress snapshot.
    pub fn progress(&self) -> SessionProgress {
        let inner = self.inner.read().unwrap();
        let total = inner.plan.map(|p| p.total_chunks()).unwrap_or(0);
        SessionProgress::new(inner.acknowledged.len() as u32, total)
    }

    /// Locally acknowledged chunk indices, ascending.
    pub fn acknowledged_chunks(&self) -> Vec<u32> {
        let inner = self.inner.read().unwrap();
        let mut indices: Vec<u32> = inner.acknowledged.iter().copied().collect();
        indices.sort_unstable();
        indices
    }

    /// Error recorded by [`fail`](Self::fail), if any.
    pub fn last_error(&self) -> Option<String> {
        let inner = self.inner.read().unwrap();
        if inner.error.is_empty() {
            None
        } else {
            Some(inner.error.clone())
        }
    }

    fn require_active(&self) -> Result<String, UploadError> {
        let inner = self.inner.read().unwrap();
        match (&inner.state, &inner.upload_id) {
            (SessionState::Active, Some(id)) => Ok(id.clone()),
            _ => Err(UploadError::NotInitiated),
        }
    }

    /// Records a server acknowledgement and notifies observers.
    ///
    /// The set mutation and the progress snapshot happen under one
    /// write lock; callbacks run after it is released.
    fn record_ack(&self, index: u32) {
        let progress = {
            let mut inner = self.inner.write().unwrap();
            inner.acknowledged.insert(index);
            let total = inner.plan.map(|p| p.total_chunks()).unwrap_or(0);
            SessionProgress::new(inner.acknowledged.len() as u32, total)
        };
        debug!(
            chunk = index,
            percent = progress.percentage,
            "chunk acknowledged"
        );
        self.observer.on_chunk_uploaded(index, progress);
        self.observer.on_progress(progress);
    }
}
