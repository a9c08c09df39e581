//! Post-upload processing-status polling.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use reelport_client::MovieApi;
use reelport_protocol::messages::MovieInfo;
use reelport_protocol::types::ProcessingState;

use crate::{DEFAULT_MONITOR_ATTEMPTS, DEFAULT_MONITOR_INTERVAL, UploadError};

/// Delay before re-polling after a transient query failure.
const TRANSIENT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Terminal result of a monitoring run.
#[derive(Debug, Clone)]
pub enum MonitorOutcome {
    /// Processing finished; full movie details attached.
    Ready(MovieInfo),
    /// The attempt budget ran out before processing finished.
    TimedOut {
        attempts: u32,
        /// Most recent state observed, if any poll succeeded.
        last_status: Option<ProcessingState>,
    },
}

/// Polls a movie's server-side processing status until it settles.
///
/// Each poll consumes one attempt whether it succeeds or fails, so a
/// flapping endpoint cannot extend the run beyond its budget. Transient
/// query errors are absorbed with a short fixed delay; a `FAILED`
/// status aborts immediately.
pub struct StatusMonitor {
    api: Arc<dyn MovieApi>,
    max_attempts: u32,
    interval: Duration,
    transient_delay: Duration,
}

impl StatusMonitor {
    pub fn new(api: Arc<dyn MovieApi>) -> Self {
        Self {
            api,
            max_attempts: DEFAULT_MONITOR_ATTEMPTS,
            interval: DEFAULT_MONITOR_INTERVAL,
            transient_delay: TRANSIENT_RETRY_DELAY,
        }
    }

    /// Overrides the poll attempt budget (clamped to at least 1).
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Overrides the delay between successful polls.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Polls until the movie is ready, fails, or attempts run out.
    pub async fn monitor(&self, movie_id: &str) -> Result<MonitorOutcome, UploadError> {
        self.monitor_with(movie_id, |_, _| {}).await
    }

    /// Like [`monitor`](Self::monitor), invoking `on_poll(status,
    /// attempt)` after every successful status query.
    pub async fn monitor_with(
        &self,
        movie_id: &str,
        mut on_poll: impl FnMut(ProcessingState, u32),
    ) -> Result<MonitorOutcome, UploadError> {
        let mut last_status = None;

        for attempt in 1..=self.max_attempts {
            match self.api.processing_status(movie_id).await {
                Ok(resp) => {
                    debug!(
                        movie_id = %movie_id,
                        attempt,
                        status = ?resp.status,
                        "processing status polled"
                    );
                    on_poll(resp.status, attempt);
                    last_status = Some(resp.status);

                    match resp.status {
                        ProcessingState::Ready => {
                            let info = self
                                .api
                                .movie_info(movie_id)
                                .await
                                .map_err(UploadError::StatusQuery)?;
                            info!(movie_id = %movie_id, attempt, "movie ready");
                            return Ok(MonitorOutcome::Ready(info));
                        }
                        ProcessingState::Failed => {
                            return Err(UploadError::ProcessingFailed(movie_id.to_string()));
                        }
                        ProcessingState::Pending | ProcessingState::Processing => {
                            if attempt < self.max_attempts {
                                tokio::time::sleep(self.interval).await;
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!(movie_id = %movie_id, attempt, error = %e, "status poll failed");
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.transient_delay).await;
                    }
                }
            }
        }

        warn!(
            movie_id = %movie_id,
            attempts = self.max_attempts,
            "processing monitor timed out"
        );
        Ok(MonitorOutcome::TimedOut {
            attempts: self.max_attempts,
            last_status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use reelport_client::{ApiFuture, Error as ClientError};
    use reelport_protocol::messages::{
        ChunkManifest, CompleteUploadResponse, InitiateUploadRequest, InitiateUploadResponse,
        ProcessingStatusResponse, UploadStatusResponse,
    };

    fn api_error() -> ClientError {
        ClientError::Api {
            status: 503,
            body: "unavailable".into(),
        }
    }

    /// Transport that only scripts the status-polling endpoints.
    #[derive(Default)]
    struct PollingApi {
        statuses: Mutex<VecDeque<Result<ProcessingState, ClientError>>>,
        polls: AtomicU32,
        info_calls: AtomicU32,
    }

    impl PollingApi {
        fn push(&self, state: ProcessingState) {
            self.statuses.lock().unwrap().push_back(Ok(state));
        }

        fn push_error(&self) {
            self.statuses.lock().unwrap().push_back(Err(api_error()));
        }
    }

    impl MovieApi for PollingApi {
        fn initiate(&self, _req: InitiateUploadRequest) -> ApiFuture<'_, InitiateUploadResponse> {
            Box::pin(async { Err(api_error()) })
        }

        fn upload_chunk(&self, _manifest: ChunkManifest, _data: Vec<u8>) -> ApiFuture<'_, ()> {
            Box::pin(async { Err(api_error()) })
        }

        fn upload_status(&self, _upload_id: &str) -> ApiFuture<'_, UploadStatusResponse> {
            Box::pin(async { Err(api_error()) })
        }

        fn complete_upload(&self, _upload_id: &str) -> ApiFuture<'_, CompleteUploadResponse> {
            Box::pin(async { Err(api_error()) })
        }

        fn cancel_upload(&self, _upload_id: &str) -> ApiFuture<'_, ()> {
            Box::pin(async { Err(api_error()) })
        }

        fn processing_status(&self, movie_id: &str) -> ApiFuture<'_, ProcessingStatusResponse> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            let movie_id = movie_id.to_string();
            Box::pin(async move {
                let next = self
                    .statuses
                    .lock()
                    .unwrap()
                    .pop_front()
                    .unwrap_or(Ok(ProcessingState::Processing));
                next.map(|status| ProcessingStatusResponse {
                    movie_id,
                    status,
                    qualities: None,
                })
            })
        }

        fn movie_info(&self, movie_id: &str) -> ApiFuture<'_, MovieInfo> {
            self.info_calls.fetch_add(1, Ordering::SeqCst);
            let movie_id = movie_id.to_string();
            Box::pin(async move {
                Ok(MovieInfo {
                    movie_id,
                    title: "Test".into(),
                    description: String::new(),
                    status: ProcessingState::Ready,
                    qualities: Some(HashMap::from([(
                        "720p".into(),
                        "/streams/m-1/720p.m3u8".into(),
                    )])),
                })
            })
        }
    }

    fn monitor_over(api: &Arc<PollingApi>, attempts: u32) -> StatusMonitor {
        StatusMonitor::new(Arc::clone(api) as Arc<dyn MovieApi>)
            .with_max_attempts(attempts)
            .with_interval(Duration::from_secs(10))
    }

    #[tokio::test(start_paused = true)]
    async fn ready_resolves_with_movie_info() {
        let api = Arc::new(PollingApi::default());
        api.push(ProcessingState::Pending);
        api.push(ProcessingState::Processing);
        api.push(ProcessingState::Ready);
        let monitor = monitor_over(&api, 10);

        let outcome = monitor.monitor("m-1").await.unwrap();
        match outcome {
            MonitorOutcome::Ready(info) => {
                assert_eq!(info.movie_id, "m-1");
                assert!(info.qualities.unwrap().contains_key("720p"));
            }
            other => panic!("expected Ready, got {other:?}"),
        }
        assert_eq!(api.polls.load(Ordering::SeqCst), 3);
        assert_eq!(api.info_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_attempts_time_out() {
        let api = Arc::new(PollingApi::default());
        for _ in 0..3 {
            api.push(ProcessingState::Processing);
        }
        let monitor = monitor_over(&api, 3);

        let outcome = monitor.monitor("m-1").await.unwrap();
        assert!(matches!(
            outcome,
            MonitorOutcome::TimedOut {
                attempts: 3,
                last_status: Some(ProcessingState::Processing),
            }
        ));
        assert_eq!(api.polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_status_aborts_immediately() {
        let api = Arc::new(PollingApi::default());
        api.push(ProcessingState::Processing);
        api.push(ProcessingState::Failed);
        let monitor = monitor_over(&api, 5);

        let err = monitor.monitor("m-9").await.unwrap_err();
        assert!(matches!(err, UploadError::ProcessingFailed(id) if id == "m-9"));
        // No further polls after the failure.
        assert_eq!(api.polls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_consume_attempts() {
        let api = Arc::new(PollingApi::default());
        api.push_error();
        api.push_error();
        api.push(ProcessingState::Ready);
        let monitor = monitor_over(&api, 5);

        let outcome = monitor.monitor("m-1").await.unwrap();
        assert!(matches!(outcome, MonitorOutcome::Ready(_)));
        assert_eq!(api.polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn only_transient_errors_still_time_out() {
        let api = Arc::new(PollingApi::default());
        for _ in 0..4 {
            api.push_error();
        }
        let monitor = monitor_over(&api, 4);

        let outcome = monitor.monitor("m-1").await.unwrap();
        assert!(matches!(
            outcome,
            MonitorOutcome::TimedOut {
                attempts: 4,
                last_status: None,
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn poll_callback_sees_status_and_attempt() {
        let api = Arc::new(PollingApi::default());
        api.push(ProcessingState::Pending);
        api.push_error();
        api.push(ProcessingState::Ready);
        let monitor = monitor_over(&api, 5);

        let mut observed = Vec::new();
        monitor
            .monitor_with("m-1", |status, attempt| observed.push((status, attempt)))
            .await
            .unwrap();

        // The failed poll consumed attempt 2 without a callback.
        assert_eq!(
            observed,
            vec![
                (ProcessingState::Pending, 1),
                (ProcessingState::Ready, 3),
            ]
        );
    }
}
