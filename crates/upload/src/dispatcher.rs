//! Bounded-concurrency chunk dispatch.

use std::future::Future;

use futures_util::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::UploadError;
use crate::retry::RetryPolicy;

/// Drives per-chunk upload operations in sequential batches.
///
/// Chunk indices are grouped into batches of the concurrency limit and
/// dispatched in ascending batch order. The batch boundary is a
/// barrier: every member must settle (success, or failure after the
/// retry policy is exhausted) before the next batch starts, which
/// bounds both in-flight memory and concurrent connections.
pub struct ChunkDispatcher {
    concurrency: usize,
    retry: RetryPolicy,
}

impl ChunkDispatcher {
    /// Creates a dispatcher with the given concurrency limit
    /// (clamped to at least 1) and retry policy.
    pub fn new(concurrency: usize, retry: RetryPolicy) -> Self {
        Self {
            concurrency: concurrency.max(1),
            retry,
        }
    }

    /// Uploads every chunk index in `[0, total_chunks)`.
    ///
    /// `upload` performs one attempt for one chunk; it is retried per
    /// the policy, with `on_retry(index, attempt, error)` invoked
    /// before each backoff wait. If any chunk fails after exhausting
    /// its retries the whole dispatch aborts with that chunk's error;
    /// chunks that already succeeded are not rolled back and later
    /// batches are never started.
    pub async fn dispatch<F, Fut>(
        &self,
        total_chunks: u32,
        cancel: &CancellationToken,
        upload: F,
        on_retry: impl Fn(u32, u32, &UploadError) + Sync,
    ) -> Result<(), UploadError>
    where
        F: Fn(u32) -> Fut + Sync,
        Fut: Future<Output = Result<(), UploadError>>,
    {
        let indices: Vec<u32> = (0..total_chunks).collect();

        for batch in indices.chunks(self.concurrency) {
            if cancel.is_cancelled() {
                debug!("chunk dispatch cancelled between batches");
                return Err(UploadError::Cancelled);
            }

            let attempts = batch.iter().map(|&index| {
                let upload = &upload;
                let on_retry = &on_retry;
                async move {
                    self.retry
                        .execute(
                            cancel,
                            || upload(index),
                            |attempt, err| on_retry(index, attempt, err),
                        )
                        .await
                }
            });

            // Barrier: every member settles before results are inspected.
            for result in join_all(attempts).await {
                if let Err(e) = result {
                    warn!(error = %e, "aborting upload after exhausted chunk retries");
                    return Err(e);
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn policy(retries: u32) -> RetryPolicy {
        RetryPolicy::new(retries, Duration::from_millis(10))
    }

    #[tokio::test]
    async fn uploads_every_index_once() {
        let dispatcher = ChunkDispatcher::new(3, policy(0));
        let seen = Mutex::new(Vec::new());

        dispatcher
            .dispatch(
                7,
                &CancellationToken::new(),
                |index| {
                    seen.lock().unwrap().push(index);
                    async { Ok(()) }
                },
                |_, _, _| {},
            )
            .await
            .unwrap();

        let mut indices = seen.lock().unwrap().clone();
        indices.sort_unstable();
        assert_eq!(indices, (0..7).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn zero_chunks_is_a_noop() {
        let dispatcher = ChunkDispatcher::new(3, policy(0));
        dispatcher
            .dispatch(
                0,
                &CancellationToken::new(),
                |_| async { Ok(()) },
                |_, _, _| {},
            )
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn concurrency_bound_is_respected() {
        let dispatcher = ChunkDispatcher::new(3, policy(0));
        let in_flight = AtomicU32::new(0);
        let max_in_flight = AtomicU32::new(0);

        dispatcher
            .dispatch(
                10,
                &CancellationToken::new(),
                |_| {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    max_in_flight.fetch_max(now, Ordering::SeqCst);
                    async {
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                        Ok(())
                    }
                },
                |_, _, _| {},
            )
            .await
            .unwrap();

        assert!(max_in_flight.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn batches_run_in_ascending_order() {
        let dispatcher = ChunkDispatcher::new(2, policy(0));
        let seen = Mutex::new(Vec::new());

        dispatcher
            .dispatch(
                6,
                &CancellationToken::new(),
                |index| {
                    seen.lock().unwrap().push(index);
                    async { Ok(()) }
                },
                |_, _, _| {},
            )
            .await
            .unwrap();

        // Members of batch N are all dispatched before any of batch N+1.
        let indices = seen.lock().unwrap().clone();
        for (pos, &index) in indices.iter().enumerate() {
            assert_eq!(index as usize / 2, pos / 2, "index {index} out of batch");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_chunk_aborts_later_batches() {
        let dispatcher = ChunkDispatcher::new(3, policy(1));
        let dispatched = Mutex::new(Vec::new());

        let err = dispatcher
            .dispatch(
                9,
                &CancellationToken::new(),
                |index| {
                    dispatched.lock().unwrap().push(index);
                    async move {
                        if index == 1 {
                            Err(UploadError::ChunkUpload {
                                index,
                                message: "boom".into(),
                            })
                        } else {
                            Ok(())
                        }
                    }
                },
                |_, _, _| {},
            )
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::ChunkUpload { index: 1, .. }));

        // First batch only: indices 0..3, with chunk 1 attempted twice.
        let dispatched = dispatched.lock().unwrap();
        assert!(dispatched.iter().all(|&i| i < 3));
        assert_eq!(dispatched.iter().filter(|&&i| i == 1).count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_hook_reports_chunk_and_attempt() {
        let dispatcher = ChunkDispatcher::new(3, policy(2));
        let failures_left = AtomicU32::new(2);
        let retries = Mutex::new(Vec::new());

        dispatcher
            .dispatch(
                1,
                &CancellationToken::new(),
                |index| {
                    let fail = failures_left
                        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                            Some(n.saturating_sub(1))
                        })
                        .unwrap()
                        > 0;
                    async move {
                        if fail {
                            Err(UploadError::ChunkUpload {
                                index,
                                message: "transient".into(),
                            })
                        } else {
                            Ok(())
                        }
                    }
                },
                |index, attempt, _| {
                    retries.lock().unwrap().push((index, attempt));
                },
            )
            .await
            .unwrap();

        assert_eq!(*retries.lock().unwrap(), vec![(0, 1), (0, 2)]);
    }

    #[tokio::test]
    async fn cancellation_stops_before_next_batch() {
        let dispatcher = ChunkDispatcher::new(2, policy(0));
        let cancel = CancellationToken::new();
        let dispatched = AtomicU32::new(0);

        let cancel_ref = &cancel;
        let err = dispatcher
            .dispatch(
                6,
                &cancel,
                |_| {
                    dispatched.fetch_add(1, Ordering::SeqCst);
                    // Cancel mid-first-batch; takes effect at the next barrier.
                    cancel_ref.cancel();
                    async { Ok(()) }
                },
                |_, _, _| {},
            )
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::Cancelled));
        assert_eq!(dispatched.load(Ordering::SeqCst), 2);
    }
}
