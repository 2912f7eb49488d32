//! Pending Request Store for the correlating client.
//!
//! Maps correlation IDs to callers waiting on the private reply queue.

use crate::domain::correlation::CorrelationId;
use crate::domain::envelope::ResponseEnvelope;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// A reply delivered to its waiting caller
#[derive(Debug)]
pub struct CompletedRequest {
    pub correlation_id: CorrelationId,
    pub response: ResponseEnvelope,
    /// Time between register and complete
    pub response_time: Duration,
}

/// A pending request waiting for its reply
struct PendingRequest {
    sender: oneshot::Sender<CompletedRequest>,
    created_at: Instant,
    /// Destination queue (for logging)
    queue: String,
    timeout: Duration,
}

/// Statistics for pending request store
#[derive(Debug, Default)]
pub struct PendingStats {
    pub total_registered: AtomicU64,
    pub total_completed: AtomicU64,
    pub total_timeouts: AtomicU64,
    /// Cancelled by the caller or receiver dropped
    pub total_cancelled: AtomicU64,
    /// Replies that matched no pending request
    pub total_unmatched: AtomicU64,
}

/// Pending request store.
///
/// Flow:
/// 1. Client calls `register()` and gets a fresh CorrelationId plus a receiver
/// 2. Client publishes the request with that id and its reply queue
/// 3. Response listener receives the reply and calls `complete()`
/// 4. Client awaits the receiver or times out
pub struct PendingRequestStore {
    pending: DashMap<CorrelationId, PendingRequest>,
    default_timeout: Duration,
    stats: Arc<PendingStats>,
}

impl PendingRequestStore {
    pub fn new(default_timeout: Duration) -> Self {
        Self {
            pending: DashMap::new(),
            default_timeout,
            stats: Arc::new(PendingStats::default()),
        }
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Register a pending request and get a receiver for its reply.
    pub fn register(
        &self,
        queue: &str,
        timeout: Option<Duration>,
    ) -> (CorrelationId, oneshot::Receiver<CompletedRequest>) {
        let correlation_id = CorrelationId::generate();
        let (tx, rx) = oneshot::channel();

        let request = PendingRequest {
            sender: tx,
            created_at: Instant::now(),
            queue: queue.to_string(),
            timeout: timeout.unwrap_or(self.default_timeout),
        };

        self.pending.insert(correlation_id.clone(), request);
        self.stats.total_registered.fetch_add(1, Ordering::Relaxed);

        debug!(
            correlation_id = %correlation_id,
            queue = queue,
            "Registered pending request"
        );

        (correlation_id, rx)
    }

    /// Hand a reply to its waiting caller.
    ///
    /// Returns false for unknown or already completed ids.
    pub fn complete(&self, correlation_id: &CorrelationId, response: ResponseEnvelope) -> bool {
        let Some((correlation_id, pending)) = self.pending.remove(correlation_id) else {
            self.stats.total_unmatched.fetch_add(1, Ordering::Relaxed);
            warn!(
                correlation_id = %correlation_id,
                "Reply for unknown or expired correlation ID"
            );
            return false;
        };

        let response_time = pending.created_at.elapsed();
        let completed = CompletedRequest {
            correlation_id: correlation_id.clone(),
            response,
            response_time,
        };

        match pending.sender.send(completed) {
            Ok(()) => {
                self.stats.total_completed.fetch_add(1, Ordering::Relaxed);
                debug!(
                    correlation_id = %correlation_id,
                    queue = pending.queue,
                    response_time_ms = response_time.as_millis(),
                    "Completed pending request"
                );
                true
            }
            Err(_) => {
                self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
                debug!(
                    correlation_id = %correlation_id,
                    queue = pending.queue,
                    "Pending request receiver dropped"
                );
                false
            }
        }
    }

    /// Remove expired requests. Returns the number removed.
    pub fn remove_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;

        self.pending.retain(|id, request| {
            let elapsed = now.duration_since(request.created_at);
            if elapsed > request.timeout {
                warn!(
                    correlation_id = %id,
                    queue = request.queue,
                    elapsed_ms = elapsed.as_millis(),
                    timeout_ms = request.timeout.as_millis(),
                    "Removing expired pending request"
                );
                self.stats.total_timeouts.fetch_add(1, Ordering::Relaxed);
                removed += 1;
                false
            } else {
                true
            }
        });

        removed
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn stats(&self) -> &PendingStats {
        &self.stats
    }

    pub fn is_pending(&self, correlation_id: &CorrelationId) -> bool {
        self.pending.contains_key(correlation_id)
    }

    pub fn cancel(&self, correlation_id: &CorrelationId) -> bool {
        if self.pending.remove(correlation_id).is_some() {
            self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }
}

/// Background task to clean up expired requests
pub async fn cleanup_task(store: Arc<PendingRequestStore>, interval: Duration) {
    let mut cleanup_interval = tokio::time::interval(interval);
    cleanup_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        cleanup_interval.tick().await;
        let removed = store.remove_expired();
        if removed > 0 {
            debug!(removed = removed, "Cleaned up expired pending requests");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::envelope::RequestKind;
    use serde_json::json;

    fn reply(id: &CorrelationId) -> ResponseEnvelope {
        ResponseEnvelope::success(id.clone(), RequestKind::Delete, Some("u1".into()), "Record deleted", json!({}))
    }

    #[tokio::test]
    async fn test_register_and_complete() {
        let store = PendingRequestStore::new(Duration::from_secs(30));

        let (correlation_id, rx) = store.register("user-crud-request", None);
        assert!(store.is_pending(&correlation_id));

        assert!(store.complete(&correlation_id, reply(&correlation_id)));

        let completed = rx.await.unwrap();
        assert_eq!(completed.correlation_id, correlation_id);
        assert_eq!(completed.response.correlation_id, correlation_id);
        assert_eq!(store.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_complete_unknown_id_is_dropped() {
        let store = PendingRequestStore::new(Duration::from_secs(30));
        let stranger = CorrelationId::generate();

        assert!(!store.complete(&stranger, reply(&stranger)));
        assert_eq!(store.stats().total_unmatched.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_second_reply_for_same_id_is_dropped() {
        let store = PendingRequestStore::new(Duration::from_secs(30));
        let (id, _rx) = store.register("match-request", None);

        assert!(store.complete(&id, reply(&id)));
        assert!(!store.complete(&id, reply(&id)));
    }

    #[tokio::test]
    async fn test_remove_expired() {
        let store = PendingRequestStore::new(Duration::from_millis(10));

        let (id1, _rx1) = store.register("match-request", None);
        let (id2, _rx2) = store.register("match-request", Some(Duration::from_secs(60)));

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(store.remove_expired(), 1);
        assert!(!store.is_pending(&id1));
        assert!(store.is_pending(&id2));
    }

    #[tokio::test]
    async fn test_cancel_and_stats() {
        let store = PendingRequestStore::new(Duration::from_secs(30));

        let (id1, _rx1) = store.register("classify-request", None);
        let (id2, _rx2) = store.register("classify-request", None);
        assert_eq!(store.stats().total_registered.load(Ordering::Relaxed), 2);

        store.complete(&id1, reply(&id1));
        assert!(store.cancel(&id2));
        assert!(!store.cancel(&id2));

        assert_eq!(store.stats().total_completed.load(Ordering::Relaxed), 1);
        assert_eq!(store.stats().total_cancelled.load(Ordering::Relaxed), 1);
    }
}
