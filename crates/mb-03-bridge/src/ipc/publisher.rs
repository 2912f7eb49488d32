//! Reply publisher.
//!
//! Publishes one `ResponseEnvelope` to the requester's reply queue with the
//! correlation id in the message properties. Best effort: a failed publish is
//! logged and counted, never retried, and never propagated.

use crate::domain::correlation::CorrelationId;
use crate::domain::envelope::ResponseEnvelope;
use shared_bus::{MessageBus, MessageProperties, OutboundMessage};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Publish counters
#[derive(Debug, Default)]
pub struct PublishStats {
    pub published: AtomicU64,
    pub failed: AtomicU64,
}

#[derive(Clone)]
pub struct ReplyPublisher {
    bus: Arc<dyn MessageBus>,
    stats: Arc<PublishStats>,
}

impl ReplyPublisher {
    pub fn new(bus: Arc<dyn MessageBus>) -> Self {
        Self {
            bus,
            stats: Arc::new(PublishStats::default()),
        }
    }

    /// Returns whether the bus accepted the reply.
    pub async fn publish(
        &self,
        destination: &str,
        correlation_id: &CorrelationId,
        response: &ResponseEnvelope,
    ) -> bool {
        let message =
            match OutboundMessage::json(response, MessageProperties::reply(correlation_id.as_str())) {
                Ok(message) => message,
                Err(e) => {
                    self.stats.failed.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        correlation_id = %correlation_id,
                        error = %e,
                        "Reply could not be serialized"
                    );
                    return false;
                }
            };

        match self.bus.publish(destination, message).await {
            Ok(()) => {
                self.stats.published.fetch_add(1, Ordering::Relaxed);
                debug!(
                    correlation_id = %correlation_id,
                    destination = destination,
                    status = %response.status_code,
                    "Reply published"
                );
                true
            }
            Err(e) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                warn!(
                    correlation_id = %correlation_id,
                    destination = destination,
                    error = %e,
                    "PublishFailure: reply dropped"
                );
                false
            }
        }
    }

    pub fn stats(&self) -> &PublishStats {
        &self.stats
    }
}
