//! # Correlating Client
//!
//! Request side of the request/reply pattern: publishes a request carrying a
//! fresh correlation id and a private reply queue, then waits for the reply
//! with the same id.
//!
//! ```text
//! BridgeClient::request ──register──► PendingRequestStore
//!        │                                   ▲
//!        └──publish(queue)──► bridge ──reply─┤
//!                                 ResponseListener::complete
//! ```

use crate::domain::config::ClientConfig;
use crate::domain::correlation::CorrelationId;
use crate::domain::envelope::ResponseEnvelope;
use crate::domain::pending::{cleanup_task, PendingRequestStore};
use serde::Serialize;
use shared_bus::{BusError, Consumer, MessageBus, MessageProperties, OutboundMessage, QueueOptions};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("bus error: {0}")]
    Bus(#[from] BusError),

    #[error("request could not be serialized: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("no reply within {0:?}")]
    Timeout(Duration),

    #[error("reply channel closed")]
    Dropped,
}

/// Consumes the private reply queue and completes pending requests.
pub struct ResponseListener {
    consumer: Consumer,
    pending: Arc<PendingRequestStore>,
}

impl ResponseListener {
    pub fn new(consumer: Consumer, pending: Arc<PendingRequestStore>) -> Self {
        Self { consumer, pending }
    }

    pub async fn run(mut self) {
        while let Some(delivery) = self.consumer.recv().await {
            match delivery.json::<ResponseEnvelope>() {
                Ok(response) => {
                    let correlation_id = delivery
                        .properties
                        .correlation_id
                        .as_deref()
                        .and_then(CorrelationId::parse)
                        .unwrap_or_else(|| response.correlation_id.clone());
                    self.pending.complete(&correlation_id, response);
                }
                Err(e) => {
                    warn!(queue = self.consumer.queue(), error = %e, "Unreadable reply dropped");
                }
            }
            if let Err(e) = self.consumer.ack(delivery.delivery_tag).await {
                warn!(error = %e, "Reply ack failed");
            }
        }
        debug!("Reply queue closed, listener stopped");
    }
}

pub struct BridgeClient {
    bus: Arc<dyn MessageBus>,
    reply_queue: String,
    pending: Arc<PendingRequestStore>,
    tasks: Vec<JoinHandle<()>>,
}

impl BridgeClient {
    /// Declare a private reply queue and start listening on it.
    pub async fn connect(bus: Arc<dyn MessageBus>, config: &ClientConfig) -> Result<Self, ClientError> {
        let reply_queue = format!("{}.{}", config.reply_queue_prefix, CorrelationId::generate());
        bus.declare_queue(&reply_queue, QueueOptions::transient()).await?;
        let consumer = bus.consume(&reply_queue).await?;

        let pending = Arc::new(PendingRequestStore::new(config.default_timeout()));
        let listener = ResponseListener::new(consumer, Arc::clone(&pending));
        let tasks = vec![
            tokio::spawn(listener.run()),
            tokio::spawn(cleanup_task(Arc::clone(&pending), config.cleanup_interval())),
        ];

        debug!(reply_queue = %reply_queue, "Bridge client connected");
        Ok(Self {
            bus,
            reply_queue,
            pending,
            tasks,
        })
    }

    pub fn reply_queue(&self) -> &str {
        &self.reply_queue
    }

    pub fn pending(&self) -> &PendingRequestStore {
        &self.pending
    }

    /// Send `body` to `queue` and wait for the reply.
    pub async fn request<T: Serialize>(&self, queue: &str, body: &T) -> Result<ResponseEnvelope, ClientError> {
        self.request_with_timeout(queue, body, self.pending.default_timeout())
            .await
    }

    pub async fn request_with_timeout<T: Serialize>(
        &self,
        queue: &str,
        body: &T,
        timeout: Duration,
    ) -> Result<ResponseEnvelope, ClientError> {
        let (correlation_id, rx) = self.pending.register(queue, Some(timeout));
        let message = match OutboundMessage::json(
            body,
            MessageProperties::request(&self.reply_queue, correlation_id.as_str()),
        ) {
            Ok(message) => message,
            Err(e) => {
                self.pending.cancel(&correlation_id);
                return Err(e.into());
            }
        };

        if let Err(e) = self.bus.publish(queue, message).await {
            self.pending.cancel(&correlation_id);
            return Err(e.into());
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(completed)) => Ok(completed.response),
            Ok(Err(_)) => Err(ClientError::Dropped),
            Err(_) => {
                self.pending.cancel(&correlation_id);
                Err(ClientError::Timeout(timeout))
            }
        }
    }
}

impl Drop for BridgeClient {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
