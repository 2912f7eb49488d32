//! # Message Publisher
//!
//! Defines the publishing side of the bus and the in-process implementation.

use crate::message::{OutboundMessage, QueueOptions};
use crate::subscriber::{BusError, Consumer, MessageSubscriber, QueuedMessage, QueueState};
use crate::DEFAULT_QUEUE_CAPACITY;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Trait for publishing messages to a named queue.
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    /// Publish a message to a declared queue.
    ///
    /// # Errors
    ///
    /// - `BusError::QueueNotFound` - nothing is listening under that name
    /// - `BusError::QueueFull` / `BusError::Closed`
    async fn publish(&self, queue: &str, message: OutboundMessage) -> Result<(), BusError>;

    /// Get the total number of messages accepted by the bus.
    fn messages_published(&self) -> u64;
}

/// A bus that can both publish and consume.
pub trait MessageBus: MessagePublisher + MessageSubscriber {}

impl<T: MessagePublisher + MessageSubscriber> MessageBus for T {}

/// In-memory implementation of the bus.
///
/// Suitable for a single process; a broker-backed deployment would supply
/// another `MessageBus` implementation with the same semantics.
pub struct InMemoryMessageBus {
    /// Declared queues by name.
    queues: RwLock<HashMap<String, Arc<QueueState>>>,

    /// Total messages accepted.
    messages_published: AtomicU64,

    /// Per-queue capacity.
    capacity: usize,

    /// Set once by `close()`.
    closed: AtomicBool,
}

impl InMemoryMessageBus {
    /// Create a new in-memory bus with default per-queue capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    /// Create a new in-memory bus with the given per-queue capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            queues: RwLock::new(HashMap::new()),
            messages_published: AtomicU64::new(0),
            capacity,
            closed: AtomicBool::new(false),
        }
    }

    /// Messages waiting in a queue (excluding unacknowledged deliveries).
    #[must_use]
    pub fn queue_depth(&self, queue: &str) -> Option<usize> {
        self.queues.read().get(queue).map(|q| q.depth())
    }

    /// Messages a queue discarded for exceeding its TTL.
    #[must_use]
    pub fn expired_count(&self, queue: &str) -> Option<u64> {
        self.queues.read().get(queue).map(|q| q.expired())
    }

    /// Consumers currently attached to a queue.
    #[must_use]
    pub fn consumer_count(&self, queue: &str) -> Option<usize> {
        self.queues.read().get(queue).map(|q| q.consumers())
    }

    /// Get the per-queue capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Close every queue. Pending `recv` calls return `None`, publishes fail.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        for queue in self.queues.read().values() {
            queue.close();
        }
        info!("Message bus closed");
    }

    fn lookup(&self, queue: &str) -> Result<Arc<QueueState>, BusError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BusError::Closed);
        }
        self.queues
            .read()
            .get(queue)
            .cloned()
            .ok_or_else(|| BusError::QueueNotFound(queue.to_string()))
    }
}

impl Default for InMemoryMessageBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessagePublisher for InMemoryMessageBus {
    async fn publish(&self, queue: &str, message: OutboundMessage) -> Result<(), BusError> {
        let state = match self.lookup(queue) {
            Ok(state) => state,
            Err(e) => {
                warn!(queue = queue, error = %e, "Message dropped");
                return Err(e);
            }
        };

        let depth = state.push(QueuedMessage {
            body: message.body,
            properties: message.properties,
            enqueued_at: Instant::now(),
            redelivered: false,
        })?;
        self.messages_published.fetch_add(1, Ordering::Relaxed);

        debug!(queue = queue, depth = depth, "Message published");
        Ok(())
    }

    fn messages_published(&self) -> u64 {
        self.messages_published.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl MessageSubscriber for InMemoryMessageBus {
    async fn declare_queue(&self, name: &str, options: QueueOptions) -> Result<(), BusError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BusError::Closed);
        }

        let mut queues = self.queues.write();
        if let Some(existing) = queues.get(name) {
            if existing.options() != options {
                return Err(BusError::QueueOptionsMismatch {
                    queue: name.to_string(),
                });
            }
            return Ok(());
        }

        queues.insert(
            name.to_string(),
            Arc::new(QueueState::new(name, options, self.capacity)),
        );
        debug!(
            queue = name,
            durable = options.durable,
            ttl_ms = options.message_ttl.map(|ttl| ttl.as_millis() as u64),
            "Queue declared"
        );
        Ok(())
    }

    async fn consume(&self, queue: &str) -> Result<Consumer, BusError> {
        Ok(Consumer::new(self.lookup(queue)?))
    }
}
