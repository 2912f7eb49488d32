//! # Queue Consumer
//!
//! Defines the consuming side of the bus and the per-queue state shared with
//! the publisher.

use crate::amqp::AmqpConsumer;
use crate::message::{Delivery, MessageProperties, QueueOptions};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::Notify;
use tracing::debug;

/// Errors from bus operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    /// The queue was never declared.
    #[error("Queue not found: {0}")]
    QueueNotFound(String),

    /// The queue exists with different arguments.
    #[error("Queue {queue} already declared with different options")]
    QueueOptionsMismatch { queue: String },

    /// The queue is at capacity.
    #[error("Queue {queue} is full ({capacity} messages)")]
    QueueFull { queue: String, capacity: usize },

    /// The bus was closed.
    #[error("Message bus closed")]
    Closed,

    /// `ack`/`nack` for a tag this consumer does not hold.
    #[error("Unknown delivery tag: {0}")]
    UnknownDeliveryTag(u64),

    /// The broker connection or channel failed.
    #[error("Broker error: {0}")]
    Broker(String),
}

/// Trait for declaring and consuming queues.
#[async_trait]
pub trait MessageSubscriber: Send + Sync {
    /// Declare a queue. Idempotent for identical options.
    async fn declare_queue(&self, name: &str, options: QueueOptions) -> Result<(), BusError>;

    /// Start consuming a declared queue.
    async fn consume(&self, queue: &str) -> Result<Consumer, BusError>;
}

/// A message waiting in, or borrowed from, a queue.
#[derive(Debug, Clone)]
pub(crate) struct QueuedMessage {
    pub(crate) body: Vec<u8>,
    pub(crate) properties: MessageProperties,
    pub(crate) enqueued_at: Instant,
    pub(crate) redelivered: bool,
}

enum Pop {
    Message(QueuedMessage),
    Empty,
    Closed,
}

#[derive(Default)]
struct QueueInner {
    ready: VecDeque<QueuedMessage>,
    closed: bool,
    expired: u64,
    consumers: usize,
}

/// State of one named queue.
pub(crate) struct QueueState {
    name: String,
    options: QueueOptions,
    capacity: usize,
    inner: Mutex<QueueInner>,
    notify: Notify,
}

impl QueueState {
    pub(crate) fn new(name: &str, options: QueueOptions, capacity: usize) -> Self {
        Self {
            name: name.to_string(),
            options,
            capacity,
            inner: Mutex::new(QueueInner::default()),
            notify: Notify::new(),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn options(&self) -> QueueOptions {
        self.options
    }

    /// Append a message; returns the new depth.
    pub(crate) fn push(&self, message: QueuedMessage) -> Result<usize, BusError> {
        let depth = {
            let mut inner = self.inner.lock();
            if inner.closed {
                return Err(BusError::Closed);
            }
            if inner.ready.len() >= self.capacity {
                return Err(BusError::QueueFull {
                    queue: self.name.clone(),
                    capacity: self.capacity,
                });
            }
            inner.ready.push_back(message);
            inner.ready.len()
        };
        self.notify.notify_waiters();
        Ok(depth)
    }

    fn requeue_front(&self, messages: Vec<QueuedMessage>) {
        if messages.is_empty() {
            return;
        }
        {
            let mut inner = self.inner.lock();
            for mut message in messages.into_iter().rev() {
                message.redelivered = true;
                inner.ready.push_front(message);
            }
        }
        self.notify.notify_waiters();
    }

    fn pop_live(&self) -> Pop {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Pop::Closed;
        }
        while let Some(message) = inner.ready.pop_front() {
            let expired = self
                .options
                .message_ttl
                .is_some_and(|ttl| message.enqueued_at.elapsed() > ttl);
            if !expired {
                return Pop::Message(message);
            }
            inner.expired += 1;
            debug!(queue = %self.name, "Discarded message past its TTL");
        }
        Pop::Empty
    }

    pub(crate) fn close(&self) {
        self.inner.lock().closed = true;
        self.notify.notify_waiters();
    }

    pub(crate) fn depth(&self) -> usize {
        self.inner.lock().ready.len()
    }

    pub(crate) fn expired(&self) -> u64 {
        self.inner.lock().expired
    }

    pub(crate) fn consumers(&self) -> usize {
        self.inner.lock().consumers
    }
}

/// A consumer handle on one queue.
///
/// Deliveries stay owned by the consumer until acknowledged. When dropped,
/// every unacknowledged delivery goes back to the queue, marked redelivered.
pub struct Consumer {
    source: Source,
}

enum Source {
    Memory(MemoryConsumer),
    Amqp(AmqpConsumer),
}

impl Consumer {
    pub(crate) fn new(queue: Arc<QueueState>) -> Self {
        Self {
            source: Source::Memory(MemoryConsumer::new(queue)),
        }
    }

    pub(crate) fn amqp(consumer: AmqpConsumer) -> Self {
        Self {
            source: Source::Amqp(consumer),
        }
    }

    /// Name of the consumed queue.
    #[must_use]
    pub fn queue(&self) -> &str {
        match &self.source {
            Source::Memory(c) => c.queue.name(),
            Source::Amqp(c) => c.queue(),
        }
    }

    /// Receive the next live message.
    ///
    /// # Returns
    ///
    /// - `Some(delivery)` - The next message, to be acknowledged later
    /// - `None` - The bus was closed
    pub async fn recv(&mut self) -> Option<Delivery> {
        match &mut self.source {
            Source::Memory(c) => c.recv().await,
            Source::Amqp(c) => c.recv().await,
        }
    }

    /// Acknowledge a delivery; the message is gone for good.
    pub async fn ack(&mut self, delivery_tag: u64) -> Result<(), BusError> {
        match &mut self.source {
            Source::Memory(c) => c.ack(delivery_tag),
            Source::Amqp(c) => c.ack(delivery_tag).await,
        }
    }

    /// Reject a delivery, optionally putting it back at the head of the queue.
    pub async fn nack(&mut self, delivery_tag: u64, requeue: bool) -> Result<(), BusError> {
        match &mut self.source {
            Source::Memory(c) => c.nack(delivery_tag, requeue),
            Source::Amqp(c) => c.nack(delivery_tag, requeue).await,
        }
    }

    /// Deliveries received but not yet acknowledged.
    #[must_use]
    pub fn unacked_count(&self) -> usize {
        match &self.source {
            Source::Memory(c) => c.unacked.len(),
            Source::Amqp(c) => c.unacked_count(),
        }
    }
}

/// Consumer side of an in-process queue.
struct MemoryConsumer {
    queue: Arc<QueueState>,
    unacked: HashMap<u64, QueuedMessage>,
    next_tag: u64,
}

impl MemoryConsumer {
    fn new(queue: Arc<QueueState>) -> Self {
        queue.inner.lock().consumers += 1;
        debug!(queue = %queue.name(), "Consumer attached");
        Self {
            queue,
            unacked: HashMap::new(),
            next_tag: 0,
        }
    }

    async fn recv(&mut self) -> Option<Delivery> {
        let queue = Arc::clone(&self.queue);
        loop {
            let notified = queue.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            match queue.pop_live() {
                Pop::Message(message) => return Some(self.track(message)),
                Pop::Closed => return None,
                Pop::Empty => {}
            }

            notified.await;
        }
    }

    fn ack(&mut self, delivery_tag: u64) -> Result<(), BusError> {
        self.unacked
            .remove(&delivery_tag)
            .map(|_| ())
            .ok_or(BusError::UnknownDeliveryTag(delivery_tag))
    }

    fn nack(&mut self, delivery_tag: u64, requeue: bool) -> Result<(), BusError> {
        let message = self
            .unacked
            .remove(&delivery_tag)
            .ok_or(BusError::UnknownDeliveryTag(delivery_tag))?;
        if requeue {
            self.queue.requeue_front(vec![message]);
        }
        Ok(())
    }

    fn track(&mut self, message: QueuedMessage) -> Delivery {
        self.next_tag += 1;
        let delivery = Delivery {
            queue: self.queue.name().to_string(),
            delivery_tag: self.next_tag,
            body: message.body.clone(),
            properties: message.properties.clone(),
            redelivered: message.redelivered,
        };
        self.unacked.insert(self.next_tag, message);
        delivery
    }
}

impl Drop for MemoryConsumer {
    fn drop(&mut self) {
        let mut pending: Vec<(u64, QueuedMessage)> = self.unacked.drain().collect();
        pending.sort_by_key(|(tag, _)| *tag);
        let requeued = pending.len();
        self.queue
            .requeue_front(pending.into_iter().map(|(_, message)| message).collect());

        {
            let mut inner = self.queue.inner.lock();
            inner.consumers = inner.consumers.saturating_sub(1);
        }
        debug!(queue = %self.queue.name(), requeued, "Consumer dropped");
    }
}
