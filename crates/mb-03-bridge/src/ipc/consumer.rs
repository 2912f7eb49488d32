//! # Queue Consumer Loop
//!
//! One consumer per inbound queue. Each delivery is decoded, dispatched, and
//! acknowledged after its reply has been published (or deliberately dropped).
//!
//! ```text
//! IDLE ──recv──► RECEIVING ──decoded──► PROCESSING ──reply──► ACKED ──► IDLE
//!                    │
//!                    └─ decode failure ──► (courtesy reply) ──► ACKED
//! ```
//!
//! If the consumer stops before acking, the bus requeues the delivery and a
//! later consumer sees it again with `redelivered` set.

use crate::dispatcher::{DispatchOutcome, RequestDispatcher};
use crate::domain::config::QueueBinding;
use crate::domain::envelope::{DecodeError, RequestEnvelope, ResponseEnvelope};
use shared_bus::{BusError, Consumer, Delivery, MessageSubscriber};
use serde_json::Value;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, instrument, trace, warn};

/// Where a consumer is in its per-message cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Idle,
    Receiving,
    Processing,
    Acked,
}

/// Per-queue counters
#[derive(Debug, Default)]
pub struct ConsumerStats {
    pub received: AtomicU64,
    pub replied: AtomicU64,
    pub unroutable: AtomicU64,
    pub decode_failures: AtomicU64,
    pub redelivered: AtomicU64,
}

pub struct QueueConsumer {
    binding: QueueBinding,
    consumer: Consumer,
    dispatcher: Arc<RequestDispatcher>,
    stats: Arc<ConsumerStats>,
    state: watch::Sender<ConsumerState>,
}

impl QueueConsumer {
    /// Declare the binding's queue and attach a consumer to it.
    pub async fn start<B: MessageSubscriber + ?Sized>(
        bus: &B,
        binding: QueueBinding,
        dispatcher: Arc<RequestDispatcher>,
    ) -> Result<Self, BusError> {
        bus.declare_queue(&binding.name, binding.options()).await?;
        let consumer = bus.consume(&binding.name).await?;
        let (state, _) = watch::channel(ConsumerState::Idle);

        Ok(Self {
            binding,
            consumer,
            dispatcher,
            stats: Arc::new(ConsumerStats::default()),
            state,
        })
    }

    pub fn queue(&self) -> &str {
        &self.binding.name
    }

    pub fn stats(&self) -> Arc<ConsumerStats> {
        Arc::clone(&self.stats)
    }

    /// Observe state transitions.
    pub fn state(&self) -> watch::Receiver<ConsumerState> {
        self.state.subscribe()
    }

    /// Consume until the bus closes the queue.
    pub async fn run(self) {
        self.run_until(std::future::pending()).await
    }

    /// Consume until the bus closes the queue or `shutdown` resolves.
    ///
    /// `shutdown` only interrupts the wait for the next delivery. A delivery
    /// already received is dispatched, answered, and acked before returning.
    #[instrument(skip(self, shutdown), fields(queue = %self.binding.name))]
    pub async fn run_until(mut self, shutdown: impl Future<Output = ()>) {
        info!("Queue consumer started");
        tokio::pin!(shutdown);

        loop {
            let delivery = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown requested, consumer stopped");
                    return;
                }
                delivery = self.consumer.recv() => delivery,
            };
            let Some(delivery) = delivery else {
                break;
            };

            self.transition(ConsumerState::Receiving);
            self.stats.received.fetch_add(1, Ordering::Relaxed);
            if delivery.redelivered {
                self.stats.redelivered.fetch_add(1, Ordering::Relaxed);
                info!(delivery_tag = delivery.delivery_tag, "Processing redelivered message");
            }

            self.handle(&delivery).await;

            if let Err(e) = self.consumer.ack(delivery.delivery_tag).await {
                warn!(delivery_tag = delivery.delivery_tag, error = %e, "Ack failed");
            }
            self.transition(ConsumerState::Acked);
            self.transition(ConsumerState::Idle);
        }

        info!("Queue closed, consumer stopped");
    }

    async fn handle(&self, delivery: &Delivery) {
        let envelope =
            match RequestEnvelope::from_bus(&delivery.body, &delivery.properties, &self.binding) {
                Ok(envelope) => envelope,
                Err(e) => {
                    self.reject(delivery, e).await;
                    return;
                }
            };

        self.transition(ConsumerState::Processing);
        match self.dispatcher.dispatch(envelope).await {
            DispatchOutcome::Replied { response, .. } => {
                self.stats.replied.fetch_add(1, Ordering::Relaxed);
                debug!(status = %response.status_code, "Request handled");
            }
            DispatchOutcome::Unroutable => {
                self.stats.unroutable.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Decode failure: log, answer if the sender can be answered, then ack.
    async fn reject(&self, delivery: &Delivery, error: DecodeError) {
        self.stats.decode_failures.fetch_add(1, Ordering::Relaxed);
        warn!(
            delivery_tag = delivery.delivery_tag,
            error = %error,
            "Undecodable request"
        );

        let Some(route) = error.reply else {
            return;
        };
        let echo = serde_json::from_slice::<Value>(&delivery.body)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&delivery.body).into_owned()));
        let response = ResponseEnvelope::failure(
            route.correlation_id.clone(),
            error.reason.status(),
            error.reason.to_string(),
            echo,
            None,
        );
        if self.dispatcher.reject(&route, &response).await {
            self.stats.replied.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn transition(&self, next: ConsumerState) {
        trace!(state = ?next, "Consumer state");
        self.state.send_replace(next);
    }
}
