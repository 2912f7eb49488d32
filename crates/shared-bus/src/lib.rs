//! # Shared Bus - Queue Bus for Request/Reply Traffic
//!
//! Named work queues with bus-native reply metadata. A producer publishes a
//! message to a queue; exactly one consumer of that queue receives it and must
//! acknowledge it. Replies travel the same way: the requester names its own
//! queue in `reply_to` and tags the request with a `correlation_id`.
//!
//! ## Request/Reply Pattern
//!
//! ```text
//! ┌──────────────┐   publish(queue)    ┌──────────────┐   consume(queue)   ┌──────────────┐
//! │  Requester   │ ──────────────────→ │     Bus      │ ─────────────────→ │   Consumer   │
//! │              │                     │  (queues)    │                    │              │
//! │ reply queue  │ ←────────────────── │              │ ←───────────────── │ publish to   │
//! └──────────────┘   consume(reply_to) └──────────────┘   publish(reply_to)│ reply_to     │
//!                                                                          └──────────────┘
//! ```
//!
//! ## Delivery Semantics
//!
//! - **At-least-once:** a delivery stays unacknowledged until `Consumer::ack`;
//!   dropping the consumer requeues everything it still holds, marked redelivered
//! - **Message TTL:** a queue declared with a TTL discards messages that waited
//!   longer than the TTL before being delivered
//! - **No silent routing:** publishing to an undeclared queue is an error
//!
//! ## Backends
//!
//! `InMemoryMessageBus` keeps queues in process and backs the test suites.
//! `AmqpMessageBus` talks to a RabbitMQ broker with the same semantics.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod amqp;
pub mod message;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use amqp::AmqpMessageBus;
pub use message::{Delivery, MessageProperties, OutboundMessage, QueueOptions};
pub use publisher::{InMemoryMessageBus, MessageBus, MessagePublisher};
pub use subscriber::{BusError, Consumer, MessageSubscriber};

/// Content type stamped on JSON messages.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Maximum messages a single queue holds before publishes are rejected.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;
