//! MB-03 Bridge - queue-mediated request/reply front end for the record store
//! and the external scorer.
//!
//! # Architecture
//!
//! ```text
//!   user-crud-request   match-request   classify-request        HTTP :8080
//!          │                  │                 │                    │
//!   ┌──────┴──────┐   ┌───────┴─────┐   ┌───────┴──────┐     ┌───────┴──────┐
//!   │QueueConsumer│   │QueueConsumer│   │QueueConsumer │     │    Router    │
//!   └──────┬──────┘   └───────┬─────┘   └───────┬──────┘     └───────┬──────┘
//!          └──────────────────┴─────────┬───────┴────────────────────┘
//!                                       ▼
//!                              ┌─────────────────┐
//!                              │RequestDispatcher│
//!                              └───┬────┬────┬───┘
//!                  RecordStoreApi ◄┘    │    └► Classifier
//!                                       ▼
//!                                    Scorer
//!                                       │
//!                                       ▼
//!                              ReplyPublisher ──► reply_to (correlation_id)
//! ```
//!
//! # Guarantees
//!
//! - Exactly one reply per request that carries `reply_to` and `correlation_id`
//! - No side effects and no reply for requests without them
//! - Deliveries are acked only after the reply has been attempted
//! - Every failure maps to one `StatusCode`
//!
//! # Usage
//!
//! ```ignore
//! use mb_03_bridge::{BridgeConfig, BridgeService};
//!
//! let mut service = BridgeService::new(config, bus, store, scorer, classifier)?;
//! service.start().await?;
//! tokio::signal::ctrl_c().await?;
//! service.shutdown().await;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod dispatcher;
pub mod domain;
pub mod ipc;
pub mod router;
pub mod service;

// Re-exports for public API
pub use dispatcher::{DispatchOutcome, RequestDispatcher};
pub use domain::config::{
    BridgeConfig, BusConfig, ClientConfig, ConfigError, HttpConfig, QueueBinding, QueueConfig,
    StoreConfig,
};
pub use domain::correlation::CorrelationId;
pub use domain::envelope::{
    DecodeError, DecodeFailure, ReplyRoute, RequestEnvelope, RequestKind, ResponseEnvelope,
};
pub use domain::error::BridgeError;
pub use domain::pending::PendingRequestStore;
pub use domain::status::StatusCode;
pub use ipc::client::{BridgeClient, ClientError};
pub use ipc::consumer::{ConsumerState, QueueConsumer};
pub use ipc::publisher::ReplyPublisher;
pub use router::{build_router, AppState};
pub use service::{BridgeService, ServiceError};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
