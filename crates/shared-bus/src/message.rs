//! # Bus Messages
//!
//! The unit that crosses the bus: an opaque body plus bus-native properties.
//! Reply routing lives in the properties, never in the body.

use crate::JSON_CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Properties attached by the transport, separate from the body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageProperties {
    /// Queue the receiver should publish its reply to.
    pub reply_to: Option<String>,
    /// Token the requester uses to match a reply to its request.
    pub correlation_id: Option<String>,
    /// MIME type of the body.
    pub content_type: Option<String>,
}

impl MessageProperties {
    /// Properties for a request that expects a reply.
    pub fn request(reply_to: impl Into<String>, correlation_id: impl Into<String>) -> Self {
        Self {
            reply_to: Some(reply_to.into()),
            correlation_id: Some(correlation_id.into()),
            content_type: Some(JSON_CONTENT_TYPE.to_string()),
        }
    }

    /// Properties for a reply: carries the correlation id only.
    pub fn reply(correlation_id: impl Into<String>) -> Self {
        Self {
            reply_to: None,
            correlation_id: Some(correlation_id.into()),
            content_type: Some(JSON_CONTENT_TYPE.to_string()),
        }
    }

    /// Both halves of the reply route, if the sender supplied them.
    ///
    /// Empty strings count as absent.
    pub fn reply_route(&self) -> Option<(&str, &str)> {
        let reply_to = self.reply_to.as_deref().filter(|s| !s.is_empty())?;
        let correlation_id = self.correlation_id.as_deref().filter(|s| !s.is_empty())?;
        Some((reply_to, correlation_id))
    }
}

/// A message on its way to a queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub body: Vec<u8>,
    pub properties: MessageProperties,
}

impl OutboundMessage {
    pub fn new(body: impl Into<Vec<u8>>, properties: MessageProperties) -> Self {
        Self {
            body: body.into(),
            properties,
        }
    }

    /// Serialize `value` as the JSON body.
    pub fn json<T: Serialize>(
        value: &T,
        properties: MessageProperties,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::to_vec(value)?, properties))
    }
}

/// A message handed to a consumer.
///
/// Must be acknowledged through the `Consumer` that produced it.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Queue the message was consumed from.
    pub queue: String,
    /// Consumer-scoped tag used for `ack`/`nack`.
    pub delivery_tag: u64,
    pub body: Vec<u8>,
    pub properties: MessageProperties,
    /// True if an earlier delivery of this message was never acknowledged.
    pub redelivered: bool,
}

impl Delivery {
    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// Queue declaration arguments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueOptions {
    /// Survives consumer restarts.
    pub durable: bool,
    /// Messages older than this are discarded instead of delivered.
    pub message_ttl: Option<Duration>,
}

impl QueueOptions {
    /// Durable queue with a message TTL.
    pub fn durable_with_ttl(ttl: Duration) -> Self {
        Self {
            durable: true,
            message_ttl: Some(ttl),
        }
    }

    /// Non-durable queue without TTL, as used for private reply queues.
    pub fn transient() -> Self {
        Self::default()
    }
}
