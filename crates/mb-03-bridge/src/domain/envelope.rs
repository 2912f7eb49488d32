//! # Request and Response Envelopes
//!
//! Wire shapes shared by the queue consumers and the HTTP ingress.
//!
//! A request body is a flat JSON object. `type` names the request kind; the
//! subject identifier is `uuid` (`matcherUuid` for RECOMMEND); every other key
//! is payload. Reply metadata travels in bus message properties, or in a
//! `props` object on HTTP.

use crate::domain::config::QueueBinding;
use crate::domain::correlation::CorrelationId;
use crate::domain::status::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use shared_bus::MessageProperties;
use std::fmt;
use thiserror::Error;

/// Body key naming the request kind.
pub const TYPE_KEY: &str = "type";

/// HTTP body key holding reply metadata.
pub const PROPS_KEY: &str = "props";

/// The operation a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestKind {
    Create,
    Update,
    Delete,
    Recommend,
    Classify,
}

impl RequestKind {
    pub const ALL: [RequestKind; 5] = [
        RequestKind::Create,
        RequestKind::Update,
        RequestKind::Delete,
        RequestKind::Recommend,
        RequestKind::Classify,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Create => "CREATE",
            RequestKind::Update => "UPDATE",
            RequestKind::Delete => "DELETE",
            RequestKind::Recommend => "RECOMMEND",
            RequestKind::Classify => "CLASSIFY",
        }
    }

    /// Case-insensitive token lookup.
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(token))
    }

    /// Payload key that carries the subject identifier.
    pub fn subject_key(&self) -> &'static str {
        match self {
            RequestKind::Recommend => "matcherUuid",
            _ => "uuid",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where and under which token a reply goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyRoute {
    pub reply_to: String,
    pub correlation_id: CorrelationId,
}

impl ReplyRoute {
    /// Both parts must be present and non-empty.
    pub fn from_properties(properties: &MessageProperties) -> Option<Self> {
        let (reply_to, correlation_id) = properties.reply_route()?;
        Some(Self {
            reply_to: reply_to.to_string(),
            correlation_id: CorrelationId::parse(correlation_id)?,
        })
    }

    fn from_props_object(props: Option<&Value>) -> Option<Self> {
        let props = props?.as_object()?;
        let reply_to = props.get("reply_to")?.as_str()?.trim();
        let correlation_id = CorrelationId::parse(props.get("correlation_id")?.as_str()?)?;
        (!reply_to.is_empty()).then(|| Self {
            reply_to: reply_to.to_string(),
            correlation_id,
        })
    }
}

/// A decoded inbound request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestEnvelope {
    pub kind: RequestKind,
    /// Value of the kind's subject key, when it is a usable scalar.
    pub subject_id: Option<String>,
    /// Body fields minus transport keys. Subject key included.
    pub payload: Map<String, Value>,
    /// `None` when the requester gave no complete reply metadata.
    pub reply: Option<ReplyRoute>,
}

impl RequestEnvelope {
    pub fn new(kind: RequestKind, payload: Map<String, Value>, reply: Option<ReplyRoute>) -> Self {
        let subject_id = payload.get(kind.subject_key()).and_then(scalar_text);
        Self {
            kind,
            subject_id,
            payload,
            reply,
        }
    }

    /// Decode a bus delivery received on `binding`'s queue.
    pub fn from_bus(
        body: &[u8],
        properties: &MessageProperties,
        binding: &QueueBinding,
    ) -> Result<Self, DecodeError> {
        let reply = ReplyRoute::from_properties(properties);
        let fail = |reason| DecodeError {
            reason,
            reply: reply.clone(),
        };

        let mut payload = match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(map)) => map,
            Ok(other) => return Err(fail(DecodeFailure::NotAnObject(json_type(&other).into()))),
            Err(e) => return Err(fail(DecodeFailure::NotAnObject(e.to_string()))),
        };

        let kind = match payload.remove(TYPE_KEY) {
            None | Some(Value::Null) => binding.default_kind.ok_or_else(|| fail(DecodeFailure::MissingType))?,
            Some(Value::String(token)) => {
                RequestKind::parse(&token).ok_or_else(|| fail(DecodeFailure::UnknownType(token)))?
            }
            Some(other) => return Err(fail(DecodeFailure::UnknownType(other.to_string()))),
        };

        if !binding.kinds.contains(&kind) {
            return Err(fail(DecodeFailure::NotAccepted {
                kind,
                queue: binding.name.clone(),
            }));
        }

        Ok(Self::new(kind, payload, reply))
    }

    /// Decode an HTTP body. The route decides the kind; reply metadata comes
    /// from the body's `props` object.
    pub fn from_http(kind: RequestKind, body: Value) -> Result<Self, DecodeError> {
        let mut payload = match body {
            Value::Object(map) => map,
            other => {
                return Err(DecodeError {
                    reason: DecodeFailure::NotAnObject(json_type(&other).into()),
                    reply: None,
                })
            }
        };
        let reply = ReplyRoute::from_props_object(payload.get(PROPS_KEY));
        payload.remove(PROPS_KEY);
        payload.remove(TYPE_KEY);

        Ok(Self::new(kind, payload, reply))
    }
}

/// Why a body could not become a `RequestEnvelope`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeFailure {
    #[error("body is not a JSON object: {0}")]
    NotAnObject(String),
    #[error("request type missing")]
    MissingType,
    #[error("request type {0:?} not recognized")]
    UnknownType(String),
    #[error("request type {kind} not accepted on queue {queue}")]
    NotAccepted { kind: RequestKind, queue: String },
}

impl DecodeFailure {
    pub fn status(&self) -> StatusCode {
        match self {
            DecodeFailure::MissingType => StatusCode::FieldMissing,
            _ => StatusCode::InvalidInput,
        }
    }
}

/// Decode failure plus whatever reply route could still be read.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{reason}")]
pub struct DecodeError {
    pub reason: DecodeFailure,
    pub reply: Option<ReplyRoute>,
}

/// The single reply published for a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub status_code: StatusCode,
    pub message: String,
    #[serde(default)]
    pub result: Value,
    pub correlation_id: CorrelationId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_type: Option<RequestKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
}

impl ResponseEnvelope {
    pub fn success(
        correlation_id: CorrelationId,
        kind: RequestKind,
        subject_id: Option<String>,
        message: impl Into<String>,
        result: Value,
    ) -> Self {
        Self {
            status_code: StatusCode::Success,
            message: message.into(),
            result,
            correlation_id,
            request_type: Some(kind),
            subject_id,
        }
    }

    /// Failure reply. `result` echoes the request payload next to `details`.
    pub fn failure(
        correlation_id: CorrelationId,
        status: StatusCode,
        message: impl Into<String>,
        request: Value,
        details: Option<String>,
    ) -> Self {
        let mut result = Map::new();
        result.insert("request".into(), request);
        result.insert("details".into(), details.map(Value::String).unwrap_or(Value::Null));
        Self {
            status_code: status,
            message: message.into(),
            result: Value::Object(result),
            correlation_id,
            request_type: None,
            subject_id: None,
        }
    }

    pub fn with_request(mut self, kind: Option<RequestKind>, subject_id: Option<String>) -> Self {
        self.request_type = kind;
        self.subject_id = subject_id;
        self
    }

    pub fn is_success(&self) -> bool {
        self.status_code.is_success()
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
