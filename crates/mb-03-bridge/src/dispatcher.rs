//! # Request Dispatcher
//!
//! Validates a decoded request, runs it against the record store, scorer, or
//! classifier, and publishes exactly one reply.
//!
//! ```text
//! RequestEnvelope
//!      │
//!      ├── no reply route ──► Unroutable (no side effects, nothing published)
//!      │
//!      ├── validate ──► FIELD_MISSING / INVALID_INPUT
//!      │
//!      ├── CREATE/UPDATE/DELETE ──► RecordStoreApi (blocking pool)
//!      ├── RECOMMEND ──► list → eligibility → write_preferences → Scorer
//!      └── CLASSIFY ──► Classifier → align_categories
//!      │
//!      ▼
//! ReplyPublisher.publish(reply_to, correlation_id, response)
//! ```
//!
//! Errors and panics inside execution are converted to a failure reply; they
//! never escape `dispatch`.

use crate::domain::envelope::{RequestEnvelope, RequestKind, ResponseEnvelope, ReplyRoute};
use crate::domain::error::BridgeError;
use crate::domain::payload;
use crate::ipc::publisher::ReplyPublisher;
use futures::FutureExt;
use mb_01_record_store::{Record, RecordStoreApi, StoreError};
use mb_02_scorer::{align_categories, Classifier, Scorer};
use serde_json::{json, Value};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// What happened to a dispatched request.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// A reply was built; `delivered` says whether the bus took it.
    Replied {
        response: ResponseEnvelope,
        delivered: bool,
    },
    /// No reply route; the request was not executed.
    Unroutable,
}

pub struct RequestDispatcher {
    store: Arc<dyn RecordStoreApi>,
    scorer: Arc<dyn Scorer>,
    classifier: Arc<dyn Classifier>,
    publisher: ReplyPublisher,
}

impl RequestDispatcher {
    pub fn new(
        store: Arc<dyn RecordStoreApi>,
        scorer: Arc<dyn Scorer>,
        classifier: Arc<dyn Classifier>,
        publisher: ReplyPublisher,
    ) -> Self {
        Self {
            store,
            scorer,
            classifier,
            publisher,
        }
    }

    pub fn publisher(&self) -> &ReplyPublisher {
        &self.publisher
    }

    /// Execute `envelope` and publish its reply.
    #[instrument(skip_all, fields(kind = %envelope.kind, subject = ?envelope.subject_id))]
    pub async fn dispatch(&self, envelope: RequestEnvelope) -> DispatchOutcome {
        let Some(route) = envelope.reply.clone() else {
            warn!("Request without reply_to/correlation_id, dropping");
            return DispatchOutcome::Unroutable;
        };

        let response = self.respond(&route, &envelope).await;
        let delivered = self
            .publisher
            .publish(&route.reply_to, &route.correlation_id, &response)
            .await;

        DispatchOutcome::Replied {
            response,
            delivered,
        }
    }

    /// Publish a reply for a body that could not be decoded.
    pub async fn reject(&self, route: &ReplyRoute, response: &ResponseEnvelope) -> bool {
        self.publisher
            .publish(&route.reply_to, &route.correlation_id, response)
            .await
    }

    /// Snapshot of all records (HTTP `GET /users`).
    pub async fn list_records(&self) -> Result<Vec<Record>, BridgeError> {
        self.store_call(|store| store.list()).await
    }

    async fn respond(&self, route: &ReplyRoute, envelope: &RequestEnvelope) -> ResponseEnvelope {
        let outcome = AssertUnwindSafe(self.execute(envelope))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(BridgeError::Internal(panic_message(&*panic))));

        let correlation_id = route.correlation_id.clone();
        match outcome {
            Ok((message, result)) => {
                info!(correlation_id = %correlation_id, "Request succeeded");
                ResponseEnvelope::success(
                    correlation_id,
                    envelope.kind,
                    envelope.subject_id.clone(),
                    message,
                    result,
                )
            }
            Err(e) => {
                let status = e.status();
                if matches!(e, BridgeError::Internal(_) | BridgeError::Store(_)) {
                    error!(correlation_id = %correlation_id, status = %status, error = %e, "Request failed");
                } else {
                    warn!(correlation_id = %correlation_id, status = %status, error = %e, "Request failed");
                }
                ResponseEnvelope::failure(
                    correlation_id,
                    status,
                    e.to_string(),
                    Value::Object(envelope.payload.clone()),
                    e.details(),
                )
                .with_request(Some(envelope.kind), envelope.subject_id.clone())
            }
        }
    }

    async fn execute(&self, envelope: &RequestEnvelope) -> Result<(&'static str, Value), BridgeError> {
        let subject = payload::validate(envelope)?;
        let body = &envelope.payload;

        match envelope.kind {
            RequestKind::Create => {
                let record = Record::new(subject, payload::record_fields(body, false)?);
                let created = self.store_call(move |store| store.create(record)).await?;
                Ok(("Record created", to_json(&created)?))
            }
            RequestKind::Update => {
                let fields = payload::record_fields(body, true)?;
                let updated = self
                    .store_call(move |store| store.update(&subject, fields))
                    .await?;
                Ok(("Record updated", to_json(&updated)?))
            }
            RequestKind::Delete => {
                let removed = self.store_call(move |store| store.delete(&subject)).await?;
                Ok(("Record deleted", to_json(&removed)?))
            }
            RequestKind::Recommend => {
                let preferences = payload::match_preferences(subject, body)?;

                let records = self.store_call(|store| store.list()).await?;
                let eligible = records
                    .iter()
                    .filter(|r| r.uuid != preferences.matcher_uuid)
                    .count();
                if eligible == 0 {
                    return Err(BridgeError::NoCandidates);
                }

                let slot = preferences.clone();
                self.store_call(move |store| store.write_preferences(slot))
                    .await?;
                debug!(eligible, "Preferences persisted, invoking scorer");

                let candidate = self.scorer.recommend(&preferences).await?;
                Ok((
                    "Match found",
                    json!({ "matchId": candidate.uuid, "candidate": candidate }),
                ))
            }
            RequestKind::Classify => {
                let labels = payload::category_labels(body)?;
                let categories = self.classifier.classify(subject.as_str(), &labels).await?;
                let aligned = align_categories(labels.len(), categories)?;
                Ok(("Categories classified", json!({ "bigCategory": aligned })))
            }
        }
    }

    /// Run a store call on the blocking pool.
    async fn store_call<T, F>(&self, call: F) -> Result<T, BridgeError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn RecordStoreApi) -> Result<T, StoreError> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        match tokio::task::spawn_blocking(move || call(store.as_ref())).await {
            Ok(result) => result.map_err(BridgeError::from),
            Err(e) => Err(BridgeError::Internal(format!("store task failed: {e}"))),
        }
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, BridgeError> {
    serde_json::to_value(value).map_err(|e| BridgeError::Internal(e.to_string()))
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("handler panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("handler panicked: {s}")
    } else {
        "handler panicked".to_string()
    }
}
