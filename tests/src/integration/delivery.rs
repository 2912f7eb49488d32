//! # Delivery Semantics
//!
//! Unroutable requests, at-least-once redelivery, courtesy replies for
//! undecodable bodies, and many requests in flight at once.

#[cfg(test)]
mod tests {
    use crate::integration::harness::*;
    use mb_01_record_store::{RecordStoreApi, RecordStoreService};
    use mb_02_scorer::{Candidate, FixedClassifier, FixedScorer};
    use mb_03_bridge::{BridgeConfig, BridgeService, QueueBinding, ResponseEnvelope, StatusCode};
    use serde_json::json;
    use shared_bus::{
        InMemoryMessageBus, MessageProperties, MessagePublisher, MessageSubscriber,
        OutboundMessage, QueueOptions,
    };
    use std::collections::HashSet;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::{sleep, timeout};

    const PROBE: &str = "probe.replies";

    async fn eventually(check: impl Fn() -> bool) {
        timeout(Duration::from_secs(5), async {
            while !check() {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_request_without_reply_route_is_dropped() {
        let (bridge, _, _) = start_default().await;
        bridge
            .bus
            .publish(
                CRUD,
                OutboundMessage::json(&crud("CREATE", profile("u1")), MessageProperties::default())
                    .unwrap(),
            )
            .await
            .unwrap();

        let stats = bridge.service.consumer_stats()[0].1.clone();
        eventually(|| stats.unroutable.load(Ordering::Relaxed) == 1).await;

        assert!(bridge.store.list().unwrap().is_empty());
        assert_eq!(bridge.bus.queue_depth(CRUD), Some(0));
        assert_eq!(stats.replied.load(Ordering::Relaxed), 0);

        bridge.stop().await;
    }

    #[tokio::test]
    async fn test_unacked_request_is_redelivered_and_answered() {
        let bus = Arc::new(InMemoryMessageBus::new());
        let binding = QueueBinding::crud();
        bus.declare_queue(&binding.name, binding.options()).await.unwrap();
        bus.declare_queue(PROBE, QueueOptions::transient()).await.unwrap();
        bus.publish(
            &binding.name,
            OutboundMessage::json(
                &crud("CREATE", profile("u1")),
                MessageProperties::request(PROBE, "cid-redeliver"),
            )
            .unwrap(),
        )
        .await
        .unwrap();

        // A consumer that dies before acking.
        {
            let mut crashed = bus.consume(&binding.name).await.unwrap();
            let first = crashed.recv().await.unwrap();
            assert!(!first.redelivered);
        }
        assert_eq!(bus.queue_depth(&binding.name), Some(1));

        let store = Arc::new(RecordStoreService::in_memory());
        let mut config = BridgeConfig::default();
        config.http.enabled = false;
        let mut service = BridgeService::new(
            config,
            bus.clone(),
            store.clone(),
            Arc::new(FixedScorer::returning(Candidate::new("u2"))),
            Arc::new(FixedClassifier::returning(["sports"])),
        )
        .unwrap();
        service.start().await.unwrap();

        let mut replies = bus.consume(PROBE).await.unwrap();
        let delivery = timeout(Duration::from_secs(5), replies.recv())
            .await
            .unwrap()
            .unwrap();
        let response: ResponseEnvelope = delivery.json().unwrap();

        assert_eq!(delivery.properties.correlation_id.as_deref(), Some("cid-redeliver"));
        assert_eq!(response.status_code, StatusCode::Success);
        assert_eq!(store.len(), 1);
        let (_, stats) = &service.consumer_stats()[0];
        assert_eq!(stats.redelivered.load(Ordering::Relaxed), 1);

        service.shutdown().await;
    }

    #[tokio::test]
    async fn test_undecodable_body_gets_courtesy_reply() {
        let (bridge, _, _) = start_default().await;
        bridge
            .bus
            .declare_queue(PROBE, QueueOptions::transient())
            .await
            .unwrap();
        let mut replies = bridge.bus.consume(PROBE).await.unwrap();

        bridge
            .bus
            .publish(
                CRUD,
                OutboundMessage::new(
                    b"uuid=u1&age=24".to_vec(),
                    MessageProperties::request(PROBE, "cid-garbage"),
                ),
            )
            .await
            .unwrap();

        let delivery = timeout(Duration::from_secs(5), replies.recv())
            .await
            .unwrap()
            .unwrap();
        let response: ResponseEnvelope = delivery.json().unwrap();
        assert_eq!(response.status_code, StatusCode::InvalidInput);
        assert_eq!(response.correlation_id.as_str(), "cid-garbage");
        assert_eq!(response.result["request"], "uuid=u1&age=24");
        assert!(bridge.store.list().unwrap().is_empty());

        bridge.stop().await;
    }

    #[tokio::test]
    async fn test_crud_without_type_is_field_missing() {
        let (bridge, _, _) = start_default().await;

        let reply = bridge.client.request(CRUD, &profile("u1")).await.unwrap();
        assert_eq!(reply.status_code, StatusCode::FieldMissing);
        assert!(bridge.store.list().unwrap().is_empty());

        bridge.stop().await;
    }

    #[tokio::test]
    async fn test_recommend_on_crud_queue_is_rejected() {
        let (bridge, scorer, _) = start_default().await;

        let mut body = recommend("u1");
        body["type"] = json!("RECOMMEND");
        let reply = bridge.client.request(CRUD, &body).await.unwrap();
        assert_eq!(reply.status_code, StatusCode::InvalidInput);
        assert_eq!(scorer.calls(), 0);

        bridge.stop().await;
    }

    #[tokio::test]
    async fn test_concurrent_requests_get_their_own_replies() {
        let (bridge, _, _) = start_default().await;
        for id in ["seed", "peer"] {
            bridge
                .client
                .request(CRUD, &crud("CREATE", profile(id)))
                .await
                .unwrap();
        }

        let client = Arc::new(bridge.client);
        let mut handles = Vec::new();
        for i in 0..12 {
            let client = Arc::clone(&client);
            handles.push(tokio::spawn(async move {
                let id = format!("u{i}");
                if i % 3 == 0 {
                    client.request(MATCH, &recommend("seed")).await.unwrap()
                } else {
                    client.request(CRUD, &crud("CREATE", profile(&id))).await.unwrap()
                }
            }));
        }

        let mut correlation_ids = HashSet::new();
        let mut created = HashSet::new();
        for handle in handles {
            let reply = handle.await.unwrap();
            assert_eq!(reply.status_code, StatusCode::Success);
            assert!(correlation_ids.insert(reply.correlation_id.to_string()));
            if let Some(subject) = reply.subject_id.filter(|s| s != "seed") {
                created.insert(subject);
            }
        }

        assert_eq!(correlation_ids.len(), 12);
        assert_eq!(created.len(), 8);
        assert_eq!(bridge.store.list().unwrap().len(), 10);
        assert_eq!(client.pending().pending_count(), 0);

        bridge.service.consumer_stats().iter().for_each(|(queue, stats)| {
            assert_eq!(stats.decode_failures.load(Ordering::Relaxed), 0, "{queue}");
        });
        drop(client);
        let mut service = bridge.service;
        service.shutdown().await;
    }
}
