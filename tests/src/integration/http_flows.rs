//! # HTTP Ingress Flows
//!
//! Drives the bridge over real HTTP. Replies come back as the response body
//! and are also published to the `props.reply_to` queue.

#[cfg(test)]
mod tests {
    use crate::integration::harness::*;
    use mb_01_record_store::RecordStoreApi;
    use mb_03_bridge::router::MISSING_PROPS_ERROR;
    use mb_03_bridge::{ResponseEnvelope, StatusCode};
    use serde_json::{json, Value};
    use shared_bus::{MessageSubscriber, QueueOptions};
    use std::time::Duration;

    const PROBE: &str = "http.replies";

    fn url(bridge: &Bridge, path: &str) -> String {
        let addr = bridge.service.http_addr().unwrap();
        format!("http://{addr}{path}")
    }

    fn with_props(mut body: Value, correlation_id: &str) -> Value {
        body["props"] = json!({ "reply_to": PROBE, "correlation_id": correlation_id });
        body
    }

    #[tokio::test]
    async fn test_health() {
        let (bridge, _, _) = start_default().await;

        let response = reqwest::get(url(&bridge, "/health")).await.unwrap();
        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["status"], "healthy");

        bridge.stop().await;
    }

    #[tokio::test]
    async fn test_create_over_http_is_201_and_mirrored_to_queue() {
        let (bridge, _, _) = start_default().await;
        bridge
            .bus
            .declare_queue(PROBE, QueueOptions::transient())
            .await
            .unwrap();
        let mut replies = bridge.bus.consume(PROBE).await.unwrap();
        let http = reqwest::Client::new();

        let response = http
            .post(url(&bridge, "/users"))
            .json(&with_props(profile("u1"), "http-1"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201);
        let body: ResponseEnvelope = response.json().await.unwrap();
        assert_eq!(body.status_code, StatusCode::Success);
        assert_eq!(body.correlation_id.as_str(), "http-1");

        let mirrored = tokio::time::timeout(Duration::from_secs(5), replies.recv())
            .await
            .unwrap()
            .unwrap();
        let mirrored: ResponseEnvelope = mirrored.json().unwrap();
        assert_eq!(mirrored, body);

        let listed: Vec<Value> = http
            .get(url(&bridge, "/users"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0]["uuid"], "u1");

        bridge.stop().await;
    }

    #[tokio::test]
    async fn test_missing_props_is_400_and_nothing_changes() {
        let (bridge, _, _) = start_default().await;

        let response = reqwest::Client::new()
            .post(url(&bridge, "/users"))
            .json(&profile("u1"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"], MISSING_PROPS_ERROR);
        assert!(bridge.store.list().unwrap().is_empty());

        bridge.stop().await;
    }

    #[tokio::test]
    async fn test_status_codes_follow_outcome() {
        let (bridge, _, _) = start_default().await;
        let http = reqwest::Client::new();

        let missing = http
            .delete(url(&bridge, "/users"))
            .json(&with_props(json!({"uuid": "ghost"}), "http-2"))
            .send()
            .await
            .unwrap();
        assert_eq!(missing.status(), 404);

        let lonely = http
            .post(url(&bridge, "/users"))
            .json(&with_props(profile("u1"), "http-3"))
            .send()
            .await
            .unwrap();
        assert_eq!(lonely.status(), 201);

        let no_candidates = http
            .post(url(&bridge, "/recommend"))
            .json(&with_props(recommend("u1"), "http-4"))
            .send()
            .await
            .unwrap();
        assert_eq!(no_candidates.status(), 409);
        let body: ResponseEnvelope = no_candidates.json().await.unwrap();
        assert_eq!(body.status_code, StatusCode::NoCandidates);

        let classified = http
            .post(url(&bridge, "/classify"))
            .json(&with_props(
                json!({"uuid": "u1", "smallCategory": ["soccer"]}),
                "http-5",
            ))
            .send()
            .await
            .unwrap();
        assert_eq!(classified.status(), 200);
        let body: ResponseEnvelope = classified.json().await.unwrap();
        assert_eq!(body.result["bigCategory"], json!(["sports"]));

        let malformed = http
            .put(url(&bridge, "/users"))
            .header("content-type", "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(malformed.status(), 400);

        bridge.stop().await;
    }

    #[tokio::test]
    async fn test_http_disabled_binds_nothing() {
        let bridge = start_bridge(
            std::sync::Arc::new(mb_02_scorer::FixedScorer::returning(
                mb_02_scorer::Candidate::new("u2"),
            )),
            std::sync::Arc::new(mb_02_scorer::FixedClassifier::returning(["sports"])),
            |config| config.http.enabled = false,
        )
        .await;
        assert!(bridge.service.http_addr().is_none());

        let reply = bridge
            .client
            .request(CRUD, &crud("CREATE", profile("u1")))
            .await
            .unwrap();
        assert_eq!(reply.status_code, StatusCode::Success);

        bridge.stop().await;
    }
}
