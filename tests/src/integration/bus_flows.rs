//! # Bus Request Flows
//!
//! Each scenario sends requests through the correlating client onto the
//! bridge's inbound queues and checks the reply plus the persisted store.

#[cfg(test)]
mod tests {
    use crate::integration::harness::*;
    use mb_01_record_store::RecordStoreApi;
    use mb_02_scorer::ScorerError;
    use mb_03_bridge::{RequestKind, StatusCode};
    use serde_json::json;

    // =========================================================================
    // CRUD
    // =========================================================================

    #[tokio::test]
    async fn test_create_persists_and_replies() {
        let (bridge, _, _) = start_default().await;

        let reply = bridge
            .client
            .request(CRUD, &crud("CREATE", profile("u1")))
            .await
            .unwrap();

        assert_eq!(reply.status_code, StatusCode::Success);
        assert_eq!(reply.request_type, Some(RequestKind::Create));
        assert_eq!(reply.subject_id.as_deref(), Some("u1"));
        assert_eq!(reply.result["contactFrequency"], "weekly");

        let record = bridge.store.get(&"u1".into()).unwrap();
        assert_eq!(record.age, "24");
        assert!(bridge.store_file().contains("u1,24,weekly,F,climbing,physics,ENFP,FALSE"));

        bridge.stop().await;
    }

    #[tokio::test]
    async fn test_duplicate_create_conflicts() {
        let (bridge, _, _) = start_default().await;
        bridge
            .client
            .request(CRUD, &crud("CREATE", profile("u1")))
            .await
            .unwrap();

        let reply = bridge
            .client
            .request(CRUD, &crud("CREATE", profile("u1")))
            .await
            .unwrap();
        assert_eq!(reply.status_code, StatusCode::Conflict);
        assert_eq!(bridge.store.list().unwrap().len(), 1);

        bridge.stop().await;
    }

    #[tokio::test]
    async fn test_update_then_delete() {
        let (bridge, _, _) = start_default().await;
        bridge
            .client
            .request(CRUD, &crud("CREATE", profile("u1")))
            .await
            .unwrap();

        let mut changes = profile("u1");
        changes["hobby"] = json!("sailing");
        changes["duplication"] = json!(true);
        let updated = bridge
            .client
            .request(CRUD, &crud("UPDATE", changes))
            .await
            .unwrap();
        assert_eq!(updated.status_code, StatusCode::Success);
        assert_eq!(updated.result["hobby"], "sailing");
        assert_eq!(updated.result["duplication"], true);

        let deleted = bridge
            .client
            .request(CRUD, &crud("DELETE", json!({"uuid": "u1"})))
            .await
            .unwrap();
        assert_eq!(deleted.status_code, StatusCode::Success);
        assert_eq!(deleted.result["hobby"], "sailing");
        assert!(bridge.store.list().unwrap().is_empty());
        assert!(!bridge.store_file().contains("sailing"));

        bridge.stop().await;
    }

    #[tokio::test]
    async fn test_missing_subject_not_found() {
        let (bridge, _, _) = start_default().await;

        let update = bridge
            .client
            .request(CRUD, &crud("UPDATE", profile("ghost")))
            .await
            .unwrap();
        assert_eq!(update.status_code, StatusCode::NotFound);

        let delete = bridge
            .client
            .request(CRUD, &crud("DELETE", json!({"uuid": "ghost"})))
            .await
            .unwrap();
        assert_eq!(delete.status_code, StatusCode::NotFound);
        assert_eq!(delete.result["request"]["uuid"], "ghost");

        bridge.stop().await;
    }

    #[tokio::test]
    async fn test_missing_field_reported() {
        let (bridge, _, _) = start_default().await;
        let mut body = profile("u1");
        body.as_object_mut().unwrap().remove("major");

        let reply = bridge
            .client
            .request(CRUD, &crud("CREATE", body))
            .await
            .unwrap();
        assert_eq!(reply.status_code, StatusCode::FieldMissing);
        assert!(reply.message.contains("major"));
        assert!(bridge.store.list().unwrap().is_empty());

        bridge.stop().await;
    }

    // =========================================================================
    // RECOMMEND
    // =========================================================================

    #[tokio::test]
    async fn test_recommend_returns_match_and_persists_slot() {
        let (bridge, scorer, _) = start_default().await;
        for id in ["u1", "u2", "u3"] {
            bridge
                .client
                .request(CRUD, &crud("CREATE", profile(id)))
                .await
                .unwrap();
        }

        let reply = bridge.client.request(MATCH, &recommend("u1")).await.unwrap();
        assert_eq!(reply.status_code, StatusCode::Success);
        assert_eq!(reply.request_type, Some(RequestKind::Recommend));
        assert_eq!(reply.result["matchId"], "u2");
        assert_eq!(reply.result["candidate"]["score"], json!(0.87));

        let slot = bridge.store.read_preferences().unwrap().unwrap();
        assert_eq!(slot.matcher_uuid.as_str(), "u1");
        assert_eq!(slot.duplication_list, r#"["u9"]"#);
        assert_eq!(scorer.calls(), 1);

        let file = bridge.store_file();
        let mut lines = file.lines();
        assert!(lines.next().unwrap().starts_with("matcherUuid,"));
        assert!(lines.next().unwrap().starts_with("u1,weekly,F,same,TRUE,"));

        bridge.stop().await;
    }

    #[tokio::test]
    async fn test_recommend_alone_has_no_candidates() {
        let (bridge, scorer, _) = start_default().await;
        bridge
            .client
            .request(CRUD, &crud("CREATE", profile("u1")))
            .await
            .unwrap();

        let reply = bridge.client.request(MATCH, &recommend("u1")).await.unwrap();
        assert_eq!(reply.status_code, StatusCode::NoCandidates);
        assert!(bridge.store.read_preferences().unwrap().is_none());
        assert_eq!(scorer.calls(), 0);

        bridge.stop().await;
    }

    #[tokio::test]
    async fn test_scorer_failure_keeps_written_preferences() {
        let (bridge, scorer, _) = start_default().await;
        for id in ["u1", "u2"] {
            bridge
                .client
                .request(CRUD, &crud("CREATE", profile(id)))
                .await
                .unwrap();
        }
        scorer.set_outcome(Err(ScorerError::failed(Some(1), "Traceback: model missing")));

        let reply = bridge.client.request(MATCH, &recommend("u1")).await.unwrap();
        assert_eq!(reply.status_code, StatusCode::ScorerFailure);
        assert_eq!(reply.result["details"], "Traceback: model missing");
        assert!(bridge.store.read_preferences().unwrap().is_some());

        bridge.stop().await;
    }

    // =========================================================================
    // CLASSIFY
    // =========================================================================

    #[tokio::test]
    async fn test_classify_broadcasts_single_label() {
        let (bridge, _, classifier) = start_default().await;

        let reply = bridge
            .client
            .request(
                CLASSIFY,
                &json!({"uuid": "u1", "smallCategory": ["soccer", "tennis"]}),
            )
            .await
            .unwrap();
        assert_eq!(reply.status_code, StatusCode::Success);
        assert_eq!(reply.result["bigCategory"], json!(["sports", "sports"]));
        assert_eq!(classifier.calls(), 1);

        bridge.stop().await;
    }

    #[tokio::test]
    async fn test_classify_empty_list_invalid() {
        let (bridge, _, classifier) = start_default().await;

        let reply = bridge
            .client
            .request(CLASSIFY, &json!({"uuid": "u1", "smallCategory": []}))
            .await
            .unwrap();
        assert_eq!(reply.status_code, StatusCode::InvalidInput);
        assert_eq!(classifier.calls(), 0);

        bridge.stop().await;
    }
}
