//! # Scorer Processes
//!
//! Real child processes behind the scorer and classifier ports. The scripts
//! read the store file the same way the production ranking script does.

#[cfg(all(test, unix))]
mod tests {
    use crate::integration::harness::*;
    use mb_01_record_store::RecordStoreApi;
    use mb_02_scorer::{OutputFormat, ProcessClassifier, ProcessConfig, ProcessScorer};
    use mb_03_bridge::StatusCode;
    use serde_json::json;
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Echo the matcher from the request slot (second line of the store).
    const SLOT_ECHO: &str = r#"m=$(sed -n 2p "$1" | cut -d, -f1); echo "ranking for $m"; printf '{"version":1,"candidate":{"uuid":"%s-match","score":0.5}}\n' "$m""#;

    /// Marker-format classifier: `$2` is the subject after `--uuid`.
    const MARKER_CLASSIFY: &str = r#"echo "uuid: $2"; echo "대분류: sports, study""#;

    fn shell(script: &str, store: &Path, timeout_ms: u64, format: OutputFormat) -> ProcessConfig {
        ProcessConfig {
            program: "sh".into(),
            args: vec![
                "-c".into(),
                script.into(),
                "scorer".into(),
                store.display().to_string(),
            ],
            timeout_ms,
            output_format: format,
        }
    }

    async fn bridge_with(scorer_script: &str, timeout_ms: u64) -> Bridge {
        let dir = TempDir::new().unwrap();
        let store = store_path_in(&dir);
        let scorer = ProcessScorer::new(shell(scorer_script, &store, timeout_ms, OutputFormat::Json));
        let mut classifier_config = shell(MARKER_CLASSIFY, &store, 5_000, OutputFormat::Marker);
        // `sh -c` sees `--uuid` as $1; drop the store argument.
        classifier_config.args.truncate(3);
        let classifier = ProcessClassifier::new(classifier_config);

        let bridge = start_in(dir, Arc::new(scorer), Arc::new(classifier), |_| {}).await;
        for id in ["u1", "u2"] {
            let reply = bridge
                .client
                .request(CRUD, &crud("CREATE", profile(id)))
                .await
                .unwrap();
            assert_eq!(reply.status_code, StatusCode::Success);
        }
        bridge
    }

    #[tokio::test]
    async fn test_scorer_reads_preferences_written_before_it_ran() {
        let bridge = bridge_with(SLOT_ECHO, 5_000).await;

        let reply = bridge.client.request(MATCH, &recommend("u1")).await.unwrap();
        assert_eq!(reply.status_code, StatusCode::Success);
        assert_eq!(reply.result["matchId"], "u1-match");
        assert_eq!(reply.result["candidate"]["score"], json!(0.5));

        bridge.stop().await;
    }

    #[tokio::test]
    async fn test_scorer_nonzero_exit_is_scorer_failure() {
        let bridge = bridge_with("echo 'model file missing' >&2; exit 3", 5_000).await;

        let reply = bridge.client.request(MATCH, &recommend("u1")).await.unwrap();
        assert_eq!(reply.status_code, StatusCode::ScorerFailure);
        assert_eq!(reply.result["details"], "model file missing");

        bridge.stop().await;
    }

    #[tokio::test]
    async fn test_scorer_timeout_is_scorer_failure() {
        let bridge = bridge_with("sleep 5", 200).await;

        let started = std::time::Instant::now();
        let reply = bridge.client.request(MATCH, &recommend("u1")).await.unwrap();
        assert_eq!(reply.status_code, StatusCode::ScorerFailure);
        assert!(reply.message.contains("timed out"));
        assert!(started.elapsed() < std::time::Duration::from_secs(4));

        bridge.stop().await;
    }

    #[tokio::test]
    async fn test_scorer_garbage_is_output_invalid() {
        let bridge = bridge_with("echo 'no json here'", 5_000).await;

        let reply = bridge.client.request(MATCH, &recommend("u1")).await.unwrap();
        assert_eq!(reply.status_code, StatusCode::ScorerOutputInvalid);
        assert!(bridge.store.read_preferences().unwrap().is_some());

        bridge.stop().await;
    }

    #[tokio::test]
    async fn test_marker_classifier_over_process() {
        let bridge = bridge_with(SLOT_ECHO, 5_000).await;

        let reply = bridge
            .client
            .request(
                CLASSIFY,
                &json!({"uuid": "u1", "smallCategory": ["soccer", "reading"]}),
            )
            .await
            .unwrap();
        assert_eq!(reply.status_code, StatusCode::Success);
        assert_eq!(reply.result["bigCategory"], json!(["sports", "study"]));

        bridge.stop().await;
    }
}
