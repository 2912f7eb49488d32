//! Bridge startup and request fixtures shared by the scenarios.

use mb_01_record_store::{CsvTableFile, RecordStoreService};
use mb_02_scorer::{Candidate, Classifier, FixedClassifier, FixedScorer, Scorer};
use mb_03_bridge::{BridgeClient, BridgeConfig, BridgeService};
use serde_json::{json, Value};
use shared_bus::{InMemoryMessageBus, MessageBus};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

pub const CRUD: &str = "user-crud-request";
pub const MATCH: &str = "match-request";
pub const CLASSIFY: &str = "classify-request";

pub struct Bridge {
    pub bus: Arc<InMemoryMessageBus>,
    pub service: BridgeService,
    pub store: Arc<RecordStoreService<CsvTableFile>>,
    pub client: BridgeClient,
    pub store_path: PathBuf,
    _dir: TempDir,
}

impl Bridge {
    /// Raw contents of the store file.
    pub fn store_file(&self) -> String {
        std::fs::read_to_string(&self.store_path).unwrap_or_default()
    }

    pub async fn stop(mut self) {
        self.service.shutdown().await;
    }
}

/// Bridge with a fixed scorer (`u2`) and classifier (`sports`).
pub async fn start_default() -> (Bridge, Arc<FixedScorer>, Arc<FixedClassifier>) {
    let scorer = Arc::new(FixedScorer::returning(
        Candidate::new("u2").with_attribute("score", json!(0.87)),
    ));
    let classifier = Arc::new(FixedClassifier::returning(["sports"]));
    let bridge = start_bridge(scorer.clone(), classifier.clone(), |_| {}).await;
    (bridge, scorer, classifier)
}

pub async fn start_bridge(
    scorer: Arc<dyn Scorer>,
    classifier: Arc<dyn Classifier>,
    tweak: impl FnOnce(&mut BridgeConfig),
) -> Bridge {
    start_in(TempDir::new().unwrap(), scorer, classifier, tweak).await
}

/// Store file path inside `dir`, for backends that read the store directly.
pub fn store_path_in(dir: &TempDir) -> PathBuf {
    dir.path().join("users.csv")
}

/// Start a bridge whose store lives in `dir`.
pub async fn start_in(
    dir: TempDir,
    scorer: Arc<dyn Scorer>,
    classifier: Arc<dyn Classifier>,
    tweak: impl FnOnce(&mut BridgeConfig),
) -> Bridge {
    let store_path = store_path_in(&dir);

    let mut config = BridgeConfig::default();
    config.store.path = store_path.clone();
    config.http.host = IpAddr::V4(Ipv4Addr::LOCALHOST);
    config.http.port = 0;
    config.client.default_timeout_ms = 5_000;
    tweak(&mut config);

    let bus = Arc::new(InMemoryMessageBus::new());
    let store = Arc::new(RecordStoreService::open_csv(&store_path).unwrap());
    let mut service = BridgeService::new(
        config.clone(),
        bus.clone() as Arc<dyn MessageBus>,
        store.clone(),
        scorer,
        classifier,
    )
    .unwrap();
    service.start().await.unwrap();

    let client = BridgeClient::connect(bus.clone(), &config.client).await.unwrap();

    Bridge {
        bus,
        service,
        store,
        client,
        store_path,
        _dir: dir,
    }
}

pub fn profile(uuid: &str) -> Value {
    json!({
        "uuid": uuid,
        "age": 24,
        "contactFrequency": "weekly",
        "gender": "F",
        "hobby": "climbing",
        "major": "physics",
        "mbti": "ENFP"
    })
}

pub fn crud(kind: &str, body: Value) -> Value {
    let mut body = body;
    body["type"] = json!(kind);
    body
}

pub fn recommend(matcher: &str) -> Value {
    json!({
        "matcherUuid": matcher,
        "contactFrequencyOption": "weekly",
        "myGender": "F",
        "hobbyOption": "same",
        "sameMajorOption": true,
        "ageOption": "20-25",
        "mbtiOption": "any",
        "myMajor": "physics",
        "myAge": 24,
        "duplicationList": ["u9"]
    })
}
