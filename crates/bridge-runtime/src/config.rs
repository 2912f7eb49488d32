//! Environment overrides on top of `BridgeConfig::default()`.

use mb_02_scorer::OutputFormat;
use mb_03_bridge::BridgeConfig;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

pub const CSV_FILE_PATH: &str = "CSV_FILE_PATH";
pub const ML_FILE_PATH: &str = "ML_FILE_PATH";
pub const CLASSIFIER_FILE_PATH: &str = "CLASSIFIER_FILE_PATH";
pub const SCORER_INTERPRETER: &str = "SCORER_INTERPRETER";
pub const SCORER_TIMEOUT_SECS: &str = "SCORER_TIMEOUT_SECS";
pub const CLASSIFIER_TIMEOUT_SECS: &str = "CLASSIFIER_TIMEOUT_SECS";
pub const SCORER_OUTPUT_FORMAT: &str = "SCORER_OUTPUT_FORMAT";
pub const BRIDGE_HTTP_HOST: &str = "BRIDGE_HTTP_HOST";
pub const BRIDGE_HTTP_PORT: &str = "BRIDGE_HTTP_PORT";
pub const CRUD_QUEUE: &str = "CRUD_QUEUE";
pub const MATCH_QUEUE: &str = "MATCH_QUEUE";
pub const CLASSIFY_QUEUE: &str = "CLASSIFY_QUEUE";
pub const AMQP_URL: &str = "AMQP_URL";
/// Fallback for `AMQP_URL`.
pub const RABBITMQ_URL: &str = "RABBITMQ_URL";
pub const BUS_PREFETCH: &str = "BUS_PREFETCH";

/// Load configuration from the process environment.
pub fn load_config() -> BridgeConfig {
    load_config_from(|key| std::env::var(key).ok())
}

/// Load configuration from an arbitrary variable source.
pub fn load_config_from<F>(var: F) -> BridgeConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = BridgeConfig::default();

    if let Some(path) = var(CSV_FILE_PATH) {
        config.store.path = PathBuf::from(path);
    }

    let interpreter = var(SCORER_INTERPRETER);
    if let Some(interpreter) = &interpreter {
        config.scorer.program = interpreter.clone();
        config.classifier.program = interpreter.clone();
    }
    if let Some(script) = var(ML_FILE_PATH) {
        config.scorer.args = vec![script];
    }
    if let Some(script) = var(CLASSIFIER_FILE_PATH) {
        config.classifier.args = vec![script];
    }
    if let Some(secs) = parsed::<u64>(&var, SCORER_TIMEOUT_SECS) {
        config.scorer.timeout_ms = secs_to_ms(secs);
    }
    if let Some(secs) = parsed::<u64>(&var, CLASSIFIER_TIMEOUT_SECS) {
        config.classifier.timeout_ms = secs_to_ms(secs);
    }
    if let Some(format) = parsed::<OutputFormat>(&var, SCORER_OUTPUT_FORMAT) {
        config.scorer.output_format = format;
        config.classifier.output_format = format;
    }

    if let Some(host) = parsed(&var, BRIDGE_HTTP_HOST) {
        config.http.host = host;
    }
    if let Some(port) = parsed(&var, BRIDGE_HTTP_PORT) {
        config.http.port = port;
    }

    if let Some(name) = var(CRUD_QUEUE) {
        config.queues.crud.name = name;
    }
    if let Some(name) = var(MATCH_QUEUE) {
        config.queues.matching.name = name;
    }
    if let Some(name) = var(CLASSIFY_QUEUE) {
        config.queues.classify.name = name;
    }

    if let Some(url) = var(AMQP_URL).or_else(|| var(RABBITMQ_URL)) {
        config.bus.amqp_url = Some(url);
    }
    if let Some(prefetch) = parsed(&var, BUS_PREFETCH) {
        config.bus.prefetch = prefetch;
    }

    info!(
        store = %config.store.path.display(),
        broker = config.bus.amqp_url.is_some(),
        scorer = ?config.scorer.args,
        classifier = ?config.classifier.args,
        "Configuration loaded"
    );
    config
}

fn secs_to_ms(secs: u64) -> u64 {
    u64::try_from(Duration::from_secs(secs).as_millis()).unwrap_or(u64::MAX)
}

fn parsed<T: FromStr>(var: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = var(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring unparseable environment value");
            None
        }
    }
}
