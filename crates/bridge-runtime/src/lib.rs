//! # Match Bridge Runtime
//!
//! The executable entry point for the bridge.
//!
//! ## Startup Sequence
//!
//! 1. Initialize logging (`RUST_LOG`, default `info`)
//! 2. Load configuration (defaults + environment overrides)
//! 3. Open the record store (takes the file lock)
//! 4. Create the scorer and classifier process adapters
//! 5. Create the message bus (`AMQP_URL` connects to a broker, otherwise in-process)
//! 6. Start the bridge service (queue consumers + HTTP ingress)
//!
//! ## Wiring
//!
//! ```text
//! CSV_FILE_PATH ──► RecordStoreService<CsvTableFile> ─┐
//! ML_FILE_PATH ───► ProcessScorer ────────────────────┼──► BridgeService ◄── AmqpMessageBus (AMQP_URL)
//! CLASSIFIER_FILE_PATH ► ProcessClassifier ───────────┘                    or InMemoryMessageBus
//! ```

pub mod config;

use std::sync::Arc;

use anyhow::{Context, Result};
use mb_01_record_store::{CsvTableFile, RecordStoreService};
use mb_02_scorer::{ProcessClassifier, ProcessScorer};
use mb_03_bridge::{BridgeConfig, BridgeService};
use shared_bus::{AmqpMessageBus, InMemoryMessageBus, MessageBus};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

pub use config::{load_config, load_config_from};

/// Install the global fmt subscriber.
pub fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("failed to install tracing subscriber")?;
    Ok(())
}

/// The bus backend the runtime owns.
pub enum RuntimeBus {
    Memory(Arc<InMemoryMessageBus>),
    Amqp(Arc<AmqpMessageBus>),
}

impl RuntimeBus {
    /// Connect to the broker named in `config.bus`, or fall back to the
    /// in-process bus.
    pub async fn connect(config: &BridgeConfig) -> Result<Self> {
        match &config.bus.amqp_url {
            Some(url) => {
                let bus = AmqpMessageBus::connect(url, config.bus.prefetch)
                    .await
                    .context("failed to connect to AMQP broker")?;
                Ok(Self::Amqp(Arc::new(bus)))
            }
            None => {
                info!("No broker configured, using in-process bus");
                Ok(Self::Memory(Arc::new(InMemoryMessageBus::new())))
            }
        }
    }

    pub fn handle(&self) -> Arc<dyn MessageBus> {
        match self {
            Self::Memory(bus) => bus.clone(),
            Self::Amqp(bus) => bus.clone(),
        }
    }

    pub fn is_broker(&self) -> bool {
        matches!(self, Self::Amqp(_))
    }

    async fn close(&self) {
        match self {
            Self::Memory(bus) => bus.close(),
            Self::Amqp(bus) => bus.close().await,
        }
    }
}

/// The running bridge and the bus it listens on.
pub struct BridgeRuntime {
    service: BridgeService,
    bus: RuntimeBus,
}

impl BridgeRuntime {
    /// Open the store, connect the bus, and wire every adapter. Nothing is
    /// started yet.
    pub async fn new(config: BridgeConfig) -> Result<Self> {
        info!("Creating match bridge runtime");
        config.validate().context("invalid bridge configuration")?;

        let storage = CsvTableFile::open_with_lock_timeout(&config.store.path, config.store.lock_timeout())
            .with_context(|| format!("failed to open record store {}", config.store.path.display()))?;
        let store = RecordStoreService::open(storage).context("failed to load record store")?;
        info!(records = store.len(), path = %config.store.path.display(), "Record store opened");

        let scorer = ProcessScorer::new(config.scorer.clone());
        let classifier = ProcessClassifier::new(config.classifier.clone());
        let bus = RuntimeBus::connect(&config).await?;

        let service = BridgeService::new(
            config,
            bus.handle(),
            Arc::new(store),
            Arc::new(scorer),
            Arc::new(classifier),
        )
        .context("invalid bridge configuration")?;

        Ok(Self { service, bus })
    }

    pub async fn start(&mut self) -> Result<()> {
        self.service.start().await.context("failed to start bridge service")?;
        if let Some(addr) = self.service.http_addr() {
            info!(addr = %addr, "Bridge is accepting requests");
        }
        Ok(())
    }

    /// Stop consumers and the HTTP server, then close the bus.
    pub async fn shutdown(&mut self) {
        info!("Initiating graceful shutdown...");
        self.service.shutdown().await;
        self.bus.close().await;
        info!("Shutdown complete");
    }

    pub fn service(&self) -> &BridgeService {
        &self.service
    }

    pub fn bus(&self) -> &RuntimeBus {
        &self.bus
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> BridgeConfig {
        let mut config = BridgeConfig::default();
        config.store.path = dir.path().join("users.csv");
        config.http.host = IpAddr::V4(Ipv4Addr::LOCALHOST);
        config.http.port = 0;
        config
    }

    #[tokio::test]
    async fn test_runtime_starts_and_stops() {
        let dir = TempDir::new().unwrap();
        let mut runtime = BridgeRuntime::new(config(&dir)).await.unwrap();
        runtime.start().await.unwrap();

        assert!(runtime.service().http_addr().is_some());
        let RuntimeBus::Memory(bus) = runtime.bus() else {
            panic!("expected the in-process bus");
        };
        assert_eq!(bus.consumer_count("match-request"), Some(1));

        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_second_runtime_on_same_store_is_refused() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir);
        config.store.lock_timeout_ms = 100;

        let _first = BridgeRuntime::new(config.clone()).await.unwrap();
        assert!(BridgeRuntime::new(config).await.is_err());
    }

    #[tokio::test]
    async fn test_bad_broker_url_fails_before_store_is_locked() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir);
        config.bus.amqp_url = Some("localhost:5672".into());

        assert!(BridgeRuntime::new(config.clone()).await.is_err());
        config.bus.amqp_url = None;
        assert!(BridgeRuntime::new(config).await.is_ok());
    }
}
