//! Bridge service - wires the store, scorer, and classifier to the inbound
//! queues and the HTTP ingress.

use crate::dispatcher::RequestDispatcher;
use crate::domain::config::{BridgeConfig, ConfigError};
use crate::ipc::consumer::{ConsumerStats, QueueConsumer};
use crate::ipc::publisher::ReplyPublisher;
use crate::router::{build_router, AppState};
use mb_01_record_store::RecordStoreApi;
use mb_02_scorer::{Classifier, Scorer};
use shared_bus::{BusError, MessageBus};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// How long `shutdown` waits for tasks to finish.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("bus error: {0}")]
    Bus(#[from] BusError),

    #[error("failed to bind HTTP listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
}

pub struct BridgeService {
    config: BridgeConfig,
    bus: Arc<dyn MessageBus>,
    dispatcher: Arc<RequestDispatcher>,
    consumer_stats: Vec<(String, Arc<ConsumerStats>)>,
    http_addr: Option<SocketAddr>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl BridgeService {
    pub fn new(
        config: BridgeConfig,
        bus: Arc<dyn MessageBus>,
        store: Arc<dyn RecordStoreApi>,
        scorer: Arc<dyn Scorer>,
        classifier: Arc<dyn Classifier>,
    ) -> Result<Self, ServiceError> {
        config.validate()?;

        let publisher = ReplyPublisher::new(bus.clone());
        let dispatcher = Arc::new(RequestDispatcher::new(store, scorer, classifier, publisher));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            config,
            bus,
            dispatcher,
            consumer_stats: Vec::new(),
            http_addr: None,
            shutdown_tx,
            shutdown_rx,
            tasks: Vec::new(),
        })
    }

    /// Declare queues, spawn one consumer per queue, and bind HTTP.
    pub async fn start(&mut self) -> Result<(), ServiceError> {
        info!("Starting bridge...");

        for binding in self.config.queues.bindings() {
            let consumer =
                QueueConsumer::start(&*self.bus, binding.clone(), Arc::clone(&self.dispatcher))
                    .await?;
            let queue = consumer.queue().to_string();
            self.consumer_stats.push((queue.clone(), consumer.stats()));

            let mut shutdown = self.shutdown_rx.clone();
            self.tasks.push(tokio::spawn(consumer.run_until(async move {
                let _ = shutdown.changed().await;
                info!(queue = %queue, "Shutdown signal received");
            })));
            info!(queue = %binding.name, kinds = ?binding.kinds, "Consumer started");
        }

        if self.config.http.enabled {
            let addr = self.config.http_addr();
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .map_err(|source| ServiceError::Bind { addr, source })?;
            let local = listener.local_addr().unwrap_or(addr);
            self.http_addr = Some(local);

            let router = build_router(
                AppState {
                    dispatcher: Arc::clone(&self.dispatcher),
                },
                &self.config.http,
            );
            let mut shutdown = self.shutdown_rx.clone();
            self.tasks.push(tokio::spawn(async move {
                let graceful = async move {
                    let _ = shutdown.changed().await;
                };
                if let Err(e) = axum::serve(listener, router)
                    .with_graceful_shutdown(graceful)
                    .await
                {
                    error!(error = %e, "HTTP server error");
                }
            }));
            info!(addr = %local, "HTTP ingress listening");
        }

        info!("Bridge started");
        Ok(())
    }

    /// Signal every task to stop and wait for them.
    ///
    /// Consumers stop taking new deliveries but finish the one in hand,
    /// including its reply and ack.
    pub async fn shutdown(&mut self) {
        info!("Shutting down bridge...");
        let _ = self.shutdown_tx.send(true);

        for task in self.tasks.drain(..) {
            if tokio::time::timeout(SHUTDOWN_GRACE, task).await.is_err() {
                warn!("Task did not stop within grace period");
            }
        }
        info!("Bridge stopped");
    }

    pub fn dispatcher(&self) -> Arc<RequestDispatcher> {
        Arc::clone(&self.dispatcher)
    }

    /// Bound HTTP address, once started.
    pub fn http_addr(&self) -> Option<SocketAddr> {
        self.http_addr
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Per-queue consumer counters.
    pub fn consumer_stats(&self) -> &[(String, Arc<ConsumerStats>)] {
        &self.consumer_stats
    }
}
