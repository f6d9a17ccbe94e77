//! Telemetry gateway runtime
//!
//! Provides [`run()`] for the stock binary, and [`RuntimeBuilder`] for
//! embedders who bring their own message bus or license verifier.
//!
//! # Quick start
//!
//! ```ignore
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     telemetry_gateway_runtime::run().await
//! }
//! ```

#![deny(unsafe_code)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::panic)]

use std::net::SocketAddr;
use std::sync::Arc;
use telemetry_gateway::config::{Config, LogFormat};
use telemetry_gateway::license::LicenseVerifier;
use telemetry_gateway::metrics::Metrics;
use telemetry_gateway::metrics_server::MetricsServer;
use telemetry_gateway::server::GatewayService;
use telemetry_gateway::topic::{RetryPolicy, RetryTopic, StdoutTopic};
use telemetry_gateway_core::Topic;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Run the gateway with settings from the environment.
///
/// Publishes to stdout; use [`RuntimeBuilder::topic`] to publish elsewhere.
pub async fn run() -> anyhow::Result<()> {
    RuntimeBuilder::new().run().await
}

/// Builder for controlling runtime behaviour.
///
/// # Example
///
/// ```ignore
/// RuntimeBuilder::new()
///     .grpc_addr("0.0.0.0:10085".parse()?)
///     .topic(Arc::new(my_pubsub_topic))
///     .run()
///     .await
/// ```
#[derive(Default)]
pub struct RuntimeBuilder {
    grpc_addr: Option<SocketAddr>,
    metrics_addr: Option<SocketAddr>,
    topic: Option<Arc<dyn Topic>>,
    verifier: Option<Arc<dyn LicenseVerifier>>,
}

impl RuntimeBuilder {
    /// Create a new builder with defaults from environment variables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the gRPC listen address.
    ///
    /// Default: `TELEMETRY_GATEWAY_GRPC_ADDR`, or `0.0.0.0:10085`.
    pub fn grpc_addr(mut self, addr: SocketAddr) -> Self {
        self.grpc_addr = Some(addr);
        self
    }

    /// Override the metrics HTTP listen address.
    ///
    /// Default: `TELEMETRY_GATEWAY_METRICS_ADDR`, or `0.0.0.0:9090`.
    pub fn metrics_addr(mut self, addr: SocketAddr) -> Self {
        self.metrics_addr = Some(addr);
        self
    }

    /// Publish to `topic` instead of stdout.
    pub fn topic(mut self, topic: Arc<dyn Topic>) -> Self {
        self.topic = Some(topic);
        self
    }

    /// Verify license keys with `verifier`.
    pub fn license_verifier(mut self, verifier: Arc<dyn LicenseVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    /// Run the gateway until SIGINT or SIGTERM.
    pub async fn run(self) -> anyhow::Result<()> {
        // ── 1. Load config from env ──────────────────────────────
        let config = Config::from_env()?;

        // ── 2. Init tracing ──────────────────────────────────────
        init_tracing(&config);

        let grpc_addr = self.grpc_addr.unwrap_or(config.grpc_addr);
        let metrics_addr = self.metrics_addr.unwrap_or(config.metrics_addr);

        // ── 3. Topic ─────────────────────────────────────────────
        let topic: Arc<dyn Topic> = match self.topic {
            Some(topic) => topic,
            None if config.stdout_pretty => Arc::new(StdoutTopic::pretty()),
            None => Arc::new(StdoutTopic::new()),
        };
        let topic: Arc<dyn Topic> = if config.publish_retry_attempts > 0 {
            Arc::new(RetryTopic::new(
                topic,
                RetryPolicy::with_max_retries(config.publish_retry_attempts),
            ))
        } else {
            topic
        };

        // ── 4. Init metrics + HTTP server ────────────────────────
        Metrics::init()?;
        let metrics_handle = MetricsServer::start(metrics_addr, Arc::clone(&topic));

        info!(
            %grpc_addr,
            %metrics_addr,
            topic = topic.name(),
            publish_concurrency = config.publish_concurrency,
            retry_attempts = config.publish_retry_attempts,
            "Starting telemetry gateway"
        );

        // ── 5. Serve until signalled ─────────────────────────────
        let shutdown = CancellationToken::new();
        let mut service = GatewayService::new(Arc::clone(&topic))
            .with_publish_concurrency(config.publish_concurrency)
            .with_max_message_size(config.max_message_size)
            .with_shutdown(shutdown.clone());
        if let Some(verifier) = self.verifier {
            service = service.with_license_verifier(verifier);
        }

        let stop = shutdown.clone();
        Server::builder()
            .add_service(service.into_server())
            .serve_with_shutdown(grpc_addr, async move {
                shutdown_signal().await;
                // Unblocks streams still waiting on publishes
                stop.cancel();
            })
            .await?;

        // ── 6. Shutdown ──────────────────────────────────────────
        if let Err(e) = topic.shutdown().await {
            tracing::warn!(error = %e, "Topic shutdown failed");
        }
        metrics_handle.abort();
        info!("Telemetry gateway shutdown complete");

        Ok(())
    }
}

/// Initialise the tracing subscriber based on config.
fn init_tracing(config: &Config) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.log_level.clone().into());

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.log_format {
        LogFormat::Json => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        LogFormat::Pretty => {
            registry.with(tracing_subscriber::fmt::layer()).init();
        }
    }
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = ?e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = ?e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
