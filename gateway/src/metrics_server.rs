//! HTTP server for Prometheus metrics and health checks
//!
//! Runs a lightweight HTTP server on a separate port for Prometheus scraping.
//!
//! # Endpoints
//!
//! - `GET /metrics` - Prometheus metrics
//! - `GET /health` - JSON health summary; 503 while the topic is unhealthy
//!
//! # Example
//!
//! ```ignore
//! use telemetry_gateway::metrics_server::MetricsServer;
//!
//! let metrics_handle = MetricsServer::start("0.0.0.0:9090".parse()?, topic.clone());
//! ```

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use std::net::SocketAddr;
use std::sync::Arc;
use telemetry_gateway_core::Topic;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Metrics HTTP server
pub struct MetricsServer;

impl MetricsServer {
    /// Start the metrics server on the given address
    ///
    /// Returns a JoinHandle that can be used to abort the server.
    /// The server runs until aborted or the process exits.
    pub fn start(addr: SocketAddr, topic: Arc<dyn Topic>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(%addr, "Metrics server starting");

            let listener = match tokio::net::TcpListener::bind(addr).await {
                Ok(l) => l,
                Err(e) => {
                    error!(error = %e, %addr, "Failed to bind metrics server");
                    return;
                }
            };

            if let Err(e) = axum::serve(listener, router(topic)).await {
                error!(error = %e, "Metrics server error");
            }
        })
    }
}

fn router(topic: Arc<dyn Topic>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .with_state(topic)
}

/// Handler for /metrics endpoint
async fn metrics_handler() -> impl IntoResponse {
    let body = crate::metrics::gather();
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}

#[derive(serde::Serialize)]
struct HealthSummary {
    status: &'static str,
    topic: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    active_streams: Option<f64>,
}

/// Handler for /health endpoint
async fn health_handler(State(topic): State<Arc<dyn Topic>>) -> impl IntoResponse {
    let healthy = topic.health().await;
    let summary = HealthSummary {
        status: if healthy { "healthy" } else { "unhealthy" },
        topic: topic.name(),
        active_streams: crate::metrics::Metrics::get().map(|m| m.active_streams.get()),
    };
    if healthy {
        (StatusCode::OK, Json(summary))
    } else {
        warn!(topic = topic.name(), "Health check failed: topic unhealthy");
        (StatusCode::SERVICE_UNAVAILABLE, Json(summary))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_metrics_handler_returns_prometheus_format() {
        let _ = crate::metrics::Metrics::init();

        let response = metrics_handler().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let content_type = response
            .headers()
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap();
        assert!(content_type.contains("text/plain"));
    }

    /// Topic whose health is fixed at construction
    struct FixedHealthTopic(bool);

    #[async_trait::async_trait]
    impl Topic for FixedHealthTopic {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn publish(
            &self,
            _: &telemetry_gateway_core::TopicMessage,
        ) -> Result<(), crate::error::PluginError> {
            Ok(())
        }

        async fn health(&self) -> bool {
            self.0
        }
    }

    async fn health_json(topic: Arc<dyn Topic>) -> (StatusCode, serde_json::Value) {
        let response = health_handler(State(topic)).await.into_response();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), 10_000)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_health_reports_healthy_topic() {
        let _ = crate::metrics::Metrics::init();

        let (status, json) = health_json(Arc::new(FixedHealthTopic(true))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["topic"], "fixed");
        if crate::metrics::Metrics::get().is_some() {
            assert!(json["active_streams"].is_number());
        }
    }

    #[tokio::test]
    async fn test_health_reports_unhealthy_topic() {
        let (status, json) = health_json(Arc::new(FixedHealthTopic(false))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["status"], "unhealthy");
    }
}
