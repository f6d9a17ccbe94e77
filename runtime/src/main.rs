//! telemetry-gateway binary
//!
//! Configured entirely through `TELEMETRY_GATEWAY_*` environment variables.

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry_gateway_runtime::run().await
}
