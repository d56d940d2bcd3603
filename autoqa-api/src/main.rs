//! AutoQA API Server Entry Point
//!
//! Loads configuration, builds the AWS and identity clients, and starts the
//! Axum HTTP server.

use std::sync::Arc;

use autoqa_api::telemetry::{init_tracing, TelemetryConfig};
use autoqa_api::{create_app, ApiError, ApiResult, AppConfig, AppState, OpenIdProvider};
use autoqa_storage::{DynamoTableScanner, S3LinkSigner, SystemClock};

#[tokio::main]
async fn main() -> ApiResult<()> {
    init_tracing(&TelemetryConfig::default())?;

    let config = AppConfig::from_env()?;

    let aws = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let scanner = Arc::new(DynamoTableScanner::new(
        aws_sdk_dynamodb::Client::new(&aws),
        config.upstream_timeout,
    ));
    let signer = Arc::new(S3LinkSigner::new(
        aws_sdk_s3::Client::new(&aws),
        config.upstream_timeout,
    ));
    let identity = Arc::new(OpenIdProvider::new(
        config.oidc.clone(),
        config.upstream_timeout,
    )?);

    let addr = config.bind_addr;
    tracing::info!(
        stage = %config.stage,
        reports_bucket = %config.reports_bucket,
        debug = config.debug,
        "Configuration loaded"
    );

    let state = AppState::new(config, scanner, signer, identity, Arc::new(SystemClock));
    let app = create_app(state);

    tracing::info!(%addr, "Starting AutoQA dashboard");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
