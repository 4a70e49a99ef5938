//! Axum API server binary.

use std::net::SocketAddr;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vinsight_api::{create_router, metrics, ApiConfig, AppState};
use vinsight_inference::{build_chat_backend, build_transcriber, InferenceConfig, InferenceGateway};
use vinsight_media::check_ffmpeg;
use vinsight_pipeline::{AnalysisOrchestrator, IngestionService, PipelineConfig};
use vinsight_storage::MediaStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = ApiConfig::from_env();
    init_tracing(config.is_production())?;

    info!(environment = %config.environment, "Starting vinsight-api");

    let pipeline = PipelineConfig::from_env();
    let inference = InferenceConfig::from_env().context("invalid inference configuration")?;
    info!(
        host = %config.host,
        port = config.port,
        storage_root = %pipeline.storage_root.display(),
        max_keyframes = pipeline.max_keyframes,
        "Configuration loaded"
    );

    if let Err(e) = check_ffmpeg() {
        warn!(error = %e, "FFmpeg unavailable, uploads will fail");
    }

    let store = MediaStore::open(&pipeline.storage_root)
        .await
        .with_context(|| format!("cannot open storage root {}", pipeline.storage_root.display()))?;

    let gateway = InferenceGateway::new(
        build_chat_backend(&inference).context("failed to build chat backend")?,
    );
    let backend_name = gateway.backend_name();
    let transcriber = build_transcriber(&inference).context("failed to build transcriber")?;

    let ingestion = IngestionService::new(store.clone(), &pipeline);
    let orchestrator = AnalysisOrchestrator::new(
        store,
        transcriber,
        gateway,
        pipeline.ffmpeg_runner(),
    );
    let state = AppState::new(config.clone(), ingestion, orchestrator, backend_name);

    let metrics_handle = if config.metrics_enabled {
        info!("Prometheus metrics enabled at /metrics");
        Some(metrics::init_metrics().context("failed to install metrics recorder")?)
    } else {
        None
    };

    let app = create_router(state, metrics_handle);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("invalid bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// JSON logs in production or when `LOG_FORMAT=json`, coloured text otherwise.
fn init_tracing(production: bool) -> anyhow::Result<()> {
    let use_json = production
        || std::env::var("LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"))
        .add_directive("vinsight=info".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_target(true))
            .with(env_filter)
            .init();
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
