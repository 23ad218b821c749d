//! LRU Providers demo server
//!
//! Builds one cache through the provider registry and serves it over HTTP.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lru_providers::api::create_router;
use lru_providers::{AppState, CacheMetrics, Config, ProviderRegistry};

/// Startup sequence:
/// 1. Initialize tracing
/// 2. Load configuration from environment variables
/// 3. Build metrics and the provider registry
/// 4. Construct the configured cache
/// 5. Serve HTTP until SIGINT/SIGTERM, then close the cache
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lru_providers=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting LRU Providers server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: provider={}, capacity={}, ttl={}s, group={:?}, port={}",
        config.provider, config.capacity, config.ttl_secs, config.group, config.server_port
    );

    let meter_provider = SdkMeterProvider::builder()
        .with_periodic_exporter(opentelemetry_stdout::MetricExporter::default())
        .build();
    let metrics = Arc::new(CacheMetrics::from_provider(&meter_provider));

    // Registration faults are wiring bugs, never recoverable
    let registry = ProviderRegistry::with_builtin_providers(metrics)
        .unwrap_or_else(|fault| fault.fatal());

    let provider = config.provider.clone();
    let provider_config = config.provider_config();
    let cache = tokio::task::spawn_blocking(move || registry.new_cache(&provider, provider_config))
        .await
        .context("cache construction task failed")?
        .with_context(|| format!("failed to build {} cache", config.provider))?;
    info!("Cache initialized");

    let state = AppState::new(cache.clone(), config.provider.clone(), config.group.clone());
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tokio::task::spawn_blocking(move || cache.close())
        .await
        .context("cache close task failed")?
        .context("failed to close cache")?;
    if let Err(err) = meter_provider.shutdown() {
        warn!(error = %err, "metrics shutdown failed");
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
