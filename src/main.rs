use std::time::Duration;

use anyhow::{Context, Result};
use axum_server::{tls_rustls::RustlsConfig, Handle};
use hyper_util::rt::TokioTimer;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dnsconfig_webhook::{
    api::{metrics::install_recorder, AppState},
    config::{log_filter_from_level, Config},
    create_router,
    dns::{load_initial, spawn_config_watcher, ConfigWatcher, DnsConfigStore},
};

/// How long in-flight admission calls get to finish on shutdown
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    tracing::info!("Starting dnsconfig-webhook");

    // Load configuration
    let config = Config::load()?;
    config.validate()?;
    tracing::info!("Configuration loaded");

    let metrics = match install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!("Prometheus recorder not installed: {}", e);
            None
        }
    };

    // Initial DNS config, falling back to the built-in default
    let initial = load_initial(&config.dns_config_path).await;
    let store = DnsConfigStore::new(initial.config);

    let shutdown = CancellationToken::new();
    let watcher = ConfigWatcher::new(
        config.dns_config_path.clone(),
        store.clone(),
        config.reload_interval(),
        initial.modified,
    );
    let watcher_task = spawn_config_watcher(watcher, shutdown.clone());

    // Build application state and router
    let mut state = AppState::new(store);
    if let Some(handle) = metrics {
        state = state.with_metrics(handle);
    }
    let app = create_router(state);

    let tls_config = RustlsConfig::from_pem_file(&config.cert_file, &config.key_file)
        .await
        .context("failed to load TLS certificate and key")?;

    let handle = Handle::new();
    tokio::spawn(shutdown_on_signal(handle.clone(), shutdown.clone()));

    let addr = config.bind_addr();
    tracing::info!("Listening on {}", addr);

    let mut server = axum_server::bind_rustls(addr, tls_config);
    server
        .http_builder()
        .http1()
        .timer(TokioTimer::new())
        .header_read_timeout(config.read_header_timeout());

    let served = server
        .handle(handle)
        .serve(app.into_make_service())
        .await;

    shutdown.cancel();
    if let Err(e) = watcher_task.await {
        tracing::warn!("DNS config watcher task failed: {}", e);
    }

    served.context("webhook server failed")?;
    tracing::info!("dnsconfig-webhook stopped");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| match std::env::var("LOG_LEVEL") {
            Ok(level) if !level.trim().is_empty() => {
                EnvFilter::try_new(log_filter_from_level(&level))
            }
            _ => EnvFilter::try_new("info"),
        })
        .unwrap_or_else(|_| "info".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Wait for Ctrl-C or SIGTERM, then drain the server and stop the watcher
async fn shutdown_on_signal(handle: Handle, shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
        _ = shutdown.cancelled() => {}
    }

    tracing::info!("Shutting down");
    shutdown.cancel();
    handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
}
