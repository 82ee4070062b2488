//! Credential issuer HTTP server.
//!
//! Serves the public credential endpoints and, on a separate listener, the
//! key administration endpoints and Prometheus metrics. Users and sessions
//! are kept in memory and codes are printed to the console, so this binary
//! is meant for development and single-process deployments.

mod config;

use anyhow::Context;
use axum::{Router, routing::get};
use config::ServerConfig;
use credential_issuer::prelude::*;
use credential_issuer::router::{admin_router, public_router};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tokio::signal;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        // Missing .env is the normal case outside development.
        if !e.not_found() {
            return Err(e).context("failed to read .env");
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "credential_server=info,credential_issuer=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting credential server");

    let config = ServerConfig::from_env();
    info!(
        bind_addr = %config.bind_addr,
        admin_bind_addr = %config.admin_bind_addr,
        issuer = %config.token_issuer,
        audience = %config.token_audience,
        "Configuration loaded"
    );

    // Metrics
    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")?;
    credential_issuer::metrics::describe_metrics();

    // Credential service. The first key pair takes a while to generate.
    let credential_config = config.credential_config();
    let service = tokio::task::spawn_blocking(move || {
        CredentialService::builder(
            Arc::new(InMemoryUserRepository::new()),
            Arc::new(ConsoleNotifier::new()),
            Arc::new(InMemorySessionStore::new()),
        )
        .with_config(credential_config)
        .build()
    })
    .await
    .context("service construction panicked")??;
    let service = Arc::new(service);

    let sweeper = service.spawn_sweeper();

    // Routers
    let public_app = public_router(service.clone()).layer(TraceLayer::new_for_http());
    let admin_app = admin_router(service.clone())
        .route("/metrics", get(move || std::future::ready(metrics.render())))
        .layer(TraceLayer::new_for_http());

    // Shutdown fan-out to both listeners
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        if shutdown_tx.send(true).is_err() {
            warn!("Listeners already stopped");
        }
    });

    let public = serve(config.bind_addr, public_app, "public", shutdown_rx.clone());
    let admin = serve(config.admin_bind_addr, admin_app, "admin", shutdown_rx);
    tokio::try_join!(public, admin)?;

    // Background tasks
    if tokio::time::timeout(config.shutdown_timeout(), sweeper.shutdown())
        .await
        .is_err()
    {
        warn!(timeout = ?config.shutdown_timeout(), "Sweeper did not stop in time");
    }

    info!("Server stopped");
    Ok(())
}

/// Bind `addr` and serve `app` until the shutdown flag flips.
async fn serve(
    addr: SocketAddr,
    app: Router,
    name: &'static str,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {name} listener on {addr}"))?;
    info!(address = %addr, listener = name, "Listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        // A dropped sender also means shutdown.
        let _ = shutdown.wait_for(|stop| *stop).await;
    })
    .await
    .with_context(|| format!("{name} listener failed"))?;

    info!(listener = name, "Listener stopped");
    Ok(())
}

/// Graceful shutdown signal handler.
///
/// Waits for:
/// - Ctrl+C (SIGINT)
/// - SIGTERM (in production environments)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
