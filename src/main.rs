//! DITA PDF Server
//!
//! HTTP front end that renders uploaded DITA archives to PDF.

use anyhow::Context;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dita_pdf_server::config::Config;
use dita_pdf_server::routes;
use dita_pdf_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dita_pdf_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("Failed to load configuration")?;

    tracing::info!("Starting DITA PDF Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Renderer: {}", config.renderer.executable.display());
    tracing::info!("Output format: {}", config.renderer.format);

    let addr = config.bind_addr();
    let state = AppState::new(config).context("Failed to resolve application directory")?;

    let app_dir = state.app_dir().clone();
    app_dir
        .init()
        .await
        .context("Failed to create application directory")?;

    let report = app_dir
        .recover()
        .await
        .context("Failed to sweep application directory")?;
    if report.removed > 0 {
        tracing::warn!(
            removed = report.removed,
            dirty = report.dirty,
            locked = report.locked,
            "Removed working directories left by a previous run"
        );
    }
    if report.kept > 0 {
        tracing::warn!(
            kept = report.kept,
            "Application directory shared with another running server"
        );
    }
    tracing::info!("Application directory: {}", app_dir.path().display());

    let app = routes::router(state);

    // Start server with graceful shutdown
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("DITA PDF Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    match app_dir.shutdown().await {
        Ok(true) => tracing::info!("Application directory removed"),
        Ok(false) => tracing::warn!("Application directory kept: jobs still running"),
        Err(e) => tracing::warn!("Failed to sweep application directory: {}", e),
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
